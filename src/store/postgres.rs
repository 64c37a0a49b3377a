// src/store/postgres.rs
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, QueryBuilder};
use tracing::info;
use uuid::Uuid;

use super::{
    unique_by_identity, InsertReport, NoticeStore, StoreError, INSERT_CHUNK, NOTICE_COLUMNS,
};
use crate::model::Notice;

#[derive(Clone)]
pub struct PgNoticeStore {
    pool: PgPool,
}

impl PgNoticeStore {
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(10))
            .connect(url)
            .await
            .map_err(StoreError::Connect)?;
        Self::from_pool(pool).await
    }

    pub async fn from_pool(pool: PgPool) -> Result<Self, StoreError> {
        sqlx::migrate!("./migrations/postgres").run(&pool).await?;
        info!("postgres notice store ready");
        Ok(Self { pool })
    }
}

#[async_trait]
impl NoticeStore for PgNoticeStore {
    async fn insert_batch(&self, notices: &[Notice]) -> Result<InsertReport, StoreError> {
        let unique = unique_by_identity(notices);
        let mut report = InsertReport {
            attempted: notices.len(),
            inserted: Vec::new(),
        };
        if unique.is_empty() {
            return Ok(report);
        }

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;
        for chunk in unique.chunks(INSERT_CHUNK) {
            let mut qb: QueryBuilder<Postgres> =
                QueryBuilder::new(format!(r#"INSERT INTO "Notice" ({NOTICE_COLUMNS}) "#));
            qb.push_values(chunk, |mut row, n| {
                row.push_bind(n.id)
                    .push_bind(n.title.clone())
                    .push_bind(n.body.clone())
                    .push_bind(n.url.clone())
                    .push_bind(n.author_name.clone())
                    .push_bind(n.author_url.clone())
                    .push_bind(n.image_url.clone())
                    .push_bind(n.source_id.clone())
                    .push_bind(n.raw.clone())
                    .push_bind(n.guid.clone())
                    .push_bind(n.published_date)
                    .push_bind(now)
                    .push_bind(now);
            });
            qb.push(format!(
                r#" ON CONFLICT (guid, "sourceId") DO NOTHING RETURNING {NOTICE_COLUMNS}"#
            ));

            let rows: Vec<Notice> = qb.build_query_as().fetch_all(&mut *tx).await?;
            report.inserted.extend(rows);
        }
        tx.commit().await?;

        Ok(report)
    }

    async fn count(&self) -> Result<i64, StoreError> {
        let n: i64 = sqlx::query_scalar(r#"SELECT COUNT(*) FROM "Notice""#)
            .fetch_one(&self.pool)
            .await?;
        Ok(n)
    }

    async fn latest(&self, n: usize) -> Result<Vec<Notice>, StoreError> {
        let limit = i64::try_from(n).unwrap_or(i64::MAX);
        let rows = sqlx::query_as::<_, Notice>(&format!(
            r#"SELECT {NOTICE_COLUMNS} FROM "Notice" ORDER BY "createdAt" DESC, id DESC LIMIT $1"#
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn recent_for_digest(
        &self,
        since: DateTime<Utc>,
        excluded_source: Option<&str>,
    ) -> Result<Vec<Notice>, StoreError> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            r#"SELECT {NOTICE_COLUMNS} FROM "Notice" WHERE "createdAt" >= "#
        ));
        qb.push_bind(since);
        if let Some(source) = excluded_source {
            qb.push(r#" AND "sourceId" <> "#).push_bind(source.to_string());
        }
        qb.push(r#" ORDER BY "publishedDate" DESC NULLS LAST, "createdAt" DESC"#);

        let rows = qb.build_query_as::<Notice>().fetch_all(&self.pool).await?;
        Ok(rows)
    }

    async fn source_id_for(&self, name: &str) -> Result<String, StoreError> {
        sqlx::query(r#"INSERT INTO "Source" (id, name) VALUES ($1, $2) ON CONFLICT (name) DO NOTHING"#)
            .bind(Uuid::new_v4().to_string())
            .bind(name)
            .execute(&self.pool)
            .await?;

        let id: String = sqlx::query_scalar(r#"SELECT id FROM "Source" WHERE name = $1"#)
            .bind(name)
            .fetch_one(&self.pool)
            .await?;
        Ok(id)
    }
}

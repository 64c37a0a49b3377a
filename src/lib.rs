// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod config;
pub mod digest;
pub mod ingest;
pub mod model;
pub mod notify;
pub mod pipeline;
pub mod store;
pub mod text;

pub use crate::ingest::types::{SourceAdapter, SourceError};
pub use crate::model::Notice;
pub use crate::store::{NoticeStore, StoreError};

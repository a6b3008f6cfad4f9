pub mod authority;
pub mod builder;
pub mod cache;
pub mod config;
pub mod error;
pub mod index;
pub mod ingest;
pub mod persist;
pub mod query;
pub mod search;
pub mod stemmer;
pub mod tokenizer;

pub use builder::IndexBuilder;
pub use config::{CacheConfig, EngineConfig};
pub use error::{Error, Result};
pub use index::*;
pub use ingest::{ingest_page, Page};
pub use persist::{IndexPaths, SledStore, Store};
pub use search::{SearchEngine, SearchHit};
pub use tokenizer::Normalizer;

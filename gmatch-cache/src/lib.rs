// gmatch-cache: Queue and edge cache adapter
// JSON-encoded queue entries and compatibility edges in Redis, plus the
// distributed leadership lock used by the match scheduler.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod client;
pub mod error;
pub mod lock;
pub mod memory;
pub mod model;
pub mod ops;
pub mod repo;

pub use client::RedisCache;
pub use error::{CacheError, CacheResult};
pub use lock::CycleLock;
pub use memory::MemoryCache;
pub use model::{
    canonical_pair, edge_key, queue_key, BasicProfile, Edge, Gender, MatePreference, QueueEntry,
    SurveyVector, WeightVector, DIMENSION_COUNT, EDGE_PATTERN, LOCK_KEY, QUEUE_PATTERN,
    SURVEY_DIMENSIONS,
};
pub use ops::CacheOps;

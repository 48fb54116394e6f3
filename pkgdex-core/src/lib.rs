//! pkgdex core library
//!
//! Turns a paginated package registry API into a static catalog: one JSON
//! shard per leading letter plus an `all` shard, each written in every
//! configured encoding (plain JSON, gzip, brotli), and a small landing page
//! with the totals. Shard files a run does not produce are removed.

pub mod aggregate;
pub mod config;
pub mod emit;
pub mod error;
pub mod normalize;
pub mod output;
pub mod pipeline;
pub mod record;
pub mod registry;
pub mod render;

pub use aggregate::{shard_key, Shards, ALL_SHARD, DIGIT_SHARD};
pub use config::{ConfigFile, MissingCount, PipelineConfig, PipelineProfile, RunMode};
pub use emit::{EmitOutcome, Encoding, ShardWriter};
pub use error::CatalogError;
pub use normalize::{IgnoredPackages, Normalized, Normalizer};
pub use pipeline::{Pipeline, RunReport};
pub use record::CatalogRecord;

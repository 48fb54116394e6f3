//! Catalog pipeline error types
//!
//! Every variant here aborts the run. Per-record exclusions are not errors
//! and never surface through this type.

use std::path::PathBuf;
use thiserror::Error;

/// Fatal pipeline errors
#[derive(Error, Debug)]
pub enum CatalogError {
    /// Pagination finished without a single record
    #[error("Could not retrieve packages from {url}")]
    NoPackages { url: String },

    /// Pagination reached natural exhaustion below the plausibility floor
    #[error("Package retrieval incomplete: got {count} packages, expected at least {floor}")]
    RetrievalIncomplete { count: usize, floor: usize },

    /// A registry page could not be fetched
    #[error("Failed to fetch {url}")]
    Fetch {
        url: String,
        #[source]
        source: anyhow::Error,
    },

    /// A registry page was fetched but its records could not be decoded
    #[error("Malformed registry page {page} from {url}")]
    MalformedPage {
        url: String,
        page: u32,
        #[source]
        source: serde_json::Error,
    },

    /// Shard serialization failed
    #[error("Failed to serialize shard '{shard}'")]
    Serialize {
        shard: String,
        #[source]
        source: serde_json::Error,
    },

    /// Filesystem access failed
    #[error("I/O error at {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A background encoding task panicked or was cancelled
    #[error("Encoding task for shard '{shard}' did not complete")]
    Task {
        shard: String,
        #[source]
        source: tokio::task::JoinError,
    },

    /// Decoded artifact content differs from the canonical JSON artifact
    #[error("Artifact {path} does not match the canonical JSON encoding")]
    ArtifactMismatch { path: PathBuf },
}

impl CatalogError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CatalogError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T, E = CatalogError> = std::result::Result<T, E>;

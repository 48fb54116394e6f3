//! Registry access
//!
//! Everything that talks to the remote package registry: the raw record
//! shape it returns, the fetch seam with its response cache, and the
//! paginated retrieval loop.
//!
//! ```text
//! Registry API (?page=1, ?page=2, ...)
//!     │
//!     ▼
//! FetchClient (HTTP + .cache/)
//!     │
//!     ▼
//! Paginator ──► Vec<RawRecord>
//! ```

mod fetch;
mod paginator;
mod types;

pub use fetch::{FetchClient, HttpFetchClient};
pub use paginator::{page_url, Exhaustion, Pagination, Paginator};
pub use types::{RawMetadata, RawRecord};

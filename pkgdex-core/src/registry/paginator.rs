//! Paginated registry retrieval
//!
//! Pages are requested strictly in order (`?page=1`, `?page=2`, ...) because
//! the decision to continue depends on the previous page. An empty page (or
//! a body that is not an array) ends the loop; this is the normal way the
//! registry signals the end of its listing.

use serde_json::Value;
use tracing::{debug, info};

use super::{FetchClient, RawRecord};
use crate::error::{CatalogError, Result};

/// Why pagination stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exhaustion {
    /// The registry returned an empty page
    Natural,
    /// The configured page cap was reached first
    Capped,
}

/// Result of a full retrieval
#[derive(Debug, Clone)]
pub struct Pagination {
    pub records: Vec<RawRecord>,
    /// Pages that contributed records
    pub pages_fetched: u32,
    pub exhaustion: Exhaustion,
}

/// Drives the page loop and validates completeness
pub struct Paginator<'a> {
    client: &'a dyn FetchClient,
    page_cap: Option<u32>,
    min_packages: Option<usize>,
}

impl<'a> Paginator<'a> {
    pub fn new(client: &'a dyn FetchClient) -> Self {
        Self {
            client,
            page_cap: None,
            min_packages: None,
        }
    }

    /// Stop after `cap` pages even if the registry has more
    pub fn with_page_cap(mut self, cap: Option<u32>) -> Self {
        self.page_cap = cap;
        self
    }

    /// Require at least `floor` records when pagination runs to the end
    pub fn with_min_packages(mut self, floor: Option<usize>) -> Self {
        self.min_packages = floor;
        self
    }

    /// Fetch every page of `base_url`
    pub async fn fetch_all(&self, base_url: &str) -> Result<Pagination> {
        let mut records = Vec::new();
        let mut page: u32 = 1;

        let exhaustion = loop {
            if self.page_cap.is_some_and(|cap| page > cap) {
                debug!("Page cap reached after {} pages", page - 1);
                break Exhaustion::Capped;
            }

            let url = page_url(base_url, page);
            info!("Downloading {}", url);

            let body = self
                .client
                .get_json(&url)
                .await
                .map_err(|source| CatalogError::Fetch {
                    url: url.clone(),
                    source,
                })?;

            let items = match body {
                Value::Array(items) if !items.is_empty() => items,
                _ => {
                    debug!("Page {} is empty, registry exhausted", page);
                    break Exhaustion::Natural;
                }
            };

            for item in items {
                let record = serde_json::from_value::<RawRecord>(item).map_err(|source| {
                    CatalogError::MalformedPage {
                        url: url.clone(),
                        page,
                        source,
                    }
                })?;
                records.push(record);
            }

            page += 1;
        };

        let pages_fetched = page - 1;
        info!(
            "Retrieved {} packages from {} pages ({:?})",
            records.len(),
            pages_fetched,
            exhaustion
        );

        if records.is_empty() {
            return Err(CatalogError::NoPackages {
                url: base_url.to_string(),
            });
        }

        // A short listing is only suspicious when we actually reached the end
        if exhaustion == Exhaustion::Natural {
            if let Some(floor) = self.min_packages {
                if records.len() < floor {
                    return Err(CatalogError::RetrievalIncomplete {
                        count: records.len(),
                        floor,
                    });
                }
            }
        }

        Ok(Pagination {
            records,
            pages_fetched,
            exhaustion,
        })
    }
}

/// Build the URL for one page of a registry listing
pub fn page_url(base_url: &str, page: u32) -> String {
    let separator = if base_url.contains('?') { '&' } else { '?' };
    format!("{base_url}{separator}page={page}")
}

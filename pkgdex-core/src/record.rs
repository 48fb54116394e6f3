//! The published catalog record

use serde::{Deserialize, Serialize};

/// One package as it appears in the published shards
///
/// Field order is the serialized order. Absent optionals are omitted, never
/// written as `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogRecord {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub downloads: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stars: Option<u64>,

    /// Only set for theme packages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
}

impl CatalogRecord {
    /// A record carrying only its name
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            version: None,
            downloads: None,
            stars: None,
            theme: None,
        }
    }
}

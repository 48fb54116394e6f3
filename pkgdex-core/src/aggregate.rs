//! Shard grouping
//!
//! Each record lands in exactly one letter shard derived from its name, and
//! every record also lands in the reserved `all` shard.

use std::collections::BTreeMap;

use crate::record::CatalogRecord;

/// Shard holding every record
pub const ALL_SHARD: &str = "all";

/// Shared shard for names starting with a digit
pub const DIGIT_SHARD: &str = "0-9";

/// Names filed under a shard other than their first character
const SHARD_OVERRIDES: &[(&str, &str)] = &[("-vimes45-syntax", "v")];

/// Derive the letter shard for a package name
pub fn shard_key(name: &str) -> String {
    if let Some((_, key)) = SHARD_OVERRIDES.iter().find(|(n, _)| *n == name) {
        return key.to_string();
    }

    match name.chars().next() {
        Some(first) if first.is_ascii_digit() => DIGIT_SHARD.to_string(),
        Some(first) => first.to_lowercase().collect(),
        None => DIGIT_SHARD.to_string(),
    }
}

/// Records partitioned by shard key, `all` included
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Shards {
    groups: BTreeMap<String, Vec<CatalogRecord>>,
}

impl Shards {
    /// Partition `records` into letter shards plus `all`
    pub fn group(records: Vec<CatalogRecord>) -> Self {
        let mut groups: BTreeMap<String, Vec<CatalogRecord>> = BTreeMap::new();

        for record in &records {
            groups
                .entry(shard_key(&record.name))
                .or_default()
                .push(record.clone());
        }

        tracing::debug!(
            "Grouped {} packages into {} letter shards",
            records.len(),
            groups.len()
        );

        groups.insert(ALL_SHARD.to_string(), records);
        Self { groups }
    }

    pub fn get(&self, key: &str) -> Option<&[CatalogRecord]> {
        self.groups.get(key).map(Vec::as_slice)
    }

    /// The `all` shard
    pub fn all(&self) -> &[CatalogRecord] {
        self.get(ALL_SHARD).unwrap_or_default()
    }

    /// Shard keys in ascending order, `all` included
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    /// Letter shards only
    pub fn letter_shards(&self) -> impl Iterator<Item = (&str, &[CatalogRecord])> {
        self.groups
            .iter()
            .filter(|(key, _)| key.as_str() != ALL_SHARD)
            .map(|(key, records)| (key.as_str(), records.as_slice()))
    }

    /// Number of shards, `all` included
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn into_inner(self) -> BTreeMap<String, Vec<CatalogRecord>> {
        self.groups
    }
}

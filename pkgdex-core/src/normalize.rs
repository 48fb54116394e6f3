//! Record normalization
//!
//! Maps raw registry records to catalog records. Exclusion rules run first;
//! a record that matches any of them is dropped and its name is collected in
//! the run's [`IgnoredPackages`] accumulator.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use tracing::{debug, info};

use crate::config::{MissingCount, PipelineConfig};
use crate::record::CatalogRecord;
use crate::registry::RawRecord;

/// Packages that are known to be broken
pub const DENYLIST: &[&str] = &["☃", "0.1.0"];

/// Descriptions generated by package templates and never edited
pub const PLACEHOLDER_DESCRIPTIONS: &[&str] = &[
    "A short description of your package",
    "A short description of your syntax theme",
    "A short description of your theme",
    "A short description of your UI theme",
];

static INVALID_NAME_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9_-]").expect("valid name character pattern"));

static SPAM_TOKENS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(slot|casino)\b").expect("valid spam token pattern"));

/// Why a record was dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exclusion {
    EmptyName,
    Denylisted,
    InvalidCharacters,
    SpamToken,
}

impl fmt::Display for Exclusion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Exclusion::EmptyName => "empty name",
            Exclusion::Denylisted => "denylisted",
            Exclusion::InvalidCharacters => "invalid characters in name",
            Exclusion::SpamToken => "spam token in name",
        };
        f.write_str(reason)
    }
}

/// Distinct names dropped during one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IgnoredPackages {
    names: BTreeSet<String>,
}

impl IgnoredPackages {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a dropped name; returns false if it was already recorded
    pub fn record(&mut self, name: &str) -> bool {
        self.names.insert(name.to_string())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

/// Output of normalizing a whole retrieval
#[derive(Debug, Clone, Default)]
pub struct Normalized {
    pub records: Vec<CatalogRecord>,
    pub ignored: IgnoredPackages,
}

/// Applies exclusion rules and field coercion
#[derive(Debug, Clone)]
pub struct Normalizer {
    strict_names: bool,
    missing_counts: MissingCount,
}

impl Normalizer {
    pub fn new(strict_names: bool, missing_counts: MissingCount) -> Self {
        Self {
            strict_names,
            missing_counts,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.strict_names, config.missing_counts)
    }

    /// First exclusion rule matching `name`, if any
    pub fn exclusion(&self, name: &str) -> Option<Exclusion> {
        if name.is_empty() {
            return Some(Exclusion::EmptyName);
        }
        if DENYLIST.contains(&name) {
            return Some(Exclusion::Denylisted);
        }
        if self.strict_names {
            if INVALID_NAME_CHARS.is_match(name) {
                return Some(Exclusion::InvalidCharacters);
            }
            if SPAM_TOKENS.is_match(name) {
                return Some(Exclusion::SpamToken);
            }
        }
        None
    }

    /// Map one raw record to a catalog record, or `None` if it is excluded
    pub fn normalize(&self, raw: &RawRecord) -> Option<CatalogRecord> {
        if self.exclusion(&raw.name).is_some() {
            return None;
        }

        let metadata = raw.metadata.as_ref();

        Some(CatalogRecord {
            name: raw.name.clone(),
            description: metadata
                .and_then(|m| m.description())
                .and_then(clean_description),
            version: metadata.and_then(|m| m.version()),
            downloads: self.coerce_count(raw.downloads.as_ref()),
            stars: self.coerce_count(raw.stargazers_count.as_ref()),
            theme: metadata
                .and_then(|m| m.theme())
                .filter(|theme| !theme.is_empty())
                .map(str::to_string),
        })
    }

    /// Normalize a full retrieval, collecting the names of dropped records
    ///
    /// Names stay unique: when pages overlap, the first occurrence wins.
    pub fn normalize_all<I>(&self, raws: I) -> Normalized
    where
        I: IntoIterator<Item = RawRecord>,
    {
        let mut normalized = Normalized::default();
        let mut seen = HashSet::new();

        for raw in raws {
            if let Some(reason) = self.exclusion(&raw.name) {
                info!("Ignoring package {} ({})", raw.name, reason);
                normalized.ignored.record(&raw.name);
                continue;
            }
            if !seen.insert(raw.name.clone()) {
                debug!("Duplicate package {} in registry listing", raw.name);
                continue;
            }
            if let Some(record) = self.normalize(&raw) {
                normalized.records.push(record);
            }
        }

        debug!(
            "Normalized {} packages, ignored {}",
            normalized.records.len(),
            normalized.ignored.len()
        );
        normalized
    }

    fn coerce_count(&self, value: Option<&Value>) -> Option<u64> {
        parse_count(value).or(match self.missing_counts {
            MissingCount::Absent => None,
            MissingCount::Zero => Some(0),
        })
    }
}

/// Trimmed description, or `None` when empty or a template placeholder
fn clean_description(description: &str) -> Option<String> {
    let trimmed = description.trim();
    if trimmed.is_empty() || PLACEHOLDER_DESCRIPTIONS.contains(&trimmed) {
        return None;
    }
    Some(trimmed.to_string())
}

/// Non-negative whole number from a JSON number or numeric string
fn parse_count(value: Option<&Value>) -> Option<u64> {
    match value? {
        Value::Number(number) => number
            .as_u64()
            .or_else(|| number.as_f64().and_then(whole_number)),
        Value::String(text) => {
            let text = text.trim();
            text.parse::<u64>()
                .ok()
                .or_else(|| text.parse::<f64>().ok().and_then(whole_number))
        }
        _ => None,
    }
}

fn whole_number(value: f64) -> Option<u64> {
    (value.is_finite() && value >= 0.0 && value.fract() == 0.0 && value <= u64::MAX as f64)
        .then_some(value as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::RawMetadata;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn raw(value: Value) -> RawRecord {
        serde_json::from_value(value).unwrap()
    }

    fn strict() -> Normalizer {
        Normalizer::new(true, MissingCount::Zero)
    }

    fn relaxed() -> Normalizer {
        Normalizer::new(false, MissingCount::Absent)
    }

    #[test]
    fn test_denylist_always_applies() {
        for name in DENYLIST {
            assert_eq!(strict().exclusion(name), Some(Exclusion::Denylisted));
            assert_eq!(relaxed().exclusion(name), Some(Exclusion::Denylisted));
        }
    }

    #[test]
    fn test_strict_name_filters() {
        let normalizer = strict();
        assert_eq!(normalizer.exclusion("atom-beautify"), None);
        assert_eq!(normalizer.exclusion("language_rust2"), None);
        assert_eq!(
            normalizer.exclusion("Minimap"),
            Some(Exclusion::InvalidCharacters)
        );
        assert_eq!(
            normalizer.exclusion("my.package"),
            Some(Exclusion::InvalidCharacters)
        );
        assert_eq!(
            normalizer.exclusion("best-casino-online"),
            Some(Exclusion::SpamToken)
        );
        assert_eq!(normalizer.exclusion("slot"), Some(Exclusion::SpamToken));
        // Whole words only
        assert_eq!(normalizer.exclusion("slotted-tabs"), None);
        assert_eq!(normalizer.exclusion("slot_machine"), None);
    }

    #[test]
    fn test_relaxed_skips_strict_filters() {
        let normalizer = relaxed();
        assert_eq!(normalizer.exclusion("Minimap"), None);
        assert_eq!(normalizer.exclusion("best-casino-online"), None);
        assert_eq!(normalizer.exclusion(""), Some(Exclusion::EmptyName));
    }

    #[test]
    fn test_non_object_metadata_keeps_record() {
        let record = strict()
            .normalize(&raw(json!({ "name": "beta", "metadata": "broken", "downloads": 4 })))
            .unwrap();

        assert_eq!(
            record,
            CatalogRecord {
                downloads: Some(4),
                stars: Some(0),
                ..CatalogRecord::named("beta")
            }
        );
    }

    #[test]
    fn test_numeric_version_passes_through() {
        let record = relaxed()
            .normalize(&raw(json!({ "name": "beta", "metadata": { "version": 2 } })))
            .unwrap();
        assert_eq!(record.version.as_deref(), Some("2"));
    }

    #[test]
    fn test_field_mapping() {
        let record = relaxed()
            .normalize(&raw(json!({
                "name": "one-dark-ui",
                "metadata": {
                    "description": "  A dark UI theme  ",
                    "version": "1.12.5",
                    "theme": "ui"
                },
                "downloads": "1500",
                "stargazers_count": 42
            })))
            .unwrap();

        assert_eq!(
            record,
            CatalogRecord {
                name: "one-dark-ui".to_string(),
                description: Some("A dark UI theme".to_string()),
                version: Some("1.12.5".to_string()),
                downloads: Some(1500),
                stars: Some(42),
                theme: Some("ui".to_string()),
            }
        );
    }

    #[test]
    fn test_placeholder_description_is_absent() {
        for placeholder in PLACEHOLDER_DESCRIPTIONS {
            let record = relaxed()
                .normalize(&RawRecord {
                    name: "fresh".to_string(),
                    metadata: Some(RawMetadata {
                        description: Some(json!(format!(" {placeholder}\n"))),
                        ..Default::default()
                    }),
                    ..Default::default()
                })
                .unwrap();
            assert_eq!(record.description, None);
        }
    }

    #[test]
    fn test_missing_counts_policy() {
        let input = raw(json!({ "name": "quiet" }));

        let absent = relaxed().normalize(&input).unwrap();
        assert_eq!(absent.downloads, None);
        assert_eq!(absent.stars, None);

        let zero = Normalizer::new(false, MissingCount::Zero)
            .normalize(&input)
            .unwrap();
        assert_eq!(zero.downloads, Some(0));
        assert_eq!(zero.stars, Some(0));
    }

    #[test]
    fn test_malformed_counts_follow_missing_policy() {
        let input = raw(json!({
            "name": "weird",
            "downloads": "lots",
            "stargazers_count": -3
        }));

        let absent = relaxed().normalize(&input).unwrap();
        assert_eq!(absent.downloads, None);
        assert_eq!(absent.stars, None);

        let zero = strict().normalize(&input).unwrap();
        assert_eq!(zero.downloads, Some(0));
        assert_eq!(zero.stars, Some(0));
    }

    #[test]
    fn test_count_coercion() {
        assert_eq!(parse_count(Some(&json!(7))), Some(7));
        assert_eq!(parse_count(Some(&json!(7.0))), Some(7));
        assert_eq!(parse_count(Some(&json!(7.5))), None);
        assert_eq!(parse_count(Some(&json!(" 12 "))), Some(12));
        assert_eq!(parse_count(Some(&json!("1e3"))), Some(1000));
        assert_eq!(parse_count(Some(&json!("NaN"))), None);
        assert_eq!(parse_count(Some(&json!(""))), None);
        assert_eq!(parse_count(Some(&json!(true))), None);
        assert_eq!(parse_count(None), None);
    }

    #[test]
    fn test_empty_theme_is_absent() {
        let record = relaxed()
            .normalize(&raw(json!({ "name": "plain", "metadata": { "theme": "" } })))
            .unwrap();
        assert_eq!(record.theme, None);
    }

    #[test]
    fn test_normalize_all_collects_ignored() {
        let normalized = strict().normalize_all(vec![
            raw(json!({ "name": "alpha" })),
            raw(json!({ "name": "0.1.0" })),
            raw(json!({ "name": "0.1.0" })),
            raw(json!({ "name": "Bad Name" })),
            raw(json!({ "name": "beta" })),
        ]);

        let names: Vec<_> = normalized.records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "beta"]);
        assert_eq!(normalized.ignored.len(), 2);
        assert!(normalized.ignored.contains("0.1.0"));
        assert!(normalized.ignored.contains("Bad Name"));
    }

    #[test]
    fn test_normalize_all_keeps_first_duplicate() {
        let normalized = relaxed().normalize_all(vec![
            raw(json!({ "name": "alpha", "downloads": 1 })),
            raw(json!({ "name": "alpha", "downloads": 2 })),
        ]);

        assert_eq!(normalized.records.len(), 1);
        assert_eq!(normalized.records[0].downloads, Some(1));
        assert!(normalized.ignored.is_empty());
    }
}

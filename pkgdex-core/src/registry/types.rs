//! Raw registry records
//!
//! The registry is only partially trusted, so every field except `name` is
//! kept as loosely typed JSON and interpreted during normalization.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// One package as returned by a registry page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    /// Registry-unique package identifier
    #[serde(default)]
    pub name: String,

    /// Anything other than an object is treated as missing
    #[serde(default, deserialize_with = "lenient_metadata")]
    pub metadata: Option<RawMetadata>,

    /// Number or numeric string
    #[serde(default)]
    pub downloads: Option<Value>,

    /// Number or numeric string
    #[serde(default)]
    pub stargazers_count: Option<Value>,
}

/// The package's own metadata block
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawMetadata {
    #[serde(default)]
    pub description: Option<Value>,

    #[serde(default)]
    pub version: Option<Value>,

    #[serde(default)]
    pub theme: Option<Value>,
}

impl RawMetadata {
    pub fn description(&self) -> Option<&str> {
        Self::text(&self.description)
    }

    /// Version string; numeric versions are rendered as text
    pub fn version(&self) -> Option<String> {
        match self.version.as_ref()? {
            Value::String(text) => Some(text.clone()),
            Value::Number(number) => Some(number.to_string()),
            _ => None,
        }
    }

    pub fn theme(&self) -> Option<&str> {
        Self::text(&self.theme)
    }

    /// Only string values count; anything else is treated as missing
    fn text(value: &Option<Value>) -> Option<&str> {
        value.as_ref().and_then(Value::as_str)
    }
}

fn lenient_metadata<'de, D>(deserializer: D) -> Result<Option<RawMetadata>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|value| match value {
        Value::Object(_) => serde_json::from_value(value).ok(),
        _ => None,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_full_record() {
        let record: RawRecord = serde_json::from_value(json!({
            "name": "minimap",
            "metadata": {
                "description": "A preview of the full source code.",
                "version": "4.40.0",
                "theme": null,
                "engines": { "atom": ">=1.0.0" }
            },
            "downloads": "12345",
            "stargazers_count": 7,
            "readme": "ignored"
        }))
        .unwrap();

        assert_eq!(record.name, "minimap");
        let metadata = record.metadata.unwrap();
        assert_eq!(metadata.version().as_deref(), Some("4.40.0"));
        assert_eq!(metadata.theme(), None);
        assert_eq!(record.downloads, Some(json!("12345")));
        assert_eq!(record.stargazers_count, Some(json!(7)));
    }

    #[test]
    fn test_non_string_metadata_is_missing() {
        let record: RawRecord = serde_json::from_value(json!({
            "name": "odd",
            "metadata": { "version": ["3"], "description": ["a"], "theme": 1 }
        }))
        .unwrap();

        let metadata = record.metadata.unwrap();
        assert_eq!(metadata.version(), None);
        assert_eq!(metadata.description(), None);
        assert_eq!(metadata.theme(), None);
    }

    #[test]
    fn test_numeric_version_is_kept_as_text() {
        let record: RawRecord = serde_json::from_value(json!({
            "name": "odd",
            "metadata": { "version": 3 }
        }))
        .unwrap();

        assert_eq!(record.metadata.unwrap().version().as_deref(), Some("3"));
    }

    #[test]
    fn test_non_object_metadata_is_missing() {
        for metadata in [json!("broken"), json!(["a"]), json!(7), json!(true)] {
            let record: RawRecord = serde_json::from_value(json!({
                "name": "beta",
                "metadata": metadata,
                "downloads": 2
            }))
            .unwrap();

            assert_eq!(record.name, "beta");
            assert_eq!(record.metadata, None);
            assert_eq!(record.downloads, Some(json!(2)));
        }
    }

    #[test]
    fn test_missing_fields_default() {
        let record: RawRecord = serde_json::from_value(json!({})).unwrap();
        assert_eq!(record, RawRecord::default());
    }
}

//! Pipeline configuration
//!
//! The catalog has two pipeline generations that differ only in a handful of
//! switches. Both are expressed as a [`PipelineProfile`] which expands into a
//! fully explicit [`PipelineConfig`].
//!
//! ## Configuration Sources (in precedence order)
//!
//! 1. CLI flags
//! 2. `pkgdex.yml` in the working directory (or `--config <path>`)
//! 3. Profile defaults
//!
//! ```yaml
//! profile: legacy
//! registry_url: https://api.pulsar-edit.dev/api/packages
//! output_dir: public
//! encodings: [json, gzip]
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::emit::Encoding;

/// Default registry endpoint
pub const DEFAULT_REGISTRY_URL: &str = "https://api.pulsar-edit.dev/api/packages";

/// Default output directory for published artifacts
pub const DEFAULT_OUTPUT_DIR: &str = "public";

/// Default on-disk response cache directory
pub const DEFAULT_CACHE_DIR: &str = ".cache";

/// Default config file name
pub const DEFAULT_CONFIG_FILE: &str = "pkgdex.yml";

/// Page cap for interactive runs
pub const INTERACTIVE_PAGE_CAP: u32 = 5;

/// Smallest registry size the legacy pipeline accepts as complete
pub const LEGACY_MIN_PACKAGES: usize = 415;

/// Environment variables that mark an automated build
const CI_ENV_VARS: &[&str] = &["CI", "CONTINUOUS_INTEGRATION", "BUILD_NUMBER", "RUN_ID"];

/// Pipeline generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineProfile {
    /// Strict name filters, zero-filled counters, gzip only, completeness floor
    Legacy,
    /// Relaxed filters, absent counters, gzip and brotli, no floor
    #[default]
    Current,
}

/// What a missing or malformed counter becomes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingCount {
    /// Omitted from the serialized record
    Absent,
    /// Serialized as `0`
    Zero,
}

/// Whether the run is an automated build or a local iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Automated,
    Interactive,
}

impl RunMode {
    /// Detect the run mode from the process environment
    pub fn detect() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Detect the run mode using a custom variable lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let automated = CI_ENV_VARS.iter().any(|key| match lookup(key) {
            Some(value) => !matches!(value.trim().to_ascii_lowercase().as_str(), "" | "0" | "false"),
            None => false,
        });

        if automated {
            RunMode::Automated
        } else {
            RunMode::Interactive
        }
    }

    /// Page cap applied to pagination in this mode
    pub fn page_cap(self) -> Option<u32> {
        match self {
            RunMode::Automated => None,
            RunMode::Interactive => Some(INTERACTIVE_PAGE_CAP),
        }
    }
}

/// Fully resolved pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Paginated registry endpoint (without the `page` query)
    pub registry_url: String,

    /// Directory receiving shards, index.html and favicon.svg
    pub output_dir: PathBuf,

    /// Directory for the fetch client's response cache
    pub cache_dir: PathBuf,

    /// Ignore cached responses and refetch every page
    pub refresh: bool,

    /// Maximum number of pages to request, `None` for unbounded
    pub page_cap: Option<u32>,

    /// Enable the character-set and spam-token name filters
    pub strict_names: bool,

    /// Policy for missing or malformed counters
    pub missing_counts: MissingCount,

    /// Encodings written for every shard
    pub encodings: Vec<Encoding>,

    /// Completeness floor checked after natural exhaustion
    pub min_packages: Option<usize>,

    /// Custom landing page template
    pub template: Option<PathBuf>,

    /// Custom favicon source
    pub favicon: Option<PathBuf>,
}

impl PipelineConfig {
    /// Build the configuration for a profile in the given run mode
    pub fn for_profile(profile: PipelineProfile, mode: RunMode) -> Self {
        let (strict_names, missing_counts, encodings, min_packages) = match profile {
            PipelineProfile::Legacy => (
                true,
                MissingCount::Zero,
                vec![Encoding::Json, Encoding::Gzip],
                Some(LEGACY_MIN_PACKAGES),
            ),
            PipelineProfile::Current => (
                false,
                MissingCount::Absent,
                vec![Encoding::Json, Encoding::Gzip, Encoding::Brotli],
                None,
            ),
        };

        Self {
            registry_url: DEFAULT_REGISTRY_URL.to_string(),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            refresh: false,
            page_cap: mode.page_cap(),
            strict_names,
            missing_counts,
            encodings,
            min_packages,
            template: None,
            favicon: None,
        }
    }
}

/// Optional overrides read from `pkgdex.yml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default)]
    pub profile: Option<PipelineProfile>,

    #[serde(default)]
    pub registry_url: Option<String>,

    #[serde(default)]
    pub output_dir: Option<PathBuf>,

    #[serde(default)]
    pub cache_dir: Option<PathBuf>,

    /// Overrides the run-mode page cap; `0` means unbounded
    #[serde(default)]
    pub page_cap: Option<u32>,

    #[serde(default)]
    pub strict_names: Option<bool>,

    #[serde(default)]
    pub missing_counts: Option<MissingCount>,

    #[serde(default)]
    pub encodings: Option<Vec<Encoding>>,

    #[serde(default)]
    pub min_packages: Option<usize>,

    #[serde(default)]
    pub template: Option<PathBuf>,

    #[serde(default)]
    pub favicon: Option<PathBuf>,
}

impl ConfigFile {
    /// Load overrides from a YAML file; a missing file yields no overrides
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;

        Self::from_yaml(&content)
            .with_context(|| format!("Failed to parse config: {}", path.display()))
    }

    /// Parse overrides from a YAML string
    pub fn from_yaml(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml_ng::from_str(content).context("Invalid pkgdex config YAML")
    }

    /// Resolve a full configuration, `profile` taking precedence over the file's
    pub fn resolve(&self, profile: Option<PipelineProfile>, mode: RunMode) -> PipelineConfig {
        let profile = profile.or(self.profile).unwrap_or_default();
        let mut config = PipelineConfig::for_profile(profile, mode);

        if let Some(url) = &self.registry_url {
            config.registry_url = url.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if let Some(dir) = &self.cache_dir {
            config.cache_dir = dir.clone();
        }
        if let Some(cap) = self.page_cap {
            config.page_cap = (cap > 0).then_some(cap);
        }
        if let Some(strict) = self.strict_names {
            config.strict_names = strict;
        }
        if let Some(policy) = self.missing_counts {
            config.missing_counts = policy;
        }
        if let Some(encodings) = &self.encodings {
            config.encodings = encodings.clone();
        }
        if let Some(floor) = self.min_packages {
            config.min_packages = (floor > 0).then_some(floor);
        }
        if self.template.is_some() {
            config.template = self.template.clone();
        }
        if self.favicon.is_some() {
            config.favicon = self.favicon.clone();
        }

        config
    }
}

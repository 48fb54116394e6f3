//! Shared helpers for pipeline integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use pkgdex_core::{Encoding, MissingCount, PipelineConfig, PipelineProfile, RunMode};
use serde_json::Value;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Once;

/// Initialize logging for tests (only once per test run)
static INIT: Once = Once::new();

pub fn init_test_logging() {
    INIT.call_once(|| {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        let _ = tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_test_writer()
                    .with_target(true)
                    .with_level(true),
            )
            .with(tracing_subscriber::filter::EnvFilter::from_default_env())
            .try_init();
    });
}

pub const REGISTRY_URL: &str = "https://registry.test/api/packages";

/// In-memory registry serving `?page=N` from a list of pages
pub struct StaticRegistry {
    pages: Vec<Value>,
    requests: AtomicUsize,
}

impl StaticRegistry {
    pub fn new(pages: Vec<Value>) -> Self {
        Self {
            pages,
            requests: AtomicUsize::new(0),
        }
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl pkgdex_core::registry::FetchClient for StaticRegistry {
    async fn get_json(&self, url: &str) -> anyhow::Result<Value> {
        self.requests.fetch_add(1, Ordering::SeqCst);

        let page: usize = url
            .rsplit("page=")
            .next()
            .and_then(|p| p.parse().ok())
            .ok_or_else(|| anyhow::anyhow!("no page in {url}"))?;

        Ok(self
            .pages
            .get(page - 1)
            .cloned()
            .unwrap_or_else(|| Value::Array(Vec::new())))
    }
}

/// Current-profile config writing into `output`, uncapped, no floor
pub fn test_config(output: &Path) -> PipelineConfig {
    let mut config = PipelineConfig::for_profile(PipelineProfile::Current, RunMode::Automated);
    config.registry_url = REGISTRY_URL.to_string();
    config.output_dir = output.to_path_buf();
    config.cache_dir = output.join(".cache");
    config
}

/// Legacy-profile config writing into `output`
pub fn legacy_config(output: &Path) -> PipelineConfig {
    let mut config = test_config(output);
    let legacy = PipelineConfig::for_profile(PipelineProfile::Legacy, RunMode::Automated);
    config.strict_names = legacy.strict_names;
    config.missing_counts = MissingCount::Zero;
    config.encodings = vec![Encoding::Json, Encoding::Gzip];
    config.min_packages = legacy.min_packages;
    config
}

/// Read a shard's JSON artifact as parsed records
pub fn read_shard(output: &Path, key: &str) -> Value {
    let content = std::fs::read_to_string(output.join(format!("{key}.json")))
        .unwrap_or_else(|e| panic!("missing shard {key}: {e}"));
    serde_json::from_str(&content).unwrap()
}

/// Names in a shard, in file order
pub fn shard_names(output: &Path, key: &str) -> Vec<String> {
    read_shard(output, key)
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["name"].as_str().unwrap().to_string())
        .collect()
}

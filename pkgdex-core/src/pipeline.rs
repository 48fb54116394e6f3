//! Catalog build pipeline
//!
//! ```text
//! Paginator ──► Normalizer ──► Shards::group ──► ShardWriter (per shard, concurrent)
//!                                                      │
//!                                                      ▼
//!                                         index.html + favicon.svg
//! ```
//!
//! Nothing is written into the output directory until the full record set
//! has been retrieved, normalized and grouped.

use anyhow::Context;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::info;

use crate::aggregate::Shards;
use crate::config::PipelineConfig;
use crate::emit::{EmitOutcome, ShardWriter};
use crate::error::Result;
use crate::normalize::Normalizer;
use crate::output::OutputDir;
use crate::registry::{Exhaustion, FetchClient, HttpFetchClient, Paginator};
use crate::render::{write_site, PageRenderer, Renderer, Summary};

/// What a finished run produced
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Records published in the `all` shard
    pub total: usize,
    /// Distinct names dropped by the exclusion rules
    pub ignored: usize,
    pub pages_fetched: u32,
    pub exhaustion: Exhaustion,
    pub shards: Vec<EmitOutcome>,
    pub generated_at: DateTime<Utc>,
}

impl RunReport {
    pub fn shards_written(&self) -> usize {
        self.shards.iter().filter(|s| s.is_written()).count()
    }

    pub fn shards_skipped(&self) -> usize {
        self.shards.len() - self.shards_written()
    }
}

/// One catalog build
pub struct Pipeline {
    config: PipelineConfig,
    client: Arc<dyn FetchClient>,
    renderer: Option<Arc<dyn Renderer>>,
}

impl Pipeline {
    /// Build a pipeline using the HTTP client and response cache from `config`
    pub fn from_config(config: PipelineConfig) -> anyhow::Result<Self> {
        let client = HttpFetchClient::with_cache(&config.cache_dir, config.refresh)
            .context("Failed to initialize registry client")?;
        Ok(Self::with_client(config, Arc::new(client)))
    }

    /// Build a pipeline around a custom fetch client
    pub fn with_client(config: PipelineConfig, client: Arc<dyn FetchClient>) -> Self {
        Self {
            config,
            client,
            renderer: None,
        }
    }

    /// Use a custom renderer instead of the configured template
    pub fn with_renderer(mut self, renderer: Arc<dyn Renderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the full build
    pub async fn run(&self) -> Result<RunReport> {
        let renderer: Arc<dyn Renderer> = match &self.renderer {
            Some(renderer) => Arc::clone(renderer),
            None => Arc::new(PageRenderer::load(self.config.template.as_deref()).await?),
        };

        let output = OutputDir::acquire(&self.config.output_dir).await?;

        let pagination = Paginator::new(self.client.as_ref())
            .with_page_cap(self.config.page_cap)
            .with_min_packages(self.config.min_packages)
            .fetch_all(&self.config.registry_url)
            .await?;

        let normalized = Normalizer::from_config(&self.config).normalize_all(pagination.records);
        let total = normalized.records.len();
        let ignored = normalized.ignored.len();

        let shards = Shards::group(normalized.records);
        let writer = ShardWriter::new(output.path(), &self.config.encodings);
        writer.prune_stale(&shards).await?;
        let outcomes = writer.emit_all(shards).await?;

        let generated_at = Utc::now();
        let summary = Summary::new(total, ignored, generated_at);
        write_site(
            &output,
            renderer.as_ref(),
            &summary,
            self.config.favicon.as_deref(),
        )
        .await?;

        info!(
            "Catalog built: {} packages, {} ignored, {} shards",
            total,
            ignored,
            outcomes.len()
        );

        Ok(RunReport {
            total,
            ignored,
            pages_fetched: pagination.pages_fetched,
            exhaustion: pagination.exhaustion,
            shards: outcomes,
            generated_at,
        })
    }
}

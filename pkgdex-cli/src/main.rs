//! pkgdex - static package catalog builder
//!
//! Main entry point: builds the catalog from the registry, or verifies a
//! previously published output directory.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use pkgdex_core::config::DEFAULT_CONFIG_FILE;
use pkgdex_core::emit::verify_shard;
use pkgdex_core::{ConfigFile, Encoding, Pipeline, PipelineConfig, PipelineProfile, RunMode};

/// Log levels
#[derive(Debug, Clone, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_filter_directive(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Pipeline generation
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Profile {
    Legacy,
    Current,
}

impl From<Profile> for PipelineProfile {
    fn from(profile: Profile) -> Self {
        match profile {
            Profile::Legacy => PipelineProfile::Legacy,
            Profile::Current => PipelineProfile::Current,
        }
    }
}

/// Run mode override
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mode {
    /// Detect from CI environment variables
    Auto,
    /// Automated build: paginate to the end
    Ci,
    /// Local iteration: stop after a few pages
    Local,
}

impl Mode {
    fn resolve(self) -> RunMode {
        match self {
            Mode::Auto => RunMode::detect(),
            Mode::Ci => RunMode::Automated,
            Mode::Local => RunMode::Interactive,
        }
    }
}

#[derive(Parser, Debug)]
#[clap(
    name = "pkgdex",
    about = "Build a static, sharded JSON catalog from a package registry",
    version
)]
struct Cli {
    #[clap(subcommand)]
    command: Command,

    /// Set log level
    #[clap(long, default_value = "info", global = true)]
    log_level: LogLevel,

    /// Emit logs as JSON
    #[clap(long, global = true)]
    log_json: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch the registry and write the catalog
    Build(BuildArgs),

    /// Check that every compressed shard decodes to its JSON shard
    Verify {
        /// Directory containing published shards
        #[clap(long, default_value = "public")]
        output: PathBuf,

        /// Encodings to check (comma-separated)
        #[clap(long, value_delimiter = ',', default_value = "gzip,brotli")]
        encodings: Vec<Encoding>,
    },
}

#[derive(Args, Debug)]
struct BuildArgs {
    /// Config file
    #[clap(long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Pipeline generation
    #[clap(long, value_enum)]
    profile: Option<Profile>,

    /// Run mode (controls the page cap)
    #[clap(long, value_enum, default_value = "auto")]
    mode: Mode,

    /// Registry endpoint
    #[clap(long)]
    registry_url: Option<String>,

    /// Output directory
    #[clap(long)]
    output: Option<PathBuf>,

    /// Response cache directory
    #[clap(long)]
    cache_dir: Option<PathBuf>,

    /// Ignore cached registry responses
    #[clap(long)]
    refresh: bool,

    /// Maximum pages to fetch (0 for unbounded)
    #[clap(long)]
    max_pages: Option<u32>,

    /// Shard encodings (comma-separated: json,gzip,brotli)
    #[clap(long, value_delimiter = ',')]
    encodings: Option<Vec<Encoding>>,

    /// Landing page template
    #[clap(long)]
    template: Option<PathBuf>,

    /// Favicon source
    #[clap(long)]
    favicon: Option<PathBuf>,
}

impl BuildArgs {
    /// Merge flags over the config file and profile defaults
    fn resolve(&self, file: &ConfigFile) -> PipelineConfig {
        let mut config = file.resolve(self.profile.map(Into::into), self.mode.resolve());

        if let Some(url) = &self.registry_url {
            config.registry_url = url.clone();
        }
        if let Some(output) = &self.output {
            config.output_dir = output.clone();
        }
        if let Some(cache_dir) = &self.cache_dir {
            config.cache_dir = cache_dir.clone();
        }
        if let Some(max_pages) = self.max_pages {
            config.page_cap = (max_pages > 0).then_some(max_pages);
        }
        if let Some(encodings) = &self.encodings {
            config.encodings = encodings.clone();
        }
        if self.template.is_some() {
            config.template = self.template.clone();
        }
        if self.favicon.is_some() {
            config.favicon = self.favicon.clone();
        }
        config.refresh = self.refresh;

        config
    }
}

/// Initialize tracing with CLI flags
fn initialize_tracing(log_level: &LogLevel, json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_filter_directive()));

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    initialize_tracing(&cli.log_level, cli.log_json);

    match cli.command {
        Command::Build(args) => build_command(args).await,
        Command::Verify { output, encodings } => verify_command(&output, &encodings).await,
    }
}

async fn build_command(args: BuildArgs) -> Result<()> {
    let file = ConfigFile::load(&args.config)?;
    let config = args.resolve(&file);

    info!(
        "Building catalog from {} into {} (page cap: {:?})",
        config.registry_url,
        config.output_dir.display(),
        config.page_cap
    );

    let pipeline = Pipeline::from_config(config)?;
    let report = pipeline.run().await.context("Catalog build failed")?;

    println!(
        "Published {} packages ({} ignored) in {} shards",
        report.total,
        report.ignored,
        report.shards_written()
    );
    if report.shards_skipped() > 0 {
        println!("Skipped {} shards with unusable names", report.shards_skipped());
    }

    Ok(())
}

async fn verify_command(output: &Path, encodings: &[Encoding]) -> Result<()> {
    let keys = shard_keys(output)?;
    if keys.is_empty() {
        anyhow::bail!("No shards found in {}", output.display());
    }

    let mut failures = 0;
    for key in &keys {
        if let Err(e) = verify_shard(output, key, encodings).await {
            error!("Shard '{}': {:#}", key, anyhow::Error::new(e));
            failures += 1;
        }
    }

    if failures > 0 {
        anyhow::bail!("{} of {} shards failed verification", failures, keys.len());
    }

    println!("Verified {} shards in {}", keys.len(), output.display());
    Ok(())
}

/// Shard keys of every `<key>.json` file in `dir`, sorted
fn shard_keys(dir: &Path) -> Result<Vec<String>> {
    let mut keys = Vec::new();

    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read output directory: {}", dir.display()))?
    {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        if let Some(key) = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| n.strip_suffix(".json"))
        {
            keys.push(key.to_string());
        }
    }

    keys.sort();
    Ok(keys)
}

//! Landing page rendering
//!
//! The page only consumes scalar summary data. Templates use `{{total}}`,
//! `{{ignored}}` and `{{last_updated}}` placeholders; the rendered page and
//! the favicon are whitespace-collapsed before they are written.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{CatalogError, Result};
use crate::output::OutputDir;

/// Built-in landing page template
pub const DEFAULT_TEMPLATE: &str = include_str!("../assets/template.html");

/// Built-in favicon
pub const DEFAULT_FAVICON: &str = include_str!("../assets/favicon.svg");

static COMMENTS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<!--.*?-->").expect("valid comment pattern"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace pattern"));
static BETWEEN_TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r">\s+<").expect("valid tag pattern"));

/// Aggregate numbers shown on the landing page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub total: usize,
    pub ignored: usize,
    /// UTC, `dd/mm/yyyy, HH:MM:SS`
    pub last_updated: String,
}

impl Summary {
    pub fn new(total: usize, ignored: usize, generated_at: DateTime<Utc>) -> Self {
        Self {
            total,
            ignored,
            last_updated: format_timestamp(generated_at),
        }
    }
}

/// Human-readable UTC timestamp
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format("%d/%m/%Y, %H:%M:%S").to_string()
}

/// Turns a summary into a page
pub trait Renderer: Send + Sync {
    fn render(&self, summary: &Summary) -> String;
}

/// Placeholder-substitution renderer with minified output
#[derive(Debug, Clone)]
pub struct PageRenderer {
    template: String,
}

impl Default for PageRenderer {
    fn default() -> Self {
        Self::new(DEFAULT_TEMPLATE)
    }
}

impl PageRenderer {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    /// Load a template from disk, or use the built-in one
    pub async fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                let template = read_text(path).await?;
                debug!("Loaded template from {}", path.display());
                Ok(Self::new(template))
            }
            None => Ok(Self::default()),
        }
    }
}

impl Renderer for PageRenderer {
    fn render(&self, summary: &Summary) -> String {
        let html = self
            .template
            .replace("{{total}}", &summary.total.to_string())
            .replace("{{ignored}}", &summary.ignored.to_string())
            .replace("{{last_updated}}", &summary.last_updated);
        minify(&html)
    }
}

/// Strip comments and collapse whitespace in HTML or SVG markup
pub fn minify(markup: &str) -> String {
    let without_comments = COMMENTS.replace_all(markup, "");
    let collapsed = WHITESPACE.replace_all(&without_comments, " ");
    BETWEEN_TAGS.replace_all(&collapsed, "><").trim().to_string()
}

/// Render `index.html` and copy the minified favicon into the output
pub async fn write_site(
    output: &OutputDir,
    renderer: &dyn Renderer,
    summary: &Summary,
    favicon: Option<&Path>,
) -> Result<Vec<PathBuf>> {
    let favicon_source = match favicon {
        Some(path) => read_text(path).await?,
        None => DEFAULT_FAVICON.to_string(),
    };

    let favicon_path = output.join("favicon.svg");
    tokio::fs::write(&favicon_path, minify(&favicon_source))
        .await
        .map_err(|e| CatalogError::io(&favicon_path, e))?;

    let index_path = output.join("index.html");
    tokio::fs::write(&index_path, renderer.render(summary))
        .await
        .map_err(|e| CatalogError::io(&index_path, e))?;

    debug!("Wrote {} and {}", index_path.display(), favicon_path.display());
    Ok(vec![index_path, favicon_path])
}

async fn read_text(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| CatalogError::io(path, e))
}

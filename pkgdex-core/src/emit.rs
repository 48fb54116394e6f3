//! Shard serialization
//!
//! Every shard is sorted by name, serialized once to compact JSON, and then
//! written in each configured encoding. All encodings of a shard carry the
//! same bytes; only the container differs.
//!
//! ```text
//! public/
//! ├── all.json
//! ├── all.json.gz
//! ├── all.json.br
//! ├── a.json
//! └── ...
//! ```

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::aggregate::Shards;
use crate::error::{CatalogError, Result};
use crate::record::CatalogRecord;

/// Brotli quality (0-11)
const BROTLI_QUALITY: u32 = 11;

/// Brotli window size (log2)
const BROTLI_LGWIN: u32 = 22;

const BROTLI_BUFFER_SIZE: usize = 4096;

/// Shard names that would read as a `.json` file once the extension is added
static RESERVED_SHARD_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\w-]+.json$").expect("valid reserved shard pattern"));

/// One on-disk representation of a shard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    Json,
    Gzip,
    Brotli,
}

impl Encoding {
    pub const ALL: [Encoding; 3] = [Encoding::Json, Encoding::Gzip, Encoding::Brotli];

    /// File extension, without the leading dot
    pub fn extension(self) -> &'static str {
        match self {
            Encoding::Json => "json",
            Encoding::Gzip => "json.gz",
            Encoding::Brotli => "json.br",
        }
    }

    pub fn file_name(self, shard: &str) -> String {
        format!("{shard}.{}", self.extension())
    }

    /// Wrap canonical JSON bytes in this encoding
    pub fn encode(self, json: &[u8]) -> io::Result<Vec<u8>> {
        match self {
            Encoding::Json => Ok(json.to_vec()),
            Encoding::Gzip => {
                let mut encoder = GzEncoder::new(Vec::new(), Compression::best());
                encoder.write_all(json)?;
                encoder.finish()
            }
            Encoding::Brotli => {
                let mut out = Vec::new();
                {
                    let mut writer = brotli::CompressorWriter::new(
                        &mut out,
                        BROTLI_BUFFER_SIZE,
                        BROTLI_QUALITY,
                        BROTLI_LGWIN,
                    );
                    writer.write_all(json)?;
                    writer.flush()?;
                }
                Ok(out)
            }
        }
    }

    /// Recover the canonical JSON bytes
    pub fn decode(self, bytes: &[u8]) -> io::Result<Vec<u8>> {
        let mut out = Vec::new();
        match self {
            Encoding::Json => out.extend_from_slice(bytes),
            Encoding::Gzip => {
                GzDecoder::new(bytes).read_to_end(&mut out)?;
            }
            Encoding::Brotli => {
                brotli::Decompressor::new(bytes, BROTLI_BUFFER_SIZE).read_to_end(&mut out)?;
            }
        }
        Ok(out)
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Encoding::Json => "json",
            Encoding::Gzip => "gzip",
            Encoding::Brotli => "brotli",
        };
        f.write_str(name)
    }
}

impl FromStr for Encoding {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Encoding::Json),
            "gzip" | "gz" => Ok(Encoding::Gzip),
            "brotli" | "br" => Ok(Encoding::Brotli),
            other => Err(format!(
                "Unknown encoding '{other}' (expected json, gzip or brotli)"
            )),
        }
    }
}

/// A shard key that cannot be used as a file basename
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid shard name '{key}': {reason}")]
pub struct InvalidShardKey {
    pub key: String,
    pub reason: &'static str,
}

/// Check that `key` is a safe basename for shard artifacts
pub fn validate_shard_key(key: &str) -> std::result::Result<(), InvalidShardKey> {
    let reason = if key.is_empty() {
        Some("empty name")
    } else if key == "." || key == ".." {
        Some("relative path component")
    } else if key.contains(['/', '\\', '\0']) {
        Some("contains a path separator or NUL")
    } else if RESERVED_SHARD_NAME.is_match(key) {
        Some("collides with the reserved .json pattern")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(InvalidShardKey {
            key: key.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}

/// Sort records into the canonical order and serialize them
pub fn canonical_json(key: &str, records: &mut [CatalogRecord]) -> Result<Vec<u8>> {
    records.sort_by(|a, b| a.name.cmp(&b.name));
    serde_json::to_vec(records).map_err(|source| CatalogError::Serialize {
        shard: key.to_string(),
        source,
    })
}

/// What happened to one shard
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmitOutcome {
    Written {
        key: String,
        records: usize,
        artifacts: Vec<PathBuf>,
    },
    Skipped(InvalidShardKey),
}

impl EmitOutcome {
    pub fn is_written(&self) -> bool {
        matches!(self, EmitOutcome::Written { .. })
    }
}

/// Writes shards into an output directory
#[derive(Debug, Clone)]
pub struct ShardWriter {
    dir: PathBuf,
    encodings: Vec<Encoding>,
}

impl ShardWriter {
    /// Create a writer; plain JSON is always among the encodings
    pub fn new(dir: impl Into<PathBuf>, encodings: &[Encoding]) -> Self {
        Self {
            dir: dir.into(),
            encodings: effective_encodings(encodings),
        }
    }

    pub fn encodings(&self) -> &[Encoding] {
        &self.encodings
    }

    /// Write one shard in every encoding
    ///
    /// An unusable shard key is logged and reported as skipped rather than
    /// failing the run.
    pub async fn emit(&self, key: &str, mut records: Vec<CatalogRecord>) -> Result<EmitOutcome> {
        if let Err(invalid) = validate_shard_key(key) {
            warn!("Skipping {}", invalid);
            return Ok(EmitOutcome::Skipped(invalid));
        }

        let count = records.len();
        let encodings = self.encodings.clone();
        let shard = key.to_string();

        let encoded = tokio::task::spawn_blocking(move || {
            let json = canonical_json(&shard, &mut records)?;
            encodings
                .into_iter()
                .map(|encoding| {
                    encoding
                        .encode(&json)
                        .map(|bytes| (encoding, bytes))
                        .map_err(|e| CatalogError::io(encoding.file_name(&shard), e))
                })
                .collect::<Result<Vec<_>>>()
        })
        .await
        .map_err(|source| CatalogError::Task {
            shard: key.to_string(),
            source,
        })??;

        let mut artifacts = Vec::with_capacity(encoded.len());
        for (encoding, bytes) in encoded {
            let path = self.dir.join(encoding.file_name(key));
            tokio::fs::write(&path, &bytes)
                .await
                .map_err(|e| CatalogError::io(&path, e))?;
            debug!("Wrote {} ({} bytes)", path.display(), bytes.len());
            artifacts.push(path);
        }

        Ok(EmitOutcome::Written {
            key: key.to_string(),
            records: count,
            artifacts,
        })
    }

    /// Remove shard artifacts this run will not produce
    ///
    /// Covers shards that no longer have any records and encodings that are
    /// no longer configured. Other files in the directory are left alone.
    pub async fn prune_stale(&self, shards: &Shards) -> Result<Vec<PathBuf>> {
        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .map_err(|e| CatalogError::io(&self.dir, e))?;

        let mut removed = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| CatalogError::io(&self.dir, e))?
        {
            let path = entry.path();
            let is_file = entry
                .file_type()
                .await
                .map(|t| t.is_file())
                .unwrap_or(false);
            if !is_file {
                continue;
            }
            let Some((key, encoding)) = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(parse_artifact_name)
            else {
                continue;
            };

            if shards.get(key).is_some() && self.encodings.contains(&encoding) {
                continue;
            }

            tokio::fs::remove_file(&path)
                .await
                .map_err(|e| CatalogError::io(&path, e))?;
            info!("Removed stale shard artifact {}", path.display());
            removed.push(path);
        }

        Ok(removed)
    }

    /// Write every shard concurrently
    pub async fn emit_all(&self, shards: Shards) -> Result<Vec<EmitOutcome>> {
        use futures::future::join_all;

        let futures: Vec<_> = shards
            .into_inner()
            .into_iter()
            .map(|(key, records)| async move { self.emit(&key, records).await })
            .collect();

        let outcomes = join_all(futures)
            .await
            .into_iter()
            .collect::<Result<Vec<_>>>()?;

        let written = outcomes.iter().filter(|o| o.is_written()).count();
        info!(
            "Wrote {} shards to {} ({} skipped)",
            written,
            self.dir.display(),
            outcomes.len() - written
        );

        Ok(outcomes)
    }
}

/// Deduplicated encodings with JSON first
fn effective_encodings(requested: &[Encoding]) -> Vec<Encoding> {
    let mut encodings = vec![Encoding::Json];
    for encoding in requested {
        if !encodings.contains(encoding) {
            encodings.push(*encoding);
        }
    }
    encodings
}

/// Split `<key>.json[.gz|.br]` into its shard key and encoding
fn parse_artifact_name(file_name: &str) -> Option<(&str, Encoding)> {
    [Encoding::Gzip, Encoding::Brotli, Encoding::Json]
        .into_iter()
        .find_map(|encoding| {
            file_name
                .strip_suffix(encoding.extension())
                .and_then(|rest| rest.strip_suffix('.'))
                .map(|key| (key, encoding))
        })
}

/// Check that every encoded artifact of a shard decodes to the JSON artifact
pub async fn verify_shard(dir: &Path, key: &str, encodings: &[Encoding]) -> Result<()> {
    let json_path = dir.join(Encoding::Json.file_name(key));
    let canonical = tokio::fs::read(&json_path)
        .await
        .map_err(|e| CatalogError::io(&json_path, e))?;

    for encoding in encodings.iter().filter(|e| **e != Encoding::Json) {
        let path = dir.join(encoding.file_name(key));
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| CatalogError::io(&path, e))?;

        let decoded = encoding
            .decode(&bytes)
            .map_err(|_| CatalogError::ArtifactMismatch { path: path.clone() })?;
        if decoded != canonical {
            return Err(CatalogError::ArtifactMismatch { path });
        }
    }

    Ok(())
}

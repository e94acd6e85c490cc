//! Output cache for incremental site builds.
//!
//! Typesetting a page is cheap, but a site has many of them and the
//! watcher rebuilds after every save. This module lets [`site::build`]
//! skip any file whose source and effective configuration are unchanged
//! since the last build.
//!
//! # Cache keys
//!
//! Entries are keyed by output path and carry two hashes:
//!
//! - **`source_hash`**: SHA-256 of the source file contents. Content-based
//!   rather than mtime-based so it survives `git checkout`.
//! - **`params_hash`**: SHA-256 of everything else that shapes the output:
//!   the file kind, the fully resolved directory config, the forced locale
//!   and the crate version. Editing a `typography.toml` changes the hash
//!   for every file below it.
//!
//! A cache hit requires a matching entry and the output file still on disk.
//! When the same content is found under another output path (a renamed
//! page), the earlier output is copied instead of typesetting again,
//! unless the current build also writes that path. Outputs whose source
//! is gone are deleted along with their entries.
//!
//! # Storage
//!
//! The manifest is a JSON file at `<output_dir>/.typography-cache.json`.
//! `--no-cache` starts from an empty manifest.
//!
//! [`site::build`]: crate::site::build

use crate::config::TypographyConfig;
use crate::locale::Locale;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

/// Name of the cache manifest file within the output directory.
pub const MANIFEST_FILENAME: &str = ".typography-cache.json";

/// Bump to invalidate every existing manifest.
const MANIFEST_VERSION: u32 = 1;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct CacheEntry {
    pub source_hash: String,
    pub params_hash: String,
}

/// On-disk manifest mapping output paths to their cache entries.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CacheManifest {
    pub version: u32,
    pub entries: HashMap<String, CacheEntry>,
    /// `"{source_hash}:{params_hash}"` → output path. Never serialized.
    #[serde(skip)]
    content_index: HashMap<String, String>,
}

impl CacheManifest {
    pub fn empty() -> Self {
        Self {
            version: MANIFEST_VERSION,
            entries: HashMap::new(),
            content_index: HashMap::new(),
        }
    }

    /// Load from the output directory. A missing, corrupt or outdated
    /// manifest loads as empty.
    pub fn load(output_dir: &Path) -> Self {
        let path = manifest_path(output_dir);
        let Ok(content) = std::fs::read_to_string(&path) else {
            return Self::empty();
        };
        let mut manifest: Self = match serde_json::from_str(&content) {
            Ok(m) => m,
            Err(e) => {
                log::debug!("ignoring unreadable cache manifest {}: {e}", path.display());
                return Self::empty();
            }
        };
        if manifest.version != MANIFEST_VERSION {
            return Self::empty();
        }
        manifest.content_index = build_content_index(&manifest.entries);
        manifest
    }

    pub fn save(&self, output_dir: &Path) -> io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(manifest_path(output_dir), json)
    }

    /// Output path holding this content, if it is still on disk.
    ///
    /// The returned path may differ from the one the caller is about to
    /// write; copying it over is the caller's job.
    pub fn find_cached(
        &self,
        source_hash: &str,
        params_hash: &str,
        output_dir: &Path,
    ) -> Option<String> {
        let stored_path = self.content_index.get(&content_key(source_hash, params_hash))?;
        if output_dir.join(stored_path).exists() {
            Some(stored_path.clone())
        } else {
            None
        }
    }

    /// Record the hashes behind an output file.
    ///
    /// Content that moved to a new output path drops its old entry.
    pub fn insert(&mut self, output_path: String, source_hash: String, params_hash: String) {
        let key = content_key(&source_hash, &params_hash);

        if let Some(old_path) = self.content_index.get(&key)
            && *old_path != output_path
        {
            self.entries.remove(old_path.as_str());
        }
        if let Some(previous) = self.entries.get(&output_path) {
            self.content_index
                .remove(&content_key(&previous.source_hash, &previous.params_hash));
        }

        self.content_index.insert(key, output_path.clone());
        self.entries.insert(
            output_path,
            CacheEntry {
                source_hash,
                params_hash,
            },
        );
    }

    /// Drop entries for outputs the current build no longer writes,
    /// returning their paths so the caller can delete the files.
    pub fn retain_outputs(&mut self, outputs: &HashSet<String>) -> Vec<String> {
        let mut dropped: Vec<String> = self
            .entries
            .keys()
            .filter(|path| !outputs.contains(*path))
            .cloned()
            .collect();
        dropped.sort();
        for path in &dropped {
            self.entries.remove(path);
        }
        self.content_index = build_content_index(&self.entries);
        dropped
    }
}

fn content_key(source_hash: &str, params_hash: &str) -> String {
    format!("{source_hash}:{params_hash}")
}

fn build_content_index(entries: &HashMap<String, CacheEntry>) -> HashMap<String, String> {
    entries
        .iter()
        .map(|(output_path, entry)| {
            (
                content_key(&entry.source_hash, &entry.params_hash),
                output_path.clone(),
            )
        })
        .collect()
}

/// SHA-256 hash of a file's contents, as hex.
pub fn hash_file(path: &Path) -> io::Result<String> {
    let bytes = std::fs::read(path)?;
    Ok(format!("{:x}", Sha256::digest(&bytes)))
}

/// SHA-256 hash of the settings that shape one output file.
///
/// `kind` separates page kinds that share a config (`html`, `markdown`,
/// `asset`).
pub fn hash_params(kind: &str, config: &TypographyConfig, locale: Option<Locale>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(kind.as_bytes());
    hasher.update(b"\0");
    hasher.update(env!("CARGO_PKG_VERSION").as_bytes());
    hasher.update(b"\0");
    hasher.update(serde_json::to_vec(config).unwrap_or_default());
    match locale {
        Some(locale) => {
            hasher.update(b"\x01");
            hasher.update(locale.code().as_bytes());
        }
        None => hasher.update(b"\x00"),
    }
    format!("{:x}", hasher.finalize())
}

/// Cache performance for one build run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u32,
    pub copies: u32,
    pub misses: u32,
}

impl CacheStats {
    pub fn hit(&mut self) {
        self.hits += 1;
    }

    pub fn copy(&mut self) {
        self.copies += 1;
    }

    pub fn miss(&mut self) {
        self.misses += 1;
    }

    pub fn total(&self) -> u32 {
        self.hits + self.copies + self.misses
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.hits == 0 && self.copies == 0 {
            return write!(f, "{} written", self.misses);
        }
        if self.copies > 0 {
            write!(
                f,
                "{} cached, {} reused, {} written ({} total)",
                self.hits,
                self.copies,
                self.misses,
                self.total()
            )
        } else {
            write!(
                f,
                "{} cached, {} written ({} total)",
                self.hits,
                self.misses,
                self.total()
            )
        }
    }
}

pub fn manifest_path(output_dir: &Path) -> PathBuf {
    output_dir.join(MANIFEST_FILENAME)
}

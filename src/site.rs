//! Batch typesetting of a site directory.
//!
//! ```text
//! site/                        dist/
//! ├── typography.toml          ├── index.html        (typeset)
//! ├── index.html         ──►   ├── notes.html        (rendered + typeset)
//! ├── notes.md                 ├── style.css         (copied)
//! ├── style.css                └── fr/
//! └── fr/                          └── index.html    (typeset, fr config)
//!     ├── typography.toml
//!     └── index.html
//! ```
//!
//! ## Config cascade
//!
//! Each directory's effective config is its parent's merged with its own
//! `typography.toml`, if any, on top of the base the caller passes in
//! (stock defaults, or the CLI's `--config`). The config files themselves
//! are not copied.
//!
//! ## Parallelism
//!
//! Files are processed on a rayon pool sized by the root config's
//! `processing.max_processes`. Each file owns its document; the cache
//! manifest is only read during the parallel phase and updated afterwards.
//!
//! Hidden entries (names starting with `.`) and the output directory, when
//! it sits inside the source, are skipped.

use crate::cache::{CacheManifest, CacheStats, hash_file, hash_params};
use crate::config::{
    CONFIG_FILE, ConfigError, TypographyConfig, effective_threads, load_raw_config, merge_toml,
    resolve_config,
};
use crate::dom::DomError;
use crate::locale::Locale;
use crate::markdown;
use crate::processor::{ProcessSummary, Typographer};
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("Config error in {dir}: {source}")]
    Config {
        dir: PathBuf,
        #[source]
        source: ConfigError,
    },
    #[error("HTML parse error: {0}")]
    Dom(#[from] DomError),
    #[error("Thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    #[error("Source directory not found: {0}")]
    SourceNotFound(PathBuf),
}

/// How a source file is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Html,
    Markdown,
    Asset,
}

impl FileKind {
    fn of(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("html" | "htm") => FileKind::Html,
            Some("md" | "markdown") => FileKind::Markdown,
            _ => FileKind::Asset,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            FileKind::Html => "html",
            FileKind::Markdown => "markdown",
            FileKind::Asset => "asset",
        }
    }
}

/// What happened to one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileStatus {
    /// Output already up to date.
    Cached,
    /// Output copied from an earlier build's output at another path.
    Reused { from: String },
    /// Page typeset and written.
    Typeset(ProcessSummary),
    /// Asset copied as is.
    Copied,
}

/// Progress events sent while a build runs.
#[derive(Debug, Clone)]
pub enum BuildEvent {
    Started {
        source: PathBuf,
        file_count: usize,
    },
    FileDone {
        path: String,
        kind: FileKind,
        status: FileStatus,
    },
    FileFailed {
        path: String,
        error: String,
    },
}

#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Base config below every directory's `typography.toml`.
    /// `None` means the stock defaults.
    pub base: Option<toml::Value>,
    /// Force one locale for every file, overriding the cascade.
    pub locale: Option<Locale>,
    pub use_cache: bool,
}

/// Counts from one build.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BuildStats {
    pub pages: usize,
    pub assets: usize,
    pub failed: usize,
    /// Text blocks typeset across all written pages.
    pub blocks: usize,
}

#[derive(Debug)]
pub struct BuildResult {
    pub stats: BuildStats,
    pub cache_stats: CacheStats,
}

/// A source file with its resolved directory config.
struct Job {
    source: PathBuf,
    /// Output path relative to the output root, `/`-separated.
    output: String,
    kind: FileKind,
    typographer: Typographer,
}

struct Outcome {
    output: String,
    kind: FileKind,
    source_hash: String,
    params_hash: String,
    status: FileStatus,
}

/// Typeset `source` into `output_dir`.
pub fn build(
    source: &Path,
    output_dir: &Path,
    options: &BuildOptions,
    progress: Option<Sender<BuildEvent>>,
) -> Result<BuildResult, BuildError> {
    if !source.is_dir() {
        return Err(BuildError::SourceNotFound(source.to_path_buf()));
    }
    fs::create_dir_all(output_dir)?;
    let source = fs::canonicalize(source)?;
    let output_dir = fs::canonicalize(output_dir)?;

    let base = options
        .base
        .clone()
        .unwrap_or_else(crate::config::stock_defaults_value);
    let (jobs, root_config) = collect_jobs(&source, &output_dir, base, options.locale)?;
    log::info!("building {} files from {}", jobs.len(), source.display());
    send(
        progress.as_ref(),
        BuildEvent::Started {
            source: source.clone(),
            file_count: jobs.len(),
        },
    );

    let mut manifest = if options.use_cache {
        CacheManifest::load(&output_dir)
    } else {
        CacheManifest::empty()
    };

    let targets: HashSet<String> = jobs.iter().map(|job| job.output.clone()).collect();
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(effective_threads(&root_config.processing))
        .build()?;
    let outcomes: Vec<Result<Outcome, BuildError>> = pool.install(|| {
        jobs.par_iter()
            .map(|job| {
                let result = process_job(job, &output_dir, &manifest, &targets, options.locale);
                match &result {
                    Ok(outcome) => send(
                        progress.as_ref(),
                        BuildEvent::FileDone {
                            path: outcome.output.clone(),
                            kind: outcome.kind,
                            status: outcome.status.clone(),
                        },
                    ),
                    Err(e) => {
                        log::warn!("{}: {e}", job.source.display());
                        send(
                            progress.as_ref(),
                            BuildEvent::FileFailed {
                                path: job.output.clone(),
                                error: e.to_string(),
                            },
                        );
                    }
                }
                result
            })
            .collect()
    });

    let mut stats = BuildStats::default();
    let mut cache_stats = CacheStats::default();
    for outcome in outcomes {
        let Ok(outcome) = outcome else {
            stats.failed += 1;
            continue;
        };
        match &outcome.status {
            FileStatus::Cached => cache_stats.hit(),
            FileStatus::Reused { .. } => cache_stats.copy(),
            FileStatus::Typeset(summary) => {
                cache_stats.miss();
                stats.blocks += summary.processed;
            }
            FileStatus::Copied => cache_stats.miss(),
        }
        match outcome.kind {
            FileKind::Asset => stats.assets += 1,
            FileKind::Html | FileKind::Markdown => stats.pages += 1,
        }
        manifest.insert(outcome.output, outcome.source_hash, outcome.params_hash);
    }

    for stale in manifest.retain_outputs(&targets) {
        let path = output_dir.join(&stale);
        if path.is_file() {
            fs::remove_file(&path)?;
            log::debug!("removed stale output {stale}");
        }
    }
    manifest.save(&output_dir)?;
    Ok(BuildResult { stats, cache_stats })
}

/// Walk the source tree, resolving each directory's config on the way down.
fn collect_jobs(
    source: &Path,
    output_dir: &Path,
    base: toml::Value,
    locale: Option<Locale>,
) -> Result<(Vec<Job>, TypographyConfig), BuildError> {
    let mut raw_configs: HashMap<PathBuf, toml::Value> = HashMap::new();
    let mut typographers: HashMap<PathBuf, Typographer> = HashMap::new();
    let mut jobs = Vec::new();

    let walker = WalkDir::new(source)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            e.depth() == 0
                || !(e.file_name().to_string_lossy().starts_with('.')
                    || e.path().starts_with(output_dir))
        });

    for entry in walker {
        let entry = entry?;
        let path = entry.path();

        if entry.file_type().is_dir() {
            let parent = path
                .parent()
                .and_then(|p| raw_configs.get(p))
                .cloned()
                .unwrap_or_else(|| base.clone());
            let config_error = |source| BuildError::Config {
                dir: path.to_path_buf(),
                source,
            };
            let raw = match load_raw_config(path).map_err(config_error)? {
                Some(overlay) => merge_toml(parent, overlay),
                None => parent,
            };
            let config = resolve_config(raw.clone(), None).map_err(config_error)?;
            let typographer = Typographer::new(config).map_err(config_error)?;
            let typographer = match locale {
                Some(_) => typographer.with_locale(locale),
                None => typographer,
            };
            log::debug!("config resolved for {}", path.display());
            raw_configs.insert(path.to_path_buf(), raw);
            typographers.insert(path.to_path_buf(), typographer);
            continue;
        }

        if entry.file_name() == CONFIG_FILE {
            continue;
        }
        let Some(typographer) = path.parent().and_then(|p| typographers.get(p)) else {
            continue;
        };
        let kind = FileKind::of(path);
        let mut relative = path.strip_prefix(source).unwrap_or(path).to_path_buf();
        if kind == FileKind::Markdown {
            relative.set_extension("html");
        }
        jobs.push(Job {
            source: path.to_path_buf(),
            output: to_slash(&relative),
            kind,
            typographer: typographer.clone(),
        });
    }

    let root_config = typographers
        .get(source)
        .map(|t| t.config().clone())
        .unwrap_or_default();
    Ok((jobs, root_config))
}

fn process_job(
    job: &Job,
    output_dir: &Path,
    manifest: &CacheManifest,
    targets: &HashSet<String>,
    locale: Option<Locale>,
) -> Result<Outcome, BuildError> {
    let source_hash = hash_file(&job.source)?;
    let params_hash = hash_params(job.kind.label(), job.typographer.config(), locale);
    let dest = output_dir.join(&job.output);

    // Another job may be rewriting `stored` in this same build.
    let cached = manifest
        .find_cached(&source_hash, &params_hash, output_dir)
        .filter(|stored| *stored == job.output || !targets.contains(stored));
    let status = match cached {
        Some(stored) if stored == job.output => FileStatus::Cached,
        Some(stored) => {
            write_parent(&dest)?;
            fs::copy(output_dir.join(&stored), &dest)?;
            FileStatus::Reused { from: stored }
        }
        None => {
            write_parent(&dest)?;
            match job.kind {
                FileKind::Asset => {
                    fs::copy(&job.source, &dest)?;
                    FileStatus::Copied
                }
                FileKind::Html => {
                    let html = fs::read_to_string(&job.source)?;
                    let (out, summary) = job.typographer.try_typeset_html(&html)?;
                    fs::write(&dest, out)?;
                    FileStatus::Typeset(summary)
                }
                FileKind::Markdown => {
                    let md = fs::read_to_string(&job.source)?;
                    let (out, summary) = render_page(&md, &job.source, &job.typographer)?;
                    fs::write(&dest, out)?;
                    FileStatus::Typeset(summary)
                }
            }
        }
    };
    log::debug!("{} {:?}", job.output, status);

    Ok(Outcome {
        output: job.output.clone(),
        kind: job.kind,
        source_hash,
        params_hash,
        status,
    })
}

/// A Markdown source as a full page. The title is the first `# heading`,
/// else the file stem; `lang` is the fixed locale, else `en`.
fn render_page(
    md: &str,
    source: &Path,
    typographer: &Typographer,
) -> Result<(String, ProcessSummary), DomError> {
    let title = markdown::extract_title(md).unwrap_or_else(|| {
        source
            .file_stem()
            .map(|s| s.to_string_lossy().replace('-', " "))
            .unwrap_or_default()
    });
    let locale = typographer.locale().unwrap_or(Locale::En);
    let body = markdown::render_html(md);
    let page = markdown::standalone_document(&title, locale.code(), &body).into_string();
    typographer.try_typeset_html(&page)
}

fn write_parent(dest: &Path) -> std::io::Result<()> {
    match dest.parent() {
        Some(parent) => fs::create_dir_all(parent),
        None => Ok(()),
    }
}

fn to_slash(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn send(tx: Option<&Sender<BuildEvent>>, event: BuildEvent) {
    if let Some(tx) = tx {
        tx.send(event).ok();
    }
}

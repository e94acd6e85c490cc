//! Typography configuration module.
//!
//! Handles loading, validating, and merging `typography.toml` files.
//! Configuration is hierarchical: stock defaults are overridden by user
//! config files at any level of a site's directory tree.
//!
//! ## Config File Location
//!
//! Place `typography.toml` in the site root and/or any subdirectory:
//!
//! ```text
//! site/
//! ├── typography.toml          # Root config (overrides stock defaults)
//! ├── index.html
//! └── fr/
//!     ├── typography.toml      # Section config (overrides root)
//!     └── index.md
//! ```
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! locale = "auto"           # auto | en | fr | de | es | it
//!
//! [features]
//! smart_quotes = true
//! punctuation = true
//! widow_prevention = true
//! orphan_prevention = true
//! spacing = true
//! fractions = true
//! arrows_and_symbols = true
//! number_formatting = false
//!
//! [selectors]
//! process = "p, li, blockquote, h1, h2, h3, h4, h5, h6, td, th, dd, dt, figcaption"
//! exclude = "code, pre, script, style, samp, kbd, var"
//! exclude_from_widows = "h1, h2, h3, h4, h5, h6"
//!
//! [processing]
//! max_processes = 4         # Max parallel workers (omit for auto = CPU cores)
//! mark_processed = true     # Tag typeset elements with data-typography-processed
//! watch_debounce_ms = 200   # Quiet period before a watch rebuild
//! ```
//!
//! ## Partial Configuration
//!
//! Config files are sparse, override just the values you want:
//!
//! ```toml
//! locale = "fr"
//!
//! [features]
//! number_formatting = true
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::locale::Locale;
use crate::selector::{SelectorError, SelectorList};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Per-directory config file name.
pub const CONFIG_FILE: &str = "typography.toml";

/// Locale value that defers to the nearest `lang` attribute.
pub const AUTO_LOCALE: &str = "auto";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Invalid selector: {0}")]
    Selector(#[from] SelectorError),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Typography configuration loaded from `typography.toml`.
///
/// All fields have defaults. User config files need only specify the values
/// they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TypographyConfig {
    /// Locale code, or `auto` to read it from the document.
    pub locale: String,
    /// Which rewrite passes run.
    pub features: Features,
    /// Which elements get typeset.
    pub selectors: SelectorsConfig,
    /// Batch processing settings.
    pub processing: ProcessingConfig,
}

impl Default for TypographyConfig {
    fn default() -> Self {
        Self {
            locale: AUTO_LOCALE.to_string(),
            features: Features::default(),
            selectors: SelectorsConfig::default(),
            processing: ProcessingConfig::default(),
        }
    }
}

impl TypographyConfig {
    /// Validate selectors and numeric ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.selectors.process.trim().is_empty() {
            return Err(ConfigError::Validation(
                "selectors.process must not be empty".into(),
            ));
        }
        self.selectors.compile()?;
        if self.processing.watch_debounce_ms == 0 {
            return Err(ConfigError::Validation(
                "processing.watch_debounce_ms must be greater than 0".into(),
            ));
        }
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_processes must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// The fixed locale, or `None` when the document decides.
    ///
    /// Unknown codes fall back to English.
    pub fn fixed_locale(&self) -> Option<Locale> {
        if self.locale.trim().eq_ignore_ascii_case(AUTO_LOCALE) {
            None
        } else {
            Some(Locale::resolve(&self.locale))
        }
    }
}

/// Feature toggles, one per rewrite pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Features {
    /// Curly double and single quotes, and apostrophes.
    pub smart_quotes: bool,
    /// Em/en dashes and ellipses.
    pub punctuation: bool,
    /// Glue the last two words of each block.
    pub widow_prevention: bool,
    /// Glue short words, honorifics and units to their neighbour.
    pub orphan_prevention: bool,
    /// Locale spacing around punctuation.
    pub spacing: bool,
    /// `1/2` → `½`.
    pub fractions: bool,
    /// Arrows, math operators, legal marks, degrees.
    pub arrows_and_symbols: bool,
    /// Thousands separators.
    pub number_formatting: bool,
}

impl Default for Features {
    fn default() -> Self {
        Self {
            smart_quotes: true,
            punctuation: true,
            widow_prevention: true,
            orphan_prevention: true,
            spacing: true,
            fractions: true,
            arrows_and_symbols: true,
            number_formatting: false,
        }
    }
}

/// CSS selector lists, kept as source strings until compiled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SelectorsConfig {
    /// Elements whose text gets typeset.
    pub process: String,
    /// Elements whose subtree is never touched.
    pub exclude: String,
    /// Processed elements that skip widow prevention.
    pub exclude_from_widows: String,
}

impl Default for SelectorsConfig {
    fn default() -> Self {
        Self {
            process: "p, li, blockquote, h1, h2, h3, h4, h5, h6, td, th, dd, dt, figcaption"
                .to_string(),
            exclude: "code, pre, script, style, samp, kbd, var".to_string(),
            exclude_from_widows: "h1, h2, h3, h4, h5, h6".to_string(),
        }
    }
}

/// Parsed form of [`SelectorsConfig`].
#[derive(Debug, Clone)]
pub struct CompiledSelectors {
    pub process: SelectorList,
    /// `None` when the configured list is blank.
    pub exclude: Option<SelectorList>,
    pub exclude_from_widows: Option<SelectorList>,
}

impl SelectorsConfig {
    pub fn compile(&self) -> Result<CompiledSelectors, SelectorError> {
        let optional = |source: &str| -> Result<Option<SelectorList>, SelectorError> {
            if source.trim().is_empty() {
                Ok(None)
            } else {
                SelectorList::parse(source).map(Some)
            }
        };
        Ok(CompiledSelectors {
            process: SelectorList::parse(&self.process)?,
            exclude: optional(&self.exclude)?,
            exclude_from_widows: optional(&self.exclude_from_widows)?,
        })
    }
}

/// Batch processing settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel file workers in a site build.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
    /// Tag typeset elements so repeat runs skip them.
    pub mark_processed: bool,
    /// Quiet period after the last file change before a watch rebuild.
    pub watch_debounce_ms: u64,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            max_processes: None,
            mark_processed: true,
            watch_debounce_ms: 200,
        }
    }
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_processes.map(|n| n.min(cores)).unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(TypographyConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a `typography.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if no `typography.toml` exists in the directory.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(dir: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = dir.join(CONFIG_FILE);
    if !config_path.exists() {
        return Ok(None);
    }
    load_raw_file(&config_path).map(Some)
}

fn load_raw_file(path: &Path) -> Result<toml::Value, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
///
/// Used to resolve a fully-merged config at any point in the directory hierarchy.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<TypographyConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: TypographyConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `typography.toml` in the given directory.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result.
pub fn load_config(dir: &Path) -> Result<TypographyConfig, ConfigError> {
    resolve_config(stock_defaults_value(), load_raw_config(dir)?)
}

/// Load config from an explicit file path (the CLI's `--config`).
pub fn load_config_file(path: &Path) -> Result<TypographyConfig, ConfigError> {
    resolve_config(stock_defaults_value(), Some(load_raw_file(path)?))
}

/// Returns a fully-commented stock `typography.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Standard Typography Configuration
# =================================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Config files can be placed at any level of a site's directory tree:
#   site/typography.toml        -> root (overrides stock defaults)
#   site/fr/typography.toml     -> section (overrides root)
#
# Each level only needs the keys it wants to override.
# Unknown keys will cause an error.

# Locale for the typographic rules: en, fr, de, es or it.
# Region subtags are accepted (fr-CA reads as fr); unknown codes use en.
# "auto" reads the nearest lang attribute of each element, falling back to en.
locale = "auto"

# ---------------------------------------------------------------------------
# Rewrite passes
# ---------------------------------------------------------------------------
[features]
# "straight" -> curly quotes in the locale's style, it's -> it’s.
smart_quotes = true

# -- and --- -> em dash, ... -> ellipsis, 10-20 -> 10–20.
punctuation = true

# Keep the last two words of a paragraph on the same line.
widow_prevention = true

# Keep short words, honorifics (Dr., M.) and units (5 km) with their neighbour.
orphan_prevention = true

# French thin spaces before : ; ! ? and inside « »; elsewhere, collapse
# repeated spaces and drop spaces before punctuation.
spacing = true

# 1/2 -> ½ for the nine common fractions.
fractions = true

# -> → , <=> ⇔ , != ≠ , (c) © , 90 degrees -> 90° and friends.
arrows_and_symbols = true

# 1234567 -> 1,234,567 using the locale's separator. Years are skipped.
number_formatting = false

# ---------------------------------------------------------------------------
# Element selection (CSS selector lists)
# ---------------------------------------------------------------------------
[selectors]
# Elements whose text gets typeset.
process = "p, li, blockquote, h1, h2, h3, h4, h5, h6, td, th, dd, dt, figcaption"

# Elements never touched, along with everything inside them.
# Elements with translate="no" are always excluded.
exclude = "code, pre, script, style, samp, kbd, var"

# Typeset elements that skip widow prevention.
exclude_from_widows = "h1, h2, h3, h4, h5, h6"

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel file workers in a site build.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4

# Tag typeset elements with data-typography-processed so repeat runs
# leave them alone.
mark_processed = true

# Quiet period (milliseconds) after the last change before watch rebuilds.
watch_debounce_ms = 200
"##
}

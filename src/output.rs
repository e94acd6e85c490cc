//! CLI output formatting.
//!
//! Each command has a `format_*` function returning display lines, so the
//! output is testable, and a `print_*` wrapper that writes them to stdout.
//! Format functions are pure: no I/O, no side effects.
//!
//! # Build
//!
//! ```text
//! Typesetting site/ (4 files)
//!     index.html: typeset (3 blocks, 2 changed)
//!     notes.html: cached
//!     style.css: copied
//!     fr/index.html: failed (HTML parse error: ...)
//!
//! 2 pages, 1 asset, 1 failed
//! Cache: 1 cached, 2 written (3 total)
//! ```
//!
//! # Check
//!
//! ```text
//! Locale: auto (from lang attributes, else en)
//! Features
//!     smart_quotes: on
//!     ...
//! Selectors
//!     process: p, li, ...
//! Processing
//!     threads: 8
//! ```

use crate::config::{TypographyConfig, effective_threads};
use crate::locale::{Locale, LocaleRules};
use crate::site::{BuildEvent, BuildResult, FileStatus};

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

/// Show a glyph so that invisible spaces can be told apart.
///
/// ```text
/// “      // printable glyphs as is
/// U+202F // spaces by code point
/// ```
fn visible(glyph: &str) -> String {
    if glyph.chars().all(|c| c.is_whitespace() || c == '\u{2060}') {
        glyph
            .chars()
            .map(|c| format!("U+{:04X}", c as u32))
            .collect::<Vec<_>>()
            .join(" ")
    } else {
        glyph.to_string()
    }
}

fn on_off(enabled: bool) -> &'static str {
    if enabled { "on" } else { "off" }
}

// ============================================================================
// Build
// ============================================================================

/// Format a single build progress event as display lines.
pub fn format_build_event(event: &BuildEvent) -> Vec<String> {
    match event {
        BuildEvent::Started { source, file_count } => {
            vec![format!(
                "Typesetting {} ({})",
                source.display(),
                plural(*file_count, "file")
            )]
        }
        BuildEvent::FileDone { path, status, .. } => {
            let status = match status {
                FileStatus::Cached => "cached".to_string(),
                FileStatus::Reused { from } => format!("reused {from}"),
                FileStatus::Copied => "copied".to_string(),
                FileStatus::Typeset(summary) => format!(
                    "typeset ({}, {} changed)",
                    plural(summary.processed, "block"),
                    summary.changed
                ),
            };
            vec![format!("{}{}: {}", indent(1), path, status)]
        }
        BuildEvent::FileFailed { path, error } => {
            vec![format!("{}{}: failed ({})", indent(1), path, error)]
        }
    }
}

/// Totals after a build finished.
pub fn format_build_summary(result: &BuildResult) -> Vec<String> {
    let stats = &result.stats;
    let mut totals = vec![plural(stats.pages, "page"), plural(stats.assets, "asset")];
    if stats.failed > 0 {
        totals.push(format!("{} failed", stats.failed));
    }
    vec![
        String::new(),
        totals.join(", "),
        format!("Cache: {}", result.cache_stats),
    ]
}

pub fn print_build_summary(result: &BuildResult) {
    for line in format_build_summary(result) {
        println!("{}", line);
    }
}

// ============================================================================
// Check
// ============================================================================

/// Resolved settings, one line per key.
pub fn format_check_output(config: &TypographyConfig) -> Vec<String> {
    let mut lines = Vec::new();

    let locale = match config.fixed_locale() {
        Some(locale) => format!("{} ({})", locale.code(), locale.name()),
        None => "auto (from lang attributes, else en)".to_string(),
    };
    lines.push(format!("Locale: {locale}"));

    let f = &config.features;
    lines.push("Features".to_string());
    for (name, enabled) in [
        ("smart_quotes", f.smart_quotes),
        ("punctuation", f.punctuation),
        ("widow_prevention", f.widow_prevention),
        ("orphan_prevention", f.orphan_prevention),
        ("spacing", f.spacing),
        ("fractions", f.fractions),
        ("arrows_and_symbols", f.arrows_and_symbols),
        ("number_formatting", f.number_formatting),
    ] {
        lines.push(format!("{}{}: {}", indent(1), name, on_off(enabled)));
    }

    let s = &config.selectors;
    lines.push("Selectors".to_string());
    lines.push(format!("{}process: {}", indent(1), s.process));
    for (name, value) in [
        ("exclude", &s.exclude),
        ("exclude_from_widows", &s.exclude_from_widows),
    ] {
        let shown = if value.trim().is_empty() {
            "(none)"
        } else {
            value.as_str()
        };
        lines.push(format!("{}{}: {}", indent(1), name, shown));
    }

    let p = &config.processing;
    lines.push("Processing".to_string());
    lines.push(format!("{}threads: {}", indent(1), effective_threads(p)));
    lines.push(format!(
        "{}mark_processed: {}",
        indent(1),
        on_off(p.mark_processed)
    ));
    lines.push(format!(
        "{}watch_debounce_ms: {}",
        indent(1),
        p.watch_debounce_ms
    ));
    lines
}

pub fn print_check_output(config: &TypographyConfig) {
    for line in format_check_output(config) {
        println!("{}", line);
    }
}

// ============================================================================
// Locales
// ============================================================================

fn rule_rows(rules: &LocaleRules) -> [(&'static str, &'static str); 12] {
    [
        ("thin space", rules.thin_space),
        ("no-break space", rules.nbsp),
        ("em dash", rules.em_dash),
        ("en dash", rules.en_dash),
        ("ellipsis", rules.ellipsis),
        ("double quotes open", rules.left_double_quote),
        ("double quotes close", rules.right_double_quote),
        ("single quotes open", rules.left_single_quote),
        ("single quotes close", rules.right_single_quote),
        ("apostrophe", rules.apostrophe),
        ("thousands separator", rules.number_separator),
        ("decimal separator", rules.decimal_separator),
    ]
}

/// The glyph table for every supported locale.
pub fn format_locales() -> Vec<String> {
    let mut lines = Vec::new();
    for (i, locale) in Locale::ALL.iter().enumerate() {
        if i > 0 {
            lines.push(String::new());
        }
        lines.push(format!("{} {}", locale.code(), locale.name()));
        for (label, glyph) in rule_rows(locale.rules()) {
            lines.push(format!("{}{:<20} {}", indent(1), label, visible(glyph)));
        }
    }
    lines
}

pub fn print_locales() {
    for line in format_locales() {
        println!("{}", line);
    }
}

// ============================================================================
// Tests
// ============================================================================

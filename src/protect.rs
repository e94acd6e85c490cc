//! Masking of tokens the rewrite passes must not touch.
//!
//! Before any rule runs, URLs, dates, e-mail addresses and slash-delimited
//! paths are swapped for opaque placeholders (`__PROTECTED_0__`,
//! `__PROTECTED_1__`, …). After the passes, [`ProtectionContext::restore`]
//! puts the original text back in insertion order.
//!
//! The marker list lives in a [`ProtectionContext`] owned by one transform
//! call, so nested and concurrent transforms never share state.
//!
//! Placeholders are built from characters no pass rewrites. The underscores
//! around the counter keep its digits off a word boundary, so number grouping
//! and fraction detection never see them.

use crate::rules::FRACTIONS;
use regex::{Captures, Regex};
use std::sync::LazyLock;
use thiserror::Error;

const MARKER_PREFIX: &str = "__PROTECTED";

static URL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"https?://[^\s"'<>]+"#).unwrap());

static SLASH_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d{1,2}/\d{1,2}(/\d{2,4})?\b").unwrap());

static ISO_DATE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\d{4}-\d{2}-\d{2}\b").unwrap());

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").unwrap()
});

static SLASH_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[a-z][a-z0-9_-]*(?:/[a-z][a-z0-9_-]*)+\b").unwrap()
});

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ProtectError {
    /// A placeholder was altered by a rewrite pass and cannot be restored.
    #[error("protection marker {marker} missing after rewrite")]
    MarkerLost { marker: String },
}

/// One masked region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtectionMarker {
    pub marker: String,
    pub content: String,
}

/// Per-call marker arena.
#[derive(Debug, Default)]
pub struct ProtectionContext {
    markers: Vec<ProtectionMarker>,
    prefix: String,
}

impl ProtectionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn markers(&self) -> &[ProtectionMarker] {
        &self.markers
    }

    /// Mask every protected token in `text`.
    ///
    /// Calling `protect` again on the same context starts a fresh marker list.
    pub fn protect(&mut self, text: &str) -> String {
        self.markers.clear();
        self.prefix = unused_prefix(text);

        let masked = self.mask(text, &URL, |_| true);
        let masked = self.mask(&masked, &SLASH_DATE, |caps| {
            // A bare `1/2` is a fraction, not a date.
            caps.get(1).is_some() || !FRACTIONS.iter().any(|(ascii, _)| *ascii == &caps[0])
        });
        let masked = self.mask(&masked, &ISO_DATE, |_| true);
        let masked = self.mask(&masked, &EMAIL, |_| true);
        self.mask(&masked, &SLASH_PATH, |_| true)
    }

    /// Put masked tokens back, silently skipping markers that are gone.
    pub fn restore(&self, text: &str) -> String {
        let mut restored = text.to_string();
        for entry in &self.markers {
            if restored.contains(&entry.marker) {
                restored = restored.replace(&entry.marker, &entry.content);
            } else {
                log::trace!("marker {} not present at restore", entry.marker);
            }
        }
        restored
    }

    /// Put masked tokens back, failing if any marker did not survive.
    pub fn restore_strict(&self, text: &str) -> Result<String, ProtectError> {
        if let Some(lost) = self.markers.iter().find(|m| !text.contains(&m.marker)) {
            return Err(ProtectError::MarkerLost {
                marker: lost.marker.clone(),
            });
        }
        Ok(self.restore(text))
    }

    fn mask(&mut self, text: &str, re: &Regex, keep: impl Fn(&Captures<'_>) -> bool) -> String {
        re.replace_all(text, |caps: &Captures<'_>| {
            let content = caps[0].to_string();
            if !keep(caps) {
                return content;
            }
            let marker = format!("{}_{}__", self.prefix, self.markers.len());
            self.markers.push(ProtectionMarker {
                marker: marker.clone(),
                content,
            });
            marker
        })
        .into_owned()
    }
}

/// `__PROTECTED`, or a salted variant when the input already contains it.
fn unused_prefix(text: &str) -> String {
    let mut prefix = MARKER_PREFIX.to_string();
    let mut salt = 0u32;
    while text.contains(&prefix) {
        salt += 1;
        prefix = format!("{MARKER_PREFIX}X{salt}");
    }
    prefix
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(text: &str) -> (String, String) {
        let mut ctx = ProtectionContext::new();
        let masked = ctx.protect(text);
        let restored = ctx.restore(&masked);
        (masked, restored)
    }

    #[test]
    fn urls_are_masked_and_restored() {
        let text = "see https://example.com/a-b--c...d?x=1 for more";
        let (masked, restored) = round_trip(text);
        assert_eq!(masked, "see __PROTECTED_0__ for more");
        assert_eq!(restored, text);
    }

    #[test]
    fn url_stops_at_quote_and_angle_bracket() {
        let mut ctx = ProtectionContext::new();
        ctx.protect("\"http://a.io/x\" <https://b.io>");
        let contents: Vec<&str> = ctx.markers().iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["http://a.io/x", "https://b.io"]);
    }

    #[test]
    fn dates_emails_and_paths_round_trip() {
        for text in [
            "due 12/25/2024 sharp",
            "on 3/14 we eat pie",
            "released 2023-01-15 today",
            "mail jane.doe+news@example.org now",
            "filed under category/tag/sub",
        ] {
            let (masked, restored) = round_trip(text);
            assert!(masked.contains("__PROTECTED_0__"), "{text} -> {masked}");
            assert_eq!(restored, text);
        }
    }

    #[test]
    fn bare_fractions_are_not_dates() {
        let mut ctx = ProtectionContext::new();
        assert_eq!(ctx.protect("uses 1/2 cup"), "uses 1/2 cup");
        assert!(ctx.markers().is_empty());
        assert_eq!(ctx.protect("3/4/2020"), "__PROTECTED_0__");
    }

    #[test]
    fn markers_are_numbered_in_insertion_order() {
        let mut ctx = ProtectionContext::new();
        let masked = ctx.protect("a@b.io and https://x.io and 2020-02-02");
        assert_eq!(
            masked,
            "__PROTECTED_2__ and __PROTECTED_0__ and __PROTECTED_1__"
        );
        assert_eq!(ctx.markers()[0].content, "https://x.io");
        assert_eq!(ctx.markers()[1].content, "2020-02-02");
        assert_eq!(ctx.markers()[2].content, "a@b.io");
    }

    #[test]
    fn missing_markers_are_skipped_or_reported() {
        let mut ctx = ProtectionContext::new();
        let masked = ctx.protect("go to https://x.io");
        let mangled = masked.replace("__PROTECTED_0__", "gone");
        assert_eq!(ctx.restore(&mangled), "go to gone");
        assert_eq!(
            ctx.restore_strict(&mangled),
            Err(ProtectError::MarkerLost {
                marker: "__PROTECTED_0__".into()
            })
        );
    }

    #[test]
    fn pre_existing_marker_text_is_not_confused() {
        let text = "literal __PROTECTED_0__ then https://x.io";
        let mut ctx = ProtectionContext::new();
        let masked = ctx.protect(text);
        assert!(masked.starts_with("literal __PROTECTED_0__ then "));
        assert_ne!(ctx.markers()[0].marker, "__PROTECTED_0__");
        assert_eq!(ctx.restore(&masked), text);
    }

    #[test]
    fn contexts_are_independent() {
        let mut outer = ProtectionContext::new();
        let masked_outer = outer.protect("https://outer.io");
        let mut inner = ProtectionContext::new();
        let masked_inner = inner.protect("https://inner.io");
        assert_eq!(outer.restore(&masked_outer), "https://outer.io");
        assert_eq!(inner.restore(&masked_inner), "https://inner.io");
    }
}

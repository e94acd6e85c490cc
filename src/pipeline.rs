//! The per-text-node transform: protect, run the enabled passes, restore.
//!
//! ```text
//! text ─► protect ─► punctuation ─► quotes ─► apostrophes ─► fractions
//!      ─► arrows/symbols ─► numbers ─► spacing ─► orphans
//!      ─► restore ─► text
//! ```
//!
//! Widow prevention is not part of this chain: it needs to see a whole
//! block, so the processor runs it per element and [`typeset_plain`] runs
//! it over the full string.

use crate::config::Features;
use crate::locale::{Locale, SYMBOLS};
use crate::protect::{ProtectError, ProtectionContext};
use crate::rules::{
    fix_apostrophes, fix_arrows_and_symbols, fix_fractions, fix_numbers, fix_punctuation,
    fix_quotes_continued, fix_spacing, prevent_orphans, prevent_widows,
};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TransformError {
    #[error(transparent)]
    Protect(#[from] ProtectError),
}

/// State carried across the text nodes of one block.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BlockState {
    /// A straight double quote was opened and not closed yet.
    pub quote_open: bool,
}

/// Run every enabled pass over one text node.
///
/// Fails only when a protection placeholder did not survive the passes, in
/// which case the caller should keep the original text.
pub fn transform_text(
    text: &str,
    locale: Locale,
    features: &Features,
) -> Result<String, TransformError> {
    transform_text_continued(text, locale, features, &mut BlockState::default())
}

/// [`transform_text`] for one of several text nodes that read as a single
/// run, such as `"Hello <em>world</em>"`.
pub fn transform_text_continued(
    text: &str,
    locale: Locale,
    features: &Features,
    state: &mut BlockState,
) -> Result<String, TransformError> {
    if text.trim().is_empty() {
        return Ok(text.to_string());
    }

    let rules = locale.rules();
    let mut ctx = ProtectionContext::new();
    let mut out = ctx.protect(text);

    if features.punctuation {
        out = fix_punctuation(&out, rules);
    }
    if features.smart_quotes {
        out = fix_quotes_continued(&out, rules, &mut state.quote_open);
        out = fix_apostrophes(&out, rules);
    }
    if features.fractions {
        out = fix_fractions(&out);
    }
    if features.arrows_and_symbols {
        out = fix_arrows_and_symbols(&out, &SYMBOLS);
    }
    if features.number_formatting {
        out = fix_numbers(&out, rules);
    }
    if features.spacing {
        out = fix_spacing(&out, locale);
    }
    if features.orphan_prevention {
        out = prevent_orphans(&out, locale);
    }

    Ok(ctx.restore_strict(&out)?)
}

/// Typeset a plain string, widow prevention included.
pub fn typeset_plain(
    text: &str,
    locale: Locale,
    features: &Features,
) -> Result<String, TransformError> {
    let out = transform_text(text, locale, features)?;
    if features.widow_prevention {
        Ok(prevent_widows(&out, locale.rules()))
    } else {
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NBSP: char = '\u{a0}';
    const NNBSP: char = '\u{202f}';

    fn all_on() -> Features {
        Features {
            number_formatting: true,
            ..Features::default()
        }
    }

    fn only_punctuation() -> Features {
        Features {
            smart_quotes: false,
            punctuation: true,
            widow_prevention: false,
            orphan_prevention: false,
            spacing: false,
            fractions: false,
            arrows_and_symbols: false,
            number_formatting: false,
        }
    }

    #[test]
    fn protected_tokens_survive_every_pass() {
        let text = "see https://example.com/a--b...c, mail me@x.io on 2023-01-15 or 12/25/2024";
        let out = transform_text(text, Locale::En, &all_on()).unwrap();
        assert!(out.contains("https://example.com/a--b...c"), "{out}");
        assert!(out.contains("me@x.io"));
        assert!(out.contains("2023-01-15"));
        assert!(out.contains("12/25/2024"));
    }

    #[test]
    fn features_gate_passes() {
        let out = transform_text(r#""a" -- b 1/2"#, Locale::En, &only_punctuation()).unwrap();
        assert_eq!(out, r#""a" — b 1/2"#);
    }

    #[test]
    fn year_ranges_and_numeric_ranges() {
        let features = only_punctuation();
        assert_eq!(transform_text("1999-2005", Locale::En, &features).unwrap(), "1999-2005");
        assert_eq!(transform_text("10-20", Locale::En, &features).unwrap(), "10–20");
    }

    #[test]
    fn french_quotes_get_narrow_spaces() {
        let out = transform_text(r#""bonjour""#, Locale::Fr, &Features::default()).unwrap();
        assert_eq!(out, format!("«{NNBSP}bonjour{NNBSP}»"));
        let out = transform_text(r#""bonjour""#, Locale::En, &Features::default()).unwrap();
        assert_eq!(out, "“bonjour”");
    }

    #[test]
    fn orphans_and_widows_on_plain_text() {
        let out = typeset_plain("I went to the store", Locale::En, &Features::default()).unwrap();
        assert!(out.contains(&format!("the{NBSP}store")), "{out}");

        let out = typeset_plain(
            "This is a very long sentence ending here",
            Locale::En,
            &Features::default(),
        )
        .unwrap();
        assert!(out.ends_with(&format!("ending{NBSP}here")));

        assert_eq!(
            typeset_plain("Hi there", Locale::En, &Features::default()).unwrap(),
            "Hi there"
        );
    }

    #[test]
    fn quote_state_spans_text_nodes() {
        let features = Features::default();
        let mut state = BlockState::default();
        let mut run = |text: &str| {
            transform_text_continued(text, Locale::En, &features, &mut state).unwrap()
        };
        let first = run("\"Hello ");
        let second = run("\" she said");
        assert_eq!(first, "“Hello ");
        assert!(second.starts_with('”'), "{second}");
        assert_eq!(state, BlockState::default());
    }

    #[test]
    fn whitespace_only_is_returned_as_is() {
        assert_eq!(transform_text("  \n ", Locale::En, &all_on()).unwrap(), "  \n ");
    }

    #[test]
    fn transform_is_idempotent() {
        for (text, locale) in [
            (r#"He said "it's 10-20 -- maybe..." to the crowd"#, Locale::En),
            (r#"Il a dit "bonjour" : c'est 1/2 !"#, Locale::Fr),
            ("Der Preis: 1234567 Euro -> viel", Locale::De),
        ] {
            let once = transform_text(text, locale, &all_on()).unwrap();
            let twice = transform_text(&once, locale, &all_on()).unwrap();
            assert_eq!(once, twice, "{text}");
        }
    }
}

//! Space normalization around punctuation.
//!
//! French sets high punctuation (`:;!?`) and the inside of guillemets off
//! with a narrow no-break space. Every other locale removes the space before
//! punctuation and collapses runs of spaces.

use super::{char_after, char_before, is_word_char, rewrite_matches};
use crate::locale::{Locale, LocaleRules};
use regex::{NoExpand, Regex};
use std::sync::LazyLock;

static HIGH_PUNCTUATION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s*([:;!?])").unwrap());

static GUILLEMET_OPEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"«\s*").unwrap());

static GUILLEMET_CLOSE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s*»").unwrap());

static SPACE_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t]{2,}").unwrap());

static SPACE_BEFORE_PUNCTUATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t]+([,.!?;:])").unwrap());

pub fn fix_spacing(text: &str, locale: Locale) -> String {
    match locale {
        Locale::Fr => french_spacing(text, locale.rules()),
        _ => default_spacing(text),
    }
}

fn french_spacing(text: &str, rules: &LocaleRules) -> String {
    let spaced = rewrite_matches(text, &HIGH_PUNCTUATION, |caps| {
        let m = caps.get(0)?;
        let before = char_before(text, m.start())?;
        if matches!(before, ':' | ';' | '!' | '?') {
            return None;
        }
        // 10:30
        if &caps[1] == ":"
            && before.is_ascii_digit()
            && char_after(text, m.end()).is_some_and(|c| c.is_ascii_digit())
        {
            return None;
        }
        Some(format!("{}{}", rules.thin_space, &caps[1]))
    });

    let opened = format!("«{}", rules.thin_space);
    let closed = format!("{}»", rules.thin_space);
    let spaced = GUILLEMET_OPEN.replace_all(&spaced, NoExpand(&opened));
    GUILLEMET_CLOSE
        .replace_all(&spaced, NoExpand(&closed))
        .into_owned()
}

fn default_spacing(text: &str) -> String {
    let collapsed = SPACE_RUN.replace_all(text, " ");
    rewrite_matches(&collapsed, &SPACE_BEFORE_PUNCTUATION, |caps| {
        let m = caps.get(0)?;
        // `.NET` and `,5` keep their space.
        if char_after(&collapsed, m.end()).is_some_and(is_word_char) {
            return None;
        }
        Some(caps[1].to_string())
    })
}

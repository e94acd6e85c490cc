//! Dashes and ellipses.

use super::{is_year, rewrite_matches};
use crate::locale::LocaleRules;
use regex::Regex;
use std::sync::LazyLock;

static NUMERIC_RANGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d+)-(\d+)\b").unwrap());

/// Convert ASCII dash and dot sequences to their typographic glyphs.
///
/// Text that already carries an em dash, an en dash and an ellipsis is taken
/// as typeset and returned as is.
pub fn fix_punctuation(text: &str, rules: &LocaleRules) -> String {
    if text.contains(rules.em_dash) && text.contains(rules.en_dash) && text.contains(rules.ellipsis)
    {
        return text.to_string();
    }

    let spaced_en_dash = format!(" {} ", rules.en_dash);
    let text = text
        .replace("---", rules.em_dash)
        .replace("--", rules.em_dash)
        .replace("...", rules.ellipsis)
        .replace(" - ", &spaced_en_dash);

    rewrite_matches(&text, &NUMERIC_RANGE, |caps| {
        // `1999-2005` reads as a pair of years, leave the hyphen.
        if is_year(&caps[1]) || is_year(&caps[2]) {
            return None;
        }
        Some(format!("{}{}{}", &caps[1], rules.en_dash, &caps[2]))
    })
}

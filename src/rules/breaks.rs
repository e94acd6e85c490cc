//! Line-break control: orphans and widows.
//!
//! An orphan here is a short word left dangling at the end of a line, like
//! "to" or "the"; a widow is the last word of a paragraph alone on its line.
//! Both are fixed by turning a breakable space into a no-break space.

use super::{char_after, rewrite_matches};
use crate::locale::{Locale, LocaleRules};
use regex::Regex;
use std::collections::HashMap;
use std::ops::Range;
use std::sync::LazyLock;

/// Blocks with fewer words than this never get a widow fix.
pub const MIN_WIDOW_WORDS: usize = 3;

/// Spaces that already forbid a line break.
const NON_BREAKING: &[char] = &['\u{00A0}', '\u{202F}', '\u{2007}', '\u{2060}'];

struct BreakPatterns {
    short_words: Regex,
    titles: Regex,
    units: Regex,
}

static PATTERNS: LazyLock<HashMap<Locale, BreakPatterns>> = LazyLock::new(|| {
    Locale::ALL
        .iter()
        .map(|&locale| (locale, BreakPatterns::for_locale(locale)))
        .collect()
});

impl BreakPatterns {
    fn for_locale(locale: Locale) -> Self {
        let short_words = alternation(locale.orphan_words());
        let titles = alternation(locale.title_abbreviations());
        let units = alternation(locale.units());
        Self {
            short_words: Regex::new(&format!(r"(?i)\b({short_words})[ \t\r\n]+")).unwrap(),
            titles: Regex::new(&format!(r"\b({titles})\.[ \t\r\n]+")).unwrap(),
            units: Regex::new(&format!(r"([0-9])[ \t]+({units})")).unwrap(),
        }
    }
}

/// Longest alternative first, so `min` wins over `m` and `Mme` over `M`.
fn alternation(words: &[&str]) -> String {
    let mut sorted: Vec<&str> = words.to_vec();
    sorted.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()).then(a.cmp(b)));
    sorted
        .iter()
        .map(|w| regex::escape(w))
        .collect::<Vec<_>>()
        .join("|")
}

/// Keep short function words, honorifics and units with their neighbour.
pub fn prevent_orphans(text: &str, locale: Locale) -> String {
    let Some(patterns) = PATTERNS.get(&locale) else {
        return text.to_string();
    };
    let nbsp = locale.rules().nbsp;

    let glued = patterns
        .short_words
        .replace_all(text, |caps: &regex::Captures<'_>| format!("{}{nbsp}", &caps[1]));
    let glued = patterns
        .titles
        .replace_all(&glued, |caps: &regex::Captures<'_>| format!("{}.{nbsp}", &caps[1]));
    rewrite_matches(&glued, &patterns.units, |caps| {
        let m = caps.get(0)?;
        // `5 m` but not `5 miles`.
        if char_after(&glued, m.end()).is_some_and(char::is_alphanumeric) {
            return None;
        }
        Some(format!("{}{nbsp}{}", &caps[1], &caps[2]))
    })
}

/// Join the last two words of a block with a no-break space.
///
/// Blocks under [`MIN_WIDOW_WORDS`] words are returned unchanged, as is text
/// whose final word is already held by a no-break space.
pub fn prevent_widows(text: &str, rules: &LocaleRules) -> String {
    if word_count(text) < MIN_WIDOW_WORDS {
        return text.to_string();
    }
    glue_last_gap(text, rules.nbsp).unwrap_or_else(|| text.to_string())
}

/// Words in `text`: whitespace-separated tokens carrying a letter or digit.
pub fn word_count(text: &str) -> usize {
    word_spans(text).len()
}

/// Byte ranges of the words in `text`. No-break spaces separate words too.
fn word_spans(text: &str) -> Vec<Range<usize>> {
    let mut spans = Vec::new();
    let mut start = None;
    for (i, c) in text.char_indices() {
        if c.is_whitespace() || NON_BREAKING.contains(&c) {
            if let Some(s) = start.take() {
                spans.push(s..i);
            }
        } else if start.is_none() {
            start = Some(i);
        }
    }
    if let Some(s) = start {
        spans.push(s..text.len());
    }
    spans.retain(|span| text[span.clone()].chars().any(char::is_alphanumeric));
    spans
}

fn is_breaking(c: char) -> bool {
    c.is_whitespace() && !NON_BREAKING.contains(&c)
}

/// Turn every breakable space between the last two words into `nbsp`.
///
/// Symbols between the words stay where they are: `now — really` becomes
/// `now\u{a0}—\u{a0}really`. With a single word, the space before
/// it is glued. Returns `None` when there is nothing left to glue.
pub(crate) fn glue_last_gap(text: &str, nbsp: &str) -> Option<String> {
    let words = word_spans(text);
    let last = words.last()?;
    let from = match words.len() {
        1 => 0,
        n => words[n - 2].end,
    };
    let between = &text[from..last.start];
    if !between.chars().any(is_breaking) {
        return None;
    }

    let mut out = String::with_capacity(text.len() + nbsp.len());
    out.push_str(&text[..from]);
    let mut in_gap = false;
    for c in between.chars() {
        if is_breaking(c) {
            if !in_gap {
                out.push_str(nbsp);
            }
            in_gap = true;
        } else {
            out.push(c);
            in_gap = false;
        }
    }
    out.push_str(&text[last.start..]);
    Some(out)
}

/// Replace the trailing breakable space of `text` with `nbsp`.
///
/// Used when the final word of a block sits alone in the next text node.
pub(crate) fn glue_trailing_space(text: &str, nbsp: &str) -> Option<String> {
    let body = text.trim_end_matches(is_breaking);
    if body.len() == text.len() {
        return None;
    }
    Some(format!("{body}{nbsp}"))
}

//! The rewrite passes.
//!
//! Each pass is a pure `&str -> String` function over one protected text
//! node. They run in this order, each gated by its feature flag:
//!
//! | Pass | Module | Rewrites |
//! |------|--------|----------|
//! | punctuation | [`punctuation`] | `--`, `---`, `...`, ` - `, numeric ranges |
//! | quotes | [`quotes`] | straight quotes, single-quoted spans, apostrophes |
//! | fractions | [`symbols`] | `1/2` → `½` and friends |
//! | arrows and symbols | [`symbols`] | `->`, `<=>`, `(c)`, `N deg` … |
//! | numbers | [`numbers`] | `1234567` → `1,234,567` |
//! | spacing | [`spacing`] | French thin spaces, space collapsing |
//! | orphans | [`breaks`] | short words, titles and units glued forward |
//!
//! Widow prevention lives in [`breaks`] too but runs once per element, after
//! every node of that element went through the passes above.
//!
//! The `regex` crate has no look-around, so passes that need to inspect the
//! characters around a match go through [`rewrite_matches`] and check the
//! neighbours by hand with [`char_before`] and [`char_after`].

pub mod breaks;
pub mod numbers;
pub mod punctuation;
pub mod quotes;
pub mod spacing;
pub mod symbols;

pub use breaks::{prevent_orphans, prevent_widows};
pub use numbers::fix_numbers;
pub use punctuation::fix_punctuation;
pub use quotes::{fix_apostrophes, fix_quotes, fix_quotes_continued};
pub use spacing::fix_spacing;
pub use symbols::{fix_arrows_and_symbols, fix_fractions};

use regex::{Captures, Regex};

/// ASCII fractions with a dedicated Unicode glyph.
pub const FRACTIONS: [(&str, &str); 9] = [
    ("1/2", "½"),
    ("1/3", "⅓"),
    ("2/3", "⅔"),
    ("1/4", "¼"),
    ("3/4", "¾"),
    ("1/8", "⅛"),
    ("3/8", "⅜"),
    ("5/8", "⅝"),
    ("7/8", "⅞"),
];

/// Replace each match of `re` for which `rewrite` returns a value.
///
/// Matches the closure declines are copied through unchanged.
pub(crate) fn rewrite_matches(
    text: &str,
    re: &Regex,
    mut rewrite: impl FnMut(&Captures<'_>) -> Option<String>,
) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for caps in re.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        if let Some(replacement) = rewrite(&caps) {
            out.push_str(&text[last..whole.start()]);
            out.push_str(&replacement);
            last = whole.end();
        }
    }
    out.push_str(&text[last..]);
    out
}

pub(crate) fn char_before(text: &str, idx: usize) -> Option<char> {
    text[..idx].chars().next_back()
}

pub(crate) fn char_after(text: &str, idx: usize) -> Option<char> {
    text[idx..].chars().next()
}

/// Letter, digit or underscore, the `\w` class.
pub(crate) fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// A bare four-digit year between 1900 and 2099.
pub(crate) fn is_year(digits: &str) -> bool {
    digits.len() == 4 && digits.parse::<u32>().is_ok_and(|y| (1900..=2099).contains(&y))
}

//! Fractions, arrows and math/legal symbols.

use super::{FRACTIONS, char_after, char_before, rewrite_matches};
use crate::locale::GlobalSymbols;
use regex::Regex;
use std::sync::LazyLock;

static FRACTION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+/\d+").unwrap());

static SINGLE_ARROW: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<->|->|<-").unwrap());

static TIMES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t][x*][ \t]").unwrap());

static LEGAL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\((c|r|tm)\)").unwrap());

static DEGREES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+)[ \t]?(?:degrees?|deg)\b").unwrap());

/// Characters allowed right after a fraction besides whitespace.
const FRACTION_TRAILERS: &[char] = &['.', ',', ';', ':', '!', '?', ')', ']', '"', '\'', '”', '’'];

/// Replace standalone ASCII fractions with their Unicode glyph.
///
/// The fraction must start the text or follow whitespace, and end the text
/// or precede whitespace or punctuation, so `1/2/3` and `11/2` stay as they
/// are.
pub fn fix_fractions(text: &str) -> String {
    if !text.contains('/') {
        return text.to_string();
    }
    rewrite_matches(text, &FRACTION, |caps| {
        let m = caps.get(0)?;
        if char_before(text, m.start()).is_some_and(|c| !c.is_whitespace()) {
            return None;
        }
        if char_after(text, m.end())
            .is_some_and(|c| !c.is_whitespace() && !FRACTION_TRAILERS.contains(&c))
        {
            return None;
        }
        FRACTIONS
            .iter()
            .find(|(ascii, _)| *ascii == m.as_str())
            .map(|(_, glyph)| glyph.to_string())
    })
}

/// Replace ASCII arrows, comparison operators and legal marks.
///
/// Text that already contains a right arrow is returned as is.
pub fn fix_arrows_and_symbols(text: &str, symbols: &GlobalSymbols) -> String {
    if text.contains(symbols.right_arrow) {
        return text.to_string();
    }

    let text = text
        .replace("<=>", symbols.double_left_right_arrow)
        .replace("==>", symbols.double_right_arrow)
        .replace("<==", symbols.double_left_arrow);

    // Single arrows only when set off by whitespace: `a->b` and `x<-1` stay.
    let text = rewrite_matches(&text, &SINGLE_ARROW, |caps| {
        let m = caps.get(0)?;
        let spaced = |c: Option<char>| c.is_none_or(char::is_whitespace);
        if !spaced(char_before(&text, m.start())) || !spaced(char_after(&text, m.end())) {
            return None;
        }
        Some(
            match m.as_str() {
                "<->" => symbols.left_right_arrow,
                "->" => symbols.right_arrow,
                _ => symbols.left_arrow,
            }
            .to_string(),
        )
    });

    let text = rewrite_matches(&text, &TIMES, |caps| {
        let m = caps.get(0)?;
        let digit = |c: Option<char>| c.is_some_and(|c| c.is_ascii_digit());
        (digit(char_before(&text, m.start())) && digit(char_after(&text, m.end())))
            .then(|| format!(" {} ", symbols.multiplication))
    });

    let text = text
        .replace("+/-", symbols.plus_minus)
        .replace("!=", symbols.not_equal)
        .replace("<=", symbols.less_equal)
        .replace(">=", symbols.greater_equal)
        .replace("~=", symbols.approximately);

    let text = LEGAL.replace_all(&text, |caps: &regex::Captures<'_>| {
        match caps[1].to_ascii_lowercase().as_str() {
            "c" => symbols.copyright,
            "r" => symbols.registered,
            _ => symbols.trademark,
        }
        .to_string()
    });

    let degree = format!("${{1}}{}", symbols.degree);
    DEGREES.replace_all(&text, degree.as_str()).into_owned()
}

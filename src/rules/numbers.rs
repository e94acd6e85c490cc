//! Thousands grouping.

use super::{char_after, char_before, is_word_char, is_year, rewrite_matches};
use crate::locale::LocaleRules;
use regex::Regex;
use std::sync::LazyLock;

static DIGIT_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[0-9]{4,}").unwrap());

/// Group runs of four or more digits by thousands.
///
/// Years between 1900 and 2099, the fractional part of a decimal (after
/// the locale's decimal separator), runs that are already grouped and
/// `#`-prefixed runs (issue numbers, hex colors) are left alone.
pub fn fix_numbers(text: &str, rules: &LocaleRules) -> String {
    rewrite_matches(text, &DIGIT_RUN, |caps| {
        let m = caps.get(0)?;
        let digits = m.as_str();
        let head = &text[..m.start()];
        if head.ends_with(rules.decimal_separator) || head.ends_with(rules.number_separator) {
            return None;
        }
        if char_before(text, m.start()).is_some_and(|c| is_word_char(c) || c == '#') {
            return None;
        }
        if char_after(text, m.end()).is_some_and(is_word_char) {
            return None;
        }
        if is_year(digits) {
            return None;
        }
        Some(group_digits(digits, rules.number_separator))
    })
}

fn group_digits(digits: &str, separator: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3 * separator.len());
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push_str(separator);
        }
        out.push(c);
    }
    out
}

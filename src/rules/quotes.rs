//! Curly quotes and apostrophes.
//!
//! [`fix_quotes`] runs first and claims quote pairs; [`fix_apostrophes`]
//! then converts the straight single quotes that are left and read as
//! contractions, decade abbreviations, elisions or plural possessives.

use super::is_word_char;
use crate::locale::LocaleRules;

/// Longest span, in characters, a single-quoted phrase may cover.
const MAX_SINGLE_SPAN: usize = 100;

/// Words that lose a leading letter: `'twas`, `'tis` …
const ELISIONS: [&str; 5] = ["twas", "tis", "til", "cause", "em"];

/// Characters that may follow a plural possessive (`the Joneses'.`).
const POSSESSIVE_TRAILERS: &[char] = &['.', ',', ';', ':', '!', '?', ')', '"', '”', '»'];

/// Replace straight double quotes and `'quoted'` spans with locale quotes.
///
/// Double quotes alternate open, close, open … through the text. Text that
/// already contains both the opening and the closing double-quote glyph is
/// returned untouched.
pub fn fix_quotes(text: &str, rules: &LocaleRules) -> String {
    fix_quotes_continued(text, rules, &mut false)
}

/// [`fix_quotes`] for one piece of a longer run of text.
///
/// `open` says whether a double quote is open on entry and is updated on
/// exit, so a pair split across inline markup still closes.
pub fn fix_quotes_continued(text: &str, rules: &LocaleRules, open: &mut bool) -> String {
    if text.contains(rules.left_double_quote) && text.contains(rules.right_double_quote) {
        return text.to_string();
    }

    let mut doubled = String::with_capacity(text.len());
    for c in text.chars() {
        if c == '"' {
            doubled.push_str(if *open {
                rules.right_double_quote
            } else {
                rules.left_double_quote
            });
            *open = !*open;
        } else {
            doubled.push(c);
        }
    }

    convert_single_spans(&doubled, rules)
}

/// Convert the straight single quotes that are apostrophes.
pub fn fix_apostrophes(text: &str, rules: &LocaleRules) -> String {
    if !text.contains('\'') {
        return text.to_string();
    }
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    for (i, &c) in chars.iter().enumerate() {
        if c == '\'' && is_apostrophe(&chars, i) {
            out.push_str(rules.apostrophe);
        } else {
            out.push(c);
        }
    }
    out
}

fn convert_single_spans(text: &str, rules: &LocaleRules) -> String {
    if !text.contains('\'') {
        return text.to_string();
    }
    let offsets: Vec<usize> = text.char_indices().map(|(pos, _)| pos).collect();
    let chars: Vec<char> = text.chars().collect();

    let mut out = String::with_capacity(text.len());
    let mut copied = 0;
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == '\''
            && opens_span(&chars, i)
            && let Some(close) = find_span_close(&chars, i)
        {
            out.push_str(&text[copied..offsets[i]]);
            out.push_str(rules.left_single_quote);
            out.push_str(&text[offsets[i] + 1..offsets[close]]);
            out.push_str(rules.right_single_quote);
            copied = offsets[close] + 1;
            i = close + 1;
            continue;
        }
        i += 1;
    }
    out.push_str(&text[copied..]);
    out
}

fn opens_span(chars: &[char], i: usize) -> bool {
    let after_word = i > 0 && is_word_char(chars[i - 1]);
    let before_word = chars.get(i + 1).is_some_and(|&c| is_word_char(c));
    !after_word && before_word && !starts_decade(chars, i) && !starts_elision(chars, i)
}

fn find_span_close(chars: &[char], open: usize) -> Option<usize> {
    let end = (open + 1 + MAX_SINGLE_SPAN).min(chars.len());
    for j in open + 2..end {
        match chars[j] {
            '\n' => return None,
            '\'' if !chars[j - 1].is_whitespace()
                && chars.get(j + 1).is_none_or(|&c| !is_word_char(c)) =>
            {
                return Some(j);
            }
            _ => {}
        }
    }
    None
}

fn is_apostrophe(chars: &[char], i: usize) -> bool {
    let prev = i.checked_sub(1).map(|p| chars[p]);
    let next = chars.get(i + 1).copied();
    let prev_word = prev.is_some_and(is_word_char);
    let next_word = next.is_some_and(is_word_char);

    if prev_word && next_word {
        return true;
    }
    if !prev_word {
        return starts_decade(chars, i) || starts_elision(chars, i);
    }
    matches!(prev, Some('s' | 'S'))
        && i >= 2
        && is_word_char(chars[i - 2])
        && next.is_none_or(|c| c.is_whitespace() || POSSESSIVE_TRAILERS.contains(&c))
}

/// `'90s`
fn starts_decade(chars: &[char], i: usize) -> bool {
    matches!(
        chars.get(i + 1..i + 4),
        Some([a, b, 's']) if a.is_ascii_digit() && b.is_ascii_digit()
    ) && chars.get(i + 4).is_none_or(|&c| !is_word_char(c))
}

fn starts_elision(chars: &[char], i: usize) -> bool {
    ELISIONS.iter().any(|word| {
        let len = word.chars().count();
        chars.get(i + 1..i + 1 + len).is_some_and(|candidate| {
            candidate
                .iter()
                .zip(word.chars())
                .all(|(a, b)| a.to_lowercase().eq(b.to_lowercase()))
        }) && chars.get(i + 1 + len).is_none_or(|&c| !is_word_char(c))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locale::Locale;

    fn quotes(text: &str, locale: Locale) -> String {
        let rules = locale.rules();
        fix_apostrophes(&fix_quotes(text, rules), rules)
    }

    // =========================================================================
    // Double quotes
    // =========================================================================

    #[test]
    fn double_quotes_alternate() {
        assert_eq!(
            quotes(r#""Hello," she said, "goodbye.""#, Locale::En),
            "“Hello,” she said, “goodbye.”"
        );
    }

    #[test]
    fn double_quotes_follow_locale() {
        assert_eq!(quotes(r#""bonjour""#, Locale::Fr), "«bonjour»");
        assert_eq!(quotes(r#""Hallo""#, Locale::De), "„Hallo“");
        assert_eq!(quotes(r#""hola""#, Locale::Es), "«hola»");
    }

    #[test]
    fn typeset_double_quotes_short_circuit() {
        let text = "“done” and \"raw\"";
        assert_eq!(fix_quotes(text, Locale::En.rules()), text);
    }

    #[test]
    fn one_glyph_present_still_converts() {
        let en = Locale::En.rules();
        assert_eq!(
            fix_quotes("“partial and \"full\"", en),
            "“partial and “full”"
        );
        assert_eq!(fix_quotes("end” then \"new\"", en), "end” then “new”");
    }

    #[test]
    fn open_quote_carries_between_pieces() {
        let en = Locale::En.rules();
        let mut open = false;
        assert_eq!(fix_quotes_continued("\"Hello ", en, &mut open), "“Hello ");
        assert!(open);
        assert_eq!(fix_quotes_continued("world", en, &mut open), "world");
        assert_eq!(fix_quotes_continued("\" she said", en, &mut open), "” she said");
        assert!(!open);
    }

    // =========================================================================
    // Single quotes
    // =========================================================================

    #[test]
    fn single_quoted_span() {
        assert_eq!(
            quotes("he said 'hi there' loudly", Locale::En),
            "he said ‘hi there’ loudly"
        );
    }

    #[test]
    fn nested_single_inside_double() {
        assert_eq!(quotes(r#""She said 'hi'""#, Locale::En), "“She said ‘hi’”");
    }

    #[test]
    fn spans_do_not_cross_newlines() {
        assert_eq!(quotes("'open\nclose'", Locale::En), "'open\nclose'");
    }

    #[test]
    fn span_and_apostrophes_together() {
        assert_eq!(
            quotes("It's John's 'book'", Locale::En),
            "It’s John’s ‘book’"
        );
    }

    // =========================================================================
    // Apostrophes
    // =========================================================================

    #[test]
    fn contractions() {
        assert_eq!(quotes("don't won't", Locale::En), "don’t won’t");
        assert_eq!(quotes("l'homme", Locale::Fr), "l’homme");
    }

    #[test]
    fn decades_and_elisions() {
        assert_eq!(quotes("back in the '90s", Locale::En), "back in the ’90s");
        assert_eq!(quotes("'Twas the night", Locale::En), "’Twas the night");
        assert_eq!(quotes("rock 'em", Locale::En), "rock ’em");
    }

    #[test]
    fn plural_possessives() {
        assert_eq!(quotes("James' book", Locale::En), "James’ book");
        assert_eq!(quotes("the Joneses'.", Locale::En), "the Joneses’.");
        assert_eq!(quotes("the boss'", Locale::En), "the boss’");
    }

    #[test]
    fn lone_quotes_stay_straight() {
        assert_eq!(quotes("5 ' 6", Locale::En), "5 ' 6");
    }

    #[test]
    fn idempotent() {
        let once = quotes(r#""It's 'fine'," he said"#, Locale::En);
        assert_eq!(quotes(&once, Locale::En), once);
    }
}

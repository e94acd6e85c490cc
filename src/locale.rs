//! Locale rule tables.
//!
//! Every rewrite pass is driven by a [`LocaleRules`] record (glyphs) and by
//! three word lists: short function words that must not end a line, title
//! abbreviations that stay glued to the following name, and units that stay
//! glued to a preceding number. Arrow, math and legal symbols are shared by
//! all locales in [`SYMBOLS`].
//!
//! | Locale | Double quotes | Single quotes | Thousands | Decimal |
//! |--------|---------------|---------------|-----------|---------|
//! | `en`   | “ ”           | ‘ ’           | `,`       | `.`     |
//! | `fr`   | « »           | “ ”           | U+202F    | `,`     |
//! | `de`   | „ “           | ‚ ‘           | `.`       | `,`     |
//! | `es`   | « »           | “ ”           | `.`       | `,`     |
//! | `it`   | « »           | “ ”           | `.`       | `,`     |
//!
//! Lookups take BCP 47-ish codes (`fr`, `fr-CA`, `de_AT`, `EN`). Anything
//! unrecognized falls back to English.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A supported typography locale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    En,
    Fr,
    De,
    Es,
    It,
}

impl Locale {
    pub const ALL: [Locale; 5] = [Locale::En, Locale::Fr, Locale::De, Locale::Es, Locale::It];

    /// Parse a language tag, ignoring region subtags and case.
    ///
    /// Returns `None` for languages without a rule table.
    pub fn from_code(code: &str) -> Option<Locale> {
        let primary = code
            .trim()
            .split(['-', '_'])
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        match primary.as_str() {
            "en" => Some(Locale::En),
            "fr" => Some(Locale::Fr),
            "de" => Some(Locale::De),
            "es" => Some(Locale::Es),
            "it" => Some(Locale::It),
            _ => None,
        }
    }

    /// Like [`Locale::from_code`], falling back to English.
    pub fn resolve(code: &str) -> Locale {
        Self::from_code(code).unwrap_or_else(|| {
            log::debug!("no typography rules for locale '{code}', using en");
            Locale::En
        })
    }

    pub fn code(self) -> &'static str {
        match self {
            Locale::En => "en",
            Locale::Fr => "fr",
            Locale::De => "de",
            Locale::Es => "es",
            Locale::It => "it",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Locale::En => "English",
            Locale::Fr => "French",
            Locale::De => "German",
            Locale::Es => "Spanish",
            Locale::It => "Italian",
        }
    }

    pub fn rules(self) -> &'static LocaleRules {
        match self {
            Locale::En => &EN,
            Locale::Fr => &FR,
            Locale::De => &DE,
            Locale::Es => &ES,
            Locale::It => &IT,
        }
    }

    /// Short function words (articles, conjunctions, prepositions) that get a
    /// non-breaking space after them.
    pub fn orphan_words(self) -> &'static [&'static str] {
        match self {
            Locale::En => &[
                "a", "an", "the", "and", "but", "or", "nor", "for", "so", "yet", "as", "at",
                "by", "in", "of", "on", "to", "up", "via", "per",
            ],
            Locale::Fr => &[
                "à", "au", "aux", "ce", "de", "des", "du", "en", "et", "la", "le", "les", "ni",
                "ou", "où", "par", "pour", "sa", "se", "ses", "son", "sur", "un", "une", "y",
            ],
            Locale::De => &[
                "am", "an", "auf", "aus", "bei", "das", "der", "die", "ein", "eine", "für", "im",
                "in", "mit", "oder", "um", "und", "von", "vom", "zu", "zum", "zur",
            ],
            Locale::Es => &[
                "a", "al", "con", "de", "del", "e", "el", "en", "la", "las", "los", "o", "para",
                "por", "que", "sin", "u", "un", "una", "unas", "unos", "y",
            ],
            Locale::It => &[
                "a", "ai", "al", "che", "con", "da", "di", "del", "e", "fra", "gli", "i", "il",
                "in", "la", "le", "lo", "o", "per", "su", "tra", "un", "una", "uno",
            ],
        }
    }

    /// Honorifics written with a trailing period (`Dr.`, `M.`).
    pub fn title_abbreviations(self) -> &'static [&'static str] {
        match self {
            Locale::En => &["Mr", "Mrs", "Ms", "Dr", "Prof", "St", "Mt", "Jr", "Sr"],
            Locale::Fr => &["M", "Mme", "Mlle", "MM", "Dr", "Pr", "Me", "Mgr", "St", "Ste"],
            Locale::De => &["Hr", "Fr", "Dr", "Prof", "St"],
            Locale::Es => &["Sr", "Sra", "Srta", "Dr", "Dra", "Prof", "Dña", "Dn"],
            Locale::It => &["Sig", "Sig.ra", "Dott", "Dott.ssa", "Prof", "Avv", "Ing"],
        }
    }

    /// Units and symbols that follow a number (`5 km`, `10 am`, `3 €`).
    pub fn units(self) -> &'static [&'static str] {
        match self {
            Locale::En => &[
                "km", "m", "cm", "mm", "kg", "g", "mg", "lb", "lbs", "oz", "ft", "mi", "mph",
                "km/h", "l", "ml", "h", "min", "s", "ms", "am", "pm", "AM", "PM", "%", "°C",
                "°F", "€", "$", "£", "KB", "MB", "GB", "TB", "px",
            ],
            Locale::Fr => &[
                "km", "m", "cm", "mm", "kg", "g", "mg", "l", "ml", "h", "min", "s", "ms", "km/h",
                "%", "°C", "€", "$", "£", "Ko", "Mo", "Go", "To", "px",
            ],
            Locale::De => &[
                "km", "m", "cm", "mm", "kg", "g", "mg", "l", "ml", "h", "min", "s", "ms", "km/h",
                "Uhr", "%", "°C", "€", "$", "£", "KB", "MB", "GB", "TB", "px",
            ],
            Locale::Es | Locale::It => &[
                "km", "m", "cm", "mm", "kg", "g", "mg", "l", "ml", "h", "min", "s", "ms", "km/h",
                "%", "°C", "€", "$", "£", "KB", "MB", "GB", "TB", "px",
            ],
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Glyph table for one locale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocaleRules {
    pub thin_space: &'static str,
    pub nbsp: &'static str,
    pub em_dash: &'static str,
    pub en_dash: &'static str,
    pub ellipsis: &'static str,
    pub left_double_quote: &'static str,
    pub right_double_quote: &'static str,
    pub left_single_quote: &'static str,
    pub right_single_quote: &'static str,
    pub apostrophe: &'static str,
    pub number_separator: &'static str,
    pub decimal_separator: &'static str,
}

/// Rules for a language tag; unknown tags get the English table.
pub fn rules_for(code: &str) -> &'static LocaleRules {
    Locale::resolve(code).rules()
}

static EN: LocaleRules = LocaleRules {
    thin_space: "\u{2009}",
    nbsp: "\u{00A0}",
    em_dash: "\u{2014}",
    en_dash: "\u{2013}",
    ellipsis: "\u{2026}",
    left_double_quote: "\u{201C}",
    right_double_quote: "\u{201D}",
    left_single_quote: "\u{2018}",
    right_single_quote: "\u{2019}",
    apostrophe: "\u{2019}",
    number_separator: ",",
    decimal_separator: ".",
};

static FR: LocaleRules = LocaleRules {
    thin_space: "\u{202F}",
    nbsp: "\u{00A0}",
    em_dash: "\u{2014}",
    en_dash: "\u{2013}",
    ellipsis: "\u{2026}",
    left_double_quote: "\u{00AB}",
    right_double_quote: "\u{00BB}",
    left_single_quote: "\u{201C}",
    right_single_quote: "\u{201D}",
    apostrophe: "\u{2019}",
    number_separator: "\u{202F}",
    decimal_separator: ",",
};

static DE: LocaleRules = LocaleRules {
    thin_space: "\u{2009}",
    nbsp: "\u{00A0}",
    em_dash: "\u{2014}",
    en_dash: "\u{2013}",
    ellipsis: "\u{2026}",
    left_double_quote: "\u{201E}",
    right_double_quote: "\u{201C}",
    left_single_quote: "\u{201A}",
    right_single_quote: "\u{2018}",
    apostrophe: "\u{2019}",
    number_separator: ".",
    decimal_separator: ",",
};

static ES: LocaleRules = LocaleRules {
    thin_space: "\u{2009}",
    nbsp: "\u{00A0}",
    em_dash: "\u{2014}",
    en_dash: "\u{2013}",
    ellipsis: "\u{2026}",
    left_double_quote: "\u{00AB}",
    right_double_quote: "\u{00BB}",
    left_single_quote: "\u{201C}",
    right_single_quote: "\u{201D}",
    apostrophe: "\u{2019}",
    number_separator: ".",
    decimal_separator: ",",
};

static IT: LocaleRules = LocaleRules {
    thin_space: "\u{2009}",
    nbsp: "\u{00A0}",
    em_dash: "\u{2014}",
    en_dash: "\u{2013}",
    ellipsis: "\u{2026}",
    left_double_quote: "\u{00AB}",
    right_double_quote: "\u{00BB}",
    left_single_quote: "\u{201C}",
    right_single_quote: "\u{201D}",
    apostrophe: "\u{2019}",
    number_separator: ".",
    decimal_separator: ",",
};

/// Locale-independent symbol glyphs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GlobalSymbols {
    pub right_arrow: &'static str,
    pub left_arrow: &'static str,
    pub left_right_arrow: &'static str,
    pub double_right_arrow: &'static str,
    pub double_left_arrow: &'static str,
    pub double_left_right_arrow: &'static str,
    pub multiplication: &'static str,
    pub plus_minus: &'static str,
    pub not_equal: &'static str,
    pub less_equal: &'static str,
    pub greater_equal: &'static str,
    pub approximately: &'static str,
    pub copyright: &'static str,
    pub registered: &'static str,
    pub trademark: &'static str,
    pub degree: &'static str,
}

pub static SYMBOLS: GlobalSymbols = GlobalSymbols {
    right_arrow: "\u{2192}",
    left_arrow: "\u{2190}",
    left_right_arrow: "\u{2194}",
    double_right_arrow: "\u{21D2}",
    double_left_arrow: "\u{21D0}",
    double_left_right_arrow: "\u{21D4}",
    multiplication: "\u{00D7}",
    plus_minus: "\u{00B1}",
    not_equal: "\u{2260}",
    less_equal: "\u{2264}",
    greater_equal: "\u{2265}",
    approximately: "\u{2248}",
    copyright: "\u{00A9}",
    registered: "\u{00AE}",
    trademark: "\u{2122}",
    degree: "\u{00B0}",
};

//! # Standard Typography
//!
//! Locale-aware typesetting for static sites. Straight quotes become curly
//! (or guillemets), `--` becomes an em dash, `1/2` becomes `½`, short words
//! stay glued to the word after them and the last two words of a paragraph
//! share a line. All of it happens on the text nodes of parsed HTML, so the
//! markup around them comes out byte for byte as it went in.
//!
//! # Architecture
//!
//! ```text
//! text node ─► protect ─► rules (punctuation, quotes, symbols, ...) ─► restore
//!                                                                        │
//! HTML ─► dom::Document ─► Typographer::process_all ─► widows ─► to_html ◄┘
//! ```
//!
//! The rewrite rules are plain string functions. The [`processor`] decides
//! which text they see: only text owned by elements matching the configured
//! selectors, and never text inside excluded elements such as `code` or
//! `pre`. Anything that must not be touched at all (URLs, emails, dates)
//! is swapped for a placeholder by [`protect`] before the rules run.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`locale`] | Glyph tables and word lists for `en`, `fr`, `de`, `es`, `it` |
//! | [`protect`] | Placeholder substitution for URLs, emails and dates |
//! | [`rules`] | The rewrite passes: punctuation, quotes, symbols, numbers, spacing, line breaks |
//! | [`pipeline`] | Runs the enabled passes over one text node |
//! | [`selector`] | CSS selector lists for the process/exclude configuration |
//! | [`dom`] | HTML document model and the [`dom::TextTree`] seam |
//! | [`processor`] | The [`Typographer`]: tree walk, exclusions, widows, markers |
//! | [`events`] | Lifecycle events delivered over `mpsc` |
//! | [`markdown`] | Markdown rendering with typesetting as a post-render hook |
//! | [`config`] | `typography.toml` loading, merging and validation |
//! | [`cache`] | Content-addressed output cache for incremental builds |
//! | [`site`] | Parallel batch typesetting of a site directory |
//! | [`watch`] | Debounced rebuilds on file-system changes |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## A Real Parser, A Splicing Serializer
//!
//! HTML is parsed with `tl`, and the document keeps the byte span of every
//! text node and start tag. Serializing writes the original bytes and only
//! splices in the text nodes and start tags that changed. Formatting,
//! comments, attribute quoting and entity style elsewhere are untouched.
//! Bodies of raw-text elements such as `script` are masked before `tl`
//! sees them, so a `<` in inline code cannot open a bogus tag.
//!
//! Selectors are `scraper`'s, matched against an html5ever parse of the
//! element skeleton.
//!
//! ## Idempotence
//!
//! Every pass is written so that running it on its own output changes
//! nothing, and elements carry `data-typography-processed` once typeset, so
//! repeated runs over the same document skip them. [`Typographer::refresh`]
//! clears the markers and typesets again.
//!
//! ## Config Cascading
//!
//! In a site build, `typography.toml` files at any level of the tree
//! override their parent's:
//!
//! ```text
//! site/typography.toml        ← root (overrides stock defaults)
//! site/fr/typography.toml     ← section (overrides root)
//! ```

pub mod cache;
pub mod config;
pub mod dom;
pub mod events;
pub mod locale;
pub mod markdown;
pub mod output;
pub mod pipeline;
pub mod processor;
pub mod protect;
pub mod rules;
pub mod selector;
pub mod site;
pub mod watch;

pub use config::TypographyConfig;
pub use locale::Locale;
pub use processor::Typographer;

/// Typeset a plain string with default settings and a fixed locale.
pub fn typeset_text(text: &str, locale: Locale) -> String {
    let features = config::Features::default();
    pipeline::typeset_plain(text, locale, &features).unwrap_or_else(|e| {
        log::warn!("returning text unchanged: {e}");
        text.to_string()
    })
}

/// Typeset an HTML fragment or document with default settings.
///
/// The locale comes from `lang` attributes, falling back to English; input
/// that cannot be parsed is returned unchanged.
pub fn typeset_html(html: &str) -> String {
    match Typographer::new(TypographyConfig::default()) {
        Ok(typographer) => typographer.typeset_html(html),
        Err(e) => {
            log::warn!("returning HTML unchanged: {e}");
            html.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn convenience_text() {
        assert_eq!(typeset_text("\"hi\" -- there", Locale::En), "“hi” — there");
    }

    #[test]
    fn convenience_html_reads_lang() {
        let out = typeset_html(r#"<div lang="de"><p>Er sagte "ja" und ging.</p></div>"#);
        assert!(out.contains("„ja“"), "{out}");
    }
}

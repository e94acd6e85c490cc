//! Markdown rendering with typesetting as a post-render hook.
//!
//! Markdown goes through `pulldown-cmark` to HTML, then the HTML goes
//! through a [`Typographer`]. Code spans and fenced blocks come out as
//! `<code>`/`<pre>`, so the default exclusions keep them untouched.
//!
//! [`standalone_document`] wraps a rendered body in a full page, used by the
//! CLI's `markdown --standalone` and by the site build for `.md` sources.

use crate::locale::Locale;
use crate::processor::Typographer;
use maud::{DOCTYPE, Markup, PreEscaped, html};
use pulldown_cmark::{Event, HeadingLevel, Options, Parser, Tag, TagEnd, html as md_html};

fn options() -> Options {
    Options::ENABLE_TABLES | Options::ENABLE_FOOTNOTES | Options::ENABLE_STRIKETHROUGH
}

/// Markdown to HTML, untouched by the typographer.
pub fn render_html(markdown: &str) -> String {
    let parser = Parser::new_ext(markdown, options());
    let mut body_html = String::new();
    md_html::push_html(&mut body_html, parser);
    body_html
}

/// Plain text of the first level-one heading.
pub fn extract_title(markdown: &str) -> Option<String> {
    let mut in_title = false;
    let mut title = String::new();
    for event in Parser::new_ext(markdown, options()) {
        match event {
            Event::Start(Tag::Heading {
                level: HeadingLevel::H1,
                ..
            }) => in_title = true,
            Event::End(TagEnd::Heading(HeadingLevel::H1)) if in_title => {
                let title = title.trim();
                return (!title.is_empty()).then(|| title.to_string());
            }
            Event::Text(text) | Event::Code(text) if in_title => title.push_str(&text),
            Event::SoftBreak | Event::HardBreak if in_title => title.push(' '),
            _ => {}
        }
    }
    None
}

/// Render `markdown` and typeset the result.
///
/// `locale` overrides the typographer's own setting for this page only.
pub fn render(markdown: &str, typographer: &Typographer, locale: Option<Locale>) -> String {
    let body = render_html(markdown);
    match locale {
        Some(locale) => typographer
            .clone()
            .with_locale(Some(locale))
            .typeset_html(&body),
        None => typographer.typeset_html(&body),
    }
}

/// A complete HTML page around an already rendered `body`.
pub fn standalone_document(title: &str, lang: &str, body: &str) -> Markup {
    html! {
        (DOCTYPE)
        html lang=(lang) {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (title) }
            }
            body {
                (PreEscaped(body))
            }
        }
    }
}

//! Document model for typesetting HTML.
//!
//! [`Document`] parses a fragment or full page with `tl` and keeps an owned
//! arena of elements and text nodes, each remembering its byte span in the
//! source. Serialization splices rewritten text nodes and changed start
//! tags back into the original string, so everything the passes did not
//! touch (doctype, comments, whitespace, attribute quoting) comes out
//! byte-for-byte as it went in.
//!
//! Raw-text elements (`script`, `style`, `textarea`, `title` …) end only
//! at their own end tag, whatever they contain. `tl` does not know that, so
//! their bodies are masked before parsing: every `<` inside becomes a
//! space in a same-length copy of the source. Spans found in the copy
//! index the original, which is where all text is read from.
//!
//! Selector matching runs on a mirror: the element skeleton serialized with
//! an id attribute per element and parsed by html5ever through `scraper`,
//! so selectors see the tree a browser would build.
//!
//! The processor never talks to `Document` directly. It goes through the
//! [`TextTree`] trait, the small DOM seam every tree implementation shares:
//!
//! ```text
//! Processor ──► TextTree ──► Document (tl-backed arena)
//!                       └──► any other tree (tests, other parsers)
//! ```

use crate::selector::SelectorList;
use std::borrow::Cow;
use std::ops::Range;
use thiserror::Error;

/// Elements whose content is text up to their end tag.
const RAW_TEXT_ELEMENTS: [&str; 8] = [
    "script", "style", "textarea", "title", "xmp", "iframe", "noembed", "noframes",
];

const VOID_ELEMENTS: [&str; 14] = [
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

/// Attribute carrying the arena index on mirror elements.
const MIRROR_ID_ATTR: &str = "data-typography-node";

#[derive(Error, Debug)]
pub enum DomError {
    #[error("HTML parse error: {0}")]
    Parse(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextId(usize);

impl ElementId {
    /// Position in document order.
    pub fn index(self) -> usize {
        self.0
    }
}

/// The DOM operations the typesetter needs.
///
/// Implementors provide navigation, attribute access and text access; the
/// selector helpers are derived from those.
pub trait TextTree {
    /// Every element, in document order.
    fn elements(&self) -> Vec<ElementId>;

    /// Lowercase tag name.
    fn tag_name(&self, element: ElementId) -> &str;

    /// Attribute value; valueless attributes read as `""`.
    fn attribute(&self, element: ElementId, name: &str) -> Option<&str>;

    fn set_attribute(&mut self, element: ElementId, name: &str, value: &str);

    /// Returns whether the attribute was present.
    fn remove_attribute(&mut self, element: ElementId, name: &str) -> bool;

    fn parent(&self, element: ElementId) -> Option<ElementId>;

    /// Text nodes at any depth under `element`, in document order.
    fn text_nodes(&self, element: ElementId) -> Vec<TextId>;

    fn text_parent(&self, text: TextId) -> Option<ElementId>;

    fn text(&self, text: TextId) -> &str;

    fn set_text(&mut self, text: TextId, value: String);

    /// Elements matching `selector`, in document order.
    fn select(&self, selector: &SelectorList) -> Vec<ElementId>;

    fn has_attribute(&self, element: ElementId, name: &str) -> bool {
        self.attribute(element, name).is_some()
    }

    fn matches(&self, element: ElementId, selector: &SelectorList) -> bool {
        self.select(selector).contains(&element)
    }

    /// Nearest ancestor-or-self matching `selector`.
    fn closest(&self, element: ElementId, selector: &SelectorList) -> Option<ElementId> {
        let matched = selector.select(self);
        self.ancestors(element)
            .into_iter()
            .find(|e| matched.contains(e))
    }

    /// `element` followed by its ancestors, innermost first.
    fn ancestors(&self, element: ElementId) -> Vec<ElementId> {
        let mut chain = vec![element];
        let mut current = self.parent(element);
        while let Some(e) = current {
            chain.push(e);
            current = self.parent(e);
        }
        chain
    }
}

#[derive(Debug, Clone, Copy)]
enum Child {
    Element(ElementId),
    Text(TextId),
}

#[derive(Debug, Clone)]
struct ElementNode {
    name: String,
    attributes: Vec<(String, Option<String>)>,
    parent: Option<ElementId>,
    children: Vec<Child>,
    /// `<` through `>` of the start tag in the source.
    start_tag: Range<usize>,
    attributes_changed: bool,
}

#[derive(Debug, Clone)]
struct TextNode {
    parent: Option<ElementId>,
    span: Range<usize>,
    /// Entity-decoded source text.
    original: String,
    current: String,
}

/// A parsed HTML document with splice-back serialization.
#[derive(Debug, Clone)]
pub struct Document {
    source: String,
    elements: Vec<ElementNode>,
    texts: Vec<TextNode>,
    roots: Vec<Child>,
}

impl Document {
    pub fn parse(html: &str) -> Result<Self, DomError> {
        let masked = mask_raw_text(html);
        let masked: &str = &masked;
        let dom = tl::parse(masked, tl::ParserOptions::default())
            .map_err(|e| DomError::Parse(format!("{e:?}")))?;
        let parser = dom.parser();

        let mut builder = Builder {
            masked,
            original: html,
            elements: Vec::new(),
            texts: Vec::new(),
        };
        let roots = dom
            .children()
            .iter()
            .filter_map(|handle| builder.visit(*handle, parser, None))
            .collect();

        log::trace!(
            "parsed {} elements and {} text nodes",
            builder.elements.len(),
            builder.texts.len()
        );
        Ok(Self {
            source: html.to_string(),
            elements: builder.elements,
            texts: builder.texts,
            roots,
        })
    }

    /// Whether any text or attribute differs from the source.
    pub fn is_modified(&self) -> bool {
        self.texts.iter().any(|t| t.current != t.original)
            || self.elements.iter().any(|e| e.attributes_changed)
    }

    /// Serialize, splicing changed nodes into the original markup.
    pub fn to_html(&self) -> String {
        let mut edits: Vec<(Range<usize>, String)> = Vec::new();
        for text in &self.texts {
            if text.current != text.original {
                edits.push((
                    text.span.clone(),
                    html_escape::encode_text(&text.current).into_owned(),
                ));
            }
        }
        for element in &self.elements {
            if element.attributes_changed {
                edits.push((element.start_tag.clone(), self.render_start_tag(element)));
            }
        }
        edits.sort_by_key(|(span, _)| span.start);

        let mut out = String::with_capacity(self.source.len() + edits.len() * 16);
        let mut copied = 0;
        for (span, replacement) in edits {
            out.push_str(&self.source[copied..span.start]);
            out.push_str(&replacement);
            copied = span.end;
        }
        out.push_str(&self.source[copied..]);
        out
    }

    /// The element skeleton as HTML for html5ever, each element tagged
    /// with its arena index.
    fn mirror_html(&self) -> String {
        let mut out = String::with_capacity(self.elements.len() * 32);
        if self.is_full_page() {
            // Standards mode, as the page itself most likely is.
            out.push_str("<!DOCTYPE html>");
        }
        let mut stack: Vec<MirrorStep> =
            self.roots.iter().rev().map(|&c| MirrorStep::Open(c)).collect();
        while let Some(step) = stack.pop() {
            match step {
                MirrorStep::Close(id) => {
                    out.push_str("</");
                    out.push_str(&self.elements[id.0].name);
                    out.push('>');
                }
                MirrorStep::Open(Child::Text(id)) => {
                    // Only emptiness matters to selectors (`:empty`).
                    let blank = self.texts[id.0].current.trim().is_empty();
                    out.push(if blank { ' ' } else { 't' });
                }
                MirrorStep::Open(Child::Element(id)) => {
                    let node = &self.elements[id.0];
                    let emitted = is_plain_name(&node.name) && node.name != "plaintext";
                    if emitted {
                        out.push('<');
                        out.push_str(&node.name);
                        out.push_str(&format!(" {MIRROR_ID_ATTR}=\"{}\"", id.0));
                        for (name, value) in &node.attributes {
                            if !is_plain_name(name) || name == MIRROR_ID_ATTR {
                                continue;
                            }
                            out.push(' ');
                            out.push_str(name);
                            out.push_str("=\"");
                            let value = value.as_deref().unwrap_or("");
                            out.push_str(&html_escape::encode_double_quoted_attribute(value));
                            out.push('"');
                        }
                        out.push('>');
                        if !VOID_ELEMENTS.contains(&node.name.as_str()) {
                            stack.push(MirrorStep::Close(id));
                        }
                    }
                    stack.extend(node.children.iter().rev().map(|&c| MirrorStep::Open(c)));
                }
            }
        }
        out
    }

    fn is_full_page(&self) -> bool {
        self.elements
            .iter()
            .any(|e| matches!(e.name.as_str(), "html" | "head" | "body"))
    }

    fn render_start_tag(&self, element: &ElementNode) -> String {
        let mut tag = format!("<{}", element.name);
        for (name, value) in &element.attributes {
            tag.push(' ');
            tag.push_str(name);
            if let Some(value) = value {
                tag.push_str("=\"");
                tag.push_str(&html_escape::encode_double_quoted_attribute(value));
                tag.push('"');
            }
        }
        if self.source[element.start_tag.clone()].ends_with("/>") {
            tag.push_str(" />");
        } else {
            tag.push('>');
        }
        tag
    }
}

impl TextTree for Document {
    fn elements(&self) -> Vec<ElementId> {
        (0..self.elements.len()).map(ElementId).collect()
    }

    fn tag_name(&self, element: ElementId) -> &str {
        &self.elements[element.0].name
    }

    fn attribute(&self, element: ElementId, name: &str) -> Option<&str> {
        self.elements[element.0]
            .attributes
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_deref().unwrap_or(""))
    }

    fn set_attribute(&mut self, element: ElementId, name: &str, value: &str) {
        let node = &mut self.elements[element.0];
        match node
            .attributes
            .iter()
            .position(|(key, _)| key.eq_ignore_ascii_case(name))
        {
            Some(i) if node.attributes[i].1.as_deref() == Some(value) => return,
            Some(i) => node.attributes[i].1 = Some(value.to_string()),
            None => node
                .attributes
                .push((name.to_ascii_lowercase(), Some(value.to_string()))),
        }
        node.attributes_changed = true;
    }

    fn remove_attribute(&mut self, element: ElementId, name: &str) -> bool {
        let node = &mut self.elements[element.0];
        let before = node.attributes.len();
        node.attributes.retain(|(key, _)| !key.eq_ignore_ascii_case(name));
        let removed = node.attributes.len() != before;
        if removed {
            node.attributes_changed = true;
        }
        removed
    }

    fn parent(&self, element: ElementId) -> Option<ElementId> {
        self.elements[element.0].parent
    }

    fn text_nodes(&self, element: ElementId) -> Vec<TextId> {
        let mut found = Vec::new();
        let children = &self.elements[element.0].children;
        let mut stack: Vec<Child> = children.iter().rev().copied().collect();
        while let Some(child) = stack.pop() {
            match child {
                Child::Text(id) => found.push(id),
                Child::Element(id) => {
                    stack.extend(self.elements[id.0].children.iter().rev().copied());
                }
            }
        }
        found
    }

    fn text_parent(&self, text: TextId) -> Option<ElementId> {
        self.texts[text.0].parent
    }

    fn text(&self, text: TextId) -> &str {
        &self.texts[text.0].current
    }

    fn set_text(&mut self, text: TextId, value: String) {
        self.texts[text.0].current = value;
    }

    fn select(&self, selector: &SelectorList) -> Vec<ElementId> {
        let markup = self.mirror_html();
        let mirror = if self.is_full_page() {
            scraper::Html::parse_document(&markup)
        } else {
            scraper::Html::parse_fragment(&markup)
        };
        let mut found: Vec<ElementId> = mirror
            .select(selector.css())
            .filter_map(|el| el.value().attr(MIRROR_ID_ATTR)?.parse::<usize>().ok())
            .filter(|&index| index < self.elements.len())
            .map(ElementId)
            .collect();
        found.sort_unstable();
        found.dedup();
        found
    }
}

#[derive(Debug, Clone, Copy)]
enum MirrorStep {
    Open(Child),
    Close(ElementId),
}

struct Builder<'s> {
    /// What `tl` parsed; spans are computed against it.
    masked: &'s str,
    /// What text is read from.
    original: &'s str,
    elements: Vec<ElementNode>,
    texts: Vec<TextNode>,
}

impl Builder<'_> {
    fn visit(
        &mut self,
        handle: tl::NodeHandle,
        parser: &tl::Parser<'_>,
        parent: Option<ElementId>,
    ) -> Option<Child> {
        match handle.get(parser)? {
            tl::Node::Tag(tag) => {
                let start = span_of(self.masked, tag.raw().as_bytes())?.start;
                let start_tag = start..start + start_tag_len(&self.masked[start..]);
                let attributes = tag
                    .attributes()
                    .iter()
                    .map(|(key, value)| {
                        let value =
                            value.map(|v| html_escape::decode_html_entities(&v).into_owned());
                        (key.to_ascii_lowercase(), value)
                    })
                    .collect();

                let id = ElementId(self.elements.len());
                self.elements.push(ElementNode {
                    name: tag.name().as_utf8_str().to_ascii_lowercase(),
                    attributes,
                    parent,
                    children: Vec::new(),
                    start_tag,
                    attributes_changed: false,
                });

                let children = tag
                    .children()
                    .top()
                    .iter()
                    .filter_map(|child| self.visit(*child, parser, Some(id)))
                    .collect();
                self.elements[id.0].children = children;
                Some(Child::Element(id))
            }
            tl::Node::Raw(bytes) => {
                let span = span_of(self.masked, bytes.as_bytes())?;
                let raw = &self.original[span.clone()];
                let original = html_escape::decode_html_entities(raw).into_owned();
                let id = TextId(self.texts.len());
                self.texts.push(TextNode {
                    parent,
                    span,
                    current: original.clone(),
                    original,
                });
                Some(Child::Text(id))
            }
            tl::Node::Comment(_) => None,
        }
    }
}

/// Byte range of a slice borrowed from `source`.
fn span_of(source: &str, bytes: &[u8]) -> Option<Range<usize>> {
    let base = source.as_ptr() as usize;
    let start = (bytes.as_ptr() as usize).checked_sub(base)?;
    let end = start + bytes.len();
    (end <= source.len() && source.is_char_boundary(start) && source.is_char_boundary(end))
        .then_some(start..end)
}

/// `html` with every `<` inside a raw-text element body replaced by a
/// space. Byte offsets and char boundaries are unchanged.
fn mask_raw_text(html: &str) -> Cow<'_, str> {
    let mut masked = String::new();
    let mut copied = 0;
    let mut pos = 0;
    while let Some(found) = html[pos..].find('<') {
        let start = pos + found;
        let rest = &html[start..];
        if rest.starts_with("<!--") {
            match rest[4..].find("-->") {
                Some(end) => pos = start + 4 + end + 3,
                None => break,
            }
            continue;
        }
        if !rest[1..].starts_with(|c: char| c.is_ascii_alphabetic()) {
            pos = start + 1;
            continue;
        }

        let tag_len = start_tag_len(rest);
        let body_start = start + tag_len;
        pos = body_start;
        let Some(name) = RAW_TEXT_ELEMENTS.iter().find(|name| opens_tag(&rest[1..], name)) else {
            continue;
        };
        if rest[..tag_len].ends_with("/>") {
            continue;
        }
        let body_end = find_end_tag(html, body_start, name).unwrap_or(html.len());
        let body = &html[body_start..body_end];
        if body.contains('<') {
            masked.push_str(&html[copied..body_start]);
            masked.push_str(&body.replace('<', " "));
            copied = body_end;
        }
        pos = body_end;
    }

    if copied == 0 {
        return Cow::Borrowed(html);
    }
    masked.push_str(&html[copied..]);
    Cow::Owned(masked)
}

/// Whether `markup` (just past a `<` or `</`) names the tag `name`.
fn opens_tag(markup: &str, name: &str) -> bool {
    markup
        .get(..name.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(name))
        && markup[name.len()..]
            .chars()
            .next()
            .is_none_or(|c| c.is_ascii_whitespace() || c == '>' || c == '/')
}

/// Offset of the `</name` that closes a raw-text body starting at `from`.
fn find_end_tag(html: &str, from: usize, name: &str) -> Option<usize> {
    let mut pos = from;
    while let Some(found) = html[pos..].find("</") {
        let start = pos + found;
        if opens_tag(&html[start + 2..], name) {
            return Some(start);
        }
        pos = start + 2;
    }
    None
}

fn is_plain_name(name: &str) -> bool {
    name.starts_with(|c: char| c.is_ascii_alphabetic())
        && !name
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '"' | '\'' | '<' | '>' | '/' | '='))
}

/// Length of the start tag at the head of `markup`, up to the first `>`
/// outside a quoted attribute value.
fn start_tag_len(markup: &str) -> usize {
    let mut quote = None;
    for (i, c) in markup.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '>') => return i + 1,
            _ => {}
        }
    }
    markup.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first(doc: &Document, tag: &str) -> ElementId {
        doc.elements()
            .into_iter()
            .find(|&e| doc.tag_name(e) == tag)
            .unwrap()
    }

    #[test]
    fn untouched_document_round_trips_exactly() {
        let html = "<!DOCTYPE html>\n<html lang=\"en\"><body>\n<!-- note -->\n<p class='a'>Tom &amp; Jerry<br>next</p>\n</body></html>";
        let doc = Document::parse(html).unwrap();
        assert!(!doc.is_modified());
        assert_eq!(doc.to_html(), html);
    }

    #[test]
    fn text_is_entity_decoded_and_reencoded_on_change() {
        let mut doc = Document::parse("<p>Tom &amp; Jerry</p>").unwrap();
        let p = first(&doc, "p");
        let text = doc.text_nodes(p)[0];
        assert_eq!(doc.text(text), "Tom & Jerry");
        doc.set_text(text, "Tom & Jerry\u{a0}<3".to_string());
        assert_eq!(doc.to_html(), "<p>Tom &amp; Jerry\u{a0}&lt;3</p>");
    }

    #[test]
    fn text_nodes_are_in_document_order() {
        let doc = Document::parse("<p>one <em>two <b>three</b></em> four</p>").unwrap();
        let p = first(&doc, "p");
        let texts: Vec<&str> = doc.text_nodes(p).into_iter().map(|t| doc.text(t)).collect();
        assert_eq!(texts, vec!["one ", "two ", "three", " four"]);
    }

    #[test]
    fn attribute_changes_rewrite_only_that_start_tag() {
        let html = "<div id=x><p class='lead' hidden>hi</p><br/></div>";
        let mut doc = Document::parse(html).unwrap();
        let p = first(&doc, "p");
        assert_eq!(doc.attribute(p, "hidden"), Some(""));
        doc.set_attribute(p, "data-done", "true");
        assert_eq!(
            doc.to_html(),
            "<div id=x><p class=\"lead\" hidden data-done=\"true\">hi</p><br/></div>"
        );
        assert!(doc.remove_attribute(p, "data-done"));
        assert!(!doc.remove_attribute(p, "data-done"));
    }

    #[test]
    fn setting_same_value_is_not_a_change() {
        let mut doc = Document::parse("<p lang=\"fr\">x</p>").unwrap();
        let p = first(&doc, "p");
        doc.set_attribute(p, "lang", "fr");
        assert!(!doc.is_modified());
    }

    #[test]
    fn navigation_and_closest() {
        let doc = Document::parse("<article><pre><code>x</code></pre></article>").unwrap();
        let code = first(&doc, "code");
        let pre = first(&doc, "pre");
        assert_eq!(doc.parent(code), Some(pre));
        let selector = SelectorList::parse("pre, article").unwrap();
        assert_eq!(doc.closest(code, &selector), Some(pre));
        assert_eq!(doc.ancestors(code).len(), 3);
        let text = doc.text_nodes(code)[0];
        assert_eq!(doc.text_parent(text), Some(code));
    }

    // =========================================================================
    // Raw-text elements
    // =========================================================================

    #[test]
    fn inline_script_does_not_swallow_the_page() {
        let html = "<script>if (a < b) {}</script><p>next para</p>";
        let doc = Document::parse(html).unwrap();
        let p = first(&doc, "p");
        assert_eq!(doc.parent(p), None);
        let script = first(&doc, "script");
        let body = doc.text_nodes(script)[0];
        assert_eq!(doc.text(body), "if (a < b) {}");
        assert_eq!(doc.to_html(), html);
    }

    #[test]
    fn masking_keeps_offsets_and_skips_quoted_and_commented_tags() {
        let html = r#"<style>a<b {}</style><!-- <script> --><p title="<script>">x</p><SCRIPT type=x>1<2</SCRIPT >"#;
        let masked = mask_raw_text(html);
        assert_eq!(masked.len(), html.len());
        assert_eq!(
            masked,
            r#"<style>a b {}</style><!-- <script> --><p title="<script>">x</p><SCRIPT type=x>1 2</SCRIPT >"#
        );
        assert_eq!(mask_raw_text("<script>a<b"), "<script>a b");
        assert!(matches!(mask_raw_text("<p>a < b</p>"), Cow::Borrowed(_)));
    }

    // =========================================================================
    // Selection
    // =========================================================================

    #[test]
    fn select_returns_document_order() {
        let doc = Document::parse("<h2>a</h2><p>b</p><h2>c</h2>").unwrap();
        let selector = SelectorList::parse("p, h2").unwrap();
        let tags: Vec<&str> = doc.select(&selector).into_iter().map(|e| doc.tag_name(e)).collect();
        assert_eq!(tags, vec!["h2", "p", "h2"]);
    }

    #[test]
    fn selection_ignores_lookalike_attributes() {
        let html = r#"<p data-typography-node="7" id="x">a</p><span id="y">b</span>"#;
        let doc = Document::parse(html).unwrap();
        let selector = SelectorList::parse("#x").unwrap();
        assert_eq!(doc.select(&selector), vec![first(&doc, "p")]);
    }

    #[test]
    fn empty_pseudo_class_sees_text() {
        let doc = Document::parse("<p id=\"a\"></p><p id=\"b\">text</p>").unwrap();
        let selector = SelectorList::parse("p:empty").unwrap();
        let found = doc.select(&selector);
        assert_eq!(found.len(), 1);
        assert_eq!(doc.attribute(found[0], "id"), Some("a"));
    }

    #[test]
    fn start_tag_scan_skips_quoted_brackets() {
        assert_eq!(start_tag_len(r#"<a title="x > y">z</a>"#), 17);
        assert_eq!(start_tag_len("<br>"), 4);
    }
}

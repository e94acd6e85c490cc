//! CSS selector lists for choosing which elements get typeset.
//!
//! Parsing and matching are `scraper`'s, so configuration files can use
//! whatever that engine understands: type, class, id and attribute
//! selectors, descendant/child/sibling combinators, `:not()`,
//! `:first-child` and the other tree-structural pseudo-classes.
//!
//! A tree answers a [`SelectorList`] through [`TextTree::select`]; the
//! helpers here turn that answer into membership tests.

use crate::dom::{ElementId, TextTree};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SelectorError {
    #[error("empty selector list")]
    Empty,
    #[error("invalid selector `{selector}`: {message}")]
    Invalid { selector: String, message: String },
}

/// A parsed, comma-separated selector list.
#[derive(Debug, Clone)]
pub struct SelectorList {
    source: String,
    selector: scraper::Selector,
}

impl SelectorList {
    pub fn parse(source: &str) -> Result<Self, SelectorError> {
        let source = source.trim();
        if source.is_empty() {
            return Err(SelectorError::Empty);
        }
        let selector = scraper::Selector::parse(source).map_err(|e| SelectorError::Invalid {
            selector: source.to_string(),
            message: format!("{e:?}"),
        })?;
        Ok(Self {
            source: source.to_string(),
            selector,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn css(&self) -> &scraper::Selector {
        &self.selector
    }

    /// Every element of `tree` the list matches.
    pub fn select<T: TextTree + ?Sized>(&self, tree: &T) -> HashSet<ElementId> {
        tree.select(self).into_iter().collect()
    }

    pub fn matches<T: TextTree + ?Sized>(&self, tree: &T, element: ElementId) -> bool {
        tree.select(self).contains(&element)
    }
}

impl PartialEq for SelectorList {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for SelectorList {}

impl FromStr for SelectorList {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for SelectorList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;

    fn select(html: &str, selector: &str) -> Vec<String> {
        let doc = Document::parse(html).unwrap();
        let list = SelectorList::parse(selector).unwrap();
        doc.select(&list)
            .into_iter()
            .map(|el| {
                let id = doc.attribute(el, "id").unwrap_or_default();
                format!("{}#{id}", doc.tag_name(el))
            })
            .collect()
    }

    // =========================================================================
    // Parsing
    // =========================================================================

    #[test]
    fn parses_default_lists() {
        for source in [
            "p, li, blockquote, h1, h2, h3, h4, h5, h6, td, th, dd, dt, figcaption",
            "code, pre, script, style, samp, kbd, var",
            "article > p.lead, [lang] *, #main [data-kind=\"note\"]",
        ] {
            let list = SelectorList::parse(source).unwrap();
            assert_eq!(list.as_str(), source);
            assert_eq!(list.to_string(), source);
        }
    }

    #[test]
    fn rejects_malformed_selectors() {
        assert_eq!(SelectorList::parse("  ").unwrap_err(), SelectorError::Empty);
        assert!(matches!(
            SelectorList::parse("p,,li"),
            Err(SelectorError::Invalid { .. })
        ));
        assert!(SelectorList::parse("p:hover").is_err());
        assert!(SelectorList::parse("[lang").is_err());
        assert!(SelectorList::parse("p >").is_err());
    }

    // =========================================================================
    // Matching
    // =========================================================================

    #[test]
    fn type_id_and_class() {
        let html = r#"<div id="a"><p id="b" class="lead big"></p><p id="c" class="big"></p></div>"#;
        assert_eq!(select(html, "p"), vec!["p#b", "p#c"]);
        assert_eq!(select(html, "#c"), vec!["p#c"]);
        assert_eq!(select(html, ".lead.big"), vec!["p#b"]);
        assert_eq!(select(html, "*"), vec!["div#a", "p#b", "p#c"]);
    }

    #[test]
    fn attributes() {
        let html = r#"<span id="a" translate="no"></span><span id="b" lang="fr"></span><span id="c"></span>"#;
        assert_eq!(select(html, "[translate=no]"), vec!["span#a"]);
        assert_eq!(select(html, "[lang]"), vec!["span#b"]);
        assert_eq!(select(html, "span[lang='fr']"), vec!["span#b"]);
    }

    #[test]
    fn descendant_and_child_combinators() {
        let html = r#"<blockquote id="q"><p id="direct"></p><div id="d"><p id="deep"></p></div></blockquote>"#;
        assert_eq!(select(html, "blockquote p"), vec!["p#direct", "p#deep"]);
        assert_eq!(select(html, "blockquote > p"), vec!["p#direct"]);
        assert_eq!(select(html, "blockquote div > p"), vec!["p#deep"]);
        assert_eq!(select(html, "div blockquote p"), Vec::<String>::new());
    }

    #[test]
    fn structural_pseudo_classes() {
        let html = r#"<ul><li id="a"></li><li id="b" class="raw"></li><li id="c"></li></ul>"#;
        assert_eq!(select(html, "li:first-child"), vec!["li#a"]);
        assert_eq!(select(html, "li:not(.raw)"), vec!["li#a", "li#c"]);
        assert_eq!(select(html, "li + li.raw"), vec!["li#b"]);
    }

    #[test]
    fn lists_match_any() {
        let html = r#"<h1 id="t"></h1><p id="p"></p><code id="c"></code>"#;
        assert_eq!(select(html, "h1, code"), vec!["h1#t", "code#c"]);
    }

    #[test]
    fn full_documents_match_too() {
        let html = "<!DOCTYPE html><html><head><title>t</title></head><body><main><p id=\"x\">a</p></main></body></html>";
        assert_eq!(select(html, "body main > p"), vec!["p#x"]);
        assert_eq!(select(html, "title"), vec!["title#"]);
    }
}

//! The typesetting orchestrator.
//!
//! A [`Typographer`] holds a validated configuration with its selectors
//! compiled, and walks any [`TextTree`]:
//!
//! 1. Every element matching `selectors.process` is a candidate.
//! 2. A candidate inside an excluded element (or `translate="no"`) is
//!    skipped, as is one already carrying [`PROCESSED_ATTR`].
//! 3. Each text node owned by the candidate goes through
//!    [`transform_text_continued`], in order, so a quote opened in one node
//!    closes in a later one. A node is owned by its nearest candidate
//!    ancestor, so `blockquote > p` text is visited once, by the `p`.
//! 4. Widow prevention runs once on the candidate's last text node.
//! 5. The candidate is marked processed.
//!
//! All text updates of one element are computed before any is written, so a
//! failing element is left exactly as it was.

use crate::config::{CompiledSelectors, ConfigError, TypographyConfig};
use crate::dom::{Document, DomError, ElementId, TextId, TextTree};
use crate::events::{EventKind, TypographyEvent, emit};
use crate::locale::Locale;
use crate::pipeline::{BlockState, TransformError, transform_text_continued, typeset_plain};
use crate::rules::breaks::{MIN_WIDOW_WORDS, glue_last_gap, glue_trailing_space, word_count};
use serde::Serialize;
use serde_json::json;
use std::collections::HashSet;
use std::sync::mpsc::Sender;

/// Attribute set on elements that have been typeset.
pub const PROCESSED_ATTR: &str = "data-typography-processed";

/// Counts from one pass over a tree.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProcessSummary {
    /// Candidates typeset, changed or not.
    pub processed: usize,
    /// Candidates whose text changed.
    pub changed: usize,
    /// Candidates excluded or already marked.
    pub skipped: usize,
    /// Candidates left untouched after an error.
    pub failed: usize,
}

/// Selector matches against one tree, taken once per pass.
struct Selection {
    process: HashSet<ElementId>,
    exclude: HashSet<ElementId>,
    exclude_from_widows: HashSet<ElementId>,
}

impl Selection {
    fn of<T: TextTree>(selectors: &CompiledSelectors, tree: &T) -> Self {
        Self {
            process: selectors.process.select(tree),
            exclude: selectors
                .exclude
                .as_ref()
                .map(|s| s.select(tree))
                .unwrap_or_default(),
            exclude_from_widows: selectors
                .exclude_from_widows
                .as_ref()
                .map(|s| s.select(tree))
                .unwrap_or_default(),
        }
    }

    fn excludes<T: TextTree>(&self, tree: &T, element: ElementId) -> bool {
        self.exclude.contains(&element)
            || tree
                .attribute(element, "translate")
                .is_some_and(|v| v.trim().eq_ignore_ascii_case("no"))
    }

    fn excludes_within<T: TextTree>(&self, tree: &T, element: ElementId) -> bool {
        tree.ancestors(element)
            .into_iter()
            .any(|e| self.excludes(tree, e))
    }
}

#[derive(Debug, Clone)]
pub struct Typographer {
    config: TypographyConfig,
    selectors: CompiledSelectors,
    locale: Option<Locale>,
    events: Option<Sender<TypographyEvent>>,
}

impl Typographer {
    pub fn new(config: TypographyConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let selectors = config.selectors.compile()?;
        let locale = config.fixed_locale();
        Ok(Self {
            config,
            selectors,
            locale,
            events: None,
        })
    }

    /// Deliver lifecycle events to `tx`.
    pub fn with_events(mut self, tx: Sender<TypographyEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    /// Force a locale, or `None` to read it from `lang` attributes.
    pub fn with_locale(mut self, locale: Option<Locale>) -> Self {
        self.locale = locale;
        self
    }

    pub fn config(&self) -> &TypographyConfig {
        &self.config
    }

    pub fn locale(&self) -> Option<Locale> {
        self.locale
    }

    /// Typeset every candidate element in `tree`.
    ///
    /// Failures are logged and counted; they never stop the walk.
    pub fn process_all<T: TextTree>(&self, tree: &mut T) -> ProcessSummary {
        let selection = Selection::of(&self.selectors, tree);
        let candidates: Vec<ElementId> = tree
            .elements()
            .into_iter()
            .filter(|el| selection.process.contains(el))
            .collect();
        self.emit(
            EventKind::BeforeProcessAll,
            json!({ "candidates": candidates.len() }),
        );

        let mut summary = ProcessSummary::default();
        for element in candidates {
            if selection.excludes_within(tree, element) {
                log::debug!("skipping excluded <{}>", tree.tag_name(element));
                summary.skipped += 1;
                continue;
            }
            let marked = tree.has_attribute(element, PROCESSED_ATTR);
            if self.config.processing.mark_processed && marked {
                summary.skipped += 1;
                continue;
            }
            match self.typeset_element(tree, element, &selection) {
                Ok(changed) => {
                    summary.processed += 1;
                    if changed {
                        summary.changed += 1;
                    }
                }
                Err(e) => {
                    log::warn!("left <{}> untouched: {e}", tree.tag_name(element));
                    summary.failed += 1;
                }
            }
        }

        self.emit(EventKind::AfterProcessAll, json!(summary));
        summary
    }

    /// Typeset one element, returning whether its text changed.
    ///
    /// Does not check exclusion or the processed marker; [`process_all`]
    /// does that before calling in.
    ///
    /// [`process_all`]: Typographer::process_all
    pub fn process_element<T: TextTree>(
        &self,
        tree: &mut T,
        element: ElementId,
    ) -> Result<bool, TransformError> {
        let selection = Selection::of(&self.selectors, tree);
        self.typeset_element(tree, element, &selection)
    }

    fn typeset_element<T: TextTree>(
        &self,
        tree: &mut T,
        element: ElementId,
        selection: &Selection,
    ) -> Result<bool, TransformError> {
        let tag = tree.tag_name(element).to_string();
        self.emit(
            EventKind::BeforeProcess,
            json!({ "element": tag, "index": element.index() }),
        );

        let locale = self.locale_for(tree, element);
        let owned: Vec<TextId> = tree
            .text_nodes(element)
            .into_iter()
            .filter(|&t| owns_text(tree, selection, element, t))
            .collect();

        let mut updates = Vec::new();
        let mut state = BlockState::default();
        for &text in &owned {
            let current = tree.text(text);
            if current.trim().is_empty() {
                continue;
            }
            let features = &self.config.features;
            let typeset = transform_text_continued(current, locale, features, &mut state)
                .inspect_err(|_| {
                    self.emit(
                        EventKind::AfterProcess,
                        json!({ "element": tag, "index": element.index(), "error": true }),
                    );
                })?;
            if typeset != current {
                updates.push((text, typeset));
            }
        }
        let mut changed = !updates.is_empty();
        for (text, typeset) in updates {
            tree.set_text(text, typeset);
        }

        if self.config.features.widow_prevention
            && !selection.exclude_from_widows.contains(&element)
        {
            changed |= prevent_element_widow(tree, element, &owned, locale);
        }
        if self.config.processing.mark_processed {
            tree.set_attribute(element, PROCESSED_ATTR, "true");
        }

        log::debug!("typeset <{tag}> as {locale} (changed: {changed})");
        self.emit(
            EventKind::AfterProcess,
            json!({
                "element": tag,
                "index": element.index(),
                "locale": locale,
                "changed": changed,
            }),
        );
        Ok(changed)
    }

    /// Clear every processed marker, then typeset the whole tree again.
    pub fn refresh<T: TextTree>(&self, tree: &mut T) -> ProcessSummary {
        self.emit(EventKind::BeforeRefresh, json!({}));
        let cleared = tree
            .elements()
            .into_iter()
            .filter(|&el| tree.remove_attribute(el, PROCESSED_ATTR))
            .count();
        let summary = self.process_all(tree);
        self.emit(
            EventKind::AfterRefresh,
            json!({ "cleared": cleared, "summary": summary }),
        );
        summary
    }

    /// The locale rules applied to `element`.
    pub fn locale_for<T: TextTree>(&self, tree: &T, element: ElementId) -> Locale {
        if let Some(locale) = self.locale {
            return locale;
        }
        tree.ancestors(element)
            .into_iter()
            .find_map(|e| tree.attribute(e, "lang").filter(|lang| !lang.trim().is_empty()))
            .map(Locale::resolve)
            .unwrap_or(Locale::En)
    }

    /// Whether `element` or an ancestor is off limits.
    pub fn is_excluded<T: TextTree>(&self, tree: &T, element: ElementId) -> bool {
        Selection::of(&self.selectors, tree).excludes_within(tree, element)
    }

    /// Parse, typeset and serialize an HTML string.
    ///
    /// Input the parser rejects is returned unchanged.
    pub fn typeset_html(&self, html: &str) -> String {
        match self.try_typeset_html(html) {
            Ok((out, _)) => out,
            Err(e) => {
                log::warn!("returning HTML unchanged: {e}");
                html.to_string()
            }
        }
    }

    pub fn try_typeset_html(&self, html: &str) -> Result<(String, ProcessSummary), DomError> {
        if html.is_empty() {
            return Ok((String::new(), ProcessSummary::default()));
        }
        let mut doc = Document::parse(html)?;
        let summary = self.process_all(&mut doc);
        Ok((doc.to_html(), summary))
    }

    /// Typeset a plain string with the configured (or English) locale.
    pub fn typeset_text(&self, text: &str) -> String {
        let locale = self.locale.unwrap_or(Locale::En);
        typeset_plain(text, locale, &self.config.features).unwrap_or_else(|e| {
            log::warn!("returning text unchanged: {e}");
            text.to_string()
        })
    }

    fn emit(&self, kind: EventKind, detail: serde_json::Value) {
        emit(self.events.as_ref(), kind, detail);
    }
}

/// Whether `text` belongs to `element` rather than to an excluded or
/// nested candidate element between them.
fn owns_text<T: TextTree>(
    tree: &T,
    selection: &Selection,
    element: ElementId,
    text: TextId,
) -> bool {
    let mut current = tree.text_parent(text);
    while let Some(e) = current {
        if e == element {
            return true;
        }
        if selection.excludes(tree, e) || selection.process.contains(&e) {
            return false;
        }
        current = tree.parent(e);
    }
    false
}

fn prevent_element_widow<T: TextTree>(
    tree: &mut T,
    element: ElementId,
    owned: &[TextId],
    locale: Locale,
) -> bool {
    let words: usize = owned.iter().map(|&t| word_count(tree.text(t))).sum();
    if words < MIN_WIDOW_WORDS {
        return false;
    }

    let all = tree.text_nodes(element);
    let Some(pos) = all.iter().rposition(|&t| word_count(tree.text(t)) > 0) else {
        return false;
    };
    let last = all[pos];
    // The block ends inside code or a nested block.
    if !owned.contains(&last) {
        return false;
    }

    let nbsp = locale.rules().nbsp;
    if let Some(glued) = glue_last_gap(tree.text(last), nbsp) {
        tree.set_text(last, glued);
        return true;
    }
    // `ending <a>here</a>`: the gap is at the end of the previous node.
    if word_count(tree.text(last)) == 1
        && let Some(&previous) = pos.checked_sub(1).and_then(|p| all.get(p))
        && owned.contains(&previous)
        && let Some(glued) = glue_trailing_space(tree.text(previous), nbsp)
    {
        tree.set_text(previous, glued);
        return true;
    }
    false
}

//! End-to-end checks of the public API on realistic documents.

use standard_typography::config::{Features, TypographyConfig};
use standard_typography::dom::{Document, TextTree};
use standard_typography::pipeline::transform_text;
use standard_typography::processor::PROCESSED_ATTR;
use standard_typography::protect::ProtectionContext;
use standard_typography::{Locale, Typographer, typeset_html, typeset_text};

const NBSP: char = '\u{00A0}';
const NNBSP: char = '\u{202F}';

fn typographer(locale: Option<Locale>) -> Typographer {
    Typographer::new(TypographyConfig::default())
        .unwrap()
        .with_locale(locale)
}

// =========================================================================
// Text rules
// =========================================================================

#[test]
fn years_keep_their_hyphen() {
    assert_eq!(typeset_text("1999-2005", Locale::En), "1999-2005");
    assert_eq!(typeset_text("10-20", Locale::En), "10–20");
}

#[test]
fn fractions_respect_boundaries() {
    let out = typeset_text("uses 1/2 cup of sugar", Locale::En);
    assert!(out.contains('½'), "{out}");
    let out = typeset_text("path 1/2/3 is taken", Locale::En);
    assert!(out.contains("1/2/3"), "{out}");
}

#[test]
fn orphans_and_widows() {
    let out = typeset_text("I went to the store", Locale::En);
    assert!(out.contains(&format!("the{NBSP}")), "{out}");

    let out = typeset_text("This is a very long sentence ending here", Locale::En);
    assert!(out.ends_with(&format!("ending{NBSP}here")), "{out}");

    assert_eq!(typeset_text("Hi there", Locale::En), "Hi there");
}

#[test]
fn locale_switching() {
    let features = Features::default();
    assert_eq!(
        transform_text("\"bonjour\"", Locale::Fr, &features).unwrap(),
        format!("«{NNBSP}bonjour{NNBSP}»")
    );
    assert_eq!(
        transform_text("\"bonjour\"", Locale::En, &features).unwrap(),
        "“bonjour”"
    );
}

#[test]
fn partially_typeset_text_is_still_fixed() {
    let out = typeset_text("Already — set, but then... 10-20 more", Locale::En);
    assert!(out.contains("then…"), "{out}");
    assert!(out.contains("10–20"), "{out}");

    let out = typeset_text("“open and \"closed\" later on", Locale::En);
    assert!(out.contains("“closed”"), "{out}");

    let out = typeset_text("a → b and (c) stays put", Locale::En);
    assert!(out.contains("(c)"), "{out}");
}

#[test]
fn protection_round_trips() {
    for text in [
        "see https://example.com/a--b?x=1...",
        "write to jane.doe@example.org -- soon",
        "released 2023-01-15 and 12/25/2024",
    ] {
        let mut ctx = ProtectionContext::new();
        let protected = ctx.protect(text);
        assert_eq!(ctx.restore(&protected), text);
    }
}

// =========================================================================
// Documents
// =========================================================================

#[test]
fn code_is_never_touched() {
    let html = r#"<p>Run <code>a -- b "c"</code> and wait...</p><pre>x --> y</pre>"#;
    let out = typeset_html(html);
    assert!(out.contains(r#"<code>a -- b "c"</code>"#), "{out}");
    assert!(out.contains("<pre>x --> y</pre>") || out.contains("<pre>x --&gt; y</pre>"));
    assert!(out.contains("wait…"), "{out}");
}

#[test]
fn raw_text_elements_do_not_hide_following_text() {
    let html = "<style>p > a, a<b {}</style><script>if (x < 1) go()</script>\
                <p>We left -- finally... after the show.</p>";
    let out = typeset_html(html);
    assert!(out.starts_with("<style>p > a, a<b {}</style><script>if (x < 1) go()</script>"));
    assert!(out.contains("left — finally…"), "{out}");
}

#[test]
fn markup_outside_text_is_preserved() {
    let html = "<!DOCTYPE html>\n<html lang=\"en\">\n<body>\n  <!-- keep -->\n  <div class='x'>\n    <p>It's done...</p>\n  </div>\n</body>\n</html>\n";
    let out = typeset_html(html);
    let head = "<!DOCTYPE html>\n<html lang=\"en\">\n<body>\n  <!-- keep -->\n  <div class='x'>\n";
    assert!(out.starts_with(head), "{out}");
    assert!(out.contains("It’s done…"), "{out}");
    assert!(out.ends_with("</div>\n</body>\n</html>\n"));
}

#[test]
fn document_locale_comes_from_lang() {
    let html = r#"<article lang="fr"><p>Il dit "oui" !</p></article><p lang="de">Er sagt "ja" heute.</p>"#;
    let out = typographer(None).typeset_html(html);
    assert!(out.contains(&format!("«{NNBSP}oui{NNBSP}»")), "{out}");
    assert!(out.contains("„ja“"), "{out}");
}

#[test]
fn second_pass_changes_nothing() {
    let html = r#"<h1>The "Big" Day</h1><p>We left at 5 pm -- it's 10-20 km... to Dr. Who's place.</p><ul><li>one -> two</li></ul>"#;
    let t = typographer(Some(Locale::En));
    let once = t.typeset_html(html);
    assert_eq!(t.typeset_html(&once), once);

    // Without markers, the rules themselves must be stable.
    let mut config = TypographyConfig::default();
    config.processing.mark_processed = false;
    let t = Typographer::new(config).unwrap().with_locale(Some(Locale::En));
    let once = t.typeset_html(html);
    assert!(!once.contains(PROCESSED_ATTR));
    assert_eq!(t.typeset_html(&once), once);
}

#[test]
fn refresh_retypesets_marked_elements() {
    let t = typographer(Some(Locale::En));
    let mut doc = Document::parse(r#"<p>first "try"</p>"#).unwrap();
    let first = t.process_all(&mut doc);
    assert_eq!(first.processed, 1);

    let p = doc
        .elements()
        .into_iter()
        .find(|&e| doc.tag_name(e) == "p")
        .unwrap();
    let text = doc.text_nodes(p)[0];
    doc.set_text(text, "second \"try\" here".to_string());
    assert_eq!(t.process_all(&mut doc).skipped, 1);

    let again = t.refresh(&mut doc);
    assert_eq!(again.processed, 1);
    assert!(doc.to_html().contains("second “try”"), "{}", doc.to_html());
}

#[test]
fn malformed_and_empty_input() {
    assert_eq!(typeset_html(""), "");
    let odd = "<p>unclosed \"quote";
    let out = typeset_html(odd);
    assert!(out.contains("unclosed “quote"), "{out}");
}

//! Site builds through the public API, on a scratch directory tree.

use standard_typography::cache::MANIFEST_FILENAME;
use standard_typography::config::{self, CONFIG_FILE};
use standard_typography::site::{BuildOptions, build};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn cached() -> BuildOptions {
    BuildOptions {
        use_cache: true,
        ..Default::default()
    }
}

#[test]
fn nested_sections_inherit_and_override_config() {
    let tmp = TempDir::new().unwrap();
    let src = tmp.path().join("site");
    let out = tmp.path().join("dist");

    write(&src, CONFIG_FILE, "[features]\nsmart_quotes = false\n");
    write(&src, "a.html", r#"<p>plain "quotes" -- here</p>"#);
    write(&src, "blog/b.html", r#"<p>still "plain" -- here</p>"#);
    write(
        &src,
        &format!("blog/fr/{CONFIG_FILE}"),
        "locale = \"fr\"\n[features]\nsmart_quotes = true\n",
    );
    write(&src, "blog/fr/c.html", r#"<p>mais "oui" -- ici</p>"#);

    let result = build(&src, &out, &cached(), None).unwrap();
    assert_eq!(result.stats.pages, 3);

    let a = fs::read_to_string(out.join("a.html")).unwrap();
    assert!(a.contains(r#""quotes""#) && a.contains('—'), "{a}");
    let b = fs::read_to_string(out.join("blog/b.html")).unwrap();
    assert!(b.contains(r#""plain""#) && b.contains('—'), "{b}");
    let c = fs::read_to_string(out.join("blog/fr/c.html")).unwrap();
    assert!(c.contains("«\u{202F}oui\u{202F}»"), "{c}");
}

#[test]
fn base_config_sits_below_directory_files() {
    let tmp = TempDir::new().unwrap();
    let src = tmp.path().join("site");
    let out = tmp.path().join("dist");
    write(&src, "page.html", r#"<p>It costs 1/2 -- or less</p>"#);

    let mut base = config::stock_defaults_value();
    base = config::merge_toml(
        base,
        toml::from_str("[features]\nfractions = false\n").unwrap(),
    );
    let options = BuildOptions {
        base: Some(base),
        ..cached()
    };
    build(&src, &out, &options, None).unwrap();

    let page = fs::read_to_string(out.join("page.html")).unwrap();
    assert!(page.contains("1/2"), "{page}");
    assert!(page.contains('—'));
}

#[test]
fn markdown_pages_become_html_documents() {
    let tmp = TempDir::new().unwrap();
    let src = tmp.path().join("site");
    let out = tmp.path().join("dist");
    write(
        &src,
        "post.md",
        "Intro with \"quotes\" and some text here.\n\n```\nkeep -- \"this\"\n```\n",
    );

    build(&src, &out, &cached(), None).unwrap();
    assert!(!out.join("post.md").exists());
    let page = fs::read_to_string(out.join("post.html")).unwrap();
    assert!(page.contains("<title>post</title>"), "{page}");
    assert!(page.contains("“quotes”"));
    assert!(page.contains("keep -- "), "{page}");
}

#[test]
fn cache_survives_between_builds_and_tracks_edits() {
    let tmp = TempDir::new().unwrap();
    let src = tmp.path().join("site");
    let out = tmp.path().join("dist");
    write(&src, "one.html", "<p>one -- 1</p>");
    write(&src, "two.html", "<p>two -- 2</p>");
    write(&src, "logo.svg", "<svg/>");

    let first = build(&src, &out, &cached(), None).unwrap();
    assert_eq!(first.cache_stats.misses, 3);
    assert!(out.join(MANIFEST_FILENAME).exists());

    write(&src, "two.html", "<p>two -- 2 -- edited</p>");
    let second = build(&src, &out, &cached(), None).unwrap();
    assert_eq!(second.cache_stats.hits, 2);
    assert_eq!(second.cache_stats.misses, 1);
    let two = fs::read_to_string(out.join("two.html")).unwrap();
    assert!(two.contains("edited"));
}

#[test]
fn deleted_output_is_rewritten() {
    let tmp = TempDir::new().unwrap();
    let src = tmp.path().join("site");
    let out = tmp.path().join("dist");
    write(&src, "one.html", "<p>one -- 1</p>");

    build(&src, &out, &cached(), None).unwrap();
    fs::remove_file(out.join("one.html")).unwrap();
    let again = build(&src, &out, &cached(), None).unwrap();
    assert_eq!(again.cache_stats.misses, 1);
    assert!(out.join("one.html").exists());
}

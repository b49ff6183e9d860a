use export_core::{is_markdown_name, rewrite_reference_text};
use pretty_assertions::assert_eq;

#[test]
fn markdown_names_are_recognized() {
    assert!(is_markdown_name("Page.md"));
    assert!(is_markdown_name("Page.MD"));
    assert!(is_markdown_name("Notes.markdown"));
    assert!(is_markdown_name("Page%20.md"));
    assert!(!is_markdown_name("image.png"));
    assert!(!is_markdown_name("table.csv"));
    assert!(!is_markdown_name("md"));
}

#[test]
fn encoded_segment_is_removed_from_image_target() {
    let rewritten = rewrite_reference_text("![pic](assets%2F/img.png)").unwrap();
    assert_eq!(rewritten.text, "![pic](assets/img.png)");
    assert_eq!(rewritten.references, 1);
}

#[test]
fn encoded_segment_is_removed_from_link_target() {
    let rewritten = rewrite_reference_text("see [child](Sub%20Page%2F/Child.md) here").unwrap();
    assert_eq!(rewritten.text, "see [child](Sub%20Page/Child.md) here");
}

#[test]
fn every_reference_in_text_is_rewritten() {
    let input = "# Title\n\n![a](img%2F/a.png)\n\ntext [b](docs%2F/b.md) and ![c](x%5C/y%2F/c.png)\n";
    let rewritten = rewrite_reference_text(input).unwrap();
    assert_eq!(
        rewritten.text,
        "# Title\n\n![a](img/a.png)\n\ntext [b](docs/b.md) and ![c](x/y/c.png)\n"
    );
    assert_eq!(rewritten.references, 3);
}

#[test]
fn consecutive_escapes_collapse_to_one_separator() {
    let rewritten = rewrite_reference_text("![p](a%2F%2F/b.png)").unwrap();
    assert_eq!(rewritten.text, "![p](a/b.png)");
}

#[test]
fn rewriting_is_idempotent() {
    let input = "![pic](assets%2F/img.png) [x](a%2F/b%3A/c.md)";
    let once = rewrite_reference_text(input).unwrap().text;
    assert_eq!(rewrite_reference_text(&once), None);
}

#[test]
fn text_without_encoded_segments_is_untouched() {
    assert_eq!(rewrite_reference_text("![pic](assets/img.png)"), None);
    assert_eq!(rewrite_reference_text("plain 50%2F/ text outside links"), None);
    assert_eq!(rewrite_reference_text("[spaced](My%20Page.md)"), None);
    assert_eq!(rewrite_reference_text(""), None);
}

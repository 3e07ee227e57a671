use chrono::{TimeZone, Utc};
use insta::assert_snapshot;
use pretty_assertions::assert_eq;
use quick_highlighter_engine::{
    BoundaryPoint, ClickEvent, Cmd, HighlightVariant, Page, Selection, apply_highlight,
    extract_anchor_at, handle_click, marks, parse_markdown,
};
use rstest::rstest;

fn load(source: &str) -> Page {
    Page::new(parse_markdown(source, "Field Notes", "file:///notes.md").unwrap())
}

#[rstest]
#[case::single_word("The quick fox can jump over the fence.", "jump")]
#[case::across_emphasis("Some *very important* notes here.", "important notes")]
#[case::across_paragraphs("first paragraph\n\nsecond paragraph", "paragraphsecond")]
#[case::across_list_items("- one item\n- two item\n- three item", "itemtwo")]
#[case::around_a_link("Read [the docs](https://example.com) today.", "Read the docs")]
#[case::inside_code("Call `apply_highlight` first.", "apply")]
fn text_survives_highlight_and_removal(#[case] source: &str, #[case] quote: &str) {
    // Block boundaries add no characters to the flattened text.
    let mut page = load(source);
    let before = page.document.text_content(page.document.root());
    let range = page
        .document
        .find_text(quote, 0)
        .expect("quote is present in the rendered text");
    page.select(range);

    let patch = page.apply(Cmd::Highlight {
        variant: HighlightVariant::Plain,
    });
    assert!(!patch.created.is_empty());
    assert_eq!(page.document.text_content(page.document.root()), before);
    let highlighted: String = patch
        .created
        .iter()
        .map(|mark| page.document.text_content(*mark))
        .collect();
    assert_eq!(highlighted, quote);

    for mark in patch.created {
        page.apply(Cmd::Remove { mark });
    }
    assert_eq!(page.document.text_content(page.document.root()), before);
    assert!(marks(&page.document).is_empty());
}

#[test]
fn jump_is_highlighted_and_removed_through_its_button() {
    let mut page = load("the quick fox can jump over the fence");
    let range = page.document.find_text("jump", 0).unwrap();
    page.select(range);

    let patch = page.apply(Cmd::Highlight {
        variant: HighlightVariant::Plain,
    });

    assert_snapshot!(
        page.document.to_html(),
        @r#"<p>the quick fox can <span class="qh-highlight">jump<button class="qh-remove-btn" aria-label="Remove highlight">×</button></span> over the fence</p>"#
    );
    assert!(page.selection.is_collapsed());

    let mark = patch.created[0];
    let button = *page.document.children(mark).last().unwrap();
    let mut click = ClickEvent::new(button);
    assert_eq!(handle_click(&mut page.document, &mut click), Some(mark));
    assert!(click.default_prevented());
    assert!(click.propagation_stopped());
    assert_eq!(
        page.document.to_html(),
        "<p>the quick fox can jump over the fence</p>"
    );
}

#[test]
fn export_flow_captures_then_marks_external() {
    let mut page = load("# Field Notes\n\nKeep the receipt for the tent.");
    let range = page.document.find_text("receipt", 0).unwrap();
    page.select(range);
    let now = Utc.with_ymd_and_hms(2024, 2, 29, 23, 59, 59).unwrap();

    let patch = page.apply_at(
        Cmd::CaptureAndHighlight {
            variant: HighlightVariant::External,
        },
        now,
    );

    let anchor = patch.anchor.unwrap();
    assert_eq!(anchor.quote, "receipt");
    assert_eq!(anchor.prefix, "Keep the ");
    assert_eq!(anchor.suffix, " for the tent.");
    assert_eq!(anchor.page_title, "Field Notes");
    assert_eq!(anchor.created_at, "2024-02-29T23:59:59.000Z");
    assert_snapshot!(
        page.document.to_html(),
        @r#"<h1>Field Notes</h1><p>Keep the <span class="qh-highlight-external">receipt<button class="qh-remove-btn" aria-label="Remove highlight">×</button></span> for the tent.</p>"#
    );
}

#[test]
fn anchors_are_stable_across_repeated_captures() {
    let page = load("alpha beta gamma delta");
    let selection = Selection::from_range(page.document.find_text("gamma", 0).unwrap());
    let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

    let first = extract_anchor_at(&selection, &page.document, HighlightVariant::Plain, now);
    let second = extract_anchor_at(&selection, &page.document, HighlightVariant::Plain, now);

    assert_eq!(first, second);
}

#[test]
fn multi_range_selection_marks_every_range() {
    let mut page = load("one two three four five");
    let mut selection = Selection::new();
    selection.add_range(page.document.find_text("two", 0).unwrap());
    selection.add_range(page.document.find_text("four", 0).unwrap());

    let created = apply_highlight(&mut selection, &mut page.document, HighlightVariant::Plain);

    assert_eq!(created.len(), 2);
    assert_eq!(page.document.text_content(created[0]), "two");
    assert_eq!(page.document.text_content(created[1]), "four");
    assert_eq!(marks(&page.document), created);
}

#[test]
fn second_highlight_on_collapsed_selection_is_a_no_op() {
    let mut page = load("twice is too much");
    let range = page.document.find_text("twice", 0).unwrap();
    page.select(range);
    page.apply(Cmd::Highlight {
        variant: HighlightVariant::Plain,
    });
    let html = page.document.to_html();

    let again = page.apply(Cmd::Highlight {
        variant: HighlightVariant::Plain,
    });

    assert!(again.is_empty());
    assert_eq!(page.document.to_html(), html);
}

#[test]
fn selection_inside_existing_mark_is_left_alone() {
    let mut page = load("nested marks are refused");
    let range = page.document.find_text("nested marks", 0).unwrap();
    page.select(range);
    let outer = page.apply(Cmd::Highlight {
        variant: HighlightVariant::Plain,
    });
    let mark = outer.created[0];
    let text = page.document.children(mark)[0];
    let inner = page
        .document
        .range(BoundaryPoint::new(text, 0), BoundaryPoint::new(text, 6))
        .unwrap();
    page.select(inner);

    let patch = page.apply(Cmd::Highlight {
        variant: HighlightVariant::External,
    });

    assert!(patch.created.is_empty());
    assert!(page.selection.is_collapsed());
    assert_eq!(marks(&page.document), vec![mark]);
}

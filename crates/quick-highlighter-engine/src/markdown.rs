//! Loads Markdown into a [`Document`] so pages can be highlighted outside a
//! browser.

use pulldown_cmark::{Event, HeadingLevel, Options, Parser, Tag, TagEnd};

use crate::dom::{Document, DomError, NodeId, NodeKind};

/// Parse Markdown into a document whose body holds the rendered blocks.
///
/// Unknown block or inline constructs become `div` wrappers so their text
/// still takes part in selection and highlighting.
pub fn parse_markdown(source: &str, title: &str, url: &str) -> Result<Document, DomError> {
    let parser = Parser::new_ext(source, Options::ENABLE_STRIKETHROUGH);
    let mut builder = TreeBuilder::new(Document::new(title, url));

    for event in parser {
        builder.process_event(event)?;
    }

    Ok(builder.finish())
}

/// Text of the first heading, if the document has one.
pub fn first_heading(document: &Document) -> Option<String> {
    document
        .descendants(document.root())
        .into_iter()
        .find(|id| match document.kind(*id) {
            NodeKind::Element { tag, .. } => {
                matches!(tag.as_str(), "h1" | "h2" | "h3" | "h4" | "h5" | "h6")
            }
            _ => false,
        })
        .map(|id| document.text_content(id).trim().to_string())
        .filter(|text| !text.is_empty())
}

/// Keeps the stack of open elements while parser events stream in.
struct TreeBuilder {
    document: Document,
    open: Vec<NodeId>,
}

impl TreeBuilder {
    fn new(document: Document) -> Self {
        let root = document.root();
        Self {
            document,
            open: vec![root],
        }
    }

    fn current(&self) -> NodeId {
        self.open.last().copied().unwrap_or(self.document.root())
    }

    fn open_element(&mut self, tag: &str) -> Result<NodeId, DomError> {
        let element = self.document.create_element(tag);
        self.document.append_child(self.current(), element)?;
        self.open.push(element);
        Ok(element)
    }

    fn close_element(&mut self) {
        // The root stays open.
        if self.open.len() > 1 {
            self.open.pop();
        }
    }

    fn void_element(&mut self, tag: &str) -> Result<(), DomError> {
        let element = self.document.create_element(tag);
        self.document.append_child(self.current(), element)
    }

    fn text(&mut self, text: &str) -> Result<(), DomError> {
        self.document.append_text(self.current(), text)
    }

    fn process_event(&mut self, event: Event<'_>) -> Result<(), DomError> {
        match event {
            Event::Start(tag) => self.start_tag(tag)?,
            Event::End(TagEnd::CodeBlock) => {
                self.close_element();
                self.close_element();
            }
            Event::End(_) => self.close_element(),
            Event::Text(text) => self.text(&text)?,
            Event::Code(code) => {
                self.open_element("code")?;
                self.text(&code)?;
                self.close_element();
            }
            // Raw HTML is shown as text, never interpreted.
            Event::Html(html) | Event::InlineHtml(html) => self.text(&html)?,
            Event::InlineMath(math) | Event::DisplayMath(math) => self.text(&math)?,
            Event::FootnoteReference(label) => self.text(&format!("[{label}]"))?,
            Event::SoftBreak => self.text("\n")?,
            Event::HardBreak => self.void_element("br")?,
            Event::Rule => self.void_element("hr")?,
            Event::TaskListMarker(done) => self.text(if done { "[x] " } else { "[ ] " })?,
        }
        Ok(())
    }

    fn start_tag(&mut self, tag: Tag<'_>) -> Result<(), DomError> {
        match tag {
            Tag::Paragraph => {
                self.open_element("p")?;
            }
            Tag::Heading { level, .. } => {
                self.open_element(heading_tag(level))?;
            }
            Tag::BlockQuote(_) => {
                self.open_element("blockquote")?;
            }
            Tag::CodeBlock(_) => {
                self.open_element("pre")?;
                self.open_element("code")?;
            }
            Tag::List(Some(start)) => {
                let list = self.open_element("ol")?;
                if start != 1 {
                    self.document
                        .set_attribute(list, "start", &start.to_string());
                }
            }
            Tag::List(None) => {
                self.open_element("ul")?;
            }
            Tag::Item => {
                self.open_element("li")?;
            }
            Tag::Emphasis => {
                self.open_element("em")?;
            }
            Tag::Strong => {
                self.open_element("strong")?;
            }
            Tag::Strikethrough => {
                self.open_element("del")?;
            }
            Tag::Link { dest_url, .. } => {
                let link = self.open_element("a")?;
                self.document.set_attribute(link, "href", &dest_url);
            }
            // Alt text arrives as ordinary text events.
            Tag::Image { .. } => {
                self.open_element("span")?;
            }
            _ => {
                self.open_element("div")?;
            }
        }
        Ok(())
    }

    fn finish(mut self) -> Document {
        let root = self.document.root();
        self.document.normalize(root);
        self.document
    }
}

fn heading_tag(level: HeadingLevel) -> &'static str {
    match level {
        HeadingLevel::H1 => "h1",
        HeadingLevel::H2 => "h2",
        HeadingLevel::H3 => "h3",
        HeadingLevel::H4 => "h4",
        HeadingLevel::H5 => "h5",
        HeadingLevel::H6 => "h6",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use insta::assert_snapshot;
    use pretty_assertions::assert_eq;

    fn html(source: &str) -> String {
        parse_markdown(source, "t", "u").unwrap().to_html()
    }

    #[test]
    fn renders_inline_formatting() {
        assert_snapshot!(
            html("Some *soft* and **bold** and ~~gone~~ with `code` and [a link](https://example.com)."),
            @r#"<p>Some <em>soft</em> and <strong>bold</strong> and <del>gone</del> with <code>code</code> and <a href="https://example.com">a link</a>.</p>"#
        );
    }

    #[test]
    fn renders_block_structure() {
        let source = "# Title\n\n> quoted\n\n3. three\n4. four\n\n- dash\n\n---\n";

        assert_snapshot!(
            html(source),
            @r#"<h1>Title</h1><blockquote><p>quoted</p></blockquote><ol start="3"><li>three</li><li>four</li></ol><ul><li>dash</li></ul><hr>"#
        );
    }

    #[test]
    fn code_blocks_keep_their_newlines() {
        assert_eq!(
            html("```rust\nfn main() {}\n```\n"),
            "<pre><code>fn main() {}\n</code></pre>"
        );
    }

    #[test]
    fn breaks_keep_text_flowing() {
        assert_eq!(
            html("line one\nline two  \nline three"),
            "<p>line one\nline two<br>line three</p>"
        );
    }

    #[test]
    fn raw_html_stays_text() {
        assert_snapshot!(
            html("before <b>not bold</b> after"),
            @"<p>before &lt;b&gt;not bold&lt;/b&gt; after</p>"
        );
    }

    #[test]
    fn adjacent_text_events_are_merged() {
        let doc = parse_markdown("fish &amp; chips", "t", "u").unwrap();
        let p = doc.children(doc.root())[0];

        assert_eq!(doc.children(p).len(), 1);
        assert_eq!(doc.text_content(p), "fish & chips");
    }

    #[test]
    fn first_heading_finds_any_level() {
        let doc = parse_markdown("intro\n\n## Second *level*\n\n# Later", "t", "u").unwrap();

        assert_eq!(first_heading(&doc), Some("Second level".to_string()));
        assert_eq!(
            first_heading(&parse_markdown("no headings", "t", "u").unwrap()),
            None
        );
    }

    #[test]
    fn title_and_url_are_kept() {
        let doc = parse_markdown("", "Notes", "file:///notes.md").unwrap();

        assert_eq!(doc.title(), "Notes");
        assert_eq!(doc.url(), "file:///notes.md");
        assert_eq!(doc.to_html(), "");
    }
}

use html_escape::{encode_double_quoted_attribute, encode_text};

use super::{Document, NodeId, NodeKind};
use crate::overlay::{REMOVE_BUTTON_CLASS, REMOVE_BUTTON_GLYPH, REMOVE_BUTTON_LABEL};

const VOID_ELEMENTS: &[&str] = &["br", "hr", "img"];

impl Document {
    /// HTML of the body's children.
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        for child in self.children(self.root) {
            self.write_html(*child, &mut out);
        }
        out
    }

    /// HTML of a single node and its subtree.
    pub fn node_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_html(id, &mut out);
        out
    }

    /// Standalone page with title and injected stylesheets.
    pub fn to_html_page(&self) -> String {
        let mut out = String::from("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
        out.push_str(&format!("<title>{}</title>\n", encode_text(&self.title)));
        for sheet in &self.styles {
            out.push_str(&format!(
                "<style id=\"{}\">{}</style>\n",
                encode_double_quoted_attribute(&sheet.id),
                sheet.css
            ));
        }
        out.push_str("</head>\n<body>\n");
        out.push_str(&self.to_html());
        out.push_str("\n</body>\n</html>\n");
        out
    }

    fn write_html(&self, id: NodeId, out: &mut String) {
        match self.kind(id) {
            NodeKind::Text(text) => out.push_str(&encode_text(text)),
            NodeKind::Element { tag, attrs } => {
                out.push('<');
                out.push_str(tag);
                for (name, value) in attrs {
                    out.push_str(&format!(
                        " {name}=\"{}\"",
                        encode_double_quoted_attribute(value)
                    ));
                }
                out.push('>');
                if VOID_ELEMENTS.contains(&tag.as_str()) {
                    return;
                }
                self.write_children(id, out);
                out.push_str(&format!("</{tag}>"));
            }
            NodeKind::Mark(variant) => {
                out.push_str(&format!("<span class=\"{}\">", variant.class_name()));
                self.write_children(id, out);
                out.push_str("</span>");
            }
            NodeKind::RemoveButton => out.push_str(&format!(
                "<button class=\"{REMOVE_BUTTON_CLASS}\" aria-label=\"{REMOVE_BUTTON_LABEL}\">{REMOVE_BUTTON_GLYPH}</button>"
            )),
        }
    }

    fn write_children(&self, id: NodeId, out: &mut String) {
        for child in self.children(id) {
            self.write_html(*child, out);
        }
    }
}

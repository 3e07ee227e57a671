//! Portable anchors for a selection: the quoted text plus a little context on
//! either side, so the span can be found again without the live selection.

use chrono::{DateTime, SecondsFormat, Utc};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::dom::{BoundaryPoint, Document, DomError, NodeKind, Selection};
use crate::overlay::HighlightVariant;

/// Maximum number of chars captured on each side of the quote.
pub const CONTEXT_CHARS: usize = 40;

/// Snapshot of a selection taken at capture time. Serializes with the
/// camelCase keys external stores expect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionAnchor {
    /// Selected text, trimmed. Never empty.
    pub quote: String,
    /// Up to [`CONTEXT_CHARS`] chars immediately before the selection.
    pub prefix: String,
    /// Up to [`CONTEXT_CHARS`] chars immediately after the selection.
    pub suffix: String,
    pub page_title: String,
    pub page_url: String,
    pub color: String,
    /// ISO-8601 UTC timestamp with millisecond precision.
    pub created_at: String,
}

/// Captures the current selection with the plain color and the current time.
///
/// Returns `None` when nothing usable is selected: no ranges, a collapsed
/// first range, or a selection made only of whitespace.
pub fn extract_anchor(selection: &Selection, document: &Document) -> Option<SelectionAnchor> {
    extract_anchor_at(selection, document, HighlightVariant::Plain, Utc::now())
}

/// [`extract_anchor`] with an explicit variant and capture time.
pub fn extract_anchor_at(
    selection: &Selection,
    document: &Document,
    variant: HighlightVariant,
    created_at: DateTime<Utc>,
) -> Option<SelectionAnchor> {
    if selection.range_count() == 0 || selection.is_collapsed() {
        return None;
    }
    let range = selection.range_at(0)?;
    if range.is_collapsed() {
        return None;
    }

    let quote = match document.range_text(&range) {
        Ok(text) => text.trim().to_string(),
        Err(err) => {
            debug!("cannot read selected text: {err}");
            return None;
        }
    };
    if quote.is_empty() {
        debug!("selection is whitespace only");
        return None;
    }

    // `range_text` has already validated both points, so these walks only
    // fail for containers they cannot read; each side then falls back to
    // empty on its own.
    let prefix = context_before(document, range.start).unwrap_or_else(|err| {
        debug!("no prefix context: {err}");
        String::new()
    });
    let suffix = context_after(document, range.end).unwrap_or_else(|err| {
        debug!("no suffix context: {err}");
        String::new()
    });

    Some(SelectionAnchor {
        quote,
        prefix,
        suffix,
        page_title: document.title().to_string(),
        page_url: document.url().to_string(),
        color: variant.color().to_string(),
        created_at: format_timestamp(created_at),
    })
}

/// Formats a capture time the way browsers print `Date.toISOString()`.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn context_before(document: &Document, point: BoundaryPoint) -> Result<String, DomError> {
    let (text, at) = container_text(document, point)?;
    let from = at.saturating_sub(CONTEXT_CHARS);
    Ok(text[from..at].iter().collect())
}

fn context_after(document: &Document, point: BoundaryPoint) -> Result<String, DomError> {
    let (text, at) = container_text(document, point)?;
    let to = (at + CONTEXT_CHARS).min(text.len());
    Ok(text[at..to].iter().collect())
}

/// The text addressable from a boundary point's container, and the point's
/// char position within it. Element containers contribute their flattened
/// text, measured up to the child index.
fn container_text(document: &Document, point: BoundaryPoint) -> Result<(Vec<char>, usize), DomError> {
    document.ensure_attached(point.node)?;
    let len = document.node_length(point.node);
    if point.offset > len {
        return Err(DomError::OffsetOutOfBounds {
            node: point.node,
            offset: point.offset,
            len,
        });
    }

    let text: Vec<char> = document.text_content(point.node).chars().collect();
    let at = match document.kind(point.node) {
        NodeKind::Text(_) => point.offset,
        _ => document.children(point.node)[..point.offset]
            .iter()
            .map(|c| document.text_len(*c))
            .sum(),
    };
    Ok((text, at))
}

//! Highlight overlays: wrapping selected content in a removable mark and
//! unwrapping it again.
//!
//! Both entry points contain every failure: nothing here returns an error to
//! the host. Structural problems with a single range are logged and that
//! range is skipped.

use std::fmt;
use std::str::FromStr;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::dom::{Document, DomError, NodeId, NodeKind, Range, Selection};

pub const HIGHLIGHT_STYLES_ID: &str = "qh-highlight-styles";
pub const REMOVE_BUTTON_CLASS: &str = "qh-remove-btn";
pub const REMOVE_BUTTON_LABEL: &str = "Remove highlight";
pub const REMOVE_BUTTON_GLYPH: &str = "×";

/// Stylesheet for marks. The remove button sits over the mark's top-right
/// corner and is only displayed while the mark is hovered or focused.
pub const HIGHLIGHT_STYLES: &str = r#"
.qh-highlight,
.qh-highlight-external {
  border-radius: 2px;
  padding: 0 0.05em;
  position: relative;
  display: inline;
  cursor: default;
}
.qh-highlight { background-color: #fff59d !important; }
.qh-highlight:hover { outline: 1px solid #f9a825; }
.qh-highlight-external { background-color: #bbdefb !important; }
.qh-highlight-external:hover { outline: 1px solid #2196f3; }
.qh-remove-btn {
  position: absolute;
  top: -8px;
  right: -8px;
  width: 16px;
  height: 16px;
  background: #f44336;
  color: white;
  border: none;
  border-radius: 50%;
  font-size: 10px;
  line-height: 16px;
  text-align: center;
  cursor: pointer;
  display: none;
  z-index: 10000;
  padding: 0;
  font-weight: bold;
  pointer-events: auto;
}
.qh-remove-btn:hover { background: #d32f2f; transform: scale(1.1); }
.qh-highlight:hover .qh-remove-btn,
.qh-highlight:focus-within .qh-remove-btn,
.qh-highlight-external:hover .qh-remove-btn,
.qh-highlight-external:focus-within .qh-remove-btn,
.qh-remove-btn:hover {
  display: block;
}
"#;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HighlightVariant {
    /// Local-only highlight.
    #[default]
    Plain,
    /// Highlight whose anchor was handed to an external store.
    External,
}

impl HighlightVariant {
    pub fn as_str(self) -> &'static str {
        match self {
            HighlightVariant::Plain => "plain",
            HighlightVariant::External => "external",
        }
    }

    pub fn class_name(self) -> &'static str {
        match self {
            HighlightVariant::Plain => "qh-highlight",
            HighlightVariant::External => "qh-highlight-external",
        }
    }

    /// Color token recorded in captured anchors.
    pub fn color(self) -> &'static str {
        match self {
            HighlightVariant::Plain => "#fff59d",
            HighlightVariant::External => "#bbdefb",
        }
    }
}

impl fmt::Display for HighlightVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown highlight variant `{0}` (expected `plain` or `external`)")]
pub struct ParseVariantError(String);

impl FromStr for HighlightVariant {
    type Err = ParseVariantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "plain" => Ok(HighlightVariant::Plain),
            "external" => Ok(HighlightVariant::External),
            _ => Err(ParseVariantError(s.to_string())),
        }
    }
}

/// Wraps every selected range in a mark of the given variant.
///
/// Returns the marks created, in document order. Nothing happens when the
/// selection is empty or collapsed, or when its first range already lies
/// inside a mark; in the latter case the selection is still collapsed to its
/// end. After wrapping, the selection becomes a caret directly after the last
/// mark in document order, so firing again on the same selection is a no-op.
/// If every range was skipped it is collapsed to its end instead.
pub fn apply_highlight(
    selection: &mut Selection,
    document: &mut Document,
    variant: HighlightVariant,
) -> Vec<NodeId> {
    if selection.range_count() == 0 || selection.is_collapsed() {
        debug!("nothing selected, skipping highlight");
        return Vec::new();
    }

    if let Some(first) = selection.range_at(0)
        && is_inside_mark(document, &first)
    {
        debug!("selection already highlighted");
        selection.collapse_to_end();
        return Vec::new();
    }

    // Later ranges are wrapped first: mutations never reach backwards in
    // document order, so the boundary points of earlier ranges stay valid.
    let mut order = Vec::with_capacity(selection.range_count());
    for (index, range) in selection.ranges().iter().enumerate() {
        match (document.tree_key(range.start), document.tree_key(range.end)) {
            (Ok(start), Ok(end)) => order.push((index, start, end)),
            (Err(err), _) | (_, Err(err)) => warn!("skipping range {index}: {err}"),
        }
    }
    order.sort_by(|a, b| b.1.cmp(&a.1));

    let mut created = Vec::new();
    let mut wrapped_from: Option<Vec<usize>> = None;
    for (index, start, end) in order {
        let Some(range) = selection.range_at(index) else {
            continue;
        };
        if range.is_collapsed() {
            continue;
        }
        if let Some(next) = &wrapped_from
            && end > *next
        {
            warn!("skipping range {index}: overlaps a range already highlighted");
            continue;
        }
        if is_inside_mark(document, &range) {
            debug!("skipping range {index}: already highlighted");
            continue;
        }

        match wrap_range(document, &range, variant) {
            Ok(mark) => {
                created.push(mark);
                wrapped_from = Some(start);
            }
            Err(err) => warn!("failed to highlight range {index}: {err}"),
        }
    }

    // Skipped ranges may point into text that a later wrap split, so the
    // caret goes after the last mark in document order.
    match created.first().and_then(|mark| document.point_after(*mark)) {
        Some(after) => {
            selection.remove_all_ranges();
            selection.add_range(Range::collapsed(after));
        }
        None => selection.collapse_to_end(),
    }

    created.reverse();
    created
}

fn is_inside_mark(document: &Document, range: &Range) -> bool {
    document
        .common_ancestor(range)
        .and_then(|ancestor| document.closest_mark(ancestor))
        .is_some()
}

fn wrap_range(
    document: &mut Document,
    range: &Range,
    variant: HighlightVariant,
) -> Result<NodeId, DomError> {
    let extracted = document.extract_contents(range)?;

    let mark = document.create_mark(variant);
    for node in extracted.nodes {
        document.append_child(mark, node)?;
    }
    let button = document.create_remove_button();
    document.append_child(mark, button)?;

    document.insert_before(extracted.parent, mark, extracted.before)?;
    Ok(mark)
}

/// Unwraps a mark: its content moves back into the parent in order, the
/// remove button and the mark itself are discarded, and the parent is
/// normalized. Detached marks are ignored, so removing twice is harmless.
pub fn remove_highlight(document: &mut Document, mark: NodeId) {
    let Some(parent) = document.parent(mark) else {
        debug!("mark {mark:?} already removed");
        return;
    };
    if !document.kind(mark).is_mark() {
        warn!("refusing to unwrap {mark:?}: not a highlight");
        return;
    }

    for child in document.children(mark).to_vec() {
        if document.kind(child).is_remove_button() {
            document.detach(child);
            continue;
        }
        if let Err(err) = document.insert_before(parent, child, Some(mark)) {
            warn!("failed to move {child:?} out of {mark:?}: {err}");
        }
    }

    document.detach(mark);
    document.normalize(parent);
}

/// Attached marks in document order.
pub fn marks(document: &Document) -> Vec<NodeId> {
    document
        .descendants(document.root())
        .into_iter()
        .filter(|n| document.kind(*n).is_mark())
        .collect()
}

/// A click delivered by the host to a node of the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClickEvent {
    pub target: NodeId,
    default_prevented: bool,
    propagation_stopped: bool,
}

impl ClickEvent {
    pub fn new(target: NodeId) -> Self {
        Self {
            target,
            default_prevented: false,
            propagation_stopped: false,
        }
    }

    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }

    pub fn propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }
}

/// Click handler for remove buttons.
///
/// A click on (or inside) the remove button of an attached mark consumes the
/// event and unwraps the mark, returning it. Any other click is left alone.
pub fn handle_click(document: &mut Document, event: &mut ClickEvent) -> Option<NodeId> {
    let button = document
        .ancestors(event.target)
        .find(|n| matches!(document.kind(*n), NodeKind::RemoveButton))?;
    let mark = document
        .parent(button)
        .filter(|p| document.kind(*p).is_mark())?;

    event.prevent_default();
    event.stop_propagation();
    remove_highlight(document, mark);
    Some(mark)
}

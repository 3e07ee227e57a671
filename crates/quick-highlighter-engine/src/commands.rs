//! Command surface for hosts.
//!
//! A host holds a [`Page`] (document plus live selection) and turns whatever
//! triggers it has (menu items, shortcuts, buttons) into [`Cmd`]s. Each
//! command runs synchronously to completion and reports what changed in a
//! [`Patch`].

use chrono::{DateTime, Utc};
use log::info;

use crate::anchor::{SelectionAnchor, extract_anchor_at};
use crate::dom::{Document, NodeId, Range, Selection};
use crate::overlay::{HighlightVariant, apply_highlight, remove_highlight};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cmd {
    /// Wrap the current selection in a mark.
    Highlight { variant: HighlightVariant },
    /// Capture an anchor for the current selection without touching the page.
    Capture { variant: HighlightVariant },
    /// Capture an anchor, then highlight the same selection. Nothing is
    /// highlighted when the capture yields no anchor.
    CaptureAndHighlight { variant: HighlightVariant },
    /// Unwrap a mark.
    Remove { mark: NodeId },
}

/// What a command changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Patch {
    pub created: Vec<NodeId>,
    pub removed: Vec<NodeId>,
    pub anchor: Option<SelectionAnchor>,
}

impl Patch {
    pub fn is_empty(&self) -> bool {
        self.created.is_empty() && self.removed.is_empty() && self.anchor.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct Page {
    pub document: Document,
    pub selection: Selection,
}

impl Page {
    /// Takes over a loaded document and installs the highlight stylesheet.
    pub fn new(mut document: Document) -> Self {
        document.inject_styles();
        Self {
            document,
            selection: Selection::new(),
        }
    }

    /// Replaces the selection with a single range.
    pub fn select(&mut self, range: Range) {
        self.selection.remove_all_ranges();
        self.selection.add_range(range);
    }

    pub fn apply(&mut self, cmd: Cmd) -> Patch {
        self.apply_at(cmd, Utc::now())
    }

    /// [`Page::apply`] with an explicit capture time.
    pub fn apply_at(&mut self, cmd: Cmd, now: DateTime<Utc>) -> Patch {
        let mut patch = Patch::default();
        match cmd {
            Cmd::Highlight { variant } => {
                patch.created = apply_highlight(&mut self.selection, &mut self.document, variant);
            }
            Cmd::Capture { variant } => {
                patch.anchor = extract_anchor_at(&self.selection, &self.document, variant, now);
            }
            Cmd::CaptureAndHighlight { variant } => {
                patch.anchor = extract_anchor_at(&self.selection, &self.document, variant, now);
                if patch.anchor.is_some() {
                    patch.created =
                        apply_highlight(&mut self.selection, &mut self.document, variant);
                }
            }
            Cmd::Remove { mark } => {
                if self.document.is_attached(mark) && self.document.kind(mark).is_mark() {
                    remove_highlight(&mut self.document, mark);
                    patch.removed.push(mark);
                }
            }
        }
        info!(
            "{cmd:?}: {} created, {} removed, anchor {}",
            patch.created.len(),
            patch.removed.len(),
            if patch.anchor.is_some() { "captured" } else { "none" }
        );
        patch
    }
}

//! Selection anchoring and highlight overlay engine.
//!
//! Pages are held as an arena [`Document`]; hosts drive it through a
//! [`Page`] and [`Cmd`]s, or call the overlay and anchor functions directly.

pub mod anchor;
pub mod commands;
pub mod dom;
pub mod export;
pub mod markdown;
pub mod overlay;

// Re-export key types for easier usage
pub use anchor::*;
pub use commands::*;
pub use dom::{
    Affinity, BoundaryPoint, Document, DomError, Extracted, NodeId, NodeKind, Range, Selection,
    StyleSheet,
};
pub use export::*;
pub use markdown::*;
pub use overlay::*;

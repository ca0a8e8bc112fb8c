//! Authoritative document tree for a page, fed by `DOMUpdate` batches.
//!
//! The tree is arena-backed and keyed by [`dom::NodeKey`]. Host pages are
//! loaded through html5ever; every later change arrives as an update batch
//! and is rebroadcast to mirrors after it has been applied.

pub mod document;
pub mod parser;

pub use document::{DOM, DOMNode, NodeKind};
pub use parser::parse_document;

//! Bars bound to a named SVG surface through an index-keyed data join.
//!
//! [`Page::render`] is the entry point: it joins a slice of numbers against
//! the `rect` elements under the surface, appends missing ones, rewrites the
//! attributes of every bound element and removes the excess, all in a single
//! `DOMUpdate` batch.

pub mod bars;
pub mod config;
pub mod number;
pub mod page;
pub mod selection;

pub use bars::{FILL, RectRecord};
pub use config::VizConfig;
pub use page::{Page, RenderSummary};
pub use selection::{Batch, BoundSelection, ElementLookup, Join, Selection, Selector};

mod html5ever_engine;
mod sink;

pub use html5ever_engine::Html5everEngine;

use dom::{DOMUpdate, KeySpace};

/// Parse a whole page into a `DOMUpdate` batch rooted at `NodeKey::ROOT`.
/// Keys come from a new shard registered on `keys`.
pub fn parse_document(source: &str, keys: &mut KeySpace) -> Vec<DOMUpdate> {
    let mut engine = Html5everEngine::new(keys.register_manager());
    engine.push(source);
    engine.finalize()
}

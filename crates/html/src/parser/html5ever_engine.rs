use crate::parser::sink::DomSink;
use dom::{DOMUpdate, NodeKeyManager};
use html5ever::{ParseOpts, Parser, parse_document};
use tendril::{StrTendril, TendrilSink as _};

/// HTML5 parser engine using html5ever. Input can arrive in chunks; the
/// update batch is produced when the engine is finalized.
pub struct Html5everEngine {
    /// The underlying html5ever parser.
    parser: Parser<DomSink>,
}

impl Html5everEngine {
    /// Creates a new engine minting node keys from `keys`.
    pub fn new(keys: NodeKeyManager<u64>) -> Self {
        let parser = parse_document(DomSink::new(keys), ParseOpts::default());
        Self { parser }
    }

    /// Push a chunk of HTML to the parser.
    pub fn push(&mut self, chunk: &str) {
        self.parser.process(StrTendril::from(chunk));
    }

    /// Finalize the parser and return every recorded update, ending with
    /// `EndOfDocument`.
    pub fn finalize(self) -> Vec<DOMUpdate> {
        self.parser.finish()
    }
}

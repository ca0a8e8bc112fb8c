mod printing;
mod updating;

use anyhow::{Error, anyhow};
use dom::{DOMUpdate, KeySpace, NodeKey};
use indextree::{Arena, NodeId};
use smallvec::SmallVec;
use std::collections::HashMap;
use tokio::sync::{broadcast, mpsc};

use crate::parser;

/// Capacity of the broadcast channel feeding mirrors.
const MIRROR_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum NodeKind {
    #[default]
    Document,
    Element {
        tag: String,
    },
    Text {
        text: String,
    },
}

#[derive(Debug, Clone, Default)]
pub struct DOMNode {
    pub key: NodeKey,
    pub kind: NodeKind,
    /// Attributes in the order they were first set.
    pub attrs: SmallVec<(String, String), 4>,
}

impl DOMNode {
    fn element(key: NodeKey, tag: &str) -> Self {
        Self {
            key,
            kind: NodeKind::Element {
                tag: tag.to_owned(),
            },
            attrs: SmallVec::new(),
        }
    }

    fn text(key: NodeKey, text: String) -> Self {
        Self {
            key,
            kind: NodeKind::Text { text },
            attrs: SmallVec::new(),
        }
    }

    pub fn tag(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Element { tag } => Some(tag),
            NodeKind::Document | NodeKind::Text { .. } => None,
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(attr, _)| attr == name)
            .map(|(_, value)| value.as_str())
    }
}

/// The page document. Single writer for the tree; mirrors observe it through
/// [`DOM::subscribe`].
pub struct DOM {
    dom: Arena<DOMNode>,
    root: NodeId,
    nodes: HashMap<NodeKey, NodeId>,
    update_sender: broadcast::Sender<Vec<DOMUpdate>>,
    in_sender: mpsc::UnboundedSender<Vec<DOMUpdate>>,
    in_receiver: mpsc::UnboundedReceiver<Vec<DOMUpdate>>,
}

impl Default for DOM {
    fn default() -> Self {
        Self::new()
    }
}

impl DOM {
    /// An empty document holding only the root node.
    pub fn new() -> Self {
        let mut dom = Arena::new();
        let root = dom.new_node(DOMNode::default());
        let (update_sender, _) = broadcast::channel(MIRROR_CHANNEL_CAPACITY);
        let (in_sender, in_receiver) = mpsc::unbounded_channel();
        Self {
            dom,
            root,
            nodes: HashMap::from([(NodeKey::ROOT, root)]),
            update_sender,
            in_sender,
            in_receiver,
        }
    }

    /// Parse `source` as an HTML page and build the document from it, minting
    /// node keys from a fresh shard of `keys`.
    ///
    /// Moves made by the tree builder for misnested markup are not replayed:
    /// a node stays under the parent it was first inserted into.
    ///
    /// # Errors
    /// Returns an error if the parsed batch cannot be applied.
    pub fn from_html(source: &str, keys: &mut KeySpace) -> Result<Self, Error> {
        let mut document = Self::new();
        let batch = parser::parse_document(source, keys);
        log::debug!("Parsed host page into {} updates", batch.len());
        document.apply_batch(batch)?;
        Ok(document)
    }

    /// Sender for producers that want the document to apply a batch on its
    /// next [`DOM::update`].
    pub fn sender(&self) -> mpsc::UnboundedSender<Vec<DOMUpdate>> {
        self.in_sender.clone()
    }

    /// New broadcast receiver that sees every batch applied from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Vec<DOMUpdate>> {
        self.update_sender.subscribe()
    }

    pub(crate) fn node_id(&self, key: NodeKey) -> Result<NodeId, Error> {
        self.nodes
            .get(&key)
            .copied()
            .ok_or_else(|| anyhow!("Unknown node key {key:?}"))
    }

    pub fn node(&self, key: NodeKey) -> Option<&DOMNode> {
        let id = self.nodes.get(&key)?;
        self.dom.get(*id).map(indextree::Node::get)
    }

    pub fn contains(&self, key: NodeKey) -> bool {
        self.nodes.contains_key(&key)
    }

    /// Number of nodes, the document node included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    pub fn tag_of(&self, key: NodeKey) -> Option<&str> {
        self.node(key)?.tag()
    }

    pub fn attr(&self, key: NodeKey, name: &str) -> Option<&str> {
        self.node(key)?.attr(name)
    }

    pub fn attrs(&self, key: NodeKey) -> Option<&[(String, String)]> {
        self.node(key).map(|node| &node.attrs[..])
    }

    pub fn parent(&self, key: NodeKey) -> Option<NodeKey> {
        let id = self.nodes.get(&key)?;
        let parent = id.parent(&self.dom)?;
        self.dom.get(parent).map(|node| node.get().key)
    }

    /// Ordered child keys, text nodes included.
    pub fn children(&self, key: NodeKey) -> Vec<NodeKey> {
        self.nodes.get(&key).map_or_else(Vec::new, |id| {
            id.children(&self.dom)
                .filter_map(|child| self.dom.get(child))
                .map(|node| node.get().key)
                .collect()
        })
    }

    pub fn element_children(&self, key: NodeKey) -> Vec<NodeKey> {
        self.children(key)
            .into_iter()
            .filter(|child| self.tag_of(*child).is_some())
            .collect()
    }

    /// Descendant elements of `scope` (excluding `scope`) whose tag matches,
    /// in document order. `*` matches any element.
    pub fn descendants_by_tag(&self, scope: NodeKey, tag: &str) -> Vec<NodeKey> {
        let Some(id) = self.nodes.get(&scope) else {
            return Vec::new();
        };
        id.descendants(&self.dom)
            .skip(1)
            .filter_map(|child| self.dom.get(child))
            .map(indextree::Node::get)
            .filter(|node| {
                node.tag()
                    .is_some_and(|found| tag == "*" || found.eq_ignore_ascii_case(tag))
            })
            .map(|node| node.key)
            .collect()
    }

    /// First element in document order carrying `id`.
    pub fn element_by_id(&self, id: &str) -> Option<NodeKey> {
        self.elements_by_id(id).first().copied()
    }

    /// Every element carrying `id`, in document order.
    pub fn elements_by_id(&self, id: &str) -> Vec<NodeKey> {
        self.root
            .descendants(&self.dom)
            .filter_map(|node| self.dom.get(node))
            .map(indextree::Node::get)
            .filter(|node| node.tag().is_some() && node.attr("id") == Some(id))
            .map(|node| node.key)
            .collect()
    }
}

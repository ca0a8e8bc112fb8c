//! A DOM index mirror for host lookups (`#id` selectors, tag scans).
//!
//! This mirror replays DOMUpdate batches and maintains small indices for
//! quick lookups by id and tag name. It only tracks what the selection layer
//! needs: element tags, the `id` attribute and child order.

use crate::{DOMSubscriber, DOMUpdate, NodeKey};
use anyhow::{Result, anyhow};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Internal mutable state for the DOM index.
#[derive(Default, Debug)]
pub struct DomIndexState {
    /// Map node -> current tag name (for elements), lowercase.
    pub tag_by_key: HashMap<NodeKey, String>,
    /// Map node -> current id attribute (if any).
    pub id_by_key: HashMap<NodeKey, String>,
    /// Parent -> ordered children.
    pub children_by_parent: HashMap<NodeKey, Vec<NodeKey>>,
    /// Child -> parent relation.
    pub parent_by_child: HashMap<NodeKey, NodeKey>,
    /// id attribute -> every node carrying it. Ids are not unique in markup.
    pub id_index: HashMap<String, Vec<NodeKey>>,
}

impl DomIndexState {
    fn link(&mut self, parent: NodeKey, node: NodeKey, pos: usize) {
        self.parent_by_child.insert(node, parent);
        let siblings = self.children_by_parent.entry(parent).or_default();
        if !siblings.contains(&node) {
            let at = pos.min(siblings.len());
            siblings.insert(at, node);
        }
    }

    /// Remove a node (and its descendants) from all indices.
    fn remove_recursively(&mut self, node: NodeKey) {
        if let Some(children) = self.children_by_parent.remove(&node) {
            for child in children {
                self.remove_recursively(child);
            }
        }
        if let Some(parent) = self.parent_by_child.remove(&node)
            && let Some(siblings) = self.children_by_parent.get_mut(&parent)
        {
            siblings.retain(|sibling| *sibling != node);
        }
        self.unlink_id(node);
        self.tag_by_key.remove(&node);
    }

    fn unlink_id(&mut self, node: NodeKey) {
        let Some(id) = self.id_by_key.remove(&node) else {
            return;
        };
        if let Some(holders) = self.id_index.get_mut(&id) {
            holders.retain(|holder| *holder != node);
            if holders.is_empty() {
                self.id_index.remove(&id);
            }
        }
    }

    fn set_id(&mut self, node: NodeKey, value: String) {
        self.unlink_id(node);
        if !value.is_empty() {
            self.id_index.entry(value.clone()).or_default().push(node);
            self.id_by_key.insert(node, value);
        }
    }
}

/// A DOMSubscriber implementation that updates a shared DomIndexState.
#[derive(Clone, Debug)]
pub struct DomIndex {
    inner: SharedDomIndex,
}

impl DomIndex {
    /// Create a new DomIndex and return the subscriber and its shared state.
    pub fn new() -> (Self, SharedDomIndex) {
        let inner = Arc::new(Mutex::new(DomIndexState::default()));
        (
            Self {
                inner: Arc::clone(&inner),
            },
            inner,
        )
    }
}

impl DOMSubscriber for DomIndex {
    fn apply_update(&mut self, update: DOMUpdate) -> Result<()> {
        use DOMUpdate::*;
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| anyhow!("DomIndexState poisoned"))?;
        match update {
            InsertElement {
                parent,
                node,
                tag,
                pos,
            } => {
                guard.link(parent, node, pos);
                guard.tag_by_key.insert(node, tag.to_ascii_lowercase());
            }
            InsertText {
                parent, node, pos, ..
            } => {
                guard.link(parent, node, pos);
            }
            SetAttr { node, name, value } => {
                if name.eq_ignore_ascii_case("id") {
                    guard.set_id(node, value);
                }
            }
            RemoveNode { node } => guard.remove_recursively(node),
            EndOfDocument => {}
        }
        Ok(())
    }
}

/// Accessor helpers for selection lookups.
impl DomIndexState {
    /// First element in document order carrying `id` (case-sensitive).
    pub fn get_element_by_id(&self, id: &str) -> Option<NodeKey> {
        self.get_elements_by_id(id).first().copied()
    }

    /// Every element carrying `id`, in document order.
    pub fn get_elements_by_id(&self, id: &str) -> Vec<NodeKey> {
        match self.id_index.get(id).map(Vec::as_slice) {
            None | Some([]) => Vec::new(),
            Some([only]) => vec![*only],
            Some(_) => self
                .get_elements_by_tag_name(NodeKey::ROOT, "*")
                .into_iter()
                .filter(|node| self.id_by_key.get(node).is_some_and(|found| found == id))
                .collect(),
        }
    }

    /// Return NodeKeys for descendants of `scope` with the given tag name
    /// (case-insensitive), in document order. `*` matches every element.
    pub fn get_elements_by_tag_name(&self, scope: NodeKey, tag: &str) -> Vec<NodeKey> {
        fn walk(state: &DomIndexState, node: NodeKey, needle: &str, out: &mut Vec<NodeKey>) {
            let Some(children) = state.children_by_parent.get(&node) else {
                return;
            };
            for child in children {
                if let Some(tag) = state.tag_by_key.get(child)
                    && (needle == "*" || tag == needle)
                {
                    out.push(*child);
                }
                walk(state, *child, needle, out);
            }
        }
        let needle = tag.to_ascii_lowercase();
        let mut out = Vec::new();
        walk(self, scope, &needle, &mut out);
        out
    }

    /// Ordered children of a node (elements and text).
    pub fn children_of(&self, node: NodeKey) -> &[NodeKey] {
        self.children_by_parent
            .get(&node)
            .map_or(&[], Vec::as_slice)
    }

    /// Tag of an element node, lowercase.
    pub fn tag_of(&self, node: NodeKey) -> Option<&str> {
        self.tag_by_key.get(&node).map(String::as_str)
    }

    /// Whether the index still knows about `node`.
    pub fn contains(&self, node: NodeKey) -> bool {
        node == NodeKey::ROOT || self.parent_by_child.contains_key(&node)
    }
}

/// Shared handle to the index state for read-side lookups.
pub type SharedDomIndex = Arc<Mutex<DomIndexState>>;

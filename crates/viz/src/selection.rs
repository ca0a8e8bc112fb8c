//! Selections over the document and the index-keyed data join.
//!
//! A [`Selection`] is a parent plus an ordered list of element keys. Joining
//! it with data splits the positions into three groups: `update` (element and
//! datum both present), `enter` (datum without element) and `exit` (element
//! without datum). Every mutation is recorded into a [`Batch`] and only reaches
//! the document when the batch is committed.

use anyhow::{Result, anyhow, bail};
use core::str::FromStr;
use dom::{DOMUpdate, DomIndexState, NodeKey, NodeKeyManager};
use html::DOM;
use log::trace;

/// Read side of a document needed to resolve selections.
pub trait ElementLookup {
    /// Every element carrying the given id, in document order.
    fn find_by_id(&self, id: &str) -> Vec<NodeKey>;
    /// Tag of an element as stored.
    fn tag_name(&self, key: NodeKey) -> Option<&str>;
    /// Elements below `scope` with the tag, in document order. `*` matches all.
    fn find_by_tag(&self, scope: NodeKey, tag: &str) -> Vec<NodeKey>;
}

impl ElementLookup for DOM {
    fn find_by_id(&self, id: &str) -> Vec<NodeKey> {
        self.elements_by_id(id)
    }

    fn tag_name(&self, key: NodeKey) -> Option<&str> {
        self.tag_of(key)
    }

    fn find_by_tag(&self, scope: NodeKey, tag: &str) -> Vec<NodeKey> {
        self.descendants_by_tag(scope, tag)
    }
}

impl ElementLookup for DomIndexState {
    fn find_by_id(&self, id: &str) -> Vec<NodeKey> {
        self.get_elements_by_id(id)
    }

    fn tag_name(&self, key: NodeKey) -> Option<&str> {
        self.tag_of(key)
    }

    fn find_by_tag(&self, scope: NodeKey, tag: &str) -> Vec<NodeKey> {
        self.get_elements_by_tag_name(scope, tag)
    }
}

/// A `tag`, `#id` or `tag#id` selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    pub tag: Option<String>,
    pub id: Option<String>,
}

impl Selector {
    /// Parse a selector string.
    ///
    /// # Errors
    /// Returns an error for empty input, an empty id, or characters outside
    /// the supported grammar.
    pub fn parse(source: &str) -> Result<Self> {
        let source = source.trim();
        let (tag, id) = match source.split_once('#') {
            Some((tag, id)) => (tag, Some(id)),
            None => (source, None),
        };
        let valid = |part: &str| {
            part.chars()
                .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_')
        };
        if tag.is_empty() && id.is_none() {
            bail!("Empty selector");
        }
        if tag != "*" && !valid(tag) {
            bail!("Unsupported selector '{source}'");
        }
        if let Some(id) = id
            && (id.is_empty() || !valid(id))
        {
            bail!("Unsupported selector '{source}'");
        }
        Ok(Self {
            tag: (!tag.is_empty() && tag != "*").then(|| tag.to_owned()),
            id: id.map(str::to_owned),
        })
    }

    /// Whether an element with tag `tag` satisfies the tag part.
    pub fn matches_tag(&self, tag: &str) -> bool {
        self.tag
            .as_deref()
            .is_none_or(|wanted| wanted.eq_ignore_ascii_case(tag))
    }

    /// Resolve the first matching element in document order.
    pub fn resolve<L: ElementLookup + ?Sized>(&self, lookup: &L) -> Option<NodeKey> {
        if let Some(id) = &self.id {
            return lookup.find_by_id(id).into_iter().find(|key| {
                lookup
                    .tag_name(*key)
                    .is_some_and(|tag| self.matches_tag(tag))
            });
        }
        let tag = self.tag.as_deref().unwrap_or("*");
        lookup.find_by_tag(NodeKey::ROOT, tag).first().copied()
    }
}

impl FromStr for Selector {
    type Err = anyhow::Error;

    fn from_str(source: &str) -> Result<Self> {
        Self::parse(source)
    }
}

/// Pending mutations plus the key shard new elements are minted from.
pub struct Batch<'keys> {
    keys: &'keys mut NodeKeyManager<u64>,
    updates: Vec<DOMUpdate>,
}

impl<'keys> Batch<'keys> {
    pub fn new(keys: &'keys mut NodeKeyManager<u64>) -> Self {
        Self {
            keys,
            updates: Vec::new(),
        }
    }

    fn mint(&mut self) -> NodeKey {
        self.keys.next_key()
    }

    fn push(&mut self, update: DOMUpdate) {
        self.updates.push(update);
    }

    pub fn len(&self) -> usize {
        self.updates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }

    /// Updates in recording order.
    pub fn updates(&self) -> &[DOMUpdate] {
        &self.updates
    }

    pub fn into_updates(self) -> Vec<DOMUpdate> {
        self.updates
    }
}

/// An ordered group of elements under one parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    parent: NodeKey,
    nodes: Vec<NodeKey>,
}

impl Selection {
    /// Select the first element matching `selector`.
    ///
    /// # Errors
    /// Returns an error if the selector is invalid or nothing matches.
    pub fn select<L: ElementLookup + ?Sized>(lookup: &L, selector: &str) -> Result<Self> {
        let parsed = Selector::parse(selector)?;
        let node = parsed
            .resolve(lookup)
            .ok_or_else(|| anyhow!("No element matches selector '{selector}'"))?;
        Ok(Self {
            parent: NodeKey::ROOT,
            nodes: vec![node],
        })
    }

    /// Elements with `tag` below the first selected element, grouped under it.
    /// An empty selection yields an empty group under the document.
    pub fn select_all<L: ElementLookup + ?Sized>(&self, lookup: &L, tag: &str) -> Self {
        let Some(&scope) = self.nodes.first() else {
            return Self {
                parent: NodeKey::ROOT,
                nodes: Vec::new(),
            };
        };
        Self {
            parent: scope,
            nodes: lookup.find_by_tag(scope, tag),
        }
    }

    pub fn parent(&self) -> NodeKey {
        self.parent
    }

    pub fn nodes(&self) -> &[NodeKey] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Join `data` against the selected elements by position.
    pub fn data<T: Clone>(&self, data: &[T]) -> Join<T> {
        let common = self.nodes.len().min(data.len());
        let update = self
            .nodes
            .iter()
            .zip(data)
            .enumerate()
            .map(|(index, (node, datum))| Bound {
                index,
                node: *node,
                datum: datum.clone(),
            })
            .collect();
        let enter = data
            .iter()
            .enumerate()
            .skip(common)
            .map(|(index, datum)| (index, datum.clone()))
            .collect();
        let exit = self.nodes[common..].to_vec();
        trace!(
            "Join under {:?}: {common} update, {} enter, {} exit",
            self.parent,
            data.len() - common,
            exit.len()
        );
        Join {
            parent: self.parent,
            update,
            enter,
            exit,
        }
    }
}

#[derive(Debug, Clone)]
struct Bound<T> {
    index: usize,
    node: NodeKey,
    datum: T,
}

/// Result of [`Selection::data`].
#[derive(Debug, Clone)]
pub struct Join<T> {
    parent: NodeKey,
    update: Vec<Bound<T>>,
    enter: Vec<(usize, T)>,
    exit: Vec<NodeKey>,
}

impl<T: Clone> Join<T> {
    /// Elements that already existed and now carry a datum.
    pub fn update(&self) -> BoundSelection<T> {
        BoundSelection {
            bound: self.update.clone(),
        }
    }

    /// Data indices that have no element yet.
    pub fn enter_indices(&self) -> Vec<usize> {
        self.enter.iter().map(|(index, _)| *index).collect()
    }

    /// Elements left without a datum.
    pub fn exit(&self) -> &[NodeKey] {
        &self.exit
    }

    /// Create one `tag` element per entering datum, appended to the parent
    /// in data order.
    pub fn append_enter(&self, tag: &str, batch: &mut Batch<'_>) -> BoundSelection<T> {
        let bound = self
            .enter
            .iter()
            .map(|(index, datum)| {
                let node = batch.mint();
                batch.push(DOMUpdate::InsertElement {
                    parent: self.parent,
                    node,
                    tag: tag.to_owned(),
                    pos: usize::MAX,
                });
                Bound {
                    index: *index,
                    node,
                    datum: datum.clone(),
                }
            })
            .collect();
        BoundSelection { bound }
    }

    /// Remove every exiting element. Returns how many were removed.
    pub fn remove_exit(&self, batch: &mut Batch<'_>) -> usize {
        for node in &self.exit {
            batch.push(DOMUpdate::RemoveNode { node: *node });
        }
        self.exit.len()
    }
}

/// Elements paired with their datum and data index.
#[derive(Debug, Clone)]
pub struct BoundSelection<T> {
    bound: Vec<Bound<T>>,
}

impl<T> BoundSelection<T> {
    /// Union with `other`, ordered by data index.
    #[must_use]
    pub fn merge(mut self, other: Self) -> Self {
        self.bound.extend(other.bound);
        self.bound.sort_by_key(|bound| bound.index);
        self
    }

    /// Set `name` on every element to `value(datum, index)`.
    pub fn attr<F, V>(&self, name: &str, batch: &mut Batch<'_>, value: F) -> &Self
    where
        F: Fn(&T, usize) -> V,
        V: Into<String>,
    {
        for bound in &self.bound {
            batch.push(DOMUpdate::SetAttr {
                node: bound.node,
                name: name.to_owned(),
                value: value(&bound.datum, bound.index).into(),
            });
        }
        self
    }

    /// Set `name` to the same value on every element.
    pub fn attr_const(&self, name: &str, batch: &mut Batch<'_>, value: &str) -> &Self {
        self.attr(name, batch, |_, _| value.to_owned())
    }

    /// Keys in data order.
    pub fn keys(&self) -> Vec<NodeKey> {
        self.bound.iter().map(|bound| bound.node).collect()
    }

    pub fn len(&self) -> usize {
        self.bound.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bound.is_empty()
    }
}

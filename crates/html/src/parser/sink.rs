//! html5ever tree sink that records the parse as a `DOMUpdate` batch.

use dom::{DOMUpdate, NodeKey, NodeKeyManager};
use html5ever::tree_builder::{ElementFlags, NodeOrText, QuirksMode, TreeSink};
use html5ever::{Attribute, ExpandedName, QualName, local_name, namespace_url};
use log::{debug, trace};
use std::borrow::Cow;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use tendril::StrTendril;

static EMPTY_NS: html5ever::Namespace = namespace_url!("");
static EMPTY_LOCAL: html5ever::LocalName = local_name!("");

#[derive(Debug)]
enum SinkKind {
    Document,
    Element(QualName),
    /// Comments and processing instructions; the document model drops them.
    Ignored,
}

/// Parser-side view of a node. Elements carry their attributes until they are
/// attached, at which point the attributes are emitted as `SetAttr` updates.
#[derive(Debug)]
pub struct SinkNode {
    key: NodeKey,
    kind: SinkKind,
    attrs: RefCell<Vec<(String, String)>>,
    attached: Cell<bool>,
}

pub type Handle = Rc<SinkNode>;

/// Tree sink minting keys from the parser shard and collecting updates.
pub struct DomSink {
    keys: RefCell<NodeKeyManager<u64>>,
    next_local_id: Cell<u64>,
    document: Handle,
    updates: RefCell<Vec<DOMUpdate>>,
    children: RefCell<HashMap<NodeKey, Vec<NodeKey>>>,
    parents: RefCell<HashMap<NodeKey, NodeKey>>,
}

impl DomSink {
    pub fn new(mut keys: NodeKeyManager<u64>) -> Self {
        keys.seed(0, NodeKey::ROOT);
        let document = Rc::new(SinkNode {
            key: NodeKey::ROOT,
            kind: SinkKind::Document,
            attrs: RefCell::new(Vec::new()),
            attached: Cell::new(true),
        });
        Self {
            keys: RefCell::new(keys),
            next_local_id: Cell::new(1),
            document,
            updates: RefCell::new(Vec::new()),
            children: RefCell::new(HashMap::new()),
            parents: RefCell::new(HashMap::new()),
        }
    }

    fn mint(&self) -> NodeKey {
        let local = self.next_local_id.get();
        self.next_local_id.set(local + 1);
        self.keys.borrow_mut().key_of(local)
    }

    fn new_node(&self, kind: SinkKind, attrs: Vec<(String, String)>) -> Handle {
        Rc::new(SinkNode {
            key: self.mint(),
            kind,
            attrs: RefCell::new(attrs),
            attached: Cell::new(false),
        })
    }

    fn push(&self, update: DOMUpdate) {
        self.updates.borrow_mut().push(update);
    }

    /// Record `node` as a child of `parent` at `pos` and return the clamped position.
    fn link(&self, parent: NodeKey, node: NodeKey, pos: Option<usize>) -> usize {
        let mut children = self.children.borrow_mut();
        let siblings = children.entry(parent).or_default();
        let at = pos.unwrap_or(siblings.len()).min(siblings.len());
        siblings.insert(at, node);
        self.parents.borrow_mut().insert(node, parent);
        at
    }

    fn insert(&self, parent: &Handle, child: NodeOrText<Handle>, pos: Option<usize>) {
        match child {
            NodeOrText::AppendNode(node) => {
                let SinkKind::Element(name) = &node.kind else {
                    trace!("Dropping non-element node {:?}", node.key);
                    return;
                };
                if node.attached.replace(true) {
                    debug!("Node {:?} re-inserted by the tree builder; ignoring", node.key);
                    return;
                }
                let at = self.link(parent.key, node.key, pos);
                self.push(DOMUpdate::InsertElement {
                    parent: parent.key,
                    node: node.key,
                    tag: name.local.to_string(),
                    pos: at,
                });
                for (attr, value) in node.attrs.borrow().iter() {
                    self.push(DOMUpdate::SetAttr {
                        node: node.key,
                        name: attr.clone(),
                        value: value.clone(),
                    });
                }
            }
            NodeOrText::AppendText(text) => {
                let key = self.mint();
                let at = self.link(parent.key, key, pos);
                self.push(DOMUpdate::InsertText {
                    parent: parent.key,
                    node: key,
                    text: text.to_string(),
                    pos: at,
                });
            }
        }
    }
}

fn convert_attrs(attrs: Vec<Attribute>) -> Vec<(String, String)> {
    attrs
        .into_iter()
        .map(|attr| (attr.name.local.to_string(), attr.value.to_string()))
        .collect()
}

impl TreeSink for DomSink {
    type Handle = Handle;
    type Output = Vec<DOMUpdate>;
    type ElemName<'a>
        = ExpandedName<'a>
    where
        Self: 'a;

    fn finish(self) -> Self::Output {
        let mut updates = self.updates.into_inner();
        updates.push(DOMUpdate::EndOfDocument);
        updates
    }

    fn parse_error(&self, msg: Cow<'static, str>) {
        trace!("HTML parse error: {msg}");
    }

    fn get_document(&self) -> Self::Handle {
        Rc::clone(&self.document)
    }

    fn elem_name<'a>(&'a self, target: &'a Self::Handle) -> ExpandedName<'a> {
        match &target.kind {
            SinkKind::Element(name) => name.expanded(),
            SinkKind::Document | SinkKind::Ignored => ExpandedName {
                ns: &EMPTY_NS,
                local: &EMPTY_LOCAL,
            },
        }
    }

    fn create_element(
        &self,
        name: QualName,
        attrs: Vec<Attribute>,
        _flags: ElementFlags,
    ) -> Self::Handle {
        self.new_node(SinkKind::Element(name), convert_attrs(attrs))
    }

    fn create_comment(&self, _text: StrTendril) -> Self::Handle {
        self.new_node(SinkKind::Ignored, Vec::new())
    }

    fn create_pi(&self, _target: StrTendril, _data: StrTendril) -> Self::Handle {
        self.new_node(SinkKind::Ignored, Vec::new())
    }

    fn append(&self, parent: &Self::Handle, child: NodeOrText<Self::Handle>) {
        self.insert(parent, child, None);
    }

    fn append_based_on_parent_node(
        &self,
        element: &Self::Handle,
        prev_element: &Self::Handle,
        child: NodeOrText<Self::Handle>,
    ) {
        let has_parent = self.parents.borrow().contains_key(&element.key);
        if has_parent {
            self.append_before_sibling(element, child);
        } else {
            self.append(prev_element, child);
        }
    }

    fn append_doctype_to_document(
        &self,
        _name: StrTendril,
        _public_id: StrTendril,
        _system_id: StrTendril,
    ) {
    }

    fn get_template_contents(&self, target: &Self::Handle) -> Self::Handle {
        Rc::clone(target)
    }

    fn same_node(&self, x: &Self::Handle, y: &Self::Handle) -> bool {
        Rc::ptr_eq(x, y)
    }

    fn set_quirks_mode(&self, mode: QuirksMode) {
        trace!("Quirks mode: {mode:?}");
    }

    fn append_before_sibling(&self, sibling: &Self::Handle, new_node: NodeOrText<Self::Handle>) {
        let parent = self.parents.borrow().get(&sibling.key).copied();
        let Some(parent) = parent else {
            debug!("Sibling {:?} has no parent; dropping insertion", sibling.key);
            return;
        };
        let pos = self
            .children
            .borrow()
            .get(&parent)
            .and_then(|siblings| siblings.iter().position(|key| *key == sibling.key));
        let parent_handle = Rc::new(SinkNode {
            key: parent,
            kind: SinkKind::Ignored,
            attrs: RefCell::new(Vec::new()),
            attached: Cell::new(true),
        });
        self.insert(&parent_handle, new_node, pos);
    }

    fn add_attrs_if_missing(&self, target: &Self::Handle, attrs: Vec<Attribute>) {
        let mut existing = target.attrs.borrow_mut();
        for (name, value) in convert_attrs(attrs) {
            if existing.iter().any(|(attr, _)| *attr == name) {
                continue;
            }
            if target.attached.get() {
                self.push(DOMUpdate::SetAttr {
                    node: target.key,
                    name: name.clone(),
                    value: value.clone(),
                });
            }
            existing.push((name, value));
        }
    }

    fn remove_from_parent(&self, target: &Self::Handle) {
        // Only reached for misnested markup (adoption agency, foster parenting)
        debug!("Tree builder moved {:?}; move is not mirrored", target.key);
    }

    fn reparent_children(&self, node: &Self::Handle, new_parent: &Self::Handle) {
        debug!(
            "Tree builder reparented children of {:?} to {:?}; move is not mirrored",
            node.key, new_parent.key
        );
    }
}

use anyhow::{Error, anyhow};
use dom::{DOMSubscriber, DOMUpdate, NodeKey};
use indextree::NodeId;
use log::{debug, trace};
use tokio::sync::mpsc::error::TryRecvError;

use super::{DOM, DOMNode};

impl DOM {
    /// Drain every batch queued on [`DOM::sender`], apply it, then forward it
    /// to mirrors. Returns the number of batches applied.
    ///
    /// # Errors
    /// Returns an error if an update cannot be applied. Updates earlier in the
    /// failing batch stay applied.
    pub fn update(&mut self) -> Result<usize, Error> {
        let mut applied = 0;
        loop {
            match self.in_receiver.try_recv() {
                Ok(batch) => {
                    self.apply_batch(batch)?;
                    applied += 1;
                }
                // The document holds its own sender, so the channel never closes
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }
        Ok(applied)
    }

    /// Apply one batch in order and broadcast it to mirrors.
    ///
    /// # Errors
    /// Returns an error if an update cannot be applied.
    pub fn apply_batch(&mut self, batch: Vec<DOMUpdate>) -> Result<(), Error> {
        trace!("Applying batch of {} updates", batch.len());
        for update in &batch {
            self.apply_update(update.clone())?;
        }
        // Nobody listening is fine
        if self.update_sender.receiver_count() > 0 {
            self.update_sender
                .send(batch)
                .map_err(|_| anyhow!("Mirror channel closed"))?;
        }
        Ok(())
    }

    fn insert_node(&mut self, parent: NodeKey, node: DOMNode, pos: usize) -> Result<(), Error> {
        let key = node.key;
        if self.nodes.contains_key(&key) {
            return Err(anyhow!("Node key {key:?} is already in the document"));
        }
        let parent_id = self.node_id(parent)?;
        let new_id = self.dom.new_node(node);
        let sibling = parent_id.children(&self.dom).nth(pos);
        let inserted = match sibling {
            Some(sibling) => sibling.checked_insert_before(new_id, &mut self.dom),
            None => parent_id.checked_append(new_id, &mut self.dom),
        };
        inserted.map_err(|err| anyhow!("Failed to insert {key:?} under {parent:?}: {err}"))?;
        self.nodes.insert(key, new_id);
        Ok(())
    }

    fn set_attr(&mut self, node: NodeKey, name: String, value: String) -> Result<(), Error> {
        let id = self.node_id(node)?;
        let entry = self
            .dom
            .get_mut(id)
            .ok_or_else(|| anyhow!("Node {node:?} was removed from the arena"))?
            .get_mut();
        if let Some(slot) = entry.attrs.iter_mut().find(|(attr, _)| *attr == name) {
            slot.1 = value;
        } else {
            entry.attrs.push((name, value));
        }
        Ok(())
    }

    fn remove_node(&mut self, node: NodeKey) -> Result<(), Error> {
        if node == NodeKey::ROOT {
            return Err(anyhow!("The document node cannot be removed"));
        }
        let Some(id) = self.nodes.get(&node).copied() else {
            debug!("Ignoring removal of unknown node {node:?}");
            return Ok(());
        };
        let doomed: Vec<NodeKey> = id
            .descendants(&self.dom)
            .filter_map(|descendant: NodeId| self.dom.get(descendant))
            .map(|entry| entry.get().key)
            .collect();
        id.remove_subtree(&mut self.dom);
        for key in doomed {
            self.nodes.remove(&key);
        }
        Ok(())
    }
}

impl DOMSubscriber for DOM {
    fn apply_update(&mut self, update: DOMUpdate) -> Result<(), Error> {
        use DOMUpdate::*;

        match update {
            InsertElement {
                parent,
                node,
                tag,
                pos,
            } => self.insert_node(parent, DOMNode::element(node, &tag), pos),
            InsertText {
                parent,
                node,
                text,
                pos,
            } => self.insert_node(parent, DOMNode::text(node, text), pos),
            SetAttr { node, name, value } => self.set_attr(node, name, value),
            RemoveNode { node } => self.remove_node(node),
            EndOfDocument => Ok(()),
        }
    }
}

//! Node identity and DOM update primitives shared by the document, its
//! mirrors and the data-join layer.
//!
//! The document is the single writer. Producers (the page parser, the join
//! layer) describe changes as batches of [`DOMUpdate`] values keyed by
//! [`NodeKey`]; the document applies a batch and rebroadcasts it so every
//! [`DOMSubscriber`] can replay it into its own view.

use anyhow::{Result, anyhow};
use core::hash::Hash;
use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::{broadcast, mpsc};

/// Id/tag index mirror used for element lookups.
pub mod dom_index;
pub use dom_index::{DomIndex, DomIndexState, SharedDomIndex};

// ============================
// Stable Node keys
// ============================

/// A 64-bit stable key for DOM nodes used to correlate updates across subsystems.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default, PartialOrd, Ord)]
pub struct NodeKey(pub u64);

impl NodeKey {
    /// The document node key (always present).
    pub const ROOT: Self = Self(0);

    /// Pack epoch+shard+counter into a single 64-bit key.
    #[inline]
    pub const fn pack(epoch: u16, shard: u8, counter: u64) -> Self {
        let low = counter & ((1_u64 << 40) - 1);
        Self(((epoch as u64) << 48) | ((shard as u64) << 40) | low)
    }

    /// Extract epoch from the key.
    #[inline]
    pub const fn epoch(self) -> u16 {
        (self.0 >> 48) as u16
    }

    /// Extract shard from the key.
    #[inline]
    pub const fn shard(self) -> u8 {
        ((self.0 >> 40) & 0xFF) as u8
    }

    /// Extract counter from the key.
    #[inline]
    pub const fn counter(self) -> u64 {
        self.0 & ((1_u64 << 40) - 1)
    }
}

/// Key space handing out one shard per producer so minted keys never collide.
#[derive(Debug)]
pub struct KeySpace {
    epoch: u16,
    next_shard_id: u8,
}

impl KeySpace {
    /// Create a new key space with a time-derived epoch.
    pub fn new() -> Self {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        let epoch = (((now.as_secs() as u32) ^ now.subsec_nanos()) & 0xFFFF) as u16;
        Self::with_epoch(epoch)
    }

    /// Create a key space with a fixed epoch, for reproducible key values.
    pub const fn with_epoch(epoch: u16) -> Self {
        Self {
            epoch,
            next_shard_id: 1,
        }
    }

    /// Register a new manager for a producer shard.
    pub fn register_manager<L: Eq + Hash + Copy>(&mut self) -> NodeKeyManager<L> {
        let shard = self.next_shard_id;
        self.next_shard_id = self.next_shard_id.wrapping_add(1);
        NodeKeyManager::new(self.epoch, shard)
    }

    /// Return the current epoch.
    pub const fn epoch(&self) -> u16 {
        self.epoch
    }
}

impl Default for KeySpace {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-shard manager mapping local IDs to NodeKeys and minting new keys.
#[derive(Clone, Debug)]
pub struct NodeKeyManager<L: Eq + Hash + Copy> {
    epoch: u16,
    shard: u8,
    counter: u64,
    map: HashMap<L, NodeKey>,
}

impl<L: Eq + Hash + Copy> NodeKeyManager<L> {
    fn new(epoch: u16, shard: u8) -> Self {
        Self {
            epoch,
            shard,
            counter: 1,
            map: HashMap::new(),
        }
    }

    /// Get the NodeKey for a local ID, minting if not present.
    #[inline]
    pub fn key_of(&mut self, id: L) -> NodeKey {
        if let Some(&key) = self.map.get(&id) {
            return key;
        }
        let key = self.next_key();
        self.map.insert(id, key);
        key
    }

    /// Mint a key that is not associated with any local ID.
    #[inline]
    pub fn next_key(&mut self) -> NodeKey {
        let key = NodeKey::pack(self.epoch, self.shard, self.counter);
        self.counter = self.counter.wrapping_add(1);
        key
    }

    /// Seed a mapping from a local ID to an existing NodeKey.
    #[inline]
    pub fn seed(&mut self, id: L, key: NodeKey) {
        self.map.insert(id, key);
    }

    /// Shard this manager mints into.
    pub const fn shard(&self) -> u8 {
        self.shard
    }
}

// ============================
// DOM Update model + mirror pattern
// ============================

/// A batchable update applied to the document and mirrored to subscribers.
///
/// `pos` is the insertion index among the parent's children. A position at or
/// past the current child count appends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DOMUpdate {
    InsertElement {
        parent: NodeKey,
        node: NodeKey,
        tag: String,
        pos: usize,
    },
    InsertText {
        parent: NodeKey,
        node: NodeKey,
        text: String,
        pos: usize,
    },
    SetAttr {
        node: NodeKey,
        name: String,
        value: String,
    },
    RemoveNode {
        node: NodeKey,
    },
    EndOfDocument,
}

/// A subscriber that receives DOMUpdate values and mirrors them into its own state.
pub trait DOMSubscriber {
    /// Apply a single DOMUpdate to the subscriber state.
    ///
    /// # Errors
    /// Returns an error if the update refers to state the subscriber cannot resolve.
    fn apply_update(&mut self, update: DOMUpdate) -> Result<()>;
}

/// Generic mirror that applies incoming DOM updates and can send changes back
/// to the document.
pub struct DOMMirror<T: DOMSubscriber> {
    in_updater: broadcast::Receiver<Vec<DOMUpdate>>,
    out_updater: mpsc::UnboundedSender<Vec<DOMUpdate>>,
    mirror: T,
}

impl<T: DOMSubscriber> DOMMirror<T> {
    /// Create a new DOMMirror wrapping a subscriber implementation.
    pub const fn new(
        out_updater: mpsc::UnboundedSender<Vec<DOMUpdate>>,
        in_updater: broadcast::Receiver<Vec<DOMUpdate>>,
        mirror: T,
    ) -> Self {
        Self {
            in_updater,
            out_updater,
            mirror,
        }
    }

    /// Drain and apply all pending DOMUpdate batches without blocking.
    ///
    /// # Errors
    /// Returns an error if the document side closed its channel or a batch fails to apply.
    pub fn try_update_sync(&mut self) -> Result<()> {
        use tokio::sync::broadcast::error::TryRecvError;
        loop {
            match self.in_updater.try_recv() {
                Ok(batch) => {
                    for update in batch {
                        self.mirror.apply_update(update)?;
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Lagged(skipped)) => {
                    log::warn!("DOM mirror lagged, {skipped} batches dropped");
                }
                Err(TryRecvError::Closed) => {
                    return Err(anyhow!("Recv channel was closed before document ended!"));
                }
            }
        }
        Ok(())
    }

    /// Send a batch of DOM changes back to the document.
    ///
    /// # Errors
    /// Returns an error if the document has been dropped.
    pub fn send_dom_change(&self, changes: Vec<DOMUpdate>) -> Result<()> {
        self.out_updater
            .send(changes)
            .map_err(|_| anyhow!("Document dropped before changes could be sent"))
    }
}

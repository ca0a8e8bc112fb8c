//! A host page owning the document, its id index mirror and the key shard
//! used for elements created by joins.

use anyhow::{Context as _, Result, anyhow};
use dom::{
    DOMMirror, DOMUpdate, DomIndex, DomIndexState, KeySpace, NodeKey, NodeKeyManager,
    SharedDomIndex,
};
use html::{DOM, parse_document};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::sync::MutexGuard;

use crate::bars::{RectRecord, apply_bar_attributes};
use crate::config::VizConfig;
use crate::number::format_number;
use crate::selection::{Batch, Selection, Selector};

/// What one render call did to the surface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderSummary {
    pub entered: usize,
    pub updated: usize,
    pub exited: usize,
}

impl RenderSummary {
    /// Number of bars on the surface after the render.
    pub const fn total(&self) -> usize {
        self.entered + self.updated
    }
}

pub struct Page {
    config: VizConfig,
    document: DOM,
    index: DOMMirror<DomIndex>,
    index_state: SharedDomIndex,
    join_keys: NodeKeyManager<u64>,
}

impl Page {
    /// A blank page whose body holds only the drawing surface named by
    /// `config.surface`, sized from the configuration.
    ///
    /// # Errors
    /// Returns an error if the surface selector cannot be parsed.
    pub fn new(config: VizConfig) -> Result<Self> {
        let surface = Selector::parse(&config.surface)?;
        let tag = surface.tag.as_deref().unwrap_or("svg");
        let id = surface
            .id
            .as_deref()
            .map(|id| format!(" id=\"{id}\""))
            .unwrap_or_default();
        let source = format!(
            "<!DOCTYPE html><html><head></head><body>\
             <{tag}{id} width=\"{}\" height=\"{}\"></{tag}>\
             </body></html>",
            format_number(config.width),
            format_number(config.height),
        );
        Self::from_html(&source, config)
    }

    /// Load a host page. The surface is whatever the page provides; a missing
    /// surface is reported by [`Page::render`].
    ///
    /// Misnested markup is kept in the shape it was first built in: nodes the
    /// HTML tree builder later moves (adoption agency, foster parenting) stay
    /// where they were inserted, so such pages can differ from a browser tree.
    ///
    /// # Errors
    /// Returns an error if the parsed page cannot be applied to the document.
    pub fn from_html(source: &str, config: VizConfig) -> Result<Self> {
        let mut keys = KeySpace::new();
        let mut document = DOM::new();
        let (index, index_state) = DomIndex::new();
        let mut index = DOMMirror::new(document.sender(), document.subscribe(), index);

        document
            .apply_batch(parse_document(source, &mut keys))
            .context("Failed to build host page")?;
        index.try_update_sync()?;

        let join_keys = keys.register_manager();
        info!(
            "Page ready: {} nodes, surface '{}' ({}x{})",
            document.len(),
            config.surface,
            config.width,
            config.height
        );
        Ok(Self {
            config,
            document,
            index,
            index_state,
            join_keys,
        })
    }

    pub const fn config(&self) -> &VizConfig {
        &self.config
    }

    pub const fn document(&self) -> &DOM {
        &self.document
    }

    fn lookup(&self) -> Result<MutexGuard<'_, DomIndexState>> {
        self.index_state
            .lock()
            .map_err(|_| anyhow!("DomIndexState poisoned"))
    }

    /// Current bars under the surface, in document order.
    ///
    /// # Errors
    /// Returns an error if the surface is missing.
    pub fn select_bars(&self) -> Result<Selection> {
        let lookup = self.lookup()?;
        let surface = Selection::select(&*lookup, &self.config.surface)?;
        Ok(surface.select_all(&*lookup, &self.config.element))
    }

    /// Bind `data` to the bars under the surface: one bar per value, in order.
    /// Bars at positions that already existed keep their node; new positions
    /// get a fresh element; positions past the end of `data` are removed.
    ///
    /// # Errors
    /// Returns an error if the surface is missing or the document rejects the
    /// update batch.
    pub fn render(&mut self, data: &[f64]) -> Result<RenderSummary> {
        let bars = self.select_bars()?;
        let join = bars.data(data);
        let height = self.config.height;

        let mut batch = Batch::new(&mut self.join_keys);
        let entered = join.append_enter(&self.config.element, &mut batch);
        let summary = RenderSummary {
            entered: entered.len(),
            updated: join.update().len(),
            exited: join.exit().len(),
        };
        apply_bar_attributes(&entered.merge(join.update()), height, &mut batch);
        join.remove_exit(&mut batch);

        debug!(
            "Render of {} values: {} entered, {} updated, {} exited ({} updates)",
            data.len(),
            summary.entered,
            summary.updated,
            summary.exited,
            batch.len()
        );
        let updates = batch.into_updates();
        self.commit(updates)?;
        Ok(summary)
    }

    /// Queue a batch on the document, apply it and bring the index up to date.
    fn commit(&mut self, updates: Vec<DOMUpdate>) -> Result<()> {
        if updates.is_empty() {
            return Ok(());
        }
        self.document
            .sender()
            .send(updates)
            .map_err(|_| anyhow!("Document inbound channel closed"))?;
        self.document.update()?;
        self.index.try_update_sync()
    }

    /// Keys of the bars under the surface, in order.
    ///
    /// # Errors
    /// Returns an error if the surface is missing.
    pub fn rect_keys(&self) -> Result<Vec<NodeKey>> {
        Ok(self.select_bars()?.nodes().to_vec())
    }

    /// Read every bar back from the document.
    ///
    /// # Errors
    /// Returns an error if the surface is missing or a bar is malformed.
    pub fn records(&self) -> Result<Vec<RectRecord>> {
        self.rect_keys()?
            .into_iter()
            .map(|key| RectRecord::from_element(&self.document, key))
            .collect()
    }

    /// Markup of the whole page.
    pub fn to_markup(&self) -> String {
        self.document.to_markup()
    }

    /// Markup of the drawing surface alone.
    ///
    /// # Errors
    /// Returns an error if the surface is missing.
    pub fn surface_markup(&self) -> Result<String> {
        let lookup = self.lookup()?;
        let surface = Selection::select(&*lookup, &self.config.surface)?;
        let key = surface
            .nodes()
            .first()
            .copied()
            .ok_or_else(|| anyhow!("Empty surface selection"))?;
        Ok(self.document.to_markup_of(key))
    }
}

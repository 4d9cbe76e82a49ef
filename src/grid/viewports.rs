use super::definition::ViewportDefinition;
use super::listener::ViewportListener;
use super::results::ViewportState;
use super::structure::GridStructure;
use super::viewport::Viewport;
use crate::error::ViewError;
use crate::services::results_cache::ResultsCache;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// The viewports of one grid, keyed by client-chosen id.
#[derive(Debug)]
pub struct GridViewports {
    viewports: BTreeMap<i32, Viewport>,
    max_viewports: usize,
}

impl GridViewports {
    pub fn new(max_viewports: usize) -> Self {
        Self {
            viewports: BTreeMap::new(),
            max_viewports,
        }
    }

    /// Register a viewport. Returns its callback id if it already has data.
    pub fn create(
        &mut self,
        viewport_id: i32,
        callback_id: String,
        definition: ViewportDefinition,
        structure: Arc<GridStructure>,
        cache: &ResultsCache,
        listener: &mut dyn ViewportListener,
    ) -> Result<Option<String>, ViewError> {
        if self.viewports.contains_key(&viewport_id) {
            return Err(ViewError::DuplicateId(format!("viewport {}", viewport_id)));
        }
        if self.viewports.len() >= self.max_viewports {
            return Err(ViewError::InvalidViewport(format!(
                "grid already has the maximum of {} viewports",
                self.max_viewports
            )));
        }
        let viewport = Viewport::new(viewport_id, callback_id, definition, structure, cache)?;
        debug!(viewport_id, state = ?viewport.state(), "Viewport created");
        listener.viewport_created(&viewport);
        let callback_id = (viewport.state() != ViewportState::Empty)
            .then(|| viewport.callback_id().to_string());
        self.viewports.insert(viewport_id, viewport);
        Ok(callback_id)
    }

    pub fn update(
        &mut self,
        viewport_id: i32,
        definition: ViewportDefinition,
        cache: &ResultsCache,
        listener: &mut dyn ViewportListener,
    ) -> Result<Option<String>, ViewError> {
        let viewport = self
            .viewports
            .get_mut(&viewport_id)
            .ok_or(ViewError::ViewportNotFound(viewport_id))?;
        let callback_id = viewport.update(definition, cache)?;
        listener.viewport_updated(viewport);
        Ok(callback_id)
    }

    pub fn delete(
        &mut self,
        viewport_id: i32,
        listener: &mut dyn ViewportListener,
    ) -> Result<(), ViewError> {
        let viewport = self
            .viewports
            .remove(&viewport_id)
            .ok_or(ViewError::ViewportNotFound(viewport_id))?;
        debug!(viewport_id, "Viewport deleted");
        listener.viewport_deleted(&viewport);
        Ok(())
    }

    pub fn get(&self, viewport_id: i32) -> Result<&Viewport, ViewError> {
        self.viewports
            .get(&viewport_id)
            .ok_or(ViewError::ViewportNotFound(viewport_id))
    }

    /// Recompute every viewport; callback ids of those with fresh data.
    pub fn refresh(&mut self, cache: &ResultsCache) -> Vec<String> {
        self.viewports
            .values_mut()
            .filter_map(|viewport| viewport.refresh(cache))
            .collect()
    }

    /// Rebind every viewport to a new structure; all their callback ids.
    pub fn rebind(
        &mut self,
        structure: &Arc<GridStructure>,
        cache: &ResultsCache,
        listener: &mut dyn ViewportListener,
    ) -> Vec<String> {
        self.viewports
            .values_mut()
            .map(|viewport| {
                let callback_id = viewport.rebind(structure.clone(), cache);
                listener.viewport_updated(viewport);
                callback_id
            })
            .collect()
    }

    /// Remove every viewport, telling the listener about each.
    pub fn clear(&mut self, listener: &mut dyn ViewportListener) {
        for viewport in std::mem::take(&mut self.viewports).into_values() {
            listener.viewport_deleted(&viewport);
        }
    }

    pub fn len(&self) -> usize {
        self.viewports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.viewports.is_empty()
    }
}

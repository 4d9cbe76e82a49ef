use super::definition::ViewportDefinition;
use super::depgraph::DependencyGraphGrid;
use super::listener::ViewportListener;
use super::structure::GridStructure;
use super::viewport::Viewport;
use super::viewports::GridViewports;
use super::GridType;
use crate::engine::{EngineSession, TargetResolver};
use crate::error::ViewError;
use crate::services::results_cache::ResultsCache;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// The portfolio or primitives grid of a view, with its viewports and the
/// dependency graph grids opened from its cells.
#[derive(Debug)]
pub struct MainGrid {
    grid_type: GridType,
    callback_id: String,
    structure: Arc<GridStructure>,
    viewports: GridViewports,
    depgraphs: BTreeMap<i32, DependencyGraphGrid>,
    max_viewports: usize,
}

impl MainGrid {
    pub fn new(
        grid_type: GridType,
        callback_id: String,
        structure: GridStructure,
        max_viewports: usize,
    ) -> Self {
        Self {
            grid_type,
            callback_id,
            structure: Arc::new(structure),
            viewports: GridViewports::new(max_viewports),
            depgraphs: BTreeMap::new(),
            max_viewports,
        }
    }

    pub fn grid_type(&self) -> GridType {
        self.grid_type
    }

    pub fn callback_id(&self) -> &str {
        &self.callback_id
    }

    pub fn structure(&self) -> &Arc<GridStructure> {
        &self.structure
    }

    /// Swap in a new structure: rebind viewports and close dependency graphs,
    /// whose root cells may now map elsewhere.
    pub fn update_structure(
        &mut self,
        structure: GridStructure,
        cache: &ResultsCache,
        listener: &mut dyn ViewportListener,
    ) -> Vec<String> {
        self.structure = Arc::new(structure);
        info!(
            grid = ?self.grid_type,
            rows = self.structure.row_count(),
            columns = self.structure.column_count(),
            "Grid structure updated"
        );
        let mut callback_ids = self.viewports.rebind(&self.structure, cache, listener);
        for (graph_id, mut graph) in std::mem::take(&mut self.depgraphs) {
            debug!(graph_id, "Closing dependency graph after structure change");
            graph.close(listener);
            callback_ids.push(graph.callback_id().to_string());
        }
        callback_ids.push(self.callback_id.clone());
        callback_ids
    }

    /// Pull fresh values into every open dependency graph. A graph that
    /// fails keeps its previous values; the others are still refreshed.
    pub fn update_dependency_graphs(
        &mut self,
        engine: &dyn EngineSession,
    ) -> (Vec<String>, Vec<ViewError>) {
        let mut callback_ids = Vec::new();
        let mut failures = Vec::new();
        for (graph_id, graph) in self.depgraphs.iter_mut() {
            match graph.update_results(engine) {
                Ok(ids) => callback_ids.extend(ids),
                Err(error) => {
                    warn!(grid = ?self.grid_type, graph_id, %error, "Dependency graph refresh failed");
                    failures.push(error);
                }
            }
        }
        (callback_ids, failures)
    }

    /// Recompute the grid's own viewports, leaving dependency graphs alone.
    pub fn refresh_viewports(&mut self, cache: &ResultsCache) -> Vec<String> {
        self.viewports.refresh(cache)
    }

    pub fn create_viewport(
        &mut self,
        viewport_id: i32,
        callback_id: String,
        definition: ViewportDefinition,
        cache: &ResultsCache,
        listener: &mut dyn ViewportListener,
    ) -> Result<Option<String>, ViewError> {
        self.viewports.create(
            viewport_id,
            callback_id,
            definition,
            self.structure.clone(),
            cache,
            listener,
        )
    }

    pub fn update_viewport(
        &mut self,
        viewport_id: i32,
        definition: ViewportDefinition,
        cache: &ResultsCache,
        listener: &mut dyn ViewportListener,
    ) -> Result<Option<String>, ViewError> {
        self.viewports
            .update(viewport_id, definition, cache, listener)
    }

    pub fn delete_viewport(
        &mut self,
        viewport_id: i32,
        listener: &mut dyn ViewportListener,
    ) -> Result<(), ViewError> {
        self.viewports.delete(viewport_id, listener)
    }

    pub fn viewport(&self, viewport_id: i32) -> Result<&Viewport, ViewError> {
        self.viewports.get(viewport_id)
    }

    /// Open the dependency graph behind a cell and load its values.
    pub fn open_dependency_graph(
        &mut self,
        graph_id: i32,
        callback_id: String,
        row: usize,
        column: usize,
        engine: &dyn EngineSession,
        resolver: &dyn TargetResolver,
    ) -> Result<String, ViewError> {
        if self.depgraphs.contains_key(&graph_id) {
            return Err(ViewError::DuplicateId(format!("dependency graph {}", graph_id)));
        }
        let unavailable = ViewError::DependencyGraphUnavailable { row, column };
        let specification = self
            .structure
            .value_specification_for_cell(row, column)?
            .ok_or_else(|| unavailable.clone())?;
        let calc_config = self
            .structure
            .columns()
            .column(column)
            .and_then(|c| c.calc_config())
            .ok_or_else(|| unavailable.clone())?;
        let graph = engine
            .dependency_graph(calc_config, specification)?
            .ok_or(unavailable)?;

        let mut grid =
            DependencyGraphGrid::new(callback_id, &graph, resolver, self.max_viewports);
        grid.update_results(engine)?;
        info!(
            graph_id,
            row,
            column,
            rows = grid.structure().row_count(),
            "Dependency graph opened"
        );
        let callback_id = grid.callback_id().to_string();
        self.depgraphs.insert(graph_id, grid);
        Ok(callback_id)
    }

    pub fn close_dependency_graph(
        &mut self,
        graph_id: i32,
        listener: &mut dyn ViewportListener,
    ) -> Result<(), ViewError> {
        let mut graph = self
            .depgraphs
            .remove(&graph_id)
            .ok_or(ViewError::DependencyGraphNotFound(graph_id))?;
        graph.close(listener);
        info!(graph_id, "Dependency graph closed");
        Ok(())
    }

    pub fn depgraph(&self, graph_id: i32) -> Result<&DependencyGraphGrid, ViewError> {
        self.depgraphs
            .get(&graph_id)
            .ok_or(ViewError::DependencyGraphNotFound(graph_id))
    }

    pub fn depgraph_mut(&mut self, graph_id: i32) -> Result<&mut DependencyGraphGrid, ViewError> {
        self.depgraphs
            .get_mut(&graph_id)
            .ok_or(ViewError::DependencyGraphNotFound(graph_id))
    }

    pub fn depgraph_count(&self) -> usize {
        self.depgraphs.len()
    }

    /// Tear down every viewport and dependency graph.
    pub fn close(&mut self, listener: &mut dyn ViewportListener) {
        self.viewports.clear(listener);
        for (_, mut graph) in std::mem::take(&mut self.depgraphs) {
            graph.close(listener);
        }
    }
}

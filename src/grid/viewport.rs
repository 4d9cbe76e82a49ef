use super::definition::ViewportDefinition;
use super::node::{NodePath, ViewportNodeStructure};
use super::results::{ViewportResults, ViewportState};
use super::structure::GridStructure;
use crate::error::ViewError;
use crate::services::results_cache::{ResultKey, ResultsCache};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// A client's window onto a grid and the last results computed for it.
#[derive(Debug)]
pub struct Viewport {
    id: i32,
    callback_id: String,
    definition: ViewportDefinition,
    structure: Arc<GridStructure>,
    results: ViewportResults,
    state: ViewportState,
    collapsed: HashSet<NodePath>,
}

impl Viewport {
    /// Create a viewport bound to `structure`. Fails without side effects if
    /// the definition reaches outside the grid.
    pub fn new(
        id: i32,
        callback_id: String,
        definition: ViewportDefinition,
        structure: Arc<GridStructure>,
        cache: &ResultsCache,
    ) -> Result<Self, ViewError> {
        let definition = definition.normalized();
        definition.validate(structure.row_count(), structure.column_count())?;
        let (results, state) = structure.create_results(&definition, cache);
        Ok(Self {
            id,
            callback_id,
            definition,
            structure,
            results,
            state,
            collapsed: HashSet::new(),
        })
    }

    pub fn id(&self) -> i32 {
        self.id
    }

    pub fn callback_id(&self) -> &str {
        &self.callback_id
    }

    pub fn definition(&self) -> &ViewportDefinition {
        &self.definition
    }

    pub fn structure(&self) -> &Arc<GridStructure> {
        &self.structure
    }

    pub fn results(&self) -> &ViewportResults {
        &self.results
    }

    pub fn state(&self) -> ViewportState {
        self.state
    }

    pub fn is_collapsed(&self, path: &NodePath) -> bool {
        self.collapsed.contains(path)
    }

    /// Row tree with this viewport's expansion state.
    pub fn node_structure(&self) -> ViewportNodeStructure {
        ViewportNodeStructure::new(
            self.structure.root(),
            self.structure.node_paths(),
            &self.collapsed,
        )
    }

    /// Cache keys to log in full, empty unless logging is enabled.
    pub fn logged_keys(&self) -> Vec<ResultKey> {
        if self.definition.enable_logging {
            self.structure.result_keys(&self.definition)
        } else {
            Vec::new()
        }
    }

    /// Replace the definition. Returns the callback id only if the new
    /// results differ from the previous ones.
    pub fn update(
        &mut self,
        definition: ViewportDefinition,
        cache: &ResultsCache,
    ) -> Result<Option<String>, ViewError> {
        let definition = definition.normalized();
        definition.validate(self.structure.row_count(), self.structure.column_count())?;

        if let Some((row, expanded)) =
            definition.changed_node(&self.definition, self.structure.root())
        {
            if let Some(path) = self.structure.node_path(row) {
                debug!(viewport_id = self.id, node = %path, expanded, "Node toggled");
                if expanded {
                    self.collapsed.remove(path);
                } else {
                    self.collapsed.insert(path.clone());
                }
            }
        }

        let (results, state) = self.structure.create_results(&definition, cache);
        let changed = results != self.results;
        self.definition = definition;
        self.results = results;
        self.state = state;
        Ok(changed.then(|| self.callback_id.clone()))
    }

    /// Recompute after a new batch. Returns the callback id if any visible
    /// cell changed in that batch.
    pub fn refresh(&mut self, cache: &ResultsCache) -> Option<String> {
        let (results, state) = self.structure.create_results(&self.definition, cache);
        self.results = results;
        self.state = state;
        (state == ViewportState::FreshData).then(|| self.callback_id.clone())
    }

    /// Bind to a new structure, dropping cells it no longer has.
    pub fn rebind(&mut self, structure: Arc<GridStructure>, cache: &ResultsCache) -> String {
        self.definition = self
            .definition
            .clipped(structure.row_count(), structure.column_count());
        self.structure = structure;
        let (results, state) = self.structure.create_results(&self.definition, cache);
        self.results = results;
        self.state = state;
        self.callback_id.clone()
    }
}

use super::{AnalyticsView, CycleUpdate, GridStructureSnapshot, GridTarget, SharedAnalyticsView};
use crate::error::ViewError;
use crate::grid::{GridType, ViewportDefinition, ViewportResults};
use crate::types::{CompiledViewDefinition, PortfolioEntity, ViewCycleResult};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Serializes access to a view: writers take the write lock, getters the
/// read lock.
pub struct LockingAnalyticsView<V> {
    inner: RwLock<V>,
}

impl<V: AnalyticsView> LockingAnalyticsView<V> {
    pub fn new(view: V) -> Self {
        Self {
            inner: RwLock::new(view),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, V>, ViewError> {
        self.inner
            .read()
            .map_err(|_| ViewError::Internal("view lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, V>, ViewError> {
        self.inner
            .write()
            .map_err(|_| ViewError::Internal("view lock poisoned".into()))
    }
}

impl<V: AnalyticsView> SharedAnalyticsView for LockingAnalyticsView<V> {
    fn update_structure(&self, compiled: CompiledViewDefinition) -> Result<Vec<String>, ViewError> {
        self.write()?.update_structure(compiled)
    }

    fn portfolio_changed(&self) -> Result<Vec<String>, ViewError> {
        self.write()?.portfolio_changed()
    }

    fn update_results(&self, result: &ViewCycleResult) -> Result<CycleUpdate, ViewError> {
        self.write()?.update_results(result)
    }

    fn update_entities(&self, entities: &[PortfolioEntity]) -> Result<Vec<String>, ViewError> {
        self.write()?.update_entities(entities)
    }

    fn grid_structure(
        &self,
        target: GridTarget,
        viewport_id: Option<i32>,
    ) -> Result<GridStructureSnapshot, ViewError> {
        self.read()?.grid_structure(target, viewport_id)
    }

    fn create_viewport(
        &self,
        target: GridTarget,
        viewport_id: i32,
        definition: ViewportDefinition,
    ) -> Result<Option<String>, ViewError> {
        self.write()?.create_viewport(target, viewport_id, definition)
    }

    fn update_viewport(
        &self,
        target: GridTarget,
        viewport_id: i32,
        definition: ViewportDefinition,
    ) -> Result<Option<String>, ViewError> {
        self.write()?.update_viewport(target, viewport_id, definition)
    }

    fn delete_viewport(&self, target: GridTarget, viewport_id: i32) -> Result<(), ViewError> {
        self.write()?.delete_viewport(target, viewport_id)
    }

    fn data(&self, target: GridTarget, viewport_id: i32) -> Result<ViewportResults, ViewError> {
        self.read()?.data(target, viewport_id)
    }

    fn open_dependency_graph(
        &self,
        grid: GridType,
        graph_id: i32,
        row: usize,
        column: usize,
    ) -> Result<Vec<String>, ViewError> {
        self.write()?.open_dependency_graph(grid, graph_id, row, column)
    }

    fn close_dependency_graph(&self, grid: GridType, graph_id: i32) -> Result<(), ViewError> {
        self.write()?.close_dependency_graph(grid, graph_id)
    }

    fn close(&self) -> Result<(), ViewError> {
        self.write()?.close();
        Ok(())
    }
}

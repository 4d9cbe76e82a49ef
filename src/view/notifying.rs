use super::{CycleUpdate, GridStructureSnapshot, GridTarget, SharedAnalyticsView, UpdateListener};
use crate::error::ViewError;
use crate::grid::{GridType, ViewportDefinition, ViewportResults};
use crate::services::errors::ErrorInfo;
use crate::types::{CompiledViewDefinition, PortfolioEntity, ViewCycleResult};
use std::sync::Arc;

/// Posts the callback ids a delegate returns to an [`UpdateListener`].
///
/// Sits outside the lock, so listeners never run while the view is locked.
pub struct NotifyingAnalyticsView<V> {
    delegate: V,
    listener: Arc<dyn UpdateListener>,
}

impl<V: SharedAnalyticsView> NotifyingAnalyticsView<V> {
    pub fn new(delegate: V, listener: Arc<dyn UpdateListener>) -> Self {
        Self { delegate, listener }
    }

    fn notify_all(&self, result: Result<Vec<String>, ViewError>) -> Result<Vec<String>, ViewError> {
        let callback_ids = result?;
        if !callback_ids.is_empty() {
            self.listener.items_updated(&callback_ids);
        }
        Ok(callback_ids)
    }

    fn notify(&self, result: Result<Option<String>, ViewError>) -> Result<Option<String>, ViewError> {
        let callback_id = result?;
        if let Some(id) = &callback_id {
            self.listener.item_updated(id);
        }
        Ok(callback_id)
    }
}

impl<V: SharedAnalyticsView> SharedAnalyticsView for NotifyingAnalyticsView<V> {
    fn update_structure(&self, compiled: CompiledViewDefinition) -> Result<Vec<String>, ViewError> {
        self.notify_all(self.delegate.update_structure(compiled))
    }

    fn portfolio_changed(&self) -> Result<Vec<String>, ViewError> {
        self.notify_all(self.delegate.portfolio_changed())
    }

    /// Callback ids go out even when some dependency graphs failed.
    fn update_results(&self, result: &ViewCycleResult) -> Result<CycleUpdate, ViewError> {
        let update = self.delegate.update_results(result)?;
        if !update.callback_ids.is_empty() {
            self.listener.items_updated(&update.callback_ids);
        }
        Ok(update)
    }

    fn update_entities(&self, entities: &[PortfolioEntity]) -> Result<Vec<String>, ViewError> {
        self.notify_all(self.delegate.update_entities(entities))
    }

    fn grid_structure(
        &self,
        target: GridTarget,
        viewport_id: Option<i32>,
    ) -> Result<GridStructureSnapshot, ViewError> {
        self.delegate.grid_structure(target, viewport_id)
    }

    fn create_viewport(
        &self,
        target: GridTarget,
        viewport_id: i32,
        definition: ViewportDefinition,
    ) -> Result<Option<String>, ViewError> {
        self.notify(self.delegate.create_viewport(target, viewport_id, definition))
    }

    fn update_viewport(
        &self,
        target: GridTarget,
        viewport_id: i32,
        definition: ViewportDefinition,
    ) -> Result<Option<String>, ViewError> {
        self.notify(self.delegate.update_viewport(target, viewport_id, definition))
    }

    fn delete_viewport(&self, target: GridTarget, viewport_id: i32) -> Result<(), ViewError> {
        self.delegate.delete_viewport(target, viewport_id)
    }

    fn data(&self, target: GridTarget, viewport_id: i32) -> Result<ViewportResults, ViewError> {
        self.delegate.data(target, viewport_id)
    }

    fn open_dependency_graph(
        &self,
        grid: GridType,
        graph_id: i32,
        row: usize,
        column: usize,
    ) -> Result<Vec<String>, ViewError> {
        self.notify_all(
            self.delegate
                .open_dependency_graph(grid, graph_id, row, column),
        )
    }

    fn close_dependency_graph(&self, grid: GridType, graph_id: i32) -> Result<(), ViewError> {
        self.delegate.close_dependency_graph(grid, graph_id)
    }

    fn close(&self) -> Result<(), ViewError> {
        self.delegate.close()
    }

    fn errors(&self) -> Vec<ErrorInfo> {
        self.delegate.errors()
    }

    fn delete_error(&self, id: u64) -> Result<(), ViewError> {
        self.delegate.delete_error(id)
    }
}

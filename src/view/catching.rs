use super::{CycleUpdate, GridStructureSnapshot, GridTarget, SharedAnalyticsView, UpdateListener};
use crate::error::ViewError;
use crate::grid::{GridType, ViewportDefinition, ViewportResults};
use crate::services::errors::{ErrorInfo, ErrorManager};
use crate::types::{CompiledViewDefinition, PortfolioEntity, ViewCycleResult};
use std::sync::Arc;

/// Outermost view layer. Unexpected errors are recorded in the
/// [`ErrorManager`] and announced to the listener, then returned unchanged.
/// Not-found and validation errors pass straight through.
pub struct CatchingAnalyticsView<V> {
    delegate: V,
    errors: Arc<ErrorManager>,
    listener: Arc<dyn UpdateListener>,
}

impl<V: SharedAnalyticsView> CatchingAnalyticsView<V> {
    pub fn new(delegate: V, errors: Arc<ErrorManager>, listener: Arc<dyn UpdateListener>) -> Self {
        Self {
            delegate,
            errors,
            listener,
        }
    }

    fn record(&self, error: &ViewError) {
        if error.is_unexpected() {
            let callback_id = self.errors.add(error);
            self.listener.item_updated(&callback_id);
        }
    }

    fn catch<T>(&self, result: Result<T, ViewError>) -> Result<T, ViewError> {
        if let Err(error) = &result {
            self.record(error);
        }
        result
    }
}

impl<V: SharedAnalyticsView> SharedAnalyticsView for CatchingAnalyticsView<V> {
    fn update_structure(&self, compiled: CompiledViewDefinition) -> Result<Vec<String>, ViewError> {
        self.catch(self.delegate.update_structure(compiled))
    }

    fn portfolio_changed(&self) -> Result<Vec<String>, ViewError> {
        self.catch(self.delegate.portfolio_changed())
    }

    fn update_results(&self, result: &ViewCycleResult) -> Result<CycleUpdate, ViewError> {
        let update = self.catch(self.delegate.update_results(result))?;
        for failure in &update.failures {
            self.record(failure);
        }
        Ok(update)
    }

    fn update_entities(&self, entities: &[PortfolioEntity]) -> Result<Vec<String>, ViewError> {
        self.catch(self.delegate.update_entities(entities))
    }

    fn grid_structure(
        &self,
        target: GridTarget,
        viewport_id: Option<i32>,
    ) -> Result<GridStructureSnapshot, ViewError> {
        self.catch(self.delegate.grid_structure(target, viewport_id))
    }

    fn create_viewport(
        &self,
        target: GridTarget,
        viewport_id: i32,
        definition: ViewportDefinition,
    ) -> Result<Option<String>, ViewError> {
        self.catch(self.delegate.create_viewport(target, viewport_id, definition))
    }

    fn update_viewport(
        &self,
        target: GridTarget,
        viewport_id: i32,
        definition: ViewportDefinition,
    ) -> Result<Option<String>, ViewError> {
        self.catch(self.delegate.update_viewport(target, viewport_id, definition))
    }

    fn delete_viewport(&self, target: GridTarget, viewport_id: i32) -> Result<(), ViewError> {
        self.catch(self.delegate.delete_viewport(target, viewport_id))
    }

    fn data(&self, target: GridTarget, viewport_id: i32) -> Result<ViewportResults, ViewError> {
        self.catch(self.delegate.data(target, viewport_id))
    }

    fn open_dependency_graph(
        &self,
        grid: GridType,
        graph_id: i32,
        row: usize,
        column: usize,
    ) -> Result<Vec<String>, ViewError> {
        self.catch(
            self.delegate
                .open_dependency_graph(grid, graph_id, row, column),
        )
    }

    fn close_dependency_graph(&self, grid: GridType, graph_id: i32) -> Result<(), ViewError> {
        self.catch(self.delegate.close_dependency_graph(grid, graph_id))
    }

    fn close(&self) -> Result<(), ViewError> {
        self.catch(self.delegate.close())
    }

    fn errors(&self) -> Vec<ErrorInfo> {
        self.errors.errors()
    }

    fn delete_error(&self, id: u64) -> Result<(), ViewError> {
        self.errors.delete(id)
    }
}

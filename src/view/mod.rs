//! The analytics view and the decorators that make it shareable.
//!
//! [`SimpleAnalyticsView`] holds all state and is single-threaded. It is
//! wrapped, innermost first, in [`LockingAnalyticsView`] (one reader/writer
//! lock), [`NotifyingAnalyticsView`] (posts callback ids once the lock is
//! released) and [`CatchingAnalyticsView`] (records unexpected errors).

pub mod catching;
pub mod locking;
pub mod notifying;
pub mod simple;

pub use catching::CatchingAnalyticsView;
pub use locking::LockingAnalyticsView;
pub use notifying::NotifyingAnalyticsView;
pub use simple::{SimpleAnalyticsView, ViewSettings};

use crate::error::ViewError;
use crate::grid::{
    GridStructure, GridType, ViewportDefinition, ViewportNodeStructure, ViewportResults,
};
use crate::services::errors::ErrorInfo;
use crate::types::{CompiledViewDefinition, PortfolioEntity, ViewCycleResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Addresses a main grid or one of its dependency graphs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridTarget {
    pub grid: GridType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graph_id: Option<i32>,
}

impl GridTarget {
    pub fn main(grid: GridType) -> Self {
        Self {
            grid,
            graph_id: None,
        }
    }

    pub fn depgraph(grid: GridType, graph_id: i32) -> Self {
        Self {
            grid,
            graph_id: Some(graph_id),
        }
    }
}

/// A grid's structure, with a viewport's node expansion state if one was
/// asked for.
/// Outcome of distributing one cycle. Dependency graphs that could not be
/// refreshed leave their error in `failures`; every other grid still got
/// the cycle and its callback ids are kept.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CycleUpdate {
    pub callback_ids: Vec<String>,
    pub failures: Vec<ViewError>,
}

impl CycleUpdate {
    /// The callback ids, or the first failure.
    pub fn into_result(self) -> Result<Vec<String>, ViewError> {
        let CycleUpdate {
            callback_ids,
            failures,
        } = self;
        match failures.into_iter().next() {
            Some(error) => Err(error),
            None => Ok(callback_ids),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GridStructureSnapshot {
    pub structure: Arc<GridStructure>,
    pub nodes: Option<ViewportNodeStructure>,
}

/// Receives the callback ids of changed items.
pub trait UpdateListener: Send + Sync {
    fn item_updated(&self, callback_id: &str);

    fn items_updated(&self, callback_ids: &[String]) {
        for callback_id in callback_ids {
            self.item_updated(callback_id);
        }
    }
}

/// Single-threaded view operations. Mutators return the callback ids of
/// everything they changed.
pub trait AnalyticsView: Send + Sync {
    fn update_structure(
        &mut self,
        compiled: CompiledViewDefinition,
    ) -> Result<Vec<String>, ViewError>;

    /// Reload the view's portfolio and rebuild the portfolio grid's rows.
    fn portfolio_changed(&mut self) -> Result<Vec<String>, ViewError>;

    fn update_results(&mut self, result: &ViewCycleResult) -> Result<CycleUpdate, ViewError>;

    fn update_entities(&mut self, entities: &[PortfolioEntity]) -> Result<Vec<String>, ViewError>;

    fn grid_structure(
        &self,
        target: GridTarget,
        viewport_id: Option<i32>,
    ) -> Result<GridStructureSnapshot, ViewError>;

    fn create_viewport(
        &mut self,
        target: GridTarget,
        viewport_id: i32,
        definition: ViewportDefinition,
    ) -> Result<Option<String>, ViewError>;

    fn update_viewport(
        &mut self,
        target: GridTarget,
        viewport_id: i32,
        definition: ViewportDefinition,
    ) -> Result<Option<String>, ViewError>;

    fn delete_viewport(&mut self, target: GridTarget, viewport_id: i32) -> Result<(), ViewError>;

    fn data(&self, target: GridTarget, viewport_id: i32) -> Result<ViewportResults, ViewError>;

    fn open_dependency_graph(
        &mut self,
        grid: GridType,
        graph_id: i32,
        row: usize,
        column: usize,
    ) -> Result<Vec<String>, ViewError>;

    fn close_dependency_graph(&mut self, grid: GridType, graph_id: i32) -> Result<(), ViewError>;

    /// Delete every viewport and dependency graph.
    fn close(&mut self);
}

/// Thread-safe view operations, mirroring [`AnalyticsView`].
pub trait SharedAnalyticsView: Send + Sync {
    fn update_structure(&self, compiled: CompiledViewDefinition) -> Result<Vec<String>, ViewError>;

    fn portfolio_changed(&self) -> Result<Vec<String>, ViewError>;

    fn update_results(&self, result: &ViewCycleResult) -> Result<CycleUpdate, ViewError>;

    fn update_entities(&self, entities: &[PortfolioEntity]) -> Result<Vec<String>, ViewError>;

    fn grid_structure(
        &self,
        target: GridTarget,
        viewport_id: Option<i32>,
    ) -> Result<GridStructureSnapshot, ViewError>;

    fn create_viewport(
        &self,
        target: GridTarget,
        viewport_id: i32,
        definition: ViewportDefinition,
    ) -> Result<Option<String>, ViewError>;

    fn update_viewport(
        &self,
        target: GridTarget,
        viewport_id: i32,
        definition: ViewportDefinition,
    ) -> Result<Option<String>, ViewError>;

    fn delete_viewport(&self, target: GridTarget, viewport_id: i32) -> Result<(), ViewError>;

    fn data(&self, target: GridTarget, viewport_id: i32) -> Result<ViewportResults, ViewError>;

    fn open_dependency_graph(
        &self,
        grid: GridType,
        graph_id: i32,
        row: usize,
        column: usize,
    ) -> Result<Vec<String>, ViewError>;

    fn close_dependency_graph(&self, grid: GridType, graph_id: i32) -> Result<(), ViewError>;

    fn close(&self) -> Result<(), ViewError>;

    /// Errors captured for this view. Only the catching layer records any.
    fn errors(&self) -> Vec<ErrorInfo> {
        Vec::new()
    }

    fn delete_error(&self, id: u64) -> Result<(), ViewError> {
        Err(ViewError::ErrorNotFound(id))
    }
}

use super::definition::{DisplayFormat, GridCell};
use crate::services::results_cache::CachedResult;
use crate::types::{ExecutionLog, LogLevel, LogSummary, Value, ValueType};
use serde::Serialize;

/// Data state of a viewport after its last recompute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewportState {
    /// No cell holds engine data.
    Empty,
    /// Has data, none of it from the latest batch.
    StaleData,
    /// At least one cell changed in the latest batch.
    FreshData,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultsCell {
    pub row: usize,
    pub column: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_type: Option<ValueType>,
    pub error: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_summary: Option<LogSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log: Option<ExecutionLog>,
    pub updated: bool,
    /// Rendered from the structure rather than the results cache.
    #[serde(skip)]
    pub fixed: bool,
}

impl ResultsCell {
    /// A cell whose content comes from the row itself.
    pub fn fixed(cell: GridCell, value: Option<Value>, value_type: Option<ValueType>) -> Self {
        Self {
            row: cell.row,
            column: cell.column,
            value,
            history: None,
            value_type,
            error: false,
            log_summary: None,
            log: None,
            updated: false,
            fixed: true,
        }
    }

    /// A cell that maps to no value in this compilation.
    pub fn empty(cell: GridCell, value_type: Option<ValueType>) -> Self {
        Self {
            fixed: false,
            ..Self::fixed(cell, None, value_type)
        }
    }

    pub fn from_cached(
        cell: GridCell,
        cached: CachedResult,
        value_type: Option<ValueType>,
        format: DisplayFormat,
        enable_logging: bool,
    ) -> Self {
        let error = cached.value.as_ref().is_some_and(Value::is_missing)
            || cached
                .log
                .as_ref()
                .and_then(ExecutionLog::max_level)
                .is_some_and(|level| level >= LogLevel::Error);
        let value_type = cached.value.as_ref().map(Value::value_type).or(value_type);
        Self {
            row: cell.row,
            column: cell.column,
            value: cached.value,
            history: cached.history.filter(|_| format.includes_history()),
            value_type,
            error,
            log_summary: cached.log.as_ref().map(ExecutionLog::summary),
            log: cached.log.filter(|_| enable_logging),
            updated: cached.updated,
            fixed: false,
        }
    }

    pub fn has_value(&self) -> bool {
        self.value.is_some()
    }
}

/// Snapshot of one viewport's cells, compared by value to decide whether
/// the client needs to hear about it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewportResults {
    pub cells: Vec<ResultsCell>,
    pub version: u64,
    pub calculation_duration_ms: u64,
}

impl ViewportResults {
    pub fn new(cells: Vec<ResultsCell>, version: u64, calculation_duration_ms: u64) -> Self {
        Self {
            cells,
            version,
            calculation_duration_ms,
        }
    }

    pub fn empty(version: u64) -> Self {
        Self::new(Vec::new(), version, 0)
    }

    /// State implied by the engine-backed cells; fixed cells never count.
    pub fn state(&self) -> ViewportState {
        let mut has_data = false;
        for cell in self.cells.iter().filter(|c| !c.fixed) {
            if cell.updated {
                return ViewportState::FreshData;
            }
            has_data |= cell.has_value();
        }
        if has_data {
            ViewportState::StaleData
        } else {
            ViewportState::Empty
        }
    }
}

use super::node::AnalyticsNode;
use crate::error::ViewError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridCell {
    pub row: usize,
    pub column: usize,
}

impl GridCell {
    pub fn new(row: usize, column: usize) -> Self {
        Self { row, column }
    }
}

/// How much of each cell's data a viewport wants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayFormat {
    #[default]
    Cell,
    History,
    Expanded,
}

impl DisplayFormat {
    pub fn includes_history(self) -> bool {
        !matches!(self, DisplayFormat::Cell)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ViewportCells {
    Rectangular { rows: Vec<usize>, columns: Vec<usize> },
    Arbitrary { cells: Vec<GridCell> },
}

/// The cells a client is looking at. Replaced wholesale on every update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewportDefinition {
    /// Client-supplied, increases with every update.
    pub version: u64,
    #[serde(default)]
    pub format: DisplayFormat,
    #[serde(default)]
    pub enable_logging: bool,
    #[serde(flatten)]
    pub cells: ViewportCells,
}

impl ViewportDefinition {
    pub fn rectangular(version: u64, rows: Vec<usize>, columns: Vec<usize>) -> Self {
        Self {
            version,
            format: DisplayFormat::Cell,
            enable_logging: false,
            cells: ViewportCells::Rectangular { rows, columns },
        }
        .normalized()
    }

    pub fn arbitrary(version: u64, cells: Vec<GridCell>) -> Self {
        Self {
            version,
            format: DisplayFormat::Cell,
            enable_logging: false,
            cells: ViewportCells::Arbitrary { cells },
        }
        .normalized()
    }

    pub fn with_format(mut self, format: DisplayFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_logging(mut self, enable_logging: bool) -> Self {
        self.enable_logging = enable_logging;
        self
    }

    /// Sorted, duplicate-free rows, columns and cells.
    pub fn normalized(mut self) -> Self {
        match &mut self.cells {
            ViewportCells::Rectangular { rows, columns } => {
                rows.sort_unstable();
                rows.dedup();
                columns.sort_unstable();
                columns.dedup();
            }
            ViewportCells::Arbitrary { cells } => {
                cells.sort_unstable();
                cells.dedup();
            }
        }
        self
    }

    /// Rows of a rectangular viewport.
    pub fn rows(&self) -> Option<&[usize]> {
        match &self.cells {
            ViewportCells::Rectangular { rows, .. } => Some(rows),
            ViewportCells::Arbitrary { .. } => None,
        }
    }

    /// Every cell in row-major order.
    pub fn iter_cells(&self) -> Vec<GridCell> {
        match &self.cells {
            ViewportCells::Rectangular { rows, columns } => rows
                .iter()
                .flat_map(|&row| columns.iter().map(move |&column| GridCell::new(row, column)))
                .collect(),
            ViewportCells::Arbitrary { cells } => cells.clone(),
        }
    }

    pub fn validate(&self, row_count: usize, column_count: usize) -> Result<(), ViewError> {
        let out_of_bounds = |row: usize, column: usize| ViewError::CellOutOfBounds {
            row,
            column,
            rows: row_count,
            columns: column_count,
        };
        match &self.cells {
            ViewportCells::Rectangular { rows, columns } => {
                if let Some(&row) = rows.iter().find(|&&r| r >= row_count) {
                    return Err(out_of_bounds(row, columns.first().copied().unwrap_or(0)));
                }
                if let Some(&column) = columns.iter().find(|&&c| c >= column_count) {
                    return Err(out_of_bounds(rows.first().copied().unwrap_or(0), column));
                }
            }
            ViewportCells::Arbitrary { cells } => {
                if let Some(cell) = cells
                    .iter()
                    .find(|c| c.row >= row_count || c.column >= column_count)
                {
                    return Err(out_of_bounds(cell.row, cell.column));
                }
            }
        }
        Ok(())
    }

    /// This definition with every cell outside the bounds dropped.
    pub fn clipped(&self, row_count: usize, column_count: usize) -> Self {
        let cells = match &self.cells {
            ViewportCells::Rectangular { rows, columns } => ViewportCells::Rectangular {
                rows: rows.iter().copied().filter(|&r| r < row_count).collect(),
                columns: columns.iter().copied().filter(|&c| c < column_count).collect(),
            },
            ViewportCells::Arbitrary { cells } => ViewportCells::Arbitrary {
                cells: cells
                    .iter()
                    .copied()
                    .filter(|c| c.row < row_count && c.column < column_count)
                    .collect(),
            },
        };
        Self {
            cells,
            ..self.clone()
        }
    }

    /// The node a client expanded or collapsed going from `previous` to this
    /// definition, as `(node row, expanded)`.
    ///
    /// Compares the row lists positionally: the first divergence must follow
    /// a node's own row. More rows at that position means the node was
    /// expanded, fewer means it was collapsed. A scroll or resize that happens
    /// to diverge right after a node row is misread as a toggle.
    pub fn changed_node(
        &self,
        previous: &ViewportDefinition,
        root: Option<&AnalyticsNode>,
    ) -> Option<(usize, bool)> {
        let (rows, previous_rows) = (self.rows()?, previous.rows()?);
        let index = rows
            .iter()
            .zip(previous_rows)
            .position(|(row, previous_row)| row != previous_row)?;
        if index == 0 {
            return None;
        }
        let node_row = rows[index - 1];
        root?.find_node(node_row)?;
        Some((node_row, rows[index] < previous_rows[index]))
    }
}

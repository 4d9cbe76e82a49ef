pub mod column;
pub mod definition;
pub mod depgraph;
pub mod listener;
pub mod main_grid;
pub mod node;
pub mod results;
pub mod row;
pub mod structure;
pub mod viewport;
pub mod viewports;

pub use column::{ColumnSpecification, GridColumn, GridColumnGroup, GridColumnGroups, InlineKeys};
pub use definition::{DisplayFormat, GridCell, ViewportCells, ViewportDefinition};
pub use depgraph::DependencyGraphGrid;
pub use listener::{LoggingViewportListener, NoopViewportListener, ViewportListener};
pub use main_grid::MainGrid;
pub use node::{AnalyticsNode, NodePath, ViewportNodeStructure};
pub use results::{ResultsCell, ViewportResults, ViewportState};
pub use row::{Row, RowKind};
pub use structure::{GridKind, GridStructure, StructureContext};
pub use viewport::Viewport;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The two main grids of a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GridType {
    Portfolio,
    Primitives,
}

impl GridType {
    pub fn as_str(&self) -> &'static str {
        match self {
            GridType::Portfolio => "portfolio",
            GridType::Primitives => "primitives",
        }
    }
}

impl fmt::Display for GridType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GridType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "portfolio" => Ok(GridType::Portfolio),
            "primitives" => Ok(GridType::Primitives),
            other => Err(format!("Unknown grid: {}", other)),
        }
    }
}

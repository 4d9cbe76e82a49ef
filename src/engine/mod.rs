//! Collaborators the view consumes: the calculation engine session, target
//! name resolution and portfolio lookup.

pub mod bridge;
pub mod resolver;

pub use bridge::BridgeSession;
pub use resolver::PortfolioTargetResolver;

use crate::error::ViewError;
use crate::services::results_cache::ResultKey;
use crate::types::{
    ComputedValue, DependencyGraph, Portfolio, TargetSpecification, TargetType, UniqueId,
    ValueSpecification,
};
use serde::{Deserialize, Serialize};

/// How much execution logging the engine records for a value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionLogMode {
    /// Only the log level and counts.
    #[default]
    Indicators,
    /// Every log entry.
    Full,
}

/// Live session with the calculation engine for one view.
pub trait EngineSession: Send + Sync {
    /// Current values of specifications that are not terminal outputs.
    fn query_computation_cache(
        &self,
        calc_config: &str,
        specifications: &[ValueSpecification],
    ) -> Result<Vec<ComputedValue>, ViewError>;

    /// Graph of calculations behind one output, if the engine has it.
    fn dependency_graph(
        &self,
        calc_config: &str,
        specification: &ValueSpecification,
    ) -> Result<Option<DependencyGraph>, ViewError>;

    fn set_minimum_log_mode(&self, mode: ExecutionLogMode, keys: &[ResultKey]);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    pub name: String,
    pub target_type: TargetType,
}

pub trait TargetResolver: Send + Sync {
    fn resolve(&self, target: &TargetSpecification) -> Option<ResolvedTarget>;

    /// Display name of a target, falling back to its raw id.
    fn name_of(&self, target: &TargetSpecification) -> String {
        self.resolve(target)
            .map(|resolved| resolved.name)
            .unwrap_or_else(|| target.id.to_string())
    }
}

pub trait PortfolioSupplier: Send + Sync {
    fn portfolio(&self, id: &UniqueId) -> Option<Portfolio>;
}

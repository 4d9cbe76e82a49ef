use super::{
    EngineSession, ExecutionLogMode, PortfolioSupplier, PortfolioTargetResolver, ResolvedTarget,
    TargetResolver,
};
use crate::error::ViewError;
use crate::services::results_cache::ResultKey;
use crate::types::{
    ComputedValue, DependencyGraph, ObjectId, Portfolio, TargetSpecification, UniqueId,
    ValueSpecification,
};
use dashmap::DashMap;
use std::sync::{Arc, RwLock};
use tracing::debug;

/// In-process engine session fed by an external engine.
///
/// The engine pushes dependency graphs, non-terminal values and portfolio
/// snapshots; the view queries them back through [`EngineSession`],
/// [`TargetResolver`] and [`PortfolioSupplier`].
pub struct BridgeSession {
    /// Dependency graphs keyed by (calc config, root specification).
    graphs: DashMap<(String, ValueSpecification), DependencyGraph>,
    /// Latest computation cache values keyed by result key.
    values: DashMap<ResultKey, ComputedValue>,
    /// Portfolio snapshots keyed by object id.
    portfolios: DashMap<ObjectId, Portfolio>,
    /// Names resolved from the most recent portfolio.
    resolver: RwLock<PortfolioTargetResolver>,
    /// Log modes requested by the view.
    log_modes: DashMap<ResultKey, ExecutionLogMode>,
}

impl BridgeSession {
    /// Create a new bridge session.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            graphs: DashMap::new(),
            values: DashMap::new(),
            portfolios: DashMap::new(),
            resolver: RwLock::new(PortfolioTargetResolver::default()),
            log_modes: DashMap::new(),
        })
    }

    /// Store the dependency graph behind one output.
    pub fn push_dependency_graph(&self, graph: DependencyGraph) {
        debug!(
            calc_config = %graph.calc_config,
            root = %graph.root,
            nodes = graph.nodes.len(),
            "Dependency graph pushed"
        );
        self.graphs
            .insert((graph.calc_config.clone(), graph.root.clone()), graph);
    }

    /// Store computation cache values for later queries.
    pub fn push_values(&self, calc_config: &str, values: Vec<ComputedValue>) {
        for value in values {
            let key = ResultKey::new(calc_config, value.specification.clone());
            self.values.insert(key, value);
        }
    }

    /// Drop the graphs and values of the previous compilation. Log modes
    /// and portfolio snapshots survive recompiles.
    pub fn clear_compilation(&self) {
        debug!(
            graphs = self.graphs.len(),
            values = self.values.len(),
            "Compilation state cleared"
        );
        self.graphs.clear();
        self.values.clear();
    }

    /// Record a portfolio snapshot and resolve target names from it.
    pub fn set_portfolio(&self, portfolio: Portfolio) {
        if let Ok(mut resolver) = self.resolver.write() {
            *resolver = PortfolioTargetResolver::new(Some(portfolio.clone()));
        }
        self.portfolios.insert(portfolio.id.object_id(), portfolio);
    }

    /// Log mode currently requested for a key.
    pub fn log_mode(&self, key: &ResultKey) -> ExecutionLogMode {
        self.log_modes
            .get(key)
            .map(|mode| *mode)
            .unwrap_or_default()
    }

    /// Keys currently logged in full.
    pub fn full_log_keys(&self) -> Vec<ResultKey> {
        let mut keys: Vec<ResultKey> = self
            .log_modes
            .iter()
            .filter(|entry| *entry.value() == ExecutionLogMode::Full)
            .map(|entry| entry.key().clone())
            .collect();
        keys.sort();
        keys
    }
}

impl EngineSession for BridgeSession {
    fn query_computation_cache(
        &self,
        calc_config: &str,
        specifications: &[ValueSpecification],
    ) -> Result<Vec<ComputedValue>, ViewError> {
        Ok(specifications
            .iter()
            .filter_map(|spec| {
                self.values
                    .get(&ResultKey::new(calc_config, spec.clone()))
                    .map(|value| value.clone())
            })
            .collect())
    }

    fn dependency_graph(
        &self,
        calc_config: &str,
        specification: &ValueSpecification,
    ) -> Result<Option<DependencyGraph>, ViewError> {
        Ok(self
            .graphs
            .get(&(calc_config.to_string(), specification.clone()))
            .map(|graph| graph.clone()))
    }

    fn set_minimum_log_mode(&self, mode: ExecutionLogMode, keys: &[ResultKey]) {
        debug!(?mode, keys = keys.len(), "Log mode changed");
        for key in keys {
            match mode {
                ExecutionLogMode::Full => {
                    self.log_modes.insert(key.clone(), mode);
                }
                ExecutionLogMode::Indicators => {
                    self.log_modes.remove(key);
                }
            }
        }
    }
}

impl TargetResolver for BridgeSession {
    fn resolve(&self, target: &TargetSpecification) -> Option<ResolvedTarget> {
        self.resolver
            .read()
            .ok()
            .and_then(|resolver| resolver.resolve(target))
    }
}

impl PortfolioSupplier for BridgeSession {
    fn portfolio(&self, id: &UniqueId) -> Option<Portfolio> {
        self.portfolios
            .get(&id.object_id())
            .map(|portfolio| portfolio.clone())
    }
}

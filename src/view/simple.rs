use super::{AnalyticsView, CycleUpdate, GridStructureSnapshot, GridTarget};
use crate::engine::{EngineSession, PortfolioSupplier, TargetResolver};
use crate::error::ViewError;
use crate::grid::{
    ColumnSpecification, GridKind, GridStructure, GridType, InlineKeys, MainGrid,
    StructureContext, ViewportDefinition, ViewportListener, ViewportResults,
};
use crate::services::results_cache::ResultsCache;
use crate::services::value_mappings::ValueMappings;
use crate::types::{CompiledViewDefinition, PortfolioEntity, ViewCycleResult};
use std::sync::Arc;
use tracing::{debug, info};

/// Per-view options taken from the server configuration.
#[derive(Debug, Clone)]
pub struct ViewSettings {
    /// Ignore target versions when mapping cells to specifications.
    pub versioned_mappings: bool,
    /// Security attributes shown as portfolio grid columns.
    pub blotter_attributes: Vec<String>,
    pub max_viewports_per_grid: usize,
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            versioned_mappings: false,
            blotter_attributes: vec!["SecurityType".to_string(), "Name".to_string()],
            max_viewports_per_grid: 64,
        }
    }
}

/// All state of one analytics view. Not thread-safe on its own; wrap it in
/// [`super::LockingAnalyticsView`].
pub struct SimpleAnalyticsView {
    view_id: String,
    settings: ViewSettings,
    compiled: Option<CompiledViewDefinition>,
    mappings: Arc<ValueMappings>,
    inline_keys: InlineKeys,
    cache: ResultsCache,
    portfolio_grid: MainGrid,
    primitives_grid: MainGrid,
    engine: Arc<dyn EngineSession>,
    resolver: Arc<dyn TargetResolver>,
    portfolios: Arc<dyn PortfolioSupplier>,
    viewport_listener: Box<dyn ViewportListener>,
}

impl SimpleAnalyticsView {
    pub fn new(
        view_id: impl Into<String>,
        settings: ViewSettings,
        engine: Arc<dyn EngineSession>,
        resolver: Arc<dyn TargetResolver>,
        portfolios: Arc<dyn PortfolioSupplier>,
        viewport_listener: Box<dyn ViewportListener>,
    ) -> Self {
        let view_id = view_id.into();
        let grid = |grid_type: GridType, kind: GridKind| {
            MainGrid::new(
                grid_type,
                format!("{}:{}", view_id, grid_type),
                GridStructure::empty(kind),
                settings.max_viewports_per_grid,
            )
        };
        let portfolio_grid = grid(GridType::Portfolio, GridKind::Portfolio);
        let primitives_grid = grid(GridType::Primitives, GridKind::Primitives);
        Self {
            view_id,
            settings,
            compiled: None,
            mappings: Arc::new(ValueMappings::empty()),
            inline_keys: InlineKeys::new(),
            cache: ResultsCache::new(),
            portfolio_grid,
            primitives_grid,
            engine,
            resolver,
            portfolios,
            viewport_listener,
        }
    }

    pub fn view_id(&self) -> &str {
        &self.view_id
    }

    pub fn cache(&self) -> &ResultsCache {
        &self.cache
    }

    pub fn grid(&self, grid: GridType) -> &MainGrid {
        match grid {
            GridType::Portfolio => &self.portfolio_grid,
            GridType::Primitives => &self.primitives_grid,
        }
    }

    fn viewport_callback_id(&self, target: GridTarget, viewport_id: i32) -> String {
        match target.graph_id {
            Some(graph_id) => format!(
                "{}:{}:depgraph:{}:viewport:{}",
                self.view_id, target.grid, graph_id, viewport_id
            ),
            None => format!("{}:{}:viewport:{}", self.view_id, target.grid, viewport_id),
        }
    }

    /// Build both grid structures for the current compilation and rebind
    /// their viewports.
    fn rebuild_structures(&mut self) -> Vec<String> {
        let Some(compiled) = self.compiled.as_ref() else {
            return Vec::new();
        };
        let context = StructureContext {
            compiled,
            mappings: self.mappings.clone(),
            resolver: self.resolver.as_ref(),
            inline_keys: &self.inline_keys,
            blotter_attributes: &self.settings.blotter_attributes,
        };
        let portfolio = self.portfolio_grid.structure().with_updated_structure(&context);
        let primitives = self.primitives_grid.structure().with_updated_structure(&context);

        let listener = self.viewport_listener.as_mut();
        let mut callback_ids = self
            .portfolio_grid
            .update_structure(portfolio, &self.cache, listener);
        callback_ids.extend(
            self.primitives_grid
                .update_structure(primitives, &self.cache, listener),
        );
        callback_ids
    }

    /// Record inline keys of newly seen vector and matrix values. True if
    /// any column gained a key.
    fn discover_inline_keys(&mut self, result: &ViewCycleResult) -> bool {
        let mut changed = false;
        for (calc_config, values) in &result.results {
            for computed in values {
                let Some(keys) = computed.value.inline_keys() else {
                    continue;
                };
                for requirement in self
                    .mappings
                    .get_requirements(calc_config, &computed.specification)
                {
                    let column = ColumnSpecification::new(
                        calc_config.clone(),
                        requirement.value_name.clone(),
                        requirement.constraints.clone(),
                    );
                    let known = self.inline_keys.entry(column).or_default();
                    for key in &keys {
                        if !known.contains(key) {
                            known.push(key.clone());
                            changed = true;
                        }
                    }
                }
            }
        }
        changed
    }
}

fn dedup(callback_ids: Vec<String>) -> Vec<String> {
    let mut unique: Vec<String> = Vec::with_capacity(callback_ids.len());
    for id in callback_ids {
        if !unique.contains(&id) {
            unique.push(id);
        }
    }
    unique
}

impl AnalyticsView for SimpleAnalyticsView {
    fn update_structure(
        &mut self,
        compiled: CompiledViewDefinition,
    ) -> Result<Vec<String>, ViewError> {
        self.mappings = Arc::new(if self.settings.versioned_mappings {
            ValueMappings::versioned(&compiled)
        } else {
            ValueMappings::new(&compiled)
        });
        if let Some(portfolio) = &compiled.portfolio {
            self.cache.seed_entities(&portfolio.entities());
        }
        info!(
            view_id = %self.view_id,
            definition = %compiled.definition.name,
            mappings = self.mappings.len(),
            "View compiled"
        );
        self.compiled = Some(compiled);
        Ok(dedup(self.rebuild_structures()))
    }

    fn portfolio_changed(&mut self) -> Result<Vec<String>, ViewError> {
        let Some(compiled) = self.compiled.as_mut() else {
            return Ok(Vec::new());
        };
        let portfolio_id = compiled
            .definition
            .portfolio_id
            .clone()
            .or_else(|| compiled.portfolio.as_ref().map(|p| p.id.clone()))
            .ok_or_else(|| ViewError::Engine("view has no portfolio".into()))?;
        let portfolio = self.portfolios.portfolio(&portfolio_id).ok_or_else(|| {
            ViewError::Engine(format!("portfolio {} is not available", portfolio_id))
        })?;

        self.cache.seed_entities(&portfolio.entities());
        let structure = self
            .portfolio_grid
            .structure()
            .with_updated_rows(Some(&portfolio));
        compiled.portfolio = Some(portfolio);
        info!(view_id = %self.view_id, rows = structure.row_count(), "Portfolio changed");
        Ok(self.portfolio_grid.update_structure(
            structure,
            &self.cache,
            self.viewport_listener.as_mut(),
        ))
    }

    fn update_results(&mut self, result: &ViewCycleResult) -> Result<CycleUpdate, ViewError> {
        self.cache.put(result);
        let mut callback_ids = Vec::new();
        if self.discover_inline_keys(result) {
            debug!(view_id = %self.view_id, "New inline columns, rebuilding structures");
            callback_ids.extend(self.rebuild_structures());
        }
        callback_ids.extend(self.portfolio_grid.refresh_viewports(&self.cache));
        callback_ids.extend(self.primitives_grid.refresh_viewports(&self.cache));

        let mut failures = Vec::new();
        let engine = self.engine.as_ref();
        for grid in [&mut self.portfolio_grid, &mut self.primitives_grid] {
            let (ids, errors) = grid.update_dependency_graphs(engine);
            callback_ids.extend(ids);
            failures.extend(errors);
        }
        debug!(
            view_id = %self.view_id,
            updated = callback_ids.len(),
            failed = failures.len(),
            "Cycle results distributed"
        );
        Ok(CycleUpdate {
            callback_ids: dedup(callback_ids),
            failures,
        })
    }

    fn update_entities(&mut self, entities: &[PortfolioEntity]) -> Result<Vec<String>, ViewError> {
        self.cache.put_entities(entities);
        let mut callback_ids = self.portfolio_grid.refresh_viewports(&self.cache);
        callback_ids.extend(self.primitives_grid.refresh_viewports(&self.cache));
        Ok(callback_ids)
    }

    fn grid_structure(
        &self,
        target: GridTarget,
        viewport_id: Option<i32>,
    ) -> Result<GridStructureSnapshot, ViewError> {
        let grid = self.grid(target.grid);
        match target.graph_id {
            None => Ok(GridStructureSnapshot {
                structure: grid.structure().clone(),
                nodes: viewport_id
                    .map(|id| grid.viewport(id).map(|v| v.node_structure()))
                    .transpose()?,
            }),
            Some(graph_id) => {
                let graph = grid.depgraph(graph_id)?;
                Ok(GridStructureSnapshot {
                    structure: graph.structure().clone(),
                    nodes: viewport_id
                        .map(|id| graph.viewport(id).map(|v| v.node_structure()))
                        .transpose()?,
                })
            }
        }
    }

    fn create_viewport(
        &mut self,
        target: GridTarget,
        viewport_id: i32,
        definition: ViewportDefinition,
    ) -> Result<Option<String>, ViewError> {
        let callback_id = self.viewport_callback_id(target, viewport_id);
        let listener = self.viewport_listener.as_mut();
        let grid = match target.grid {
            GridType::Portfolio => &mut self.portfolio_grid,
            GridType::Primitives => &mut self.primitives_grid,
        };
        match target.graph_id {
            None => grid.create_viewport(viewport_id, callback_id, definition, &self.cache, listener),
            Some(graph_id) => grid.depgraph_mut(graph_id)?.create_viewport(
                viewport_id,
                callback_id,
                definition,
                listener,
            ),
        }
    }

    fn update_viewport(
        &mut self,
        target: GridTarget,
        viewport_id: i32,
        definition: ViewportDefinition,
    ) -> Result<Option<String>, ViewError> {
        let listener = self.viewport_listener.as_mut();
        let grid = match target.grid {
            GridType::Portfolio => &mut self.portfolio_grid,
            GridType::Primitives => &mut self.primitives_grid,
        };
        match target.graph_id {
            None => grid.update_viewport(viewport_id, definition, &self.cache, listener),
            Some(graph_id) => {
                grid.depgraph_mut(graph_id)?
                    .update_viewport(viewport_id, definition, listener)
            }
        }
    }

    fn delete_viewport(&mut self, target: GridTarget, viewport_id: i32) -> Result<(), ViewError> {
        let listener = self.viewport_listener.as_mut();
        let grid = match target.grid {
            GridType::Portfolio => &mut self.portfolio_grid,
            GridType::Primitives => &mut self.primitives_grid,
        };
        match target.graph_id {
            None => grid.delete_viewport(viewport_id, listener),
            Some(graph_id) => grid
                .depgraph_mut(graph_id)?
                .delete_viewport(viewport_id, listener),
        }
    }

    fn data(&self, target: GridTarget, viewport_id: i32) -> Result<ViewportResults, ViewError> {
        let grid = self.grid(target.grid);
        let viewport = match target.graph_id {
            None => grid.viewport(viewport_id)?,
            Some(graph_id) => grid.depgraph(graph_id)?.viewport(viewport_id)?,
        };
        Ok(viewport.results().clone())
    }

    fn open_dependency_graph(
        &mut self,
        grid: GridType,
        graph_id: i32,
        row: usize,
        column: usize,
    ) -> Result<Vec<String>, ViewError> {
        let callback_id = format!("{}:{}:depgraph:{}", self.view_id, grid, graph_id);
        let main = match grid {
            GridType::Portfolio => &mut self.portfolio_grid,
            GridType::Primitives => &mut self.primitives_grid,
        };
        let callback_id = main.open_dependency_graph(
            graph_id,
            callback_id,
            row,
            column,
            self.engine.as_ref(),
            self.resolver.as_ref(),
        )?;
        Ok(vec![callback_id])
    }

    fn close_dependency_graph(&mut self, grid: GridType, graph_id: i32) -> Result<(), ViewError> {
        let listener = self.viewport_listener.as_mut();
        let main = match grid {
            GridType::Portfolio => &mut self.portfolio_grid,
            GridType::Primitives => &mut self.primitives_grid,
        };
        main.close_dependency_graph(graph_id, listener)
    }

    fn close(&mut self) {
        let listener = self.viewport_listener.as_mut();
        self.portfolio_grid.close(listener);
        self.primitives_grid.close(listener);
        info!(view_id = %self.view_id, "View closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{BridgeSession, ExecutionLogMode};
    use crate::grid::{NoopViewportListener, ViewportState};
    use crate::services::ResultKey;
    use crate::types::{
        CalcConfigDefinition, CompiledCalcConfig, ComputedValue, DependencyGraph,
        DependencyNode, LabelledMatrix1D, Portfolio, PortfolioNode, PortfolioRequirement,
        Position, Security, TargetSpecification, TerminalOutput, UniqueId, Value,
        ValueProperties, ValueRequirement, ValueSpecification, ValueType, ViewDefinition,
    };
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    /// Engine session that loses its computation cache on demand.
    struct FlakyEngine {
        inner: Arc<BridgeSession>,
        failing: AtomicBool,
    }

    impl EngineSession for FlakyEngine {
        fn query_computation_cache(
            &self,
            calc_config: &str,
            specifications: &[ValueSpecification],
        ) -> Result<Vec<ComputedValue>, ViewError> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(ViewError::Engine("computation cache unavailable".into()));
            }
            self.inner.query_computation_cache(calc_config, specifications)
        }

        fn dependency_graph(
            &self,
            calc_config: &str,
            specification: &ValueSpecification,
        ) -> Result<Option<DependencyGraph>, ViewError> {
            self.inner.dependency_graph(calc_config, specification)
        }

        fn set_minimum_log_mode(&self, mode: ExecutionLogMode, keys: &[ResultKey]) {
            self.inner.set_minimum_log_mode(mode, keys)
        }
    }

    fn position(id: &str) -> Position {
        Position {
            id: UniqueId::of("Pos", id),
            quantity: dec!(100),
            security: Security {
                id: UniqueId::of("Sec", id),
                name: format!("Swap {}", id),
                security_type: "SWAP".into(),
                attributes: Default::default(),
            },
            trades: vec![],
        }
    }

    fn portfolio(ids: &[&str]) -> Portfolio {
        Portfolio {
            id: UniqueId::of("Port", "1"),
            name: "Rates".into(),
            root: PortfolioNode {
                id: UniqueId::of("Node", "root"),
                name: "Rates".into(),
                positions: ids.iter().map(|id| position(id)).collect(),
                children: vec![],
            },
        }
    }

    fn pv(id: &str) -> ValueSpecification {
        ValueSpecification::new(
            "PV",
            TargetSpecification::position(UniqueId::of("Pos", id)),
            ValueProperties::new().with("Function", "SwapPV"),
        )
    }

    fn compiled() -> CompiledViewDefinition {
        CompiledViewDefinition {
            definition: ViewDefinition {
                name: "Rates".into(),
                portfolio_id: Some(UniqueId::of("Port", "1")),
                calculation_configurations: vec![CalcConfigDefinition {
                    name: "Default".into(),
                    portfolio_requirements: vec![PortfolioRequirement {
                        security_type: "SWAP".into(),
                        value_name: "PV".into(),
                        constraints: ValueProperties::new(),
                    }],
                    specific_requirements: vec![],
                    value_types: [("PV".to_string(), ValueType::Double)].into(),
                }],
            },
            portfolio: Some(portfolio(&["A", "B"])),
            calc_configs: vec![CompiledCalcConfig {
                name: "Default".into(),
                terminal_outputs: ["A", "B"]
                    .iter()
                    .map(|id| TerminalOutput {
                        specification: pv(id),
                        requirements: vec![ValueRequirement::new(
                            "PV",
                            TargetSpecification::position(UniqueId::of("Pos", *id)),
                            ValueProperties::new(),
                        )],
                    })
                    .collect(),
            }],
        }
    }

    fn view(session: &Arc<BridgeSession>) -> SimpleAnalyticsView {
        let settings = ViewSettings {
            blotter_attributes: vec![],
            ..ViewSettings::default()
        };
        SimpleAnalyticsView::new(
            "v1",
            settings,
            session.clone(),
            session.clone(),
            session.clone(),
            Box::new(NoopViewportListener),
        )
    }

    fn cycle(value: ComputedValue) -> ViewCycleResult {
        ViewCycleResult::new(Utc::now(), Duration::from_millis(40)).with_value("Default", value)
    }

    fn portfolio_target() -> GridTarget {
        GridTarget::main(GridType::Portfolio)
    }

    #[test]
    fn test_update_structure_announces_both_grids() {
        let session = BridgeSession::new();
        let mut view = view(&session);
        let ids = view.update_structure(compiled()).unwrap();
        assert_eq!(ids, vec!["v1:portfolio".to_string(), "v1:primitives".to_string()]);
        let snapshot = view.grid_structure(portfolio_target(), None).unwrap();
        assert_eq!(snapshot.structure.row_count(), 3);
        assert_eq!(snapshot.structure.column_count(), 3);
        assert!(snapshot.nodes.is_none());
    }

    #[test]
    fn test_viewport_follows_cycles() {
        let session = BridgeSession::new();
        let mut view = view(&session);
        view.update_structure(compiled()).unwrap();

        let definition = ViewportDefinition::rectangular(1, vec![1, 2], vec![0, 2]);
        assert_eq!(view.create_viewport(portfolio_target(), 1, definition).unwrap(), None);

        let ids = view
            .update_results(&cycle(ComputedValue::new(pv("A"), Value::Double(12.5))))
            .unwrap()
            .callback_ids;
        assert_eq!(ids, vec!["v1:portfolio:viewport:1".to_string()]);

        let data = view.data(portfolio_target(), 1).unwrap();
        assert_eq!(data.state(), ViewportState::FreshData);
        assert_eq!(data.cells[1].value, Some(Value::Double(12.5)));
        assert_eq!(data.calculation_duration_ms, 40);

        // an empty delta leaves the viewport stale, so nobody is told
        let ids = view
            .update_results(&ViewCycleResult::new(Utc::now(), Duration::ZERO))
            .unwrap()
            .callback_ids;
        assert!(ids.is_empty());
    }

    #[test]
    fn test_unknown_viewport_and_graph() {
        let session = BridgeSession::new();
        let mut view = view(&session);
        view.update_structure(compiled()).unwrap();
        assert!(matches!(
            view.data(portfolio_target(), 9),
            Err(ViewError::ViewportNotFound(9))
        ));
        assert!(matches!(
            view.delete_viewport(GridTarget::depgraph(GridType::Portfolio, 4), 1),
            Err(ViewError::DependencyGraphNotFound(4))
        ));
    }

    #[test]
    fn test_matrix_values_add_inline_columns() {
        let session = BridgeSession::new();
        let mut view = view(&session);
        view.update_structure(compiled()).unwrap();
        let matrix = Value::LabelledMatrix1D(LabelledMatrix1D {
            labels: vec!["1Y".into(), "5Y".into()],
            values: vec![1.0, 2.0],
        });
        let ids = view
            .update_results(&cycle(ComputedValue::new(pv("A"), matrix.clone())))
            .unwrap()
            .callback_ids;
        assert!(ids.contains(&"v1:portfolio".to_string()));
        let snapshot = view.grid_structure(portfolio_target(), None).unwrap();
        assert_eq!(snapshot.structure.column_count(), 4);

        // known keys do not rebuild again
        let ids = view
            .update_results(&cycle(ComputedValue::new(pv("A"), matrix)))
            .unwrap()
            .callback_ids;
        assert!(!ids.contains(&"v1:portfolio".to_string()));
    }

    #[test]
    fn test_inline_columns_follow_each_positions_labels() {
        let session = BridgeSession::new();
        let mut view = view(&session);
        view.update_structure(compiled()).unwrap();
        let matrix = |labels: [&str; 2], values: [f64; 2]| {
            Value::LabelledMatrix1D(LabelledMatrix1D {
                labels: labels.iter().map(|label| label.to_string()).collect(),
                values: values.to_vec(),
            })
        };
        let result = cycle(ComputedValue::new(pv("A"), matrix(["1Y", "5Y"], [1.0, 2.0])))
            .with_value(
                "Default",
                ComputedValue::new(pv("B"), matrix(["2Y", "10Y"], [3.0, 4.0])),
            );
        view.update_results(&result).unwrap();

        let snapshot = view.grid_structure(portfolio_target(), None).unwrap();
        let headers: Vec<&str> = (2..6)
            .filter_map(|index| snapshot.structure.columns().column(index))
            .map(|column| column.header.as_str())
            .collect();
        assert_eq!(headers, vec!["PV / 1Y", "PV / 5Y", "PV / 2Y", "PV / 10Y"]);

        view.create_viewport(
            portfolio_target(),
            1,
            ViewportDefinition::rectangular(1, vec![1, 2], vec![2, 3, 4, 5]),
        )
        .unwrap();
        let data = view.data(portfolio_target(), 1).unwrap();
        let values: Vec<Option<Value>> = data.cells.iter().map(|cell| cell.value.clone()).collect();
        assert_eq!(
            values,
            vec![
                Some(Value::Double(1.0)),
                Some(Value::Double(2.0)),
                None,
                None,
                None,
                None,
                Some(Value::Double(3.0)),
                Some(Value::Double(4.0)),
            ]
        );
    }

    #[test]
    fn test_failed_graph_refresh_still_updates_viewports() {
        let session = BridgeSession::new();
        session.push_dependency_graph(DependencyGraph {
            calc_config: "Default".into(),
            root: pv("A"),
            nodes: vec![DependencyNode {
                function_name: "SwapPV".into(),
                target: pv("A").target,
                outputs: vec![pv("A")],
                inputs: vec![],
            }],
        });
        let engine = Arc::new(FlakyEngine {
            inner: session.clone(),
            failing: AtomicBool::new(false),
        });
        let settings = ViewSettings {
            blotter_attributes: vec![],
            ..ViewSettings::default()
        };
        let mut view = SimpleAnalyticsView::new(
            "v1",
            settings,
            engine.clone(),
            session.clone(),
            session.clone(),
            Box::new(NoopViewportListener),
        );
        view.update_structure(compiled()).unwrap();
        view.open_dependency_graph(GridType::Portfolio, 1, 1, 2).unwrap();
        view.create_viewport(
            portfolio_target(),
            1,
            ViewportDefinition::rectangular(1, vec![1], vec![2]),
        )
        .unwrap();

        engine.failing.store(true, Ordering::SeqCst);
        let update = view
            .update_results(&cycle(ComputedValue::new(pv("A"), Value::Double(7.0))))
            .unwrap();
        assert_eq!(update.callback_ids, vec!["v1:portfolio:viewport:1".to_string()]);
        assert_eq!(
            update.failures,
            vec![ViewError::Engine("computation cache unavailable".into())]
        );
        let data = view.data(portfolio_target(), 1).unwrap();
        assert_eq!(data.state(), ViewportState::FreshData);
        assert_eq!(data.cells[0].value, Some(Value::Double(7.0)));

        assert!(matches!(update.into_result(), Err(ViewError::Engine(_))));
    }

    #[test]
    fn test_inline_rebuild_announces_closed_graphs() {
        let session = BridgeSession::new();
        session.push_dependency_graph(DependencyGraph {
            calc_config: "Default".into(),
            root: pv("A"),
            nodes: vec![DependencyNode {
                function_name: "SwapPV".into(),
                target: pv("A").target,
                outputs: vec![pv("A")],
                inputs: vec![],
            }],
        });
        let mut view = view(&session);
        view.update_structure(compiled()).unwrap();
        view.open_dependency_graph(GridType::Portfolio, 1, 1, 2).unwrap();

        let matrix = Value::LabelledMatrix1D(LabelledMatrix1D {
            labels: vec!["1Y".into()],
            values: vec![1.0],
        });
        let ids = view
            .update_results(&cycle(ComputedValue::new(pv("A"), matrix)))
            .unwrap()
            .callback_ids;
        assert!(ids.contains(&"v1:portfolio".to_string()));
        assert!(ids.contains(&"v1:portfolio:depgraph:1".to_string()));
        assert!(matches!(
            view.grid_structure(GridTarget::depgraph(GridType::Portfolio, 1), None),
            Err(ViewError::DependencyGraphNotFound(1))
        ));
    }

    #[test]
    fn test_portfolio_changed_reloads_rows() {
        let session = BridgeSession::new();
        let mut view = view(&session);
        view.update_structure(compiled()).unwrap();
        view.create_viewport(
            portfolio_target(),
            1,
            ViewportDefinition::rectangular(1, vec![0, 1, 2], vec![0]),
        )
        .unwrap();

        session.set_portfolio(portfolio(&["A", "B", "C"]));
        let ids = view.portfolio_changed().unwrap();
        assert!(ids.contains(&"v1:portfolio".to_string()));
        assert!(ids.contains(&"v1:portfolio:viewport:1".to_string()));
        let snapshot = view.grid_structure(portfolio_target(), Some(1)).unwrap();
        assert_eq!(snapshot.structure.row_count(), 4);
        assert!(snapshot.nodes.is_some());
    }

    #[test]
    fn test_portfolio_changed_without_snapshot_fails() {
        let session = BridgeSession::new();
        let mut view = view(&session);
        view.update_structure(compiled()).unwrap();
        assert!(matches!(view.portfolio_changed(), Err(ViewError::Engine(_))));
    }

    #[test]
    fn test_entity_updates_refresh_blotter_cells() {
        let session = BridgeSession::new();
        let settings = ViewSettings {
            blotter_attributes: vec!["Name".into()],
            ..ViewSettings::default()
        };
        let mut view = SimpleAnalyticsView::new(
            "v1",
            settings,
            session.clone(),
            session.clone(),
            session.clone(),
            Box::new(NoopViewportListener),
        );
        view.update_structure(compiled()).unwrap();
        view.create_viewport(
            portfolio_target(),
            1,
            ViewportDefinition::rectangular(1, vec![1], vec![0, 2]),
        )
        .unwrap();

        let mut security = position("A").security;
        security.name = "Swap A (amended)".into();
        let ids = view
            .update_entities(&[PortfolioEntity::Security(security)])
            .unwrap();
        assert_eq!(ids, vec!["v1:portfolio:viewport:1".to_string()]);
        let data = view.data(portfolio_target(), 1).unwrap();
        assert_eq!(data.cells[1].value, Some(Value::Text("Swap A (amended)".into())));
    }

    #[test]
    fn test_dependency_graph_lifecycle() {
        let session = BridgeSession::new();
        let discount = ValueSpecification::new(
            "Discount",
            TargetSpecification::primitive(UniqueId::of("Curve", "USD")),
            ValueProperties::new(),
        );
        let quotes = ValueSpecification::new(
            "Quotes",
            TargetSpecification::primitive(UniqueId::of("Curve", "USD")),
            ValueProperties::new(),
        );
        session.push_dependency_graph(DependencyGraph {
            calc_config: "Default".into(),
            root: pv("A"),
            nodes: vec![
                DependencyNode {
                    function_name: "SwapPV".into(),
                    target: pv("A").target,
                    outputs: vec![pv("A")],
                    inputs: vec![discount.clone()],
                },
                DependencyNode {
                    function_name: "Bootstrap".into(),
                    target: discount.target.clone(),
                    outputs: vec![discount.clone()],
                    inputs: vec![quotes],
                },
            ],
        });
        session.push_values("Default", vec![ComputedValue::new(discount, Value::Double(0.97))]);

        let mut view = view(&session);
        view.update_structure(compiled()).unwrap();
        assert!(matches!(
            view.open_dependency_graph(GridType::Portfolio, 1, 1, 0),
            Err(ViewError::DependencyGraphUnavailable { row: 1, column: 0 })
        ));

        let ids = view.open_dependency_graph(GridType::Portfolio, 1, 1, 2).unwrap();
        assert_eq!(ids, vec!["v1:portfolio:depgraph:1".to_string()]);
        assert!(matches!(
            view.open_dependency_graph(GridType::Portfolio, 1, 1, 2),
            Err(ViewError::DuplicateId(_))
        ));

        let target = GridTarget::depgraph(GridType::Portfolio, 1);
        let graph = view.grid_structure(target, None).unwrap();
        assert_eq!(graph.structure.row_count(), 2);

        let callback = view
            .create_viewport(target, 1, ViewportDefinition::rectangular(1, vec![1], vec![3]))
            .unwrap();
        assert_eq!(callback.as_deref(), Some("v1:portfolio:depgraph:1:viewport:1"));
        let data = view.data(target, 1).unwrap();
        assert_eq!(data.cells[0].value, Some(Value::Double(0.97)));

        view.close_dependency_graph(GridType::Portfolio, 1).unwrap();
        assert!(matches!(
            view.data(target, 1),
            Err(ViewError::DependencyGraphNotFound(1))
        ));
    }

    #[test]
    fn test_close_removes_viewports() {
        let session = BridgeSession::new();
        let mut view = view(&session);
        view.update_structure(compiled()).unwrap();
        view.create_viewport(
            portfolio_target(),
            1,
            ViewportDefinition::rectangular(1, vec![0], vec![0]),
        )
        .unwrap();
        view.close();
        assert!(view.data(portfolio_target(), 1).is_err());
    }
}

use super::column::{
    dependency_graph_columns, portfolio_columns, primitives_columns, CellRenderer, GridColumn,
    GridColumnGroups, InlineKeys, ValueColumn,
};
use super::definition::{GridCell, ViewportDefinition};
use super::node::{AnalyticsNode, NodePath};
use super::results::{ResultsCell, ViewportResults, ViewportState};
use super::row::{primitive_rows, PortfolioRows, Row};
use crate::engine::TargetResolver;
use crate::error::ViewError;
use crate::services::results_cache::{CachedResult, ResultKey, ResultsCache};
use crate::services::value_mappings::ValueMappings;
use crate::types::{CompiledViewDefinition, Portfolio, Value, ValueRequirement, ValueSpecification};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GridKind {
    Portfolio,
    Primitives,
    DependencyGraph,
}

/// Everything a main grid structure is built from.
pub struct StructureContext<'a> {
    pub compiled: &'a CompiledViewDefinition,
    pub mappings: Arc<ValueMappings>,
    pub resolver: &'a dyn TargetResolver,
    pub inline_keys: &'a InlineKeys,
    pub blotter_attributes: &'a [String],
}

/// Rows and columns of one grid for one compilation.
///
/// Immutable; a recompilation or portfolio change produces a new structure
/// that viewports are rebound to.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridStructure {
    kind: GridKind,
    columns: GridColumnGroups,
    rows: Vec<Row>,
    root: Option<AnalyticsNode>,
    #[serde(skip)]
    node_paths: HashMap<usize, NodePath>,
    #[serde(skip)]
    mappings: Arc<ValueMappings>,
}

impl GridStructure {
    pub fn empty(kind: GridKind) -> Self {
        Self {
            kind,
            columns: GridColumnGroups::default(),
            rows: Vec::new(),
            root: None,
            node_paths: HashMap::new(),
            mappings: Arc::new(ValueMappings::empty()),
        }
    }

    pub fn portfolio(context: &StructureContext<'_>) -> Self {
        let PortfolioRows { rows, root, paths } =
            PortfolioRows::build(context.compiled.portfolio.as_ref());
        Self {
            kind: GridKind::Portfolio,
            columns: portfolio_columns(
                context.compiled,
                context.blotter_attributes,
                context.inline_keys,
            ),
            rows,
            root,
            node_paths: paths,
            mappings: context.mappings.clone(),
        }
    }

    pub fn primitives(context: &StructureContext<'_>) -> Self {
        Self {
            kind: GridKind::Primitives,
            columns: primitives_columns(context.compiled, context.inline_keys),
            rows: primitive_rows(context.compiled, context.resolver),
            root: None,
            node_paths: HashMap::new(),
            mappings: context.mappings.clone(),
        }
    }

    /// Structure of a dependency graph grid. Cells resolve through the row's
    /// own specification, so no mappings are needed.
    pub fn dependency_graph(calc_config: &str, rows: Vec<Row>, root: Option<AnalyticsNode>) -> Self {
        Self {
            kind: GridKind::DependencyGraph,
            columns: dependency_graph_columns(calc_config),
            rows,
            root,
            node_paths: HashMap::new(),
            mappings: Arc::new(ValueMappings::empty()),
        }
    }

    /// A structure of the same kind built for a new compilation.
    pub fn with_updated_structure(&self, context: &StructureContext<'_>) -> Self {
        match self.kind {
            GridKind::Portfolio => Self::portfolio(context),
            GridKind::Primitives => Self::primitives(context),
            GridKind::DependencyGraph => self.clone(),
        }
    }

    /// The same columns over the rows of a changed portfolio.
    pub fn with_updated_rows(&self, portfolio: Option<&Portfolio>) -> Self {
        if self.kind != GridKind::Portfolio {
            return self.clone();
        }
        let PortfolioRows { rows, root, paths } = PortfolioRows::build(portfolio);
        Self {
            rows,
            root,
            node_paths: paths,
            ..self.clone()
        }
    }

    pub fn kind(&self) -> GridKind {
        self.kind
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.column_count()
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&Row> {
        self.rows.get(index)
    }

    pub fn columns(&self) -> &GridColumnGroups {
        &self.columns
    }

    pub fn root(&self) -> Option<&AnalyticsNode> {
        self.root.as_ref()
    }

    pub fn node_paths(&self) -> &HashMap<usize, NodePath> {
        &self.node_paths
    }

    pub fn node_path(&self, row: usize) -> Option<&NodePath> {
        self.node_paths.get(&row)
    }

    pub fn mappings(&self) -> &ValueMappings {
        &self.mappings
    }

    fn cell(&self, row: usize, column: usize) -> Result<(&Row, &GridColumn), ViewError> {
        match (self.rows.get(row), self.columns.column(column)) {
            (Some(r), Some(c)) => Ok((r, c)),
            _ => Err(ViewError::CellOutOfBounds {
                row,
                column,
                rows: self.row_count(),
                columns: self.column_count(),
            }),
        }
    }

    /// Specification of the engine value shown in a cell, `None` for cells
    /// without one.
    pub fn value_specification_for_cell(
        &self,
        row: usize,
        column: usize,
    ) -> Result<Option<&ValueSpecification>, ViewError> {
        let (row, column) = self.cell(row, column)?;
        Ok(self.specification(row, column))
    }

    pub fn value_requirement_for_cell(
        &self,
        row: usize,
        column: usize,
    ) -> Result<Option<ValueRequirement>, ViewError> {
        let (row, column) = self.cell(row, column)?;
        Ok(match &column.renderer {
            CellRenderer::Value(ValueColumn::Mapped { spec, .. }) => {
                Some(spec.requirement_for(&row.target))
            }
            _ => None,
        })
    }

    fn specification<'a>(&'a self, row: &'a Row, column: &GridColumn) -> Option<&'a ValueSpecification> {
        match &column.renderer {
            CellRenderer::Value(ValueColumn::Mapped { spec, .. }) => self
                .mappings
                .get_value_specification(&spec.calc_config, &spec.requirement_for(&row.target)),
            CellRenderer::Value(ValueColumn::RowSpecification { .. }) => row.specification(),
            _ => None,
        }
    }

    /// Cache keys of the engine-backed cells a definition covers.
    pub fn result_keys(&self, definition: &ViewportDefinition) -> Vec<ResultKey> {
        let mut keys: Vec<ResultKey> = definition
            .iter_cells()
            .into_iter()
            .filter_map(|cell| {
                let (row, column) = self.cell(cell.row, cell.column).ok()?;
                let calc_config = column.calc_config()?;
                let specification = self.specification(row, column)?;
                Some(ResultKey::new(calc_config, specification.clone()))
            })
            .collect();
        keys.sort();
        keys.dedup();
        keys
    }

    /// Render every cell of a definition from the cache.
    pub fn create_results(
        &self,
        definition: &ViewportDefinition,
        cache: &ResultsCache,
    ) -> (ViewportResults, ViewportState) {
        let cells = definition
            .iter_cells()
            .into_iter()
            .map(|cell| self.render_cell(cell, definition, cache))
            .collect();
        let results = ViewportResults::new(
            cells,
            definition.version,
            cache.last_calculation_duration().as_millis() as u64,
        );
        let state = results.state();
        (results, state)
    }

    fn render_cell(
        &self,
        cell: GridCell,
        definition: &ViewportDefinition,
        cache: &ResultsCache,
    ) -> ResultsCell {
        let Ok((row, column)) = self.cell(cell.row, cell.column) else {
            return ResultsCell::empty(cell, None);
        };
        let from_cache = |cached: CachedResult| {
            ResultsCell::from_cached(
                cell,
                cached,
                column.value_type,
                definition.format,
                definition.enable_logging,
            )
        };

        match &column.renderer {
            CellRenderer::Label => {
                ResultsCell::fixed(cell, Some(Value::Text(row.name.clone())), column.value_type)
            }
            CellRenderer::Static(field) => {
                ResultsCell::fixed(cell, row.field(*field), column.value_type)
            }
            CellRenderer::Blotter(attribute) => {
                let entity = row.security().and_then(|id| cache.get_entity(id));
                let value = entity.as_ref().and_then(|cached| {
                    cached
                        .entity
                        .as_security()
                        .and_then(|security| security.attribute(attribute))
                        .map(|v| Value::Text(v.to_string()))
                });
                ResultsCell {
                    updated: entity.is_some_and(|cached| cached.updated),
                    fixed: false,
                    ..ResultsCell::fixed(cell, value, column.value_type)
                }
            }
            CellRenderer::Value(ValueColumn::Mapped { spec, inline_key }) => {
                let Some(specification) = self.specification(row, column) else {
                    return ResultsCell::empty(cell, column.value_type);
                };
                let cached = cache.get_result(&spec.calc_config, specification, column.value_type);
                match inline_key {
                    Some(key) => from_cache(CachedResult {
                        value: cached.value.and_then(|v| v.inline_value(key)),
                        history: None,
                        ..cached
                    }),
                    None => from_cache(cached),
                }
            }
            CellRenderer::Value(ValueColumn::RowSpecification { calc_config }) => {
                match row.specification() {
                    Some(specification) => {
                        from_cache(cache.get_result(calc_config, specification, column.value_type))
                    }
                    None => ResultsCell::empty(cell, column.value_type),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::PortfolioTargetResolver;
    use crate::grid::definition::DisplayFormat;
    use crate::types::{
        CalcConfigDefinition, CompiledCalcConfig, ComputedValue, LabelledMatrix1D,
        PortfolioNode, PortfolioRequirement, Position, Security, TargetSpecification,
        TerminalOutput, UniqueId, ValueProperties, ValueType, ViewCycleResult, ViewDefinition,
    };
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use std::time::Duration;

    fn position(id: &str) -> Position {
        Position {
            id: UniqueId::of("Pos", id),
            quantity: dec!(10),
            security: Security {
                id: UniqueId::of("Sec", id),
                name: format!("Security {}", id),
                security_type: "SWAP".into(),
                attributes: Default::default(),
            },
            trades: vec![],
        }
    }

    fn pv_spec(id: &str) -> ValueSpecification {
        ValueSpecification::new(
            "PV",
            TargetSpecification::position(UniqueId::of("Pos", id)),
            ValueProperties::new().with("Function", "SwapPV"),
        )
    }

    fn compiled() -> CompiledViewDefinition {
        let outputs = ["A", "B"]
            .iter()
            .map(|id| TerminalOutput {
                specification: pv_spec(id),
                requirements: vec![ValueRequirement::new(
                    "PV",
                    TargetSpecification::position(UniqueId::of("Pos", *id)),
                    ValueProperties::new(),
                )],
            })
            .collect();
        CompiledViewDefinition {
            definition: ViewDefinition {
                name: "Swaps".into(),
                portfolio_id: None,
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
            portfolio: Some(Portfolio {
                id: UniqueId::of("Port", "1"),
                name: "Swaps".into(),
                root: PortfolioNode {
                    id: UniqueId::of("Node", "root"),
                    name: "Root".into(),
                    positions: vec![position("A"), position("B")],
                    children: vec![],
                },
            }),
            calc_configs: vec![CompiledCalcConfig {
                name: "Default".into(),
                terminal_outputs: outputs,
            }],
        }
    }

    fn structure(compiled: &CompiledViewDefinition) -> GridStructure {
        let resolver = PortfolioTargetResolver::new(compiled.portfolio.clone());
        GridStructure::portfolio(&StructureContext {
            compiled,
            mappings: Arc::new(ValueMappings::new(compiled)),
            resolver: &resolver,
            inline_keys: &InlineKeys::new(),
            blotter_attributes: &[],
        })
    }

    #[test]
    fn test_portfolio_structure_shape() {
        let compiled = compiled();
        let structure = structure(&compiled);
        assert_eq!(structure.row_count(), 3);
        assert_eq!(structure.column_count(), 3);
        assert_eq!(structure.kind(), GridKind::Portfolio);
        assert_eq!(structure.root().map(|n| n.end_row()), Some(2));
    }

    #[test]
    fn test_value_specification_for_cell() {
        let compiled = compiled();
        let structure = structure(&compiled);
        assert_eq!(structure.value_specification_for_cell(1, 2).unwrap(), Some(&pv_spec("A")));
        // node row has no mapped PV, label column is never engine-backed
        assert_eq!(structure.value_specification_for_cell(0, 2).unwrap(), None);
        assert_eq!(structure.value_specification_for_cell(1, 0).unwrap(), None);
        assert!(matches!(
            structure.value_specification_for_cell(3, 0),
            Err(ViewError::CellOutOfBounds { row: 3, .. })
        ));
        assert!(structure.value_requirement_for_cell(0, 2).unwrap().is_some());
    }

    #[test]
    fn test_create_results_state_transitions() {
        let compiled = compiled();
        let structure = structure(&compiled);
        let definition = ViewportDefinition::rectangular(1, vec![0, 1, 2], vec![0, 2]);
        let mut cache = ResultsCache::new();

        let (results, state) = structure.create_results(&definition, &cache);
        assert_eq!(state, ViewportState::Empty);
        assert_eq!(results.cells.len(), 6);
        assert_eq!(results.cells[0].value, Some(Value::Text("Root".into())));

        let cycle = ViewCycleResult::new(Utc::now(), Duration::from_millis(25))
            .with_value("Default", ComputedValue::new(pv_spec("A"), Value::Double(1.5)));
        cache.put(&cycle);
        let (results, state) = structure.create_results(&definition, &cache);
        assert_eq!(state, ViewportState::FreshData);
        assert_eq!(results.calculation_duration_ms, 25);
        assert_eq!(results.cells[3].value, Some(Value::Double(1.5)));

        cache.put(&ViewCycleResult::new(Utc::now(), Duration::from_millis(25)));
        let (_, state) = structure.create_results(&definition, &cache);
        assert_eq!(state, ViewportState::StaleData);
    }

    #[test]
    fn test_inline_cells_match_matrix_labels() {
        let compiled = compiled();
        let column_spec = crate::grid::column::ColumnSpecification::new(
            "Default",
            "PV",
            ValueProperties::new(),
        );
        let keys = ["1Y", "5Y", "2Y", "10Y"].map(String::from).to_vec();
        let inline = InlineKeys::from([(column_spec, keys)]);
        let resolver = PortfolioTargetResolver::new(compiled.portfolio.clone());
        let structure = GridStructure::portfolio(&StructureContext {
            compiled: &compiled,
            mappings: Arc::new(ValueMappings::new(&compiled)),
            resolver: &resolver,
            inline_keys: &inline,
            blotter_attributes: &[],
        });
        assert_eq!(structure.column_count(), 6);

        // the two positions carry different tenors
        let matrix = |labels: [&str; 2], values: [f64; 2]| {
            Value::LabelledMatrix1D(LabelledMatrix1D {
                labels: labels.map(String::from).to_vec(),
                values: values.to_vec(),
            })
        };
        let mut cache = ResultsCache::new();
        cache.put(
            &ViewCycleResult::new(Utc::now(), Duration::ZERO)
                .with_value(
                    "Default",
                    ComputedValue::new(pv_spec("A"), matrix(["1Y", "5Y"], [1.0, 2.0])),
                )
                .with_value(
                    "Default",
                    ComputedValue::new(pv_spec("B"), matrix(["2Y", "10Y"], [3.0, 4.0])),
                ),
        );
        let definition = ViewportDefinition::rectangular(1, vec![1, 2], vec![2, 3, 4, 5])
            .with_format(DisplayFormat::History);
        let (results, _) = structure.create_results(&definition, &cache);
        let values: Vec<_> = results.cells.iter().map(|c| c.value.clone()).collect();
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
        assert!(results.cells[1].history.is_none());
    }

    #[test]
    fn test_unvalued_cells_of_declared_type_show_empty_history() {
        let compiled = compiled();
        let structure = structure(&compiled);
        let mut cache = ResultsCache::new();
        let definition = ViewportDefinition::rectangular(1, vec![1, 2], vec![2])
            .with_format(DisplayFormat::History);

        let (results, _) = structure.create_results(&definition, &cache);
        assert_eq!(results.cells[0].history, Some(vec![]));
        assert_eq!(results.cells[0].value_type, Some(ValueType::Double));

        cache.put(
            &ViewCycleResult::new(Utc::now(), Duration::ZERO)
                .with_value("Default", ComputedValue::new(pv_spec("A"), Value::Double(5.0))),
        );
        let (results, _) = structure.create_results(&definition, &cache);
        assert_eq!(results.cells[0].history, Some(vec![Value::Double(5.0)]));
        assert_eq!(results.cells[1].value, None);
        assert_eq!(results.cells[1].history, Some(vec![]));
    }

    #[test]
    fn test_result_keys_cover_engine_cells() {
        let compiled = compiled();
        let structure = structure(&compiled);
        let definition = ViewportDefinition::rectangular(1, vec![0, 1, 2], vec![0, 1, 2]);
        let keys = structure.result_keys(&definition);
        assert_eq!(
            keys,
            vec![
                ResultKey::new("Default", pv_spec("A")),
                ResultKey::new("Default", pv_spec("B"))
            ]
        );
    }

    #[test]
    fn test_with_updated_rows_keeps_columns() {
        let compiled = compiled();
        let structure = structure(&compiled);
        let mut portfolio = compiled.portfolio.clone().unwrap();
        portfolio.root.positions.push(position("C"));
        let updated = structure.with_updated_rows(Some(&portfolio));
        assert_eq!(updated.row_count(), 4);
        assert_eq!(updated.column_count(), structure.column_count());
    }
}

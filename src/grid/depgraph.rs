use super::definition::ViewportDefinition;
use super::listener::ViewportListener;
use super::node::AnalyticsNode;
use super::row::Row;
use super::structure::GridStructure;
use super::viewport::Viewport;
use super::viewports::GridViewports;
use crate::engine::{EngineSession, TargetResolver};
use crate::error::ViewError;
use crate::services::results_cache::ResultsCache;
use crate::types::{DependencyGraph, DependencyNode, ValueSpecification};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Drill-down grid showing the calculations behind one cell of a main grid.
///
/// Values for its rows are not terminal outputs, so it keeps its own cache
/// filled from the engine's computation cache on every cycle.
#[derive(Debug)]
pub struct DependencyGraphGrid {
    callback_id: String,
    calc_config: String,
    structure: Arc<GridStructure>,
    specifications: Vec<ValueSpecification>,
    cache: ResultsCache,
    viewports: GridViewports,
}

impl DependencyGraphGrid {
    pub fn new(
        callback_id: String,
        graph: &DependencyGraph,
        resolver: &dyn TargetResolver,
        max_viewports: usize,
    ) -> Self {
        let (rows, root) = flatten_graph(graph, resolver);
        let specifications = rows
            .iter()
            .filter_map(Row::specification)
            .cloned()
            .collect();
        let structure = GridStructure::dependency_graph(&graph.calc_config, rows, Some(root));
        Self {
            callback_id,
            calc_config: graph.calc_config.clone(),
            structure: Arc::new(structure),
            specifications,
            cache: ResultsCache::new(),
            viewports: GridViewports::new(max_viewports),
        }
    }

    pub fn callback_id(&self) -> &str {
        &self.callback_id
    }

    pub fn calc_config(&self) -> &str {
        &self.calc_config
    }

    pub fn structure(&self) -> &Arc<GridStructure> {
        &self.structure
    }

    pub fn cache(&self) -> &ResultsCache {
        &self.cache
    }

    /// Pull the graph's values from the engine and refresh its viewports.
    pub fn update_results(&mut self, engine: &dyn EngineSession) -> Result<Vec<String>, ViewError> {
        let started = Instant::now();
        let values = engine.query_computation_cache(&self.calc_config, &self.specifications)?;
        self.cache
            .put_calc_config(&self.calc_config, &values, started.elapsed());
        debug!(
            callback_id = %self.callback_id,
            values = values.len(),
            "Dependency graph values refreshed"
        );
        Ok(self.viewports.refresh(&self.cache))
    }

    pub fn create_viewport(
        &mut self,
        viewport_id: i32,
        callback_id: String,
        definition: ViewportDefinition,
        listener: &mut dyn ViewportListener,
    ) -> Result<Option<String>, ViewError> {
        self.viewports.create(
            viewport_id,
            callback_id,
            definition,
            self.structure.clone(),
            &self.cache,
            listener,
        )
    }

    pub fn update_viewport(
        &mut self,
        viewport_id: i32,
        definition: ViewportDefinition,
        listener: &mut dyn ViewportListener,
    ) -> Result<Option<String>, ViewError> {
        self.viewports
            .update(viewport_id, definition, &self.cache, listener)
    }

    pub fn delete_viewport(
        &mut self,
        viewport_id: i32,
        listener: &mut dyn ViewportListener,
    ) -> Result<(), ViewError> {
        self.viewports.delete(viewport_id, listener)
    }

    pub fn viewport(&self, viewport_id: i32) -> Result<&Viewport, ViewError> {
        self.viewports.get(viewport_id)
    }

    /// Tear down every viewport before the grid is dropped.
    pub fn close(&mut self, listener: &mut dyn ViewportListener) {
        self.viewports.clear(listener);
    }
}

/// Rows of a dependency graph, depth-first from the root output, plus the
/// node tree over them.
///
/// Inputs get a row only if the step producing them has inputs of its own.
pub fn flatten_graph(
    graph: &DependencyGraph,
    resolver: &dyn TargetResolver,
) -> (Vec<Row>, AnalyticsNode) {
    let producers = graph.producers();
    let mut rows = Vec::new();
    let mut path = Vec::new();
    let children = visit(&graph.root, &producers, resolver, &mut rows, &mut path);
    let root = AnalyticsNode::new(0, rows.len() - 1, children);
    (rows, root)
}

fn visit<'a>(
    specification: &'a ValueSpecification,
    producers: &HashMap<&'a ValueSpecification, &'a DependencyNode>,
    resolver: &dyn TargetResolver,
    rows: &mut Vec<Row>,
    path: &mut Vec<&'a ValueSpecification>,
) -> Vec<AnalyticsNode> {
    let producer = producers.get(specification).copied();
    let function_name = producer
        .map(|node| node.function_name.clone())
        .or_else(|| specification.function_id().map(str::to_string))
        .unwrap_or_default();
    rows.push(Row::calculation(
        specification.clone(),
        function_name,
        resolver.name_of(&specification.target),
    ));

    let Some(producer) = producer else {
        return Vec::new();
    };
    path.push(specification);
    let mut children = Vec::new();
    for input in &producer.inputs {
        // cycles in a malformed graph
        if path.contains(&input) {
            continue;
        }
        let has_inputs = producers
            .get(input)
            .is_some_and(|node| !node.inputs.is_empty());
        if !has_inputs {
            continue;
        }
        let start_row = rows.len();
        let grandchildren = visit(input, producers, resolver, rows, path);
        if rows.len() - 1 > start_row {
            children.push(AnalyticsNode::new(start_row, rows.len() - 1, grandchildren));
        }
    }
    path.pop();
    children
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::PortfolioTargetResolver;
    use crate::types::{TargetSpecification, UniqueId, ValueProperties};

    fn spec(name: &str) -> ValueSpecification {
        ValueSpecification::new(
            name,
            TargetSpecification::position(UniqueId::of("Pos", "1")),
            ValueProperties::new(),
        )
    }

    fn node(name: &str, inputs: &[&str]) -> DependencyNode {
        DependencyNode {
            function_name: format!("{}Function", name),
            target: spec(name).target,
            outputs: vec![spec(name)],
            inputs: inputs.iter().map(|i| spec(i)).collect(),
        }
    }

    #[test]
    fn test_flatten_skips_leaf_inputs() {
        // PV <- (Curve <- MarketData), Spot (leaf), MarketData (leaf)
        let graph = DependencyGraph {
            calc_config: "Default".into(),
            root: spec("PV"),
            nodes: vec![
                node("PV", &["Curve", "Spot"]),
                node("Curve", &["MarketData"]),
                node("Spot", &[]),
                node("MarketData", &[]),
            ],
        };
        let (rows, root) = flatten_graph(&graph, &PortfolioTargetResolver::default());
        let names: Vec<_> = rows
            .iter()
            .map(|r| r.specification().unwrap().value_name.as_str())
            .collect();
        assert_eq!(names, vec!["PV", "Curve"]);
        assert_eq!((root.start_row(), root.end_row()), (0, 1));
        // Curve has no rows beneath it so it is not a node
        assert!(root.children().is_empty());
    }

    #[test]
    fn test_flatten_nests_intermediate_steps() {
        let graph = DependencyGraph {
            calc_config: "Default".into(),
            root: spec("PV"),
            nodes: vec![
                node("PV", &["Curve"]),
                node("Curve", &["Bootstrap"]),
                node("Bootstrap", &["Quotes"]),
                node("Quotes", &[]),
            ],
        };
        let (rows, root) = flatten_graph(&graph, &PortfolioTargetResolver::default());
        assert_eq!(rows.len(), 3);
        assert_eq!(root.end_row(), 2);
        assert_eq!(root.children().len(), 1);
        let curve = &root.children()[0];
        assert_eq!((curve.start_row(), curve.end_row()), (1, 2));
        assert_eq!(
            rows[1].field(crate::grid::column::RowField::FunctionName),
            Some(crate::types::Value::Text("CurveFunction".into()))
        );
    }

    #[test]
    fn test_flatten_tolerates_cycles() {
        let graph = DependencyGraph {
            calc_config: "Default".into(),
            root: spec("A"),
            nodes: vec![node("A", &["B"]), node("B", &["A"])],
        };
        let (rows, _) = flatten_graph(&graph, &PortfolioTargetResolver::default());
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_root_without_producer() {
        let graph = DependencyGraph {
            calc_config: "Default".into(),
            root: spec("PV"),
            nodes: vec![],
        };
        let (rows, root) = flatten_graph(&graph, &PortfolioTargetResolver::default());
        assert_eq!(rows.len(), 1);
        assert_eq!((root.start_row(), root.end_row()), (0, 0));
    }
}

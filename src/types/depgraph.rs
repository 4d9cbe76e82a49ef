use super::{TargetSpecification, ValueSpecification};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One calculation step in the engine's dependency graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyNode {
    pub function_name: String,
    pub target: TargetSpecification,
    pub outputs: Vec<ValueSpecification>,
    #[serde(default)]
    pub inputs: Vec<ValueSpecification>,
}

/// The engine's record of which calculations produced one output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyGraph {
    pub calc_config: String,
    pub root: ValueSpecification,
    pub nodes: Vec<DependencyNode>,
}

impl DependencyGraph {
    /// Index from each output specification to the node producing it.
    pub fn producers(&self) -> HashMap<&ValueSpecification, &DependencyNode> {
        self.nodes
            .iter()
            .flat_map(|node| node.outputs.iter().map(move |output| (output, node)))
            .collect()
    }

    /// Every specification that appears in the graph, as an output or an input.
    pub fn specifications(&self) -> Vec<&ValueSpecification> {
        let mut specs: Vec<&ValueSpecification> = self
            .nodes
            .iter()
            .flat_map(|node| node.outputs.iter().chain(node.inputs.iter()))
            .collect();
        specs.sort();
        specs.dedup();
        specs
    }
}

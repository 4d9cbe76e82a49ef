use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Names from the portfolio root down to a node. Stable across
/// recompilations as long as the portfolio shape is unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodePath(Vec<String>);

impl NodePath {
    pub fn root(name: impl Into<String>) -> Self {
        Self(vec![name.into()])
    }

    pub fn child(&self, name: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(name.into());
        Self(segments)
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("/"))
    }
}

/// A node in the row tree: the inclusive row range it spans plus its child
/// nodes. Rows inside the range not claimed by a child belong to this node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsNode {
    start_row: usize,
    end_row: usize,
    children: Vec<AnalyticsNode>,
    /// A position broken down into its trades rather than a portfolio node.
    fungible_position: bool,
}

impl AnalyticsNode {
    pub fn new(start_row: usize, end_row: usize, children: Vec<AnalyticsNode>) -> Self {
        Self {
            start_row,
            end_row,
            children,
            fungible_position: false,
        }
    }

    pub fn fungible_position(start_row: usize, end_row: usize) -> Self {
        Self {
            start_row,
            end_row,
            children: Vec::new(),
            fungible_position: true,
        }
    }

    pub fn start_row(&self) -> usize {
        self.start_row
    }

    pub fn end_row(&self) -> usize {
        self.end_row
    }

    pub fn children(&self) -> &[AnalyticsNode] {
        &self.children
    }

    pub fn is_fungible_position(&self) -> bool {
        self.fungible_position
    }

    pub fn contains(&self, row: usize) -> bool {
        row >= self.start_row && row <= self.end_row
    }

    /// The node whose own row is `row`, searching this subtree.
    pub fn find_node(&self, row: usize) -> Option<&AnalyticsNode> {
        if self.start_row == row {
            return Some(self);
        }
        self.children
            .iter()
            .find(|child| child.contains(row))
            .and_then(|child| child.find_node(row))
    }
}

/// One node of the tree as sent to a client, with its expansion state.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewportNode {
    pub start_row: usize,
    pub end_row: usize,
    pub expanded: bool,
    pub children: Vec<ViewportNode>,
}

/// Row tree of a grid annotated with a viewport's collapsed nodes.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ViewportNodeStructure {
    root: Option<ViewportNode>,
}

impl ViewportNodeStructure {
    pub fn new(
        root: Option<&AnalyticsNode>,
        paths: &HashMap<usize, NodePath>,
        collapsed: &HashSet<NodePath>,
    ) -> Self {
        Self {
            root: root.map(|node| Self::annotate(node, paths, collapsed)),
        }
    }

    fn annotate(
        node: &AnalyticsNode,
        paths: &HashMap<usize, NodePath>,
        collapsed: &HashSet<NodePath>,
    ) -> ViewportNode {
        let expanded = paths
            .get(&node.start_row)
            .map_or(true, |path| !collapsed.contains(path));
        ViewportNode {
            start_row: node.start_row,
            end_row: node.end_row,
            expanded,
            children: node
                .children
                .iter()
                .map(|child| Self::annotate(child, paths, collapsed))
                .collect(),
        }
    }

    pub fn root(&self) -> Option<&ViewportNode> {
        self.root.as_ref()
    }
}

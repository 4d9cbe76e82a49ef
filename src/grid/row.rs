use super::column::RowField;
use super::node::{AnalyticsNode, NodePath};
use crate::engine::TargetResolver;
use crate::types::{
    CompiledViewDefinition, ObjectId, Portfolio, PortfolioNode, Position, TargetSpecification,
    TargetType, Trade, Value, ValueSpecification,
};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RowKind {
    Node,
    Position {
        quantity: Decimal,
        security: ObjectId,
    },
    Trade {
        quantity: Decimal,
        security: ObjectId,
    },
    Primitive,
    /// One step of a dependency graph.
    #[serde(rename_all = "camelCase")]
    Calculation {
        specification: ValueSpecification,
        function_name: String,
    },
}

/// A grid row: the target it shows values for and how it is labelled.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Row {
    pub target: TargetSpecification,
    pub name: String,
    #[serde(flatten)]
    pub kind: RowKind,
}

impl Row {
    pub fn node(node: &PortfolioNode) -> Self {
        Self {
            target: TargetSpecification::node(node.id.clone()),
            name: node.name.clone(),
            kind: RowKind::Node,
        }
    }

    pub fn position(position: &Position) -> Self {
        Self {
            target: TargetSpecification::position(position.id.clone()),
            name: position.security.name.clone(),
            kind: RowKind::Position {
                quantity: position.quantity,
                security: position.security.id.object_id(),
            },
        }
    }

    pub fn trade(trade: &Trade, position: &Position) -> Self {
        Self {
            target: TargetSpecification::trade(trade.id.clone()),
            name: trade.display_name(),
            kind: RowKind::Trade {
                quantity: trade.quantity,
                security: position.security.id.object_id(),
            },
        }
    }

    pub fn primitive(target: TargetSpecification, name: String) -> Self {
        Self {
            target,
            name,
            kind: RowKind::Primitive,
        }
    }

    pub fn calculation(
        specification: ValueSpecification,
        function_name: String,
        name: String,
    ) -> Self {
        Self {
            target: specification.target.clone(),
            name,
            kind: RowKind::Calculation {
                specification,
                function_name,
            },
        }
    }

    /// Security shown on this row, if any.
    pub fn security(&self) -> Option<&ObjectId> {
        match &self.kind {
            RowKind::Position { security, .. } | RowKind::Trade { security, .. } => Some(security),
            _ => None,
        }
    }

    /// Specification a dependency graph row describes.
    pub fn specification(&self) -> Option<&ValueSpecification> {
        match &self.kind {
            RowKind::Calculation { specification, .. } => Some(specification),
            _ => None,
        }
    }

    pub fn field(&self, field: RowField) -> Option<Value> {
        match (field, &self.kind) {
            (RowField::Quantity, RowKind::Position { quantity, .. })
            | (RowField::Quantity, RowKind::Trade { quantity, .. }) => {
                Some(Value::Decimal(*quantity))
            }
            (RowField::Quantity, _) => None,
            (RowField::TargetName, _) => Some(Value::Text(self.name.clone())),
            (RowField::TargetType, _) => {
                Some(Value::Text(self.target.target_type.abbreviation().to_string()))
            }
            (RowField::ValueName, RowKind::Calculation { specification, .. }) => {
                Some(Value::Text(specification.value_name.clone()))
            }
            (RowField::FunctionName, RowKind::Calculation { function_name, .. }) => {
                Some(Value::Text(function_name.clone()))
            }
            (RowField::Properties, RowKind::Calculation { specification, .. }) => {
                Some(Value::Text(specification.properties.to_string()))
            }
            _ => None,
        }
    }
}

/// Rows of a portfolio in display order, with the node tree over them and
/// the path of every node keyed by its row.
#[derive(Debug, Clone, Default)]
pub struct PortfolioRows {
    pub rows: Vec<Row>,
    pub root: Option<AnalyticsNode>,
    pub paths: HashMap<usize, NodePath>,
}

impl PortfolioRows {
    /// Flatten a portfolio depth-first: each node's own row, then its
    /// positions (trades beneath a position holding several), then its
    /// child nodes.
    pub fn build(portfolio: Option<&Portfolio>) -> Self {
        let mut rows = Self::default();
        if let Some(portfolio) = portfolio {
            let root_path = NodePath::root(portfolio.root.name.clone());
            let root = rows.flatten(&portfolio.root, root_path);
            rows.root = Some(root);
        }
        rows
    }

    fn flatten(&mut self, node: &PortfolioNode, path: NodePath) -> AnalyticsNode {
        let start_row = self.rows.len();
        self.rows.push(Row::node(node));
        let mut children = Vec::new();

        for position in &node.positions {
            let position_row = self.rows.len();
            self.rows.push(Row::position(position));
            if position.trades.len() > 1 {
                for trade in &position.trades {
                    self.rows.push(Row::trade(trade, position));
                }
                self.paths.insert(
                    position_row,
                    path.child(position.id.object_id().to_string()),
                );
                children.push(AnalyticsNode::fungible_position(
                    position_row,
                    self.rows.len() - 1,
                ));
            }
        }
        for child in &node.children {
            let child_path = path.child(child.name.clone());
            children.push(self.flatten(child, child_path));
        }

        self.paths.insert(start_row, path);
        AnalyticsNode::new(start_row, self.rows.len() - 1, children)
    }
}

/// One row per distinct primitive target among the specific requirements.
pub fn primitive_rows(
    compiled: &CompiledViewDefinition,
    resolver: &dyn TargetResolver,
) -> Vec<Row> {
    let mut targets: Vec<&TargetSpecification> = Vec::new();
    for calc_config in &compiled.definition.calculation_configurations {
        for requirement in &calc_config.specific_requirements {
            if requirement.target.target_type == TargetType::Primitive
                && !targets.contains(&&requirement.target)
            {
                targets.push(&requirement.target);
            }
        }
    }
    targets
        .into_iter()
        .map(|target| Row::primitive(target.clone(), resolver.name_of(target)))
        .collect()
}

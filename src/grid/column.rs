use crate::types::{
    CalcConfigDefinition, CompiledViewDefinition, TargetSpecification, TargetType,
    ValueProperties, ValueRequirement, ValueType,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Inline display keys discovered per analytics column.
pub type InlineKeys = HashMap<ColumnSpecification, Vec<String>>;

/// Template for the requirement behind an analytics column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnSpecification {
    pub calc_config: String,
    pub value_name: String,
    #[serde(default)]
    pub constraints: ValueProperties,
}

impl ColumnSpecification {
    pub fn new(
        calc_config: impl Into<String>,
        value_name: impl Into<String>,
        constraints: ValueProperties,
    ) -> Self {
        Self {
            calc_config: calc_config.into(),
            value_name: value_name.into(),
            constraints,
        }
    }

    /// The requirement this column makes of a row's target.
    pub fn requirement_for(&self, target: &TargetSpecification) -> ValueRequirement {
        ValueRequirement::new(self.value_name.clone(), target.clone(), self.constraints.clone())
    }

    fn description(&self) -> String {
        if self.constraints.is_empty() {
            format!("{} ({})", self.value_name, self.calc_config)
        } else {
            format!("{} ({}) [{}]", self.value_name, self.calc_config, self.constraints)
        }
    }
}

/// Row attribute rendered by a static column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowField {
    Quantity,
    TargetName,
    TargetType,
    ValueName,
    FunctionName,
    Properties,
}

/// Where an engine-backed column gets its value specification.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum ValueColumn {
    /// Resolve the column's requirement against the row target.
    Mapped {
        spec: ColumnSpecification,
        /// Label (or vector position) of the element shown by an inline column.
        #[serde(skip_serializing_if = "Option::is_none")]
        inline_key: Option<String>,
    },
    /// Use the specification the row itself describes.
    RowSpecification { calc_config: String },
}

/// How the cells of a column are produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "config", rename_all = "snake_case")]
pub enum CellRenderer {
    Label,
    Static(RowField),
    Value(ValueColumn),
    /// Attribute of the row's security, read from the entity cache.
    Blotter(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridColumn {
    pub header: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_type: Option<ValueType>,
    pub renderer: CellRenderer,
}

impl GridColumn {
    pub fn label(header: &str) -> Self {
        Self {
            header: header.to_string(),
            description: header.to_string(),
            value_type: Some(ValueType::Text),
            renderer: CellRenderer::Label,
        }
    }

    pub fn fixed(header: &str, field: RowField, value_type: ValueType) -> Self {
        Self {
            header: header.to_string(),
            description: header.to_string(),
            value_type: Some(value_type),
            renderer: CellRenderer::Static(field),
        }
    }

    pub fn blotter(attribute: &str) -> Self {
        Self {
            header: attribute.to_string(),
            description: format!("Security attribute {}", attribute),
            value_type: Some(ValueType::Text),
            renderer: CellRenderer::Blotter(attribute.to_string()),
        }
    }

    /// An engine-backed column. `declared` is the type the definition gives
    /// the value; inline columns always show doubles.
    pub fn analytics(
        spec: ColumnSpecification,
        declared: Option<ValueType>,
        inline_key: Option<&str>,
    ) -> Self {
        let (header, value_type) = match inline_key {
            Some(key) => (format!("{} / {}", spec.value_name, key), Some(ValueType::Double)),
            None => (spec.value_name.clone(), declared),
        };
        Self {
            header,
            description: spec.description(),
            value_type,
            renderer: CellRenderer::Value(ValueColumn::Mapped {
                spec,
                inline_key: inline_key.map(str::to_string),
            }),
        }
    }

    /// Calculation configuration of an engine-backed column.
    pub fn calc_config(&self) -> Option<&str> {
        match &self.renderer {
            CellRenderer::Value(ValueColumn::Mapped { spec, .. }) => Some(&spec.calc_config),
            CellRenderer::Value(ValueColumn::RowSpecification { calc_config }) => {
                Some(calc_config)
            }
            _ => None,
        }
    }

    pub fn is_engine_backed(&self) -> bool {
        matches!(self.renderer, CellRenderer::Value(_))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridColumnGroup {
    pub name: String,
    pub fixed: bool,
    pub columns: Vec<GridColumn>,
}

impl GridColumnGroup {
    pub fn new(name: impl Into<String>, fixed: bool, columns: Vec<GridColumn>) -> Self {
        Self {
            name: name.into(),
            fixed,
            columns,
        }
    }
}

/// Ordered column groups; fixed groups always precede the others.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct GridColumnGroups {
    groups: Vec<GridColumnGroup>,
}

impl GridColumnGroups {
    pub fn new(groups: Vec<GridColumnGroup>) -> Self {
        let (mut fixed, others): (Vec<_>, Vec<_>) = groups.into_iter().partition(|g| g.fixed);
        fixed.extend(others);
        Self { groups: fixed }
    }

    pub fn groups(&self) -> &[GridColumnGroup] {
        &self.groups
    }

    pub fn column(&self, index: usize) -> Option<&GridColumn> {
        self.iter().nth(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &GridColumn> {
        self.groups.iter().flat_map(|g| g.columns.iter())
    }

    pub fn column_count(&self) -> usize {
        self.groups.iter().map(|g| g.columns.len()).sum()
    }

    pub fn fixed_column_count(&self) -> usize {
        self.groups
            .iter()
            .filter(|g| g.fixed)
            .map(|g| g.columns.len())
            .sum()
    }
}

/// Analytics columns, one group per calculation configuration, expanding
/// inline columns where keys are known.
fn analytics_groups<'a>(
    specs_per_config: impl Iterator<Item = (&'a CalcConfigDefinition, Vec<ColumnSpecification>)>,
    inline_keys: &InlineKeys,
) -> Vec<GridColumnGroup> {
    specs_per_config
        .filter(|(_, specs)| !specs.is_empty())
        .map(|(calc_config, specs)| {
            let mut columns = Vec::new();
            for spec in specs {
                let declared = calc_config.value_type(&spec.value_name);
                match inline_keys.get(&spec).filter(|keys| !keys.is_empty()) {
                    Some(keys) => {
                        for key in keys {
                            columns.push(GridColumn::analytics(spec.clone(), declared, Some(key)));
                        }
                    }
                    None => columns.push(GridColumn::analytics(spec, declared, None)),
                }
            }
            GridColumnGroup::new(calc_config.name.clone(), false, columns)
        })
        .collect()
}

fn push_distinct(specs: &mut Vec<ColumnSpecification>, spec: ColumnSpecification) {
    if !specs.contains(&spec) {
        specs.push(spec);
    }
}

/// Columns of the portfolio grid.
pub fn portfolio_columns(
    compiled: &CompiledViewDefinition,
    blotter_attributes: &[String],
    inline_keys: &InlineKeys,
) -> GridColumnGroups {
    let mut groups = vec![GridColumnGroup::new(
        "fixed",
        true,
        vec![
            GridColumn::label("Label"),
            GridColumn::fixed("Quantity", RowField::Quantity, ValueType::Decimal),
        ],
    )];
    if !blotter_attributes.is_empty() {
        let columns = blotter_attributes.iter().map(|a| GridColumn::blotter(a)).collect();
        groups.push(GridColumnGroup::new("Attributes", false, columns));
    }
    let specs = compiled
        .definition
        .calculation_configurations
        .iter()
        .map(|calc_config| {
            let mut specs = Vec::new();
            for requirement in &calc_config.portfolio_requirements {
                push_distinct(
                    &mut specs,
                    ColumnSpecification::new(
                        calc_config.name.clone(),
                        requirement.value_name.clone(),
                        requirement.constraints.clone(),
                    ),
                );
            }
            (calc_config, specs)
        });
    groups.extend(analytics_groups(specs, inline_keys));
    GridColumnGroups::new(groups)
}

/// Columns of the primitives grid.
pub fn primitives_columns(
    compiled: &CompiledViewDefinition,
    inline_keys: &InlineKeys,
) -> GridColumnGroups {
    let mut groups = vec![GridColumnGroup::new(
        "fixed",
        true,
        vec![GridColumn::label("Label")],
    )];
    let specs = compiled
        .definition
        .calculation_configurations
        .iter()
        .map(|calc_config| {
            let mut specs = Vec::new();
            for requirement in &calc_config.specific_requirements {
                if requirement.target.target_type == TargetType::Primitive {
                    push_distinct(
                        &mut specs,
                        ColumnSpecification::new(
                            calc_config.name.clone(),
                            requirement.value_name.clone(),
                            requirement.constraints.clone(),
                        ),
                    );
                }
            }
            (calc_config, specs)
        });
    groups.extend(analytics_groups(specs, inline_keys));
    GridColumnGroups::new(groups)
}

/// Fixed columns of a dependency graph grid.
pub fn dependency_graph_columns(calc_config: &str) -> GridColumnGroups {
    let columns = vec![
        GridColumn::fixed("Target", RowField::TargetName, ValueType::Text),
        GridColumn::fixed("Type", RowField::TargetType, ValueType::Text),
        GridColumn::fixed("Value Name", RowField::ValueName, ValueType::Text),
        GridColumn {
            header: "Value".to_string(),
            description: format!("Calculated value ({})", calc_config),
            value_type: None,
            renderer: CellRenderer::Value(ValueColumn::RowSpecification {
                calc_config: calc_config.to_string(),
            }),
        },
        GridColumn::fixed("Function", RowField::FunctionName, ValueType::Text),
        GridColumn::fixed("Properties", RowField::Properties, ValueType::Text),
    ];
    GridColumnGroups::new(vec![
        GridColumnGroup::new("fixed", true, columns[..1].to_vec()),
        GridColumnGroup::new("Dependencies", false, columns[1..].to_vec()),
    ])
}

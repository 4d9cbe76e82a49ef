use super::{
    Portfolio, UniqueId, ValueProperties, ValueRequirement, ValueSpecification, ValueType,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A value requested for every position of a given security type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioRequirement {
    pub security_type: String,
    pub value_name: String,
    #[serde(default)]
    pub constraints: ValueProperties,
}

/// A named set of outputs within a view definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalcConfigDefinition {
    pub name: String,
    #[serde(default)]
    pub portfolio_requirements: Vec<PortfolioRequirement>,
    /// Requirements on explicit targets, e.g. curves or other primitives.
    #[serde(default)]
    pub specific_requirements: Vec<ValueRequirement>,
    /// Declared result type per value name. Columns without one render
    /// unvalued cells without a type.
    #[serde(default)]
    pub value_types: BTreeMap<String, ValueType>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewDefinition {
    pub name: String,
    #[serde(default)]
    pub portfolio_id: Option<UniqueId>,
    #[serde(default)]
    pub calculation_configurations: Vec<CalcConfigDefinition>,
}

/// One terminal output and the requirements it satisfies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminalOutput {
    pub specification: ValueSpecification,
    pub requirements: Vec<ValueRequirement>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledCalcConfig {
    pub name: String,
    #[serde(default)]
    pub terminal_outputs: Vec<TerminalOutput>,
}

/// A view definition as compiled by the engine against a portfolio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledViewDefinition {
    pub definition: ViewDefinition,
    #[serde(default)]
    pub portfolio: Option<Portfolio>,
    #[serde(default)]
    pub calc_configs: Vec<CompiledCalcConfig>,
}

impl CalcConfigDefinition {
    pub fn value_type(&self, value_name: &str) -> Option<ValueType> {
        self.value_types.get(value_name).copied()
    }
}

impl CompiledViewDefinition {
    pub fn calc_config(&self, name: &str) -> Option<&CompiledCalcConfig> {
        self.calc_configs.iter().find(|c| c.name == name)
    }
}

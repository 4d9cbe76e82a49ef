use super::TargetSpecification;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Property name under which the engine records the producing function.
pub const FUNCTION_PROPERTY: &str = "Function";

/// Ordered name/value properties of a requirement or specification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValueProperties(BTreeMap<String, String>);

impl ValueProperties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.0.iter()
    }
}

impl fmt::Display for ValueProperties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (name, value) in &self.0 {
            if !first {
                f.write_str(", ")?;
            }
            write!(f, "{}={}", name, value)?;
            first = false;
        }
        Ok(())
    }
}

/// An unresolved request for a value on a target.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueRequirement {
    pub value_name: String,
    pub target: TargetSpecification,
    #[serde(default)]
    pub constraints: ValueProperties,
}

impl ValueRequirement {
    pub fn new(
        value_name: impl Into<String>,
        target: TargetSpecification,
        constraints: ValueProperties,
    ) -> Self {
        Self {
            value_name: value_name.into(),
            target,
            constraints,
        }
    }

    /// The same requirement against the unversioned target.
    pub fn without_version(&self) -> ValueRequirement {
        Self {
            value_name: self.value_name.clone(),
            target: self.target.without_version(),
            constraints: self.constraints.clone(),
        }
    }
}

/// The engine's concrete identifier of one computed output.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueSpecification {
    pub value_name: String,
    pub target: TargetSpecification,
    #[serde(default)]
    pub properties: ValueProperties,
}

impl ValueSpecification {
    pub fn new(
        value_name: impl Into<String>,
        target: TargetSpecification,
        properties: ValueProperties,
    ) -> Self {
        Self {
            value_name: value_name.into(),
            target,
            properties,
        }
    }

    /// Identifier of the function that produced the value, if recorded.
    pub fn function_id(&self) -> Option<&str> {
        self.properties.get(FUNCTION_PROPERTY)
    }
}

impl fmt::Display for ValueSpecification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} on {} [{}]", self.value_name, self.target, self.properties)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::UniqueId;

    #[test]
    fn test_properties_display_is_ordered() {
        let props = ValueProperties::new()
            .with("Currency", "USD")
            .with("CalculationMethod", "Discounting");
        assert_eq!(props.to_string(), "CalculationMethod=Discounting, Currency=USD");
    }

    #[test]
    fn test_function_id() {
        let spec = ValueSpecification::new(
            "PV",
            TargetSpecification::position(UniqueId::of("P", "1")),
            ValueProperties::new().with(FUNCTION_PROPERTY, "SwapPV"),
        );
        assert_eq!(spec.function_id(), Some("SwapPV"));
    }

    #[test]
    fn test_requirement_without_version() {
        let req = ValueRequirement::new(
            "PV",
            TargetSpecification::position(UniqueId::versioned("P", "1", "4")),
            ValueProperties::new(),
        );
        assert_eq!(req.without_version().target.id.version, None);
    }
}

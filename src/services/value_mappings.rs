use crate::types::{CompiledViewDefinition, ValueRequirement, ValueSpecification};
use std::collections::HashMap;

/// Lookup from a (value requirement, calculation configuration) pair to the
/// specification the compiled view produced for it.
///
/// Built once per compilation. The versioned variant strips target versions
/// so cell bindings survive re-versioning of the same logical position.
#[derive(Debug, Default)]
pub struct ValueMappings {
    specifications: HashMap<(ValueRequirement, String), ValueSpecification>,
    requirements: HashMap<(ValueSpecification, String), Vec<ValueRequirement>>,
    versioned: bool,
}

impl ValueMappings {
    pub fn new(compiled: &CompiledViewDefinition) -> Self {
        Self::build(compiled, false)
    }

    /// Mappings that ignore the version component of requirement targets.
    pub fn versioned(compiled: &CompiledViewDefinition) -> Self {
        Self::build(compiled, true)
    }

    pub fn empty() -> Self {
        Self::default()
    }

    fn build(compiled: &CompiledViewDefinition, versioned: bool) -> Self {
        let mut mappings = Self {
            versioned,
            ..Self::default()
        };
        for calc_config in &compiled.calc_configs {
            for output in &calc_config.terminal_outputs {
                for requirement in &output.requirements {
                    let requirement = mappings.normalize(requirement);
                    mappings.specifications.insert(
                        (requirement.clone(), calc_config.name.clone()),
                        output.specification.clone(),
                    );
                    mappings
                        .requirements
                        .entry((output.specification.clone(), calc_config.name.clone()))
                        .or_default()
                        .push(requirement);
                }
            }
        }
        mappings
    }

    fn normalize(&self, requirement: &ValueRequirement) -> ValueRequirement {
        if self.versioned {
            requirement.without_version()
        } else {
            requirement.clone()
        }
    }

    /// The specification satisfying `requirement`, or `None` if it was not part
    /// of this compilation.
    pub fn get_value_specification(
        &self,
        calc_config: &str,
        requirement: &ValueRequirement,
    ) -> Option<&ValueSpecification> {
        let key = (self.normalize(requirement), calc_config.to_string());
        self.specifications.get(&key)
    }

    /// Requirements a produced specification satisfies.
    pub fn get_requirements(
        &self,
        calc_config: &str,
        specification: &ValueSpecification,
    ) -> &[ValueRequirement] {
        self.requirements
            .get(&(specification.clone(), calc_config.to_string()))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn is_versioned(&self) -> bool {
        self.versioned
    }

    pub fn len(&self) -> usize {
        self.specifications.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specifications.is_empty()
    }
}

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of an object independent of its version.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId {
    pub scheme: String,
    pub value: String,
}

impl ObjectId {
    pub fn of(scheme: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}~{}", self.scheme, self.value)
    }
}

/// Versioned identifier of a portfolio entity or computation target.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UniqueId {
    pub scheme: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl UniqueId {
    /// Create an unversioned id.
    pub fn of(scheme: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
            value: value.into(),
            version: None,
        }
    }

    /// Create a versioned id.
    pub fn versioned(
        scheme: impl Into<String>,
        value: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            scheme: scheme.into(),
            value: value.into(),
            version: Some(version.into()),
        }
    }

    pub fn object_id(&self) -> ObjectId {
        ObjectId::of(self.scheme.clone(), self.value.clone())
    }

    /// The same id with the version component removed.
    pub fn without_version(&self) -> UniqueId {
        UniqueId::of(self.scheme.clone(), self.value.clone())
    }
}

impl fmt::Display for UniqueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(version) => write!(f, "{}~{}~{}", self.scheme, self.value, version),
            None => write!(f, "{}~{}", self.scheme, self.value),
        }
    }
}

/// Kind of object a computation target refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetType {
    PortfolioNode,
    Position,
    Trade,
    Security,
    Primitive,
}

impl TargetType {
    /// Short display form used in dependency graph grids.
    pub fn abbreviation(&self) -> &'static str {
        match self {
            TargetType::PortfolioNode => "NODE",
            TargetType::Position => "POS",
            TargetType::Trade => "TRADE",
            TargetType::Security => "SEC",
            TargetType::Primitive => "PRIM",
        }
    }
}

/// Reference to the object a value is calculated for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetSpecification {
    pub target_type: TargetType,
    pub id: UniqueId,
}

impl TargetSpecification {
    pub fn new(target_type: TargetType, id: UniqueId) -> Self {
        Self { target_type, id }
    }

    pub fn node(id: UniqueId) -> Self {
        Self::new(TargetType::PortfolioNode, id)
    }

    pub fn position(id: UniqueId) -> Self {
        Self::new(TargetType::Position, id)
    }

    pub fn trade(id: UniqueId) -> Self {
        Self::new(TargetType::Trade, id)
    }

    pub fn primitive(id: UniqueId) -> Self {
        Self::new(TargetType::Primitive, id)
    }

    /// The same target with any portfolio version/correction stripped.
    pub fn without_version(&self) -> TargetSpecification {
        Self::new(self.target_type, self.id.without_version())
    }
}

impl fmt::Display for TargetSpecification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.target_type.abbreviation(), self.id)
    }
}

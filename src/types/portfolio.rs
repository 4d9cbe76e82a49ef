use super::{ObjectId, UniqueId};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A security referenced by positions and trades.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Security {
    pub id: UniqueId,
    pub name: String,
    pub security_type: String,
    /// Free-form descriptive attributes shown in blotter columns.
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

impl Security {
    /// Look up a blotter attribute. `SecurityType` and `Name` are always available.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        match name {
            "SecurityType" => Some(&self.security_type),
            "Name" => Some(&self.name),
            _ => self.attributes.get(name).map(String::as_str),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trade {
    pub id: UniqueId,
    pub quantity: Decimal,
    #[serde(default)]
    pub trade_date: Option<NaiveDate>,
    #[serde(default)]
    pub counterparty: Option<String>,
}

impl Trade {
    /// Label used for the trade's grid row.
    pub fn display_name(&self) -> String {
        match (&self.trade_date, &self.counterparty) {
            (Some(date), Some(cpty)) => format!("{} {}", date, cpty),
            (Some(date), None) => date.to_string(),
            (None, Some(cpty)) => cpty.clone(),
            (None, None) => self.id.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub id: UniqueId,
    pub quantity: Decimal,
    pub security: Security,
    #[serde(default)]
    pub trades: Vec<Trade>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioNode {
    pub id: UniqueId,
    pub name: String,
    #[serde(default)]
    pub positions: Vec<Position>,
    #[serde(default)]
    pub children: Vec<PortfolioNode>,
}

impl PortfolioNode {
    /// Visit this node and every descendant depth-first.
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a PortfolioNode)) {
        visit(self);
        for child in &self.children {
            child.walk(visit);
        }
    }
}

/// A fully resolved portfolio snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Portfolio {
    pub id: UniqueId,
    pub name: String,
    pub root: PortfolioNode,
}

impl Portfolio {
    /// All positions in the portfolio, depth-first.
    pub fn positions(&self) -> Vec<&Position> {
        let mut positions = Vec::new();
        self.root.walk(&mut |node| positions.extend(node.positions.iter()));
        positions
    }

    /// Every position, trade and security in the portfolio as cacheable entities.
    pub fn entities(&self) -> Vec<PortfolioEntity> {
        let mut entities = Vec::new();
        for position in self.positions() {
            entities.push(PortfolioEntity::Security(position.security.clone()));
            entities.extend(position.trades.iter().cloned().map(PortfolioEntity::Trade));
            entities.push(PortfolioEntity::Position(position.clone()));
        }
        entities
    }
}

/// A non-calculated portfolio object tracked by the entity cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PortfolioEntity {
    Position(Position),
    Trade(Trade),
    Security(Security),
}

impl PortfolioEntity {
    pub fn object_id(&self) -> ObjectId {
        match self {
            PortfolioEntity::Position(p) => p.id.object_id(),
            PortfolioEntity::Trade(t) => t.id.object_id(),
            PortfolioEntity::Security(s) => s.id.object_id(),
        }
    }

    pub fn as_security(&self) -> Option<&Security> {
        match self {
            PortfolioEntity::Security(security) => Some(security),
            _ => None,
        }
    }
}

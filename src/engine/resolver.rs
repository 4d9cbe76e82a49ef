use super::{ResolvedTarget, TargetResolver};
use crate::types::{ObjectId, Portfolio, TargetSpecification, TargetType};
use std::collections::HashMap;

/// Resolves target names from a portfolio snapshot.
#[derive(Debug, Clone, Default)]
pub struct PortfolioTargetResolver {
    targets: HashMap<ObjectId, ResolvedTarget>,
}

impl PortfolioTargetResolver {
    pub fn new(portfolio: Option<Portfolio>) -> Self {
        let mut targets = HashMap::new();
        let Some(portfolio) = portfolio else {
            return Self { targets };
        };
        let mut insert = |id: ObjectId, name: &str, target_type: TargetType| {
            targets.insert(
                id,
                ResolvedTarget {
                    name: name.to_string(),
                    target_type,
                },
            );
        };
        portfolio.root.walk(&mut |node| {
            insert(node.id.object_id(), &node.name, TargetType::PortfolioNode);
            for position in &node.positions {
                insert(
                    position.id.object_id(),
                    &position.security.name,
                    TargetType::Position,
                );
                insert(
                    position.security.id.object_id(),
                    &position.security.name,
                    TargetType::Security,
                );
                for trade in &position.trades {
                    insert(trade.id.object_id(), &trade.display_name(), TargetType::Trade);
                }
            }
        });
        Self { targets }
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

impl TargetResolver for PortfolioTargetResolver {
    fn resolve(&self, target: &TargetSpecification) -> Option<ResolvedTarget> {
        self.targets.get(&target.id.object_id()).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PortfolioNode, Position, Security, UniqueId};
    use rust_decimal_macros::dec;

    fn portfolio() -> Portfolio {
        Portfolio {
            id: UniqueId::of("Port", "1"),
            name: "Equities".into(),
            root: PortfolioNode {
                id: UniqueId::of("Node", "1"),
                name: "Equities".into(),
                positions: vec![Position {
                    id: UniqueId::versioned("Pos", "1", "2"),
                    quantity: dec!(5),
                    security: Security {
                        id: UniqueId::of("Sec", "AAPL"),
                        name: "Apple".into(),
                        security_type: "EQUITY".into(),
                        attributes: Default::default(),
                    },
                    trades: vec![],
                }],
                children: vec![],
            },
        }
    }

    #[test]
    fn test_resolves_any_version() {
        let resolver = PortfolioTargetResolver::new(Some(portfolio()));
        let target = TargetSpecification::position(UniqueId::versioned("Pos", "1", "9"));
        let resolved = resolver.resolve(&target).unwrap();
        assert_eq!(resolved.name, "Apple");
        assert_eq!(resolved.target_type, TargetType::Position);
    }

    #[test]
    fn test_unknown_target_falls_back_to_id() {
        let resolver = PortfolioTargetResolver::new(None);
        assert!(resolver.is_empty());
        let target = TargetSpecification::primitive(UniqueId::of("CurveId", "USD-OIS"));
        assert_eq!(resolver.name_of(&target), "CurveId~USD-OIS");
    }
}

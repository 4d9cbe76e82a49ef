//! Shared fixtures for integration tests

#![allow(dead_code)]

use chrono::Utc;
use rust_decimal_macros::dec;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use vista::config::Config;
use vista::types::{
    CalcConfigDefinition, CompiledCalcConfig, CompiledViewDefinition, ComputedValue, Portfolio,
    PortfolioNode, PortfolioRequirement, Position, Security, TargetSpecification, TerminalOutput,
    Trade, UniqueId, Value, ValueProperties, ValueRequirement, ValueSpecification, ValueType,
    ViewCycleResult, ViewDefinition,
};
use vista::view::UpdateListener;
use vista::AppState;

pub const CALC_CONFIG: &str = "Default";

/// Records every callback id it hears.
#[derive(Default)]
pub struct RecordingListener {
    ids: Mutex<Vec<String>>,
}

impl RecordingListener {
    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.ids.lock().unwrap())
    }
}

impl UpdateListener for RecordingListener {
    fn item_updated(&self, callback_id: &str) {
        self.ids.lock().unwrap().push(callback_id.to_string());
    }
}

pub fn test_config() -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        versioned_value_mappings: false,
        blotter_attributes: vec![],
        max_viewports_per_grid: 8,
    }
}

pub fn test_state() -> AppState {
    AppState::new(test_config())
}

pub fn position(id: &str, trades: usize) -> Position {
    Position {
        id: UniqueId::of("Pos", id),
        quantity: dec!(1000),
        security: Security {
            id: UniqueId::of("Sec", id),
            name: format!("Bond {}", id),
            security_type: "BOND".into(),
            attributes: Default::default(),
        },
        trades: (0..trades)
            .map(|n| Trade {
                id: UniqueId::of("Trade", format!("{}-{}", id, n)),
                quantity: dec!(500),
                trade_date: None,
                counterparty: None,
            })
            .collect(),
    }
}

/// One node holding the given positions.
pub fn portfolio(positions: Vec<Position>) -> Portfolio {
    Portfolio {
        id: UniqueId::of("Port", "bonds"),
        name: "Bonds".into(),
        root: PortfolioNode {
            id: UniqueId::of("Node", "bonds"),
            name: "Bonds".into(),
            positions,
            children: vec![],
        },
    }
}

pub fn pv(position_id: &str) -> ValueSpecification {
    ValueSpecification::new(
        "PV",
        TargetSpecification::position(UniqueId::of("Pos", position_id)),
        ValueProperties::new().with("Function", "BondPV"),
    )
}

pub fn curve() -> ValueSpecification {
    ValueSpecification::new(
        "YieldCurve",
        TargetSpecification::primitive(UniqueId::of("Curve", "USD")),
        ValueProperties::new().with("Function", "CurveBuilder"),
    )
}

/// A view on `portfolio` computing PV per bond plus one yield curve.
pub fn compiled(portfolio: Portfolio) -> CompiledViewDefinition {
    let mut outputs: Vec<TerminalOutput> = portfolio
        .positions()
        .iter()
        .map(|position| TerminalOutput {
            specification: pv(&position.id.value),
            requirements: vec![ValueRequirement::new(
                "PV",
                TargetSpecification::position(position.id.clone()),
                ValueProperties::new(),
            )],
        })
        .collect();
    let curve_requirement = ValueRequirement::new(
        "YieldCurve",
        TargetSpecification::primitive(UniqueId::of("Curve", "USD")),
        ValueProperties::new(),
    );
    outputs.push(TerminalOutput {
        specification: curve(),
        requirements: vec![curve_requirement.clone()],
    });

    CompiledViewDefinition {
        definition: ViewDefinition {
            name: "Bond PV".into(),
            portfolio_id: Some(portfolio.id.clone()),
            calculation_configurations: vec![CalcConfigDefinition {
                name: CALC_CONFIG.into(),
                portfolio_requirements: vec![PortfolioRequirement {
                    security_type: "BOND".into(),
                    value_name: "PV".into(),
                    constraints: ValueProperties::new(),
                }],
                specific_requirements: vec![curve_requirement],
                value_types: [("PV".to_string(), ValueType::Double)].into(),
            }],
        },
        portfolio: Some(portfolio),
        calc_configs: vec![CompiledCalcConfig {
            name: CALC_CONFIG.into(),
            terminal_outputs: outputs,
        }],
    }
}

/// A cycle carrying the given values.
pub fn cycle(values: Vec<(ValueSpecification, Value)>) -> ViewCycleResult {
    values.into_iter().fold(
        ViewCycleResult::new(Utc::now(), Duration::from_millis(120)),
        |cycle, (spec, value)| cycle.with_value(CALC_CONFIG, ComputedValue::new(spec, value)),
    )
}

pub fn recorder() -> Arc<RecordingListener> {
    Arc::new(RecordingListener::default())
}

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A monetary amount in a single currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrencyAmount {
    pub currency: String,
    pub amount: f64,
}

/// One-dimensional matrix of values keyed by display labels (e.g. bucketed sensitivities).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelledMatrix1D {
    pub labels: Vec<String>,
    pub values: Vec<f64>,
}

/// A value produced by the calculation engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    Double(f64),
    Decimal(Decimal),
    CurrencyAmount(CurrencyAmount),
    #[serde(rename = "labelled_matrix")]
    LabelledMatrix1D(LabelledMatrix1D),
    Vector(Vec<f64>),
    Integer(i64),
    Boolean(bool),
    Text(String),
    /// The engine could not produce the value; carries the reason.
    Missing(String),
}

/// Type classification of a [`Value`], also used as a column's declared type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    Double,
    Decimal,
    CurrencyAmount,
    #[serde(rename = "labelled_matrix")]
    LabelledMatrix1D,
    Vector,
    Integer,
    Boolean,
    Text,
    Missing,
}

impl ValueType {
    /// Whether the results cache keeps a history series for values of this type.
    pub fn supports_history(&self) -> bool {
        matches!(
            self,
            ValueType::Double
                | ValueType::Decimal
                | ValueType::CurrencyAmount
                | ValueType::LabelledMatrix1D
        )
    }
}

impl Value {
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Double(_) => ValueType::Double,
            Value::Decimal(_) => ValueType::Decimal,
            Value::CurrencyAmount(_) => ValueType::CurrencyAmount,
            Value::LabelledMatrix1D(_) => ValueType::LabelledMatrix1D,
            Value::Vector(_) => ValueType::Vector,
            Value::Integer(_) => ValueType::Integer,
            Value::Boolean(_) => ValueType::Boolean,
            Value::Text(_) => ValueType::Text,
            Value::Missing(_) => ValueType::Missing,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing(_))
    }

    /// Keys of the display columns this value can be expanded into, if it is inlineable.
    pub fn inline_keys(&self) -> Option<Vec<String>> {
        match self {
            Value::LabelledMatrix1D(matrix) => Some(matrix.labels.clone()),
            Value::Vector(values) => Some((0..values.len()).map(|i| i.to_string()).collect()),
            _ => None,
        }
    }

    /// The element shown under inline column `key`: matched by label for a
    /// matrix, by position for a vector.
    pub fn inline_value(&self, key: &str) -> Option<Value> {
        let element = match self {
            Value::LabelledMatrix1D(matrix) => matrix
                .labels
                .iter()
                .position(|label| label == key)
                .and_then(|index| matrix.values.get(index)),
            Value::Vector(values) => key.parse::<usize>().ok().and_then(|index| values.get(index)),
            _ => None,
        };
        element.copied().map(Value::Double)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Double(v) => write!(f, "{}", v),
            Value::Decimal(v) => write!(f, "{}", v),
            Value::CurrencyAmount(ca) => write!(f, "{} {}", ca.currency, ca.amount),
            Value::LabelledMatrix1D(m) => write!(f, "Matrix ({})", m.labels.len()),
            Value::Vector(v) => write!(f, "Vector ({})", v.len()),
            Value::Integer(v) => write!(f, "{}", v),
            Value::Boolean(v) => write!(f, "{}", v),
            Value::Text(v) => f.write_str(v),
            Value::Missing(reason) => write!(f, "Missing: {}", reason),
        }
    }
}

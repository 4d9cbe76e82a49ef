use super::{PortfolioEntity, Value, ValueSpecification};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Severity of an execution log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
}

/// Log captured by the engine while calculating one value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionLog {
    #[serde(default)]
    pub entries: Vec<LogEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exception: Option<String>,
}

impl ExecutionLog {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.exception.is_none()
    }

    pub fn with_entry(mut self, level: LogLevel, message: impl Into<String>) -> Self {
        self.entries.push(LogEntry {
            level,
            message: message.into(),
        });
        self
    }

    pub fn with_exception(mut self, exception: impl Into<String>) -> Self {
        self.exception = Some(exception.into());
        self
    }

    /// Highest level present, treating an exception as an error.
    pub fn max_level(&self) -> Option<LogLevel> {
        let from_entries = self.entries.iter().map(|e| e.level).max();
        if self.exception.is_some() {
            Some(LogLevel::Error)
        } else {
            from_entries
        }
    }

    pub fn summary(&self) -> LogSummary {
        LogSummary {
            max_level: self.max_level(),
            entry_count: self.entries.len(),
            has_exception: self.exception.is_some(),
        }
    }
}

/// Compact form of an [`ExecutionLog`] carried by every result cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogSummary {
    pub max_level: Option<LogLevel>,
    pub entry_count: usize,
    pub has_exception: bool,
}

/// One output of a calculation cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComputedValue {
    pub specification: ValueSpecification,
    pub value: Value,
    #[serde(default)]
    pub log: ExecutionLog,
}

impl ComputedValue {
    pub fn new(specification: ValueSpecification, value: Value) -> Self {
        Self {
            specification,
            value,
            log: ExecutionLog::default(),
        }
    }
}

/// Results of one completed engine cycle, full or delta.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewCycleResult {
    pub valuation_time: DateTime<Utc>,
    pub calculation_duration_ms: u64,
    /// False for a delta cycle that only carries changed values.
    #[serde(default = "default_full")]
    pub full: bool,
    /// Computed values keyed by calculation configuration name.
    #[serde(default)]
    pub results: BTreeMap<String, Vec<ComputedValue>>,
    /// Portfolio entities that changed in this cycle.
    #[serde(default)]
    pub entities: Vec<PortfolioEntity>,
}

fn default_full() -> bool {
    true
}

impl ViewCycleResult {
    pub fn new(valuation_time: DateTime<Utc>, calculation_duration: Duration) -> Self {
        Self {
            valuation_time,
            calculation_duration_ms: calculation_duration.as_millis() as u64,
            full: true,
            results: BTreeMap::new(),
            entities: Vec::new(),
        }
    }

    /// Builder-style helper adding one value to a calculation configuration.
    pub fn with_value(mut self, calc_config: &str, value: ComputedValue) -> Self {
        self.results
            .entry(calc_config.to_string())
            .or_default()
            .push(value);
        self
    }

    pub fn calculation_duration(&self) -> Duration {
        Duration::from_millis(self.calculation_duration_ms)
    }

    pub fn value_count(&self) -> usize {
        self.results.values().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_summary_counts_exception_as_error() {
        let log = ExecutionLog::default()
            .with_entry(LogLevel::Warn, "curve extrapolated")
            .with_exception("NullPointer");
        let summary = log.summary();
        assert_eq!(summary.max_level, Some(LogLevel::Error));
        assert_eq!(summary.entry_count, 1);
        assert!(summary.has_exception);
    }

    #[test]
    fn test_empty_log() {
        let log = ExecutionLog::default();
        assert!(log.is_empty());
        assert_eq!(log.max_level(), None);
    }

    #[test]
    fn test_cycle_result_defaults_to_full() {
        let json = r#"{"valuationTime":"2024-01-01T00:00:00Z","calculationDurationMs":250}"#;
        let result: ViewCycleResult = serde_json::from_str(json).unwrap();
        assert!(result.full);
        assert_eq!(result.calculation_duration(), Duration::from_millis(250));
        assert_eq!(result.value_count(), 0);
    }
}

use crate::types::{
    ComputedValue, ExecutionLog, ObjectId, PortfolioEntity, Value, ValueSpecification, ValueType,
    ViewCycleResult,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tracing::debug;

/// Maximum number of historical values kept per cache item.
pub const HISTORY_SIZE: usize = 20;

/// Primary key of the results cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultKey {
    pub calc_config: String,
    pub specification: ValueSpecification,
}

impl ResultKey {
    pub fn new(calc_config: impl Into<String>, specification: ValueSpecification) -> Self {
        Self {
            calc_config: calc_config.into(),
            specification,
        }
    }
}

/// Latest value of one result stream plus its history.
#[derive(Debug)]
struct CacheItem {
    value: Value,
    history: Option<VecDeque<Value>>,
    log: ExecutionLog,
    last_update_id: u64,
}

impl CacheItem {
    fn new(value: Value, log: ExecutionLog, update_id: u64) -> Self {
        let mut item = Self {
            value: value.clone(),
            history: None,
            log,
            last_update_id: update_id,
        };
        item.record_history(value);
        item
    }

    fn set_value(&mut self, value: Value, log: ExecutionLog, update_id: u64) {
        self.record_history(value.clone());
        self.value = value;
        self.log = log;
        self.last_update_id = update_id;
    }

    /// Appends `value` to the history, starting one if the value's type supports it.
    fn record_history(&mut self, value: Value) {
        if self.history.is_none() && value.value_type().supports_history() {
            self.history = Some(VecDeque::with_capacity(HISTORY_SIZE));
        }
        if let Some(history) = self.history.as_mut() {
            push_bounded(history, value);
        }
    }

    /// Repeat the current value so the history stays aligned with cycles.
    fn duplicate_last(&mut self) {
        if let Some(history) = self.history.as_mut() {
            push_bounded(history, self.value.clone());
        }
    }
}

fn push_bounded(history: &mut VecDeque<Value>, value: Value) {
    history.push_back(value);
    while history.len() > HISTORY_SIZE {
        history.pop_front();
    }
}

#[derive(Debug)]
struct EntityItem {
    entity: PortfolioEntity,
    last_update_id: u64,
}

/// A read from the results cache.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CachedResult {
    pub value: Option<Value>,
    pub history: Option<Vec<Value>>,
    pub log: Option<ExecutionLog>,
    /// True iff the value was written by the most recent batch.
    pub updated: bool,
}

impl CachedResult {
    /// Result for a key that has never been written. The history is an empty
    /// series rather than absent when the expected type keeps history.
    pub fn empty(expected_type: Option<ValueType>) -> Self {
        let history = expected_type
            .filter(ValueType::supports_history)
            .map(|_| Vec::new());
        Self {
            value: None,
            history,
            log: None,
            updated: false,
        }
    }

    pub fn has_value(&self) -> bool {
        self.value.is_some()
    }
}

/// A read from the entity cache.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedEntity {
    pub entity: PortfolioEntity,
    pub updated: bool,
}

/// Latest calculated values per (calculation configuration, value specification),
/// with change tracking across engine cycles.
///
/// Not internally synchronized; the owning view serializes access.
#[derive(Debug, Default)]
pub struct ResultsCache {
    results: HashMap<ResultKey, CacheItem>,
    entities: HashMap<ObjectId, EntityItem>,
    last_update_id: u64,
    last_calculation_duration: Duration,
    valuation_time: Option<DateTime<Utc>>,
}

impl ResultsCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ingest the results of one engine cycle.
    pub fn put(&mut self, result: &ViewCycleResult) {
        let update_id = self.next_update_id();
        for (calc_config, values) in &result.results {
            for computed in values {
                self.put_value(calc_config, computed, update_id);
            }
        }
        self.duplicate_untouched(update_id);
        for entity in &result.entities {
            self.put_entity(entity.clone(), update_id);
        }
        self.last_calculation_duration = result.calculation_duration();
        self.valuation_time = Some(result.valuation_time);
        debug!(
            update_id,
            values = result.value_count(),
            full = result.full,
            "Results cache updated"
        );
    }

    /// Ingest a batch scoped to one calculation configuration, e.g. values
    /// queried for a dependency graph.
    pub fn put_calc_config(
        &mut self,
        calc_config: &str,
        values: &[ComputedValue],
        duration: Duration,
    ) {
        let update_id = self.next_update_id();
        for computed in values {
            self.put_value(calc_config, computed, update_id);
        }
        self.duplicate_untouched(update_id);
        self.last_calculation_duration = duration;
    }

    /// Ingest changed portfolio entities outside of a calculation cycle.
    ///
    /// Starts a new batch so only these entities read as updated, but does not
    /// extend value histories because no calculation took place.
    pub fn put_entities(&mut self, entities: &[PortfolioEntity]) {
        let update_id = self.next_update_id();
        for entity in entities {
            self.put_entity(entity.clone(), update_id);
        }
    }

    /// Seed the entity cache without starting a new batch.
    pub fn seed_entities(&mut self, entities: &[PortfolioEntity]) {
        let update_id = self.last_update_id;
        for entity in entities {
            self.entities.insert(
                entity.object_id(),
                EntityItem {
                    entity: entity.clone(),
                    last_update_id: update_id,
                },
            );
        }
    }

    /// Read the latest value for a key.
    pub fn get_result(
        &self,
        calc_config: &str,
        specification: &ValueSpecification,
        expected_type: Option<ValueType>,
    ) -> CachedResult {
        let key = ResultKey::new(calc_config, specification.clone());
        match self.results.get(&key) {
            Some(item) => CachedResult {
                value: Some(item.value.clone()),
                history: item.history.as_ref().map(|h| h.iter().cloned().collect()),
                log: Some(item.log.clone()),
                updated: item.last_update_id == self.last_update_id,
            },
            None => CachedResult::empty(expected_type),
        }
    }

    /// Latest value for a key without history or log.
    pub fn get_value(&self, calc_config: &str, specification: &ValueSpecification) -> Option<&Value> {
        let key = ResultKey::new(calc_config, specification.clone());
        self.results.get(&key).map(|item| &item.value)
    }

    pub fn get_entity(&self, id: &ObjectId) -> Option<CachedEntity> {
        self.entities.get(id).map(|item| CachedEntity {
            entity: item.entity.clone(),
            updated: item.last_update_id == self.last_update_id,
        })
    }

    pub fn last_update_id(&self) -> u64 {
        self.last_update_id
    }

    pub fn last_calculation_duration(&self) -> Duration {
        self.last_calculation_duration
    }

    pub fn valuation_time(&self) -> Option<DateTime<Utc>> {
        self.valuation_time
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    fn next_update_id(&mut self) -> u64 {
        self.last_update_id += 1;
        self.last_update_id
    }

    fn put_value(&mut self, calc_config: &str, computed: &ComputedValue, update_id: u64) {
        let key = ResultKey::new(calc_config, computed.specification.clone());
        match self.results.get_mut(&key) {
            Some(item) => item.set_value(computed.value.clone(), computed.log.clone(), update_id),
            None => {
                self.results.insert(
                    key,
                    CacheItem::new(computed.value.clone(), computed.log.clone(), update_id),
                );
            }
        }
    }

    fn duplicate_untouched(&mut self, update_id: u64) {
        for item in self.results.values_mut() {
            if item.last_update_id != update_id {
                item.duplicate_last();
            }
        }
    }

    fn put_entity(&mut self, entity: PortfolioEntity, update_id: u64) {
        self.entities.insert(
            entity.object_id(),
            EntityItem {
                entity,
                last_update_id: update_id,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        CurrencyAmount, Security, TargetSpecification, UniqueId, ValueProperties,
    };
    use chrono::TimeZone;

    fn spec(name: &str) -> ValueSpecification {
        ValueSpecification::new(
            name,
            TargetSpecification::position(UniqueId::of("Pos", "1")),
            ValueProperties::new(),
        )
    }

    fn cycle(values: &[(&str, Value)]) -> ViewCycleResult {
        let time = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        values.iter().fold(
            ViewCycleResult::new(time, Duration::from_millis(120)),
            |result, (name, value)| {
                result.with_value("Default", ComputedValue::new(spec(name), value.clone()))
            },
        )
    }

    #[test]
    fn test_unknown_key_returns_empty_result() {
        let cache = ResultsCache::new();

        let result = cache.get_result("Default", &spec("PV"), Some(ValueType::Double));
        assert_eq!(result.value, None);
        assert_eq!(result.history, Some(Vec::new()));
        assert!(!result.updated);

        let result = cache.get_result("Default", &spec("PV"), Some(ValueType::Text));
        assert_eq!(result.history, None);

        let result = cache.get_result("Default", &spec("PV"), None);
        assert_eq!(result.history, None);
    }

    #[test]
    fn test_history_duplicated_when_key_absent_from_batch() {
        let mut cache = ResultsCache::new();
        cache.put(&cycle(&[("PV", Value::Double(1.0))]));
        cache.put(&cycle(&[("Delta", Value::Double(0.5))]));
        cache.put(&cycle(&[("PV", Value::Double(2.0))]));

        let result = cache.get_result("Default", &spec("PV"), None);
        assert_eq!(
            result.history,
            Some(vec![Value::Double(1.0), Value::Double(1.0), Value::Double(2.0)])
        );
        assert_eq!(result.value, Some(Value::Double(2.0)));
    }

    #[test]
    fn test_updated_flag_only_for_latest_batch() {
        let mut cache = ResultsCache::new();
        cache.put(&cycle(&[("PV", Value::Double(1.0))]));
        assert!(cache.get_result("Default", &spec("PV"), None).updated);

        cache.put(&cycle(&[("Delta", Value::Double(0.5))]));
        assert!(!cache.get_result("Default", &spec("PV"), None).updated);
        assert!(cache.get_result("Default", &spec("Delta"), None).updated);
        assert!(!cache.get_result("Default", &spec("Gamma"), None).updated);
    }

    #[test]
    fn test_history_is_bounded() {
        let mut cache = ResultsCache::new();
        for i in 0..(HISTORY_SIZE + 5) {
            cache.put(&cycle(&[("PV", Value::Double(i as f64))]));
        }
        let history = cache
            .get_result("Default", &spec("PV"), None)
            .history
            .unwrap();
        assert_eq!(history.len(), HISTORY_SIZE);
        assert_eq!(history[0], Value::Double(5.0));
        assert_eq!(history[HISTORY_SIZE - 1], Value::Double((HISTORY_SIZE + 4) as f64));
    }

    #[test]
    fn test_no_history_for_ineligible_types() {
        let mut cache = ResultsCache::new();
        cache.put(&cycle(&[("Name", Value::Text("Swap".into()))]));
        let result = cache.get_result("Default", &spec("Name"), None);
        assert_eq!(result.history, None);
        assert_eq!(result.value, Some(Value::Text("Swap".into())));
    }

    #[test]
    fn test_history_starts_when_type_becomes_eligible() {
        let mut cache = ResultsCache::new();
        cache.put(&cycle(&[("PV", Value::Missing("no curve".into()))]));
        cache.put(&cycle(&[(
            "PV",
            Value::CurrencyAmount(CurrencyAmount {
                currency: "USD".into(),
                amount: 10.0,
            }),
        )]));
        let history = cache.get_result("Default", &spec("PV"), None).history.unwrap();
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_put_calc_config_records_duration() {
        let mut cache = ResultsCache::new();
        let values = vec![ComputedValue::new(spec("PV"), Value::Double(3.0))];
        cache.put_calc_config("Default", &values, Duration::from_millis(40));

        assert_eq!(cache.last_update_id(), 1);
        assert_eq!(cache.last_calculation_duration(), Duration::from_millis(40));
        assert!(cache.get_result("Default", &spec("PV"), None).updated);
        assert!(!cache.get_result("Other", &spec("PV"), None).has_value());
    }

    #[test]
    fn test_entities_follow_batch_generation() {
        let mut cache = ResultsCache::new();
        let security = PortfolioEntity::Security(Security {
            id: UniqueId::versioned("Sec", "1", "1"),
            name: "AAPL".into(),
            security_type: "EQUITY".into(),
            attributes: Default::default(),
        });
        cache.seed_entities(std::slice::from_ref(&security));
        let id = security.object_id();
        assert!(cache.get_entity(&id).unwrap().updated);

        cache.put(&cycle(&[("PV", Value::Double(1.0))]));
        assert!(!cache.get_entity(&id).unwrap().updated);

        cache.put_entities(std::slice::from_ref(&security));
        assert!(cache.get_entity(&id).unwrap().updated);
        // an entity-only batch is not a calculation cycle
        let history = cache.get_result("Default", &spec("PV"), None).history.unwrap();
        assert_eq!(history.len(), 1);
        assert!(!cache.get_result("Default", &spec("PV"), None).updated);
    }

    #[test]
    fn test_valuation_time_recorded() {
        let mut cache = ResultsCache::new();
        assert!(cache.valuation_time().is_none());
        cache.put(&cycle(&[]));
        assert!(cache.valuation_time().is_some());
        assert_eq!(cache.last_calculation_duration(), Duration::from_millis(120));
    }
}

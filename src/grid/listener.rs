use super::viewport::Viewport;
use crate::engine::{EngineSession, ExecutionLogMode};
use crate::services::results_cache::ResultKey;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Observes the viewport lifecycle of every grid in a view.
pub trait ViewportListener: Send + Sync {
    fn viewport_created(&mut self, viewport: &Viewport);

    /// Called after the viewport's definition or structure changed.
    fn viewport_updated(&mut self, viewport: &Viewport);

    fn viewport_deleted(&mut self, viewport: &Viewport);
}

/// Listener that ignores everything.
#[derive(Debug, Default)]
pub struct NoopViewportListener;

impl ViewportListener for NoopViewportListener {
    fn viewport_created(&mut self, _viewport: &Viewport) {}

    fn viewport_updated(&mut self, _viewport: &Viewport) {}

    fn viewport_deleted(&mut self, _viewport: &Viewport) {}
}

/// Turns full execution logging on for the cells of logging-enabled
/// viewports and back off once no viewport shows them.
///
/// Keys are reference counted: the engine hears `Full` when a key's count
/// goes from zero to one and `Indicators` when it drops back to zero.
pub struct LoggingViewportListener {
    engine: Arc<dyn EngineSession>,
    /// Keys each viewport holds, by callback id.
    subscriptions: HashMap<String, Vec<ResultKey>>,
    counts: HashMap<ResultKey, usize>,
}

impl LoggingViewportListener {
    pub fn new(engine: Arc<dyn EngineSession>) -> Self {
        Self {
            engine,
            subscriptions: HashMap::new(),
            counts: HashMap::new(),
        }
    }

    /// Number of viewports currently logging `key`.
    pub fn count(&self, key: &ResultKey) -> usize {
        self.counts.get(key).copied().unwrap_or(0)
    }

    fn replace(&mut self, callback_id: &str, keys: Vec<ResultKey>) {
        let previous = if keys.is_empty() {
            self.subscriptions.remove(callback_id)
        } else {
            self.subscriptions.insert(callback_id.to_string(), keys.clone())
        }
        .unwrap_or_default();

        let mut released = Vec::new();
        for key in previous {
            if let Some(count) = self.counts.get_mut(&key) {
                *count -= 1;
                if *count == 0 {
                    self.counts.remove(&key);
                    released.push(key);
                }
            }
        }
        let mut acquired = Vec::new();
        for key in keys {
            let count = self.counts.entry(key.clone()).or_insert(0);
            *count += 1;
            if *count == 1 {
                acquired.push(key);
            }
        }
        // a key released and re-acquired in one update never changed mode
        let unchanged: Vec<ResultKey> = released
            .iter()
            .filter(|key| acquired.contains(key))
            .cloned()
            .collect();
        released.retain(|key| !unchanged.contains(key));
        acquired.retain(|key| !unchanged.contains(key));

        if !acquired.is_empty() {
            debug!(keys = acquired.len(), "Enabling full execution logging");
            self.engine
                .set_minimum_log_mode(ExecutionLogMode::Full, &acquired);
        }
        if !released.is_empty() {
            debug!(keys = released.len(), "Reverting to log indicators");
            self.engine
                .set_minimum_log_mode(ExecutionLogMode::Indicators, &released);
        }
    }
}

impl ViewportListener for LoggingViewportListener {
    fn viewport_created(&mut self, viewport: &Viewport) {
        self.replace(viewport.callback_id(), viewport.logged_keys());
    }

    fn viewport_updated(&mut self, viewport: &Viewport) {
        self.replace(viewport.callback_id(), viewport.logged_keys());
    }

    fn viewport_deleted(&mut self, viewport: &Viewport) {
        self.replace(viewport.callback_id(), Vec::new());
    }
}

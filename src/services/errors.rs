use crate::error::ViewError;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::warn;

/// An unexpected failure captured while serving a view.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorInfo {
    pub id: u64,
    /// Callback id clients are notified with.
    pub callback_id: String,
    pub kind: &'static str,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// Errors recorded for one view until a client dismisses them.
pub struct ErrorManager {
    /// Prefix of every callback id handed out.
    callback_prefix: String,
    /// Recorded errors keyed by id.
    errors: DashMap<u64, ErrorInfo>,
    next_id: AtomicU64,
}

impl ErrorManager {
    /// Create a new error manager for the view with the given id.
    pub fn new(view_id: &str) -> Arc<Self> {
        Arc::new(Self {
            callback_prefix: format!("{}:error", view_id),
            errors: DashMap::new(),
            next_id: AtomicU64::new(1),
        })
    }

    /// Record an error and return the callback id it was stored under.
    pub fn add(&self, error: &ViewError) -> String {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let callback_id = format!("{}:{}", self.callback_prefix, id);
        warn!(error_id = id, kind = error.kind(), "View error captured: {}", error);
        self.errors.insert(
            id,
            ErrorInfo {
                id,
                callback_id: callback_id.clone(),
                kind: error.kind(),
                message: error.to_string(),
                timestamp: Utc::now(),
            },
        );
        callback_id
    }

    /// All recorded errors, oldest first.
    pub fn errors(&self) -> Vec<ErrorInfo> {
        let mut errors: Vec<ErrorInfo> = self.errors.iter().map(|e| e.value().clone()).collect();
        errors.sort_by_key(|e| e.id);
        errors
    }

    /// Dismiss an error.
    pub fn delete(&self, id: u64) -> Result<(), ViewError> {
        self.errors
            .remove(&id)
            .map(|_| ())
            .ok_or(ViewError::ErrorNotFound(id))
    }

    /// Get the number of recorded errors.
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Check if no errors are recorded.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_list_errors() {
        let manager = ErrorManager::new("view-1");
        let first = manager.add(&ViewError::Engine("engine unavailable".into()));
        let second = manager.add(&ViewError::Internal("lock poisoned".into()));

        assert_eq!(first, "view-1:error:1");
        assert_eq!(second, "view-1:error:2");

        let errors = manager.errors();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].kind, "engine");
        assert!(errors[0].message.contains("engine unavailable"));
        assert_eq!(errors[1].kind, "internal");
    }

    #[test]
    fn test_delete_error() {
        let manager = ErrorManager::new("view-1");
        manager.add(&ViewError::Engine("timeout".into()));
        assert!(manager.delete(1).is_ok());
        assert!(manager.is_empty());
        assert_eq!(manager.delete(1), Err(ViewError::ErrorNotFound(1)));
    }
}

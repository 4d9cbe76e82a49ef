use crate::engine::BridgeSession;
use crate::error::ViewError;
use crate::grid::LoggingViewportListener;
use crate::services::errors::ErrorManager;
use crate::view::{
    CatchingAnalyticsView, LockingAnalyticsView, NotifyingAnalyticsView, SharedAnalyticsView,
    SimpleAnalyticsView, UpdateListener, ViewSettings,
};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// A live view and the engine session feeding it.
pub struct ViewHandle {
    pub view_id: String,
    /// Connection that owns the view and receives its updates.
    pub client_id: Uuid,
    pub view: Arc<dyn SharedAnalyticsView>,
    pub session: Arc<BridgeSession>,
    pub created_at: DateTime<Utc>,
}

/// Creates, looks up and closes the views of every connected client.
pub struct AnalyticsViewManager {
    settings: ViewSettings,
    views: DashMap<String, Arc<ViewHandle>>,
}

impl AnalyticsViewManager {
    /// Create a new view manager.
    pub fn new(settings: ViewSettings) -> Arc<Self> {
        Arc::new(Self {
            settings,
            views: DashMap::new(),
        })
    }

    /// Create a view whose updates go to `listener`.
    pub fn create_view(
        &self,
        client_id: Uuid,
        listener: Arc<dyn UpdateListener>,
    ) -> Arc<ViewHandle> {
        let view_id = Uuid::new_v4().to_string();
        let session = BridgeSession::new();

        let simple = SimpleAnalyticsView::new(
            view_id.clone(),
            self.settings.clone(),
            session.clone(),
            session.clone(),
            session.clone(),
            Box::new(LoggingViewportListener::new(session.clone())),
        );
        let view = CatchingAnalyticsView::new(
            NotifyingAnalyticsView::new(LockingAnalyticsView::new(simple), listener.clone()),
            ErrorManager::new(&view_id),
            listener,
        );

        let handle = Arc::new(ViewHandle {
            view_id: view_id.clone(),
            client_id,
            view: Arc::new(view),
            session,
            created_at: Utc::now(),
        });
        self.views.insert(view_id.clone(), handle.clone());
        info!(%view_id, %client_id, "View created");
        handle
    }

    /// Get a view by id.
    pub fn view(&self, view_id: &str) -> Result<Arc<ViewHandle>, ViewError> {
        self.views
            .get(view_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| ViewError::ViewNotFound(view_id.to_string()))
    }

    /// Close a view and forget it.
    pub fn delete_view(&self, view_id: &str) -> Result<(), ViewError> {
        let (_, handle) = self
            .views
            .remove(view_id)
            .ok_or_else(|| ViewError::ViewNotFound(view_id.to_string()))?;
        handle.view.close()?;
        info!(%view_id, "View deleted");
        Ok(())
    }

    /// Close every view a client owns. Returns how many were closed.
    pub fn delete_client_views(&self, client_id: Uuid) -> usize {
        let view_ids = self.client_views(client_id);
        view_ids
            .iter()
            .filter(|view_id| self.delete_view(view_id).is_ok())
            .count()
    }

    /// Ids of the views a client owns.
    pub fn client_views(&self, client_id: Uuid) -> Vec<String> {
        self.views
            .iter()
            .filter(|entry| entry.client_id == client_id)
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Get the number of live views.
    pub fn view_count(&self) -> usize {
        self.views.len()
    }
}

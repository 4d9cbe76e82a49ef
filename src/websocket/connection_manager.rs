use crate::types::ServerMessage;
use crate::view::UpdateListener;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

/// A connected WebSocket client.
pub struct ClientConnection {
    /// Channel to send messages to the client.
    pub tx: mpsc::UnboundedSender<String>,
}

/// Tracks connected WebSocket clients.
pub struct ConnectionManager {
    /// Connections keyed by client ID.
    pub clients: DashMap<Uuid, ClientConnection>,
}

impl ConnectionManager {
    /// Create a new connection manager.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register a new client.
    pub fn register(&self, tx: mpsc::UnboundedSender<String>) -> Uuid {
        let client_id = Uuid::new_v4();
        self.clients.insert(client_id, ClientConnection { tx });
        client_id
    }

    /// Unregister a client.
    pub fn unregister(&self, client_id: Uuid) {
        self.clients.remove(&client_id);
    }

    /// Check if a client is connected.
    pub fn is_connected(&self, client_id: Uuid) -> bool {
        self.clients.contains_key(&client_id)
    }

    /// Send a message to one client. False if it is gone.
    pub fn send(&self, client_id: Uuid, msg: &ServerMessage) -> bool {
        let Ok(json) = serde_json::to_string(msg) else {
            return false;
        };
        match self.clients.get(&client_id) {
            Some(client) => client.tx.send(json).is_ok(),
            None => false,
        }
    }

    /// Get the number of connected clients.
    pub fn client_count(&self) -> usize {
        self.clients.len()
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self {
            clients: DashMap::new(),
        }
    }
}

/// Pushes a view's callback ids to the client that owns it.
pub struct ClientListener {
    client_id: Uuid,
    connections: Arc<ConnectionManager>,
}

impl ClientListener {
    pub fn new(client_id: Uuid, connections: Arc<ConnectionManager>) -> Self {
        Self {
            client_id,
            connections,
        }
    }
}

impl UpdateListener for ClientListener {
    fn item_updated(&self, callback_id: &str) {
        self.items_updated(&[callback_id.to_string()]);
    }

    fn items_updated(&self, callback_ids: &[String]) {
        let msg = ServerMessage::Updated {
            ids: callback_ids.to_vec(),
        };
        if !self.connections.send(self.client_id, &msg) {
            debug!(client_id = %self.client_id, "Dropped update for disconnected client");
        }
    }
}

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Incoming WebSocket message from client.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Ping,
}

/// Outgoing WebSocket message to client.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Sent once after the upgrade; views are created against this id.
    Connected {
        client_id: Uuid,
    },
    /// Callback ids of grids, viewports and errors that changed.
    Updated {
        ids: Vec<String>,
    },
    Pong,
    Error {
        error: String,
    },
}

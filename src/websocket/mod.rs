mod connection_manager;
mod handler;

pub use connection_manager::{ClientConnection, ClientListener, ConnectionManager};
pub use handler::ws_handler;

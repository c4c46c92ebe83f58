//! Palaver Chat Core
//!
//! Client library for the direct-messaging chat of the Palaver community
//! platform. Owns the persistent connection to the message server, the
//! peer directory, the per-conversation message log, and the session
//! state machine that ties them together. Rendering lives in the
//! frontend crate.

pub mod api;
pub mod directory;
pub mod error;
pub mod models;
pub mod session;
pub mod socket;
pub mod store;
pub mod view;

pub use api::ApiClient;
pub use directory::PeerDirectory;
pub use error::{Error, Result};
pub use models::*;
pub use session::{ChatSession, HistoryRequest, SessionEvent, SessionState};
pub use socket::{SocketClient, SocketHandle};
pub use store::MessageStore;
pub use view::{bubble, format_time, Bubble};

/// Client configuration
#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub server_host: String,
    pub server_port: u16,
    pub use_tls: bool,
}

impl ClientConfig {
    pub fn new(host: &str, port: u16, use_tls: bool) -> Self {
        Self {
            server_host: host.to_string(),
            server_port: port,
            use_tls,
        }
    }

    pub fn http_url(&self) -> String {
        let scheme = if self.use_tls { "https" } else { "http" };
        format!("{}://{}:{}", scheme, self.server_host, self.server_port)
    }

    pub fn ws_url(&self) -> String {
        let scheme = if self.use_tls { "wss" } else { "ws" };
        format!("{}://{}:{}/ws", scheme, self.server_host, self.server_port)
    }
}

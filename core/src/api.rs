//! HTTP collaborators - peer directory and message history
//!
//! Thin wrappers over the platform API. Failures surface to the caller;
//! nothing here retries automatically.

use parking_lot::Mutex;
use reqwest::Client;

use crate::error::{Error, Result};
use crate::models::ChatMessage;
use crate::ClientConfig;

pub struct ApiClient {
    http: Client,
    base_url: String,
    session_cookie: Mutex<Option<String>>,
}

impl ApiClient {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let http = Client::builder()
            .cookie_store(true)
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;

        Ok(Self {
            http,
            base_url: config.http_url(),
            session_cookie: Mutex::new(None),
        })
    }

    /// Attach the credentialed session cookie sent with every request.
    pub fn set_session_cookie(&self, cookie: &str) {
        *self.session_cookie.lock() = Some(cookie.to_string());
    }

    fn get(&self, url: String) -> reqwest::RequestBuilder {
        let mut req = self.http.get(url);
        if let Some(ref cookie) = *self.session_cookie.lock() {
            req = req.header(reqwest::header::COOKIE, cookie.clone());
        }
        req
    }

    /// One-shot fetch of the peers available for conversation.
    ///
    /// The result is filtered so it never contains `current_user` itself.
    pub async fn list_peers(&self, current_user: &str) -> Result<Vec<String>> {
        let resp = self
            .get(format!(
                "{}/api/users?current_user={}",
                self.base_url, current_user
            ))
            .send()
            .await
            .map_err(|e| Error::DirectoryLoad(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(Error::DirectoryLoad(format!("HTTP {}", resp.status())));
        }

        let mut peers: Vec<String> = resp
            .json()
            .await
            .map_err(|e| Error::DirectoryLoad(e.to_string()))?;
        peers.retain(|peer| peer != current_user);
        Ok(peers)
    }

    /// Ordered message history for the conversation with `peer`, as
    /// delivered by the history service (ascending timestamp).
    pub async fn message_history(
        &self,
        current_user: &str,
        peer: &str,
    ) -> Result<Vec<ChatMessage>> {
        let resp = self
            .get(format!(
                "{}/api/messages/{}?current_user={}",
                self.base_url, peer, current_user
            ))
            .send()
            .await
            .map_err(|e| Error::HistoryLoad(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(Error::HistoryLoad(format!("HTTP {}", resp.status())));
        }

        resp.json()
            .await
            .map_err(|e| Error::HistoryLoad(e.to_string()))
    }
}

//! Connected reload clients.
//!
//! Holds the WebSocket connections of open browser tabs. Route-table
//! changes and overlay diagnostics are broadcast here as JSON events;
//! clients that fail a send are pruned.

use std::net::TcpStream;

use parking_lot::Mutex;
use serde::Serialize;
use tungstenite::{Message, WebSocket};

use crate::diagnostics::{OverlayDiagnostic, OverlaySink};
use crate::watch::ChangeListener;

#[derive(Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
enum ClientEvent<'a> {
    #[serde(rename_all = "camelCase")]
    RoutesChanged { pages: &'a [String] },
    #[serde(rename_all = "camelCase")]
    Diagnostic { diagnostic: &'a OverlayDiagnostic },
}

/// Registry of connected reload clients.
#[derive(Default)]
pub struct ReloadHub {
    clients: Mutex<Vec<WebSocket<TcpStream>>>,
}

impl ReloadHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Perform the WebSocket handshake and register the client.
    pub fn add_client(&self, stream: TcpStream) {
        match tungstenite::accept(stream) {
            Ok(socket) => {
                self.clients.lock().push(socket);
                crate::debug!("reload"; "client connected ({} total)", self.client_count());
            }
            Err(e) => crate::debug!("reload"; "handshake failed: {}", e),
        }
    }

    pub fn client_count(&self) -> usize {
        self.clients.lock().len()
    }

    /// Send a text message to every client, dropping ones that fail.
    fn broadcast(&self, text: &str) {
        let mut clients = self.clients.lock();
        clients.retain_mut(|socket| socket.send(Message::text(text.to_string())).is_ok());
    }

    fn broadcast_event(&self, event: &ClientEvent<'_>) {
        match serde_json::to_string(event) {
            Ok(json) => self.broadcast(&json),
            Err(e) => crate::debug!("reload"; "event serialization failed: {}", e),
        }
    }
}

impl ChangeListener for ReloadHub {
    fn routes_changed(&self, pages: Vec<String>) {
        self.broadcast_event(&ClientEvent::RoutesChanged { pages: &pages });
    }
}

impl OverlaySink for ReloadHub {
    fn publish(&self, diagnostic: &OverlayDiagnostic) {
        self.broadcast_event(&ClientEvent::Diagnostic { diagnostic });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let pages = vec!["/a".to_string(), "/[id]".to_string()];
        let json = serde_json::to_string(&ClientEvent::RoutesChanged { pages: &pages }).unwrap();
        assert_eq!(json, r#"{"event":"routesChanged","pages":["/a","/[id]"]}"#);
    }

    #[test]
    fn test_broadcast_without_clients_is_noop() {
        let hub = ReloadHub::new();
        hub.routes_changed(vec!["/a".to_string()]);
        assert_eq!(hub.client_count(), 0);
    }
}

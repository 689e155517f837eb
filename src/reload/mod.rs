//! Reload notification channel.
//!
//! Browser tabs connect over WebSocket; route-table changes and overlay
//! diagnostics are pushed to them as JSON events.

mod hub;
pub mod server;

pub use hub::ReloadHub;
pub use server::start_ws_server;

/// Default WebSocket port for reload notifications
pub const DEFAULT_WS_PORT: u16 = 35729;

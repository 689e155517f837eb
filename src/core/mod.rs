//! Core types shared across the server: URL paths, readiness, shutdown.

mod gate;
mod state;
mod url;

pub use gate::ReadyGate;
pub use state::{is_shutdown, register_server, setup_shutdown_handler};
pub use url::{DecodeError, UrlPath};

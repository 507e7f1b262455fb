//! Transport shell for the sandboxed execution engine: configuration,
//! logging init, and the HTTP/JSON + WebSocket routes of §6. Everything
//! that actually runs code lives in `sbx-io`, `sbx-container`,
//! `sbx-runners`, and `sbx-interactive`; this crate only wires them to a
//! network-facing API.

pub mod config;
pub mod error;
pub mod routes;
pub mod state;

pub use config::Config;
pub use state::AppState;

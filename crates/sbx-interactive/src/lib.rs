//! Interactive Session Coordinator (§4.4): maps sessionIDs to long-lived,
//! TTY-attached containers and bridges a client's bidirectional stream to
//! the container's stdio.

pub mod ansi;
pub mod commands;
pub mod error;
pub mod registry;
pub mod session;

pub use error::{InteractiveError, Result};
pub use registry::SessionRegistry;
pub use session::{Language, Session, SessionImages};

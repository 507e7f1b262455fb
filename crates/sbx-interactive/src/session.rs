//! `Session`: a stable sessionID bound to a long-lived, TTY-attached
//! container (§3, §4.4).

use sbx_container::SandboxContainer;
use sbx_io::Workspace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    Python,
    Java,
}

/// One interactive session: a container with `tty: true` and stdin open,
/// whose entry point tails [`crate::commands::COMMAND_FILE`] for
/// newline-delimited commands, bound to the workspace it was started
/// with. Owned exclusively by the [`crate::registry::SessionRegistry`]
/// that created it.
pub struct Session {
    pub container: SandboxContainer,
    pub workspace: Workspace,
    pub language: Language,
}

/// The images the coordinator starts sessions from, one per interactive
/// language. Distinct from the batch runners' image set: session images
/// additionally carry the in-image command listener.
#[derive(Debug, Clone)]
pub struct SessionImages {
    pub python: String,
    pub java: String,
}

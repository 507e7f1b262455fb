//! IO Core: base64 validation, workspace layout, framed-stdio demultiplexing,
//! artifact collection and memory-size parsing for the sandboxed execution
//! engine. Every function here is pure or filesystem-scoped; none of them
//! know about containers or HTTP.

pub mod artifacts;
pub mod base64;
pub mod demux;
pub mod error;
pub mod memsize;
pub mod sanitize;
pub mod workspace;

pub use artifacts::{collect_artifacts, infer_mime_type, Artifact};
pub use base64::{decode_base64, encode_base64, is_valid_base64};
pub use demux::{demux_stdio, Demuxer};
pub use error::{IoError, Result};
pub use memsize::parse_memory_limit;
pub use sanitize::{NoopSanitizer, Sanitizer};
pub use workspace::{java_qualified_name, layout_workspace, LayoutOptions, Workspace};

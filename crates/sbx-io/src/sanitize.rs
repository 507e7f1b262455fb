//! Source-code sanitization.
//!
//! Per scope, sanitization is "a pluggable predicate+rewriter, not
//! implemented" — whether the rules are a security boundary or a UX hint is
//! an open question in the source this engine is modeled on, so this module
//! only fixes the seam: a [`Sanitizer`] trait `layoutWorkspace` calls before
//! writing each file, and a [`NoopSanitizer`] default that accepts
//! everything unmodified. Real rule sets are supplied by the deployment,
//! not by this crate.

/// Pre-write hook over a decoded file's contents. Implementations may
/// reject a file (`Err(reason)`) or rewrite its bytes before it is written
/// into the workspace.
pub trait Sanitizer: Send + Sync {
    fn sanitize(&self, filename: &str, content: Vec<u8>) -> Result<Vec<u8>, String>;
}

/// Accepts every file unmodified. The default used where no deployment
/// rule set is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSanitizer;

impl Sanitizer for NoopSanitizer {
    fn sanitize(&self, _filename: &str, content: Vec<u8>) -> Result<Vec<u8>, String> {
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_sanitizer_passes_content_through() {
        let sanitizer = NoopSanitizer;
        let content = b"print('hi')".to_vec();
        assert_eq!(sanitizer.sanitize("main.py", content.clone()).unwrap(), content);
    }
}

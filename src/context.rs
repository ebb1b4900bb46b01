//! Background document the chatbot answers from.

use std::path::Path;
use std::sync::Arc;

/// Characters of the context file that make it into prompts.
pub const MAX_CONTEXT_CHARS: usize = 3000;

/// Immutable context text, loaded once at startup and shared by every request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextDocument(Arc<str>);

impl Default for ContextDocument {
    fn default() -> Self {
        Self(Arc::from(""))
    }
}

impl ContextDocument {
    /// Read the context file. A missing or unreadable file yields an empty document.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(raw) => {
                let doc = Self::from_text(&raw);
                tracing::info!(path = %path.display(), chars = doc.char_count(), "loaded context document");
                doc
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "could not read context document, answering without it");
                Self::default()
            }
        }
    }

    pub fn from_text(raw: &str) -> Self {
        Self(Arc::from(truncate_chars(raw, MAX_CONTEXT_CHARS)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn char_count(&self) -> usize {
        self.0.chars().count()
    }
}

/// Longest prefix of `s` holding at most `max` characters.
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_is_empty_document() {
        let dir = tempfile::tempdir().unwrap();
        let doc = ContextDocument::load(dir.path().join("nope.txt"));
        assert!(doc.is_empty());
    }

    #[test]
    fn invalid_utf8_is_empty_document() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(&[0xff, 0xfe, 0x00]).unwrap();
        assert!(ContextDocument::load(f.path()).is_empty());
    }

    #[test]
    fn long_file_is_cut_to_limit() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, "{}", "é".repeat(MAX_CONTEXT_CHARS + 50)).unwrap();
        let doc = ContextDocument::load(f.path());
        assert_eq!(doc.char_count(), MAX_CONTEXT_CHARS);
    }

    #[test]
    fn short_text_is_kept_verbatim() {
        let doc = ContextDocument::from_text("  Ada ships compilers.\n");
        assert_eq!(doc.as_str(), "  Ada ships compilers.\n");
    }

    #[test]
    fn truncate_chars_respects_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("hi", 5), "hi");
        assert_eq!(truncate_chars("", 0), "");
        assert_eq!(truncate_chars("abc", 0), "");
    }
}

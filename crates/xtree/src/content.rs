//! Text accumulation for the element currently open

use std::str::Utf8Error;

use crate::tree::Content;

/// Collects character data and CDATA delivered in fragments for one element.
///
/// Each push returns the content the element should now hold; `None` means
/// value and provenance are both cleared. The last push decides provenance.
#[derive(Clone, Debug, Default)]
pub struct ContentAccumulator {
    buffer: String,
}

impl ContentAccumulator {
    pub const fn new() -> Self {
        Self {
            buffer: String::new(),
        }
    }

    /// Forget everything collected so far (new element opened)
    pub fn reset(&mut self) {
        self.buffer.clear();
    }

    pub fn as_str(&self) -> &str {
        &self.buffer
    }

    /// Character-data path
    pub fn push_text(&mut self, chunk: &str) -> Option<Content> {
        self.buffer.push_str(chunk);
        if self.buffer.is_empty() {
            None
        } else {
            Some(Content::text(self.buffer.as_str()))
        }
    }

    /// CDATA path. Undecodable bytes leave the buffer untouched and return
    /// the decode error for the caller to drop.
    ///
    /// An empty section clears the value even when earlier fragments were
    /// collected.
    pub fn push_cdata(&mut self, bytes: &[u8]) -> Result<Option<Content>, Utf8Error> {
        let chunk = std::str::from_utf8(bytes)?;
        self.buffer.push_str(chunk);
        if chunk.is_empty() {
            Ok(None)
        } else {
            Ok(Some(Content::cdata(self.buffer.as_str())))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_fragments_concatenate() {
        let mut acc = ContentAccumulator::new();
        assert_eq!(acc.push_text("a"), Some(Content::text("a")));
        assert_eq!(acc.push_text("b"), Some(Content::text("ab")));
    }

    #[test]
    fn test_empty_text_with_empty_buffer_clears() {
        let mut acc = ContentAccumulator::new();
        assert_eq!(acc.push_text(""), None);
    }

    #[test]
    fn test_empty_text_keeps_buffer() {
        let mut acc = ContentAccumulator::new();
        acc.push_text("x");
        assert_eq!(acc.push_text(""), Some(Content::text("x")));
    }

    #[test]
    fn test_cdata_after_text_is_cdata() {
        let mut acc = ContentAccumulator::new();
        acc.push_text("a");
        assert_eq!(acc.push_cdata(b"b"), Ok(Some(Content::cdata("ab"))));
    }

    #[test]
    fn test_text_after_cdata_is_text() {
        let mut acc = ContentAccumulator::new();
        let _ = acc.push_cdata(b"a");
        assert_eq!(acc.push_text("b"), Some(Content::text("ab")));
    }

    #[test]
    fn test_empty_cdata_clears() {
        let mut acc = ContentAccumulator::new();
        acc.push_text("a");
        assert_eq!(acc.push_cdata(b""), Ok(None));
        assert_eq!(acc.as_str(), "a");
    }

    #[test]
    fn test_invalid_cdata_is_rejected_without_touching_buffer() {
        let mut acc = ContentAccumulator::new();
        acc.push_text("a");
        assert!(acc.push_cdata(&[0xff, 0xfe]).is_err());
        assert_eq!(acc.as_str(), "a");
    }

    #[test]
    fn test_reset() {
        let mut acc = ContentAccumulator::new();
        acc.push_text("abc");
        acc.reset();
        assert_eq!(acc.as_str(), "");
        assert_eq!(acc.push_text("d"), Some(Content::text("d")));
    }
}

//! Line splitting for newline-delimited JSON response bodies.
//!
//! HTTP chunks do not respect line boundaries, so bytes are buffered until a
//! full line is available.

use serde::de::DeserializeOwned;

use crate::error::{Error, Result};

#[derive(Debug, Default)]
pub(crate) struct LineBuffer {
    buf: Vec<u8>,
}

impl LineBuffer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Next complete, non-blank line without its terminator.
    pub(crate) fn next_line(&mut self) -> Option<String> {
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buf.drain(..=pos).collect();
            let text = String::from_utf8_lossy(&line);
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
        None
    }

    /// Whatever is left once the body has ended, if it is not blank.
    pub(crate) fn take_remainder(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.buf);
        let text = String::from_utf8_lossy(&rest);
        let trimmed = text.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }
}

pub(crate) fn parse_line<T: DeserializeOwned>(line: &str) -> Result<T> {
    serde_json::from_str(line).map_err(|e| Error::InvalidResponse(format!("{}: {}", e, line)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_split_across_chunks() {
        let mut lines = LineBuffer::new();
        lines.push(b"{\"a\":");
        assert!(lines.next_line().is_none());
        lines.push(b"1}\n{\"a\":2}\n{\"a\"");
        assert_eq!(lines.next_line().as_deref(), Some("{\"a\":1}"));
        assert_eq!(lines.next_line().as_deref(), Some("{\"a\":2}"));
        assert!(lines.next_line().is_none());
        lines.push(b":3}");
        assert_eq!(lines.take_remainder().as_deref(), Some("{\"a\":3}"));
        assert!(lines.take_remainder().is_none());
    }

    #[test]
    fn test_blank_lines_skipped() {
        let mut lines = LineBuffer::new();
        lines.push(b"\n\r\n  \n{}\r\n");
        assert_eq!(lines.next_line().as_deref(), Some("{}"));
        assert!(lines.next_line().is_none());
    }

    #[test]
    fn test_parse_line_error_keeps_input() {
        let err = parse_line::<serde_json::Value>("not json").unwrap_err();
        assert!(matches!(err, Error::InvalidResponse(ref m) if m.contains("not json")));
    }
}

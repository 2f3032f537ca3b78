// src/assembler.rs
//! Reassembles arbitrarily chunked job output into complete lines.
//!
//! Bytes are buffered until a `\n` arrives, so a chunk boundary may fall
//! anywhere: inside a line, between `\r` and `\n`, or in the middle of a
//! multi-byte UTF-8 sequence. Decoding happens per complete line only.

use crate::error::{ReportError, Result};
use crate::types::{JobId, RawLine};

/// Per-job line buffer.
#[derive(Debug)]
pub struct LineAssembler {
    job: JobId,
    pending: Vec<u8>,
    next_seq: u64,
    closed: bool,
}

impl LineAssembler {
    #[must_use]
    pub fn new(job: JobId) -> Self {
        Self {
            job,
            pending: Vec::new(),
            next_seq: 0,
            closed: false,
        }
    }

    #[must_use]
    pub fn job(&self) -> &JobId {
        &self.job
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Number of lines produced so far.
    #[must_use]
    pub fn line_count(&self) -> u64 {
        self.next_seq
    }

    /// Appends a chunk and returns every line it completed, in order.
    ///
    /// # Errors
    /// Returns `JobClosed` if the assembler was already closed.
    pub fn feed(&mut self, chunk: impl AsRef<[u8]>) -> Result<Vec<RawLine>> {
        if self.closed {
            return Err(ReportError::JobClosed(self.job.clone()));
        }

        let mut lines = Vec::new();
        let mut rest = chunk.as_ref();
        while let Some(pos) = rest.iter().position(|&b| b == b'\n') {
            self.pending.extend_from_slice(&rest[..pos]);
            lines.push(self.take_line());
            rest = &rest[pos + 1..];
        }
        self.pending.extend_from_slice(rest);
        Ok(lines)
    }

    /// Retires the assembler, returning the trailing unterminated line if any.
    ///
    /// # Errors
    /// Returns `JobClosed` if called twice.
    pub fn close(&mut self) -> Result<Option<RawLine>> {
        if self.closed {
            return Err(ReportError::JobClosed(self.job.clone()));
        }
        self.closed = true;

        if self.pending.is_empty() {
            return Ok(None);
        }
        Ok(Some(self.take_line()))
    }

    fn take_line(&mut self) -> RawLine {
        let mut bytes = std::mem::take(&mut self.pending);
        if bytes.last() == Some(&b'\r') {
            bytes.pop();
        }
        let text = match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
        };

        let line = RawLine {
            job: self.job.clone(),
            seq: self.next_seq,
            text,
        };
        self.next_seq += 1;
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(lines: &[RawLine]) -> Vec<&str> {
        lines.iter().map(|l| l.text.as_str()).collect()
    }

    #[test]
    fn test_split_line_across_chunks() -> Result<()> {
        let mut asm = LineAssembler::new(JobId::new("a"));
        assert!(asm.feed("hel")?.is_empty());
        let lines = asm.feed("lo\nwor")?;
        assert_eq!(texts(&lines), vec!["hello"]);
        assert_eq!(lines[0].seq, 0);
        let tail = asm.close()?;
        assert_eq!(tail.map(|l| (l.seq, l.text)), Some((1, "wor".to_string())));
        Ok(())
    }

    #[test]
    fn test_crlf_split_between_chunks() -> Result<()> {
        let mut asm = LineAssembler::new(JobId::new("a"));
        assert!(asm.feed("one\r")?.is_empty());
        let lines = asm.feed("\ntwo\r\n")?;
        assert_eq!(texts(&lines), vec!["one", "two"]);
        assert_eq!(asm.close()?, None);
        Ok(())
    }

    #[test]
    fn test_multibyte_split() -> Result<()> {
        let bytes = "caf\u{e9}\n".as_bytes();
        let mut asm = LineAssembler::new(JobId::new("a"));
        assert!(asm.feed(&bytes[..4])?.is_empty());
        let lines = asm.feed(&bytes[4..])?;
        assert_eq!(texts(&lines), vec!["caf\u{e9}"]);
        Ok(())
    }

    #[test]
    fn test_empty_chunks_and_blank_lines() -> Result<()> {
        let mut asm = LineAssembler::new(JobId::new("a"));
        assert!(asm.feed("")?.is_empty());
        let lines = asm.feed("\n\nx\n")?;
        assert_eq!(texts(&lines), vec!["", "", "x"]);
        assert_eq!(asm.line_count(), 3);
        Ok(())
    }

    #[test]
    fn test_use_after_close_is_usage_fault() -> Result<()> {
        let mut asm = LineAssembler::new(JobId::new("a"));
        asm.close()?;
        let err = asm.feed("late\n");
        assert!(matches!(err, Err(ReportError::JobClosed(_))));
        assert!(matches!(asm.close(), Err(ReportError::JobClosed(_))));
        Ok(())
    }
}

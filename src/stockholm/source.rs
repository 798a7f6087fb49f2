//! Line-at-a-time input with line numbering.

use std::io::BufRead;

use super::error::{ErrorKind, ParseError};

/// Pulls lines from a buffered reader into a reusable buffer.
///
/// Lines may be arbitrarily long; the buffer grows to fit.
pub struct LineSource<R> {
    reader: R,
    bytes: Vec<u8>,
    buf: String,
    line_number: u64,
}

impl<R: BufRead> LineSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            bytes: Vec::new(),
            buf: String::new(),
            line_number: 0,
        }
    }

    /// Read the next line. Returns `Ok(false)` at end of input.
    ///
    /// A line that is not valid UTF-8 is a lexical error citing that line.
    pub fn advance(&mut self) -> Result<bool, ParseError> {
        self.bytes.clear();
        self.buf.clear();
        let n = self
            .reader
            .read_until(b'\n', &mut self.bytes)
            .map_err(|e| ParseError::io(e, self.line_number))?;
        if n == 0 {
            return Ok(false);
        }
        self.line_number += 1;

        let end = self
            .bytes
            .iter()
            .rposition(|&b| b != b'\n' && b != b'\r')
            .map_or(0, |i| i + 1);
        let line = &self.bytes[..end];
        match std::str::from_utf8(line) {
            Ok(text) => {
                self.buf.push_str(text);
                Ok(true)
            }
            Err(e) => Err(ParseError::new(
                ErrorKind::InvalidEncoding,
                self.line_number,
                String::from_utf8_lossy(line),
                format!("line is not valid UTF-8: {e}"),
            )),
        }
    }

    /// The current line, without its terminator.
    pub fn line(&self) -> &str {
        &self.buf
    }

    /// 1-based number of the current line; 0 before the first read.
    pub fn line_number(&self) -> u64 {
        self.line_number
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numbering_and_terminators() {
        let mut source = LineSource::new("a\r\nbb\n\nccc".as_bytes());
        assert!(source.advance().unwrap());
        assert_eq!((source.line_number(), source.line()), (1, "a"));
        assert!(source.advance().unwrap());
        assert_eq!((source.line_number(), source.line()), (2, "bb"));
        assert!(source.advance().unwrap());
        assert_eq!((source.line_number(), source.line()), (3, ""));
        assert!(source.advance().unwrap());
        assert_eq!((source.line_number(), source.line()), (4, "ccc"));
        assert!(!source.advance().unwrap());
        assert_eq!(source.line_number(), 4);
    }

    #[test]
    fn test_long_line() {
        let long = "A".repeat(100_000);
        let input = format!("seq {long}\n");
        let mut source = LineSource::new(input.as_bytes());
        assert!(source.advance().unwrap());
        assert_eq!(source.line().len(), 100_004);
    }

    #[test]
    fn test_invalid_utf8_cites_line() {
        let input: &[u8] = b"# STOCKHOLM 1.0\nseq1 AC\nseq2 A\xFFC\n//\n";
        let mut source = LineSource::new(input);
        assert!(source.advance().unwrap());
        assert!(source.advance().unwrap());
        let err = source.advance().unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidEncoding);
        assert_eq!(err.line_number, 3);
        assert_eq!(err.line, "seq2 A\u{FFFD}C");
        assert_eq!(source.line_number(), 3);

        // The source moves on past the bad line.
        assert!(source.advance().unwrap());
        assert_eq!(source.line(), "//");
    }
}

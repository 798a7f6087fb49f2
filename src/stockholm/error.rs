//! Stockholm parse errors.
//!
//! Every error carries the line number and the text of the offending line
//! so that it can be shown to a user as-is.

use std::collections::TryReserveError;

use strum::Display;
use thiserror::Error;

/// Broad class of a parse failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum ErrorCategory {
    /// Block layout or record structure is wrong.
    Structural,
    /// A line could not be tokenized.
    Lexical,
    /// Residue data rejected by the alphabet.
    Content,
    /// Allocation failed; not caused by the input.
    Resource,
    /// The underlying reader failed.
    Io,
}

/// Specific kind of parse failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    MissingHeader,
    MissingTerminator,
    NoAlignmentData,
    UnexpectedHeader,
    /// Block ended before reaching the end of the first block's layout.
    BlockTooShort,
    /// Block has more lines than the first block.
    BlockTooLong,
    /// Wrong line kind at a template position.
    UnexpectedLineKind,
    /// Wrong sequence name at a template position.
    UnexpectedSequence,
    /// Sequence name first seen after the first block.
    UnknownSequence,
    /// Annotation tag first seen after the first block.
    UnknownTag,
    /// Same entity given twice in one block, or a non-repeatable tag repeated.
    DuplicateLine,
    /// Entity skipped in an earlier block.
    OutOfSync,
    /// Aligned text width differs from the rest of the block.
    LengthMismatch,
    /// A named sequence never received residues.
    MissingSequenceData,
    /// Some but not all sequences have a weight.
    MissingWeight,
    UnknownAnnotation,
    MissingField,
    ExtraFields,
    BadThreshold,
    BadWeight,
    /// Input line is not valid UTF-8.
    InvalidEncoding,
    InvalidResidue,
    Resource,
    Io,
}

impl ErrorKind {
    pub fn category(&self) -> ErrorCategory {
        use ErrorKind::*;
        match self {
            MissingHeader | MissingTerminator | NoAlignmentData | UnexpectedHeader
            | BlockTooShort | BlockTooLong | UnexpectedLineKind | UnexpectedSequence
            | UnknownSequence | UnknownTag | DuplicateLine | OutOfSync | LengthMismatch
            | MissingSequenceData | MissingWeight => ErrorCategory::Structural,
            UnknownAnnotation | MissingField | ExtraFields | BadThreshold | BadWeight
            | InvalidEncoding => ErrorCategory::Lexical,
            InvalidResidue => ErrorCategory::Content,
            Resource => ErrorCategory::Resource,
            Io => ErrorCategory::Io,
        }
    }
}

/// A failed read of one Stockholm record.
#[derive(Error, Debug)]
#[error("parse failed (line {line_number}): {message}\n  {line}")]
pub struct ParseError {
    pub kind: ErrorKind,
    /// 1-based line number; 0 if no line had been read.
    pub line_number: u64,
    /// Text of the offending line, without its line terminator.
    pub line: String,
    pub message: String,
    #[source]
    pub source: Option<std::io::Error>,
}

impl ParseError {
    pub fn new(
        kind: ErrorKind,
        line_number: u64,
        line: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            line_number,
            line: line.into(),
            message: message.into(),
            source: None,
        }
    }

    pub fn io(err: std::io::Error, line_number: u64) -> Self {
        Self {
            kind: ErrorKind::Io,
            line_number,
            line: String::new(),
            message: format!("read error: {err}"),
            source: Some(err),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        self.kind.category()
    }
}

/// Error raised below the line level, before the driver attaches the
/// line number and text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct LineError {
    pub kind: ErrorKind,
    pub message: String,
}

impl LineError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Attach the position of the offending line.
    pub fn at(self, line_number: u64, line: &str) -> ParseError {
        ParseError::new(self.kind, line_number, line, self.message)
    }
}

impl From<TryReserveError> for LineError {
    fn from(err: TryReserveError) -> Self {
        LineError::new(ErrorKind::Resource, format!("allocation failed: {err}"))
    }
}

impl From<indexmap::TryReserveError> for LineError {
    fn from(err: indexmap::TryReserveError) -> Self {
        LineError::new(ErrorKind::Resource, format!("allocation failed: {err}"))
    }
}

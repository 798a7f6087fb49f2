//! Stockholm line classification.
//!
//! Each input line maps to exactly one [`LineEvent`], decided by its
//! leading token alone. Classification never looks at parse state.

use super::error::{ErrorKind, LineError};

/// A classified Stockholm line. Text fields borrow from the input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineEvent<'a> {
    /// Empty or whitespace-only line.
    Blank,
    /// `# STOCKHOLM <version>`
    Header { version: &'a str },
    /// `//`
    RecordEnd,
    /// `# free text`
    Comment(&'a str),
    /// `#=GF <tag> <text>`
    FileAnnotation { tag: &'a str, text: &'a str },
    /// `#=GS <seqname> <tag> <text>`
    SeqAnnotation {
        seqname: &'a str,
        tag: &'a str,
        text: &'a str,
    },
    /// `#=GC <tag> <aligned text>`
    ColumnAnnotation { tag: &'a str, text: &'a str },
    /// `#=GR <seqname> <tag> <aligned text>`
    ResidueAnnotation {
        seqname: &'a str,
        tag: &'a str,
        text: &'a str,
    },
    /// `<seqname> <aligned text>`
    SequenceData { seqname: &'a str, text: &'a str },
}

fn is_field_sep(c: char) -> bool {
    c == ' ' || c == '\t'
}

/// Split off the next whitespace-delimited token.
fn next_token(s: &str) -> Option<(&str, &str)> {
    let s = s.trim_start_matches(is_field_sep);
    if s.is_empty() {
        return None;
    }
    let end = s.find(is_field_sep).unwrap_or(s.len());
    Some((&s[..end], &s[end..]))
}

fn required<'a>(s: &'a str, what: &str, field: &str) -> Result<(&'a str, &'a str), LineError> {
    next_token(s).ok_or_else(|| {
        LineError::new(ErrorKind::MissingField, format!("{what} line is missing its {field}"))
    })
}

/// Aligned text is exactly one token.
fn aligned_text<'a>(s: &'a str, what: &str) -> Result<&'a str, LineError> {
    let (text, extra) = required(s, what, "aligned text")?;
    if !extra.trim().is_empty() {
        return Err(LineError::new(
            ErrorKind::ExtraFields,
            format!("{what} line has whitespace inside its aligned text"),
        ));
    }
    Ok(text)
}

/// Classify one raw input line.
pub fn classify(raw: &str) -> Result<LineEvent<'_>, LineError> {
    let line = raw.trim_start_matches(is_field_sep).trim_end();

    if line.is_empty() {
        return Ok(LineEvent::Blank);
    }
    if line.starts_with("//") {
        return Ok(LineEvent::RecordEnd);
    }
    if let Some(version) = line.strip_prefix("# STOCKHOLM") {
        return Ok(LineEvent::Header {
            version: version.trim(),
        });
    }

    if line.starts_with("#=") {
        let (family, rest) = required(line, "annotation", "family")?;
        return match family {
            "#=GF" => {
                let (tag, text) = required(rest, "#=GF", "tag")?;
                Ok(LineEvent::FileAnnotation {
                    tag,
                    text: text.trim(),
                })
            }
            "#=GS" => {
                let (seqname, rest) = required(rest, "#=GS", "sequence name")?;
                let (tag, text) = required(rest, "#=GS", "tag")?;
                Ok(LineEvent::SeqAnnotation {
                    seqname,
                    tag,
                    text: text.trim(),
                })
            }
            "#=GC" => {
                let (tag, rest) = required(rest, "#=GC", "tag")?;
                Ok(LineEvent::ColumnAnnotation {
                    tag,
                    text: aligned_text(rest, "#=GC")?,
                })
            }
            "#=GR" => {
                let (seqname, rest) = required(rest, "#=GR", "sequence name")?;
                let (tag, rest) = required(rest, "#=GR", "tag")?;
                Ok(LineEvent::ResidueAnnotation {
                    seqname,
                    tag,
                    text: aligned_text(rest, "#=GR")?,
                })
            }
            other => Err(LineError::new(
                ErrorKind::UnknownAnnotation,
                format!("unrecognized annotation family {other}"),
            )),
        };
    }

    if let Some(comment) = line.strip_prefix('#') {
        return Ok(LineEvent::Comment(comment.trim_start()));
    }

    let (seqname, rest) = required(line, "sequence", "name")?;
    Ok(LineEvent::SequenceData {
        seqname,
        text: aligned_text(rest, "sequence")?,
    })
}

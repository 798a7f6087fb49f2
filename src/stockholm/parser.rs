//! Stockholm format parser.
//!
//! [`Reader`] pulls one record at a time from a line source. Lines are
//! classified by [`classify`], then handed to one handler per line kind.
//! Block layout is checked as each line arrives (see [`ParseState`]), so
//! the first violation aborts the record with the offending line attached.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use flate2::read::MultiGzDecoder;
use log::debug;

use super::error::{ErrorKind, LineError, ParseError};
use super::line::{LineEvent, classify};
use super::source::LineSource;
use super::state::{BlockLineKind, ParseState, Target};
use super::types::*;
use crate::alphabet::Alphabet;

/// Reads Stockholm records from a buffered reader.
pub struct Reader<R> {
    source: LineSource<R>,
    alphabet: Option<Alphabet>,
    failed: bool,
}

impl<R: BufRead> Reader<R> {
    /// Create a text-mode reader.
    pub fn new(reader: R) -> Self {
        Self {
            source: LineSource::new(reader),
            alphabet: None,
            failed: false,
        }
    }

    /// Validate and digitize sequence lines with `alphabet`.
    pub fn with_alphabet(mut self, alphabet: Alphabet) -> Self {
        self.alphabet = Some(alphabet);
        self
    }

    /// Number of the last line consumed.
    pub fn line_number(&self) -> u64 {
        self.source.line_number()
    }

    fn advance(&mut self) -> Result<bool, ParseError> {
        self.source.advance()
    }

    /// Read the next record.
    ///
    /// Returns `Ok(None)` if the input ends before another header. On error
    /// the source is left just past the offending line.
    pub fn read(&mut self) -> Result<Option<Alignment>, ParseError> {
        loop {
            if !self.advance()? {
                return Ok(None);
            }
            let line = self.source.line();
            match classify(line) {
                Ok(LineEvent::Blank | LineEvent::Comment(_)) => continue,
                Ok(LineEvent::Header { version }) if version.starts_with("1.") => break,
                _ => {
                    return Err(ParseError::new(
                        ErrorKind::MissingHeader,
                        self.source.line_number(),
                        line,
                        "missing Stockholm header",
                    ));
                }
            }
        }
        debug!("Stockholm header at line {}", self.source.line_number());

        let mut msa = Alignment::new();
        msa.alphabet = self.alphabet.as_ref().map(Alphabet::kind);
        let mut state = ParseState::new();

        loop {
            if !self.advance()? {
                return Err(ParseError::new(
                    ErrorKind::MissingTerminator,
                    self.source.line_number(),
                    "",
                    "missing // terminator after alignment",
                ));
            }
            let number = self.source.line_number();
            let line = self.source.line();
            let end = dispatch(&mut state, &mut msa, self.alphabet.as_ref(), line)
                .map_err(|e| e.at(number, line))?;
            if end {
                break;
            }
        }

        let number = self.source.line_number();
        state
            .finish(&mut msa)
            .map_err(|e| e.at(number, self.source.line()))?;
        Ok(Some(msa))
    }
}

impl<R: BufRead> Iterator for Reader<R> {
    type Item = Result<Alignment, ParseError>;

    /// Yields records until end of input or the first error.
    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let result = self.read().transpose();
        if matches!(result, Some(Err(_))) {
            self.failed = true;
        }
        result
    }
}

/// Route one line to its handler. Returns `true` at the record terminator.
fn dispatch(
    state: &mut ParseState,
    msa: &mut Alignment,
    abc: Option<&Alphabet>,
    line: &str,
) -> Result<bool, LineError> {
    match classify(line)? {
        LineEvent::Blank => state.close_block()?,
        LineEvent::RecordEnd => {
            state.close_block()?;
            return Ok(true);
        }
        LineEvent::Header { .. } => {
            return Err(LineError::new(
                ErrorKind::UnexpectedHeader,
                "Stockholm header inside a record; missing // before it?",
            ));
        }
        LineEvent::Comment(text) => msa.comments.push(text.to_string()),
        LineEvent::FileAnnotation { tag, text } => parse_gf(msa, tag, text)?,
        LineEvent::SeqAnnotation { seqname, tag, text } => {
            parse_gs(state, msa, seqname, tag, text)?
        }
        LineEvent::ColumnAnnotation { tag, text } => parse_gc(state, msa, tag, text)?,
        LineEvent::ResidueAnnotation { seqname, tag, text } => {
            parse_gr(state, msa, seqname, tag, text)?
        }
        LineEvent::SequenceData { seqname, text } => {
            parse_sequence(state, msa, abc, seqname, text)?
        }
    }
    Ok(false)
}

fn set_once<T>(slot: &mut Option<T>, value: T, what: &str) -> Result<(), LineError> {
    if slot.is_some() {
        return Err(LineError::new(
            ErrorKind::DuplicateLine,
            format!("{what} appears more than once"),
        ));
    }
    *slot = Some(value);
    Ok(())
}

fn require_text(text: &str, what: &str) -> Result<(), LineError> {
    if text.is_empty() {
        return Err(LineError::new(
            ErrorKind::MissingField,
            format!("{what} line has no value"),
        ));
    }
    Ok(())
}

/// Join continuation lines of DE and AU with a space.
fn append_words(slot: &mut Option<String>, text: &str) {
    match slot {
        Some(prev) => {
            prev.push(' ');
            prev.push_str(text);
        }
        None => *slot = Some(text.to_string()),
    }
}

/// Parse `<value> [<value>]`. Pfam terminates each value with `;`.
fn parse_threshold(tag: &str, text: &str) -> Result<Threshold, LineError> {
    let bad = || {
        LineError::new(
            ErrorKind::BadThreshold,
            format!("#=GF {tag} needs one or two numeric thresholds, got {text:?}"),
        )
    };
    let mut values = text
        .split_whitespace()
        .map(|tok| tok.trim_end_matches(';').parse::<f64>());

    let first = match values.next() {
        Some(Ok(v)) => v,
        _ => return Err(bad()),
    };
    let second = match values.next() {
        None => None,
        Some(Ok(v)) => Some(v),
        Some(Err(_)) => return Err(bad()),
    };
    if values.next().is_some() {
        return Err(bad());
    }
    Ok(Threshold(first, second))
}

/// `#=GF <tag> <text>`
fn parse_gf(msa: &mut Alignment, tag: &str, text: &str) -> Result<(), LineError> {
    match tag {
        "ID" | "AC" | "DE" | "AU" => require_text(text, &format!("#=GF {tag}"))?,
        _ => {}
    }
    match tag {
        "ID" => set_once(&mut msa.name, text.to_string(), "#=GF ID"),
        "AC" => set_once(&mut msa.accession, text.to_string(), "#=GF AC"),
        "DE" => {
            append_words(&mut msa.description, text);
            Ok(())
        }
        "AU" => {
            append_words(&mut msa.author, text);
            Ok(())
        }
        "GA" => set_once(&mut msa.cutoffs.ga, parse_threshold(tag, text)?, "#=GF GA"),
        "NC" => set_once(&mut msa.cutoffs.nc, parse_threshold(tag, text)?, "#=GF NC"),
        "TC" => set_once(&mut msa.cutoffs.tc, parse_threshold(tag, text)?, "#=GF TC"),
        _ => {
            msa.file_annotations.push(FileAnnotation {
                tag: tag.to_string(),
                value: text.to_string(),
            });
            Ok(())
        }
    }
}

/// `#=GS <seqname> <tag> <text>`
fn parse_gs(
    state: &mut ParseState,
    msa: &mut Alignment,
    seqname: &str,
    tag: &str,
    text: &str,
) -> Result<(), LineError> {
    let idx = state.resolve_seq(msa, seqname, true)?;
    let what = format!("#=GS {seqname} {tag}");

    match tag {
        "AC" => {
            require_text(text, &what)?;
            set_once(&mut msa.sequences[idx].accession, text.to_string(), &what)
        }
        "DE" => {
            require_text(text, &what)?;
            set_once(&mut msa.sequences[idx].description, text.to_string(), &what)
        }
        "WT" => {
            let weight = text.parse::<f64>().map_err(|_| {
                LineError::new(
                    ErrorKind::BadWeight,
                    format!("{what} is not a number: {text:?}"),
                )
            })?;
            set_once(&mut msa.sequences[idx].weight, weight, &what)
        }
        _ => {
            let tagidx = state.gs_tag(msa, tag)?;
            let slot = &mut msa.gs[tagidx][idx];
            match slot {
                Some(prev) => {
                    prev.push('\n');
                    prev.push_str(text);
                }
                None => *slot = Some(text.to_string()),
            }
            Ok(())
        }
    }
}

/// `#=GC <tag> <aligned text>`
fn parse_gc(
    state: &mut ParseState,
    msa: &mut Alignment,
    tag: &str,
    text: &str,
) -> Result<(), LineError> {
    let target = match tag {
        "SS_cons" => Target::SsCons,
        "SA_cons" => Target::SaCons,
        "PP_cons" => Target::PpCons,
        "RF" => Target::Rf,
        _ => Target::Gc(state.gc_tag(msa, tag)?),
    };
    state.place_column_line(msa)?;
    state.append(msa, target, text, None)
}

/// `#=GR <seqname> <tag> <aligned text>`
fn parse_gr(
    state: &mut ParseState,
    msa: &mut Alignment,
    seqname: &str,
    tag: &str,
    text: &str,
) -> Result<(), LineError> {
    let idx = state.place_seq_line(msa, BlockLineKind::Residue, seqname)?;
    let target = match tag {
        "SS" => Target::Ss(idx),
        "SA" => Target::Sa(idx),
        "PP" => Target::Pp(idx),
        _ => Target::Gr {
            tag: state.gr_tag(msa, tag)?,
            seq: idx,
        },
    };
    state.append(msa, target, text, None)
}

/// `<seqname> <aligned text>`
fn parse_sequence(
    state: &mut ParseState,
    msa: &mut Alignment,
    abc: Option<&Alphabet>,
    seqname: &str,
    text: &str,
) -> Result<(), LineError> {
    let idx = state.place_seq_line(msa, BlockLineKind::Sequence, seqname)?;
    state.append(msa, Target::Residues(idx), text, abc)
}

/// Parse the first Stockholm alignment from a reader.
pub fn parse<R: Read>(reader: R) -> Result<Alignment, ParseError> {
    let mut reader = Reader::new(BufReader::new(reader));
    reader.read()?.ok_or_else(|| {
        ParseError::new(
            ErrorKind::MissingHeader,
            reader.line_number(),
            "",
            "no Stockholm record found",
        )
    })
}

/// Parse a Stockholm alignment from a string.
pub fn parse_str(s: &str) -> Result<Alignment, ParseError> {
    parse(s.as_bytes())
}

/// Parse every record from a reader.
pub fn parse_all<R: Read>(reader: R) -> Result<Vec<Alignment>, ParseError> {
    Reader::new(BufReader::new(reader)).collect()
}

impl Reader<Box<dyn BufRead>> {
    /// Open a Stockholm file for reading, decompressing `.gz` files.
    pub fn open(path: &Path) -> Result<Self, ParseError> {
        let file = File::open(path).map_err(|e| {
            let message = format!("cannot open {}: {e}", path.display());
            ParseError {
                message,
                ..ParseError::io(e, 0)
            }
        })?;
        let inner: Box<dyn BufRead> = if path.extension().is_some_and(|ext| ext == "gz") {
            Box::new(BufReader::new(MultiGzDecoder::new(file)))
        } else {
            Box::new(BufReader::new(file))
        };
        Ok(Reader::new(inner))
    }
}

/// Parse the first Stockholm alignment from a file path.
pub fn parse_file(path: &Path) -> Result<Alignment, ParseError> {
    let mut reader: Reader<Box<dyn BufRead>> = Reader::open(path)?;
    reader.read()?.ok_or_else(|| {
        ParseError::new(
            ErrorKind::MissingHeader,
            reader.line_number(),
            "",
            format!("no Stockholm record in {}", path.display()),
        )
    })
}

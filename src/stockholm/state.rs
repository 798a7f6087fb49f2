//! Block bookkeeping for the Stockholm reader.
//!
//! The first block of a record fixes the layout every later block must
//! repeat: the same number of lines, the same line kinds, the same
//! sequences, in the same order. [`ParseState`] records that layout while
//! the first block streams in and checks each later line against it, so a
//! violation is reported on the line where it happens rather than in a
//! validation pass after the whole record has been read.

use std::collections::{HashMap, TryReserveError};

use log::{debug, trace};
use strum::Display;

use super::error::{ErrorKind, LineError};
use super::types::{Alignment, Sequence};
use crate::alphabet::Alphabet;

/// Kind of a data line inside an alignment block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum BlockLineKind {
    #[strum(to_string = "sequence line")]
    Sequence,
    #[strum(to_string = "#=GC line")]
    Column,
    #[strum(to_string = "#=GR line")]
    Residue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TemplateLine {
    kind: BlockLineKind,
    /// Sequence index for sequence and #=GR lines.
    seq: Option<usize>,
}

/// An aligned string that a block line extends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Residues(usize),
    Ss(usize),
    Sa(usize),
    Pp(usize),
    Gr { tag: usize, seq: usize },
    SsCons,
    SaCons,
    PpCons,
    Rf,
    Gc(usize),
}

/// Make room for one more element, doubling capacity when full.
fn grow<T>(v: &mut Vec<T>) -> Result<(), TryReserveError> {
    if v.len() == v.capacity() {
        v.try_reserve_exact(v.capacity().max(16))?;
    }
    Ok(())
}

/// Working state for one record. Dropped once the record is finalized.
#[derive(Debug, Default)]
pub struct ParseState {
    /// Line layout of the first block.
    template: Vec<TemplateLine>,
    /// Position in `template` within the current block.
    cursor: usize,
    /// Completed blocks.
    nblocks: usize,
    in_block: bool,
    /// Columns contributed by completed blocks.
    alen: usize,
    /// Aligned width of the current block, set by its first data line.
    block_span: Option<usize>,
    /// Sequence index expected next.
    guess: usize,
    names: HashMap<String, usize>,

    sqlen: Vec<usize>,
    sslen: Vec<usize>,
    salen: Vec<usize>,
    pplen: Vec<usize>,
    ss_cons_len: usize,
    sa_cons_len: usize,
    pp_cons_len: usize,
    rf_len: usize,
    gc_len: Vec<usize>,
    /// [tag][seq]
    gr_len: Vec<Vec<usize>>,
}

impl ParseState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn in_block(&self) -> bool {
        self.in_block
    }

    pub fn nblocks(&self) -> usize {
        self.nblocks
    }

    /// Columns from completed blocks.
    pub fn alen(&self) -> usize {
        self.alen
    }

    fn in_first_block(&self) -> bool {
        self.nblocks == 0
    }

    /// Find the index of sequence `name`, adding it if this is still the
    /// first block. `advance` moves the guess past the resolved index.
    pub fn resolve_seq(
        &mut self,
        msa: &mut Alignment,
        name: &str,
        advance: bool,
    ) -> Result<usize, LineError> {
        let idx = match self.lookup_seq(msa, name) {
            Some(idx) => idx,
            None if self.in_first_block() => self.add_sequence(msa, name)?,
            None => {
                return Err(LineError::new(
                    ErrorKind::UnknownSequence,
                    format!("unrecognized sequence {name} introduced after the first block"),
                ));
            }
        };
        if advance {
            self.guess = idx + 1;
        }
        Ok(idx)
    }

    fn lookup_seq(&self, msa: &Alignment, name: &str) -> Option<usize> {
        // Lines tend to repeat in the same sequence order, and a #=GR line
        // usually follows the sequence it annotates.
        let candidates = [Some(self.guess), self.guess.checked_sub(1)];
        for idx in candidates.into_iter().flatten() {
            if msa.sequences.get(idx).is_some_and(|s| s.name == name) {
                return Some(idx);
            }
        }
        self.names.get(name).copied()
    }

    fn add_sequence(&mut self, msa: &mut Alignment, name: &str) -> Result<usize, LineError> {
        let idx = msa.sequences.len();

        grow(&mut msa.sequences)?;
        grow(&mut self.sqlen)?;
        grow(&mut self.sslen)?;
        grow(&mut self.salen)?;
        grow(&mut self.pplen)?;
        for (values, lens) in msa.gr.values_mut().zip(self.gr_len.iter_mut()) {
            grow(values)?;
            grow(lens)?;
        }
        for values in msa.gs.values_mut() {
            grow(values)?;
        }
        self.names.try_reserve(1)?;

        msa.sequences.push(Sequence::new(name, String::new()));
        self.sqlen.push(0);
        self.sslen.push(0);
        self.salen.push(0);
        self.pplen.push(0);
        for (values, lens) in msa.gr.values_mut().zip(self.gr_len.iter_mut()) {
            values.push(None);
            lens.push(0);
        }
        for values in msa.gs.values_mut() {
            values.push(None);
        }
        self.names.insert(name.to_string(), idx);

        trace!("new sequence {name} at index {idx}");
        Ok(idx)
    }

    /// Index of an open-ended #=GC tag, registering it in the first block.
    pub fn gc_tag(&mut self, msa: &mut Alignment, tag: &str) -> Result<usize, LineError> {
        if let Some(idx) = msa.gc.get_index_of(tag) {
            return Ok(idx);
        }
        if !self.in_first_block() {
            return Err(unknown_tag("#=GC", tag));
        }
        msa.gc.try_reserve(1)?;
        grow(&mut self.gc_len)?;
        let (idx, _) = msa.gc.insert_full(tag.to_string(), String::new());
        self.gc_len.push(0);
        trace!("new #=GC tag {tag} at index {idx}");
        Ok(idx)
    }

    /// Index of an open-ended #=GR tag, registering it in the first block.
    pub fn gr_tag(&mut self, msa: &mut Alignment, tag: &str) -> Result<usize, LineError> {
        if let Some(idx) = msa.gr.get_index_of(tag) {
            return Ok(idx);
        }
        if !self.in_first_block() {
            return Err(unknown_tag("#=GR", tag));
        }
        let nseq = msa.sequences.len();
        let mut values = Vec::new();
        values.try_reserve_exact(nseq)?;
        values.resize(nseq, None);
        let mut lens = Vec::new();
        lens.try_reserve_exact(nseq)?;
        lens.resize(nseq, 0);

        msa.gr.try_reserve(1)?;
        grow(&mut self.gr_len)?;
        let (idx, _) = msa.gr.insert_full(tag.to_string(), values);
        self.gr_len.push(lens);
        trace!("new #=GR tag {tag} at index {idx}");
        Ok(idx)
    }

    /// Index of an open-ended #=GS tag. Unaligned, so allowed anywhere.
    pub fn gs_tag(&mut self, msa: &mut Alignment, tag: &str) -> Result<usize, LineError> {
        if let Some(idx) = msa.gs.get_index_of(tag) {
            return Ok(idx);
        }
        let nseq = msa.sequences.len();
        let mut values = Vec::new();
        values.try_reserve_exact(nseq)?;
        values.resize(nseq, None);
        msa.gs.try_reserve(1)?;
        let (idx, _) = msa.gs.insert_full(tag.to_string(), values);
        Ok(idx)
    }

    /// Place a sequence or #=GR line in the block layout and return the
    /// sequence index it refers to.
    pub fn place_seq_line(
        &mut self,
        msa: &mut Alignment,
        kind: BlockLineKind,
        name: &str,
    ) -> Result<usize, LineError> {
        let idx = self.resolve_seq(msa, name, kind == BlockLineKind::Sequence)?;
        if self.in_first_block() {
            self.extend_template(kind, Some(idx))?;
            return Ok(idx);
        }

        let expected = self.expect_kind(msa, kind)?;
        match expected.seq {
            Some(want) if want == idx => Ok(idx),
            Some(want) => Err(LineError::new(
                ErrorKind::UnexpectedSequence,
                format!(
                    "sequence {} expected, saw sequence {name}",
                    msa.sequences[want].name
                ),
            )),
            None => Err(LineError::new(
                ErrorKind::UnexpectedLineKind,
                format!("unexpected line kind: {kind} for {name} has no sequence in the first block"),
            )),
        }
    }

    /// Place a #=GC line in the block layout.
    pub fn place_column_line(&mut self, msa: &Alignment) -> Result<(), LineError> {
        if self.in_first_block() {
            return self.extend_template(BlockLineKind::Column, None);
        }
        self.expect_kind(msa, BlockLineKind::Column).map(|_| ())
    }

    fn extend_template(&mut self, kind: BlockLineKind, seq: Option<usize>) -> Result<(), LineError> {
        grow(&mut self.template)?;
        self.template.push(TemplateLine { kind, seq });
        self.cursor += 1;
        self.in_block = true;
        Ok(())
    }

    fn expect_kind(&mut self, msa: &Alignment, kind: BlockLineKind) -> Result<TemplateLine, LineError> {
        let expected = self.template.get(self.cursor).copied().ok_or_else(|| {
            LineError::new(
                ErrorKind::BlockTooLong,
                format!(
                    "more lines in this block than the {} of the first block",
                    self.template.len()
                ),
            )
        })?;
        if expected.kind != kind {
            let owner = expected
                .seq
                .map(|i| format!(" for {}", msa.sequences[i].name))
                .unwrap_or_default();
            return Err(LineError::new(
                ErrorKind::UnexpectedLineKind,
                format!(
                    "unexpected line kind: {}{owner} expected, saw {kind}",
                    expected.kind
                ),
            ));
        }
        self.cursor += 1;
        self.in_block = true;
        Ok(expected)
    }

    fn running_len(&self, target: Target) -> usize {
        match target {
            Target::Residues(i) => self.sqlen[i],
            Target::Ss(i) => self.sslen[i],
            Target::Sa(i) => self.salen[i],
            Target::Pp(i) => self.pplen[i],
            Target::Gr { tag, seq } => self.gr_len[tag][seq],
            Target::SsCons => self.ss_cons_len,
            Target::SaCons => self.sa_cons_len,
            Target::PpCons => self.pp_cons_len,
            Target::Rf => self.rf_len,
            Target::Gc(i) => self.gc_len[i],
        }
    }

    fn running_len_mut(&mut self, target: Target) -> &mut usize {
        match target {
            Target::Residues(i) => &mut self.sqlen[i],
            Target::Ss(i) => &mut self.sslen[i],
            Target::Sa(i) => &mut self.salen[i],
            Target::Pp(i) => &mut self.pplen[i],
            Target::Gr { tag, seq } => &mut self.gr_len[tag][seq],
            Target::SsCons => &mut self.ss_cons_len,
            Target::SaCons => &mut self.sa_cons_len,
            Target::PpCons => &mut self.pp_cons_len,
            Target::Rf => &mut self.rf_len,
            Target::Gc(i) => &mut self.gc_len[i],
        }
    }

    /// Append one block line's aligned text to `target`.
    ///
    /// The target must not have grown yet in this block, and the text must
    /// be as wide as every other data line of the block.
    pub fn append(
        &mut self,
        msa: &mut Alignment,
        target: Target,
        text: &str,
        abc: Option<&Alphabet>,
    ) -> Result<(), LineError> {
        let width = text.chars().count();
        let current = self.running_len(target);
        if current > self.alen {
            return Err(LineError::new(
                ErrorKind::DuplicateLine,
                format!("duplicate annotation: {} appears twice in this block", describe(msa, target)),
            ));
        }
        if current < self.alen {
            return Err(LineError::new(
                ErrorKind::OutOfSync,
                format!("{} is missing from an earlier block", describe(msa, target)),
            ));
        }
        match self.block_span {
            Some(span) if span != width => {
                return Err(LineError::new(
                    ErrorKind::LengthMismatch,
                    format!("aligned text is {width} columns; the rest of this block has {span}"),
                ));
            }
            Some(_) => {}
            None => self.block_span = Some(width),
        }

        match target {
            Target::Residues(i) => {
                let seq = &mut msa.sequences[i];
                if let Some(abc) = abc {
                    let dsq = seq.dsq.get_or_insert_with(Vec::new);
                    abc.encode_into(text, dsq).map_err(|e| {
                        LineError::new(ErrorKind::InvalidResidue, format!("sequence {}: {e}", seq.name))
                    })?;
                }
                seq.residues.push_str(text);
            }
            Target::Ss(i) => push_opt(&mut msa.sequences[i].ss, text),
            Target::Sa(i) => push_opt(&mut msa.sequences[i].sa, text),
            Target::Pp(i) => push_opt(&mut msa.sequences[i].pp, text),
            Target::Gr { tag, seq } => push_opt(&mut msa.gr[tag][seq], text),
            Target::SsCons => push_opt(&mut msa.ss_cons, text),
            Target::SaCons => push_opt(&mut msa.sa_cons, text),
            Target::PpCons => push_opt(&mut msa.pp_cons, text),
            Target::Rf => push_opt(&mut msa.rf, text),
            Target::Gc(i) => msa.gc[i].push_str(text),
        }
        *self.running_len_mut(target) += width;
        Ok(())
    }

    /// Close the current block at a blank line or terminator.
    pub fn close_block(&mut self) -> Result<(), LineError> {
        if !self.in_block {
            return Ok(());
        }
        if !self.in_first_block() && self.cursor < self.template.len() {
            return Err(LineError::new(
                ErrorKind::BlockTooShort,
                format!(
                    "fewer lines than expected in block: {} of {}",
                    self.cursor,
                    self.template.len()
                ),
            ));
        }
        let span = self.block_span.unwrap_or(0);
        self.alen += span;
        self.nblocks += 1;
        self.cursor = 0;
        self.guess = 0;
        self.block_span = None;
        self.in_block = false;
        debug!(
            "block {} closed: {} lines, {span} columns, {} total",
            self.nblocks,
            self.template.len(),
            self.alen
        );
        Ok(())
    }

    /// Freeze the alignment at the record terminator.
    pub fn finish(self, msa: &mut Alignment) -> Result<(), LineError> {
        if self.nblocks == 0 {
            return Err(LineError::new(
                ErrorKind::NoAlignmentData,
                "no alignment data followed the Stockholm header",
            ));
        }
        for (seq, &len) in msa.sequences.iter().zip(&self.sqlen) {
            if len == 0 {
                return Err(LineError::new(
                    ErrorKind::MissingSequenceData,
                    format!("no sequence data for {}", seq.name),
                ));
            }
            if len != self.alen {
                return Err(LineError::new(
                    ErrorKind::LengthMismatch,
                    format!("sequence {} has {len} columns; expected {}", seq.name, self.alen),
                ));
            }
        }
        if msa.has_weights()
            && let Some(seq) = msa.sequences.iter().find(|s| s.weight.is_none())
        {
            return Err(LineError::new(
                ErrorKind::MissingWeight,
                format!("no #=GS WT weight for {}, though other sequences have one", seq.name),
            ));
        }
        msa.alen = self.alen;
        debug!(
            "record finalized: {} sequences, {} columns, {} blocks",
            msa.sequences.len(),
            msa.alen,
            self.nblocks
        );
        Ok(())
    }
}

fn push_opt(slot: &mut Option<String>, text: &str) {
    slot.get_or_insert_with(String::new).push_str(text);
}

fn unknown_tag(family: &str, tag: &str) -> LineError {
    LineError::new(
        ErrorKind::UnknownTag,
        format!("unrecognized {family} tag {tag} introduced after the first block"),
    )
}

fn describe(msa: &Alignment, target: Target) -> String {
    let name = |i: usize| msa.sequences[i].name.as_str();
    match target {
        Target::Residues(i) => format!("sequence {}", name(i)),
        Target::Ss(i) => format!("#=GR {} SS", name(i)),
        Target::Sa(i) => format!("#=GR {} SA", name(i)),
        Target::Pp(i) => format!("#=GR {} PP", name(i)),
        Target::Gr { tag, seq } => {
            let tag = msa.gr.get_index(tag).map(|(t, _)| t.as_str()).unwrap_or("?");
            format!("#=GR {} {tag}", name(seq))
        }
        Target::SsCons => "#=GC SS_cons".to_string(),
        Target::SaCons => "#=GC SA_cons".to_string(),
        Target::PpCons => "#=GC PP_cons".to_string(),
        Target::Rf => "#=GC RF".to_string(),
        Target::Gc(i) => {
            let tag = msa.gc.get_index(i).map(|(t, _)| t.as_str()).unwrap_or("?");
            format!("#=GC {tag}")
        }
    }
}

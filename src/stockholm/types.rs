//! Core types for Stockholm format alignments.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::alphabet::{AlphabetKind, Symbol};

/// A Stockholm format alignment.
///
/// `alen` is only meaningful once the reader has reached the `//`
/// terminator; until then the per-sequence strings grow block by block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Alignment {
    /// Alignment name (#=GF ID)
    pub name: Option<String>,
    /// Alignment accession (#=GF AC)
    pub accession: Option<String>,
    /// Description (#=GF DE)
    pub description: Option<String>,
    /// Author (#=GF AU)
    pub author: Option<String>,
    /// Pfam/Rfam score thresholds (#=GF GA, NC, TC)
    pub cutoffs: Cutoffs,
    /// Free text comment lines, without the leading `#`
    pub comments: Vec<String>,
    /// Unparsed file-level annotations (#=GF), in file order; tags may repeat
    pub file_annotations: Vec<FileAnnotation>,
    /// Sequences in the alignment, in order of first appearance
    pub sequences: Vec<Sequence>,
    /// Consensus secondary structure (#=GC SS_cons)
    pub ss_cons: Option<String>,
    /// Consensus surface accessibility (#=GC SA_cons)
    pub sa_cons: Option<String>,
    /// Consensus posterior probability (#=GC PP_cons)
    pub pp_cons: Option<String>,
    /// Reference coordinate line (#=GC RF)
    pub rf: Option<String>,
    /// Unparsed per-sequence annotations (#=GS): tag -> text per sequence.
    /// Repeated lines for one sequence are joined with `\n`.
    pub gs: IndexMap<String, Vec<Option<String>>>,
    /// Unparsed per-column annotations (#=GC): tag -> aligned text
    pub gc: IndexMap<String, String>,
    /// Unparsed per-residue annotations (#=GR): tag -> aligned text per sequence
    pub gr: IndexMap<String, Vec<Option<String>>>,
    /// Residue alphabet, when the alignment was read in digital mode
    pub alphabet: Option<AlphabetKind>,
    /// Number of columns
    pub alen: usize,
}

/// A sequence in the alignment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sequence {
    /// Sequence name (may include coordinates like "id/start-end")
    pub name: String,
    /// Aligned residues, verbatim as read
    pub residues: String,
    /// Digitized residues, when read with an alphabet
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dsq: Option<Vec<Symbol>>,
    /// Accession (#=GS AC)
    pub accession: Option<String>,
    /// Description (#=GS DE)
    pub description: Option<String>,
    /// Relative weight (#=GS WT)
    pub weight: Option<f64>,
    /// Secondary structure (#=GR SS)
    pub ss: Option<String>,
    /// Surface accessibility (#=GR SA)
    pub sa: Option<String>,
    /// Posterior probabilities (#=GR PP)
    pub pp: Option<String>,
}

/// File-level annotation (#=GF tag value).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileAnnotation {
    pub tag: String,
    pub value: String,
}

/// Score thresholds. Pfam gives two values per line, Rfam one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Cutoffs {
    /// Gathering threshold (#=GF GA)
    pub ga: Option<Threshold>,
    /// Noise cutoff (#=GF NC)
    pub nc: Option<Threshold>,
    /// Trusted cutoff (#=GF TC)
    pub tc: Option<Threshold>,
}

/// One threshold line: a required first value and an optional second.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Threshold(pub f64, pub Option<f64>);

impl Alignment {
    /// Create a new empty alignment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of sequences.
    pub fn num_sequences(&self) -> usize {
        self.sequences.len()
    }

    /// Get the alignment width (number of columns).
    pub fn width(&self) -> usize {
        self.alen
    }

    /// Find a sequence index by name.
    pub fn seq_index(&self, name: &str) -> Option<usize> {
        self.sequences.iter().position(|s| s.name == name)
    }

    /// Get a sequence by name.
    pub fn sequence(&self, name: &str) -> Option<&Sequence> {
        self.sequences.iter().find(|s| s.name == name)
    }

    /// Index of an unparsed #=GC tag.
    pub fn gc_tag_index(&self, tag: &str) -> Option<usize> {
        self.gc.get_index_of(tag)
    }

    /// Index of an unparsed #=GR tag.
    pub fn gr_tag_index(&self, tag: &str) -> Option<usize> {
        self.gr.get_index_of(tag)
    }

    /// Index of an unparsed #=GS tag.
    pub fn gs_tag_index(&self, tag: &str) -> Option<usize> {
        self.gs.get_index_of(tag)
    }

    /// Unparsed #=GR annotation for one sequence.
    pub fn gr_for(&self, tag: &str, seq: usize) -> Option<&str> {
        self.gr.get(tag)?.get(seq)?.as_deref()
    }

    /// Unparsed #=GS annotation for one sequence.
    pub fn gs_for(&self, tag: &str, seq: usize) -> Option<&str> {
        self.gs.get(tag)?.get(seq)?.as_deref()
    }

    /// Whether any sequence carries a weight.
    pub fn has_weights(&self) -> bool {
        self.sequences.iter().any(|s| s.weight.is_some())
    }

    /// Get the maximum sequence name length (for formatting).
    pub fn max_name_len(&self) -> usize {
        self.sequences
            .iter()
            .map(|s| s.name.len())
            .max()
            .unwrap_or(0)
    }

    /// Check if every aligned string has exactly `alen` characters.
    pub fn is_valid(&self) -> bool {
        let width = self.alen;
        let fits = |s: &str| s.chars().count() == width;
        let fits_opt = |s: &Option<String>| s.as_deref().is_none_or(fits);

        self.sequences.iter().all(|s| {
            fits(&s.residues)
                && s.dsq.as_ref().is_none_or(|d| d.len() == width)
                && fits_opt(&s.ss)
                && fits_opt(&s.sa)
                && fits_opt(&s.pp)
        }) && [&self.ss_cons, &self.sa_cons, &self.pp_cons, &self.rf]
            .into_iter()
            .all(fits_opt)
            && self.gc.values().all(|s| fits(s))
            && self.gr.values().flatten().all(fits_opt)
    }
}

impl Sequence {
    /// Create a new sequence.
    pub fn new(name: impl Into<String>, residues: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            residues: residues.into(),
            ..Self::default()
        }
    }

    /// Get the length of the aligned sequence.
    pub fn len(&self) -> usize {
        self.residues.chars().count()
    }

    /// Check if the sequence is empty.
    pub fn is_empty(&self) -> bool {
        self.residues.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_valid() {
        let mut alignment = Alignment::new();
        alignment.sequences.push(Sequence::new("seq1", "ACGU..ACGU"));
        alignment.sequences.push(Sequence::new("seq2", "ACGU..ACGU"));
        alignment.ss_cons = Some("<<<<..>>>>".to_string());
        alignment.alen = 10;
        assert!(alignment.is_valid());

        alignment
            .gr
            .insert("XX".to_string(), vec![Some("1234".to_string()), None]);
        assert!(!alignment.is_valid());
    }

    #[test]
    fn test_lookup_helpers() {
        let mut alignment = Alignment::new();
        alignment.sequences.push(Sequence::new("seq1/1-4", "ACGU"));
        alignment.sequences.push(Sequence::new("s2", "ACGU"));
        alignment
            .gr
            .insert("XX".to_string(), vec![None, Some("abcd".to_string())]);

        assert_eq!(alignment.seq_index("s2"), Some(1));
        assert_eq!(alignment.gr_tag_index("XX"), Some(0));
        assert_eq!(alignment.gr_for("XX", 1), Some("abcd"));
        assert_eq!(alignment.gr_for("XX", 0), None);
        assert_eq!(alignment.max_name_len(), 8);

        alignment.gc.insert("RF".to_string(), "xxxx".to_string());
        alignment.gc.insert("MM".to_string(), "..mm".to_string());
        assert_eq!(alignment.gc_tag_index("MM"), Some(1));
        assert_eq!(alignment.gc_tag_index("SS_cons"), None);

        alignment
            .gs
            .insert("DR".to_string(), vec![Some("PDB; 1abc;".to_string()), None]);
        assert_eq!(alignment.gs_tag_index("DR"), Some(0));
        assert_eq!(alignment.gs_for("DR", 0), Some("PDB; 1abc;"));
        assert_eq!(alignment.gs_tag_index("XX"), None);

        let seq = alignment.sequence("s2").unwrap();
        assert_eq!(seq.name, "s2");
        assert_eq!(seq.len(), 4);
        assert!(!seq.is_empty());
        assert!(alignment.sequence("s3").is_none());
        assert!(Sequence::new("s3", "").is_empty());
        assert_eq!(Sequence::new("s4", "AC-é").len(), 4);
    }
}

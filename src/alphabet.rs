//! Residue alphabets used to validate and digitize sequence lines.
//!
//! An [`Alphabet`] maps input characters onto small integer codes. Each
//! alphabet lists its canonical residues first, then the gap symbol, then
//! degenerate and special symbols. Synonyms (lower case, `.`/`_` gaps,
//! T/U for nucleic acids) map onto the same code as their canonical form.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;

use crate::stockholm::Alignment;

/// A digitized residue code.
pub type Symbol = u8;

const RNA_SYMBOLS: &[u8] = b"ACGU-RYMKSWHBVDN*~";
const DNA_SYMBOLS: &[u8] = b"ACGT-RYMKSWHBVDN*~";
const AMINO_SYMBOLS: &[u8] = b"ACDEFGHIKLMNPQRSTVWY-BJZOUX*~";

/// A character rejected by an alphabet.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("invalid {kind} residue {ch:?}")]
pub struct InvalidSymbol {
    pub ch: char,
    pub kind: AlphabetKind,
}

/// Type of residues in an alignment.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[strum(ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum AlphabetKind {
    #[strum(to_string = "rna")]
    Rna,
    #[strum(to_string = "dna")]
    Dna,
    #[strum(to_string = "amino", serialize = "protein")]
    Amino,
}

impl AlphabetKind {
    /// Guess the residue type from the sequences of a parsed alignment.
    ///
    /// Any letter that is not an IUPAC nucleotide code makes it a protein
    /// alignment; otherwise T without U means DNA, and everything else is
    /// treated as RNA.
    pub fn guess(alignment: &Alignment) -> Self {
        const PROTEIN_ONLY: &[char] = &['E', 'F', 'J', 'L', 'O', 'P', 'Q', 'Z'];

        let mut has_u = false;
        let mut has_t = false;

        for seq in &alignment.sequences {
            for ch in seq.residues.chars() {
                let upper = ch.to_ascii_uppercase();
                if PROTEIN_ONLY.contains(&upper) {
                    return AlphabetKind::Amino;
                }
                has_u |= upper == 'U';
                has_t |= upper == 'T';
            }
        }

        if has_t && !has_u {
            AlphabetKind::Dna
        } else {
            AlphabetKind::Rna
        }
    }
}

/// A digitizing alphabet.
#[derive(Debug, Clone)]
pub struct Alphabet {
    kind: AlphabetKind,
    symbols: &'static [u8],
    /// Number of canonical residues; the gap code equals this.
    k: usize,
    inmap: [Option<Symbol>; 128],
}

impl Alphabet {
    /// Create one of the standard alphabets.
    pub fn new(kind: AlphabetKind) -> Self {
        let (symbols, k) = match kind {
            AlphabetKind::Rna => (RNA_SYMBOLS, 4),
            AlphabetKind::Dna => (DNA_SYMBOLS, 4),
            AlphabetKind::Amino => (AMINO_SYMBOLS, 20),
        };

        let mut inmap = [None; 128];
        for (code, &c) in symbols.iter().enumerate() {
            inmap[c as usize] = Some(code as Symbol);
        }

        let mut abc = Self {
            kind,
            symbols,
            k,
            inmap,
        };

        match kind {
            AlphabetKind::Rna => {
                abc.set_equiv(b'T', b'U');
                abc.set_equiv(b'X', b'N');
                abc.set_equiv(b'I', b'A');
            }
            AlphabetKind::Dna => {
                abc.set_equiv(b'U', b'T');
                abc.set_equiv(b'X', b'N');
                abc.set_equiv(b'I', b'A');
            }
            AlphabetKind::Amino => {}
        }
        abc.set_equiv(b'_', b'-');
        abc.set_equiv(b'.', b'-');
        abc.set_case_insensitive();
        abc
    }

    fn set_equiv(&mut self, sym: u8, target: u8) {
        self.inmap[sym as usize] = self.inmap[target as usize];
    }

    fn set_case_insensitive(&mut self) {
        for upper in b'A'..=b'Z' {
            let lower = upper.to_ascii_lowercase();
            match (self.inmap[upper as usize], self.inmap[lower as usize]) {
                (Some(code), None) => self.inmap[lower as usize] = Some(code),
                (None, Some(code)) => self.inmap[upper as usize] = Some(code),
                _ => {}
            }
        }
    }

    pub fn kind(&self) -> AlphabetKind {
        self.kind
    }

    /// Number of canonical residues (4 for nucleic acids, 20 for amino acids).
    pub fn k(&self) -> usize {
        self.k
    }

    /// Validate one input character and return its code.
    pub fn validate_and_encode(&self, ch: char) -> Result<Symbol, InvalidSymbol> {
        if ch.is_ascii()
            && let Some(code) = self.inmap[ch as usize]
        {
            return Ok(code);
        }
        Err(InvalidSymbol {
            ch,
            kind: self.kind,
        })
    }

    /// Digitize `text`, appending codes to `dsq`.
    ///
    /// On error `dsq` may hold a partial append; callers discard it.
    pub fn encode_into(&self, text: &str, dsq: &mut Vec<Symbol>) -> Result<(), InvalidSymbol> {
        dsq.reserve(text.len());
        for ch in text.chars() {
            dsq.push(self.validate_and_encode(ch)?);
        }
        Ok(())
    }

    /// Canonical character for a code.
    pub fn symbol(&self, code: Symbol) -> Option<char> {
        self.symbols.get(code as usize).map(|&c| c as char)
    }

    /// Check if a code is the gap symbol.
    pub fn is_gap(&self, code: Symbol) -> bool {
        code as usize == self.k
    }

    /// Convert codes back to canonical text.
    pub fn textize(&self, dsq: &[Symbol]) -> String {
        dsq.iter().filter_map(|&code| self.symbol(code)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stockholm::Sequence;

    #[test]
    fn test_rna_synonyms() {
        let abc = Alphabet::new(AlphabetKind::Rna);
        assert_eq!(abc.validate_and_encode('U'), Ok(3));
        assert_eq!(abc.validate_and_encode('t'), Ok(3));
        assert_eq!(abc.validate_and_encode('x'), abc.validate_and_encode('N'));
        assert!(abc.is_gap(abc.validate_and_encode('.').unwrap()));
        assert!(abc.is_gap(abc.validate_and_encode('_').unwrap()));
    }

    #[test]
    fn test_canonical_residue_count() {
        let rna = Alphabet::new(AlphabetKind::Rna);
        assert_eq!(rna.k(), 4);
        assert_eq!(Alphabet::new(AlphabetKind::Dna).k(), 4);
        assert_eq!(Alphabet::new(AlphabetKind::Amino).k(), 20);

        // Canonical residues take the codes below k.
        assert!(rna.validate_and_encode('U').unwrap() < rna.k() as Symbol);
        assert!(rna.validate_and_encode('N').unwrap() >= rna.k() as Symbol);
    }

    #[test]
    fn test_invalid_symbol() {
        let abc = Alphabet::new(AlphabetKind::Dna);
        let err = abc.validate_and_encode('Z').unwrap_err();
        assert_eq!(err.ch, 'Z');
        assert_eq!(err.to_string(), "invalid dna residue 'Z'");
        assert!(abc.validate_and_encode('é').is_err());
    }

    #[test]
    fn test_textize_canonicalizes() {
        let abc = Alphabet::new(AlphabetKind::Amino);
        let mut dsq = Vec::new();
        abc.encode_into("acd.W", &mut dsq).unwrap();
        assert_eq!(abc.textize(&dsq), "ACD-W");
    }

    #[test]
    fn test_kind_from_str() {
        assert_eq!("RNA".parse::<AlphabetKind>().unwrap(), AlphabetKind::Rna);
        assert_eq!("protein".parse::<AlphabetKind>().unwrap(), AlphabetKind::Amino);
        assert_eq!(AlphabetKind::Amino.to_string(), "amino");
        assert!("coins".parse::<AlphabetKind>().is_err());
    }

    #[test]
    fn test_guess() {
        let mut alignment = Alignment::new();
        alignment.sequences.push(Sequence::new("a", "ACGT..ACGT"));
        assert_eq!(AlphabetKind::guess(&alignment), AlphabetKind::Dna);
        alignment.sequences.push(Sequence::new("b", "ACGU..ACGU"));
        assert_eq!(AlphabetKind::guess(&alignment), AlphabetKind::Rna);
        alignment.sequences.push(Sequence::new("c", "MKLV..ACGU"));
        assert_eq!(AlphabetKind::guess(&alignment), AlphabetKind::Amino);
    }
}

//! stockholm-msa: block-validating reader and writer for Stockholm
//! multiple sequence alignments.
//!
//! ```
//! let input = "# STOCKHOLM 1.0\nseq1 ACGU\nseq2 AC-U\n//\n";
//! let msa = stockholm_msa::stockholm::parse_str(input).unwrap();
//! assert_eq!(msa.num_sequences(), 2);
//! assert_eq!(msa.width(), 4);
//! ```

pub mod alphabet;
pub mod config;
pub mod stockholm;

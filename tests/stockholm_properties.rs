use stockholm_msa::alphabet::{Alphabet, AlphabetKind};
use stockholm_msa::stockholm::{
    Alignment, BlockLineKind, ErrorCategory, ErrorKind, ParseState, Reader, parse_str,
    write_string,
};

/// One aligned line of a block: the text before the aligned column data,
/// and the full-width column data.
struct Row {
    prefix: &'static str,
    data: &'static str,
}

const ROWS: &[Row] = &[
    Row { prefix: "seq1/1-12     ", data: "ACGUA..CGUAC" },
    Row { prefix: "#=GR seq1 SS  ", data: "<<<....>>>.." },
    Row { prefix: "seq2          ", data: "ACGUAAACG-AC" },
    Row { prefix: "#=GR seq2 PP  ", data: "99998887*.99" },
    Row { prefix: "seq3          ", data: "AGGUA..CCUAC" },
    Row { prefix: "#=GR seq3 XX  ", data: "abcdefghijkl" },
    Row { prefix: "#=GC SS_cons  ", data: "<<<....>>>.." },
    Row { prefix: "#=GC RF       ", data: "xxxxx..xxxxx" },
];

const HEADER: &str = "# STOCKHOLM 1.0\n#=GF ID demo\n#=GS seq1/1-12 DE first\n";

/// Render `ROWS` as blocks, cutting the columns at `cuts`.
fn blocked(cuts: &[usize]) -> String {
    let alen = ROWS[0].data.len();
    let mut bounds = vec![0];
    bounds.extend_from_slice(cuts);
    bounds.push(alen);

    let mut out = String::from(HEADER);
    for (i, w) in bounds.windows(2).enumerate() {
        if i > 0 {
            out.push('\n');
        }
        for row in ROWS {
            out.push_str(row.prefix);
            out.push_str(&row.data[w[0]..w[1]]);
            out.push('\n');
        }
    }
    out.push_str("//\n");
    out
}

#[test]
fn single_block_parses() {
    let msa = parse_str(&blocked(&[])).unwrap();
    assert_eq!(msa.num_sequences(), 3);
    assert_eq!(msa.width(), 12);
    assert_eq!(msa.sequences[0].description.as_deref(), Some("first"));
    assert_eq!(msa.sequences[0].ss.as_deref(), Some("<<<....>>>.."));
    assert_eq!(msa.gr_for("XX", 2), Some("abcdefghijkl"));
    assert!(msa.is_valid());
}

#[test]
fn block_count_invariance() {
    let expected = parse_str(&blocked(&[])).unwrap();
    let alen = expected.width();

    // Every split into two blocks.
    for cut in 1..alen {
        let msa = parse_str(&blocked(&[cut])).unwrap();
        assert_eq!(msa, expected, "split at {cut}");
    }

    // N blocks for every N: leading one-column blocks, and near-even blocks.
    for n in 1..=alen {
        let singles: Vec<usize> = (1..n).collect();
        assert_eq!(parse_str(&blocked(&singles)).unwrap(), expected, "{n} blocks");

        let even: Vec<usize> = (1..n).map(|i| i * alen / n).collect();
        assert_eq!(parse_str(&blocked(&even)).unwrap(), expected, "{n} even blocks");
    }
}

fn permutations(items: Vec<usize>) -> Vec<Vec<usize>> {
    if items.len() <= 1 {
        return vec![items];
    }
    let mut out = Vec::new();
    for i in 0..items.len() {
        let mut rest = items.clone();
        let first = rest.remove(i);
        for mut tail in permutations(rest) {
            tail.insert(0, first);
            out.push(tail);
        }
    }
    out
}

#[test]
fn order_sensitivity_in_second_block() {
    let template = [
        "seq1          ACGU",
        "#=GR seq1 SS  <..>",
        "seq2          ACGU",
        "#=GC SS_cons  <..>",
    ];
    let kinds = ["seq", "gr", "seq", "gc"];

    for perm in permutations(vec![0, 1, 2, 3]) {
        let mut input = String::from("# STOCKHOLM 1.0\n");
        for line in template {
            input.push_str(line);
            input.push('\n');
        }
        input.push('\n');
        for &i in &perm {
            input.push_str(template[i]);
            input.push('\n');
        }
        input.push_str("//\n");

        let first_diff = perm.iter().enumerate().find(|&(pos, &i)| pos != i);
        let result = parse_str(&input);
        let Some((pos, &i)) = first_diff else {
            assert!(result.is_ok());
            continue;
        };

        let err = result.unwrap_err();
        let expected_kind = if kinds[i] == kinds[pos] {
            ErrorKind::UnexpectedSequence
        } else {
            ErrorKind::UnexpectedLineKind
        };
        assert_eq!(err.kind, expected_kind, "permutation {perm:?}");
        assert_eq!(err.category(), ErrorCategory::Structural);
        assert_eq!(err.line_number, 7 + pos as u64, "permutation {perm:?}");
        assert_eq!(err.line, template[i]);
    }
}

#[test]
fn duplicate_column_annotation_in_first_block() {
    let input = "# STOCKHOLM 1.0\nseq1 ACGU\n#=GC SS_cons <..>\n#=GC SS_cons <..>\n//\n";
    let err = parse_str(input).unwrap_err();
    assert_eq!(err.kind, ErrorKind::DuplicateLine);
    assert!(err.message.starts_with("duplicate annotation"));
    assert_eq!(err.line_number, 4);
}

#[test]
fn duplicate_column_annotation_in_later_block() {
    let input = "# STOCKHOLM 1.0\n\
                 seq1 ACGU\n\
                 #=GC SS_cons <..>\n\
                 #=GC RF xxxx\n\
                 \n\
                 seq1 ACGU\n\
                 #=GC SS_cons <..>\n\
                 #=GC SS_cons <..>\n\
                 //\n";
    let err = parse_str(input).unwrap_err();
    assert_eq!(err.kind, ErrorKind::DuplicateLine);
    assert_eq!(err.line_number, 8);
}

#[test]
fn length_agreement() {
    let input = "# STOCKHOLM 1.0\n\
                 seq1 ACGU\n\
                 seq2 ACGU\n\
                 \n\
                 seq1 ACGU\n\
                 seq2 ACG\n\
                 //\n";
    let err = parse_str(input).unwrap_err();
    assert_eq!(err.kind, ErrorKind::LengthMismatch);
    assert_eq!(err.line_number, 6);
    assert_eq!(err.line, "seq2 ACG");

    let input = "# STOCKHOLM 1.0\nseq1 ACGU\n#=GC RF xxxxx\n//\n";
    let err = parse_str(input).unwrap_err();
    assert_eq!(err.kind, ErrorKind::LengthMismatch);
    assert_eq!(err.line_number, 3);
}

#[test]
fn gr_tag_index_is_stable_across_blocks() {
    let mut msa = Alignment::new();
    let mut state = ParseState::new();
    for name in ["seq1", "seq2", "seq3"] {
        state
            .place_seq_line(&mut msa, BlockLineKind::Sequence, name)
            .unwrap();
    }
    state
        .place_seq_line(&mut msa, BlockLineKind::Residue, "seq3")
        .unwrap();
    let first = state.gr_tag(&mut msa, "XX").unwrap();
    state.close_block().unwrap();

    let second = state.gr_tag(&mut msa, "XX").unwrap();
    assert_eq!(first, second);
    assert_eq!(msa.gr.len(), 1);
    assert_eq!(msa.gr[first].len(), 3);

    let err = state.gr_tag(&mut msa, "YY").unwrap_err();
    assert_eq!(err.kind, ErrorKind::UnknownTag);
}

#[test]
fn gr_tag_added_with_sequences_pending() {
    // The tag appears before seq3 exists; seq3 still gets a slot for it.
    let input = "# STOCKHOLM 1.0\n\
                 seq1 AC\n\
                 #=GR seq1 XX ab\n\
                 seq2 AC\n\
                 seq3 AC\n\
                 #=GR seq3 XX cd\n\
                 \n\
                 seq1 GU\n\
                 #=GR seq1 XX ef\n\
                 seq2 GU\n\
                 seq3 GU\n\
                 #=GR seq3 XX gh\n\
                 //\n";
    let msa = parse_str(input).unwrap();
    assert_eq!(msa.gr_tag_index("XX"), Some(0));
    assert_eq!(msa.gr_for("XX", 0), Some("abef"));
    assert_eq!(msa.gr_for("XX", 1), None);
    assert_eq!(msa.gr_for("XX", 2), Some("cdgh"));
}

#[test]
fn round_trip_through_writer() {
    let input = blocked(&[5]);
    let msa = parse_str(&input).unwrap();
    for width in [None, Some(1), Some(5), Some(7), Some(50)] {
        let text = write_string(&msa, width).unwrap();
        let reparsed = parse_str(&text).unwrap();
        assert_eq!(reparsed, msa, "width {width:?}\n{text}");
    }
}

#[test]
fn json_round_trip() {
    let input = "# STOCKHOLM 1.0\nseq1 ACGU\nseq2 AC-U\n//\n";
    let msa = Reader::new(input.as_bytes())
        .with_alphabet(Alphabet::new(AlphabetKind::Rna))
        .next()
        .unwrap()
        .unwrap();
    let json = serde_json::to_string(&msa).unwrap();
    let back: Alignment = serde_json::from_str(&json).unwrap();
    assert_eq!(back, msa);
    assert!(json.contains("\"alphabet\":\"rna\""));
}

// Concrete scenarios.

const TWO_SEQ_BLOCK: &str = "# STOCKHOLM 1.0\n\
                             seqA ACGUACGUAC\n\
                             seqB ACGUUCGUAC\n\
                             #=GC SS_cons <<<....>>>\n\
                             //\n";

#[test]
fn scenario_single_block() {
    let msa = parse_str(TWO_SEQ_BLOCK).unwrap();
    assert_eq!(msa.num_sequences(), 2);
    assert_eq!(msa.width(), 10);
    assert_eq!(msa.ss_cons.as_deref().map(str::len), Some(10));
}

#[test]
fn scenario_swapped_sequences() {
    let input = "# STOCKHOLM 1.0\n\
                 seqA ACGUA\n\
                 seqB ACGUU\n\
                 \n\
                 seqB CGUAC\n\
                 seqA CGUAC\n\
                 //\n";
    let err = parse_str(input).unwrap_err();
    assert_eq!(err.kind, ErrorKind::UnexpectedSequence);
    assert_eq!(err.line_number, 5);
    assert_eq!(err.message, "sequence seqA expected, saw sequence seqB");
}

#[test]
fn scenario_two_blocks_concatenate() {
    let input = "# STOCKHOLM 1.0\n\
                 seqA ACGUA\n\
                 seqB ACGUU\n\
                 \n\
                 seqA CGUAC\n\
                 seqB GGUAC\n\
                 //\n";
    let msa = parse_str(input).unwrap();
    assert_eq!(msa.width(), 10);
    assert_eq!(msa.sequences[0].residues, "ACGUACGUAC");
    assert_eq!(msa.sequences[1].residues, "ACGUUGGUAC");
}

#[test]
fn scenario_missing_terminator() {
    let input = TWO_SEQ_BLOCK.trim_end_matches("//\n");
    let err = parse_str(input).unwrap_err();
    assert_eq!(err.kind, ErrorKind::MissingTerminator);
    assert!(err.message.contains("missing // terminator"));
}

#[test]
fn scenario_sequence_introduced_late() {
    let input = "# STOCKHOLM 1.0\n\
                 seqA ACGUA\n\
                 seqB ACGUU\n\
                 \n\
                 seqA CGUAC\n\
                 seqB GGUAC\n\
                 #=GR seqC SS .....\n\
                 //\n";
    let err = parse_str(input).unwrap_err();
    assert_eq!(err.kind, ErrorKind::UnknownSequence);
    assert_eq!(err.line_number, 7);
    assert!(
        err.message
            .contains("unrecognized sequence seqC introduced after the first block")
    );
    assert!(err.to_string().ends_with("\n  #=GR seqC SS ....."));
}

//! Stockholm format writer.

use std::io::{Result, Write};

use super::types::*;

/// Columns per block when the caller does not choose.
pub const DEFAULT_BLOCK_WIDTH: usize = 50;

/// Write a Stockholm format alignment to a writer.
///
/// `block_width` is the number of columns per block; `None` or `Some(0)`
/// writes the whole alignment as one block.
pub fn write<W: Write>(alignment: &Alignment, mut writer: W, block_width: Option<usize>) -> Result<()> {
    writeln!(writer, "# STOCKHOLM 1.0")?;

    for comment in &alignment.comments {
        if comment.is_empty() {
            writeln!(writer, "#")?;
        } else if comment.starts_with("STOCKHOLM") {
            // Keep it from reading back as a header.
            writeln!(writer, "#  {comment}")?;
        } else {
            writeln!(writer, "# {comment}")?;
        }
    }
    if !alignment.comments.is_empty() {
        writeln!(writer)?;
    }

    write_gf(alignment, &mut writer)?;

    let alen = alignment.width();
    let cpl = block_width.filter(|&w| w > 0).unwrap_or(alen.max(1));
    let layout = Layout::new(alignment);
    let mut start = 0;
    while start < alen {
        if start > 0 {
            writeln!(writer)?;
        }
        write_block(alignment, &layout, &mut writer, start, cpl)?;
        if start == 0 {
            // After the first block, so block lines fix the sequence order.
            write_gs(alignment, &mut writer)?;
        }
        start += cpl;
    }
    if alen == 0 {
        write_gs(alignment, &mut writer)?;
    }

    writeln!(writer, "//")?;
    Ok(())
}

fn threshold(t: &Threshold) -> String {
    match t.1 {
        Some(second) => format!("{} {}", t.0, second),
        None => t.0.to_string(),
    }
}

/// `#=GF` lines: the well-known tags first, then the rest in input order.
fn write_gf<W: Write>(alignment: &Alignment, writer: &mut W) -> Result<()> {
    let cutoffs = [
        ("GA", &alignment.cutoffs.ga),
        ("NC", &alignment.cutoffs.nc),
        ("TC", &alignment.cutoffs.tc),
    ];
    let width = alignment
        .file_annotations
        .iter()
        .map(|a| a.tag.len())
        .max()
        .unwrap_or(0)
        .max(2);

    let mut wrote = false;
    for (tag, value) in [
        ("ID", &alignment.name),
        ("AC", &alignment.accession),
        ("DE", &alignment.description),
        ("AU", &alignment.author),
    ] {
        if let Some(value) = value {
            writeln!(writer, "#=GF {tag:width$} {value}")?;
            wrote = true;
        }
    }
    for (tag, value) in cutoffs {
        if let Some(t) = value {
            writeln!(writer, "#=GF {tag:width$} {}", threshold(t))?;
            wrote = true;
        }
    }
    for ann in &alignment.file_annotations {
        if ann.value.is_empty() {
            writeln!(writer, "#=GF {}", ann.tag)?;
        } else {
            writeln!(writer, "#=GF {:width$} {}", ann.tag, ann.value)?;
        }
        wrote = true;
    }
    if wrote {
        writeln!(writer)?;
    }
    Ok(())
}

/// `#=GS` lines, one group per tag, each group preceded by a blank line.
fn write_gs<W: Write>(alignment: &Alignment, writer: &mut W) -> Result<()> {
    let name_width = alignment.max_name_len();
    let tag_width = alignment
        .gs
        .keys()
        .map(String::len)
        .max()
        .unwrap_or(0)
        .max(2);

    if alignment.has_weights() {
        writeln!(writer)?;
        for seq in &alignment.sequences {
            if let Some(wt) = seq.weight {
                writeln!(writer, "#=GS {:name_width$} {:tag_width$} {wt}", seq.name, "WT")?;
            }
        }
    }

    let widths = (name_width, tag_width);
    let accessions: Vec<_> = alignment
        .sequences
        .iter()
        .filter_map(|s| s.accession.as_deref().map(|v| (s.name.as_str(), v)))
        .collect();
    write_gs_group(writer, widths, "AC", &accessions)?;

    let descriptions: Vec<_> = alignment
        .sequences
        .iter()
        .filter_map(|s| s.description.as_deref().map(|v| (s.name.as_str(), v)))
        .collect();
    write_gs_group(writer, widths, "DE", &descriptions)?;

    for (tag, values) in &alignment.gs {
        // Repeated lines were joined with newlines; split them back out.
        let lines: Vec<_> = alignment
            .sequences
            .iter()
            .zip(values)
            .filter_map(|(s, v)| v.as_deref().map(|v| (s.name.as_str(), v)))
            .flat_map(|(name, v)| v.split('\n').map(move |line| (name, line)))
            .collect();
        write_gs_group(writer, widths, tag, &lines)?;
    }
    Ok(())
}

fn write_gs_group<W: Write>(
    writer: &mut W,
    (name_width, tag_width): (usize, usize),
    tag: &str,
    lines: &[(&str, &str)],
) -> Result<()> {
    if lines.is_empty() {
        return Ok(());
    }
    writeln!(writer)?;
    for (name, value) in lines {
        writeln!(writer, "#=GS {name:name_width$} {tag:tag_width$} {value}")?;
    }
    Ok(())
}

/// Column widths for the name margins of block lines.
struct Layout {
    name_width: usize,
    gr_tag_width: usize,
    margin: usize,
}

impl Layout {
    fn new(alignment: &Alignment) -> Self {
        let name_width = alignment.max_name_len();

        let mut gc_width = alignment.gc.keys().map(String::len).max().unwrap_or(0);
        if alignment.rf.is_some() {
            gc_width = gc_width.max(2);
        }
        if alignment.ss_cons.is_some() || alignment.sa_cons.is_some() || alignment.pp_cons.is_some() {
            gc_width = gc_width.max(7);
        }

        let mut gr_width = alignment.gr.keys().map(String::len).max().unwrap_or(0);
        if alignment
            .sequences
            .iter()
            .any(|s| s.ss.is_some() || s.sa.is_some() || s.pp.is_some())
        {
            gr_width = gr_width.max(2);
        }

        let mut margin = name_width + 1;
        if gc_width > 0 {
            margin = margin.max(gc_width + 6);
        }
        if gr_width > 0 {
            margin = margin.max(name_width + gr_width + 7);
        }

        Self {
            name_width,
            gr_tag_width: margin.saturating_sub(name_width + 7),
            margin,
        }
    }
}

/// Columns `start..start + len` of `s`, counted in characters.
fn columns(s: &str, start: usize, len: usize) -> &str {
    if s.is_ascii() {
        let end = (start + len).min(s.len());
        return &s[start.min(end)..end];
    }
    let byte_at = |col: usize| s.char_indices().nth(col).map_or(s.len(), |(i, _)| i);
    &s[byte_at(start)..byte_at(start + len)]
}

fn write_block<W: Write>(
    alignment: &Alignment,
    layout: &Layout,
    writer: &mut W,
    start: usize,
    cpl: usize,
) -> Result<()> {
    let seq_width = layout.margin - 1;
    let gc_width = layout.margin.saturating_sub(6);
    let name_width = layout.name_width;
    let gr_width = layout.gr_tag_width;

    for (idx, seq) in alignment.sequences.iter().enumerate() {
        writeln!(writer, "{:seq_width$} {}", seq.name, columns(&seq.residues, start, cpl))?;

        for (tag, value) in [("SS", &seq.ss), ("SA", &seq.sa), ("PP", &seq.pp)] {
            if let Some(value) = value {
                writeln!(
                    writer,
                    "#=GR {:name_width$} {tag:gr_width$} {}",
                    seq.name,
                    columns(value, start, cpl)
                )?;
            }
        }
        for (tag, values) in &alignment.gr {
            if let Some(Some(value)) = values.get(idx) {
                writeln!(
                    writer,
                    "#=GR {:name_width$} {tag:gr_width$} {}",
                    seq.name,
                    columns(value, start, cpl)
                )?;
            }
        }
    }

    for (tag, value) in [
        ("SS_cons", &alignment.ss_cons),
        ("SA_cons", &alignment.sa_cons),
        ("PP_cons", &alignment.pp_cons),
        ("RF", &alignment.rf),
    ] {
        if let Some(value) = value {
            writeln!(writer, "#=GC {tag:gc_width$} {}", columns(value, start, cpl))?;
        }
    }
    for (tag, value) in &alignment.gc {
        writeln!(writer, "#=GC {tag:gc_width$} {}", columns(value, start, cpl))?;
    }
    Ok(())
}

/// Write a Stockholm alignment to a string.
pub fn write_string(alignment: &Alignment, block_width: Option<usize>) -> Result<String> {
    let mut buffer = Vec::new();
    write(alignment, &mut buffer, block_width)?;
    Ok(String::from_utf8_lossy(&buffer).to_string())
}

/// Write a Stockholm alignment to a file.
pub fn write_file(alignment: &Alignment, path: &std::path::Path, block_width: Option<usize>) -> Result<()> {
    let mut file = std::io::BufWriter::new(std::fs::File::create(path)?);
    write(alignment, &mut file, block_width)?;
    file.flush()
}

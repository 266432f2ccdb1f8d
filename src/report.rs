use crate::error::Result;
use crate::stats::PageStatistics;
use crate::words::WordCounter;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Writes the four report sections: title words, body words, size and
/// year distributions, separated by blank lines.
pub fn write_report<W: Write>(stats: &PageStatistics, top_k: usize, out: &mut W) -> Result<()> {
    writeln!(out, "Top-{} words in titles:", top_k)?;
    write_words(out, stats.titles(), top_k)?;
    writeln!(out)?;

    writeln!(out, "Top-{} words in bodies:", top_k)?;
    write_words(out, stats.bodies(), top_k)?;
    writeln!(out)?;

    writeln!(out, "Page size distribution (decimal digits - 1):")?;
    for (bucket, count) in stats.sizes().rows() {
        writeln!(out, "{} {}", bucket, count)?;
    }
    writeln!(out)?;

    writeln!(out, "Pages by year:")?;
    for (year, count) in stats.years().rows() {
        writeln!(out, "{} {}", year, count)?;
    }
    Ok(())
}

fn write_words<W: Write>(out: &mut W, words: &dyn WordCounter, top_k: usize) -> Result<()> {
    for (token, count) in words.top_k(top_k) {
        writeln!(out, "{} {}", count, token)?;
    }
    Ok(())
}

/// Writes the report to `path`, replacing any existing file
pub fn write_report_file(stats: &PageStatistics, top_k: usize, path: &Path) -> Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    write_report(stats, top_k, &mut out)?;
    out.flush()?;
    Ok(())
}

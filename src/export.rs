use std::fs::OpenOptions;
use std::io::{self, BufWriter, Write as _};
use std::path::Path;

use anyhow::Context as _;

use crate::cli::OutputFormat;
use crate::formats::{BibliographicRecord, HarvestResult, RunSummary};

pub fn write_result(
    result: &HarvestResult,
    out: &Path,
    format: OutputFormat,
    force: bool,
) -> anyhow::Result<()> {
    let file = open_output(out, force)?;
    let mut writer = BufWriter::new(file);
    write_records(&mut writer, &result.records, format)
        .with_context(|| format!("write records: {}", out.display()))?;
    writer
        .flush()
        .with_context(|| format!("flush output: {}", out.display()))?;
    Ok(())
}

pub fn write_summary(summary: &RunSummary, out: &Path, force: bool) -> anyhow::Result<()> {
    let file = open_output(out, force)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, summary).context("serialize run summary")?;
    writer
        .write_all(b"\n")
        .context("write run summary newline")?;
    writer
        .flush()
        .with_context(|| format!("flush summary: {}", out.display()))?;
    Ok(())
}

pub fn write_records<W: io::Write>(
    mut w: W,
    records: &[BibliographicRecord],
    format: OutputFormat,
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Csv | OutputFormat::Tsv => {
            let sep = if format == OutputFormat::Csv { ',' } else { '\t' };
            let header = BibliographicRecord::COLUMNS.map(str::to_owned);
            write_row(&mut w, &header, sep)?;
            for record in records {
                write_row(&mut w, &record.to_row(), sep)?;
            }
        }
        OutputFormat::Jsonl => {
            for record in records {
                serde_json::to_writer(&mut w, record).context("serialize record json")?;
                w.write_all(b"\n").context("write record newline")?;
            }
        }
    }
    Ok(())
}

fn open_output(out: &Path, force: bool) -> anyhow::Result<std::fs::File> {
    if out.exists() && !force {
        anyhow::bail!("output already exists: {}", out.display());
    }
    if let Some(parent) = out.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir: {}", parent.display()))?;
    }

    let mut options = OpenOptions::new();
    options.write(true);
    if force {
        options.create(true).truncate(true);
    } else {
        options.create_new(true);
    }
    options
        .open(out)
        .with_context(|| format!("open output: {}", out.display()))
}

fn needs_quotes(field: &str, sep: char) -> bool {
    field.contains(sep) || field.contains('"') || field.contains('\n') || field.contains('\r')
}

/// Write one delimited row, quoting cells that contain the separator,
/// quotes or line breaks.
pub fn write_row<W: io::Write>(mut w: W, row: &[String], sep: char) -> io::Result<()> {
    for (idx, cell) in row.iter().enumerate() {
        if idx > 0 {
            write!(w, "{sep}")?;
        }
        if needs_quotes(cell, sep) {
            write!(w, "\"{}\"", cell.replace('"', "\"\""))?;
        } else {
            write!(w, "{cell}")?;
        }
    }
    writeln!(w)
}

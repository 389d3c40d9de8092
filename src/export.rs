use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;

use crate::record::{Category, CompoundRecord, ResultSet};

static UNSAFE_CHARS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9._-]+").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Format {
    #[default]
    Csv,
    Json,
}

impl Format {
    pub fn extension(&self) -> &'static str {
        match self {
            Format::Csv => "csv",
            Format::Json => "json",
        }
    }
}

/// `results_KNApSAcK_<category>_<keyword>.<ext>`, keyword made file-system safe.
pub fn default_filename(category: Category, keyword: &str, format: Format) -> PathBuf {
    let keyword = UNSAFE_CHARS_RE.replace_all(keyword.trim(), "_");
    let keyword = keyword.trim_matches('_');
    let keyword = if keyword.is_empty() { "all" } else { keyword };
    PathBuf::from(format!(
        "results_KNApSAcK_{}_{}.{}",
        category,
        keyword,
        format.extension()
    ))
}

/// Writes one header row plus one row per record. The Organism column is
/// only present for organism searches.
pub fn write_csv<W: Write>(writer: W, results: &ResultSet) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new().has_headers(false).from_writer(writer);
    let with_organism = results.category == Some(Category::Organism);

    let mut header = vec!["Names", "CAS No.", "KNApSAcK ID", "SMILES"];
    if with_organism {
        header.push("Organism");
    }
    wtr.write_record(&header).context("Failed to write CSV header")?;

    for record in &results.records {
        wtr.write_record(row(record, with_organism))
            .context("Failed to write CSV record")?;
    }

    wtr.flush().context("Failed to flush CSV")?;
    Ok(())
}

fn row(record: &CompoundRecord, with_organism: bool) -> Vec<String> {
    let mut fields = vec![
        record.joined_names(),
        record.cas.clone(),
        record.database_id.clone(),
        record.smiles.clone(),
    ];
    if with_organism {
        fields.push(record.organism.clone().unwrap_or_default());
    }
    fields
}

pub fn write_json<W: Write>(writer: W, results: &ResultSet) -> Result<()> {
    serde_json::to_writer_pretty(writer, &results.records).context("Failed to write JSON")?;
    Ok(())
}

pub fn save(path: &Path, results: &ResultSet, format: Format) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    let mut out = BufWriter::new(file);
    match format {
        Format::Csv => write_csv(&mut out, results)?,
        Format::Json => write_json(&mut out, results)?,
    }
    out.flush()?;
    Ok(())
}

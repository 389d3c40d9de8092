use std::sync::LazyLock;

use scraper::{Html, Selector};

use super::raw_text;
use crate::error::ValidationError;
use crate::fetcher::Document;
use crate::record::CompoundRecord;

static CELL_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"td[colspan="4"]"#).unwrap());

// Positions of the wide cells on a detail page.
const NAMES: usize = 0;
const CAS: usize = 3;
const DATABASE_ID: usize = 4;
const SMILES: usize = 7;
pub const REQUIRED_CELLS: usize = 8;

/// Pulls names, CAS, database ID and SMILES from a compound page.
///
/// `organism` is always `None` here; organism searches fill it in afterwards.
pub fn extract_compound(document: &Document) -> Result<CompoundRecord, ValidationError> {
    let html = Html::parse_document(&document.body);
    let cells: Vec<_> = html.select(&CELL_SEL).collect();

    if cells.len() < REQUIRED_CELLS {
        return Err(ValidationError::MissingCells {
            url: document.url.clone(),
            expected: REQUIRED_CELLS,
            found: cells.len(),
        });
    }

    let names = cells[NAMES]
        .text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    let database_id = raw_text(&cells[DATABASE_ID])
        .split_whitespace()
        .next()
        .map(str::to_string)
        .ok_or_else(|| ValidationError::EmptyField {
            url: document.url.clone(),
            field: "database ID",
        })?;

    Ok(CompoundRecord {
        names,
        cas: raw_text(&cells[CAS]).trim().to_string(),
        database_id,
        smiles: raw_text(&cells[SMILES]).trim().to_string(),
        organism: None,
    })
}

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

use super::raw_text;
use crate::fetcher::Document;
use crate::record::{Category, CompoundLink, OrganismIndex};

/// Substring that marks a compound detail link on the result page.
pub const DETAIL_MARKER: &str = "information";

const CAS_CELL: usize = 1;
const ORGANISM_CELL: usize = 5;

static LINK_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[href]").unwrap());
static ROW_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").unwrap());

#[derive(Debug, Clone, Default)]
pub struct SearchResults {
    /// Every detail link in page order, header entry included.
    pub links: Vec<CompoundLink>,
    /// Only built for organism searches.
    pub organism_index: Option<OrganismIndex>,
}

impl SearchResults {
    /// Links worth fetching: the first entry is the table header.
    pub fn detail_links(&self) -> &[CompoundLink] {
        self.links.get(1..).unwrap_or(&[])
    }

    pub fn has_results(&self) -> bool {
        self.links.len() > 1
    }
}

pub fn extract_search_results(document: &Document, category: Category) -> SearchResults {
    let html = Html::parse_document(&document.body);
    let links = extract_links(&html);
    let organism_index = match category {
        Category::Organism => Some(extract_organism_index(&html)),
        Category::Metabolite => None,
    };
    SearchResults { links, organism_index }
}

fn extract_links(html: &Html) -> Vec<CompoundLink> {
    html.select(&LINK_SEL)
        .filter_map(|a| a.value().attr("href"))
        .filter(|href| href.contains(DETAIL_MARKER))
        .map(CompoundLink::new)
        .collect()
}

fn extract_organism_index(html: &Html) -> OrganismIndex {
    let mut index = OrganismIndex::new();
    for row in html.select(&ROW_SEL) {
        let cells: Vec<ElementRef> = row
            .children()
            .filter_map(ElementRef::wrap)
            .filter(|el| el.value().name() == "td")
            .collect();
        if cells.len() <= ORGANISM_CELL {
            continue;
        }
        let cas = raw_text(&cells[CAS_CELL]).trim().to_string();
        let organism = raw_text(&cells[ORGANISM_CELL]);
        index.insert(cas, organism);
    }
    index
}

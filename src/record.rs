use std::collections::HashMap;
use std::fmt;

use serde::Serialize;
use tracing::warn;

/// Search axis offered by the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Metabolite,
    Organism,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Metabolite => "metabolite",
            Category::Organism => "organism",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub category: Category,
    pub keyword: String,
}

impl SearchRequest {
    pub fn new(category: Category, keyword: impl Into<String>) -> Self {
        Self { category, keyword: keyword.into() }
    }
}

/// Relative reference to a compound detail page, as found on the search page.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CompoundLink(String);

impl CompoundLink {
    pub fn new(fragment: impl Into<String>) -> Self {
        Self(fragment.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CompoundLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// CAS identifier → organism name, taken from an organism search page.
///
/// The source table may list the same CAS more than once; the first row wins.
#[derive(Debug, Clone, Default)]
pub struct OrganismIndex {
    by_cas: HashMap<String, String>,
}

impl OrganismIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a row unless the CAS is already known.
    pub fn insert(&mut self, cas: impl Into<String>, organism: impl Into<String>) {
        self.by_cas.entry(cas.into()).or_insert_with(|| organism.into());
    }

    pub fn lookup(&self, cas: &str) -> Option<&str> {
        self.by_cas.get(cas.trim()).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_cas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_cas.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for OrganismIndex {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut index = OrganismIndex::new();
        for (cas, organism) in iter {
            index.insert(cas, organism);
        }
        index
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompoundRecord {
    pub names: Vec<String>,
    pub cas: String,
    pub database_id: String,
    pub smiles: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organism: Option<String>,
}

impl CompoundRecord {
    pub fn joined_names(&self) -> String {
        self.names.join(", ")
    }

    /// Attaches the source organism from `index`.
    ///
    /// A CAS that is missing from the index leaves `organism` empty and logs a
    /// warning; the record itself is still kept.
    pub fn with_organism(mut self, index: &OrganismIndex) -> Self {
        match index.lookup(&self.cas) {
            Some(organism) => self.organism = Some(organism.to_string()),
            None => {
                warn!(
                    "No organism listed for CAS {:?} ({})",
                    self.cas, self.database_id
                );
                self.organism = None;
            }
        }
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum SortKey {
    /// Keep the order in which detail fetches finished.
    #[default]
    Completion,
    Cas,
    Id,
    Name,
}

/// Records collected by one run, in completion order.
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    pub category: Option<Category>,
    pub records: Vec<CompoundRecord>,
    /// Number of detail fetches that were scheduled.
    pub scheduled: usize,
    /// Detail fetches dropped after exhausting their attempts.
    pub failed: usize,
}

impl ResultSet {
    pub fn no_results(category: Category) -> Self {
        Self { category: Some(category), ..Default::default() }
    }

    /// True when the search page listed no compounds at all.
    pub fn is_no_results(&self) -> bool {
        self.scheduled == 0
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn sort_by(&mut self, key: SortKey) {
        match key {
            SortKey::Completion => {}
            SortKey::Cas => self.records.sort_by(|a, b| a.cas.cmp(&b.cas)),
            SortKey::Id => self.records.sort_by(|a, b| a.database_id.cmp(&b.database_id)),
            SortKey::Name => self
                .records
                .sort_by(|a, b| a.names.first().cmp(&b.names.first())),
        }
    }
}

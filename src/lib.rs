//! Compound lookups against the KNApSAcK metabolite/organism database.
//!
//! A keyword search is scraped for compound links, each detail page is
//! fetched concurrently with retries, and the parsed records come back as a
//! [`ResultSet`].

pub mod config;
pub mod error;
pub mod export;
pub mod fetcher;
pub mod harvest;
pub mod parser;
pub mod record;

pub use config::HarvestConfig;
pub use error::{DetailError, FetchError, HarvestError, ValidationError};
pub use fetcher::{Document, HttpFetcher, PageFetcher};
pub use harvest::{Harvester, Progress};
pub use record::{
    Category, CompoundLink, CompoundRecord, OrganismIndex, ResultSet, SearchRequest, SortKey,
};

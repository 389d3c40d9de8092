use thiserror::Error;

/// Transport-level failure for a single GET.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },
    #[error("could not read body of {url}: {source}")]
    Body {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// A detail page that does not have the fixed layout the extractor expects.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{url}: expected at least {expected} detail cells, found {found}")]
    MissingCells {
        url: String,
        expected: usize,
        found: usize,
    },
    #[error("{url}: {field} cell is empty")]
    EmptyField { url: String, field: &'static str },
}

/// One failed detail attempt.
#[derive(Debug, Error)]
pub enum DetailError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Errors that abort a whole run.
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("search request failed: {0}")]
    Search(#[source] FetchError),
    #[error("invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("invalid configuration: {0}")]
    Config(String),
}

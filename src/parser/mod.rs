pub mod detail;
pub mod search;

pub use detail::extract_compound;
pub use search::{extract_search_results, SearchResults};

use scraper::ElementRef;

/// Concatenated text of every node under `el`, untouched.
fn raw_text(el: &ElementRef) -> String {
    el.text().collect()
}

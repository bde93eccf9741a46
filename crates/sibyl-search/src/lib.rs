mod ares;
mod duckduckgo;

pub use ares::{AresConfig, AresSearch};
pub use duckduckgo::DuckDuckGoSearch;

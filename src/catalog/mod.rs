pub mod fetcher;
pub mod probe;
pub mod types;

pub use fetcher::CatalogFetcher;
pub use probe::{DurationProbe, FfprobeProbe, NoProbe};
pub use types::*;

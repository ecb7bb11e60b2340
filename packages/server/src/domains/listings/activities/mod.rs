//! Listing activities - the individual pipeline steps

pub mod extract;
pub mod load;
pub mod normalize;

pub use extract::{extract_listings, ExtractionError, RenderWait};
pub use load::{load_listings, LoadError};
pub use normalize::{normalize_listings, parse_posted_date};

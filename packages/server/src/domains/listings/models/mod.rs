pub mod destination;
pub mod listing;
pub mod listing_table;

pub use destination::*;
pub use listing::*;
pub use listing_table::*;

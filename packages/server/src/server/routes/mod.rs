// HTTP routes
pub mod run;

pub use run::*;

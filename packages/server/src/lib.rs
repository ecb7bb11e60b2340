// Job Board Loader - Core
//
// Scrapes job listings from a rendered job board with a headless browser,
// normalizes them into a table, and replaces a BigQuery table with it.
// Triggered once per process (run_once) or per HTTP GET (server).

pub mod config;
pub mod domains;
pub mod kernel;
pub mod server;

pub use config::*;

use serde::Serialize;

/// A job posting as scraped from one listing card. Every field is the
/// element's rendered text, unparsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Listing {
    pub title: String,
    pub company: String,
    pub location: String,
    /// Expected as `YYYY-MM-DD`, but taken verbatim from the page.
    pub date_posted: String,
}

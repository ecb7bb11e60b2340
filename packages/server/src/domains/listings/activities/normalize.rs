//! Listing normalization.
//!
//! Turns scraped listings into table rows. The only conversion is
//! `date_posted`, which must be a strict `YYYY-MM-DD` calendar date; any
//! other value becomes a missing date and the row is kept.

use chrono::NaiveDate;
use tracing::debug;

use crate::domains::listings::models::{Listing, ListingRow, ListingTable};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// One row per listing, same order.
pub fn normalize_listings(listings: Vec<Listing>) -> ListingTable {
    let rows: Vec<ListingRow> = listings
        .into_iter()
        .map(|listing| {
            let date_posted = parse_posted_date(&listing.date_posted);
            if date_posted.is_none() {
                debug!(raw = %listing.date_posted, title = %listing.title, "Unparseable posting date");
            }
            ListingRow {
                title: listing.title,
                company: listing.company,
                location: listing.location,
                date_posted,
            }
        })
        .collect();

    ListingTable::new(rows)
}

/// Parse `YYYY-MM-DD`. Unpadded, signed, or surrounding-whitespace variants
/// are rejected, as are impossible dates such as `2024-02-30`.
pub fn parse_posted_date(raw: &str) -> Option<NaiveDate> {
    let bytes = raw.as_bytes();
    let shaped = bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        });
    if !shaped {
        return None;
    }
    NaiveDate::parse_from_str(raw, DATE_FORMAT).ok()
}

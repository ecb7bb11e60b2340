//! Listing extraction from the rendered job board.
//!
//! The page contract is a flat list of cards. Each card carries a title,
//! a company, a location and a `<time>` element with the posting date.

use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::domains::listings::models::Listing;
use crate::kernel::{BrowserError, BrowserSession, Marker, PageElement};

pub const CARD: Marker = Marker::Class("card-content");
pub const TITLE: Marker = Marker::Class("title");
pub const COMPANY: Marker = Marker::Class("company");
pub const LOCATION: Marker = Marker::Class("location");
pub const DATE_POSTED: Marker = Marker::Tag("time");

/// How long to let client-side rendering run before reading cards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderWait {
    /// Sleep for a fixed duration regardless of page state.
    Fixed(Duration),
    /// Poll for the first card, giving up (not failing) after `timeout`.
    UntilPresent { timeout: Duration, poll: Duration },
}

impl Default for RenderWait {
    fn default() -> Self {
        RenderWait::Fixed(Duration::from_secs(2))
    }
}

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("{0}")]
    Navigation(#[source] BrowserError),

    #[error("listing card {card_index} has no {marker} element; page structure changed")]
    MissingElement { card_index: usize, marker: Marker },

    #[error("{0}")]
    Browser(#[from] BrowserError),
}

/// Navigate to `url`, wait for rendering, and read one [`Listing`] per card
/// in document order. A page without cards yields an empty list.
pub async fn extract_listings(
    session: &dyn BrowserSession,
    url: &str,
    wait: RenderWait,
) -> Result<Vec<Listing>, ExtractionError> {
    info!(url, "Loading job board");
    session
        .navigate(url)
        .await
        .map_err(ExtractionError::Navigation)?;

    wait_for_render(session, wait).await?;

    let cards = session.find_all(CARD).await?;
    if cards.is_empty() {
        warn!(url, "No listing cards found; an empty table will be loaded");
        return Ok(Vec::new());
    }

    let mut listings = Vec::with_capacity(cards.len());
    for (card_index, card) in cards.iter().enumerate() {
        listings.push(read_card(card.as_ref(), card_index).await?);
    }

    info!(url, count = listings.len(), "Listings extracted");
    Ok(listings)
}

async fn wait_for_render(
    session: &dyn BrowserSession,
    wait: RenderWait,
) -> Result<(), ExtractionError> {
    match wait {
        RenderWait::Fixed(delay) => {
            debug!(delay_ms = delay.as_millis() as u64, "Waiting for page to render");
            tokio::time::sleep(delay).await;
        }
        RenderWait::UntilPresent { timeout, poll } => {
            let deadline = tokio::time::Instant::now() + timeout;
            loop {
                if !session.find_all(CARD).await?.is_empty() {
                    break;
                }
                if tokio::time::Instant::now() >= deadline {
                    warn!(
                        timeout_ms = timeout.as_millis() as u64,
                        "No listing cards appeared before the render timeout"
                    );
                    break;
                }
                tokio::time::sleep(poll).await;
            }
        }
    }
    Ok(())
}

async fn read_card(card: &dyn PageElement, card_index: usize) -> Result<Listing, ExtractionError> {
    Ok(Listing {
        title: read_field(card, card_index, TITLE).await?,
        company: read_field(card, card_index, COMPANY).await?,
        location: read_field(card, card_index, LOCATION).await?,
        date_posted: read_field(card, card_index, DATE_POSTED).await?,
    })
}

async fn read_field(
    card: &dyn PageElement,
    card_index: usize,
    marker: Marker,
) -> Result<String, ExtractionError> {
    let element = card
        .find_one(marker)
        .await?
        .ok_or(ExtractionError::MissingElement { card_index, marker })?;
    Ok(element.text().await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::test_dependencies::{fake_jobs_card, fake_jobs_page, StaticPageProvider};
    use crate::kernel::SessionProvider;

    const URL: &str = "https://jobs.example.com/";

    fn no_wait() -> RenderWait {
        RenderWait::Fixed(Duration::ZERO)
    }

    #[tokio::test]
    async fn reads_cards_in_document_order() {
        let html = fake_jobs_page(&[
            fake_jobs_card("Senior Python Developer", "Payne, Roberts and Davis", "Stewartbury, AA", "2021-04-08"),
            fake_jobs_card("Energy engineer", "Vasquez-Davidson", "Christopherville, AA", "2021-04-08"),
            fake_jobs_card("Legal executive", "Jackson, Chambers and Levy", "Port Ericaburgh, AA", "not-a-date"),
        ]);
        let provider = StaticPageProvider::new().with_page(URL, html);
        let session = provider.start().await.unwrap();

        let listings = extract_listings(session.as_ref(), URL, no_wait()).await.unwrap();

        let titles: Vec<&str> = listings.iter().map(|l| l.title.as_str()).collect();
        assert_eq!(
            titles,
            vec!["Senior Python Developer", "Energy engineer", "Legal executive"]
        );
        assert_eq!(listings[0].company, "Payne, Roberts and Davis");
        assert_eq!(listings[1].location, "Christopherville, AA");
        assert_eq!(listings[2].date_posted, "not-a-date");
    }

    #[tokio::test]
    async fn page_without_cards_yields_no_listings() {
        let provider = StaticPageProvider::new().with_page(URL, fake_jobs_page(&[]));
        let session = provider.start().await.unwrap();

        let listings = extract_listings(session.as_ref(), URL, no_wait()).await.unwrap();

        assert!(listings.is_empty());
    }

    #[tokio::test]
    async fn card_missing_a_field_is_a_structure_error() {
        let broken = r#"<div class="card-content"><h2 class="title">Orphan</h2></div>"#;
        let html = fake_jobs_page(&[
            fake_jobs_card("Energy engineer", "Vasquez-Davidson", "Christopherville, AA", "2021-04-08"),
            broken.to_string(),
        ]);
        let provider = StaticPageProvider::new().with_page(URL, html);
        let session = provider.start().await.unwrap();

        let err = extract_listings(session.as_ref(), URL, no_wait())
            .await
            .unwrap_err();

        match err {
            ExtractionError::MissingElement { card_index, marker } => {
                assert_eq!(card_index, 1);
                assert_eq!(marker, COMPANY);
            }
            other => panic!("expected MissingElement, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unreachable_url_is_a_navigation_error() {
        let provider = StaticPageProvider::new();
        let session = provider.start().await.unwrap();

        let err = extract_listings(session.as_ref(), URL, no_wait())
            .await
            .unwrap_err();

        assert!(matches!(err, ExtractionError::Navigation(_)));
    }

    #[tokio::test]
    async fn until_present_gives_up_quietly_on_empty_page() {
        let provider = StaticPageProvider::new().with_page(URL, fake_jobs_page(&[]));
        let session = provider.start().await.unwrap();
        let wait = RenderWait::UntilPresent {
            timeout: Duration::from_millis(20),
            poll: Duration::from_millis(5),
        };

        let listings = extract_listings(session.as_ref(), URL, wait).await.unwrap();

        assert!(listings.is_empty());
    }
}

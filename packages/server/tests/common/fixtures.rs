//! Test fixtures for pipeline runs.

use std::time::Duration;

use job_board_core::domains::listings::{Destination, PipelineConfig, RenderWait};
use job_board_core::kernel::test_dependencies::{
    fake_jobs_card, fake_jobs_page, MockWarehouse, StaticPageProvider,
};
use job_board_core::kernel::TestDependencies;

pub const BOARD_URL: &str = "https://jobs.example.com/fake-jobs/";
pub const TABLE: &str = "proj.jobs.postings";

pub fn pipeline_config() -> PipelineConfig {
    PipelineConfig {
        source_url: BOARD_URL.to_string(),
        render_wait: RenderWait::Fixed(Duration::ZERO),
        destination: Destination {
            project_id: "proj".to_string(),
            dataset_id: "jobs".to_string(),
            table_name: "postings".to_string(),
            region: "EU".to_string(),
        },
    }
}

/// A board page with one card per `(title, date_posted)` pair.
pub fn board_with(cards: &[(&str, &str)]) -> String {
    let cards: Vec<String> = cards
        .iter()
        .map(|(title, date)| fake_jobs_card(title, "Acme Corp", "Austin, TX", date))
        .collect();
    fake_jobs_page(&cards)
}

/// Static board page plus a fresh in-memory warehouse.
pub fn deps_for_board(cards: &[(&str, &str)]) -> TestDependencies {
    TestDependencies::new(
        StaticPageProvider::new().with_page(BOARD_URL, board_with(cards)),
        MockWarehouse::new(),
    )
}

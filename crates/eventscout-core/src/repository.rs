use async_trait::async_trait;

use crate::{error::DomainError, models::EventPage};

pub type DomainResult<T> = std::result::Result<T, DomainError>;

/// Where event pages come from
///
/// The controller only ever talks to this trait, which keeps it testable
/// without a network and lets us swap the backing API later.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventRepository: Send + Sync {
    /// Unfiltered listing, 0-based page
    async fn fetch_page(&self, page: u32) -> DomainResult<EventPage>;

    /// Listing filtered by keyword, 0-based page
    async fn search_page(&self, query: &str, page: u32) -> DomainResult<EventPage>;
}

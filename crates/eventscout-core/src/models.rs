use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

/// Event model - what ends up as a tile on screen
///
/// Two events are the same event if they share an id, full stop. The API
/// happily returns the same event with slightly different decoration on
/// adjacent pages, and we don't want both.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub name: String,
    /// First image in the API's list, if there is one
    pub primary_image_url: Option<String>,
    /// "venue, address, state, country" with blanks for missing parts
    pub venue_summary: String,
    /// `YYYY-MM-DD` as the API sent it, empty if absent
    pub start_date_local: String,
    pub url: Option<String>,
    pub is_test: bool,
}

impl Event {
    /// Minimal event, mostly useful for tests and fixtures
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            primary_image_url: None,
            venue_summary: String::new(),
            start_date_local: String::new(),
            url: None,
            is_test: false,
        }
    }

    /// Parsed start date, `None` when the API didn't give us a usable one
    pub fn start_date(&self) -> Option<NaiveDate> {
        if self.start_date_local.is_empty() {
            return None;
        }
        NaiveDate::parse_from_str(&self.start_date_local, "%Y-%m-%d").ok()
    }
}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Event {}

impl Hash for Event {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Build the venue line from its optional parts
///
/// Missing parts stay as empty strings so the comma layout never shifts.
pub fn venue_summary(
    name: Option<&str>,
    address: Option<&str>,
    state: Option<&str>,
    country: Option<&str>,
) -> String {
    [name, address, state, country]
        .into_iter()
        .map(Option::unwrap_or_default)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Pagination info straight from the API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PageMetadata {
    /// 0-based
    pub page_number: u32,
    pub page_size: u32,
    pub total_elements: u64,
    pub total_pages: u32,
}

impl PageMetadata {
    /// True when `page` is the final page (or beyond it)
    pub fn is_last_page(&self, page: u32) -> bool {
        page.saturating_add(1) >= self.total_pages
    }
}

/// One page of events plus where it sits in the listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventPage {
    pub events: Vec<Event>,
    pub page_meta: PageMetadata,
}

impl EventPage {
    /// A page the API says holds nothing more
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Short page - the API ran out before filling it
    pub fn is_short(&self) -> bool {
        self.page_meta.page_size > 0
            && (self.events.len() as u64) < u64::from(self.page_meta.page_size)
    }
}

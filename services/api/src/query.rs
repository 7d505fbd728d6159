//! Event listing: typed filters, ordering and offset pagination.
//!
//! Both stores evaluate [`EventFilter`] with the same semantics; `MemoryStore`
//! calls [`EventFilter::matches`] directly and `PgStore` translates each field
//! into a nullable SQL predicate.

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::Serialize;

use crate::model::Event;

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Filters for listing events. Absent fields do not constrain the result;
/// present fields are combined with AND.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventFilter {
    /// Case-insensitive substring of the event name.
    pub search: Option<String>,
    /// Exact category.
    pub category: Option<String>,
    /// Exact location.
    pub location: Option<String>,
    /// UTC calendar day the event takes place on.
    pub date: Option<NaiveDate>,
}

impl EventFilter {
    /// Half-open `[start, end)` bounds of the `date` filter.
    pub fn day_bounds(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let day = self.date?;
        let start = day.and_hms_opt(0, 0, 0)?.and_utc();
        let end = day.checked_add_days(Days::new(1))?.and_hms_opt(0, 0, 0)?.and_utc();
        Some((start, end))
    }

    /// Lower-cased search needle, if any.
    pub fn search_needle(&self) -> Option<String> {
        self.search.as_deref().map(str::to_lowercase)
    }

    pub fn matches(&self, event: &Event) -> bool {
        if let Some(needle) = self.search_needle() {
            if !event.name.to_lowercase().contains(&needle) {
                return false;
            }
        }

        if let Some(category) = &self.category {
            if event.category.as_deref() != Some(category.as_str()) {
                return false;
            }
        }

        if let Some(location) = &self.location {
            if &event.location != location {
                return false;
            }
        }

        if let Some((start, end)) = self.day_bounds() {
            if event.datetime < start || event.datetime >= end {
                return false;
            }
        }

        true
    }
}

/// A 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageRequest {
    /// Builds a page request from raw query-string values.
    ///
    /// Anything that is not a positive integer falls back to the default;
    /// the page size is capped at [`MAX_PAGE_SIZE`].
    pub fn from_raw(page: Option<&str>, limit: Option<&str>) -> Self {
        let positive = |raw: Option<&str>| {
            raw.and_then(|s| s.trim().parse::<u32>().ok())
                .filter(|n| *n > 0)
        };

        Self {
            page: positive(page).unwrap_or(DEFAULT_PAGE),
            page_size: positive(limit)
                .unwrap_or(DEFAULT_PAGE_SIZE)
                .min(MAX_PAGE_SIZE),
        }
    }

    /// Number of matching events to skip.
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.page_size)
    }

    pub fn total_pages(&self, total: u64) -> u64 {
        total.div_ceil(u64::from(self.page_size))
    }
}

/// One page of events plus pagination metadata.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPage {
    pub current_page: u32,
    pub total_pages: u64,
    /// Number of events matching the filter.
    pub total_events: u64,
    pub events: Vec<Event>,
}

impl EventPage {
    pub fn new(request: PageRequest, total_events: u64, events: Vec<Event>) -> Self {
        Self {
            current_page: request.page,
            total_pages: request.total_pages(total_events),
            total_events,
            events,
        }
    }
}

/// Applies filter, `datetime` ordering and pagination to an in-memory set.
pub fn paginate<'a>(
    events: impl IntoIterator<Item = &'a Event>,
    filter: &EventFilter,
    request: PageRequest,
) -> EventPage {
    let mut matching: Vec<&Event> = events.into_iter().filter(|e| filter.matches(e)).collect();
    matching.sort_by(|a, b| a.datetime.cmp(&b.datetime).then_with(|| a.id.cmp(&b.id)));

    let total = matching.len() as u64;
    let offset = usize::try_from(request.offset()).unwrap_or(usize::MAX);
    let page = matching
        .into_iter()
        .skip(offset)
        .take(request.page_size as usize)
        .cloned()
        .collect();

    EventPage::new(request, total, page)
}

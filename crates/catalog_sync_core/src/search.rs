//! Debounced, cancellable free-text search with a single "latest results" view.
//!
//! Each debounce timer carries a ticket and each request an id. Only the
//! latest ticket may issue a request, and only the current request id may
//! render; everything else is stale and dropped without an error.

use std::time::Duration;

use sync_logging::{clip_for_log, sync_debug, sync_warn};

use crate::catalog::CatalogItem;
use crate::SyncError;

/// Shorter (trimmed) input only shows a hint.
pub const MIN_QUERY_CHARS: usize = 2;

pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(250);

pub type SearchRequestId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchPhase {
    #[default]
    Empty,
    Debouncing,
    InFlight,
    Rendered,
    Aborted,
    Failed,
}

/// Inline message shown in place of (or next to) the result list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchNotice {
    TypeMore,
    NoResults,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchKey {
    Next,
    Previous,
    Enter,
    Escape,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SearchCommand {
    ScheduleDebounce { ticket: u64, delay: Duration },
    Cancel { request: SearchRequestId },
    Issue { request: SearchRequestId, query: String },
    Open { item: CatalogItem },
}

#[derive(Debug, Clone, PartialEq)]
struct PendingRequest {
    id: SearchRequestId,
    query: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchSession {
    debounce: Duration,
    phase: SearchPhase,
    query: String,
    ticket: u64,
    last_request: SearchRequestId,
    current: Option<PendingRequest>,
    results: Vec<CatalogItem>,
    results_query: Option<String>,
    highlight: Option<usize>,
    notice: Option<SearchNotice>,
}

impl Default for SearchSession {
    fn default() -> Self {
        Self::new(SEARCH_DEBOUNCE)
    }
}

impl SearchSession {
    pub fn new(debounce: Duration) -> Self {
        Self {
            debounce,
            phase: SearchPhase::Empty,
            query: String::new(),
            ticket: 0,
            last_request: 0,
            current: None,
            results: Vec::new(),
            results_query: None,
            highlight: None,
            notice: None,
        }
    }

    pub fn phase(&self) -> SearchPhase {
        self.phase
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn results(&self) -> &[CatalogItem] {
        &self.results
    }

    pub fn highlight(&self) -> Option<usize> {
        self.highlight
    }

    pub fn notice(&self) -> Option<SearchNotice> {
        self.notice
    }

    pub fn current_request(&self) -> Option<SearchRequestId> {
        self.current.as_ref().map(|pending| pending.id)
    }

    /// A keystroke changed the input.
    pub fn on_input(&mut self, text: &str) -> Vec<SearchCommand> {
        self.query = text.to_string();
        if !is_searchable(text) {
            return self.show_hint(text);
        }
        self.ticket += 1;
        self.phase = SearchPhase::Debouncing;
        self.notice = None;
        vec![SearchCommand::ScheduleDebounce {
            ticket: self.ticket,
            delay: self.debounce,
        }]
    }

    /// The debounce timer for `ticket` elapsed.
    pub fn on_debounce_elapsed(&mut self, ticket: u64) -> Vec<SearchCommand> {
        if ticket != self.ticket || self.phase != SearchPhase::Debouncing {
            return Vec::new();
        }
        let query = self.query.trim().to_string();
        self.issue(query)
    }

    /// The user pressed enter in the search box.
    pub fn submit(&mut self, text: &str) -> Vec<SearchCommand> {
        self.query = text.to_string();
        if !is_searchable(text) {
            return self.show_hint(text);
        }
        let query = text.trim().to_string();
        self.ticket += 1;

        // Results stay on screen while a newer query debounces or is in flight.
        let displayed = self
            .results_query
            .as_deref()
            .is_some_and(|shown| shown.to_lowercase() == query.to_lowercase());
        if displayed {
            sync_debug!("Reusing displayed results for '{}'", clip_for_log(&query, 40));
            self.notice = self.results.is_empty().then_some(SearchNotice::NoResults);
            self.phase = SearchPhase::Rendered;
            return self.cancel_in_flight();
        }
        self.issue(query)
    }

    /// A request settled. Returns whether the session changed; stale
    /// completions are ignored.
    pub fn on_completed(
        &mut self,
        request: SearchRequestId,
        result: Result<Vec<CatalogItem>, SyncError>,
    ) -> bool {
        let is_current = self.current.as_ref().is_some_and(|pending| pending.id == request);
        if !is_current {
            sync_debug!("Discarding stale search response {}", request);
            return false;
        }
        let Some(pending) = self.current.take() else {
            return false;
        };
        match result {
            Ok(items) => {
                self.notice = items.is_empty().then_some(SearchNotice::NoResults);
                self.results = items;
                self.results_query = Some(pending.query);
                self.highlight = None;
                self.phase = SearchPhase::Rendered;
            }
            Err(SyncError::Aborted) => {
                self.phase = SearchPhase::Aborted;
            }
            Err(err) => {
                sync_warn!("Search for '{}' failed: {}", clip_for_log(&pending.query, 40), err);
                self.results.clear();
                self.results_query = None;
                self.highlight = None;
                self.notice = Some(SearchNotice::Failed);
                self.phase = SearchPhase::Failed;
            }
        }
        true
    }

    /// Keyboard navigation over the result list.
    pub fn on_key(&mut self, key: SearchKey) -> Vec<SearchCommand> {
        let count = self.results.len();
        match key {
            SearchKey::Next if count > 0 => {
                self.highlight = Some(self.highlight.map_or(0, |index| (index + 1) % count));
                Vec::new()
            }
            SearchKey::Previous if count > 0 => {
                self.highlight = Some(
                    self.highlight
                        .map_or(count - 1, |index| (index + count - 1) % count),
                );
                Vec::new()
            }
            SearchKey::Enter => match self.highlight {
                Some(index) => self.select(index),
                None => Vec::new(),
            },
            SearchKey::Escape => self.clear(),
            SearchKey::Next | SearchKey::Previous => Vec::new(),
        }
    }

    /// Clears the whole session, then opens the chosen result.
    pub fn select(&mut self, index: usize) -> Vec<SearchCommand> {
        let Some(item) = self.results.get(index).cloned() else {
            return Vec::new();
        };
        let mut commands = self.clear();
        commands.push(SearchCommand::Open { item });
        commands
    }

    pub fn clear(&mut self) -> Vec<SearchCommand> {
        self.ticket += 1;
        let commands = self.cancel_in_flight();
        self.query.clear();
        self.reset_results();
        self.notice = None;
        self.phase = SearchPhase::Empty;
        commands
    }

    fn show_hint(&mut self, text: &str) -> Vec<SearchCommand> {
        self.ticket += 1;
        let commands = self.cancel_in_flight();
        self.reset_results();
        self.notice = (!text.trim().is_empty()).then_some(SearchNotice::TypeMore);
        self.phase = SearchPhase::Empty;
        commands
    }

    fn issue(&mut self, query: String) -> Vec<SearchCommand> {
        let mut commands = self.cancel_in_flight();
        self.last_request += 1;
        let request = self.last_request;
        self.current = Some(PendingRequest {
            id: request,
            query: query.clone(),
        });
        self.phase = SearchPhase::InFlight;
        self.notice = None;
        commands.push(SearchCommand::Issue { request, query });
        commands
    }

    fn cancel_in_flight(&mut self) -> Vec<SearchCommand> {
        match self.current.take() {
            Some(pending) => vec![SearchCommand::Cancel { request: pending.id }],
            None => Vec::new(),
        }
    }

    fn reset_results(&mut self) {
        self.results.clear();
        self.results_query = None;
        self.highlight = None;
    }
}

fn is_searchable(text: &str) -> bool {
    text.trim().chars().count() >= MIN_QUERY_CHARS
}

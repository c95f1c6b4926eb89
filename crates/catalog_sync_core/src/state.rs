use std::time::Duration;

use crate::catalog::{CatalogPager, DEFAULT_PAGE_SIZE};
use crate::jobs::JobRegistry;
use crate::poll::{PollIntervals, PollScheduler};
use crate::runtime_cache::{RuntimeCache, RUNTIME_BATCH_SIZE};
use crate::search::{SearchSession, SEARCH_DEBOUNCE};
use crate::settings_mirror::ScraperSettings;
use crate::view_model::{self, AppViewModel};

/// Tunables injected at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncSettings {
    pub poll: PollIntervals,
    pub search_debounce: Duration,
    pub page_size: usize,
    pub runtime_batch_size: usize,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            poll: PollIntervals::default(),
            search_debounce: SEARCH_DEBOUNCE,
            page_size: DEFAULT_PAGE_SIZE,
            runtime_batch_size: RUNTIME_BATCH_SIZE,
        }
    }
}

/// Everything the session owns. Each component is mutated only through its
/// own operations, driven by [`crate::update`].
#[derive(Debug, Clone, PartialEq)]
pub struct AppState {
    pub(crate) jobs: JobRegistry,
    pub(crate) scraper_settings: ScraperSettings,
    pub(crate) poll: PollScheduler,
    pub(crate) search: SearchSession,
    pub(crate) catalog: CatalogPager,
    dirty: bool,
}

impl Default for AppState {
    fn default() -> Self {
        Self::with_settings(SyncSettings::default())
    }
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: SyncSettings) -> Self {
        Self {
            jobs: JobRegistry::new(),
            scraper_settings: ScraperSettings::new(),
            poll: PollScheduler::new(settings.poll),
            search: SearchSession::new(settings.search_debounce),
            catalog: CatalogPager::new(
                settings.page_size,
                RuntimeCache::new(settings.runtime_batch_size),
            ),
            dirty: false,
        }
    }

    pub fn view(&self) -> AppViewModel {
        view_model::build(self, self.dirty)
    }

    pub fn jobs(&self) -> &JobRegistry {
        &self.jobs
    }

    pub fn scraper_settings(&self) -> &ScraperSettings {
        &self.scraper_settings
    }

    pub fn poll(&self) -> &PollScheduler {
        &self.poll
    }

    pub fn search(&self) -> &SearchSession {
        &self.search
    }

    pub fn catalog(&self) -> &CatalogPager {
        &self.catalog
    }

    /// Returns whether a render is due and clears the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }
}

//! Catalog sync core: pure state machines for job polling, search and the
//! sortable catalog, plus view-model helpers.
mod catalog;
mod collate;
mod effect;
mod error;
mod jobs;
mod msg;
mod poll;
mod runtime_cache;
mod search;
mod settings_mirror;
mod state;
mod status;
mod update;
mod view_model;

pub use catalog::{
    compare_items, BusyState, CatalogItem, CatalogPager, ItemId, SortDirection, SortKey,
    SortSpec, DEFAULT_PAGE_SIZE,
};
pub use collate::compare_titles;
pub use effect::{Effect, Notification, NotificationLevel};
pub use error::SyncError;
pub use jobs::{
    JobController, JobMode, JobRegistry, JobStartPayload, JobStartReply, RawStatusMap,
    StatusUpdate,
};
pub use msg::Msg;
pub use poll::{PollCommand, PollIntervals, PollPhase, PollScheduler};
pub use runtime_cache::{RuntimeCache, RuntimeEntry, RUNTIME_BATCH_SIZE};
pub use search::{
    SearchCommand, SearchKey, SearchNotice, SearchPhase, SearchRequestId, SearchSession,
    MIN_QUERY_CHARS, SEARCH_DEBOUNCE,
};
pub use settings_mirror::{
    CursorField, ProviderCursor, ScraperSettings, SettingsMirror, SettingsSavePayload,
    SettingsSnapshot,
};
pub use state::{AppState, SyncSettings};
pub use status::{
    normalize, JobStatus, LogEntry, LogLevel, ProgressMode, DEFAULT_MESSAGE, LOG_DISPLAY_LIMIT,
};
pub use update::update;
pub use view_model::{
    AppViewModel, CatalogPageView, JobControlView, JobPanelView, LogLineView, SearchResultView,
    SearchView, SettingsRowView,
};

use crate::{
    CatalogItem, CursorField, ItemId, JobMode, JobStartReply, RawStatusMap, RuntimeEntry,
    SearchKey, SearchRequestId, SettingsSnapshot, SortDirection, SortKey, SyncError,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    /// Bind a start button to a provider and mode.
    JobRegistered {
        job_id: String,
        provider: String,
        mode: JobMode,
    },
    /// Host finished wiring; load everything and start polling.
    SessionStarted,
    /// User clicked a job's start button.
    JobStartRequested {
        job_id: String,
        start_page: Option<u32>,
    },
    /// User clicked "start all".
    StartAllRequested,
    /// Engine reply to a start request.
    JobStartCompleted {
        seq: u64,
        job_id: Option<String>,
        result: Result<JobStartReply, SyncError>,
    },
    /// User asked for an immediate status refresh.
    JobRefreshRequested,
    /// A poll timer fired.
    PollTimerFired { generation: u64 },
    /// Engine reply to a status fetch.
    StatusFetched {
        seq: u64,
        manual: bool,
        result: Result<RawStatusMap, SyncError>,
    },
    /// The host UI became hidden or visible.
    VisibilityChanged { hidden: bool },
    /// User edited the search box.
    SearchInput(String),
    /// User pressed enter in the search box.
    SearchSubmitted(String),
    SearchKey(SearchKey),
    /// User clicked a result.
    SearchResultSelected(usize),
    SearchDebounceElapsed { ticket: u64 },
    SearchCompleted {
        request: SearchRequestId,
        result: Result<Vec<CatalogItem>, SyncError>,
    },
    CatalogReloadRequested,
    CatalogLoaded(Result<Vec<CatalogItem>, SyncError>),
    SortRequested {
        key: SortKey,
        direction: Option<SortDirection>,
    },
    PageChanged { offset: i64 },
    ItemHighlighted(Option<ItemId>),
    RuntimesFetched {
        ids: Vec<ItemId>,
        result: Result<Vec<RuntimeEntry>, SyncError>,
    },
    SettingsLoaded(Result<SettingsSnapshot, SyncError>),
    SettingsFieldFocused {
        provider: String,
        field: CursorField,
    },
    SettingsFieldBlurred,
    SettingsEditsDiscarded,
    SettingsFieldEdited {
        provider: String,
        field: CursorField,
        value: String,
    },
    SettingsSaveRequested,
    SettingsSaved(Result<SettingsSnapshot, SyncError>),
    /// UI/render tick to coalesce rendering.
    Tick,
    /// Fallback for placeholder wiring.
    NoOp,
}

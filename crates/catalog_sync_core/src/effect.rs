use std::time::Duration;

use crate::{CatalogItem, ItemId, JobStartPayload, SearchRequestId, SettingsSavePayload};

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Replace any pending poll timer with one firing after `delay`.
    ArmPollTimer { generation: u64, delay: Duration },
    ClearPollTimer,
    FetchStatus { seq: u64, manual: bool },
    StartJob {
        seq: u64,
        job_id: String,
        provider: String,
        payload: JobStartPayload,
    },
    StartAllJobs { seq: u64 },
    ScheduleSearchDebounce { ticket: u64, delay: Duration },
    CancelSearch { request: SearchRequestId },
    IssueSearch { request: SearchRequestId, query: String },
    FetchCatalog,
    /// One request per batch.
    FetchRuntimes { ids: Vec<ItemId> },
    LoadSettings,
    SaveSettings { payload: SettingsSavePayload },
    Notify(Notification),
    /// Hand a chosen search result to the presentation layer.
    OpenItem { item: CatalogItem },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Error,
}

/// Transient toast/banner text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub text: String,
}

impl Notification {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Info,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Error,
            text: text.into(),
        }
    }
}

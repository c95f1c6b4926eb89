use std::fmt;

use catalog_sync_core::{
    CatalogItem, ItemId, JobStartReply, RawStatusMap, RuntimeEntry, SearchRequestId,
    SettingsSnapshot,
};

/// Results reported back by the engine thread, in completion order.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    PollTimerFired {
        generation: u64,
    },
    DebounceElapsed {
        ticket: u64,
    },
    StatusFetched {
        seq: u64,
        manual: bool,
        result: Result<RawStatusMap, ApiError>,
    },
    JobStarted {
        seq: u64,
        /// `None` for a start-all request.
        job_id: Option<String>,
        result: Result<JobStartReply, ApiError>,
    },
    SearchFinished {
        request: SearchRequestId,
        result: Result<Vec<CatalogItem>, ApiError>,
    },
    CatalogFetched(Result<Vec<CatalogItem>, ApiError>),
    RuntimesFetched {
        ids: Vec<ItemId>,
        result: Result<Vec<RuntimeEntry>, ApiError>,
    },
    SettingsFetched(Result<SettingsSnapshot, ApiError>),
    SettingsSaved(Result<SettingsSnapshot, ApiError>),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct ApiError {
    pub kind: FailureKind,
    pub message: String,
}

impl ApiError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.kind == FailureKind::Cancelled
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    Network,
    /// The body was not the JSON shape the endpoint promises.
    Decode,
    /// The server answered `success: false`.
    Rejected,
    Cancelled,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Network => write!(f, "network error"),
            FailureKind::Decode => write!(f, "malformed response"),
            FailureKind::Rejected => write!(f, "rejected by server"),
            FailureKind::Cancelled => write!(f, "cancelled"),
        }
    }
}

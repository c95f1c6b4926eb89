//! Total normalization of raw scraper status payloads.
//!
//! The server sends whatever it has: fields may be missing, `null`, strings
//! instead of numbers, or carry keys we have never heard of. [`normalize`]
//! turns any of that into a fully populated [`JobStatus`] and never fails.

use chrono::{DateTime, NaiveDateTime};
use serde_json::{Map, Value};

/// Message shown for a job that has never reported anything.
pub const DEFAULT_MESSAGE: &str = "Ready.";

/// Number of log lines a job panel displays.
pub const LOG_DISPLAY_LIMIT: usize = 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProgressMode {
    #[default]
    Idle,
    Determinate,
    Indeterminate,
}

impl ProgressMode {
    fn parse(text: &str) -> Option<Self> {
        match text.trim().to_ascii_lowercase().as_str() {
            "idle" => Some(Self::Idle),
            "determinate" => Some(Self::Determinate),
            "indeterminate" => Some(Self::Indeterminate),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    #[default]
    Info,
    Warning,
    Error,
}

impl LogLevel {
    fn parse(text: &str) -> Self {
        match text.trim().to_ascii_lowercase().as_str() {
            "warning" | "warn" => Self::Warning,
            "error" => Self::Error,
            _ => Self::Info,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub timestamp: Option<NaiveDateTime>,
    pub level: LogLevel,
    pub message: String,
}

/// Canonical status of one background job.
///
/// `next_page` is the authoritative resume point, `last_page` the most recently
/// completed page. `current_page` only means something while `running`.
#[derive(Debug, Clone, PartialEq)]
pub struct JobStatus {
    pub job_id: String,
    pub provider: String,
    pub provider_label: Option<String>,
    pub running: bool,
    pub current_page: Option<u32>,
    pub next_page: Option<u32>,
    pub last_page: Option<u32>,
    pub start_page: Option<u32>,
    pub processed_pages: u64,
    pub total_pages: u64,
    pub processed_links: u64,
    pub progress: f64,
    pub progress_mode: ProgressMode,
    pub message: String,
    pub last_title: Option<String>,
    pub error: Option<String>,
    pub content_scope: Option<String>,
    pub log: Vec<LogEntry>,
    pub last_update: Option<NaiveDateTime>,
    pub started_at: Option<NaiveDateTime>,
    pub finished_at: Option<NaiveDateTime>,
}

impl JobStatus {
    /// The "idle, never run" status for a provider.
    pub fn idle(provider: &str) -> Self {
        Self {
            job_id: provider.to_string(),
            provider: provider.to_string(),
            ..Self::default()
        }
    }

    /// Most recent log entries, newest first.
    pub fn recent_log(&self, limit: usize) -> Vec<&LogEntry> {
        self.log.iter().rev().take(limit).collect()
    }

    /// Label for display, falling back to the provider key.
    pub fn display_label(&self) -> &str {
        self.provider_label.as_deref().unwrap_or(&self.provider)
    }
}

impl Default for JobStatus {
    fn default() -> Self {
        Self {
            job_id: String::new(),
            provider: String::new(),
            provider_label: None,
            running: false,
            current_page: None,
            next_page: None,
            last_page: None,
            start_page: None,
            processed_pages: 0,
            total_pages: 0,
            processed_links: 0,
            progress: 0.0,
            progress_mode: ProgressMode::Idle,
            message: DEFAULT_MESSAGE.to_string(),
            last_title: None,
            error: None,
            content_scope: None,
            log: Vec::new(),
            last_update: None,
            started_at: None,
            finished_at: None,
        }
    }
}

/// Normalizes a raw status record. Total: any input yields a valid status.
pub fn normalize(raw: &Value, provider_hint: &str) -> JobStatus {
    let empty = Map::new();
    let fields = raw.as_object().unwrap_or(&empty);
    let get = |snake: &str, camel: &str| fields.get(snake).or_else(|| fields.get(camel));

    let provider = text(get("provider", "provider")).unwrap_or_else(|| provider_hint.to_string());
    let job_id = text(get("job_id", "jobId")).unwrap_or_else(|| provider.clone());
    let running = truthy(get("running", "running"));

    let processed_pages = counter(get("processed_pages", "processedPages"));
    let total_pages = counter(get("total_pages", "totalPages"));
    let explicit_progress = number(get("progress", "progress")).map(|p| p.clamp(0.0, 100.0));
    let explicit_mode = get("progress_mode", "progressMode")
        .and_then(Value::as_str)
        .and_then(ProgressMode::parse);

    let (progress, progress_mode) = match explicit_mode {
        Some(mode) => (explicit_progress.unwrap_or(0.0), mode),
        None if total_pages > 0 => {
            let ratio = processed_pages as f64 / total_pages as f64 * 100.0;
            (
                explicit_progress.unwrap_or_else(|| ratio.clamp(0.0, 100.0)),
                ProgressMode::Determinate,
            )
        }
        None if running => (explicit_progress.unwrap_or(0.0), ProgressMode::Indeterminate),
        None => (explicit_progress.unwrap_or(0.0), ProgressMode::Idle),
    };

    JobStatus {
        job_id,
        provider,
        provider_label: text(get("provider_label", "providerLabel")),
        running,
        current_page: cursor(get("current_page", "currentPage")),
        next_page: cursor(get("next_page", "nextPage")),
        last_page: cursor(get("last_page", "lastPage")),
        start_page: cursor(get("start_page", "startPage")),
        processed_pages,
        total_pages,
        processed_links: counter(get("processed_links", "processedLinks")),
        progress,
        progress_mode,
        message: text(get("message", "message")).unwrap_or_else(|| DEFAULT_MESSAGE.to_string()),
        last_title: text(get("last_title", "lastTitle")),
        error: text(get("error", "error")),
        content_scope: text(get("content_scope", "contentScope")),
        log: log_entries(get("log", "log")),
        last_update: timestamp(get("last_update", "lastUpdate")),
        started_at: timestamp(get("started_at", "startedAt")),
        finished_at: timestamp(get("finished_at", "finishedAt")),
    }
}

/// Finite number from a JSON number or numeric string.
pub(crate) fn number(value: Option<&Value>) -> Option<f64> {
    let parsed = match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    parsed.is_finite().then_some(parsed)
}

/// Page cursor: a finite number >= 1, truncated.
pub(crate) fn cursor(value: Option<&Value>) -> Option<u32> {
    number(value)
        .filter(|n| *n >= 1.0)
        .map(|n| n.trunc().min(f64::from(u32::MAX)) as u32)
}

fn counter(value: Option<&Value>) -> u64 {
    number(value)
        .map(|n| n.max(0.0).trunc().min(u64::MAX as f64) as u64)
        .unwrap_or(0)
}

fn truthy(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|v| v != 0.0),
        Some(Value::String(s)) => matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "true" | "1" | "yes"
        ),
        _ => false,
    }
}

fn text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn timestamp(value: Option<&Value>) -> Option<NaiveDateTime> {
    parse_timestamp(value?.as_str()?)
}

/// Accepts RFC 3339 and the server's naive ISO-8601 form.
pub(crate) fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.naive_utc());
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
}

fn log_entries(value: Option<&Value>) -> Vec<LogEntry> {
    match value {
        Some(Value::Array(entries)) => entries.iter().filter_map(log_entry).collect(),
        _ => Vec::new(),
    }
}

fn log_entry(value: &Value) -> Option<LogEntry> {
    match value {
        Value::Object(fields) => Some(LogEntry {
            message: text(fields.get("message"))?,
            level: fields
                .get("level")
                .and_then(Value::as_str)
                .map(LogLevel::parse)
                .unwrap_or_default(),
            timestamp: timestamp(fields.get("timestamp")),
        }),
        Value::String(_) => Some(LogEntry {
            timestamp: None,
            level: LogLevel::Info,
            message: text(Some(value))?,
        }),
        _ => None,
    }
}

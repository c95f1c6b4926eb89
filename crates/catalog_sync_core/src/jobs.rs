use std::collections::BTreeMap;

use serde_json::{json, Map, Value};

use crate::settings_mirror::SettingsMirror;
use crate::status::{normalize, JobStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobMode {
    Movies,
    Series,
}

/// One start button: a provider scraped in a given mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobController {
    pub job_id: String,
    pub provider: String,
    pub mode: JobMode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobStartPayload {
    pub include_series: bool,
    pub start_page: Option<u32>,
}

impl JobStartPayload {
    pub fn to_json(&self) -> Value {
        let mut body = json!({ "include_series": self.include_series });
        if let (Some(page), Some(fields)) = (self.start_page, body.as_object_mut()) {
            fields.insert("start_page".to_string(), json!(page));
        }
        body
    }
}

/// Raw provider-to-status map as delivered by the status endpoint.
pub type RawStatusMap = Map<String, Value>;

#[derive(Debug, Clone, PartialEq)]
pub struct StatusUpdate {
    pub statuses: BTreeMap<String, JobStatus>,
    pub any_running: bool,
}

/// Reply of a job start request.
#[derive(Debug, Clone, PartialEq)]
pub struct JobStartReply {
    pub status: RawStatusMap,
    pub started_any: bool,
    pub message: Option<String>,
}

/// Job controllers and the provider-to-status map they are bound to.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct JobRegistry {
    controllers: Vec<JobController>,
    statuses: BTreeMap<String, JobStatus>,
    issued_seq: u64,
    applied_seq: Option<u64>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a controller. Re-registering a job id replaces its binding.
    pub fn register_job(&mut self, job_id: &str, provider: &str, mode: JobMode) {
        let controller = JobController {
            job_id: job_id.to_string(),
            provider: provider.to_string(),
            mode,
        };
        match self.controllers.iter_mut().find(|c| c.job_id == job_id) {
            Some(existing) => *existing = controller,
            None => self.controllers.push(controller),
        }
        self.statuses
            .entry(provider.to_string())
            .or_insert_with(|| JobStatus::idle(provider));
    }

    /// Replaces every status with a freshly normalized one.
    ///
    /// Registered providers missing from `raw` fall back to defaults; unknown
    /// providers present in `raw` are kept. Resume cursors are mirrored before
    /// the map is swapped, within this single call.
    pub fn apply_statuses(
        &mut self,
        raw: &RawStatusMap,
        mirror: &mut dyn SettingsMirror,
    ) -> StatusUpdate {
        let mut next = BTreeMap::new();
        for controller in &self.controllers {
            let provider = controller.provider.as_str();
            next.entry(provider.to_string())
                .or_insert_with(|| normalize(raw.get(provider).unwrap_or(&Value::Null), provider));
        }
        for (provider, raw_status) in raw {
            next.entry(provider.clone())
                .or_insert_with(|| normalize(raw_status, provider));
        }

        for (provider, status) in &next {
            if status.next_page.is_some() || status.last_page.is_some() {
                mirror.mirror_cursor(provider, status.next_page, status.last_page);
            }
        }

        let any_running = next.values().any(|status| status.running);
        self.statuses = next;
        StatusUpdate {
            statuses: self.statuses.clone(),
            any_running,
        }
    }

    /// Hands out the sequence number for the next status-bearing request.
    pub fn next_sequence(&mut self) -> u64 {
        self.issued_seq += 1;
        self.issued_seq
    }

    /// Whether a response tagged `seq` is newer than what is already applied.
    /// Accepting it records it as the latest applied.
    pub fn accept_sequence(&mut self, seq: u64) -> bool {
        if self.applied_seq.is_some_and(|applied| seq < applied) {
            return false;
        }
        self.applied_seq = Some(seq);
        true
    }

    /// Records `seq` as applied without ever moving the watermark backwards.
    /// Start replies use this: they are applied unconditionally.
    pub fn record_sequence(&mut self, seq: u64) {
        self.applied_seq = Some(self.applied_seq.map_or(seq, |applied| applied.max(seq)));
    }

    pub fn controllers(&self) -> &[JobController] {
        &self.controllers
    }

    pub fn controller(&self, job_id: &str) -> Option<&JobController> {
        self.controllers.iter().find(|c| c.job_id == job_id)
    }

    pub fn statuses(&self) -> &BTreeMap<String, JobStatus> {
        &self.statuses
    }

    pub fn status(&self, provider: &str) -> Option<&JobStatus> {
        self.statuses.get(provider)
    }

    pub fn any_running(&self) -> bool {
        self.statuses.values().any(|status| status.running)
    }

    /// Start affordance state, derived only from the bound provider's `running`.
    pub fn start_disabled(&self, job_id: &str) -> bool {
        self.controller(job_id)
            .and_then(|c| self.statuses.get(&c.provider))
            .is_some_and(|status| status.running)
    }
}

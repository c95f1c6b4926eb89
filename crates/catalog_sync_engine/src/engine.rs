use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use catalog_sync_core::{ItemId, JobStartPayload, SearchRequestId, SettingsSavePayload};
use sync_logging::{sync_debug, sync_trace};
use tokio::runtime::Runtime;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::api::{ApiSettings, CatalogApi, ReqwestCatalogApi};
use crate::{ApiError, EngineEvent, FailureKind};

enum EngineCommand {
    ArmPollTimer {
        generation: u64,
        delay: Duration,
    },
    ClearPollTimer,
    FetchStatus {
        seq: u64,
        manual: bool,
    },
    StartJob {
        seq: u64,
        job_id: String,
        provider: String,
        payload: JobStartPayload,
    },
    StartAll {
        seq: u64,
    },
    ScheduleDebounce {
        ticket: u64,
        delay: Duration,
    },
    CancelSearch {
        request: SearchRequestId,
    },
    Search {
        request: SearchRequestId,
        query: String,
    },
    FetchCatalog,
    FetchRuntimes {
        ids: Vec<ItemId>,
    },
    LoadSettings,
    SaveSettings {
        payload: SettingsSavePayload,
    },
}

/// Runs backend calls and timers on a tokio runtime owned by a background
/// thread. Results come back through [`EngineHandle::try_recv`].
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: mpsc::Receiver<EngineEvent>,
}

impl EngineHandle {
    pub fn new(settings: ApiSettings) -> Result<Self, ApiError> {
        let api = ReqwestCatalogApi::new(settings)?;
        Ok(Self::with_api(Arc::new(api)))
    }

    pub fn with_api(api: Arc<dyn CatalogApi>) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();

        thread::spawn(move || {
            let runtime = Runtime::new().expect("tokio runtime");
            let mut tasks = PendingTasks::default();
            while let Ok(command) = cmd_rx.recv() {
                dispatch(&runtime, &api, &event_tx, &mut tasks, command);
            }
            tasks.abort_all();
        });

        Self { cmd_tx, event_rx }
    }

    /// Replaces any pending poll timer.
    pub fn arm_poll_timer(&self, generation: u64, delay: Duration) {
        self.send(EngineCommand::ArmPollTimer { generation, delay });
    }

    pub fn clear_poll_timer(&self) {
        self.send(EngineCommand::ClearPollTimer);
    }

    pub fn fetch_status(&self, seq: u64, manual: bool) {
        self.send(EngineCommand::FetchStatus { seq, manual });
    }

    pub fn start_job(
        &self,
        seq: u64,
        job_id: impl Into<String>,
        provider: impl Into<String>,
        payload: JobStartPayload,
    ) {
        self.send(EngineCommand::StartJob {
            seq,
            job_id: job_id.into(),
            provider: provider.into(),
            payload,
        });
    }

    pub fn start_all(&self, seq: u64) {
        self.send(EngineCommand::StartAll { seq });
    }

    /// Replaces any pending debounce timer.
    pub fn schedule_debounce(&self, ticket: u64, delay: Duration) {
        self.send(EngineCommand::ScheduleDebounce { ticket, delay });
    }

    pub fn cancel_search(&self, request: SearchRequestId) {
        self.send(EngineCommand::CancelSearch { request });
    }

    /// Issues a search; a search still in flight is cancelled first.
    pub fn search(&self, request: SearchRequestId, query: impl Into<String>) {
        self.send(EngineCommand::Search {
            request,
            query: query.into(),
        });
    }

    pub fn fetch_catalog(&self) {
        self.send(EngineCommand::FetchCatalog);
    }

    pub fn fetch_runtimes(&self, ids: Vec<ItemId>) {
        self.send(EngineCommand::FetchRuntimes { ids });
    }

    pub fn load_settings(&self) {
        self.send(EngineCommand::LoadSettings);
    }

    pub fn save_settings(&self, payload: SettingsSavePayload) {
        self.send(EngineCommand::SaveSettings { payload });
    }

    pub fn try_recv(&self) -> Option<EngineEvent> {
        self.event_rx.try_recv().ok()
    }

    fn send(&self, command: EngineCommand) {
        let _ = self.cmd_tx.send(command);
    }
}

/// Cancellable work owned by the engine thread.
#[derive(Default)]
struct PendingTasks {
    poll_timer: Option<JoinHandle<()>>,
    debounce_timer: Option<JoinHandle<()>>,
    search: Option<(SearchRequestId, CancellationToken)>,
}

impl PendingTasks {
    fn replace_poll_timer(&mut self, handle: Option<JoinHandle<()>>) {
        if let Some(previous) = std::mem::replace(&mut self.poll_timer, handle) {
            previous.abort();
        }
    }

    fn replace_debounce_timer(&mut self, handle: JoinHandle<()>) {
        if let Some(previous) = self.debounce_timer.replace(handle) {
            previous.abort();
        }
    }

    fn cancel_search(&mut self, request: Option<SearchRequestId>) {
        let matches = match (&self.search, request) {
            (Some((current, _)), Some(request)) => *current == request,
            (Some(_), None) => true,
            (None, _) => false,
        };
        if matches {
            if let Some((id, token)) = self.search.take() {
                sync_debug!("Cancelling search request {}", id);
                token.cancel();
            }
        }
    }

    fn abort_all(&mut self) {
        self.replace_poll_timer(None);
        if let Some(handle) = self.debounce_timer.take() {
            handle.abort();
        }
        self.cancel_search(None);
    }
}

fn dispatch(
    runtime: &Runtime,
    api: &Arc<dyn CatalogApi>,
    event_tx: &mpsc::Sender<EngineEvent>,
    tasks: &mut PendingTasks,
    command: EngineCommand,
) {
    let api = Arc::clone(api);
    let event_tx = event_tx.clone();
    match command {
        EngineCommand::ArmPollTimer { generation, delay } => {
            sync_trace!("Poll timer {} armed for {:?}", generation, delay);
            let handle = runtime.spawn(async move {
                tokio::time::sleep(delay).await;
                let _ = event_tx.send(EngineEvent::PollTimerFired { generation });
            });
            tasks.replace_poll_timer(Some(handle));
        }
        EngineCommand::ClearPollTimer => tasks.replace_poll_timer(None),
        EngineCommand::FetchStatus { seq, manual } => {
            runtime.spawn(async move {
                let result = api.fetch_status().await;
                let _ = event_tx.send(EngineEvent::StatusFetched {
                    seq,
                    manual,
                    result,
                });
            });
        }
        EngineCommand::StartJob {
            seq,
            job_id,
            provider,
            payload,
        } => {
            runtime.spawn(async move {
                let result = api.start_job(&provider, &payload).await;
                let _ = event_tx.send(EngineEvent::JobStarted {
                    seq,
                    job_id: Some(job_id),
                    result,
                });
            });
        }
        EngineCommand::StartAll { seq } => {
            runtime.spawn(async move {
                let result = api.start_all().await;
                let _ = event_tx.send(EngineEvent::JobStarted {
                    seq,
                    job_id: None,
                    result,
                });
            });
        }
        EngineCommand::ScheduleDebounce { ticket, delay } => {
            let handle = runtime.spawn(async move {
                tokio::time::sleep(delay).await;
                let _ = event_tx.send(EngineEvent::DebounceElapsed { ticket });
            });
            tasks.replace_debounce_timer(handle);
        }
        EngineCommand::CancelSearch { request } => tasks.cancel_search(Some(request)),
        EngineCommand::Search { request, query } => {
            tasks.cancel_search(None);
            let token = CancellationToken::new();
            tasks.search = Some((request, token.clone()));
            runtime.spawn(async move {
                let result = tokio::select! {
                    _ = token.cancelled() => {
                        Err(ApiError::new(FailureKind::Cancelled, "search superseded"))
                    }
                    result = api.search(&query) => result,
                };
                let _ = event_tx.send(EngineEvent::SearchFinished { request, result });
            });
        }
        EngineCommand::FetchCatalog => {
            runtime.spawn(async move {
                let result = api.fetch_catalog().await;
                let _ = event_tx.send(EngineEvent::CatalogFetched(result));
            });
        }
        EngineCommand::FetchRuntimes { ids } => {
            runtime.spawn(async move {
                let result = api.fetch_runtimes(&ids).await;
                let _ = event_tx.send(EngineEvent::RuntimesFetched { ids, result });
            });
        }
        EngineCommand::LoadSettings => {
            runtime.spawn(async move {
                let result = api.load_settings().await;
                let _ = event_tx.send(EngineEvent::SettingsFetched(result));
            });
        }
        EngineCommand::SaveSettings { payload } => {
            runtime.spawn(async move {
                let result = api.save_settings(&payload).await;
                let _ = event_tx.send(EngineEvent::SettingsSaved(result));
            });
        }
    }
}

use catalog_sync_core::{CatalogItem, Effect, Msg, Notification, SyncError};
use catalog_sync_engine::{ApiError, EngineEvent, EngineHandle, FailureKind};
use sync_logging::{clip_for_log, sync_debug, sync_info, sync_warn};

/// What the engine cannot do and the console must show.
#[derive(Debug, Clone, PartialEq)]
pub enum HostOutput {
    Notify(Notification),
    Open(CatalogItem),
}

pub struct EffectRunner {
    engine: EngineHandle,
}

impl EffectRunner {
    pub fn new(engine: EngineHandle) -> Self {
        Self { engine }
    }

    /// Hands IO effects to the engine and returns the presentation ones.
    pub fn run(&self, effects: Vec<Effect>) -> Vec<HostOutput> {
        let mut outputs = Vec::new();
        for effect in effects {
            match effect {
                Effect::ArmPollTimer { generation, delay } => {
                    self.engine.arm_poll_timer(generation, delay)
                }
                Effect::ClearPollTimer => self.engine.clear_poll_timer(),
                Effect::FetchStatus { seq, manual } => self.engine.fetch_status(seq, manual),
                Effect::StartJob {
                    seq,
                    job_id,
                    provider,
                    payload,
                } => {
                    sync_info!(
                        "Starting job {} on {} (series={}, start_page={:?})",
                        job_id,
                        provider,
                        payload.include_series,
                        payload.start_page
                    );
                    self.engine.start_job(seq, job_id, provider, payload);
                }
                Effect::StartAllJobs { seq } => {
                    sync_info!("Starting all jobs");
                    self.engine.start_all(seq);
                }
                Effect::ScheduleSearchDebounce { ticket, delay } => {
                    self.engine.schedule_debounce(ticket, delay)
                }
                Effect::CancelSearch { request } => self.engine.cancel_search(request),
                Effect::IssueSearch { request, query } => {
                    sync_debug!("Search {} for '{}'", request, clip_for_log(&query, 40));
                    self.engine.search(request, query);
                }
                Effect::FetchCatalog => self.engine.fetch_catalog(),
                Effect::FetchRuntimes { ids } => self.engine.fetch_runtimes(ids),
                Effect::LoadSettings => self.engine.load_settings(),
                Effect::SaveSettings { payload } => self.engine.save_settings(payload),
                Effect::Notify(notification) => outputs.push(HostOutput::Notify(notification)),
                Effect::OpenItem { item } => outputs.push(HostOutput::Open(item)),
            }
        }
        outputs
    }

    /// Drains every engine event that is ready, converted to messages.
    pub fn drain_events(&self) -> Vec<Msg> {
        std::iter::from_fn(|| self.engine.try_recv())
            .map(event_to_msg)
            .collect()
    }
}

pub fn event_to_msg(event: EngineEvent) -> Msg {
    match event {
        EngineEvent::PollTimerFired { generation } => Msg::PollTimerFired { generation },
        EngineEvent::DebounceElapsed { ticket } => Msg::SearchDebounceElapsed { ticket },
        EngineEvent::StatusFetched {
            seq,
            manual,
            result,
        } => Msg::StatusFetched {
            seq,
            manual,
            result: result.map_err(to_sync_error),
        },
        EngineEvent::JobStarted {
            seq,
            job_id,
            result,
        } => Msg::JobStartCompleted {
            seq,
            job_id,
            result: result.map_err(to_sync_error),
        },
        EngineEvent::SearchFinished { request, result } => Msg::SearchCompleted {
            request,
            result: result.map_err(to_listing_error),
        },
        EngineEvent::CatalogFetched(result) => {
            Msg::CatalogLoaded(result.map_err(to_listing_error))
        }
        EngineEvent::RuntimesFetched { ids, result } => Msg::RuntimesFetched {
            ids,
            result: result.map_err(to_listing_error),
        },
        EngineEvent::SettingsFetched(result) => Msg::SettingsLoaded(result.map_err(to_sync_error)),
        EngineEvent::SettingsSaved(result) => Msg::SettingsSaved(result.map_err(to_sync_error)),
    }
}

/// Search and catalog replies of the wrong shape count as failed requests.
fn to_listing_error(err: ApiError) -> SyncError {
    match to_sync_error(err) {
        SyncError::MalformedPayload(message) => SyncError::NetworkFailure(message),
        other => other,
    }
}

fn to_sync_error(err: ApiError) -> SyncError {
    match err.kind {
        FailureKind::Cancelled => SyncError::Aborted,
        FailureKind::Decode => SyncError::MalformedPayload(err.message),
        FailureKind::Rejected | FailureKind::HttpStatus(_) => {
            SyncError::NetworkFailure(err.message)
        }
        FailureKind::Timeout | FailureKind::Network | FailureKind::InvalidUrl => {
            sync_warn!("Backend unreachable: {}", err);
            SyncError::NetworkFailure(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn cancelled_search_becomes_silent_abort() {
        let msg = event_to_msg(EngineEvent::SearchFinished {
            request: 3,
            result: Err(ApiError::new(FailureKind::Cancelled, "search superseded")),
        });
        assert_eq!(
            msg,
            Msg::SearchCompleted {
                request: 3,
                result: Err(SyncError::Aborted)
            }
        );
    }

    #[test]
    fn server_reasons_are_kept_for_notifications() {
        let msg = event_to_msg(EngineEvent::SettingsSaved(Err(ApiError::new(
            FailureKind::HttpStatus(400),
            "Ungültige Zahl.",
        ))));
        assert_eq!(
            msg,
            Msg::SettingsSaved(Err(SyncError::NetworkFailure("Ungültige Zahl.".to_string())))
        );
    }

    #[test]
    fn listing_decode_failures_are_network_failures() {
        let msg = event_to_msg(EngineEvent::CatalogFetched(Err(ApiError::new(
            FailureKind::Decode,
            "catalog: invalid type",
        ))));
        assert_eq!(
            msg,
            Msg::CatalogLoaded(Err(SyncError::NetworkFailure(
                "catalog: invalid type".to_string()
            )))
        );

        let msg = event_to_msg(EngineEvent::SearchFinished {
            request: 2,
            result: Err(ApiError::new(FailureKind::Decode, "search: missing results")),
        });
        assert_eq!(
            msg,
            Msg::SearchCompleted {
                request: 2,
                result: Err(SyncError::NetworkFailure("search: missing results".to_string()))
            }
        );
    }

    #[test]
    fn status_decode_failures_stay_malformed() {
        let msg = event_to_msg(EngineEvent::StatusFetched {
            seq: 1,
            manual: false,
            result: Err(ApiError::new(FailureKind::Decode, "status: missing map")),
        });
        assert_eq!(
            msg,
            Msg::StatusFetched {
                seq: 1,
                manual: false,
                result: Err(SyncError::MalformedPayload("status: missing map".to_string()))
            }
        );
    }

    #[test]
    fn timers_map_one_to_one() {
        assert_eq!(
            event_to_msg(EngineEvent::PollTimerFired { generation: 4 }),
            Msg::PollTimerFired { generation: 4 }
        );
        assert_eq!(
            event_to_msg(EngineEvent::DebounceElapsed { ticket: 9 }),
            Msg::SearchDebounceElapsed { ticket: 9 }
        );
    }
}

use std::time::Duration;

use sync_logging::{sync_debug, sync_error, sync_info, sync_warn};

use crate::poll::PollCommand;
use crate::search::SearchCommand;
use crate::{AppState, Effect, ItemId, JobMode, JobStartPayload, Msg, Notification, SyncError};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::JobRegistered {
            job_id,
            provider,
            mode,
        } => {
            state.jobs.register_job(&job_id, &provider, mode);
            state.mark_dirty();
            Vec::new()
        }
        Msg::SessionStarted => {
            let mut effects = vec![Effect::LoadSettings];
            state.catalog.begin_load();
            effects.push(Effect::FetchCatalog);
            let any_running = state.jobs.any_running();
            let commands = state.poll.ensure_polling(Some(Duration::ZERO), any_running);
            effects.extend(poll_effects(&mut state, commands, false));
            state.mark_dirty();
            effects
        }
        Msg::JobStartRequested { job_id, start_page } => start_job(&mut state, &job_id, start_page),
        Msg::StartAllRequested => {
            let seq = state.jobs.next_sequence();
            vec![Effect::StartAllJobs { seq }]
        }
        Msg::JobStartCompleted {
            seq,
            job_id,
            result,
        } => {
            let label = job_id.as_deref().unwrap_or("all jobs");
            match result {
                Ok(reply) => {
                    let mut effects = Vec::new();
                    // The server answers a start after acting on it, so its
                    // status is never older than a poll that overtook it.
                    state.jobs.record_sequence(seq);
                    let applied = state
                        .jobs
                        .apply_statuses(&reply.status, &mut state.scraper_settings);
                    state.mark_dirty();
                    let commands = state.poll.ensure_polling(None, applied.any_running);
                    effects.extend(poll_effects(&mut state, commands, false));
                    let text = reply.message.unwrap_or_else(|| {
                        if reply.started_any {
                            format!("Started {label}.")
                        } else {
                            format!("{label} is already running.")
                        }
                    });
                    sync_info!("Start request for {} answered: {}", label, text);
                    effects.push(Effect::Notify(Notification::info(text)));
                    effects
                }
                Err(err) => {
                    sync_error!("Start request for {} failed: {}", label, err);
                    vec![Effect::Notify(Notification::error(format!(
                        "Could not start {label}: {err}"
                    )))]
                }
            }
        }
        Msg::JobRefreshRequested => {
            let commands = state.poll.request_fetch();
            poll_effects(&mut state, commands, true)
        }
        Msg::PollTimerFired { generation } => {
            let commands = state.poll.on_timer(generation);
            poll_effects(&mut state, commands, false)
        }
        Msg::StatusFetched {
            seq,
            manual,
            result,
        } => {
            let mut effects = Vec::new();
            let any_running = match result {
                Ok(raw) => {
                    if state.jobs.accept_sequence(seq) {
                        let applied = state
                            .jobs
                            .apply_statuses(&raw, &mut state.scraper_settings);
                        state.mark_dirty();
                        Some(applied.any_running)
                    } else {
                        sync_debug!("Dropping out-of-order status snapshot {}", seq);
                        Some(state.jobs.any_running())
                    }
                }
                Err(err) => {
                    sync_warn!("Status poll failed: {}", err);
                    if manual {
                        effects.push(Effect::Notify(Notification::error(format!(
                            "Status refresh failed: {err}"
                        ))));
                    }
                    None
                }
            };
            let commands = state.poll.on_fetch_settled(any_running);
            effects.extend(poll_effects(&mut state, commands, false));
            effects
        }
        Msg::VisibilityChanged { hidden } => {
            let commands = if hidden {
                state.poll.pause()
            } else {
                state.poll.resume()
            };
            poll_effects(&mut state, commands, false)
        }
        Msg::SearchInput(text) => {
            let commands = state.search.on_input(&text);
            state.mark_dirty();
            search_effects(commands)
        }
        Msg::SearchSubmitted(text) => {
            let commands = state.search.submit(&text);
            state.mark_dirty();
            search_effects(commands)
        }
        Msg::SearchKey(key) => {
            let commands = state.search.on_key(key);
            state.mark_dirty();
            search_effects(commands)
        }
        Msg::SearchResultSelected(index) => {
            let commands = state.search.select(index);
            if !commands.is_empty() {
                state.mark_dirty();
            }
            search_effects(commands)
        }
        Msg::SearchDebounceElapsed { ticket } => {
            let commands = state.search.on_debounce_elapsed(ticket);
            if !commands.is_empty() {
                state.mark_dirty();
            }
            search_effects(commands)
        }
        Msg::SearchCompleted { request, result } => {
            if state.search.on_completed(request, result) {
                state.mark_dirty();
            }
            Vec::new()
        }
        Msg::CatalogReloadRequested => {
            state.catalog.begin_load();
            state.mark_dirty();
            vec![Effect::FetchCatalog]
        }
        Msg::CatalogLoaded(result) => {
            let batches = state.catalog.finish_load(result);
            state.mark_dirty();
            runtime_effects(batches)
        }
        Msg::SortRequested { key, direction } => {
            let batches = state.catalog.request_sort(key, direction);
            state.mark_dirty();
            runtime_effects(batches)
        }
        Msg::PageChanged { offset } => {
            if state.catalog.change_page(offset) {
                state.mark_dirty();
            }
            Vec::new()
        }
        Msg::ItemHighlighted(id) => {
            state.catalog.highlight(id);
            Vec::new()
        }
        Msg::RuntimesFetched { ids, result } => {
            state.catalog.apply_runtimes(&ids, result);
            state.mark_dirty();
            Vec::new()
        }
        Msg::SettingsLoaded(result) => match result {
            Ok(snapshot) => {
                state.scraper_settings.apply_snapshot(&snapshot);
                state.mark_dirty();
                Vec::new()
            }
            Err(err) => {
                sync_warn!("Loading settings failed: {}", err);
                vec![Effect::Notify(Notification::error(
                    "Settings could not be loaded.",
                ))]
            }
        },
        Msg::SettingsFieldFocused { provider, field } => {
            state.scraper_settings.focus(&provider, field);
            state.mark_dirty();
            Vec::new()
        }
        Msg::SettingsFieldBlurred => {
            state.scraper_settings.blur();
            state.mark_dirty();
            Vec::new()
        }
        Msg::SettingsEditsDiscarded => {
            state.scraper_settings.discard_drafts();
            state.mark_dirty();
            Vec::new()
        }
        Msg::SettingsFieldEdited {
            provider,
            field,
            value,
        } => {
            state.scraper_settings.edit(&provider, field, value);
            state.mark_dirty();
            Vec::new()
        }
        Msg::SettingsSaveRequested => match state.scraper_settings.build_save_payload() {
            Ok(payload) => vec![Effect::SaveSettings { payload }],
            Err(err) => vec![Effect::Notify(Notification::error(err.to_string()))],
        },
        Msg::SettingsSaved(result) => match result {
            Ok(snapshot) => {
                state.scraper_settings.complete_save(&snapshot);
                state.mark_dirty();
                vec![Effect::Notify(Notification::info("Settings saved."))]
            }
            Err(err) => {
                sync_error!("Saving settings failed: {}", err);
                vec![Effect::Notify(Notification::error(format!(
                    "Settings could not be saved: {err}"
                )))]
            }
        },
        Msg::Tick | Msg::NoOp => Vec::new(),
    };

    (state, effects)
}

fn start_job(state: &mut AppState, job_id: &str, start_page: Option<u32>) -> Vec<Effect> {
    let Some(controller) = state.jobs.controller(job_id).cloned() else {
        sync_warn!("Start requested for unknown job {}", job_id);
        return vec![Effect::Notify(Notification::error(format!(
            "Unknown job: {job_id}"
        )))];
    };
    if state.jobs.start_disabled(job_id) {
        sync_debug!("Ignoring start for {}: already running", job_id);
        return Vec::new();
    }
    if start_page == Some(0) {
        let err = SyncError::ValidationFailure("Start page must be at least 1.".to_string());
        return vec![Effect::Notify(Notification::error(err.to_string()))];
    }
    let seq = state.jobs.next_sequence();
    vec![Effect::StartJob {
        seq,
        job_id: controller.job_id,
        provider: controller.provider,
        payload: JobStartPayload {
            include_series: controller.mode == JobMode::Series,
            start_page,
        },
    }]
}

fn poll_effects(state: &mut AppState, commands: Vec<PollCommand>, manual: bool) -> Vec<Effect> {
    commands
        .into_iter()
        .map(|command| match command {
            PollCommand::Arm { generation, delay } => Effect::ArmPollTimer { generation, delay },
            PollCommand::Clear => Effect::ClearPollTimer,
            PollCommand::Fetch => Effect::FetchStatus {
                seq: state.jobs.next_sequence(),
                manual,
            },
        })
        .collect()
}

fn search_effects(commands: Vec<SearchCommand>) -> Vec<Effect> {
    commands
        .into_iter()
        .map(|command| match command {
            SearchCommand::ScheduleDebounce { ticket, delay } => {
                Effect::ScheduleSearchDebounce { ticket, delay }
            }
            SearchCommand::Cancel { request } => Effect::CancelSearch { request },
            SearchCommand::Issue { request, query } => Effect::IssueSearch { request, query },
            SearchCommand::Open { item } => Effect::OpenItem { item },
        })
        .collect()
}

fn runtime_effects(batches: Vec<Vec<ItemId>>) -> Vec<Effect> {
    batches
        .into_iter()
        .map(|ids| Effect::FetchRuntimes { ids })
        .collect()
}

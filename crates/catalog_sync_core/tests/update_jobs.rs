use std::sync::Once;
use std::time::Duration;

use catalog_sync_core::{
    update, AppState, CursorField, Effect, JobMode, JobRegistry, JobStartPayload, JobStartReply,
    Msg, NotificationLevel, ProviderCursor, RawStatusMap, ScraperSettings, SyncError,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(sync_logging::initialize_for_tests);
}

fn raw_map(value: Value) -> RawStatusMap {
    value.as_object().cloned().expect("status object")
}

fn registered_state() -> AppState {
    let state = AppState::new();
    let (state, _) = update(
        state,
        Msg::JobRegistered {
            job_id: "kinox-movies".to_string(),
            provider: "kinox".to_string(),
            mode: JobMode::Movies,
        },
    );
    let (state, _) = update(
        state,
        Msg::JobRegistered {
            job_id: "filmpalast-series".to_string(),
            provider: "filmpalast".to_string(),
            mode: JobMode::Series,
        },
    );
    state
}

fn fetch_seq(effects: &[Effect]) -> u64 {
    effects
        .iter()
        .find_map(|effect| match effect {
            Effect::FetchStatus { seq, .. } => Some(*seq),
            _ => None,
        })
        .expect("fetch effect")
}

fn arm_effect(effects: &[Effect]) -> (u64, Duration) {
    effects
        .iter()
        .find_map(|effect| match effect {
            Effect::ArmPollTimer { generation, delay } => Some((*generation, *delay)),
            _ => None,
        })
        .expect("arm effect")
}

#[test]
fn kinox_running_status_disables_its_start_button() {
    init_logging();
    let (state, effects) = update(registered_state(), Msg::JobRefreshRequested);
    let seq = fetch_seq(&effects);

    let (state, effects) = update(
        state,
        Msg::StatusFetched {
            seq,
            manual: true,
            result: Ok(raw_map(json!({
                "kinox": { "running": true, "current_page": 4, "next_page": 5 }
            }))),
        },
    );

    let view = state.view();
    let kinox = view.jobs.iter().find(|panel| panel.provider == "kinox").unwrap();
    assert!(kinox.running);
    assert_eq!(kinox.current_page, Some(4));
    assert_eq!(kinox.next_page, Some(5));
    assert_eq!(kinox.controls.len(), 1);
    assert!(kinox.controls[0].disabled);

    let filmpalast = view
        .jobs
        .iter()
        .find(|panel| panel.provider == "filmpalast")
        .unwrap();
    assert!(!filmpalast.running);
    assert!(!filmpalast.controls[0].disabled);

    // Work in flight: next poll uses the short interval.
    let (_, delay) = arm_effect(&effects);
    assert_eq!(delay, Duration::from_secs(2));
}

#[test]
fn unregistered_providers_are_still_included() {
    let mut registry = JobRegistry::new();
    registry.register_job("kinox-movies", "kinox", JobMode::Movies);
    let mut settings = ScraperSettings::new();

    let update = registry.apply_statuses(
        &raw_map(json!({ "brand_new": { "running": false, "message": "hi" } })),
        &mut settings,
    );

    assert_eq!(update.statuses.len(), 2);
    assert_eq!(update.statuses["kinox"].message, "Ready.");
    assert_eq!(update.statuses["brand_new"].message, "hi");
    assert!(!update.any_running);
}

#[test]
fn start_disabled_tracks_running_after_every_apply() {
    let mut registry = JobRegistry::new();
    registry.register_job("kinox-movies", "kinox", JobMode::Movies);
    let mut settings = ScraperSettings::new();

    registry.apply_statuses(&raw_map(json!({ "kinox": { "running": true } })), &mut settings);
    assert!(registry.start_disabled("kinox-movies"));
    assert!(registry.start_disabled("kinox-movies"));

    registry.apply_statuses(&raw_map(json!({})), &mut settings);
    assert!(!registry.start_disabled("kinox-movies"));
}

#[test]
fn settings_mirror_follows_latest_cursor_and_skips_focused_field() {
    let mut registry = JobRegistry::new();
    registry.register_job("kinox-movies", "kinox", JobMode::Movies);
    let mut settings = ScraperSettings::new();

    registry.apply_statuses(
        &raw_map(json!({ "kinox": { "next_page": 5, "last_page": 4 } })),
        &mut settings,
    );
    assert_eq!(
        settings.cursor("kinox"),
        ProviderCursor {
            next_page: Some(5),
            last_page: Some(4)
        }
    );

    // A payload without a valid cursor keeps the last valid one.
    registry.apply_statuses(
        &raw_map(json!({ "kinox": { "next_page": "garbage" } })),
        &mut settings,
    );
    assert_eq!(settings.cursor("kinox").next_page, Some(5));

    settings.focus("kinox", CursorField::NextPage);
    registry.apply_statuses(
        &raw_map(json!({ "kinox": { "next_page": 9, "last_page": 8 } })),
        &mut settings,
    );
    assert_eq!(settings.cursor("kinox").next_page, Some(5));
    assert_eq!(settings.cursor("kinox").last_page, Some(8));

    settings.blur();
    registry.apply_statuses(
        &raw_map(json!({ "kinox": { "next_page": 10, "last_page": 9 } })),
        &mut settings,
    );
    assert_eq!(settings.cursor("kinox").next_page, Some(10));
}

#[test]
fn out_of_order_status_snapshots_are_dropped() {
    init_logging();
    let state = registered_state();
    let (state, _) = update(
        state,
        Msg::StatusFetched {
            seq: 7,
            manual: false,
            result: Ok(raw_map(json!({ "kinox": { "running": true, "next_page": 12 } }))),
        },
    );
    let (state, _) = update(
        state,
        Msg::StatusFetched {
            seq: 6,
            manual: false,
            result: Ok(raw_map(json!({ "kinox": { "running": false, "next_page": 11 } }))),
        },
    );

    assert!(state.jobs().status("kinox").unwrap().running);
    assert_eq!(state.scraper_settings().cursor("kinox").next_page, Some(12));
}

#[test]
fn failed_manual_refresh_notifies_and_backs_off() {
    init_logging();
    let (state, effects) = update(registered_state(), Msg::JobRefreshRequested);
    let seq = fetch_seq(&effects);

    let (state, effects) = update(
        state,
        Msg::StatusFetched {
            seq,
            manual: true,
            result: Err(SyncError::NetworkFailure("connection refused".to_string())),
        },
    );

    assert!(effects.iter().any(|effect| matches!(
        effect,
        Effect::Notify(notification) if notification.level == NotificationLevel::Error
    )));
    let (_, delay) = arm_effect(&effects);
    assert_eq!(delay, Duration::from_secs(8));
    assert!(!state.poll().is_fetching());
}

#[test]
fn failed_background_poll_is_silent() {
    init_logging();
    let (state, effects) = update(registered_state(), Msg::SessionStarted);
    let (generation, delay) = arm_effect(&effects);
    assert_eq!(delay, Duration::ZERO);
    assert!(effects.contains(&Effect::FetchCatalog));
    assert!(effects.contains(&Effect::LoadSettings));

    let (state, effects) = update(state, Msg::PollTimerFired { generation });
    let seq = fetch_seq(&effects);

    let (_state, effects) = update(
        state,
        Msg::StatusFetched {
            seq,
            manual: false,
            result: Err(SyncError::NetworkFailure("timeout".to_string())),
        },
    );
    assert!(!effects.iter().any(|effect| matches!(effect, Effect::Notify(_))));
    assert_eq!(arm_effect(&effects).1, Duration::from_secs(8));
}

#[test]
fn start_request_builds_payload_from_mode() {
    init_logging();
    let (_, effects) = update(
        registered_state(),
        Msg::JobStartRequested {
            job_id: "filmpalast-series".to_string(),
            start_page: Some(3),
        },
    );

    match effects.as_slice() {
        [Effect::StartJob {
            job_id,
            provider,
            payload,
            ..
        }] => {
            assert_eq!(job_id, "filmpalast-series");
            assert_eq!(provider, "filmpalast");
            assert_eq!(
                payload,
                &JobStartPayload {
                    include_series: true,
                    start_page: Some(3)
                }
            );
            assert_eq!(
                payload.to_json(),
                json!({ "include_series": true, "start_page": 3 })
            );
        }
        other => panic!("unexpected effects: {other:?}"),
    }
}

#[test]
fn start_request_for_running_job_is_ignored() {
    init_logging();
    let (state, _) = update(
        registered_state(),
        Msg::StatusFetched {
            seq: 1,
            manual: false,
            result: Ok(raw_map(json!({ "kinox": { "running": true } }))),
        },
    );

    let (_, effects) = update(
        state,
        Msg::JobStartRequested {
            job_id: "kinox-movies".to_string(),
            start_page: None,
        },
    );
    assert!(effects.is_empty());
}

#[test]
fn start_reply_applies_status_and_speeds_up_polling() {
    init_logging();
    let (state, effects) = update(
        registered_state(),
        Msg::JobStartRequested {
            job_id: "kinox-movies".to_string(),
            start_page: None,
        },
    );
    let seq = match &effects[0] {
        Effect::StartJob { seq, .. } => *seq,
        other => panic!("unexpected effect {other:?}"),
    };

    let (state, effects) = update(
        state,
        Msg::JobStartCompleted {
            seq,
            job_id: Some("kinox-movies".to_string()),
            result: Ok(JobStartReply {
                status: raw_map(json!({ "kinox": { "running": true, "next_page": 1 } })),
                started_any: true,
                message: Some("Kinox-Scraper gestartet.".to_string()),
            }),
        },
    );

    assert!(state.jobs().start_disabled("kinox-movies"));
    assert_eq!(arm_effect(&effects).1, Duration::from_secs(2));
    assert!(effects.contains(&Effect::Notify(catalog_sync_core::Notification::info(
        "Kinox-Scraper gestartet."
    ))));
}

#[test]
fn start_reply_overtaken_by_poll_still_applies() {
    init_logging();
    let (state, effects) = update(registered_state(), Msg::SessionStarted);
    let (generation, _) = arm_effect(&effects);

    let (state, effects) = update(
        state,
        Msg::JobStartRequested {
            job_id: "kinox-movies".to_string(),
            start_page: None,
        },
    );
    let start_seq = match effects.as_slice() {
        [Effect::StartJob { seq, .. }] => *seq,
        other => panic!("unexpected effects: {other:?}"),
    };

    // The poll is sent after the start but answered before the server acts on it.
    let (state, effects) = update(state, Msg::PollTimerFired { generation });
    let poll_seq = fetch_seq(&effects);
    assert!(poll_seq > start_seq);
    let (state, effects) = update(
        state,
        Msg::StatusFetched {
            seq: poll_seq,
            manual: false,
            result: Ok(raw_map(json!({ "kinox": { "running": false } }))),
        },
    );
    assert_eq!(arm_effect(&effects).1, Duration::from_secs(8));
    assert!(!state.jobs().start_disabled("kinox-movies"));

    let (state, effects) = update(
        state,
        Msg::JobStartCompleted {
            seq: start_seq,
            job_id: Some("kinox-movies".to_string()),
            result: Ok(JobStartReply {
                status: raw_map(json!({ "kinox": { "running": true, "current_page": 1 } })),
                started_any: true,
                message: None,
            }),
        },
    );

    assert!(state.jobs().status("kinox").unwrap().running);
    assert!(state.jobs().start_disabled("kinox-movies"));
    assert_eq!(arm_effect(&effects).1, Duration::from_secs(2));
    assert!(effects.contains(&Effect::Notify(catalog_sync_core::Notification::info(
        "Started kinox-movies."
    ))));

    // A poll issued before the start and answered after it is still stale.
    let (state, _) = update(
        state,
        Msg::StatusFetched {
            seq: start_seq - 1,
            manual: false,
            result: Ok(raw_map(json!({ "kinox": { "running": false } }))),
        },
    );
    assert!(state.jobs().start_disabled("kinox-movies"));
}

#[test]
fn blurring_an_unchanged_draft_lets_mirrored_cursors_through() {
    let mut registry = JobRegistry::new();
    registry.register_job("kinox-movies", "kinox", JobMode::Movies);
    let mut settings = ScraperSettings::new();
    registry.apply_statuses(
        &raw_map(json!({ "kinox": { "next_page": 5 } })),
        &mut settings,
    );

    settings.focus("kinox", CursorField::NextPage);
    settings.edit("kinox", CursorField::NextPage, "5");
    settings.blur();
    registry.apply_statuses(
        &raw_map(json!({ "kinox": { "next_page": 6 } })),
        &mut settings,
    );
    assert_eq!(settings.display_value("kinox", CursorField::NextPage), "6");

    // A real edit survives blur until it is saved or discarded.
    settings.focus("kinox", CursorField::NextPage);
    settings.edit("kinox", CursorField::NextPage, "20");
    settings.blur();
    registry.apply_statuses(
        &raw_map(json!({ "kinox": { "next_page": 7 } })),
        &mut settings,
    );
    assert_eq!(settings.display_value("kinox", CursorField::NextPage), "20");

    settings.discard_drafts();
    assert_eq!(settings.display_value("kinox", CursorField::NextPage), "7");
}

#[test]
fn discarding_edits_through_update_restores_stored_values() {
    init_logging();
    let (state, _) = update(
        registered_state(),
        Msg::StatusFetched {
            seq: 1,
            manual: false,
            result: Ok(raw_map(json!({ "kinox": { "next_page": 3 } }))),
        },
    );
    let (state, _) = update(
        state,
        Msg::SettingsFieldEdited {
            provider: "kinox".to_string(),
            field: CursorField::NextPage,
            value: "30".to_string(),
        },
    );
    let (state, _) = update(state, Msg::SettingsEditsDiscarded);
    let (_, effects) = update(state, Msg::SettingsSaveRequested);
    assert!(matches!(
        effects.as_slice(),
        [Effect::Notify(notification)] if notification.level == NotificationLevel::Error
    ));
}

#[test]
fn start_failure_surfaces_a_notification() {
    init_logging();
    let (_, effects) = update(
        registered_state(),
        Msg::JobStartCompleted {
            seq: 1,
            job_id: Some("kinox-movies".to_string()),
            result: Err(SyncError::NetworkFailure("503".to_string())),
        },
    );
    assert!(matches!(
        effects.as_slice(),
        [Effect::Notify(notification)] if notification.level == NotificationLevel::Error
    ));
}

#[test]
fn hidden_ui_pauses_and_resume_fetches_once() {
    init_logging();
    let (state, effects) = update(registered_state(), Msg::SessionStarted);
    let (generation, _) = arm_effect(&effects);

    let (state, effects) = update(state, Msg::VisibilityChanged { hidden: true });
    assert_eq!(effects, vec![Effect::ClearPollTimer]);

    // The cleared timer may still fire; it must not fetch.
    let (state, effects) = update(state, Msg::PollTimerFired { generation });
    assert!(effects.is_empty());

    let (state, effects) = update(state, Msg::VisibilityChanged { hidden: false });
    let seq = fetch_seq(&effects);
    assert_eq!(effects.len(), 1);

    let (_, effects) = update(
        state,
        Msg::StatusFetched {
            seq,
            manual: false,
            result: Ok(raw_map(json!({}))),
        },
    );
    assert_eq!(arm_effect(&effects).1, Duration::from_secs(8));
}

#[test]
fn settings_save_validates_and_completes() {
    init_logging();
    let state = registered_state();
    let (state, _) = update(
        state,
        Msg::SettingsFieldEdited {
            provider: "kinox".to_string(),
            field: CursorField::NextPage,
            value: "0".to_string(),
        },
    );
    let (state, effects) = update(state, Msg::SettingsSaveRequested);
    assert!(matches!(
        effects.as_slice(),
        [Effect::Notify(notification)] if notification.level == NotificationLevel::Error
    ));

    let (state, _) = update(
        state,
        Msg::SettingsFieldEdited {
            provider: "kinox".to_string(),
            field: CursorField::NextPage,
            value: " 42 ".to_string(),
        },
    );
    let (state, effects) = update(state, Msg::SettingsSaveRequested);
    let payload = match effects.as_slice() {
        [Effect::SaveSettings { payload }] => payload.clone(),
        other => panic!("unexpected effects: {other:?}"),
    };
    assert_eq!(
        payload.to_json(),
        json!({ "scrapers": { "kinox": { "next_page": 42 } } })
    );

    let saved = catalog_sync_core::SettingsSnapshot::from_value(&json!({
        "success": true,
        "settings": { "scrapers": { "kinox": { "next_page": 42, "last_page": 41 } } }
    }));
    let (state, _) = update(state, Msg::SettingsSaved(Ok(saved)));
    assert_eq!(
        state.scraper_settings().cursor("kinox"),
        ProviderCursor {
            next_page: Some(42),
            last_page: Some(41)
        }
    );
    let row = state
        .view()
        .settings
        .into_iter()
        .find(|row| row.provider == "kinox")
        .unwrap();
    assert_eq!(row.next_page, "42");
}

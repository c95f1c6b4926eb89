//! Plain-text rendering of the view model.

use std::fmt::Write;

use catalog_sync_core::{
    AppViewModel, BusyState, CatalogItem, JobMode, JobPanelView, LogLevel, Notification,
    NotificationLevel, PollPhase, ProgressMode, SearchNotice, SearchPhase, SearchView,
    SettingsRowView, SortDirection, SortKey,
};

const RULE: &str = "----------------------------------------";

pub fn render(view: &AppViewModel) -> String {
    let mut out = String::new();
    let polling = match view.polling {
        PollPhase::Idle => "idle",
        PollPhase::Scheduled => "scheduled",
        PollPhase::Fetching => "fetching",
        PollPhase::Paused => "paused",
    };
    let _ = writeln!(out, "{RULE}");
    let _ = writeln!(
        out,
        "Jobs ({}; polling {polling})",
        if view.any_running { "active" } else { "idle" }
    );
    for panel in &view.jobs {
        render_job(&mut out, panel);
    }
    render_search(&mut out, &view.search);
    render_catalog(&mut out, view);
    render_settings(&mut out, &view.settings);
    out
}

pub fn render_notification(notification: &Notification) -> String {
    let time = chrono::Local::now().format("%H:%M:%S");
    match notification.level {
        NotificationLevel::Info => format!("[{time}] {}", notification.text),
        NotificationLevel::Error => format!("[{time}] ERROR: {}", notification.text),
    }
}

pub fn render_opened(item: &CatalogItem) -> String {
    match item.year() {
        Some(year) => format!("Opening #{} {} ({year})", item.id, item.title),
        None => format!("Opening #{} {}", item.id, item.title),
    }
}

fn render_job(out: &mut String, panel: &JobPanelView) {
    let state = if panel.running { "running" } else { "stopped" };
    let progress = match panel.progress_mode {
        ProgressMode::Determinate => format!("{:.0}%", panel.progress),
        ProgressMode::Indeterminate => "working…".to_string(),
        ProgressMode::Idle => "-".to_string(),
    };
    let _ = writeln!(out, "* {} [{state}] {progress} {}", panel.label, panel.message);
    let _ = writeln!(
        out,
        "    pages {}/{}  links {}  current {}  next {}  last {}",
        panel.processed_pages,
        panel.total_pages,
        panel.processed_links,
        page_text(panel.current_page),
        page_text(panel.next_page),
        page_text(panel.last_page),
    );
    if let Some(title) = &panel.last_title {
        let _ = writeln!(out, "    last title: {title}");
    }
    if let Some(error) = &panel.error {
        let _ = writeln!(out, "    error: {error}");
    }
    for control in &panel.controls {
        let mode = match control.mode {
            JobMode::Movies => "movies",
            JobMode::Series => "series",
        };
        let availability = if control.disabled { " (disabled)" } else { "" };
        let _ = writeln!(out, "    [start {}] {mode}{availability}", control.job_id);
    }
    for line in panel.log.iter().take(5) {
        let level = match line.level {
            LogLevel::Info => "info",
            LogLevel::Warning => "warn",
            LogLevel::Error => "error",
        };
        let _ = writeln!(
            out,
            "    {} {level:<5} {}",
            line.timestamp.as_deref().unwrap_or("--:--:--"),
            line.message
        );
    }
}

fn render_search(out: &mut String, search: &SearchView) {
    let _ = writeln!(out, "{RULE}");
    let phase = match search.phase {
        SearchPhase::Debouncing => " (typing)",
        SearchPhase::InFlight => " (searching)",
        _ => "",
    };
    let _ = writeln!(out, "Search: \"{}\"{phase}", search.query);
    match search.notice {
        Some(SearchNotice::TypeMore) => {
            let _ = writeln!(out, "  Type at least two characters.");
        }
        Some(SearchNotice::NoResults) => {
            let _ = writeln!(out, "  No matches.");
        }
        Some(SearchNotice::Failed) => {
            let _ = writeln!(out, "  Search failed. Try again.");
        }
        None => {}
    }
    for (index, result) in search.results.iter().enumerate() {
        let marker = if search.highlight == Some(index) { ">" } else { " " };
        let year = result.year.map(|year| format!(" ({year})")).unwrap_or_default();
        let rating = result
            .rating
            .map(|rating| format!("  ★ {rating:.1}"))
            .unwrap_or_default();
        let _ = writeln!(out, " {marker}{:>2}. {}{year}{rating}", index + 1, result.title);
    }
}

fn render_catalog(out: &mut String, view: &AppViewModel) {
    let catalog = &view.catalog;
    let _ = writeln!(out, "{RULE}");
    let key = match catalog.sort.key {
        SortKey::Popularity => "popularity",
        SortKey::Title => "title",
        SortKey::ReleaseDate => "release date",
        SortKey::AddedDate => "added date",
        SortKey::Runtime => "runtime",
    };
    let direction = match catalog.sort.direction {
        SortDirection::Ascending => "asc",
        SortDirection::Descending => "desc",
    };
    let _ = writeln!(
        out,
        "Catalog: {} titles, sorted by {key} {direction}, page {}/{}",
        catalog.total_items, catalog.page, catalog.total_pages
    );
    match catalog.busy {
        BusyState::Loading => {
            let _ = writeln!(out, "  Loading…");
            return;
        }
        BusyState::Sorting => {
            let _ = writeln!(out, "  Sorting…");
            return;
        }
        BusyState::Idle => {}
    }
    if let Some(message) = &catalog.message {
        let _ = writeln!(out, "  {message}");
    }
    for item in &catalog.items {
        let year = item.year().map(|year| format!(" ({year})")).unwrap_or_default();
        let runtime = item
            .runtime
            .map(|minutes| format!("  {minutes} min"))
            .unwrap_or_default();
        let _ = writeln!(out, "  #{:<6} {}{year}{runtime}", item.id, item.title);
    }
    let previous = if catalog.can_previous { "[prev]" } else { "" };
    let next = if catalog.can_next { "[next]" } else { "" };
    if !previous.is_empty() || !next.is_empty() {
        let _ = writeln!(out, "  {previous} {next}");
    }
}

fn render_settings(out: &mut String, rows: &[SettingsRowView]) {
    if rows.is_empty() {
        return;
    }
    let _ = writeln!(out, "{RULE}");
    let _ = writeln!(out, "Settings");
    for row in rows {
        let editing = row
            .focused
            .map(|field| format!("  (editing {field:?})"))
            .unwrap_or_default();
        let _ = writeln!(
            out,
            "  {}: next page {}  last page {}{editing}",
            row.provider,
            blank_as_dash(&row.next_page),
            blank_as_dash(&row.last_page),
        );
    }
}

fn page_text(page: Option<u32>) -> String {
    page.map(|page| page.to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn blank_as_dash(value: &str) -> &str {
    if value.is_empty() {
        "-"
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog_sync_core::{update, AppState, JobMode, Msg};
    use serde_json::json;

    fn running_kinox() -> AppViewModel {
        let (state, _) = update(
            AppState::new(),
            Msg::JobRegistered {
                job_id: "kinox-movies".to_string(),
                provider: "kinox".to_string(),
                mode: JobMode::Movies,
            },
        );
        let status = json!({
            "kinox": {
                "running": true,
                "current_page": 4,
                "next_page": 5,
                "log": [{ "timestamp": "2024-05-01T10:00:00", "level": "info", "message": "Seite 4" }]
            }
        });
        let (state, _) = update(
            state,
            Msg::StatusFetched {
                seq: 1,
                manual: false,
                result: Ok(status.as_object().cloned().unwrap()),
            },
        );
        state.view()
    }

    #[test]
    fn running_job_shows_disabled_start_and_log() {
        let text = render(&running_kinox());
        assert!(text.contains("[running] working…"));
        assert!(text.contains("current 4  next 5"));
        assert!(text.contains("[start kinox-movies] movies (disabled)"));
        assert!(text.contains("10:00:00 info  Seite 4"));
    }

    #[test]
    fn empty_catalog_shows_placeholder() {
        let text = render(&AppState::new().view());
        assert!(text.contains("Catalog: 0 titles, sorted by popularity desc, page 1/1"));
        assert!(text.contains("No titles available."));
    }

    #[test]
    fn search_hint_is_rendered() {
        let (state, _) = update(AppState::new(), Msg::SearchInput("a".to_string()));
        assert!(render(&state.view()).contains("Type at least two characters."));
    }

    #[test]
    fn notifications_carry_level() {
        let text = render_notification(&Notification::error("boom"));
        assert!(text.ends_with("ERROR: boom"));
        let text = render_notification(&Notification::info("ok"));
        assert!(text.ends_with("] ok"));
    }
}

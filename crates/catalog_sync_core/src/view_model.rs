use crate::catalog::{BusyState, CatalogItem, SortSpec};
use crate::jobs::JobMode;
use crate::poll::PollPhase;
use crate::search::{SearchNotice, SearchPhase};
use crate::settings_mirror::CursorField;
use crate::status::{LogLevel, ProgressMode, LOG_DISPLAY_LIMIT};
use crate::AppState;

#[derive(Debug, Clone, PartialEq)]
pub struct AppViewModel {
    pub jobs: Vec<JobPanelView>,
    pub any_running: bool,
    pub polling: PollPhase,
    pub search: SearchView,
    pub catalog: CatalogPageView,
    pub settings: Vec<SettingsRowView>,
    pub dirty: bool,
}

/// One provider's panel with the start buttons bound to it.
#[derive(Debug, Clone, PartialEq)]
pub struct JobPanelView {
    pub provider: String,
    pub label: String,
    pub running: bool,
    pub progress_mode: ProgressMode,
    pub progress: f64,
    pub message: String,
    pub error: Option<String>,
    pub current_page: Option<u32>,
    pub next_page: Option<u32>,
    pub last_page: Option<u32>,
    pub processed_pages: u64,
    pub total_pages: u64,
    pub processed_links: u64,
    pub last_title: Option<String>,
    /// Newest first, at most 25.
    pub log: Vec<LogLineView>,
    pub controls: Vec<JobControlView>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobControlView {
    pub job_id: String,
    pub mode: JobMode,
    pub disabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLineView {
    pub timestamp: Option<String>,
    pub level: LogLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchView {
    pub query: String,
    pub phase: SearchPhase,
    pub notice: Option<SearchNotice>,
    pub results: Vec<SearchResultView>,
    pub highlight: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchResultView {
    pub id: u64,
    pub title: String,
    pub year: Option<i32>,
    pub rating: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatalogPageView {
    /// Empty while `busy` is not idle; the page shows a placeholder instead.
    pub items: Vec<CatalogItem>,
    pub page: usize,
    pub total_pages: usize,
    pub total_items: usize,
    pub busy: BusyState,
    pub can_previous: bool,
    pub can_next: bool,
    pub sort: SortSpec,
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsRowView {
    pub provider: String,
    pub next_page: String,
    pub last_page: String,
    pub focused: Option<CursorField>,
}

pub(crate) fn build(state: &AppState, dirty: bool) -> AppViewModel {
    AppViewModel {
        jobs: job_panels(state),
        any_running: state.jobs.any_running(),
        polling: state.poll.phase(),
        search: search_view(state),
        catalog: catalog_view(state),
        settings: settings_rows(state),
        dirty,
    }
}

fn job_panels(state: &AppState) -> Vec<JobPanelView> {
    state
        .jobs
        .statuses()
        .values()
        .map(|status| JobPanelView {
            provider: status.provider.clone(),
            label: status.display_label().to_string(),
            running: status.running,
            progress_mode: status.progress_mode,
            progress: status.progress,
            message: status.message.clone(),
            error: status.error.clone(),
            current_page: status.current_page.filter(|_| status.running),
            next_page: status.next_page,
            last_page: status.last_page,
            processed_pages: status.processed_pages,
            total_pages: status.total_pages,
            processed_links: status.processed_links,
            last_title: status.last_title.clone(),
            log: status
                .recent_log(LOG_DISPLAY_LIMIT)
                .into_iter()
                .map(|entry| LogLineView {
                    timestamp: entry
                        .timestamp
                        .map(|ts| ts.format("%H:%M:%S").to_string()),
                    level: entry.level,
                    message: entry.message.clone(),
                })
                .collect(),
            controls: state
                .jobs
                .controllers()
                .iter()
                .filter(|controller| controller.provider == status.provider)
                .map(|controller| JobControlView {
                    job_id: controller.job_id.clone(),
                    mode: controller.mode,
                    disabled: state.jobs.start_disabled(&controller.job_id),
                })
                .collect(),
        })
        .collect()
}

fn search_view(state: &AppState) -> SearchView {
    let search = &state.search;
    SearchView {
        query: search.query().to_string(),
        phase: search.phase(),
        notice: search.notice(),
        results: search
            .results()
            .iter()
            .map(|item| SearchResultView {
                id: item.id,
                title: item.title.clone(),
                year: item.year(),
                rating: item.finite_rating(),
            })
            .collect(),
        highlight: search.highlight(),
    }
}

fn catalog_view(state: &AppState) -> CatalogPageView {
    let catalog = &state.catalog;
    let message = match (catalog.load_error(), catalog.busy()) {
        (Some(error), BusyState::Idle) if catalog.items().is_empty() => Some(error.to_string()),
        (None, BusyState::Idle) if catalog.items().is_empty() => {
            Some("No titles available.".to_string())
        }
        _ => None,
    };
    CatalogPageView {
        items: catalog.page_items().to_vec(),
        page: catalog.page(),
        total_pages: catalog.total_pages(),
        total_items: catalog.items().len(),
        busy: catalog.busy(),
        can_previous: catalog.can_go_previous(),
        can_next: catalog.can_go_next(),
        sort: catalog.sort(),
        message,
    }
}

fn settings_rows(state: &AppState) -> Vec<SettingsRowView> {
    let settings = &state.scraper_settings;
    let focused = settings.focused();
    let mut providers: Vec<&str> = settings.providers().collect();
    for controller in state.jobs.controllers() {
        if !providers.contains(&controller.provider.as_str()) {
            providers.push(controller.provider.as_str());
        }
    }
    providers.sort_unstable();
    providers
        .into_iter()
        .map(|provider| SettingsRowView {
            provider: provider.to_string(),
            next_page: settings.display_value(provider, CursorField::NextPage),
            last_page: settings.display_value(provider, CursorField::LastPage),
            focused: focused
                .filter(|(focused_provider, _)| *focused_provider == provider)
                .map(|(_, field)| field),
        })
        .collect()
}

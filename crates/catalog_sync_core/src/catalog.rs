//! In-memory catalog listing: sorting, runtime backfill and fixed-size pages.

use std::cmp::Ordering;
use std::collections::HashSet;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};
use sync_logging::{sync_debug, sync_warn};

use crate::collate::compare_titles;
use crate::runtime_cache::{RuntimeCache, RuntimeEntry};
use crate::status::parse_timestamp;
use crate::SyncError;

pub type ItemId = u64;

/// Items per page in the full grid view.
pub const DEFAULT_PAGE_SIZE: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: ItemId,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub title: String,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub first_air_date: Option<String>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub runtime: Option<u32>,
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl CatalogItem {
    pub fn new(id: ItemId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            release_date: None,
            first_air_date: None,
            rating: None,
            created_at: None,
            runtime: None,
        }
    }

    /// Release day of a film, or first air day of a series.
    pub fn release_day(&self) -> Option<NaiveDate> {
        self.release_date
            .as_deref()
            .or(self.first_air_date.as_deref())
            .and_then(parse_day)
    }

    pub fn added_at(&self) -> Option<NaiveDateTime> {
        let raw = self.created_at.as_deref()?;
        parse_timestamp(raw).or_else(|| parse_day(raw).and_then(|day| day.and_hms_opt(0, 0, 0)))
    }

    /// Title for ordering; blank titles count as missing.
    pub fn sort_title(&self) -> Option<&str> {
        Some(self.title.as_str()).filter(|title| !title.trim().is_empty())
    }

    pub fn finite_rating(&self) -> Option<f64> {
        self.rating.filter(|rating| rating.is_finite())
    }

    /// Four-digit year for display.
    pub fn year(&self) -> Option<i32> {
        use chrono::Datelike;
        self.release_day().map(|day| day.year())
    }
}

fn parse_day(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let head = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(head, "%Y-%m-%d").ok().or_else(|| {
        raw.get(..4)
            .and_then(|year| year.parse::<i32>().ok())
            .and_then(|year| NaiveDate::from_ymd_opt(year, 1, 1))
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortKey {
    Popularity,
    Title,
    ReleaseDate,
    AddedDate,
    Runtime,
}

impl SortKey {
    pub fn default_direction(self) -> SortDirection {
        match self {
            SortKey::Title | SortKey::Runtime => SortDirection::Ascending,
            SortKey::Popularity | SortKey::ReleaseDate | SortKey::AddedDate => {
                SortDirection::Descending
            }
        }
    }

    pub fn parse(text: &str) -> Option<Self> {
        match text.trim().to_ascii_lowercase().as_str() {
            "popularity" | "rating" => Some(SortKey::Popularity),
            "title" => Some(SortKey::Title),
            "release" | "release_date" | "releasedate" => Some(SortKey::ReleaseDate),
            "added" | "added_date" | "addeddate" => Some(SortKey::AddedDate),
            "runtime" => Some(SortKey::Runtime),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec {
    pub key: SortKey,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn new(key: SortKey, direction: Option<SortDirection>) -> Self {
        Self {
            key,
            direction: direction.unwrap_or_else(|| key.default_direction()),
        }
    }
}

impl Default for SortSpec {
    fn default() -> Self {
        Self::new(SortKey::Popularity, None)
    }
}

/// Total order over catalog items for a sort spec.
///
/// Missing values sort last in either direction. Ties fall back to collated
/// title ascending, then id.
pub fn compare_items(a: &CatalogItem, b: &CatalogItem, spec: SortSpec) -> Ordering {
    let primary = match spec.key {
        SortKey::Title => present_first_by(
            a.sort_title(),
            b.sort_title(),
            spec.direction,
            |a, b| compare_titles(a, b),
        ),
        SortKey::Popularity => present_first(a.finite_rating(), b.finite_rating(), spec.direction),
        SortKey::ReleaseDate => present_first(a.release_day(), b.release_day(), spec.direction),
        SortKey::AddedDate => present_first(a.added_at(), b.added_at(), spec.direction),
        SortKey::Runtime => present_first(a.runtime, b.runtime, spec.direction),
    };
    primary
        .then_with(|| {
            present_first_by(
                a.sort_title(),
                b.sort_title(),
                SortDirection::Ascending,
                |a, b| compare_titles(a, b),
            )
        })
        .then_with(|| a.id.cmp(&b.id))
}

fn present_first<T: PartialOrd>(a: Option<T>, b: Option<T>, direction: SortDirection) -> Ordering {
    present_first_by(a, b, direction, |a, b| {
        a.partial_cmp(b).unwrap_or(Ordering::Equal)
    })
}

fn present_first_by<T>(
    a: Option<T>,
    b: Option<T>,
    direction: SortDirection,
    compare: impl Fn(&T, &T) -> Ordering,
) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => direction.apply(compare(&a, &b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BusyState {
    #[default]
    Idle,
    Loading,
    Sorting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingSort {
    reset_page: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatalogPager {
    items: Vec<CatalogItem>,
    sort: SortSpec,
    page: usize,
    page_size: usize,
    busy: BusyState,
    highlighted: Option<ItemId>,
    pending: Option<PendingSort>,
    load_error: Option<String>,
    runtimes: RuntimeCache,
}

impl Default for CatalogPager {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE, RuntimeCache::default())
    }
}

impl CatalogPager {
    pub fn new(page_size: usize, runtimes: RuntimeCache) -> Self {
        Self {
            items: Vec::new(),
            sort: SortSpec::default(),
            page: 1,
            page_size: page_size.max(1),
            busy: BusyState::Idle,
            highlighted: None,
            pending: None,
            load_error: None,
            runtimes,
        }
    }

    pub fn items(&self) -> &[CatalogItem] {
        &self.items
    }

    pub fn sort(&self) -> SortSpec {
        self.sort
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn busy(&self) -> BusyState {
        self.busy
    }

    pub fn highlighted(&self) -> Option<ItemId> {
        self.highlighted
    }

    pub fn load_error(&self) -> Option<&str> {
        self.load_error.as_deref()
    }

    pub fn runtimes(&self) -> &RuntimeCache {
        &self.runtimes
    }

    pub fn total_pages(&self) -> usize {
        self.items.len().div_ceil(self.page_size).max(1)
    }

    /// Items on the current page. Empty while loading or sorting.
    pub fn page_items(&self) -> &[CatalogItem] {
        if self.busy != BusyState::Idle {
            return &[];
        }
        let start = (self.page - 1) * self.page_size;
        let end = (start + self.page_size).min(self.items.len());
        self.items.get(start..end).unwrap_or(&[])
    }

    pub fn can_go_previous(&self) -> bool {
        self.busy == BusyState::Idle && self.page > 1
    }

    pub fn can_go_next(&self) -> bool {
        self.busy == BusyState::Idle && self.page < self.total_pages()
    }

    pub fn begin_load(&mut self) {
        self.busy = BusyState::Loading;
        self.load_error = None;
    }

    /// Replaces the catalog and re-sorts with the current sort order. Returns the
    /// runtime batches to fetch when the current sort needs them.
    pub fn finish_load(&mut self, result: Result<Vec<CatalogItem>, SyncError>) -> Vec<Vec<ItemId>> {
        let loaded = match result {
            Ok(items) => items,
            Err(err) => {
                sync_warn!("Catalog load failed: {}", err);
                self.busy = BusyState::Idle;
                self.pending = None;
                self.load_error = Some("The catalog could not be loaded.".to_string());
                return Vec::new();
            }
        };

        let mut seen = HashSet::with_capacity(loaded.len());
        let mut items = Vec::with_capacity(loaded.len());
        for mut item in loaded {
            if !seen.insert(item.id) {
                sync_debug!("Dropping duplicate catalog id {}", item.id);
                continue;
            }
            match item.runtime {
                Some(runtime) => self.runtimes.seed(item.id, runtime),
                None => item.runtime = self.runtimes.get(item.id).flatten(),
            }
            items.push(item);
        }
        self.items = items;
        self.busy = BusyState::Idle;
        self.pending = None;
        self.sort_with(self.sort, false)
    }

    /// User-initiated sort change; always lands on page 1.
    pub fn request_sort(
        &mut self,
        key: SortKey,
        direction: Option<SortDirection>,
    ) -> Vec<Vec<ItemId>> {
        self.sort_with(SortSpec::new(key, direction), true)
    }

    pub fn highlight(&mut self, id: Option<ItemId>) {
        self.highlighted = id;
    }

    /// Moves by `offset` pages, clamped. Returns whether the page changed.
    pub fn change_page(&mut self, offset: i64) -> bool {
        if self.busy != BusyState::Idle {
            return false;
        }
        let last = self.total_pages() as i64;
        let target = (self.page as i64).saturating_add(offset).clamp(1, last) as usize;
        let changed = target != self.page;
        self.page = target;
        changed
    }

    /// Applies a runtime batch reply and finishes a pending runtime sort once
    /// nothing it waits on is still in flight.
    pub fn apply_runtimes(
        &mut self,
        requested: &[ItemId],
        result: Result<Vec<RuntimeEntry>, SyncError>,
    ) {
        match result {
            Ok(reply) => self.runtimes.complete_batch(requested, &reply),
            Err(err) => {
                sync_warn!("Runtime batch of {} ids failed: {}", requested.len(), err);
                self.runtimes.fail_batch(requested);
            }
        }
        for item in self.items.iter_mut().filter(|item| item.runtime.is_none()) {
            item.runtime = self.runtimes.get(item.id).flatten();
        }

        let Some(pending) = self.pending else {
            return;
        };
        if self.sort.key != SortKey::Runtime {
            return;
        }
        let waiting = self
            .items
            .iter()
            .any(|item| item.runtime.is_none() && self.runtimes.is_in_flight(item.id));
        if !waiting {
            self.pending = None;
            self.busy = BusyState::Idle;
            self.apply_sort(pending.reset_page);
        }
    }

    fn sort_with(&mut self, spec: SortSpec, reset_page: bool) -> Vec<Vec<ItemId>> {
        self.sort = spec;
        if self.busy == BusyState::Loading {
            if reset_page {
                self.page = 1;
            }
            return Vec::new();
        }
        if spec.key != SortKey::Runtime {
            self.pending = None;
            self.busy = BusyState::Idle;
            self.apply_sort(reset_page);
            return Vec::new();
        }

        let missing: Vec<ItemId> = self
            .items
            .iter()
            .filter(|item| item.runtime.is_none())
            .map(|item| item.id)
            .collect();
        let batches = self.runtimes.ensure(missing.iter().copied());
        let waiting = missing.iter().any(|id| self.runtimes.is_in_flight(*id));
        if waiting {
            let reset_page = reset_page || self.pending.is_some_and(|p| p.reset_page);
            self.pending = Some(PendingSort { reset_page });
            self.busy = BusyState::Sorting;
        } else {
            self.pending = None;
            self.busy = BusyState::Idle;
            self.apply_sort(reset_page);
        }
        batches
    }

    fn apply_sort(&mut self, reset_page: bool) {
        let spec = self.sort;
        self.items.sort_by(|a, b| compare_items(a, b, spec));
        if reset_page {
            self.page = 1;
            return;
        }
        let highlighted_index = self
            .highlighted
            .and_then(|id| self.items.iter().position(|item| item.id == id));
        if let Some(index) = highlighted_index {
            self.page = index / self.page_size + 1;
        }
        self.page = self.page.clamp(1, self.total_pages());
    }
}

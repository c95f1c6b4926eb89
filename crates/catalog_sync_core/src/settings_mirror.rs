//! Scraper resume cursors as shown in the settings form.
//!
//! Two flows write here: status application (through [`SettingsMirror`]) and
//! the explicit load/save round trip. Writes are last-write-wins by call
//! order, except that status application never touches the focused field.

use std::collections::BTreeMap;

use serde_json::{json, Value};

use crate::status::cursor;
use crate::SyncError;

/// Narrow seam through which job status application mirrors resume cursors.
pub trait SettingsMirror {
    fn mirror_cursor(&mut self, provider: &str, next_page: Option<u32>, last_page: Option<u32>);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CursorField {
    NextPage,
    LastPage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProviderCursor {
    pub next_page: Option<u32>,
    pub last_page: Option<u32>,
}

impl ProviderCursor {
    fn get(&self, field: CursorField) -> Option<u32> {
        match field {
            CursorField::NextPage => self.next_page,
            CursorField::LastPage => self.last_page,
        }
    }

    fn set(&mut self, field: CursorField, value: u32) {
        match field {
            CursorField::NextPage => self.next_page = Some(value),
            CursorField::LastPage => self.last_page = Some(value),
        }
    }
}

/// Provider cursors as reported by the settings endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SettingsSnapshot {
    pub providers: BTreeMap<String, ProviderCursor>,
}

impl SettingsSnapshot {
    /// Lenient decode of `{"scrapers": {..}}`, optionally wrapped in `{"settings": ..}`.
    pub fn from_value(value: &Value) -> Self {
        let root = value.get("settings").unwrap_or(value);
        let providers = root
            .get("scrapers")
            .and_then(Value::as_object)
            .map(|scrapers| {
                scrapers
                    .iter()
                    .map(|(provider, fields)| {
                        (
                            provider.clone(),
                            ProviderCursor {
                                next_page: cursor(fields.get("next_page")),
                                last_page: cursor(fields.get("last_page")),
                            },
                        )
                    })
                    .collect()
            })
            .unwrap_or_default();
        Self { providers }
    }
}

/// Validated next-page values ready to be posted to the settings endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SettingsSavePayload {
    pub next_pages: BTreeMap<String, u32>,
}

impl SettingsSavePayload {
    pub fn to_json(&self) -> Value {
        let scrapers: serde_json::Map<String, Value> = self
            .next_pages
            .iter()
            .map(|(provider, page)| (provider.clone(), json!({ "next_page": page })))
            .collect();
        json!({ "scrapers": scrapers })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScraperSettings {
    cursors: BTreeMap<String, ProviderCursor>,
    drafts: BTreeMap<(String, CursorField), String>,
    focused: Option<(String, CursorField)>,
}

impl ScraperSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cursor(&self, provider: &str) -> ProviderCursor {
        self.cursors.get(provider).copied().unwrap_or_default()
    }

    pub fn focused(&self) -> Option<(&str, CursorField)> {
        self.focused
            .as_ref()
            .map(|(provider, field)| (provider.as_str(), *field))
    }

    pub fn focus(&mut self, provider: &str, field: CursorField) {
        self.focused = Some((provider.to_string(), field));
    }

    /// Leaves the focused field. A draft that matches the stored value (or is
    /// blank) is dropped so later mirrored cursors show through again.
    pub fn blur(&mut self) {
        let Some(key) = self.focused.take() else {
            return;
        };
        let stored = self.cursor(&key.0).get(key.1);
        let unchanged = self.drafts.get(&key).is_some_and(|draft| {
            let draft = draft.trim();
            draft.is_empty() || draft.parse::<u32>().ok() == stored
        });
        if unchanged {
            self.drafts.remove(&key);
        }
    }

    /// Throws away every unsaved edit.
    pub fn discard_drafts(&mut self) {
        self.drafts.clear();
    }

    pub fn edit(&mut self, provider: &str, field: CursorField, text: impl Into<String>) {
        self.drafts.insert((provider.to_string(), field), text.into());
    }

    /// What the form shows: the draft while one exists, else the stored value.
    pub fn display_value(&self, provider: &str, field: CursorField) -> String {
        if let Some(draft) = self.drafts.get(&(provider.to_string(), field)) {
            return draft.clone();
        }
        self.cursor(provider)
            .get(field)
            .map(|page| page.to_string())
            .unwrap_or_default()
    }

    pub fn providers(&self) -> impl Iterator<Item = &str> {
        self.cursors.keys().map(String::as_str)
    }

    /// Explicit load/save results overwrite whatever is stored.
    pub fn apply_snapshot(&mut self, snapshot: &SettingsSnapshot) {
        for (provider, incoming) in &snapshot.providers {
            let stored = self.cursors.entry(provider.clone()).or_default();
            if let Some(next) = incoming.next_page {
                stored.next_page = Some(next);
            }
            if let Some(last) = incoming.last_page {
                stored.last_page = Some(last);
            }
        }
    }

    /// Collects next-page drafts. Values below 1 or non-numeric fail validation.
    pub fn build_save_payload(&self) -> Result<SettingsSavePayload, SyncError> {
        let mut next_pages = BTreeMap::new();
        for ((provider, field), draft) in &self.drafts {
            if *field != CursorField::NextPage {
                continue;
            }
            let page = draft
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|page| *page >= 1)
                .ok_or_else(|| {
                    SyncError::ValidationFailure(format!(
                        "Next page for {provider} must be a whole number of at least 1."
                    ))
                })?;
            next_pages.insert(provider.clone(), page);
        }
        if next_pages.is_empty() {
            return Err(SyncError::ValidationFailure("No changes to save.".to_string()));
        }
        Ok(SettingsSavePayload { next_pages })
    }

    /// Server accepted the save: store its values and drop the saved drafts.
    pub fn complete_save(&mut self, saved: &SettingsSnapshot) {
        self.apply_snapshot(saved);
        self.drafts
            .retain(|(provider, _), _| !saved.providers.contains_key(provider));
    }
}

impl SettingsMirror for ScraperSettings {
    fn mirror_cursor(&mut self, provider: &str, next_page: Option<u32>, last_page: Option<u32>) {
        let focused_field = match &self.focused {
            Some((focused_provider, field)) if focused_provider == provider => Some(*field),
            _ => None,
        };
        let stored = self.cursors.entry(provider.to_string()).or_default();
        for (field, value) in [
            (CursorField::NextPage, next_page),
            (CursorField::LastPage, last_page),
        ] {
            if focused_field == Some(field) {
                continue;
            }
            if let Some(value) = value {
                stored.set(field, value);
            }
        }
    }
}

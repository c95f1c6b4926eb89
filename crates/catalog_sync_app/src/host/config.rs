use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use catalog_sync_core::{JobMode, PollIntervals, SyncSettings};
use catalog_sync_engine::{ApiPaths, ApiSettings};
use serde::{Deserialize, Serialize};

use super::logging::LogDestination;

pub const CONFIG_FILENAME: &str = "catalog_sync.ron";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobKind {
    Movies,
    Series,
}

impl From<JobKind> for JobMode {
    fn from(kind: JobKind) -> Self {
        match kind {
            JobKind::Movies => JobMode::Movies,
            JobKind::Series => JobMode::Series,
        }
    }
}

/// One start control bound to a provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobConfig {
    pub job_id: String,
    pub provider: String,
    pub mode: JobKind,
}

impl JobConfig {
    fn new(job_id: &str, provider: &str, mode: JobKind) -> Self {
        Self {
            job_id: job_id.to_string(),
            provider: provider.to_string(),
            mode,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub base_url: String,
    pub jobs: Vec<JobConfig>,
    pub poll_short_ms: u64,
    pub poll_long_ms: u64,
    pub search_debounce_ms: u64,
    pub page_size: usize,
    pub runtime_batch_size: usize,
    pub request_timeout_ms: u64,
    pub connect_timeout_ms: u64,
    pub log: LogDestination,
}

impl Default for SyncConfig {
    fn default() -> Self {
        let sync = SyncSettings::default();
        let api = ApiSettings::default();
        Self {
            base_url: api.base_url,
            jobs: vec![
                JobConfig::new("kinox-movies", "kinox", JobKind::Movies),
                JobConfig::new("filmpalast-movies", "filmpalast", JobKind::Movies),
                JobConfig::new("filmpalast-series", "filmpalast", JobKind::Series),
            ],
            poll_short_ms: millis(sync.poll.short),
            poll_long_ms: millis(sync.poll.long),
            search_debounce_ms: millis(sync.search_debounce),
            page_size: sync.page_size,
            runtime_batch_size: sync.runtime_batch_size,
            request_timeout_ms: millis(api.request_timeout),
            connect_timeout_ms: millis(api.connect_timeout),
            log: LogDestination::default(),
        }
    }
}

impl SyncConfig {
    pub fn sync_settings(&self) -> SyncSettings {
        SyncSettings {
            poll: PollIntervals {
                short: Duration::from_millis(self.poll_short_ms.max(1)),
                long: Duration::from_millis(self.poll_long_ms.max(1)),
            },
            search_debounce: Duration::from_millis(self.search_debounce_ms),
            page_size: self.page_size.max(1),
            runtime_batch_size: self.runtime_batch_size.max(1),
        }
    }

    pub fn api_settings(&self) -> ApiSettings {
        ApiSettings {
            base_url: self.base_url.clone(),
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            request_timeout: Duration::from_millis(self.request_timeout_ms),
            paths: ApiPaths::default(),
        }
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Config path from the first CLI argument, else `./catalog_sync.ron`.
pub fn resolve_path(arg: Option<String>) -> PathBuf {
    arg.map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILENAME))
}

/// Reads the config file. `Ok(None)` when it does not exist.
pub fn load(path: &Path) -> anyhow::Result<Option<SyncConfig>> {
    let content = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => {
            return Err(err).with_context(|| format!("reading config from {}", path.display()))
        }
    };
    let config = ron::from_str(&content)
        .with_context(|| format!("parsing config from {}", path.display()))?;
    Ok(Some(config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn missing_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = load(&dir.path().join("absent.ron")).unwrap();
        assert_eq!(loaded, None);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        fs::write(
            &path,
            r#"(
                base_url: "http://media.local:8080",
                jobs: [(job_id: "kinox-series", provider: "kinox", mode: Series)],
                poll_short_ms: 500,
                log: Both,
            )"#,
        )
        .unwrap();

        let config = load(&path).unwrap().unwrap();
        assert_eq!(config.base_url, "http://media.local:8080");
        assert_eq!(config.jobs.len(), 1);
        assert_eq!(config.jobs[0].mode, JobKind::Series);
        assert_eq!(config.log, LogDestination::Both);
        assert_eq!(config.poll_long_ms, 8_000);

        let sync = config.sync_settings();
        assert_eq!(sync.poll.short, Duration::from_millis(500));
        assert_eq!(sync.page_size, 100);
    }

    #[test]
    fn invalid_file_reports_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        fs::write(&path, "(base_url: 12,").unwrap();
        assert!(load(&path).is_err());
    }

    #[test]
    fn defaults_match_core_and_engine_defaults() {
        let config = SyncConfig::default();
        assert_eq!(config.sync_settings(), SyncSettings::default());
        assert_eq!(config.api_settings(), ApiSettings::default());
        assert_eq!(JobMode::from(config.jobs[2].mode), JobMode::Series);
    }

    #[test]
    fn first_argument_overrides_default_path() {
        assert_eq!(resolve_path(None), PathBuf::from("catalog_sync.ron"));
        assert_eq!(
            resolve_path(Some("/etc/sync.ron".to_string())),
            PathBuf::from("/etc/sync.ron")
        );
    }
}

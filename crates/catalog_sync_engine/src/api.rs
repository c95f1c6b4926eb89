use std::time::Duration;

use catalog_sync_core::{
    CatalogItem, ItemId, JobStartPayload, JobStartReply, RawStatusMap, RuntimeEntry,
    SettingsSavePayload, SettingsSnapshot,
};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::Deserialize;
use serde_json::{json, Value};
use sync_logging::{clip_for_log, sync_debug, sync_trace};
use url::Url;

use crate::{ApiError, FailureKind};

/// Endpoint paths relative to the base url.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiPaths {
    pub status: String,
    /// Prefix; the provider name is appended as the last path segment.
    pub start: String,
    pub start_all: String,
    pub search: String,
    pub catalog: String,
    pub runtimes: String,
    pub settings: String,
}

impl Default for ApiPaths {
    fn default() -> Self {
        Self {
            status: "/api/scrape/status".to_string(),
            start: "/api/scrape".to_string(),
            start_all: "/api/scrape/all".to_string(),
            search: "/api/search".to_string(),
            catalog: "/api/movies".to_string(),
            runtimes: "/api/movies/runtime".to_string(),
            settings: "/api/settings".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiSettings {
    pub base_url: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub paths: ApiPaths,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000".to_string(),
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(20),
            paths: ApiPaths::default(),
        }
    }
}

/// The backend as seen by the engine. One call per endpoint; every reply is
/// decoded into core types before it leaves the implementation.
#[async_trait::async_trait]
pub trait CatalogApi: Send + Sync {
    async fn fetch_status(&self) -> Result<RawStatusMap, ApiError>;

    async fn start_job(
        &self,
        provider: &str,
        payload: &JobStartPayload,
    ) -> Result<JobStartReply, ApiError>;

    async fn start_all(&self) -> Result<JobStartReply, ApiError>;

    async fn search(&self, query: &str) -> Result<Vec<CatalogItem>, ApiError>;

    async fn fetch_catalog(&self) -> Result<Vec<CatalogItem>, ApiError>;

    async fn fetch_runtimes(&self, ids: &[ItemId]) -> Result<Vec<RuntimeEntry>, ApiError>;

    async fn load_settings(&self) -> Result<SettingsSnapshot, ApiError>;

    async fn save_settings(
        &self,
        payload: &SettingsSavePayload,
    ) -> Result<SettingsSnapshot, ApiError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestCatalogApi {
    base: Url,
    paths: ApiPaths,
    client: reqwest::Client,
}

impl ReqwestCatalogApi {
    pub fn new(settings: ApiSettings) -> Result<Self, ApiError> {
        let mut base = Url::parse(settings.base_url.trim())
            .map_err(|err| ApiError::new(FailureKind::InvalidUrl, err.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(ApiError::new(
                FailureKind::InvalidUrl,
                format!("{base} cannot be used as a base url"),
            ));
        }
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| ApiError::new(FailureKind::Network, err.to_string()))?;

        Ok(Self {
            base,
            paths: settings.paths,
            client,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.base
            .join(path.trim_start_matches('/'))
            .map_err(|err| ApiError::new(FailureKind::InvalidUrl, err.to_string()))
    }

    fn provider_endpoint(&self, provider: &str) -> Result<Url, ApiError> {
        let mut url = self.endpoint(&self.paths.start)?;
        url.path_segments_mut()
            .map_err(|_| ApiError::new(FailureKind::InvalidUrl, "start path has no segments"))?
            .pop_if_empty()
            .push(provider);
        Ok(url)
    }

    async fn get_json(&self, url: Url) -> Result<Value, ApiError> {
        sync_trace!("GET {}", url);
        let response = self
            .client
            .get(url)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(map_reqwest_error)?;
        read_json(response).await
    }

    async fn post_json(&self, url: Url, body: &Value) -> Result<Value, ApiError> {
        sync_trace!("POST {}", url);
        let bytes = serde_json::to_vec(body)
            .map_err(|err| ApiError::new(FailureKind::Decode, err.to_string()))?;
        let response = self
            .client
            .post(url)
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json")
            .body(bytes)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        read_json(response).await
    }
}

#[async_trait::async_trait]
impl CatalogApi for ReqwestCatalogApi {
    async fn fetch_status(&self) -> Result<RawStatusMap, ApiError> {
        let body = self.get_json(self.endpoint(&self.paths.status)?).await?;
        body.get("status")
            .and_then(Value::as_object)
            .cloned()
            .ok_or_else(|| ApiError::new(FailureKind::Decode, "status reply has no status map"))
    }

    async fn start_job(
        &self,
        provider: &str,
        payload: &JobStartPayload,
    ) -> Result<JobStartReply, ApiError> {
        let url = self.provider_endpoint(provider)?;
        let body = self.post_json(url, &payload.to_json()).await?;
        Ok(decode_start_reply(&body))
    }

    async fn start_all(&self) -> Result<JobStartReply, ApiError> {
        let url = self.endpoint(&self.paths.start_all)?;
        let body = self.post_json(url, &json!({})).await?;
        Ok(decode_start_reply(&body))
    }

    async fn search(&self, query: &str) -> Result<Vec<CatalogItem>, ApiError> {
        let mut url = self.endpoint(&self.paths.search)?;
        url.query_pairs_mut().append_pair("q", query);
        sync_debug!("Searching for '{}'", clip_for_log(query, 40));
        let body = self.get_json(url).await?;
        let results = body.get("results").cloned().unwrap_or(Value::Array(Vec::new()));
        decode(results, "search results")
    }

    async fn fetch_catalog(&self) -> Result<Vec<CatalogItem>, ApiError> {
        let body = self.get_json(self.endpoint(&self.paths.catalog)?).await?;
        let items = match body {
            Value::Array(items) => Value::Array(items),
            Value::Object(mut fields) => ["movies", "items", "results"]
                .iter()
                .find_map(|key| fields.remove(*key))
                .ok_or_else(|| {
                    ApiError::new(FailureKind::Decode, "catalog reply has no item list")
                })?,
            _ => {
                return Err(ApiError::new(
                    FailureKind::Decode,
                    "catalog reply is not a list",
                ))
            }
        };
        decode(items, "catalog")
    }

    async fn fetch_runtimes(&self, ids: &[ItemId]) -> Result<Vec<RuntimeEntry>, ApiError> {
        #[derive(Deserialize)]
        struct RuntimeReply {
            #[serde(default)]
            items: Vec<RuntimeEntry>,
        }

        let url = self.endpoint(&self.paths.runtimes)?;
        let body = self.post_json(url, &json!({ "movie_ids": ids })).await?;
        let reply: RuntimeReply = decode(body, "runtime batch")?;
        Ok(reply.items)
    }

    async fn load_settings(&self) -> Result<SettingsSnapshot, ApiError> {
        let body = self.get_json(self.endpoint(&self.paths.settings)?).await?;
        Ok(SettingsSnapshot::from_value(&body))
    }

    async fn save_settings(
        &self,
        payload: &SettingsSavePayload,
    ) -> Result<SettingsSnapshot, ApiError> {
        let url = self.endpoint(&self.paths.settings)?;
        let body = self.post_json(url, &payload.to_json()).await?;
        Ok(SettingsSnapshot::from_value(&body))
    }
}

async fn read_json(response: reqwest::Response) -> Result<Value, ApiError> {
    let status = response.status();
    let bytes = response.bytes().await.map_err(map_reqwest_error)?;
    let body: Option<Value> = serde_json::from_slice(&bytes).ok();

    if !status.is_success() {
        let message = body
            .as_ref()
            .and_then(server_message)
            .unwrap_or_else(|| status.to_string());
        return Err(ApiError::new(FailureKind::HttpStatus(status.as_u16()), message));
    }

    let body = body.ok_or_else(|| ApiError::new(FailureKind::Decode, "response is not JSON"))?;
    if body.get("success").and_then(Value::as_bool) == Some(false) {
        let message = server_message(&body).unwrap_or_else(|| "request rejected".to_string());
        return Err(ApiError::new(FailureKind::Rejected, message));
    }
    Ok(body)
}

/// Human-readable reason from a `{message}`, `{error}` or `{errors: {..}}` body.
fn server_message(body: &Value) -> Option<String> {
    for key in ["message", "error"] {
        if let Some(text) = body.get(key).and_then(Value::as_str) {
            if !text.trim().is_empty() {
                return Some(text.trim().to_string());
            }
        }
    }
    let errors = body.get("errors")?.as_object()?;
    let joined = errors
        .values()
        .filter_map(Value::as_str)
        .collect::<Vec<_>>()
        .join(" ");
    (!joined.is_empty()).then_some(joined)
}

fn decode_start_reply(body: &Value) -> JobStartReply {
    JobStartReply {
        status: body
            .get("status")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default(),
        started_any: body
            .get("started_any")
            .and_then(Value::as_bool)
            .unwrap_or(false),
        message: body
            .get("message")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(str::to_string),
    }
}

fn decode<T: serde::de::DeserializeOwned>(value: Value, what: &str) -> Result<T, ApiError> {
    serde_json::from_value(value)
        .map_err(|err| ApiError::new(FailureKind::Decode, format!("{what}: {err}")))
}

fn map_reqwest_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        return ApiError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_decode() {
        return ApiError::new(FailureKind::Decode, err.to_string());
    }
    ApiError::new(FailureKind::Network, err.to_string())
}

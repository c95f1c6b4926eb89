//! Catalog sync engine: backend calls, timers and cancellation on a tokio
//! runtime, reported back as events.
mod api;
mod engine;
mod types;

pub use api::{ApiPaths, ApiSettings, CatalogApi, ReqwestCatalogApi};
pub use engine::EngineHandle;
pub use types::{ApiError, EngineEvent, FailureKind};

//! Point-in-time detail requests for a single deployment

use crate::config::{join_segments, WatchConfig};
use crate::error::{TransportError, TransportResult};
use flinkwatch_core::ResourceKey;
use reqwest::header::ACCEPT;
use reqwest::{Client, Url};
use std::str::FromStr;
use tracing::debug;

/// Detail views served under `/api/deployments/{namespace}/{name}/`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Detail {
    /// Kubernetes events of the deployment
    Events,
    /// Job checkpoint history from the Flink REST API
    Checkpoints,
    /// Checkpoints found in checkpoint storage
    StorageCheckpoints,
    /// Job exception history
    Exceptions,
}

impl Detail {
    pub const ALL: [Detail; 4] = [
        Detail::Events,
        Detail::Checkpoints,
        Detail::StorageCheckpoints,
        Detail::Exceptions,
    ];

    pub fn path_segment(&self) -> &'static str {
        match self {
            Detail::Events => "events",
            Detail::Checkpoints => "checkpoints",
            Detail::StorageCheckpoints => "storage-checkpoints",
            Detail::Exceptions => "exceptions",
        }
    }
}

impl std::fmt::Display for Detail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.path_segment())
    }
}

impl FromStr for Detail {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "events" => Ok(Detail::Events),
            "checkpoints" => Ok(Detail::Checkpoints),
            "storage" | "storage-checkpoints" => Ok(Detail::StorageCheckpoints),
            "exceptions" => Ok(Detail::Exceptions),
            other => Err(format!(
                "unknown detail '{}', expected events, checkpoints, storage or exceptions",
                other
            )),
        }
    }
}

/// Fetches detail views as raw JSON
#[derive(Debug, Clone)]
pub struct DetailClient {
    client: Client,
    base: Url,
}

impl DetailClient {
    pub fn new(config: &WatchConfig) -> TransportResult<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout())
            .build()?;

        Ok(Self {
            client,
            base: config.base()?,
        })
    }

    /// URL of `detail` for the deployment `key`
    pub fn url(&self, detail: Detail, key: &ResourceKey) -> TransportResult<Url> {
        join_segments(
            self.base.clone(),
            [
                "api",
                "deployments",
                key.namespace.as_str(),
                key.name.as_str(),
                detail.path_segment(),
            ],
        )
    }

    pub async fn fetch(&self, detail: Detail, key: &ResourceKey) -> TransportResult<serde_json::Value> {
        let url = self.url(detail, key)?;
        debug!(url = %url, "Fetching {}", detail);

        let response = self
            .client
            .get(url)
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let reason = response
                .text()
                .await
                .ok()
                .map(|body| body.trim().to_string())
                .filter(|body| !body.is_empty())
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown").to_string());
            return Err(TransportError::Status {
                status: status.as_u16(),
                reason,
            });
        }

        response
            .json()
            .await
            .map_err(|e| TransportError::InvalidResponse(e.to_string()))
    }
}

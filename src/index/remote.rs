//! HTTP client for the backing vector index service.
//!
//! The control plane (list/create/describe indexes) lives at the
//! configured base URL; the data plane (upsert/query) lives at the host
//! reported by the index description. [`RemoteVectorIndex::ensure`] is
//! the idempotent provisioning entry point: an existing index is reused,
//! a missing one is created and polled until it reports ready.
//!
//! Provisioning is best-effort single-creator: two processes racing on
//! create are resolved by the service rejecting the duplicate name, after
//! which the loser falls through to the describe loop.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use crate::config::IndexConfig;
use crate::models::{EntryMetadata, IndexEntry, SearchHit};

use super::VectorIndex;

/// Environment variable holding the vector index API key.
pub const API_KEY_ENV: &str = "VECTOR_INDEX_API_KEY";

pub struct RemoteVectorIndex {
    data_url: String,
    api_key: String,
    max_retries: u32,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct IndexList {
    #[serde(default)]
    indexes: Vec<IndexDescription>,
}

#[derive(Debug, Deserialize)]
struct IndexDescription {
    name: String,
    #[serde(default)]
    host: Option<String>,
    #[serde(default)]
    status: IndexStatus,
}

#[derive(Debug, Default, Deserialize)]
struct IndexStatus {
    #[serde(default)]
    ready: bool,
}

#[derive(Serialize)]
struct CreateIndexRequest<'a> {
    name: &'a str,
    dimension: usize,
    metric: &'a str,
}

#[derive(Serialize)]
struct UpsertRequest<'a> {
    vectors: Vec<VectorPayload<'a>>,
    namespace: &'a str,
}

#[derive(Serialize)]
struct VectorPayload<'a> {
    id: &'a str,
    values: &'a [f32],
    metadata: &'a EntryMetadata,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Debug, Deserialize)]
struct QueryMatch {
    id: String,
    score: f32,
    metadata: EntryMetadata,
}

impl RemoteVectorIndex {
    /// Returns a handle to the named index, creating it first if needed.
    ///
    /// Creation blocks until the index reports ready, bounded by
    /// `ready_timeout_secs`.
    pub async fn ensure(config: &IndexConfig) -> Result<Self> {
        let api_key = std::env::var(API_KEY_ENV)
            .map_err(|_| anyhow::anyhow!("{} environment variable not set", API_KEY_ENV))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        let control_url = config.url.trim_end_matches('/').to_string();

        let list: IndexList = call(
            &client,
            &api_key,
            config.max_retries,
            Method::GET,
            &format!("{}/indexes", control_url),
            None,
        )
        .await
        .context("failed to list vector indexes")?;

        let exists = list.indexes.iter().any(|idx| idx.name == config.name);

        if !exists {
            tracing::info!(index = %config.name, dimension = config.dimension, "creating vector index");
            let request = CreateIndexRequest {
                name: &config.name,
                dimension: config.dimension,
                metric: &config.metric,
            };
            let body = serde_json::to_value(&request)?;
            // A conflict means another creator won the race; fall through
            // to the readiness poll either way.
            if let Err(e) = call::<serde_json::Value>(
                &client,
                &api_key,
                config.max_retries,
                Method::POST,
                &format!("{}/indexes", control_url),
                Some(&body),
            )
            .await
            {
                if !e.to_string().contains("409") {
                    return Err(e.context("failed to create vector index"));
                }
                tracing::warn!(index = %config.name, "index already being created elsewhere");
            }
        } else {
            tracing::info!(index = %config.name, "vector index already exists");
        }

        let host = wait_until_ready(&client, &api_key, config, &control_url).await?;
        let data_url = if host.starts_with("http://") || host.starts_with("https://") {
            host
        } else {
            format!("https://{}", host)
        };

        Ok(Self {
            data_url,
            api_key,
            max_retries: config.max_retries,
            client,
        })
    }
}

async fn wait_until_ready(
    client: &reqwest::Client,
    api_key: &str,
    config: &IndexConfig,
    control_url: &str,
) -> Result<String> {
    let describe_url = format!("{}/indexes/{}", control_url, config.name);
    let deadline = Instant::now() + Duration::from_secs(config.ready_timeout_secs);

    loop {
        let desc: IndexDescription = call(
            client,
            api_key,
            config.max_retries,
            Method::GET,
            &describe_url,
            None,
        )
        .await
        .context("failed to describe vector index")?;

        if desc.status.ready {
            return desc
                .host
                .ok_or_else(|| anyhow::anyhow!("index {} is ready but reports no host", config.name));
        }

        if Instant::now() >= deadline {
            bail!(
                "index {} did not become ready within {}s",
                config.name,
                config.ready_timeout_secs
            );
        }

        tokio::time::sleep(Duration::from_secs(config.ready_poll_secs)).await;
    }
}

/// Issues one JSON request with the standard retry discipline:
/// 429/5xx and transport errors retry with exponential backoff, other
/// client errors fail immediately.
async fn call<T: DeserializeOwned>(
    client: &reqwest::Client,
    api_key: &str,
    max_retries: u32,
    method: Method,
    url: &str,
    body: Option<&serde_json::Value>,
) -> Result<T> {
    let mut last_err = None;

    for attempt in 0..=max_retries {
        if attempt > 0 {
            let delay = Duration::from_secs(1 << (attempt - 1).min(5));
            tokio::time::sleep(delay).await;
        }

        let mut request = client
            .request(method.clone(), url)
            .header("Api-Key", api_key)
            .header("Content-Type", "application/json");
        if let Some(json) = body {
            request = request.json(json);
        }

        match request.send().await {
            Ok(response) => {
                let status = response.status();

                if status.is_success() {
                    return response
                        .json::<T>()
                        .await
                        .context("failed to parse vector index response");
                }

                if status.as_u16() == 429 || status.is_server_error() {
                    let body_text = response.text().await.unwrap_or_default();
                    last_err = Some(anyhow::anyhow!(
                        "Vector index API error {}: {}",
                        status,
                        body_text
                    ));
                    continue;
                }

                let body_text = response.text().await.unwrap_or_default();
                bail!("Vector index API error {}: {}", status, body_text);
            }
            Err(e) => {
                last_err = Some(e.into());
                continue;
            }
        }
    }

    Err(last_err.unwrap_or_else(|| anyhow::anyhow!("Vector index request failed after retries")))
}

#[async_trait]
impl VectorIndex for RemoteVectorIndex {
    async fn upsert(&self, entries: &[IndexEntry], namespace: &str) -> Result<()> {
        let request = UpsertRequest {
            vectors: entries
                .iter()
                .map(|entry| VectorPayload {
                    id: &entry.id,
                    values: &entry.values,
                    metadata: &entry.metadata,
                })
                .collect(),
            namespace,
        };
        let body = serde_json::to_value(&request)?;

        let _: serde_json::Value = call(
            &self.client,
            &self.api_key,
            self.max_retries,
            Method::POST,
            &format!("{}/vectors/upsert", self.data_url),
            Some(&body),
        )
        .await?;

        Ok(())
    }

    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        namespace: &str,
    ) -> Result<Vec<SearchHit>> {
        let body = serde_json::json!({
            "vector": vector,
            "topK": top_k,
            "namespace": namespace,
            "includeMetadata": true,
        });

        let response: QueryResponse = call(
            &self.client,
            &self.api_key,
            self.max_retries,
            Method::POST,
            &format!("{}/query", self.data_url),
            Some(&body),
        )
        .await?;

        Ok(response
            .matches
            .into_iter()
            .map(|m| SearchHit {
                id: m.id,
                score: m.score,
                metadata: m.metadata,
            })
            .collect())
    }
}

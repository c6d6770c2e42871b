use crate::domain::model::Bug;
use crate::domain::ports::BugSource;
use crate::utils::error::{MinerError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_CHUNK_SIZE: usize = 100;

#[derive(Debug, Deserialize)]
struct BugsResponse {
    #[serde(default)]
    bugs: Vec<Bug>,
}

/// Bugzilla REST client (`/rest/bug`).
pub struct BugzillaClient {
    base_url: String,
    api_key: Option<String>,
    chunk_size: usize,
    timeout: Option<Duration>,
    client: Client,
}

impl BugzillaClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
            timeout: None,
            client: Client::new(),
        }
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.filter(|key| !key.is_empty());
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    async fn fetch_chunk(&self, ids: &[u64]) -> Result<Vec<Bug>> {
        let id_list = ids
            .iter()
            .map(u64::to_string)
            .collect::<Vec<_>>()
            .join(",");

        let mut request = self
            .client
            .get(format!("{}/rest/bug", self.base_url))
            .query(&[("id", id_list.as_str())]);

        if let Some(api_key) = &self.api_key {
            request = request.header("X-BUGZILLA-API-KEY", api_key);
        }
        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }

        tracing::debug!("Fetching {} bugs from {}", ids.len(), self.base_url);
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(MinerError::SourceError {
                source_name: "bugzilla".to_string(),
                message: format!("HTTP {} for ids {}", status, id_list),
            });
        }

        let body: BugsResponse = response.json().await?;
        Ok(body.bugs)
    }
}

#[async_trait]
impl BugSource for BugzillaClient {
    async fn bugs(&self, ids: &[u64]) -> Result<Vec<Bug>> {
        let mut bugs = Vec::with_capacity(ids.len());
        for chunk in ids.chunks(self.chunk_size) {
            bugs.extend(self.fetch_chunk(chunk).await?);
        }
        tracing::info!("Fetched {} of {} requested bugs", bugs.len(), ids.len());
        Ok(bugs)
    }

    async fn all_bugs(&self) -> Result<Vec<Bug>> {
        Err(MinerError::ConfigError {
            message: "The bug tracker API cannot list every bug; use a bug database file"
                .to_string(),
        })
    }
}

use crate::domain::model::Revision;
use crate::domain::ports::ReviewSource;
use crate::utils::error::{MinerError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct ConduitResponse {
    result: Option<SearchResult>,
    error_code: Option<String>,
    error_info: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    #[serde(default)]
    data: Vec<RevisionData>,
    cursor: Option<Cursor>,
}

#[derive(Debug, Deserialize)]
struct Cursor {
    after: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RevisionData {
    id: u64,
    fields: RevisionFields,
}

#[derive(Debug, Deserialize)]
struct RevisionFields {
    #[serde(default)]
    title: String,
    status: RevisionStatus,
}

#[derive(Debug, Deserialize)]
struct RevisionStatus {
    value: String,
}

/// Conduit's maximum page size for search endpoints.
const PAGE_LIMIT: usize = 100;

/// Conduit client for `differential.revision.search`, authenticated by an
/// API token.
pub struct PhabricatorClient {
    base_url: String,
    api_token: String,
    client: Client,
}

impl PhabricatorClient {
    pub fn new(base_url: impl Into<String>, api_token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_token: api_token.into(),
            client: Client::new(),
        }
    }

    async fn search_page(&self, ids: &[u64], after: Option<&str>) -> Result<SearchResult> {
        let mut form: Vec<(String, String)> = vec![("api.token".to_string(), self.api_token.clone())];
        if let Some(after) = after {
            form.push(("after".to_string(), after.to_string()));
        }
        for (index, id) in ids.iter().enumerate() {
            form.push((format!("constraints[ids][{}]", index), id.to_string()));
        }
        form.push(("limit".to_string(), PAGE_LIMIT.to_string()));

        let response = self
            .client
            .post(format!("{}/api/differential.revision.search", self.base_url))
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(MinerError::SourceError {
                source_name: "phabricator".to_string(),
                message: format!("HTTP {}", status),
            });
        }

        let body: ConduitResponse = response.json().await?;
        if let Some(code) = body.error_code {
            return Err(MinerError::SourceError {
                source_name: "phabricator".to_string(),
                message: format!("{}: {}", code, body.error_info.unwrap_or_default()),
            });
        }

        Ok(body.result.unwrap_or(SearchResult {
            data: Vec::new(),
            cursor: None,
        }))
    }
}

#[async_trait]
impl ReviewSource for PhabricatorClient {
    /// Follows the result cursor until Conduit reports no further page.
    async fn revisions(&self, ids: &[u64]) -> Result<Vec<Revision>> {
        let mut revisions = Vec::with_capacity(ids.len());
        if ids.is_empty() {
            return Ok(revisions);
        }

        let mut after: Option<String> = None;
        loop {
            let page = self.search_page(ids, after.as_deref()).await?;
            revisions.extend(page.data.into_iter().map(|data| Revision {
                id: data.id,
                title: data.fields.title,
                status: data.fields.status.value,
            }));

            match page.cursor.and_then(|cursor| cursor.after) {
                Some(next) if after.as_deref() != Some(next.as_str()) => after = Some(next),
                _ => break,
            }
        }

        tracing::debug!("Fetched {} of {} requested revisions", revisions.len(), ids.len());
        Ok(revisions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[tokio::test]
    async fn test_search_revisions() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/api/differential.revision.search")
                .body_contains("api.token=api-abc");
            then.status(200).json_body(serde_json::json!({
                "result": {
                    "data": [
                        {"id": 42, "fields": {"title": "Fix cache", "status": {"value": "published"}}}
                    ]
                },
                "error_code": null,
                "error_info": null
            }));
        });

        let client = PhabricatorClient::new(server.base_url(), "api-abc");
        let revisions = client.revisions(&[42]).await.unwrap();

        mock.assert();
        assert_eq!(
            revisions,
            vec![Revision {
                id: 42,
                title: "Fix cache".to_string(),
                status: "published".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn test_follows_cursor_across_pages() {
        let server = MockServer::start();
        let first_page = server.mock(|when, then| {
            when.method(POST)
                .path("/api/differential.revision.search")
                .body_matches(regex::Regex::new(r"^api\.token=tok&constraints").unwrap());
            then.status(200).json_body(serde_json::json!({
                "result": {
                    "data": [
                        {"id": 1, "fields": {"title": "One", "status": {"value": "published"}}}
                    ],
                    "cursor": {"limit": 100, "after": "1", "before": null}
                },
                "error_code": null,
                "error_info": null
            }));
        });
        let second_page = server.mock(|when, then| {
            when.method(POST)
                .path("/api/differential.revision.search")
                .body_contains("after=1");
            then.status(200).json_body(serde_json::json!({
                "result": {
                    "data": [
                        {"id": 150, "fields": {"title": "Last", "status": {"value": "abandoned"}}}
                    ],
                    "cursor": {"limit": 100, "after": null, "before": "1"}
                },
                "error_code": null,
                "error_info": null
            }));
        });

        let ids: Vec<u64> = (1..=150).collect();
        let client = PhabricatorClient::new(server.base_url(), "tok");
        let revisions = client.revisions(&ids).await.unwrap();

        first_page.assert_hits(1);
        second_page.assert_hits(1);
        let statuses: Vec<(u64, &str)> = revisions
            .iter()
            .map(|r| (r.id, r.status.as_str()))
            .collect();
        assert_eq!(statuses, vec![(1, "published"), (150, "abandoned")]);
    }

    #[tokio::test]
    async fn test_conduit_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/api/differential.revision.search");
            then.status(200).json_body(serde_json::json!({
                "result": null,
                "error_code": "ERR-INVALID-AUTH",
                "error_info": "API token is invalid."
            }));
        });

        let client = PhabricatorClient::new(server.base_url(), "bad");
        let err = client.revisions(&[1]).await.unwrap_err();
        assert!(err.to_string().contains("ERR-INVALID-AUTH"));
    }

    #[tokio::test]
    async fn test_no_ids_no_request() {
        let client = PhabricatorClient::new("http://127.0.0.1:9", "token");
        assert!(client.revisions(&[]).await.unwrap().is_empty());
    }
}

use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

use nudge_core::transport_helpers::{
    is_retryable_status, is_retryable_transport_error, parse_retry_after, retry_delay,
    truncate_for_error,
};
use nudge_core::{GithubIssue, GithubIssueComment};

use super::RepoRef;

#[derive(Debug, Clone, Deserialize)]
pub(super) struct GithubCommentCreateResponse {
    pub(super) id: u64,
}

#[derive(Clone)]
pub(super) struct GithubApiClient {
    http: reqwest::Client,
    api_base: String,
    repo: RepoRef,
    retry_max_attempts: usize,
    retry_base_delay_ms: u64,
}

impl GithubApiClient {
    pub(super) fn new(
        api_base: String,
        token: String,
        repo: RepoRef,
        request_timeout_ms: u64,
        retry_max_attempts: usize,
        retry_base_delay_ms: u64,
    ) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::USER_AGENT,
            reqwest::header::HeaderValue::from_static("nudge-reminder-bridge"),
        );
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "x-github-api-version",
            reqwest::header::HeaderValue::from_static("2022-11-28"),
        );
        let auth_header = format!("Bearer {}", token.trim());
        headers.insert(
            reqwest::header::AUTHORIZATION,
            reqwest::header::HeaderValue::from_str(&auth_header)
                .context("invalid github authorization header")?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(request_timeout_ms.max(1)))
            .build()
            .context("failed to create github api client")?;
        Ok(Self {
            http: client,
            api_base: api_base.trim_end_matches('/').to_string(),
            repo,
            retry_max_attempts: retry_max_attempts.max(1),
            retry_base_delay_ms: retry_base_delay_ms.max(1),
        })
    }

    /// Resolve the login behind the configured token.
    pub(super) async fn resolve_bot_login(&self) -> Result<String> {
        #[derive(Deserialize)]
        struct Viewer {
            login: String,
        }

        let viewer: Viewer = self
            .request_json("resolve bot login", || {
                self.http.get(format!("{}/user", self.api_base))
            })
            .await?;
        Ok(viewer.login)
    }

    /// List issues in any state, optionally bounded to those updated since
    /// the cursor. Pull-request rows are returned as-is; the candidate
    /// filter excludes them.
    pub(super) async fn list_issues(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<GithubIssue>> {
        let since_value = since.map(|cursor| cursor.to_rfc3339_opts(SecondsFormat::Secs, true));
        let mut page = 1_u32;
        let mut rows = Vec::new();
        loop {
            let page_value = page.to_string();
            let chunk: Vec<GithubIssue> = self
                .request_json("list issues", || {
                    let mut request = self.http.get(format!(
                        "{}/repos/{}/{}/issues",
                        self.api_base, self.repo.owner, self.repo.name
                    ));
                    request = request.query(&[
                        ("state", "all"),
                        ("sort", "updated"),
                        ("direction", "asc"),
                        ("per_page", "100"),
                        ("page", page_value.as_str()),
                    ]);
                    if let Some(since_value) = since_value.as_deref() {
                        request = request.query(&[("since", since_value)]);
                    }
                    request
                })
                .await?;
            let chunk_len = chunk.len();
            rows.extend(chunk);
            if chunk_len < 100 {
                break;
            }
            page = page.saturating_add(1);
        }
        Ok(rows)
    }

    /// List an issue's comments in ascending creation order.
    pub(super) async fn list_issue_comments(
        &self,
        issue_number: u64,
    ) -> Result<Vec<GithubIssueComment>> {
        let mut page = 1_u32;
        let mut rows = Vec::new();
        loop {
            let page_value = page.to_string();
            let chunk: Vec<GithubIssueComment> = self
                .request_json("list issue comments", || {
                    self.http
                        .get(format!(
                            "{}/repos/{}/{}/issues/{}/comments",
                            self.api_base, self.repo.owner, self.repo.name, issue_number
                        ))
                        .query(&[
                            ("sort", "created"),
                            ("direction", "asc"),
                            ("per_page", "100"),
                            ("page", page_value.as_str()),
                        ])
                })
                .await?;
            let chunk_len = chunk.len();
            rows.extend(chunk);
            if chunk_len < 100 {
                break;
            }
            page = page.saturating_add(1);
        }
        Ok(rows)
    }

    pub(super) async fn create_issue_comment(
        &self,
        issue_number: u64,
        body: &str,
    ) -> Result<GithubCommentCreateResponse> {
        let payload = json!({ "body": body });
        self.request_json("create issue comment", || {
            self.http
                .post(format!(
                    "{}/repos/{}/{}/issues/{}/comments",
                    self.api_base, self.repo.owner, self.repo.name, issue_number
                ))
                .json(&payload)
        })
        .await
    }

    async fn request_json<T, F>(&self, operation: &str, mut request_builder: F) -> Result<T>
    where
        T: DeserializeOwned,
        F: FnMut() -> reqwest::RequestBuilder,
    {
        let mut attempt = 0_usize;
        loop {
            attempt = attempt.saturating_add(1);
            let response = request_builder().send().await;
            match response {
                Ok(response) => {
                    let status = response.status();
                    tracing::debug!(
                        "github api {operation}: status={} attempt={attempt}",
                        status.as_u16()
                    );
                    if status.is_success() {
                        let parsed = response
                            .json::<T>()
                            .await
                            .with_context(|| format!("failed to decode github {operation}"))?;
                        return Ok(parsed);
                    }

                    let retry_after = parse_retry_after(response.headers());
                    let body = response.text().await.unwrap_or_default();
                    if attempt < self.retry_max_attempts && is_retryable_status(status.as_u16()) {
                        tokio::time::sleep(retry_delay(
                            self.retry_base_delay_ms,
                            attempt,
                            retry_after,
                        ))
                        .await;
                        continue;
                    }

                    bail!(
                        "github api {operation} failed with status {}: {}",
                        status.as_u16(),
                        truncate_for_error(&body, 800)
                    );
                }
                Err(error) => {
                    if attempt < self.retry_max_attempts && is_retryable_transport_error(&error) {
                        tokio::time::sleep(retry_delay(self.retry_base_delay_ms, attempt, None))
                            .await;
                        continue;
                    }
                    return Err(error)
                        .with_context(|| format!("github api {operation} request failed"));
                }
            }
        }
    }
}

//! Reminder bridge runtime: polling, command dispatch, and comment posting.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use tracing::{debug, info, warn};

use nudge_core::{build_watch_labels, is_candidate_issue, parse_reminder_command, ReminderCommand};
use nudge_scheduler::{schedule_reminder, ExpiringKeyStore, ExpiryHandler, ReminderPayload};

mod github_api_client;

use github_api_client::GithubApiClient;

/// Follow-up posted when a reminder key expires.
const REMINDER_BODY: &str = "Reminding you about this :)";

#[derive(Clone)]
/// Immutable configuration for the reminder bridge poll loop.
pub struct ReminderBridgeConfig {
    pub repo_slug: String,
    pub api_base: String,
    pub token: String,
    /// Resolved via the token's `/user` identity when omitted.
    pub bot_login: Option<String>,
    pub watch_labels: Vec<String>,
    pub poll_interval: Duration,
    pub poll_once: bool,
    pub request_timeout_ms: u64,
    pub retry_max_attempts: usize,
    pub retry_base_delay_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RepoRef {
    owner: String,
    name: String,
}

impl RepoRef {
    fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        let (owner, name) = trimmed
            .split_once('/')
            .ok_or_else(|| anyhow!("invalid --repo '{raw}', expected owner/repo"))?;
        let owner = owner.trim();
        let name = name.trim();
        if owner.is_empty() || name.is_empty() || name.contains('/') {
            bail!("invalid --repo '{raw}', expected owner/repo");
        }
        Ok(Self {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }

    fn as_slug(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
/// Per-cycle accounting, logged after every tick.
pub struct PollCycleReport {
    pub fetched_issues: usize,
    pub candidate_issues: usize,
    pub scheduled_reminders: usize,
    pub failed_issues: usize,
}

/// The poll loop orchestrator. Owns the cursor; one instance drives one
/// repository until the process exits.
pub struct ReminderBridgeRuntime {
    config: ReminderBridgeConfig,
    repo: RepoRef,
    github_client: GithubApiClient,
    store: Arc<dyn ExpiringKeyStore>,
    watch_labels: HashSet<String>,
    bot_login: String,
    since: Option<DateTime<Utc>>,
}

impl std::fmt::Debug for ReminderBridgeRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReminderBridgeRuntime")
            .field("repo", &self.repo)
            .field("watch_labels", &self.watch_labels)
            .field("bot_login", &self.bot_login)
            .field("since", &self.since)
            .finish_non_exhaustive()
    }
}

impl ReminderBridgeRuntime {
    pub async fn new(
        config: ReminderBridgeConfig,
        store: Arc<dyn ExpiringKeyStore>,
    ) -> Result<Self> {
        let repo = RepoRef::parse(&config.repo_slug)?;
        let github_client = GithubApiClient::new(
            config.api_base.clone(),
            config.token.clone(),
            repo.clone(),
            config.request_timeout_ms,
            config.retry_max_attempts,
            config.retry_base_delay_ms,
        )?;
        let bot_login = match config.bot_login.clone() {
            Some(login) if !login.trim().is_empty() => login.trim().to_string(),
            _ => github_client.resolve_bot_login().await?,
        };
        let watch_labels =
            build_watch_labels(config.watch_labels.iter().map(|label| label.as_str()));
        if watch_labels.is_empty() {
            bail!("at least one watch label is required");
        }
        Ok(Self {
            config,
            repo,
            github_client,
            store,
            watch_labels,
            bot_login,
            since: None,
        })
    }

    /// Handler for the store's expiry listener; posts the reminder comment.
    pub fn reminder_sender(&self) -> Arc<dyn ExpiryHandler> {
        Arc::new(ReminderSender {
            github_client: self.github_client.clone(),
        })
    }

    /// Run poll cycles until shutdown (or once, with `poll_once`). Cycles
    /// are serialized: the next sleep starts only after the current cycle's
    /// work has completed.
    pub async fn run(&mut self) -> Result<()> {
        loop {
            match self.poll_once().await {
                Ok(report) => {
                    info!(
                        "reminder poll: repo={} fetched={} candidates={} scheduled={} failed={}",
                        self.repo.as_slug(),
                        report.fetched_issues,
                        report.candidate_issues,
                        report.scheduled_reminders,
                        report.failed_issues
                    );
                    if self.config.poll_once {
                        return Ok(());
                    }
                }
                Err(error) => {
                    warn!("reminder poll failed: repo={} {error:#}", self.repo.as_slug());
                    if self.config.poll_once {
                        return Err(error);
                    }
                }
            }

            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("reminder bridge shutdown requested");
                    return Ok(());
                }
                _ = tokio::time::sleep(self.config.poll_interval) => {}
            }
        }
    }

    /// One poll cycle: fetch, filter, fan out comment fetches, parse, and
    /// dispatch. A fetch failure abandons the cycle with the cursor
    /// unchanged; anything after that is isolated per issue.
    pub async fn poll_once(&mut self) -> Result<PollCycleReport> {
        let mut report = PollCycleReport::default();
        let fetched_at = Utc::now();
        let issues = self
            .github_client
            .list_issues(self.since)
            .await
            .context("issue listing failed")?;
        self.since = Some(fetched_at);
        report.fetched_issues = issues.len();

        let candidates = issues
            .into_iter()
            .filter(|issue| is_candidate_issue(issue, &self.watch_labels))
            .collect::<Vec<_>>();
        report.candidate_issues = candidates.len();

        let comment_fetches = candidates.iter().map(|issue| {
            let client = self.github_client.clone();
            let issue_number = issue.number;
            async move { client.list_issue_comments(issue_number).await }
        });
        let fetched_comments = join_all(comment_fetches).await;

        for (issue, comments) in candidates.into_iter().zip(fetched_comments) {
            let comments = match comments {
                Ok(comments) => comments,
                Err(error) => {
                    report.failed_issues = report.failed_issues.saturating_add(1);
                    warn!("comment fetch failed: issue=#{} {error:#}", issue.number);
                    continue;
                }
            };
            let Some(command) =
                parse_reminder_command(&self.bot_login, &issue, &comments, Utc::now())
            else {
                continue;
            };
            self.dispatch_command(&command, &mut report).await;
        }

        Ok(report)
    }

    /// Schedule the command's reminder, then post the acknowledgement.
    /// The two are independent failure domains: a reminder scheduled before
    /// a failed acknowledgement still fires at expiry.
    async fn dispatch_command(&self, command: &ReminderCommand, report: &mut PollCycleReport) {
        let issue_number = command.issue.number;
        if let Err(error) = schedule_reminder(
            self.store.as_ref(),
            &self.repo.as_slug(),
            issue_number,
            command.date,
        )
        .await
        {
            report.failed_issues = report.failed_issues.saturating_add(1);
            warn!("reminder scheduling failed: issue=#{issue_number} {error}");
            return;
        }
        report.scheduled_reminders = report.scheduled_reminders.saturating_add(1);

        let acknowledgement = render_acknowledgement(command.date);
        match self
            .github_client
            .create_issue_comment(issue_number, &acknowledgement)
            .await
        {
            Ok(posted) => {
                debug!(
                    "acknowledgement posted: issue=#{issue_number} comment_id={}",
                    posted.id
                );
            }
            Err(error) => {
                report.failed_issues = report.failed_issues.saturating_add(1);
                warn!(
                    "acknowledgement post failed, reminder stays scheduled: issue=#{issue_number} {error:#}"
                );
            }
        }
    }
}

/// Acknowledgement posted right after a reminder is scheduled.
fn render_acknowledgement(expire_at: DateTime<Utc>) -> String {
    format!(
        "I've set a reminder for this issue which will expire on:\n**{}**",
        expire_at.to_rfc2822()
    )
}

struct ReminderSender {
    github_client: GithubApiClient,
}

#[async_trait]
impl ExpiryHandler for ReminderSender {
    async fn on_expire(&self, payload: ReminderPayload) -> Result<()> {
        let posted = self
            .github_client
            .create_issue_comment(payload.issue_number, REMINDER_BODY)
            .await
            .with_context(|| {
                format!("failed to post reminder for issue #{}", payload.issue_number)
            })?;
        info!(
            "reminder posted: issue=#{} comment_id={}",
            payload.issue_number, posted.id
        );
        Ok(())
    }
}

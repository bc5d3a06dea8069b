//! CLI entry point for the nudge reminder bridge.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use nudge_runtime::{ReminderBridgeConfig, ReminderBridgeRuntime};
use nudge_scheduler::RedisReminderStore;

fn parse_positive_u64(value: &str) -> Result<u64, String> {
    let parsed = value
        .parse::<u64>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

fn parse_positive_usize(value: &str) -> Result<usize, String> {
    let parsed = value
        .parse::<usize>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

#[derive(Debug, Parser)]
#[command(
    name = "nudge",
    about = "Watches labelled GitHub issues for commented dates and posts a reminder when they arrive",
    version
)]
struct Cli {
    #[arg(long, env = "NUDGE_REPO", help = "Repository to watch, in owner/repo form")]
    repo: String,

    #[arg(
        long,
        env = "NUDGE_GITHUB_TOKEN",
        hide_env_values = true,
        help = "GitHub API token"
    )]
    token: String,

    #[arg(
        long,
        env = "NUDGE_BOT_LOGIN",
        help = "The bot's login; resolved from the token when omitted"
    )]
    bot_login: Option<String>,

    #[arg(
        long,
        env = "NUDGE_LABELS",
        value_delimiter = ',',
        required = true,
        help = "Issue labels to consider (comma separated, matched exactly)"
    )]
    labels: Vec<String>,

    #[arg(
        long,
        env = "NUDGE_REDIS_URL",
        default_value = "redis://127.0.0.1:6379",
        help = "Redis endpoint backing the reminder schedule"
    )]
    redis_url: String,

    #[arg(long, env = "NUDGE_API_BASE", default_value = "https://api.github.com")]
    api_base: String,

    #[arg(
        long,
        env = "NUDGE_POLL_INTERVAL_SECONDS",
        default_value_t = 10,
        value_parser = parse_positive_u64,
        help = "Seconds between poll cycles"
    )]
    poll_interval_seconds: u64,

    #[arg(long, help = "Run a single poll cycle and exit")]
    poll_once: bool,

    #[arg(long, default_value_t = 30_000, value_parser = parse_positive_u64)]
    request_timeout_ms: u64,

    #[arg(long, default_value_t = 3, value_parser = parse_positive_usize)]
    retry_max_attempts: usize,

    #[arg(long, default_value_t = 500, value_parser = parse_positive_u64)]
    retry_base_delay_ms: u64,
}

fn init_tracing() {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let store = Arc::new(
        RedisReminderStore::connect(&cli.redis_url)
            .await
            .context("failed to connect to the reminder store")?,
    );

    let config = ReminderBridgeConfig {
        repo_slug: cli.repo,
        api_base: cli.api_base,
        token: cli.token,
        bot_login: cli.bot_login,
        watch_labels: cli.labels,
        poll_interval: Duration::from_secs(cli.poll_interval_seconds),
        poll_once: cli.poll_once,
        request_timeout_ms: cli.request_timeout_ms,
        retry_max_attempts: cli.retry_max_attempts,
        retry_base_delay_ms: cli.retry_base_delay_ms,
    };

    let mut runtime = ReminderBridgeRuntime::new(config, store.clone()).await?;
    let _expiry_listener = store
        .run_expiry_listener(runtime.reminder_sender())
        .await
        .context("failed to start the reminder expiry listener")?;
    runtime.run().await
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::Cli;

    #[test]
    fn unit_cli_splits_comma_separated_labels() {
        let cli = Cli::try_parse_from([
            "nudge",
            "--repo",
            "owner/repo",
            "--token",
            "secret",
            "--labels",
            "waiting,needs-info",
        ])
        .expect("parse");
        assert_eq!(cli.labels, vec!["waiting", "needs-info"]);
        assert_eq!(cli.poll_interval_seconds, 10);
        assert_eq!(cli.redis_url, "redis://127.0.0.1:6379");
        assert!(!cli.poll_once);
    }

    #[test]
    fn unit_cli_rejects_a_zero_poll_interval() {
        let error = Cli::try_parse_from([
            "nudge",
            "--repo",
            "owner/repo",
            "--token",
            "secret",
            "--labels",
            "waiting",
            "--poll-interval-seconds",
            "0",
        ])
        .expect_err("zero interval should fail");
        assert!(error.to_string().contains("greater than 0"));
    }

    #[test]
    fn unit_cli_requires_the_label_set() {
        let error = Cli::try_parse_from(["nudge", "--repo", "owner/repo", "--token", "secret"])
            .expect_err("missing labels should fail");
        assert!(error.to_string().contains("--labels"));
    }
}

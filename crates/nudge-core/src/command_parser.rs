use chrono::{DateTime, Utc};

use crate::date_extract::extract_date;
use crate::issue_model::{GithubIssue, GithubIssueComment};

#[derive(Debug, Clone)]
/// A detected reminder request: the parsed date plus the comment and issue
/// that produced it. Lives only between parse and schedule/reply.
pub struct ReminderCommand {
    pub date: DateTime<Utc>,
    pub comment: GithubIssueComment,
    pub issue: GithubIssue,
}

/// Find the actionable reminder command in an issue's comment thread.
///
/// The last comment carrying a date wins; comments authored by the bot never
/// carry one. A bot comment anywhere after the winning comment means the
/// command was already acknowledged, so nothing is returned until a newer
/// dated comment appears. The opening issue description is not part of the
/// thread and never acts as a trigger.
pub fn parse_reminder_command(
    bot_login: &str,
    issue: &GithubIssue,
    comments: &[GithubIssueComment],
    now: DateTime<Utc>,
) -> Option<ReminderCommand> {
    let comment_dates = comments
        .iter()
        .map(|comment| {
            if comment.user.login == bot_login {
                None
            } else {
                extract_date(comment.body.as_deref().unwrap_or_default(), now)
            }
        })
        .collect::<Vec<_>>();

    let command_index = comment_dates.iter().rposition(Option::is_some)?;
    let already_answered = comments[command_index + 1..]
        .iter()
        .any(|comment| comment.user.login == bot_login);
    if already_answered {
        return None;
    }

    Some(ReminderCommand {
        date: comment_dates[command_index]?,
        comment: comments[command_index].clone(),
        issue: issue.clone(),
    })
}

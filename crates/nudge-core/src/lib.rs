//! Pure helpers for the nudge reminder bridge: the GitHub issue data model,
//! candidate filtering, natural-language date extraction, and reminder
//! command parsing. No I/O lives in this crate.

pub mod command_parser;
pub mod date_extract;
pub mod issue_filter;
pub mod issue_model;
pub mod transport_helpers;

pub use command_parser::{parse_reminder_command, ReminderCommand};
pub use date_extract::extract_date;
pub use issue_filter::{build_watch_labels, is_candidate_issue, issue_has_watch_label};
pub use issue_model::{GithubIssue, GithubIssueComment, GithubIssueLabel, GithubUser};

use std::collections::HashSet;

use crate::issue_model::GithubIssue;

/// Build the watch-label set from CLI or configuration values.
///
/// Labels are compared byte-for-byte, case included; only surrounding
/// whitespace is stripped.
pub fn build_watch_labels<'a>(labels: impl IntoIterator<Item = &'a str>) -> HashSet<String> {
    labels
        .into_iter()
        .map(str::trim)
        .filter(|label| !label.is_empty())
        .map(str::to_string)
        .collect::<HashSet<_>>()
}

/// Return true when any of the issue's labels is in the watch-set.
pub fn issue_has_watch_label(issue: &GithubIssue, watch_labels: &HashSet<String>) -> bool {
    issue
        .labels
        .iter()
        .any(|label| watch_labels.contains(&label.name))
}

/// Candidate predicate for a poll cycle: the issue carries a watched label,
/// has at least one follow-up comment, and is not a pull request.
pub fn is_candidate_issue(issue: &GithubIssue, watch_labels: &HashSet<String>) -> bool {
    issue.pull_request.is_none() && issue.comments > 0 && issue_has_watch_label(issue, watch_labels)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{build_watch_labels, is_candidate_issue, issue_has_watch_label};
    use crate::issue_model::{GithubIssue, GithubIssueLabel, GithubUser};

    fn sample_issue(number: u64, labels: &[&str], comments: u64) -> GithubIssue {
        GithubIssue {
            id: number * 100,
            number,
            title: format!("Issue {number}"),
            body: None,
            created_at: "2026-01-01T00:00:00Z".to_string(),
            updated_at: "2026-01-01T00:00:10Z".to_string(),
            user: GithubUser {
                login: "alice".to_string(),
            },
            labels: labels
                .iter()
                .map(|name| GithubIssueLabel {
                    name: name.to_string(),
                })
                .collect(),
            comments,
            pull_request: None,
        }
    }

    #[test]
    fn unit_build_watch_labels_deduplicates_and_ignores_blank_values() {
        let labels = build_watch_labels(vec!["  waiting  ", "waiting", "", "  "]);
        assert_eq!(labels.len(), 1);
        assert!(labels.contains("waiting"));
    }

    #[test]
    fn unit_issue_has_watch_label_matches_exact_string_only() {
        let watch = build_watch_labels(vec!["waiting"]);
        assert!(issue_has_watch_label(
            &sample_issue(1, &["waiting", "bug"], 1),
            &watch
        ));
        assert!(!issue_has_watch_label(
            &sample_issue(2, &["Waiting"], 1),
            &watch
        ));
        assert!(!issue_has_watch_label(&sample_issue(3, &[], 1), &watch));
    }

    #[test]
    fn unit_empty_watch_set_matches_nothing() {
        let watch = build_watch_labels(Vec::<&str>::new());
        assert!(!is_candidate_issue(&sample_issue(1, &["waiting"], 3), &watch));
    }

    #[test]
    fn functional_candidate_filter_passes_exactly_the_labelled_commented_issue() {
        let watch = build_watch_labels(vec!["waiting"]);
        let issues = vec![
            sample_issue(1, &["waiting"], 3),
            sample_issue(2, &["something-else"], 2),
            sample_issue(3, &["waiting"], 0),
        ];
        let candidates = issues
            .iter()
            .filter(|issue| is_candidate_issue(issue, &watch))
            .collect::<Vec<_>>();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].number, 1);
    }

    #[test]
    fn regression_candidate_filter_excludes_pull_requests() {
        let watch = build_watch_labels(vec!["waiting"]);
        let mut issue = sample_issue(4, &["waiting"], 2);
        issue.pull_request = Some(json!({"url": "https://example.invalid/pull/4"}));
        assert!(!is_candidate_issue(&issue, &watch));
    }
}

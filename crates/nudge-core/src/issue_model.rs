use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Deserialize, Serialize)]
/// Issue or comment author identity as returned by the GitHub REST API.
pub struct GithubUser {
    pub login: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GithubIssueLabel {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
/// Issue row from the repository issues listing.
pub struct GithubIssue {
    pub id: u64,
    pub number: u64,
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub user: GithubUser,
    #[serde(default)]
    pub labels: Vec<GithubIssueLabel>,
    /// Total comment count reported by the listing; the comment bodies are
    /// fetched separately per issue.
    #[serde(default)]
    pub comments: u64,
    /// Present when the row is actually a pull request. The issues listing
    /// returns both.
    #[serde(default)]
    pub pull_request: Option<Value>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
/// Follow-up comment on an issue, insertion-ordered by creation time.
pub struct GithubIssueComment {
    pub id: u64,
    #[serde(default)]
    pub body: Option<String>,
    pub created_at: String,
    pub user: GithubUser,
}

use issuesync_core::types::{SourceItem, SourceStatus};
use serde::{Deserialize, Serialize};

// ─── GitHub ───────────────────────────────────────────────────────────────

/// One entry of `GET /repos/{owner}/{repo}/issues`, requested with the
/// `application/vnd.github.text+json` media type so bodies arrive as plain
/// text in `body_text`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct GithubIssue {
    pub number: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body_text: Option<String>,
    #[serde(default)]
    pub html_url: String,
    #[serde(default)]
    pub user: Option<GithubUser>,
    #[serde(default)]
    pub assignee: Option<GithubUser>,
    pub state: SourceStatus,
    /// Present only on pull requests.
    #[serde(default)]
    pub pull_request: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct GithubUser {
    pub login: String,
}

impl From<GithubIssue> for SourceItem {
    fn from(issue: GithubIssue) -> Self {
        SourceItem {
            number: issue.number,
            title: issue.title,
            body: issue.body_text.unwrap_or_default(),
            url: issue.html_url,
            author: issue.user.map(|u| u.login).unwrap_or_default(),
            assignee: issue.assignee.map(|u| u.login).unwrap_or_default(),
            status: issue.state,
            is_pull_request: issue.pull_request.is_some(),
        }
    }
}

// ─── Jira ─────────────────────────────────────────────────────────────────

/// A ticket as returned by search and create. Create responses carry only
/// `id` and `key`, so `fields` defaults to empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct TrackerIssue {
    #[serde(default)]
    pub id: String,
    pub key: String,
    #[serde(default)]
    pub fields: TrackerFields,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct TrackerFields {
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub status: Option<TrackerStatus>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TrackerStatus {
    pub name: String,
}

impl TrackerIssue {
    pub fn summary(&self) -> &str {
        &self.fields.summary
    }

    /// Current status name, empty when the response did not include it.
    pub fn status_name(&self) -> &str {
        self.fields
            .status
            .as_ref()
            .map(|s| s.name.as_str())
            .unwrap_or("")
    }
}

/// `GET rest/api/2/search` response page.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct SearchPage {
    #[serde(rename = "startAt", default)]
    pub start_at: u64,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub issues: Vec<TrackerIssue>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Transition {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TransitionList {
    #[serde(default)]
    pub transitions: Vec<Transition>,
}

/// Fields of a ticket to create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTicket {
    pub assignee: String,
    pub description: String,
    pub issue_type: String,
    pub project_key: String,
    pub summary: String,
    pub components: Vec<String>,
}

impl NewTicket {
    /// Body of `POST rest/api/2/issue`.
    pub(crate) fn to_request_body(&self) -> serde_json::Value {
        let components: Vec<_> = self
            .components
            .iter()
            .map(|name| serde_json::json!({ "name": name }))
            .collect();
        serde_json::json!({
            "fields": {
                "assignee": { "name": self.assignee },
                "description": self.description,
                "issuetype": { "name": self.issue_type },
                "project": { "key": self.project_key },
                "summary": self.summary,
                "components": components,
            }
        })
    }
}

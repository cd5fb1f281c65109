use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// SourceStatus
// ---------------------------------------------------------------------------

/// Open/closed state of an issue in the source repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceStatus {
    Open,
    Closed,
}

impl SourceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SourceStatus::Open => "open",
            SourceStatus::Closed => "closed",
        }
    }
}

impl fmt::Display for SourceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// SourceItem
// ---------------------------------------------------------------------------

/// An issue as listed by the source repository. Identity is `number`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceItem {
    pub number: u64,
    pub title: String,
    pub body: String,
    pub url: String,
    /// Empty when the author account no longer exists.
    pub author: String,
    /// Empty when the issue is unassigned.
    pub assignee: String,
    pub status: SourceStatus,
    pub is_pull_request: bool,
}

/// A [`SourceItem`] whose assignee resolved to a team member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedItem {
    pub item: SourceItem,
    /// Tracker username of the assignee.
    pub assignee: String,
    /// Tracker username of the author, when the author is on the roster.
    pub author: Option<String>,
}

// ---------------------------------------------------------------------------
// TicketRecord
// ---------------------------------------------------------------------------

/// What the tracker currently holds for one source item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketRecord {
    pub key: String,
    pub status: String,
}

impl TicketRecord {
    pub fn new(key: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            status: status.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_status_parses_github_state() {
        let open: SourceStatus = serde_yaml::from_str("open").unwrap();
        let closed: SourceStatus = serde_yaml::from_str("closed").unwrap();
        assert_eq!(open, SourceStatus::Open);
        assert_eq!(closed, SourceStatus::Closed);
        assert_eq!(closed.to_string(), "closed");
    }
}

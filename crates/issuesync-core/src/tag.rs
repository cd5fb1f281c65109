//! The `GH-<repo>-<number>: ` prefix that ties a tracker ticket back to the
//! source issue it was created from.

use crate::error::{Result, SyncError};
use regex::Regex;

#[derive(Debug, Clone)]
pub struct TicketTag {
    repo: String,
    pattern: Regex,
}

impl TicketTag {
    pub fn new(repo: &str) -> Result<Self> {
        let pattern = Regex::new(&format!(r"GH-{}-([0-9]+): ", regex::escape(repo)))?;
        Ok(Self {
            repo: repo.to_string(),
            pattern,
        })
    }

    /// Ticket summary for a source issue: `GH-<repo>-<number>: <title>`.
    pub fn summary(&self, number: u64, title: &str) -> String {
        format!("GH-{}-{}: {}", self.repo, number, title)
    }

    /// Source issue number embedded in a ticket summary, if tagged.
    pub fn extract(&self, summary: &str) -> Result<Option<u64>> {
        let Some(caps) = self.pattern.captures(summary) else {
            return Ok(None);
        };
        caps[1]
            .parse::<u64>()
            .map(Some)
            .map_err(|_| SyncError::MalformedTicketNumber {
                summary: summary.to_string(),
            })
    }
}

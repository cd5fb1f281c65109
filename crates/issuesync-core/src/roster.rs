//! Team roster: who is on the team and how their accounts map across
//! services.
//!
//! The roster is built from two YAML documents:
//!
//! ```yaml
//! # people
//! - kerberos: jdoe
//!   github_handle: jdoe-gh
//!   jira_name: jdoe@example.com
//!   slack_id: U012345
//! ```
//!
//! ```yaml
//! # team
//! jdoe:
//!   bug_triage: true
//!   leave:
//!     - start: 2024-07-01T00:00:00Z
//!       end: 2024-07-15T00:00:00Z
//! ```
//!
//! Everyone listed in `people` is known; only those also keyed in `team` are
//! team members.

use crate::error::{Result, SyncError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Leave {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub kerberos: String,
    #[serde(rename = "github_handle", default)]
    pub github: String,
    #[serde(rename = "jira_name", default)]
    pub jira: String,
    #[serde(rename = "slack_id", default)]
    pub slack: String,
    #[serde(skip)]
    pub team_member: bool,
    #[serde(skip)]
    pub bug_triage: bool,
    #[serde(skip)]
    pub leave: Vec<Leave>,
}

impl Person {
    /// False while `at` falls strictly inside one of the leave intervals.
    pub fn is_available(&self, at: DateTime<Utc>) -> bool {
        !self.leave.iter().any(|l| l.start < at && at < l.end)
    }
}

#[derive(Debug, Deserialize)]
struct TeamEntry {
    #[serde(default)]
    bug_triage: bool,
    #[serde(default)]
    leave: Vec<Leave>,
}

// ---------------------------------------------------------------------------
// Roster
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Roster {
    people: Vec<Person>,
}

impl Roster {
    pub fn new(people: Vec<Person>) -> Self {
        Self { people }
    }

    /// Decode the people list and merge in team membership from the team map.
    pub fn load(people_yaml: &str, team_yaml: &str) -> Result<Self> {
        let mut people: Vec<Person> =
            serde_yaml::from_str(people_yaml).map_err(|source| SyncError::Roster {
                document: "people",
                source,
            })?;
        let team: HashMap<String, TeamEntry> =
            serde_yaml::from_str(team_yaml).map_err(|source| SyncError::Roster {
                document: "team",
                source,
            })?;

        for person in &mut people {
            // chat handles need a leading `@` to be mentioned
            person.slack = format!("@{}", person.slack);

            if let Some(entry) = team.get(&person.kerberos) {
                person.team_member = true;
                person.bug_triage = entry.bug_triage;
                person.leave = entry.leave.clone();
            }
        }

        tracing::debug!(
            people = people.len(),
            team = team.len(),
            "loaded roster"
        );
        Ok(Self { people })
    }

    /// The subset of the roster that belongs to the team.
    pub fn team_members(&self) -> Roster {
        Roster {
            people: self
                .people
                .iter()
                .filter(|p| p.team_member)
                .cloned()
                .collect(),
        }
    }

    pub fn people(&self) -> &[Person] {
        &self.people
    }

    pub fn len(&self) -> usize {
        self.people.len()
    }

    pub fn is_empty(&self) -> bool {
        self.people.is_empty()
    }

    /// First person with the given GitHub handle.
    pub fn person_by_source_handle(&self, handle: &str) -> Option<&Person> {
        if handle.is_empty() {
            return None;
        }
        self.people.iter().find(|p| p.github == handle)
    }

    /// First person with the given Jira username.
    pub fn person_by_tracker_name(&self, name: &str) -> Option<&Person> {
        if name.is_empty() {
            return None;
        }
        self.people.iter().find(|p| p.jira == name)
    }

    /// Map a GitHub handle to a Jira username. People without a Jira name
    /// do not resolve.
    pub fn resolve(&self, handle: &str) -> Option<&str> {
        self.person_by_source_handle(handle)
            .map(|p| p.jira.as_str())
            .filter(|name| !name.is_empty())
    }
}

//! Secrets and roster documents handed to the process through the
//! environment.

use thiserror::Error;

pub const GITHUB_TOKEN: &str = "GITHUB_TOKEN";
pub const JIRA_TOKEN: &str = "JIRA_TOKEN";
pub const PEOPLE: &str = "PEOPLE";
pub const TEAM: &str = "TEAM";

/// Exit status for missing inputs (`EX_USAGE` from sysexits.h).
pub const EX_USAGE: i32 = 64;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("required inputs not found: {}", .0.join(", "))]
pub struct MissingInputs(pub Vec<&'static str>);

/// Values as collected from flags and environment; empty counts as unset.
#[derive(Debug, Clone, Default)]
pub struct RawInputs {
    pub github_token: Option<String>,
    pub jira_token: Option<String>,
    pub people: Option<String>,
    pub team: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RosterInputs {
    pub people: String,
    pub team: String,
}

#[derive(Debug, Clone)]
pub struct SyncInputs {
    pub github_token: String,
    pub jira_token: String,
    pub roster: RosterInputs,
}

fn take(
    value: Option<String>,
    name: &'static str,
    missing: &mut Vec<&'static str>,
) -> String {
    match value.filter(|v| !v.trim().is_empty()) {
        Some(v) => v,
        None => {
            missing.push(name);
            String::new()
        }
    }
}

impl RawInputs {
    /// Everything a sync run needs. Reports every missing input at once.
    pub fn into_sync(self) -> Result<SyncInputs, MissingInputs> {
        let mut missing = Vec::new();
        let github_token = take(self.github_token, GITHUB_TOKEN, &mut missing);
        let jira_token = take(self.jira_token, JIRA_TOKEN, &mut missing);
        let people = take(self.people, PEOPLE, &mut missing);
        let team = take(self.team, TEAM, &mut missing);
        if !missing.is_empty() {
            return Err(MissingInputs(missing));
        }
        Ok(SyncInputs {
            github_token,
            jira_token,
            roster: RosterInputs { people, team },
        })
    }

    /// Only the roster documents.
    pub fn into_roster(self) -> Result<RosterInputs, MissingInputs> {
        let mut missing = Vec::new();
        let people = take(self.people, PEOPLE, &mut missing);
        let team = take(self.team, TEAM, &mut missing);
        if !missing.is_empty() {
            return Err(MissingInputs(missing));
        }
        Ok(RosterInputs { people, team })
    }
}

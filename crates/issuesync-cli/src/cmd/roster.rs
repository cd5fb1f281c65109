use crate::input::RosterInputs;
use crate::output::{print_json, print_table};
use anyhow::Context;
use chrono::{DateTime, Utc};
use issuesync_core::roster::{Person, Roster};
use serde::Serialize;

#[derive(Debug, Serialize)]
struct MemberRow<'a> {
    kerberos: &'a str,
    github: &'a str,
    jira: &'a str,
    slack: &'a str,
    bug_triage: bool,
    available: bool,
}

fn row(person: &Person, now: DateTime<Utc>) -> MemberRow<'_> {
    MemberRow {
        kerberos: &person.kerberos,
        github: &person.github,
        jira: &person.jira,
        slack: &person.slack,
        bug_triage: person.bug_triage,
        available: person.is_available(now),
    }
}

fn yes_no(b: bool) -> String {
    let s = if b { "yes" } else { "no" };
    s.to_string()
}

/// Print the team members and how their accounts map.
pub fn run(inputs: &RosterInputs, json: bool) -> anyhow::Result<()> {
    let team = Roster::load(&inputs.people, &inputs.team)
        .context("error fetching team information")?
        .team_members();
    let now = Utc::now();
    let rows: Vec<MemberRow<'_>> = team.people().iter().map(|p| row(p, now)).collect();

    if json {
        return print_json(&rows);
    }

    if rows.is_empty() {
        println!("No team members.");
        return Ok(());
    }

    let table: Vec<Vec<String>> = rows
        .iter()
        .map(|r| {
            vec![
                r.kerberos.to_string(),
                r.github.to_string(),
                r.jira.to_string(),
                r.slack.to_string(),
                yes_no(r.bug_triage),
                yes_no(r.available),
            ]
        })
        .collect();
    print_table(
        &["KERBEROS", "GITHUB", "JIRA", "SLACK", "TRIAGE", "AVAILABLE"],
        &table,
    );
    Ok(())
}

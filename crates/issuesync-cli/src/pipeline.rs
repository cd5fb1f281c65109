//! The reconciliation pipeline.
//!
//! ```text
//! GithubSource::fetch_issues ──▶ assigned_to_team ──▶ Reconciler::run ──▶ Jira mutations
//!                                                          ▲
//! JiraClient::search ──▶ build_index (fully drained) ──────┘
//! ```
//!
//! The source stream and the filter stage run as their own tasks while the
//! index is built; the reconciler only starts once the index is complete and
//! then issues every mutation sequentially.

use anyhow::{bail, Context};
use futures::{Stream, StreamExt};
use issuesync_core::config::TrackerConfig;
use issuesync_core::decision::{decide, Decision};
use issuesync_core::index::TrackerIndex;
use issuesync_core::roster::Roster;
use issuesync_core::tag::TicketTag;
use issuesync_core::types::{ResolvedItem, SourceItem, TicketRecord};
use issuesync_core::SyncError;
use issuesync_remote::{ItemStream, JiraClient, NewTicket, RemoteError, TrackerIssue};
use serde::Serialize;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Filter / resolve
// ---------------------------------------------------------------------------

/// Keep the issues assigned to a team member, with GitHub handles resolved
/// to Jira usernames.
///
/// An upstream error is logged and ends the stage; the items already passed
/// on are still reconciled.
pub fn assigned_to_team<S>(items: S, team: Roster) -> ItemStream<ResolvedItem>
where
    S: Stream<Item = issuesync_remote::Result<SourceItem>> + Send + 'static,
{
    ItemStream::spawn(move |tx| async move {
        let mut items = Box::pin(items);
        let (mut seen, mut kept) = (0usize, 0usize);

        while let Some(item) = items.next().await {
            let item = match item {
                Ok(item) => item,
                Err(e) => {
                    tracing::error!(error = %e, "error fetching GitHub issues");
                    break;
                }
            };
            seen += 1;

            let Some(assignee) = team.resolve(&item.assignee).map(str::to_string) else {
                continue;
            };
            let author = team.resolve(&item.author).map(str::to_string);
            kept += 1;

            let resolved = ResolvedItem {
                item,
                assignee,
                author,
            };
            if tx.send(resolved).await.is_err() {
                break; // Receiver dropped
            }
        }

        tracing::info!(issues = seen, assigned_to_team = kept, "filtered GitHub issues");
    })
}

// ---------------------------------------------------------------------------
// Tracker index
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum IndexError {
    /// The search stream failed; the index would be missing tickets.
    #[error("tracker search ended early: {0}")]
    Incomplete(#[source] RemoteError),

    #[error(transparent)]
    Malformed(#[from] SyncError),
}

/// Drain the whole search stream into a [`TrackerIndex`].
pub async fn build_index<S>(tickets: S, tag: &TicketTag) -> Result<TrackerIndex, IndexError>
where
    S: Stream<Item = issuesync_remote::Result<TrackerIssue>>,
{
    let mut tickets = std::pin::pin!(tickets);
    let mut index = TrackerIndex::new();
    let mut seen = 0usize;

    while let Some(ticket) = tickets.next().await {
        let ticket = ticket.map_err(IndexError::Incomplete)?;
        seen += 1;
        let record = TicketRecord::new(&ticket.key, ticket.status_name());
        index.ingest(tag, ticket.summary(), record)?;
    }

    tracing::info!(tickets = seen, tagged = index.len(), "built tracker index");
    Ok(index)
}

// ---------------------------------------------------------------------------
// Reconciler
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileSummary {
    pub processed: usize,
    pub created: usize,
    pub closed: usize,
    pub reopened: usize,
    pub unchanged: usize,
    pub failed: usize,
}

/// Ticket fields for a source issue that has none yet.
pub fn new_ticket(resolved: &ResolvedItem, tag: &TicketTag, tracker: &TrackerConfig) -> NewTicket {
    let item = &resolved.item;
    NewTicket {
        assignee: resolved.assignee.clone(),
        description: format!("Originally posted on Github: {}\n\n{}", item.url, item.body),
        issue_type: tracker.issue_type.clone(),
        project_key: tracker.project_key.clone(),
        summary: tag.summary(item.number, &item.title),
        components: vec![tracker.component.clone()],
    }
}

/// A decision paired with the ticket it acts on.
#[derive(Debug, PartialEq, Eq)]
enum Step<'t> {
    Create,
    Close(&'t TicketRecord),
    Reopen(&'t TicketRecord),
    Unchanged,
}

fn plan(decision: Decision, ticket: Option<&TicketRecord>) -> anyhow::Result<Step<'_>> {
    match (decision, ticket) {
        (Decision::Create, _) => Ok(Step::Create),
        (Decision::TransitionToClosed, Some(t)) => Ok(Step::Close(t)),
        (Decision::TransitionToOpen, Some(t)) => Ok(Step::Reopen(t)),
        (Decision::NoOp, _) => Ok(Step::Unchanged),
        (Decision::TransitionToClosed | Decision::TransitionToOpen, None) => {
            bail!("decision {decision} has no indexed ticket to act on")
        }
    }
}

pub struct Reconciler<'a> {
    client: &'a JiraClient,
    index: &'a TrackerIndex,
    tag: &'a TicketTag,
    tracker: &'a TrackerConfig,
}

impl<'a> Reconciler<'a> {
    pub fn new(
        client: &'a JiraClient,
        index: &'a TrackerIndex,
        tag: &'a TicketTag,
        tracker: &'a TrackerConfig,
    ) -> Self {
        Self {
            client,
            index,
            tag,
            tracker,
        }
    }

    /// Bring the tracker in line with each item, one at a time. Failures are
    /// logged and counted; they never stop the loop.
    pub async fn run<S>(&self, items: S) -> ReconcileSummary
    where
        S: Stream<Item = ResolvedItem>,
    {
        let mut items = std::pin::pin!(items);
        let mut summary = ReconcileSummary::default();

        while let Some(resolved) = items.next().await {
            summary.processed += 1;
            let number = resolved.item.number;
            let ticket = self.index.get(number);
            let decision = decide(resolved.item.status, ticket, &self.tracker.closed_status);
            tracing::info!(
                number,
                assignee = %resolved.item.assignee,
                author = resolved.author.as_deref().unwrap_or("-"),
                status = %resolved.item.status,
                %decision,
                "now processing GitHub issue"
            );

            let step = match plan(decision, ticket) {
                Ok(step) => step,
                Err(e) => {
                    tracing::error!(number, error = %format!("{e:#}"), "cannot reconcile GitHub issue");
                    summary.failed += 1;
                    continue;
                }
            };
            match step {
                Step::Create => match self.create(&resolved).await {
                    Ok(created) => {
                        tracing::info!(number, key = %created.key, "created Jira ticket");
                        summary.created += 1;
                    }
                    Err(e) => {
                        tracing::error!(number, error = %format!("{e:#}"), "error creating Jira ticket");
                        summary.failed += 1;
                    }
                },
                Step::Close(ticket) => {
                    if self.transition(ticket, &self.tracker.close_transition).await {
                        summary.closed += 1;
                    } else {
                        summary.failed += 1;
                    }
                }
                Step::Reopen(ticket) => {
                    if self.transition(ticket, &self.tracker.reopen_transition).await {
                        summary.reopened += 1;
                    } else {
                        summary.failed += 1;
                    }
                }
                Step::Unchanged => summary.unchanged += 1,
            }
        }

        summary
    }

    async fn create(&self, resolved: &ResolvedItem) -> anyhow::Result<TrackerIssue> {
        let ticket = new_ticket(resolved, self.tag, self.tracker);
        let created = self.client.create(&ticket).await?;
        Ok(created)
    }

    /// Apply the transition called `name`; logs the outcome.
    async fn transition(&self, ticket: &TicketRecord, name: &str) -> bool {
        match self.try_transition(ticket, name).await {
            Ok(()) => {
                tracing::info!(key = %ticket.key, to = name, "transitioned Jira ticket");
                true
            }
            Err(e) => {
                tracing::error!(
                    key = %ticket.key,
                    to = name,
                    error = %format!("{e:#}"),
                    "unable to transition Jira ticket"
                );
                false
            }
        }
    }

    async fn try_transition(&self, ticket: &TicketRecord, name: &str) -> anyhow::Result<()> {
        let transitions = self
            .client
            .transitions(&ticket.key)
            .await
            .with_context(|| format!("listing transitions of {}", ticket.key))?;
        let Some(transition) = transitions.iter().find(|t| t.name == name) else {
            bail!(
                "no transition named {name:?} from status {:?}",
                ticket.status
            );
        };
        self.client
            .apply_transition(&ticket.key, &transition.id)
            .await?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use issuesync_core::roster::Person;
    use issuesync_core::types::SourceStatus;
    use issuesync_remote::types::{TrackerFields, TrackerStatus};
    use mockito::Matcher;

    fn item(number: u64, status: SourceStatus, assignee: &str) -> SourceItem {
        SourceItem {
            number,
            title: format!("Issue {number}"),
            body: "details".into(),
            url: format!("https://github.com/o/r/issues/{number}"),
            author: "alice-gh".into(),
            assignee: assignee.into(),
            status,
            is_pull_request: false,
        }
    }

    fn resolved(number: u64, status: SourceStatus) -> ResolvedItem {
        ResolvedItem {
            item: item(number, status, "alice-gh"),
            assignee: "alice@example.com".into(),
            author: Some("alice@example.com".into()),
        }
    }

    fn team() -> Roster {
        Roster::new(vec![Person {
            kerberos: "alice".into(),
            github: "alice-gh".into(),
            jira: "alice@example.com".into(),
            slack: "@UALICE".into(),
            team_member: true,
            bug_triage: false,
            leave: vec![],
        }])
    }

    fn tracker_issue(key: &str, summary: &str, status: &str) -> TrackerIssue {
        TrackerIssue {
            id: String::new(),
            key: key.into(),
            fields: TrackerFields {
                summary: summary.into(),
                status: Some(TrackerStatus {
                    name: status.into(),
                }),
            },
        }
    }

    fn index_of(entries: &[(u64, &str, &str)]) -> TrackerIndex {
        let mut index = TrackerIndex::new();
        for (number, key, status) in entries {
            index.insert(*number, TicketRecord::new(*key, *status));
        }
        index
    }

    // ── filter / resolve ────────────────────────────────────────────────

    #[tokio::test]
    async fn only_issues_assigned_to_team_members_pass() {
        let mut outsider = item(2, SourceStatus::Open, "carol-gh");
        outsider.author = "carol-gh".into();
        let items = vec![
            Ok(item(1, SourceStatus::Open, "alice-gh")),
            Ok(outsider),
            Ok(item(3, SourceStatus::Open, "")),
        ];

        let out: Vec<ResolvedItem> = assigned_to_team(futures::stream::iter(items), team())
            .collect()
            .await;

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].item.number, 1);
        assert_eq!(out[0].assignee, "alice@example.com");
        assert_eq!(out[0].author.as_deref(), Some("alice@example.com"));
    }

    #[tokio::test]
    async fn upstream_error_ends_the_stage() {
        let items = vec![
            Ok(item(1, SourceStatus::Open, "alice-gh")),
            Err(RemoteError::Cancelled),
            Ok(item(2, SourceStatus::Open, "alice-gh")),
        ];
        let out: Vec<ResolvedItem> = assigned_to_team(futures::stream::iter(items), team())
            .collect()
            .await;
        let numbers: Vec<u64> = out.iter().map(|r| r.item.number).collect();
        assert_eq!(numbers, vec![1]);
    }

    // ── index ───────────────────────────────────────────────────────────

    #[tokio::test]
    async fn index_keeps_tagged_tickets() {
        let tag = TicketTag::new("orc").unwrap();
        let tickets = vec![
            Ok(tracker_issue("X-1", "GH-orc-7: broken", "Closed")),
            Ok(tracker_issue("X-2", "hand-written ticket", "To Do")),
            Ok(tracker_issue("X-3", "GH-orc-7: duplicate", "To Do")),
        ];
        let index = build_index(futures::stream::iter(tickets), &tag)
            .await
            .unwrap();
        assert_eq!(index.len(), 1);
        assert_eq!(index.get(7), Some(&TicketRecord::new("X-1", "Closed")));
    }

    #[tokio::test]
    async fn failed_search_leaves_index_incomplete() {
        let tag = TicketTag::new("orc").unwrap();
        let tickets = vec![
            Ok(tracker_issue("X-1", "GH-orc-7: broken", "Closed")),
            Err(RemoteError::Status {
                service: "Jira",
                status: 500,
                body: String::new(),
            }),
        ];
        let err = build_index(futures::stream::iter(tickets), &tag)
            .await
            .unwrap_err();
        assert!(matches!(err, IndexError::Incomplete(_)));
    }

    #[tokio::test]
    async fn malformed_ticket_number_aborts() {
        let tag = TicketTag::new("orc").unwrap();
        let tickets = vec![Ok(tracker_issue(
            "X-1",
            "GH-orc-123456789012345678901234567890: huge",
            "To Do",
        ))];
        let err = build_index(futures::stream::iter(tickets), &tag)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            IndexError::Malformed(SyncError::MalformedTicketNumber { .. })
        ));
    }

    // ── reconciler ──────────────────────────────────────────────────────

    #[test]
    fn transition_without_ticket_is_rejected() {
        let t = TicketRecord::new("OSASINFRA-3", "Closed");
        assert_eq!(plan(Decision::TransitionToOpen, Some(&t)).unwrap(), Step::Reopen(&t));
        assert_eq!(plan(Decision::NoOp, Some(&t)).unwrap(), Step::Unchanged);
        assert_eq!(plan(Decision::Create, None).unwrap(), Step::Create);

        let err = plan(Decision::TransitionToClosed, None).unwrap_err();
        assert!(err.to_string().contains("close"), "{err}");
        assert!(plan(Decision::TransitionToOpen, None).is_err());
    }

    #[test]
    fn new_ticket_fields() {
        let tag = TicketTag::new("orc").unwrap();
        let tracker = TrackerConfig::default();
        let ticket = new_ticket(&resolved(42, SourceStatus::Closed), &tag, &tracker);
        assert_eq!(ticket.summary, "GH-orc-42: Issue 42");
        assert_eq!(
            ticket.description,
            "Originally posted on Github: https://github.com/o/r/issues/42\n\ndetails"
        );
        assert_eq!(ticket.issue_type, "Task");
        assert_eq!(ticket.project_key, "OSASINFRA");
        assert_eq!(ticket.components, vec!["ORC".to_string()]);
        assert_eq!(tag.extract(&ticket.summary).unwrap(), Some(42));
    }

    #[tokio::test]
    async fn closed_issue_without_ticket_is_created_once_and_not_transitioned() {
        let mut server = mockito::Server::new_async().await;
        let create = server
            .mock("POST", "/rest/api/2/issue")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "fields": { "summary": "GH-orc-42: Issue 42" }
            })))
            .with_status(201)
            .with_body(r#"{"id":"1","key":"OSASINFRA-100"}"#)
            .expect(1)
            .create_async()
            .await;
        let no_gets = server
            .mock("GET", Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let client = JiraClient::new(&server.url(), "t").unwrap();
        let index = TrackerIndex::new();
        let tag = TicketTag::new("orc").unwrap();
        let tracker = TrackerConfig::default();
        let summary = Reconciler::new(&client, &index, &tag, &tracker)
            .run(futures::stream::iter(vec![resolved(42, SourceStatus::Closed)]))
            .await;

        assert_eq!(summary.created, 1);
        assert_eq!(summary.processed, 1);
        create.assert_async().await;
        no_gets.assert_async().await;
    }

    #[tokio::test]
    async fn reopened_issue_moves_closed_ticket_to_do() {
        let mut server = mockito::Server::new_async().await;
        let list = server
            .mock("GET", "/rest/api/2/issue/OSASINFRA-7/transitions")
            .with_status(200)
            .with_body(
                r#"{"transitions":[{"id":"21","name":"In Progress"},{"id":"11","name":"To Do"}]}"#,
            )
            .expect(1)
            .create_async()
            .await;
        let apply = server
            .mock("POST", "/rest/api/2/issue/OSASINFRA-7/transitions")
            .match_body(Matcher::Json(serde_json::json!({"transition": {"id": "11"}})))
            .with_status(204)
            .expect(1)
            .create_async()
            .await;

        let client = JiraClient::new(&server.url(), "t").unwrap();
        let index = index_of(&[(7, "OSASINFRA-7", "Closed")]);
        let tag = TicketTag::new("orc").unwrap();
        let tracker = TrackerConfig::default();
        let summary = Reconciler::new(&client, &index, &tag, &tracker)
            .run(futures::stream::iter(vec![resolved(7, SourceStatus::Open)]))
            .await;

        assert_eq!(summary.reopened, 1);
        assert_eq!(summary.failed, 0);
        list.assert_async().await;
        apply.assert_async().await;
    }

    #[tokio::test]
    async fn missing_transition_is_logged_and_other_items_continue() {
        let mut server = mockito::Server::new_async().await;
        let _list = server
            .mock("GET", "/rest/api/2/issue/OSASINFRA-7/transitions")
            .with_status(200)
            .with_body(r#"{"transitions":[{"id":"31","name":"Closed"}]}"#)
            .create_async()
            .await;
        let no_apply = server
            .mock("POST", "/rest/api/2/issue/OSASINFRA-7/transitions")
            .expect(0)
            .create_async()
            .await;
        let create = server
            .mock("POST", "/rest/api/2/issue")
            .with_status(201)
            .with_body(r#"{"id":"2","key":"OSASINFRA-8"}"#)
            .expect(1)
            .create_async()
            .await;

        let client = JiraClient::new(&server.url(), "t").unwrap();
        let index = index_of(&[(7, "OSASINFRA-7", "Closed")]);
        let tag = TicketTag::new("orc").unwrap();
        let tracker = TrackerConfig::default();
        let items = vec![
            resolved(7, SourceStatus::Open),
            resolved(8, SourceStatus::Open),
        ];
        let summary = Reconciler::new(&client, &index, &tag, &tracker)
            .run(futures::stream::iter(items))
            .await;

        assert_eq!(summary.failed, 1);
        assert_eq!(summary.created, 1);
        no_apply.assert_async().await;
        create.assert_async().await;
    }

    #[tokio::test]
    async fn closed_issue_closes_open_ticket() {
        let mut server = mockito::Server::new_async().await;
        let _list = server
            .mock("GET", "/rest/api/2/issue/OSASINFRA-9/transitions")
            .with_status(200)
            .with_body(r#"{"transitions":[{"id":"31","name":"Closed"},{"id":"11","name":"To Do"}]}"#)
            .create_async()
            .await;
        let apply = server
            .mock("POST", "/rest/api/2/issue/OSASINFRA-9/transitions")
            .match_body(Matcher::Json(serde_json::json!({"transition": {"id": "31"}})))
            .with_status(204)
            .expect(1)
            .create_async()
            .await;

        let client = JiraClient::new(&server.url(), "t").unwrap();
        let index = index_of(&[(9, "OSASINFRA-9", "In Progress")]);
        let tag = TicketTag::new("orc").unwrap();
        let tracker = TrackerConfig::default();
        let summary = Reconciler::new(&client, &index, &tag, &tracker)
            .run(futures::stream::iter(vec![resolved(9, SourceStatus::Closed)]))
            .await;

        assert_eq!(summary.closed, 1);
        apply.assert_async().await;
    }

    #[tokio::test]
    async fn matching_states_make_no_calls() {
        let mut server = mockito::Server::new_async().await;
        let no_gets = server
            .mock("GET", Matcher::Any)
            .expect(0)
            .create_async()
            .await;
        let no_posts = server
            .mock("POST", Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let client = JiraClient::new(&server.url(), "t").unwrap();
        let index = index_of(&[(1, "OSASINFRA-1", "To Do"), (2, "OSASINFRA-2", "Closed")]);
        let tag = TicketTag::new("orc").unwrap();
        let tracker = TrackerConfig::default();
        let items = vec![
            resolved(1, SourceStatus::Open),
            resolved(2, SourceStatus::Closed),
        ];
        let summary = Reconciler::new(&client, &index, &tag, &tracker)
            .run(futures::stream::iter(items))
            .await;

        assert_eq!(summary.unchanged, 2);
        no_gets.assert_async().await;
        no_posts.assert_async().await;
    }

    #[tokio::test]
    async fn failed_create_does_not_stop_the_run() {
        let mut server = mockito::Server::new_async().await;
        let rejected = server
            .mock("POST", "/rest/api/2/issue")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "fields": { "summary": "GH-orc-1: Issue 1" }
            })))
            .with_status(400)
            .with_body(r#"{"errors":{"assignee":"unknown"}}"#)
            .expect(1)
            .create_async()
            .await;
        let accepted = server
            .mock("POST", "/rest/api/2/issue")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "fields": { "summary": "GH-orc-2: Issue 2" }
            })))
            .with_status(201)
            .with_body(r#"{"id":"2","key":"OSASINFRA-2"}"#)
            .expect(1)
            .create_async()
            .await;

        let client = JiraClient::new(&server.url(), "t").unwrap();
        let index = TrackerIndex::new();
        let tag = TicketTag::new("orc").unwrap();
        let tracker = TrackerConfig::default();
        let items = vec![
            resolved(1, SourceStatus::Open),
            resolved(2, SourceStatus::Open),
        ];
        let summary = Reconciler::new(&client, &index, &tag, &tracker)
            .run(futures::stream::iter(items))
            .await;

        assert_eq!(summary.failed, 1);
        assert_eq!(summary.created, 1);
        rejected.assert_async().await;
        accepted.assert_async().await;
    }
}

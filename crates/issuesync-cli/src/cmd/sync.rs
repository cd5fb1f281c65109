use crate::input::SyncInputs;
use crate::output::print_json;
use crate::pipeline::{assigned_to_team, build_index, IndexError, ReconcileSummary, Reconciler};
use anyhow::Context;
use issuesync_core::config::SyncConfig;
use issuesync_core::roster::Roster;
use issuesync_core::tag::TicketTag;
use issuesync_remote::{GithubSource, JiraClient};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

/// `--json` output of a sync run. `skipped` is set when the tracker could
/// not be listed and nothing was reconciled.
#[derive(Debug, Serialize)]
pub struct SyncReport {
    pub skipped: bool,
    #[serde(flatten)]
    pub summary: ReconcileSummary,
}

impl From<Option<ReconcileSummary>> for SyncReport {
    fn from(outcome: Option<ReconcileSummary>) -> Self {
        Self {
            skipped: outcome.is_none(),
            summary: outcome.unwrap_or_default(),
        }
    }
}

/// One reconciliation pass. Ctrl-C cancels outstanding requests; whatever
/// was already applied stays applied.
pub fn run(config: &SyncConfig, inputs: SyncInputs, json: bool) -> anyhow::Result<()> {
    let rt = tokio::runtime::Runtime::new()?;

    rt.block_on(async move {
        let cancel = CancellationToken::new();
        let on_signal = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupted, cancelling outstanding requests");
                on_signal.cancel();
            }
        });

        let outcome = run_async(config, &inputs, cancel).await?;
        if json {
            print_json(&SyncReport::from(outcome))?;
        }
        Ok(())
    })
}

/// Returns `None` when the tracker could not be listed completely and
/// nothing was reconciled.
pub async fn run_async(
    config: &SyncConfig,
    inputs: &SyncInputs,
    cancel: CancellationToken,
) -> anyhow::Result<Option<ReconcileSummary>> {
    let team = Roster::load(&inputs.roster.people, &inputs.roster.team)
        .context("error fetching team information")?
        .team_members();
    tracing::info!(members = team.len(), "loaded team");

    let tag = TicketTag::new(&config.source.repo_tag)?;
    let tracker = &config.tracker;

    let jira = JiraClient::new(&tracker.base_url, inputs.jira_token.clone())?
        .with_max_throttle_retries(tracker.max_throttle_retries)
        .with_cancellation(cancel.clone());
    let github = GithubSource::new(
        &config.source.api_url,
        &config.source.repository,
        inputs.github_token.clone(),
        config.source.page_size,
    );

    // Fetching starts now; the reconciler only drains it once the index is built.
    let items = assigned_to_team(github.fetch_issues(cancel), team);

    tracing::info!(query = %tracker.query, "indexing Jira tickets");
    let index = match build_index(jira.search(&tracker.query, tracker.page_size), &tag).await {
        Ok(index) => index,
        Err(IndexError::Incomplete(e)) => {
            tracing::error!(error = %e, "error fetching Jira tickets, skipping reconciliation");
            return Ok(None);
        }
        Err(e) => return Err(e).context("error indexing Jira tickets"),
    };
    if index.is_empty() {
        tracing::info!("no Jira tickets carry a GitHub tag yet");
    } else {
        tracing::info!(issues = ?index.numbers(), "GitHub issues already in Jira");
    }

    let summary = Reconciler::new(&jira, &index, &tag, tracker).run(items).await;
    tracing::info!(
        processed = summary.processed,
        created = summary.created,
        closed = summary.closed,
        reopened = summary.reopened,
        unchanged = summary.unchanged,
        failed = summary.failed,
        "reconciliation finished"
    );
    Ok(Some(summary))
}

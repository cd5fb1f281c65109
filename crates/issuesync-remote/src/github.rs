use std::sync::OnceLock;

use issuesync_core::types::SourceItem;
use regex::Regex;
use reqwest::header::{HeaderMap, ACCEPT, LINK, USER_AGENT};
use reqwest::{StatusCode, Url};
use tokio_util::sync::CancellationToken;

use crate::error::RemoteError;
use crate::stream::ItemStream;
use crate::types::GithubIssue;
use crate::Result;

const SERVICE: &str = "GitHub";
const API_VERSION: &str = "2022-11-28";
const TEXT_MEDIA_TYPE: &str = "application/vnd.github.text+json";

static NEXT_LINK_RE: OnceLock<Regex> = OnceLock::new();

fn next_link_re() -> &'static Regex {
    NEXT_LINK_RE.get_or_init(|| {
        Regex::new(r#"<(\S+)>; rel="next""#).expect("next-link pattern is valid")
    })
}

/// URL of the next page advertised in a `link` header, if any.
pub fn next_link(headers: &HeaderMap) -> Option<String> {
    let link = headers.get(LINK)?.to_str().ok()?;
    next_link_re()
        .captures(link)
        .map(|caps| caps[1].to_string())
}

// ─── GithubSource ─────────────────────────────────────────────────────────

/// Reads every issue (open and closed) of one repository.
#[derive(Debug, Clone)]
pub struct GithubSource {
    http: reqwest::Client,
    api_url: String,
    repository: String,
    token: String,
    page_size: u32,
}

impl GithubSource {
    pub fn new(
        api_url: impl Into<String>,
        repository: impl Into<String>,
        token: impl Into<String>,
        page_size: u32,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url: api_url.into(),
            repository: repository.into(),
            token: token.into(),
            page_size,
        }
    }

    /// First page of the issue listing.
    pub fn issues_url(&self) -> String {
        format!(
            "{}/repos/{}/issues?per_page={}",
            self.api_url.trim_end_matches('/'),
            self.repository,
            self.page_size
        )
    }

    /// Stream every issue of the repository, pull requests excluded.
    ///
    /// Pages are followed through the `rel="next"` link until a response
    /// advertises none. The first error is sent as the final item; nothing is
    /// retried.
    pub fn fetch_issues(&self, cancel: CancellationToken) -> ItemStream<Result<SourceItem>> {
        let source = self.clone();
        ItemStream::spawn(move |tx| async move {
            let mut next = Some(source.issues_url());
            let mut pages = 0usize;
            let mut emitted = 0usize;
            let mut pull_requests = 0usize;

            while let Some(url) = next.take() {
                let page = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => Err(RemoteError::Cancelled),
                    page = source.fetch_page(&url) => page,
                };
                let (issues, link) = match page {
                    Ok(p) => p,
                    Err(e) => {
                        let _ = tx.send(Err(e)).await;
                        return;
                    }
                };
                pages += 1;
                tracing::debug!(page = pages, count = issues.len(), "incoming batch of GitHub issues");

                for issue in issues {
                    let item = SourceItem::from(issue);
                    if item.is_pull_request {
                        pull_requests += 1;
                        continue;
                    }
                    if tx.send(Ok(item)).await.is_err() {
                        return; // Receiver dropped
                    }
                    emitted += 1;
                }
                next = link;
            }

            tracing::info!(
                repository = %source.repository,
                pages,
                issues = emitted,
                pull_requests,
                "fetched GitHub issues"
            );
        })
    }

    async fn fetch_page(&self, url: &str) -> Result<(Vec<GithubIssue>, Option<String>)> {
        let url = with_state_all(url)?;
        let mut req = self
            .http
            .get(url)
            .header(USER_AGENT, concat!("issuesync/", env!("CARGO_PKG_VERSION")))
            .header(ACCEPT, TEXT_MEDIA_TYPE)
            .header("X-GitHub-Api-Version", API_VERSION);
        if !self.token.is_empty() {
            req = req.bearer_auth(&self.token);
        }

        let res = req.send().await?;
        let status = res.status();
        let link = next_link(res.headers());
        let bytes = res.bytes().await?;

        if status != StatusCode::OK {
            return Err(RemoteError::Status {
                service: SERVICE,
                status: status.as_u16(),
                body: String::from_utf8_lossy(&bytes).into_owned(),
            });
        }

        let issues: Vec<GithubIssue> = serde_json::from_slice(&bytes)
            .map_err(|source| RemoteError::Decode {
                service: SERVICE,
                source,
            })?;
        Ok((issues, link))
    }
}

/// Parse `url`, adding `state=all` unless a state filter is already present.
fn with_state_all(url: &str) -> Result<Url> {
    let mut url = Url::parse(url).map_err(|e| RemoteError::InvalidUrl(format!("{url}: {e}")))?;
    if !url.query_pairs().any(|(k, _)| k == "state") {
        url.query_pairs_mut().append_pair("state", "all");
    }
    Ok(url)
}

// ─── Tests ────────────────────────────────────────────────────────────────

use std::time::Duration;

use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Request, Response, StatusCode, Url};
use tokio_util::sync::CancellationToken;

use crate::error::RemoteError;
use crate::stream::ItemStream;
use crate::types::{NewTicket, SearchPage, TrackerIssue, Transition, TransitionList};
use crate::Result;

const SERVICE: &str = "Jira";

/// Wait applied to a 429 response without a usable `retry-after` header.
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(1);

/// How long a throttled response asks us to wait before retrying.
pub fn retry_after(headers: &HeaderMap) -> Duration {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_RETRY_AFTER)
}

// ─── JiraClient ───────────────────────────────────────────────────────────

/// Bearer-authenticated Jira REST v2 client.
///
/// Every request goes through [`JiraClient::send`], which waits out
/// `429 Too Many Requests` responses and replays the same request.
#[derive(Debug, Clone)]
pub struct JiraClient {
    http: reqwest::Client,
    base_url: Url,
    token: String,
    max_throttle_retries: Option<u32>,
    cancel: CancellationToken,
}

impl JiraClient {
    pub fn new(base_url: &str, token: impl Into<String>) -> Result<Self> {
        // Url::join drops the last path segment unless it ends with '/'
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{base_url}/")
        };
        let base_url = Url::parse(&normalized)
            .map_err(|e| RemoteError::InvalidUrl(format!("{normalized}: {e}")))?;
        Ok(Self {
            http: reqwest::Client::new(),
            base_url,
            token: token.into(),
            max_throttle_retries: None,
            cancel: CancellationToken::new(),
        })
    }

    /// Give up on a request after `max` throttled attempts. `None` retries
    /// without limit.
    pub fn with_max_throttle_retries(mut self, max: Option<u32>) -> Self {
        self.max_throttle_retries = max;
        self
    }

    /// Abort in-flight requests and throttle waits once `cancel` fires.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| RemoteError::InvalidUrl(format!("{path}: {e}")))
    }

    /// Execute `request`, retrying while the server answers 429.
    pub async fn send(&self, request: Request) -> Result<Response> {
        let mut throttled = 0u32;
        loop {
            let attempt = request
                .try_clone()
                .ok_or_else(|| RemoteError::Replay(request.url().to_string()))?;

            let res = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(RemoteError::Cancelled),
                res = self.http.execute(attempt) => res?,
            };
            if res.status() != StatusCode::TOO_MANY_REQUESTS {
                return Ok(res);
            }

            if let Some(max) = self.max_throttle_retries {
                if throttled >= max {
                    return Err(RemoteError::ThrottleExhausted(max));
                }
            }
            throttled += 1;

            let wait = retry_after(res.headers());
            tracing::warn!(
                url = %request.url(),
                wait_secs = wait.as_secs(),
                attempt = throttled,
                "throttled by Jira"
            );
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(RemoteError::Cancelled),
                _ = tokio::time::sleep(wait) => {}
            }
        }
    }

    // ─── Search ───────────────────────────────────────────────────────────

    /// Stream every ticket matching `jql`, `page_size` at a time.
    ///
    /// Pages are requested with an advancing `startAt` until it reaches the
    /// `total` the server reports. A status outside 200/202/204 or any other
    /// error is sent as the final item.
    pub fn search(&self, jql: &str, page_size: u32) -> ItemStream<Result<TrackerIssue>> {
        let client = self.clone();
        let jql = jql.to_string();
        ItemStream::spawn(move |tx| async move {
            let (mut last, mut total) = (0u64, 1u64);
            while last < total {
                let page = match client.search_page(&jql, last, page_size).await {
                    Ok(p) => p,
                    Err(e) => {
                        let _ = tx.send(Err(e)).await;
                        return;
                    }
                };
                let received = page.issues.len() as u64;
                tracing::info!(
                    count = received,
                    start_at = page.start_at,
                    total = page.total,
                    "incoming batch of Jira tickets"
                );

                for issue in page.issues {
                    if tx.send(Ok(issue)).await.is_err() {
                        return; // Receiver dropped
                    }
                }

                last = page.start_at + received;
                total = page.total;
                if received == 0 {
                    break;
                }
            }
        })
    }

    async fn search_page(&self, jql: &str, start_at: u64, page_size: u32) -> Result<SearchPage> {
        let request = self
            .http
            .get(self.endpoint("rest/api/2/search")?)
            .bearer_auth(&self.token)
            .query(&[
                ("jql", jql.to_string()),
                ("startAt", start_at.to_string()),
                ("maxResults", page_size.to_string()),
            ])
            .build()?;

        let res = self.send(request).await?;
        let status = res.status();
        let bytes = res.bytes().await?;
        match status {
            StatusCode::OK | StatusCode::ACCEPTED | StatusCode::NO_CONTENT => {}
            _ => {
                return Err(RemoteError::Status {
                    service: SERVICE,
                    status: status.as_u16(),
                    body: String::from_utf8_lossy(&bytes).into_owned(),
                })
            }
        }
        if bytes.is_empty() {
            return Ok(SearchPage::default());
        }
        decode(&bytes)
    }

    // ─── Mutations ────────────────────────────────────────────────────────

    /// Create a ticket; returns its key (and id).
    pub async fn create(&self, ticket: &NewTicket) -> Result<TrackerIssue> {
        let request = self
            .http
            .post(self.endpoint("rest/api/2/issue")?)
            .bearer_auth(&self.token)
            .json(&ticket.to_request_body())
            .build()?;
        let bytes = success_body(self.send(request).await?).await?;
        decode(&bytes)
    }

    /// Transitions currently available from the ticket's status.
    pub async fn transitions(&self, key: &str) -> Result<Vec<Transition>> {
        let request = self
            .http
            .get(self.endpoint(&format!("rest/api/2/issue/{key}/transitions"))?)
            .bearer_auth(&self.token)
            .build()?;
        let bytes = success_body(self.send(request).await?).await?;
        let list: TransitionList = decode(&bytes)?;
        Ok(list.transitions)
    }

    /// Move the ticket through the transition with the given id.
    pub async fn apply_transition(&self, key: &str, transition_id: &str) -> Result<()> {
        let request = self
            .http
            .post(self.endpoint(&format!("rest/api/2/issue/{key}/transitions"))?)
            .bearer_auth(&self.token)
            .json(&serde_json::json!({ "transition": { "id": transition_id } }))
            .build()?;
        success_body(self.send(request).await?).await?;
        Ok(())
    }
}

/// Body of a 2xx response, or a `Status` error carrying the body text.
async fn success_body(res: Response) -> Result<Vec<u8>> {
    let status = res.status();
    let bytes = res.bytes().await?;
    if !status.is_success() {
        return Err(RemoteError::Status {
            service: SERVICE,
            status: status.as_u16(),
            body: String::from_utf8_lossy(&bytes).into_owned(),
        });
    }
    Ok(bytes.to_vec())
}

fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    serde_json::from_slice(bytes).map_err(|source| RemoteError::Decode {
        service: SERVICE,
        source,
    })
}

// ─── Tests ────────────────────────────────────────────────────────────────

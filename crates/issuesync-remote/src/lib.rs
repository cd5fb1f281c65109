//! `issuesync-remote`: the two HTTP services issuesync talks to.
//!
//! # Architecture
//!
//! ```text
//! GithubSource::fetch_issues ── ItemStream<Result<SourceItem>>
//!     paginates via the `link: <…>; rel="next"` header, drops pull requests
//!
//! JiraClient
//!     send()      ← every request; waits out 429s using `retry-after`
//!     search()    ── ItemStream<Result<TrackerIssue>>, paginates on startAt/total
//!     create() / transitions() / apply_transition()
//! ```
//!
//! Each stream is fed by a single background task through a tokio mpsc
//! channel and is read by exactly one consumer. Both producers and the
//! throttle wait stop when the shared `CancellationToken` is cancelled.

pub mod error;
pub mod github;
pub mod jira;
pub mod stream;
pub mod types;

pub use error::RemoteError;
pub use github::GithubSource;
pub use jira::JiraClient;
pub use stream::ItemStream;
pub use types::{NewTicket, TrackerIssue, Transition};

/// Convenience `Result` alias for this crate.
pub type Result<T> = std::result::Result<T, RemoteError>;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("status code {status} from {service}: {body}")]
    Status {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("error decoding {service} response: {source}")]
    Decode {
        service: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("request cannot be replayed: {0}")]
    Replay(String),

    #[error("still throttled after {0} retries")]
    ThrottleExhausted(u32),

    #[error("cancelled")]
    Cancelled,
}

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("error decoding {document}: {source}")]
    Roster {
        document: &'static str,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("could not parse the issue number in ticket summary '{summary}'")]
    MalformedTicketNumber { summary: String },

    #[error("invalid ticket tag pattern: {0}")]
    InvalidTagPattern(#[from] regex::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, SyncError>;

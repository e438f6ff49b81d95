mod source;
mod destination;
mod sync;

pub use source::*;
pub use destination::*;
pub use sync::*;

#[derive(Debug, thiserror::Error)]
pub enum MirrorError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("API request failed with status {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Rate limited by upstream")]
    RateLimited,

    #[error("Translation error: {0}")]
    Translation(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("A sync run is already in progress")]
    RunInProgress,

    #[error("Sync error: {0}")]
    Sync(String),
}

pub type Result<T> = std::result::Result<T, MirrorError>;

/// Shortens a response body for log fields.
pub(crate) fn body_preview(body: &str) -> String {
    body.chars().take(200).collect()
}

//! Errors raised while talking to the content source

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ContentError {
    /// The request URL is stripped along with its access token
    #[error("HTTP error: {0}")]
    Http(#[source] reqwest::Error),

    #[error("Unexpected status {status} from {url}")]
    Status { status: u16, url: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Malformed document {id}: {reason}")]
    Malformed { id: String, reason: String },

    #[error("Repository has no master ref")]
    NoMasterRef,
}

impl From<reqwest::Error> for ContentError {
    fn from(err: reqwest::Error) -> Self {
        ContentError::Http(err.without_url())
    }
}

pub type Result<T> = std::result::Result<T, ContentError>;

//! Error taxonomy for show resolution.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ResolveError>;

/// Errors that abort resolution of a single descriptor.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The descriptor matches none of the accepted shapes.
    #[error("Invalid descriptor: {0}")]
    InvalidDescriptor(String),

    /// The fetcher returned no content for the URL.
    #[error("No HTML returned: {url}")]
    FetchFailed { url: String },

    /// The page lacks the information needed to build a show.
    #[error("Malformed document {url}: {reason}")]
    MalformedDocument { url: String, reason: String },

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("Selector error: {0}")]
    Selector(String),
}

impl ResolveError {
    pub fn malformed(url: &str, reason: impl Into<String>) -> Self {
        Self::MalformedDocument {
            url: url.to_string(),
            reason: reason.into(),
        }
    }
}

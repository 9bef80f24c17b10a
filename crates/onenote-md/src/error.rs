use std::path::PathBuf;

use onenote_md_core::cache::CacheError;

#[derive(thiserror::Error, Debug)]
#[allow(clippy::enum_variant_names)]
pub enum Error {
    #[error("Authentication failed: {0}. Get a fresh access token and try again")]
    Auth(String),

    #[error("Network error: {0}")]
    TransientNetwork(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Graph API error [{status}]: {body}")]
    Api { status: u16, body: String },

    #[error("Failed to decode Graph API response: {0}")]
    Decode(String),

    /// A URL that cannot be requested, such as a relative image path
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// Errors that end the whole run instead of skipping a single page
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::Auth(_) | Error::Io { .. } | Error::Cache(_) | Error::Config(_)
        )
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

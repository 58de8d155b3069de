// ⚠️ Fetch Errors - What can go wrong while acquiring the catalog

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    /// Network or transport failure (DNS, connect, timeout, reset)
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Server answered with a non-success status
    #[error("request to {url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    /// Body was not the shape we expected
    #[error("malformed response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    /// Fail-fast aggregation: at least one entry could not be resolved
    #[error("{failed} of {total} catalog entries failed to resolve: {first}")]
    Batch {
        failed: usize,
        total: usize,
        first: Box<FetchError>,
    },
}

impl FetchError {
    pub fn url(&self) -> Option<&str> {
        match self {
            FetchError::Transport { url, .. }
            | FetchError::Status { url, .. }
            | FetchError::Decode { url, .. } => Some(url),
            FetchError::Batch { first, .. } => first.url(),
        }
    }
}

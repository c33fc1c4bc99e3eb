use thiserror::Error;

#[derive(Error, Debug)]
pub enum EmbyError {
    #[error("Invalid API key or access denied")]
    Unauthorized,

    #[error("API error: status {status} from {url}")]
    Api { status: u16, url: String },

    #[error("Network error talking to {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Unexpected response body from {url}: {source}")]
    InvalidResponse {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl EmbyError {
    /// Only bad credentials need reconfiguration; everything else is retried by the
    /// next scheduled refresh.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, EmbyError::Unauthorized)
    }
}

pub type Result<T> = std::result::Result<T, EmbyError>;

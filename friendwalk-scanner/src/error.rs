use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Connection timeout: {url}")]
    Timeout { url: String },

    #[error("Bad response {status} from {url}")]
    BadResponse { status: u16, url: String },

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),
}

impl ScanError {
    /// Fetch-level failures that a crawl treats as "no data this round".
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ScanError::Timeout { .. }
                | ScanError::BadResponse { .. }
                | ScanError::HttpError(_)
                | ScanError::InvalidUrl(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ScanError>;

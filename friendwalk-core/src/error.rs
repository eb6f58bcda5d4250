use friendwalk_scanner::ScanError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CrawlError {
    #[error("Crawl database unavailable: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Media storage unavailable at {}: {source}", path.display())]
    MediaStorage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Authentication failed: {0}")]
    Authentication(#[source] ScanError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CrawlError>;

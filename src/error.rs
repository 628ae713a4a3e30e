use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Why a single page could not be rendered.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("webdriver: {0}")]
    WebDriver(#[from] thirtyfour::error::WebDriverError),
    #[error("no `{marker}` element appeared within {timeout:?}")]
    NotReady { marker: String, timeout: Duration },
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
    #[error("cancelled")]
    Cancelled,
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to render listing {url}: {source}")]
    Listing {
        url: String,
        #[source]
        source: RenderError,
    },
    #[error("failed to render company {slug} ({url}): {source}")]
    Company {
        slug: String,
        url: String,
        #[source]
        source: RenderError,
    },
}

/// No usable snapshot on disk. Always recoverable by scraping afresh.
#[derive(Debug, Error)]
pub enum CacheMiss {
    #[error("no cache at {}", path.display())]
    Absent { path: PathBuf },
    #[error("cache at {} is unreadable: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cache at {} is malformed: {source}", path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("cache at {} is invalid: {reason}", path.display())]
    Invalid { path: PathBuf, reason: String },
}

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("failed to encode cache: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("failed to write cache {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

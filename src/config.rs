use std::path::PathBuf;
use std::time::Duration;

use chrono::TimeDelta;

pub const SITE_URL: &str = "https://startups.gallery";
pub const TITLE_SUFFIX: &str = " | startups.gallery";
pub const CACHE_FILE_NAME: &str = "startups_cache.json";

/// Most companies a single refresh will visit.
pub const MAX_COMPANIES: usize = 20;

pub const DEFAULT_WEBDRIVER_URL: &str = "http://localhost:9515";
pub const DEFAULT_CONCURRENCY: usize = 4;
pub const DEFAULT_TIMEOUT_SECS: u64 = 20;

pub fn freshness_window() -> TimeDelta {
    TimeDelta::hours(24)
}

pub fn listing_url() -> String {
    SITE_URL.to_string()
}

pub fn detail_url(slug: &str) -> String {
    format!("{}/companies/{}", SITE_URL, slug)
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub webdriver_url: String,
    pub cache_path: PathBuf,
    pub concurrency: usize,
    pub page_timeout: Duration,
    pub headless: bool,
    pub force_refresh: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            webdriver_url: DEFAULT_WEBDRIVER_URL.to_string(),
            cache_path: default_cache_path(),
            concurrency: DEFAULT_CONCURRENCY,
            page_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            headless: true,
            force_refresh: false,
        }
    }
}

impl Settings {
    /// Worker count actually used: at least one, never more than the company cap.
    pub fn workers(&self) -> usize {
        self.concurrency.clamp(1, MAX_COMPANIES)
    }
}

pub fn default_cache_path() -> PathBuf {
    // XDG cache directory, or the working directory when there is no home
    if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "startups") {
        proj_dirs.cache_dir().join(CACHE_FILE_NAME)
    } else {
        PathBuf::from(CACHE_FILE_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detail_url_appends_slug() {
        assert_eq!(detail_url("acme"), "https://startups.gallery/companies/acme");
    }

    #[test]
    fn test_workers_clamped() {
        let mut settings = Settings::default();
        settings.concurrency = 0;
        assert_eq!(settings.workers(), 1);
        settings.concurrency = 64;
        assert_eq!(settings.workers(), MAX_COMPANIES);
        settings.concurrency = 6;
        assert_eq!(settings.workers(), 6);
    }

    #[test]
    fn test_default_cache_path_file_name() {
        assert!(default_cache_path().ends_with(CACHE_FILE_NAME));
    }
}

use std::time::Duration;

use async_trait::async_trait;
use thirtyfour::prelude::*;
use thirtyfour::ChromiumLikeCapabilities;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::{self, Settings, TITLE_SUFFIX};
use crate::detail::parse_detail;
use crate::error::{FetchError, RenderError};
use crate::extract::company_name;
use crate::listing::{parse_previews, COMPANY_LINK_SELECTOR};
use crate::models::{CompanyPreview, RawDetailContent};

const READY_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// What has to be on screen before a page is read.
#[derive(Debug, Clone, Copy)]
enum Readiness {
    /// An element matching this CSS selector exists.
    Marker(&'static str),
    /// The title names a company and that name stands on its own body line.
    CompanyPage,
}

impl Readiness {
    fn describe(self) -> String {
        match self {
            Readiness::Marker(selector) => selector.to_string(),
            Readiness::CompanyPage => format!("title ending in `{}` with the name in the body", TITLE_SUFFIX),
        }
    }
}

/// The line scan in the extractor starts at the name line, so a detail page is only
/// worth reading once the title carries the name and the body shows it.
fn company_page_ready(title: &str, body_text: &str) -> bool {
    if !title.ends_with(TITLE_SUFFIX) {
        return false;
    }
    let name = company_name(title);
    let name = name.trim();
    !name.is_empty() && body_text.lines().any(|line| line.trim() == name)
}

/// Where company pages come from.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Deduplicated previews from the listing page, in first-seen order.
    async fn fetch_listing(&self) -> Result<Vec<CompanyPreview>, FetchError>;

    /// Raw content of one company's detail page.
    async fn fetch_detail(&self, slug: &str) -> Result<RawDetailContent, FetchError>;
}

/// Renders pages in Chrome through a WebDriver endpoint (e.g. chromedriver).
pub struct Browser {
    webdriver_url: String,
    page_timeout: Duration,
    headless: bool,
    cancel: CancellationToken,
}

struct RenderedPage {
    title: String,
    body_text: String,
    html: String,
}

impl Browser {
    /// Page loads in flight when `cancel` fires stop waiting and close their session.
    pub fn new(settings: &Settings, cancel: CancellationToken) -> Self {
        Self {
            webdriver_url: settings.webdriver_url.clone(),
            page_timeout: settings.page_timeout,
            headless: settings.headless,
            cancel,
        }
    }

    async fn open_session(&self) -> Result<WebDriver, RenderError> {
        let mut caps = DesiredCapabilities::chrome();
        if self.headless {
            caps.set_headless()?;
        }
        let driver = WebDriver::new(self.webdriver_url.as_str(), caps).await?;
        Ok(driver)
    }

    /// Load `url` in a fresh session and wait until it is `ready`.
    /// Once a session is open it is closed whether rendering succeeded, failed or was cancelled.
    async fn render(&self, url: &str, ready: Readiness) -> Result<RenderedPage, RenderError> {
        let driver = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(RenderError::Cancelled),
            driver = self.open_session() => driver?,
        };

        let result = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(RenderError::Cancelled),
            result = self.render_in(&driver, url, ready) => result,
        };

        if let Err(e) = driver.quit().await {
            warn!(url, error = %e, "failed to close browser session");
        }
        result
    }

    async fn render_in(
        &self,
        driver: &WebDriver,
        url: &str,
        ready: Readiness,
    ) -> Result<RenderedPage, RenderError> {
        driver.set_page_load_timeout(self.page_timeout).await?;

        debug!(url, "navigating");
        driver.goto(url).await?;

        match ready {
            Readiness::Marker(selector) => {
                driver
                    .query(By::Css(selector))
                    .wait(self.page_timeout, READY_POLL_INTERVAL)
                    .first()
                    .await
                    .map_err(|_| self.not_ready(ready))?;
            }
            Readiness::CompanyPage => self.wait_for_company_page(driver).await?,
        }

        let title = driver.title().await?;
        let body_text = driver.find(By::Tag("body")).await?.text().await?;
        let html = driver.source().await?;

        Ok(RenderedPage {
            title,
            body_text,
            html,
        })
    }

    async fn wait_for_company_page(&self, driver: &WebDriver) -> Result<(), RenderError> {
        let deadline = Instant::now() + self.page_timeout;
        loop {
            let title = driver.title().await?;
            let body_text = driver.find(By::Tag("body")).await?.text().await?;
            if company_page_ready(&title, &body_text) {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(self.not_ready(Readiness::CompanyPage));
            }
            tokio::time::sleep(READY_POLL_INTERVAL).await;
        }
    }

    fn not_ready(&self, ready: Readiness) -> RenderError {
        RenderError::NotReady {
            marker: ready.describe(),
            timeout: self.page_timeout,
        }
    }
}

#[async_trait]
impl PageSource for Browser {
    async fn fetch_listing(&self) -> Result<Vec<CompanyPreview>, FetchError> {
        let url = config::listing_url();
        let page = self
            .render(&url, Readiness::Marker(COMPANY_LINK_SELECTOR))
            .await
            .map_err(|source| FetchError::Listing {
                url: url.clone(),
                source,
            })?;

        let previews = parse_previews(&page.html);
        info!(count = previews.len(), "found companies on listing page");
        Ok(previews)
    }

    async fn fetch_detail(&self, slug: &str) -> Result<RawDetailContent, FetchError> {
        let url = config::detail_url(slug);
        let to_fetch_error = |source: RenderError| FetchError::Company {
            slug: slug.to_string(),
            url: url.clone(),
            source,
        };

        let page_url = Url::parse(&url).map_err(|e| to_fetch_error(e.into()))?;
        let page = self
            .render(&url, Readiness::CompanyPage)
            .await
            .map_err(to_fetch_error)?;

        debug!(slug, chars = page.body_text.len(), "rendered detail page");
        Ok(parse_detail(&page_url, &page.title, &page.body_text, &page.html))
    }
}

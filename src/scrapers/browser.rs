use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use headless_chrome::{Browser, LaunchOptions, Tab};
use tracing::{debug, info, warn};

use crate::models::ScrapeRecord;
use crate::scrapers::parse;
use crate::scrapers::traits::{Fetch, ListingSource, SourceError, WalkMode};

/// How long a page gets to settle after navigation.
const SETTLE: Duration = Duration::from_secs(2);
/// Polling step while waiting for an element to render.
const WAIT_STEP: Duration = Duration::from_millis(500);
/// Attempts per bounded wait (~10s budget, like the site's slowest renders).
const WAIT_ATTEMPTS: u32 = 20;

/// Listing source backed by a headless Chrome session.
///
/// One instance holds one logged-in browser for the duration of a cycle.
/// All waiting is bounded polling: an element that does not render within
/// the budget surfaces as [`Fetch::NotReady`], never as a hang.
pub struct BrowserSource {
    #[allow(dead_code)]
    browser: Browser,
    tab: Arc<Tab>,
    base_url: String,
    listing_url: String,
}

impl BrowserSource {
    pub fn new(base_url: &str) -> Result<Self> {
        info!("Launching headless Chrome...");

        let options = LaunchOptions::default_builder()
            .headless(true)
            .build()
            .context("Failed to build launch options")?;

        let browser = Browser::new(options).context("Failed to launch Chrome browser")?;
        let tab = browser.new_tab()?;

        let base_url = base_url.trim_end_matches('/').to_string();
        let listing_url = format!(
            "{base_url}/find-apartment/apply-for-apartment/available-apartments/?paginationantal=all"
        );

        Ok(Self {
            browser,
            tab,
            base_url,
            listing_url,
        })
    }

    /// Log into the site so detail pages expose the offering data.
    pub fn login(&self, username: &str, password: &str) -> Result<()> {
        info!("Opening {} and logging in...", self.base_url);

        self.tab.navigate_to(&self.base_url)?;
        self.tab.wait_until_navigated()?;
        thread::sleep(SETTLE);

        // The login form sits behind the my-pages trigger.
        self.tab.evaluate(
            r#"
            const trigger = document.querySelector('#mina-sidor-trigger');
            if (trigger) trigger.click();
            "#,
            false,
        )?;
        thread::sleep(SETTLE);

        let fill = format!(
            r#"
            document.querySelector('#user_login').value = '{}';
            document.querySelector('#user_pass').value = '{}';
            document.querySelector('#header-loginform button').click();
            "#,
            js_escape(username),
            js_escape(password),
        );
        self.tab.evaluate(&fill, false)?;
        self.tab.wait_until_navigated()?;
        thread::sleep(SETTLE);

        info!("Logged in");
        Ok(())
    }

    /// Navigate (back) to the all-items listing page.
    fn open_listing(&self) -> Result<()> {
        self.tab.navigate_to(&self.listing_url)?;
        self.tab.wait_until_navigated()?;
        thread::sleep(SETTLE);
        Ok(())
    }

    fn ensure_listing(&self) -> Result<()> {
        if self.tab.get_url() != self.listing_url {
            self.open_listing()?;
        }
        Ok(())
    }

    /// Capture the current page's HTML.
    fn page_html(&self) -> Result<String> {
        let result = self
            .tab
            .evaluate("document.documentElement.outerHTML", false)?;
        let html = result
            .value
            .as_ref()
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string();
        Ok(html)
    }

    /// Click into the detail page of the item at `position` and read its
    /// offering record. `Ok(None)` means the page never rendered within the
    /// wait budget.
    fn offering_at(&self, position: u32) -> Result<Option<ScrapeRecord>> {
        let click = format!(
            r#"
            const links = document.querySelectorAll('h4.ObjektAdress a');
            if (links.length >= {position}) links[{position} - 1].click();
            "#,
        );
        self.tab.evaluate(&click, false)?;

        for _ in 0..WAIT_ATTEMPTS {
            let html = self.page_html()?;
            if let Some(record) = parse::detail_offering(&html) {
                return Ok(Some(ScrapeRecord::Offering(record)));
            }
            thread::sleep(WAIT_STEP);
        }
        Ok(None)
    }
}

#[async_trait]
impl ListingSource for BrowserSource {
    async fn count(&self) -> Result<u32, SourceError> {
        self.open_listing()?;

        for _ in 0..WAIT_ATTEMPTS {
            let html = self.page_html()?;
            if let Some(count) = parse::listing_count(&html) {
                debug!(count, "listing count read");
                return Ok(count);
            }
            thread::sleep(WAIT_STEP);
        }

        Err(SourceError::Count(
            "listing summary never rendered".to_string(),
        ))
    }

    async fn item_at(&self, position: u32, mode: WalkMode) -> Result<Fetch, SourceError> {
        self.ensure_listing()?;

        let fetched = match mode {
            WalkMode::Metadata => {
                let html = self.page_html()?;
                parse::metadata_at(&html, position).map(ScrapeRecord::Metadata)
            }
            WalkMode::State => {
                let html = self.page_html()?;
                parse::state_at(&html, position, Utc::now()).map(ScrapeRecord::State)
            }
            WalkMode::Offering => {
                let record = self.offering_at(position)?;
                // Always return to the listing page, rendered or not.
                self.open_listing()?;
                record
            }
        };

        match fetched {
            Some(record) => Ok(Fetch::Item(record)),
            None => {
                warn!(position, ?mode, "item did not render, reloading listing");
                self.open_listing()?;
                Ok(Fetch::NotReady)
            }
        }
    }
}

fn js_escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

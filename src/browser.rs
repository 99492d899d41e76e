use std::sync::LazyLock;
use std::time::{Duration, Instant};

use anyhow::{anyhow, bail, Context, Result};
use chromiumoxide::{Browser, BrowserConfig, Element, Page};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::config::Config;
use crate::grid::GridSurface;

/// Tolerance for a single flaky cell read. Rows disappear mid-scroll; a
/// read that misses its window degrades to absence, not to a failure.
pub const CELL_READ_TIMEOUT: Duration = Duration::from_secs(1);

/// Pause after a scroll command so asynchronous re-rendering catches up
/// before the next read.
pub const SETTLE_DELAY: Duration = Duration::from_secs(2);

/// Initial page readiness. Not to be confused with the two above; the
/// three scales govern different failure modes.
pub const PAGE_LOAD_TIMEOUT: Duration = Duration::from_secs(30);

const POLL_INTERVAL: Duration = Duration::from_millis(250);

// ui-grid selectors for the Rentman tasks table.
const BODY_CONTAINER: &str = ".ui-grid-render-container-body";
const LEFT_CONTAINER: &str = ".ui-grid-render-container-left";
const BODY_ROWS: &str = ".ui-grid-render-container-body .ui-grid-row";
const VIEWPORT: &str = ".ui-grid-render-container-body .ui-grid-viewport";
const COMPLETED_CELL: &str = ".ui-grid-coluiGrid-000C .ui-grid-cell-contents__overflow-container";
const TITLE_CELL: &str = ".ui-grid-cell-contents--title-cell-contents";
const GRID_READY: &str = ".ui-grid-canvas .ui-grid-row";
const LOADING_INDICATOR: &str = "#rm-loading-indicator";

static SCROLL_TO_END_JS: LazyLock<String> = LazyLock::new(|| {
    format!(
        r#"(() => {{
    const viewport = document.querySelector('{VIEWPORT}');
    if (!viewport) return -1;
    viewport.scrollTop = viewport.scrollHeight;
    return viewport.scrollHeight;
}})()"#
    )
});

/// A Chromium instance plus the page all operations run on. The profile
/// directory is persistent, so an authenticated session carries across
/// runs.
pub struct Session {
    browser: Browser,
    events: JoinHandle<()>,
    pub page: Page,
}

impl Session {
    pub async fn launch(cfg: &Config, headed: bool) -> Result<Self> {
        let mut builder = BrowserConfig::builder()
            .user_data_dir(&cfg.user_data_dir)
            .no_sandbox()
            .window_size(1600, 1000);
        if headed {
            builder = builder.with_head();
        }
        let browser_cfg = builder.build().map_err(|e| anyhow!("browser config: {e}"))?;

        let (browser, mut handler) = Browser::launch(browser_cfg)
            .await
            .context("failed to launch Chromium")?;
        let events = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let page = browser.new_page("about:blank").await?;
        debug!("browser session ready (headed: {headed})");
        Ok(Self {
            browser,
            events,
            page,
        })
    }

    pub async fn close(mut self) -> Result<()> {
        self.browser.close().await?;
        let _ = self.browser.wait().await;
        self.events.abort();
        Ok(())
    }
}

/// Poll until `selector` resolves, within `timeout`.
pub async fn wait_for(page: &Page, selector: &str, timeout: Duration) -> Result<Element> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Ok(el) = page.find_element(selector).await {
            return Ok(el);
        }
        if Instant::now() >= deadline {
            bail!("timed out after {timeout:?} waiting for '{selector}'");
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

/// Poll until `selector` is absent or hidden, within `timeout`.
pub async fn wait_hidden(page: &Page, selector: &str, timeout: Duration) -> Result<()> {
    let probe = format!(
        "(() => {{ const el = document.querySelector('{selector}'); return !!(el && el.offsetParent !== null); }})()"
    );
    let deadline = Instant::now() + timeout;
    loop {
        if let Ok(result) = page.evaluate(probe.as_str()).await {
            if !result.into_value::<bool>().unwrap_or(true) {
                return Ok(());
            }
        }
        if Instant::now() >= deadline {
            bail!("timed out after {timeout:?} waiting for '{selector}' to disappear");
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

/// Click the first element matching `selector` whose text contains
/// `needle`. Retries until `timeout`; option lists render asynchronously.
pub async fn click_by_text(
    page: &Page,
    selector: &str,
    needle: &str,
    timeout: Duration,
) -> Result<()> {
    let deadline = Instant::now() + timeout;
    loop {
        for el in page.find_elements(selector).await.unwrap_or_default() {
            let text = el.inner_text().await.ok().flatten().unwrap_or_default();
            if text.contains(needle) {
                el.click().await?;
                return Ok(());
            }
        }
        if Instant::now() >= deadline {
            bail!("timed out after {timeout:?} waiting for '{selector}' containing {needle:?}");
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

/// Navigate to the tasks view and wait until the grid has rows.
pub async fn open_tasks_view(page: &Page, cfg: &Config) -> Result<()> {
    let url = cfg.tasks_url();
    info!("navigating to tasks view: {url}");
    page.goto(url.as_str()).await?;

    wait_hidden(page, LOADING_INDICATOR, PAGE_LOAD_TIMEOUT).await?;
    wait_for(page, GRID_READY, PAGE_LOAD_TIMEOUT)
        .await
        .context("task grid did not load")?;
    Ok(())
}

/// Live [`GridSurface`] over the Rentman tasks table.
pub struct RentmanGrid<'a> {
    page: &'a Page,
}

impl<'a> RentmanGrid<'a> {
    pub fn new(page: &'a Page) -> Self {
        Self { page }
    }
}

impl GridSurface for RentmanGrid<'_> {
    async fn visible_row_ids(&self) -> Result<Vec<Option<String>>> {
        let rows = self.page.find_elements(BODY_ROWS).await?;
        let mut ids = Vec::with_capacity(rows.len());
        for row in rows {
            let mut id = row.attribute("rowid").await.ok().flatten();
            if id.is_none() {
                // Some grid skins carry the rowid on an inner div rather
                // than the row element itself.
                if let Ok(inner) = row.find_element("div[rowid]").await {
                    id = inner.attribute("rowid").await.ok().flatten();
                }
            }
            ids.push(id);
        }
        Ok(ids)
    }

    async fn completed_text(&self, row_id: &str) -> Option<String> {
        let selector = format!(r#"{BODY_CONTAINER} div[rowid="{row_id}"] {COMPLETED_CELL}"#);
        let read = async {
            let el = self.page.find_element(selector).await.ok()?;
            el.inner_text().await.ok().flatten()
        };
        tokio::time::timeout(CELL_READ_TIMEOUT, read).await.ok().flatten()
    }

    async fn label_title(&self, row_id: &str) -> Option<String> {
        let selector = format!(r#"{LEFT_CONTAINER} div[rowid="{row_id}"] {TITLE_CELL}"#);
        let read = async {
            let el = self.page.find_element(selector).await.ok()?;
            el.attribute("title").await.ok().flatten()
        };
        tokio::time::timeout(CELL_READ_TIMEOUT, read).await.ok().flatten()
    }

    async fn scroll_to_end(&mut self) -> Result<i64> {
        let height = self
            .page
            .evaluate(SCROLL_TO_END_JS.as_str())
            .await?
            .into_value::<i64>()?;
        Ok(height)
    }

    async fn settle(&self) {
        tokio::time::sleep(SETTLE_DELAY).await;
    }
}

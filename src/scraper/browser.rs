//! Chromium-backed page driver.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::page::PrintToPdfParams;
use chromiumoxide::element::Element;
use chromiumoxide::error::CdpError;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use std::path::Path;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};

use super::{DriverError, PageDriver};
use crate::config::CrawlerConfig;

const POLL_INTERVAL: Duration = Duration::from_millis(200);

// ── Launch ────────────────────────────────────────────────────────────────────

/// Start the browser and drive its CDP event loop on a background task.
pub async fn launch(cfg: &CrawlerConfig) -> Result<(Browser, JoinHandle<()>)> {
    let mut builder = BrowserConfig::builder()
        .arg("--no-sandbox")
        .arg("--disable-setuid-sandbox")
        .arg("--disable-dev-shm-usage")
        .arg("--disable-gpu")
        .arg("--disable-notifications")
        .arg(format!("--user-agent={}", cfg.user_agent));

    if !cfg.headless {
        builder = builder.with_head();
    }
    if let Some(exe) = &cfg.chrome_executable {
        builder = builder.chrome_executable(exe);
    }

    let browser_cfg = builder
        .build()
        .map_err(|e| anyhow::anyhow!("Browser config error: {e}"))?;

    let (browser, mut handler) = Browser::launch(browser_cfg)
        .await
        .context("Browser launch failed")?;
    let events = tokio::spawn(async move { while handler.next().await.is_some() {} });

    info!("Browser launched (headless: {})", cfg.headless);
    Ok((browser, events))
}

/// A fresh blank tab wrapped as a [`PageDriver`].
pub async fn open_page(browser: &Browser) -> Result<ChromiumPage> {
    let page = browser
        .new_page("about:blank")
        .await
        .context("Failed to open browser tab")?;
    Ok(ChromiumPage { page })
}

// ── Driver ────────────────────────────────────────────────────────────────────

pub struct ChromiumPage {
    page: Page,
}

fn cdp(e: CdpError) -> DriverError {
    match e {
        CdpError::Ws(_) | CdpError::ChannelSendError(_) => DriverError::SessionClosed(e.to_string()),
        CdpError::NotFound => DriverError::Missing(e.to_string()),
        other => DriverError::Script(other.to_string()),
    }
}

#[async_trait]
impl PageDriver for ChromiumPage {
    type Node = Element;

    async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), DriverError> {
        debug!("navigating to {}", url);
        let nav = async {
            self.page.goto(url).await?;
            self.page.wait_for_navigation().await?;
            Ok::<_, CdpError>(())
        };
        match tokio::time::timeout(timeout, nav).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(match cdp(e) {
                DriverError::Script(reason) | DriverError::Missing(reason) => DriverError::Navigation {
                    url: url.to_string(),
                    reason,
                },
                fatal => fatal,
            }),
            Err(_) => Err(DriverError::NavigationTimeout {
                url: url.to_string(),
                ms: timeout.as_millis() as u64,
            }),
        }
    }

    async fn wait_for(&self, selector: &str, timeout: Duration) -> Result<(), DriverError> {
        let deadline = Instant::now() + timeout;
        loop {
            if !self.query_all(selector, None).await?.is_empty() {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(DriverError::MarkerTimeout {
                    selector: selector.to_string(),
                    ms: timeout.as_millis() as u64,
                });
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn query_all(&self, selector: &str, scope: Option<&Element>) -> Result<Vec<Element>, DriverError> {
        let found = match scope {
            Some(el) => el.find_elements(selector).await,
            None => self.page.find_elements(selector).await,
        };
        match found {
            Ok(nodes) => Ok(nodes),
            // querySelectorAll with no match can surface as NotFound
            Err(CdpError::NotFound) => Ok(Vec::new()),
            Err(e) => Err(cdp(e)),
        }
    }

    async fn text(&self, node: &Element) -> Result<String, DriverError> {
        Ok(node.inner_text().await.map_err(cdp)?.unwrap_or_default())
    }

    async fn attribute(&self, node: &Element, name: &str) -> Result<Option<String>, DriverError> {
        node.attribute(name).await.map_err(cdp)
    }

    async fn click(&self, node: &Element) -> Result<(), DriverError> {
        node.click().await.map_err(cdp)?;
        Ok(())
    }

    async fn type_text(&self, node: &Element, text: &str) -> Result<(), DriverError> {
        node.click().await.map_err(cdp)?;
        node.type_str(text).await.map_err(cdp)?;
        Ok(())
    }

    async fn scroll_to_bottom(&self) -> Result<(), DriverError> {
        self.page
            .evaluate("window.scrollBy(0, document.body.scrollHeight)")
            .await
            .map_err(cdp)?;
        Ok(())
    }

    async fn title(&self) -> Result<String, DriverError> {
        Ok(self.page.get_title().await.map_err(cdp)?.unwrap_or_default())
    }

    fn same_node(&self, a: &Element, b: &Element) -> bool {
        a.backend_node_id == b.backend_node_id
    }

    async fn save_pdf(&self, path: &Path) -> Result<(), DriverError> {
        let params = PrintToPdfParams {
            print_background: Some(true),
            ..Default::default()
        };
        self.page.save_pdf(params, path).await.map_err(cdp)?;
        debug!("snapshot saved to {:?}", path);
        Ok(())
    }
}

//! `PortalPage` over a Chromium tab
//!
//! Every call is preceded by the optional slow-motion pause and bounded
//! by the action timeout.

mod scripts;

use crate::error::PortalError;
use crate::page::{ControlDescriptor, ElementRef, InputDescriptor, Key, PortalPage, TableSnapshot};
use chromiumoxide::element::Element;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Page;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::future::Future;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, trace};

const IDLE_SAMPLE: Duration = Duration::from_millis(500);

/// A Chromium tab driven over CDP
#[derive(Debug, Clone)]
pub struct ChromiumPage {
    page: Page,
    action_timeout: Duration,
    slow_mo: Option<Duration>,
}

#[derive(Debug, Deserialize)]
struct IdleProbe {
    ready: bool,
    resources: u64,
}

impl ChromiumPage {
    pub(crate) fn new(page: Page, action_timeout: Duration, slow_mo: Option<Duration>) -> Self {
        Self {
            page,
            action_timeout,
            slow_mo,
        }
    }

    async fn bounded<T, F>(&self, action: &'static str, fut: F) -> Result<T, PortalError>
    where
        F: Future<Output = Result<T, PortalError>> + Send,
    {
        if let Some(pause) = self.slow_mo {
            tokio::time::sleep(pause).await;
        }
        trace!(action, "Portal call");
        tokio::time::timeout(self.action_timeout, fut)
            .await
            .map_err(|_| PortalError::ActionTimeout {
                action,
                timeout_ms: u64::try_from(self.action_timeout.as_millis()).unwrap_or(u64::MAX),
            })?
    }

    async fn element(&self, element: &ElementRef) -> Result<Element, PortalError> {
        self.page
            .find_element(scripts::selector(element.as_str()))
            .await
            .map_err(|_| PortalError::ElementDetached(element.to_string()))
    }

    async fn eval<T: DeserializeOwned>(&self, script: impl Into<String>) -> Result<T, PortalError> {
        let result = self.page.evaluate(script.into()).await?;
        Ok(result.into_value()?)
    }

    async fn eval_on(&self, element: &ElementRef, script: String) -> Result<(), PortalError> {
        let found: bool = self.eval(script).await?;
        if found {
            Ok(())
        } else {
            Err(PortalError::ElementDetached(element.to_string()))
        }
    }
}

#[async_trait::async_trait]
impl PortalPage for ChromiumPage {
    async fn goto(&self, url: &str) -> Result<(), PortalError> {
        self.bounded("goto", async {
            self.page.goto(url).await?;
            Ok(())
        })
        .await
    }

    async fn current_url(&self) -> Result<String, PortalError> {
        self.bounded("current_url", async {
            Ok(self.page.url().await?.unwrap_or_default())
        })
        .await
    }

    async fn page_text(&self) -> Result<String, PortalError> {
        self.bounded("page_text", self.eval(scripts::PAGE_TEXT)).await
    }

    async fn inputs(&self) -> Result<Vec<InputDescriptor>, PortalError> {
        self.bounded("inputs", self.eval(scripts::inputs())).await
    }

    async fn controls(&self) -> Result<Vec<ControlDescriptor>, PortalError> {
        self.bounded("controls", self.eval(scripts::controls())).await
    }

    async fn tables(&self) -> Result<Vec<TableSnapshot>, PortalError> {
        self.bounded("tables", self.eval(scripts::tables())).await
    }

    async fn click(&self, element: &ElementRef) -> Result<(), PortalError> {
        self.bounded("click", async {
            self.element(element).await?.click().await?;
            Ok(())
        })
        .await
    }

    async fn focus(&self, element: &ElementRef) -> Result<(), PortalError> {
        self.bounded("focus", async {
            self.element(element).await?.focus().await?;
            Ok(())
        })
        .await
    }

    async fn select_all(&self, element: &ElementRef) -> Result<(), PortalError> {
        self.bounded(
            "select_all",
            self.eval_on(element, scripts::select_all(element.as_str())),
        )
        .await
    }

    async fn press_key(&self, element: &ElementRef, key: Key) -> Result<(), PortalError> {
        self.bounded("press_key", async {
            self.element(element).await?.press_key(key.as_str()).await?;
            Ok(())
        })
        .await
    }

    async fn type_char(&self, element: &ElementRef, ch: char) -> Result<(), PortalError> {
        self.bounded("type_char", async {
            let mut buf = [0u8; 4];
            self.element(element)
                .await?
                .type_str(ch.encode_utf8(&mut buf))
                .await?;
            Ok(())
        })
        .await
    }

    async fn native_clear(&self, element: &ElementRef) -> Result<(), PortalError> {
        self.bounded(
            "native_clear",
            self.eval_on(element, scripts::native_clear(element.as_str())),
        )
        .await
    }

    async fn read_value(&self, element: &ElementRef) -> Result<String, PortalError> {
        self.bounded("read_value", async {
            let value: Option<String> = self.eval(scripts::read_value(element.as_str())).await?;
            value.ok_or_else(|| PortalError::ElementDetached(element.to_string()))
        })
        .await
    }

    async fn scroll_into_view(&self, element: &ElementRef) -> Result<(), PortalError> {
        self.bounded("scroll_into_view", async {
            self.element(element).await?.scroll_into_view().await?;
            Ok(())
        })
        .await
    }

    async fn scroll_to_bottom(&self) -> Result<(), PortalError> {
        self.bounded("scroll_to_bottom", async {
            let _: bool = self.eval(scripts::SCROLL_TO_BOTTOM).await?;
            Ok(())
        })
        .await
    }

    async fn wait_for_idle(&self) -> Result<(), PortalError> {
        // readyState complete and no new resource entries for one sample
        let deadline = tokio::time::Instant::now() + self.action_timeout;
        let mut last: Option<u64> = None;
        while tokio::time::Instant::now() < deadline {
            let probe: IdleProbe = self.bounded("idle_probe", self.eval(scripts::IDLE_PROBE)).await?;
            if probe.ready && last == Some(probe.resources) {
                return Ok(());
            }
            last = probe.ready.then_some(probe.resources);
            tokio::time::sleep(IDLE_SAMPLE).await;
        }
        debug!("Page never settled within the action timeout");
        Ok(())
    }

    async fn screenshot(&self, path: &Path) -> Result<(), PortalError> {
        self.bounded("screenshot", async {
            let params = ScreenshotParams::builder().full_page(true).build();
            self.page.save_screenshot(params, path).await?;
            Ok(())
        })
        .await
    }

    async fn close(&self) -> Result<(), PortalError> {
        self.bounded("close", async {
            self.page.clone().close().await?;
            Ok(())
        })
        .await
    }
}

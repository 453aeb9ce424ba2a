//! Chromiumoxide-backed [`LoginPage`] implementation.
//!
//! Selector waits poll `find_element` until the element exists (and, when
//! requested, renders with a non-empty box) or the wait times out. Dropping a
//! pending wait stops the polling.

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::element::Element;
use chromiumoxide::page::{Page, ScreenshotParams};
use serde_json::Value as JsonValue;
use tokio::time::{Instant, sleep};

use crate::config::WaitOptions;
use crate::page::{LoginPage, PageError};

const VISIBILITY_PROBE: &str = "function() {
    const style = window.getComputedStyle(this);
    const rect = this.getBoundingClientRect();
    return !!style
        && style.visibility !== 'hidden'
        && style.display !== 'none'
        && rect.width > 0
        && rect.height > 0;
}";

const PAGE_TEXT_SCRIPT: &str = "document.body ? document.body.innerText : ''";

fn cdp_error(err: impl std::fmt::Display) -> PageError {
    PageError::Cdp(err.to_string())
}

fn script_error(err: impl std::fmt::Display) -> PageError {
    PageError::Script(err.to_string())
}

/// Adapter that drives a chromiumoxide page on behalf of the login flow.
#[derive(Clone)]
pub struct ChromiumoxidePage {
    page: Page,
}

impl ChromiumoxidePage {
    pub fn new(page: Page) -> Self {
        Self { page }
    }

    pub fn inner(&self) -> &Page {
        &self.page
    }

    async fn find(&self, selector: &str) -> Result<Element, PageError> {
        self.page
            .find_element(selector)
            .await
            .map_err(|_| PageError::NotFound(selector.to_string()))
    }
}

impl From<Page> for ChromiumoxidePage {
    fn from(page: Page) -> Self {
        Self::new(page)
    }
}

async fn is_visible(element: &Element) -> Result<bool, PageError> {
    let returns = element
        .call_js_fn(VISIBILITY_PROBE, false)
        .await
        .map_err(cdp_error)?;
    Ok(returns
        .result
        .value
        .as_ref()
        .and_then(JsonValue::as_bool)
        .unwrap_or(false))
}

fn style_tag_script(css: &str) -> Result<String, PageError> {
    let css_json = serde_json::to_string(css).map_err(script_error)?;
    Ok(format!(
        "(function() {{
            const style = document.createElement('style');
            style.textContent = {css_json};
            (document.head || document.documentElement).appendChild(style);
            return true;
        }})()"
    ))
}

#[async_trait]
impl LoginPage for ChromiumoxidePage {
    type Element = Element;

    async fn wait_for_selector(
        &self,
        selector: &str,
        options: &WaitOptions,
    ) -> Result<Element, PageError> {
        let deadline = Instant::now() + options.timeout();
        loop {
            if let Ok(element) = self.page.find_element(selector).await {
                if !options.visible || is_visible(&element).await.unwrap_or(false) {
                    return Ok(element);
                }
            }

            if Instant::now() >= deadline {
                return Err(PageError::Timeout {
                    selector: selector.to_string(),
                    timeout_ms: options.timeout_ms,
                });
            }

            sleep(options.poll_interval()).await;
        }
    }

    async fn type_text(&self, selector: &str, text: &str) -> Result<(), PageError> {
        let element = self.find(selector).await?;
        element.click().await.map_err(cdp_error)?;
        element.type_str(text).await.map_err(cdp_error)?;
        Ok(())
    }

    async fn press_key(&self, key: &str) -> Result<(), PageError> {
        let element = match self.page.find_element(":focus").await {
            Ok(element) => element,
            Err(_) => self.find("body").await?,
        };
        element.press_key(key).await.map_err(cdp_error)?;
        Ok(())
    }

    async fn evaluate(&self, script: &str) -> Result<JsonValue, PageError> {
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(script_error)?;
        Ok(result.value().cloned().unwrap_or(JsonValue::Null))
    }

    /// Lookup failures of any kind are reported as an absent element.
    async fn query_selector(&self, selector: &str) -> Result<Option<Element>, PageError> {
        Ok(self.page.find_element(selector).await.ok())
    }

    async fn screenshot(&self) -> Result<Vec<u8>, PageError> {
        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .build();
        self.page.screenshot(params).await.map_err(cdp_error)
    }

    async fn text_content(&self) -> Result<String, PageError> {
        let result = self
            .page
            .evaluate(PAGE_TEXT_SCRIPT)
            .await
            .map_err(script_error)?;
        result.into_value::<String>().map_err(script_error)
    }

    async fn add_style_tag(&self, css: &str) -> Result<(), PageError> {
        let script = style_tag_script(css)?;
        self.page.evaluate(script.as_str()).await.map_err(script_error)?;
        Ok(())
    }
}

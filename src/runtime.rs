//! Chromiumoxide browser session used by the CLI and smoke tests.
//!
//! The session only attaches to a browser that is already running and exposes
//! a DevTools websocket; launching and configuring the browser process is left
//! to the caller.

use chromiumoxide::browser::Browser;
use futures_util::StreamExt;
use thiserror::Error;
use tokio::task::JoinHandle;

use crate::adapter::chromiumoxide::ChromiumoxidePage;

#[derive(Debug, Error)]
pub enum BrowserSessionError {
    #[error("failed to attach to browser at {url}: {message}")]
    Connect { url: String, message: String },
    #[error("failed to open {url}: {message}")]
    Navigate { url: String, message: String },
}

/// Attached browser plus the task pumping its CDP handler.
pub struct BrowserSession {
    browser: Browser,
    handler: JoinHandle<()>,
}

impl BrowserSession {
    /// Attach to a running browser via its DevTools websocket (or http) URL.
    pub async fn attach(url: &str) -> Result<Self, BrowserSessionError> {
        let (browser, handler) = Browser::connect(url)
            .await
            .map_err(|err| BrowserSessionError::Connect {
                url: url.to_string(),
                message: err.to_string(),
            })?;

        Ok(Self {
            browser,
            handler: spawn_handler(handler),
        })
    }

    /// Open `url` in a new tab and wait for the navigation to finish.
    pub async fn open_page(&self, url: &str) -> Result<ChromiumoxidePage, BrowserSessionError> {
        let navigate_error = |err: chromiumoxide::error::CdpError| BrowserSessionError::Navigate {
            url: url.to_string(),
            message: err.to_string(),
        };

        let page = self.browser.new_page(url).await.map_err(navigate_error)?;
        page.wait_for_navigation().await.map_err(navigate_error)?;
        Ok(ChromiumoxidePage::new(page))
    }

    /// Stop pumping CDP events. The browser process itself is left running.
    pub fn detach(self) {
        self.handler.abort();
    }
}

fn spawn_handler(mut handler: chromiumoxide::handler::Handler) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(result) = handler.next().await {
            if let Err(err) = result {
                log::debug!("chromiumoxide handler error: {err}");
            }
        }
    })
}

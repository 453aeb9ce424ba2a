//! Point-in-time page snapshots.
//!
//! A [`Snapshot`] is only ever compared for equality; two identical
//! consecutive captures are taken to mean the page stopped changing.

use std::path::{Path, PathBuf};

use base64::Engine as _;
use base64::engine::general_purpose;
use chrono::Utc;

use crate::config::{LoginOptions, ScreenshotMode, SnapshotKind};
use crate::logging::Logger;
use crate::page::{LoginPage, PageError};

/// Rule injected before every capture so a blinking caret cannot register as
/// a change.
pub const HIDE_CARET_CSS: &str = "* { caret-color: transparent !important; }";

/// Opaque, comparable capture of page state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Snapshot {
    /// Base64-encoded PNG.
    Image(String),
    Text(String),
}

/// The last two successful captures.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotPair {
    previous: Option<Snapshot>,
    current: Option<Snapshot>,
}

impl SnapshotPair {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shift `current` into `previous` and store `next`.
    pub fn push(&mut self, next: Snapshot) {
        self.previous = self.current.replace(next);
    }

    pub fn previous(&self) -> Option<&Snapshot> {
        self.previous.as_ref()
    }

    pub fn current(&self) -> Option<&Snapshot> {
        self.current.as_ref()
    }

    /// True once two successful captures exist and they are equal.
    pub fn is_settled(&self) -> bool {
        matches!(
            (&self.previous, &self.current),
            (Some(previous), Some(current)) if previous == current
        )
    }
}

/// Capture a snapshot of `page`, or `None` if any step fails.
pub async fn capture_snapshot<P: LoginPage + ?Sized>(
    page: &P,
    kind: SnapshotKind,
    logger: &dyn Logger,
) -> Option<Snapshot> {
    match try_capture(page, kind).await {
        Ok(snapshot) => Some(snapshot),
        Err(err) => {
            logger.debug(&format!("Snapshot capture skipped: {err}"));
            None
        }
    }
}

async fn try_capture<P: LoginPage + ?Sized>(
    page: &P,
    kind: SnapshotKind,
) -> Result<Snapshot, PageError> {
    page.add_style_tag(HIDE_CARET_CSS).await?;
    match kind {
        SnapshotKind::Image => {
            let png = page.screenshot().await?;
            Ok(Snapshot::Image(general_purpose::STANDARD.encode(png)))
        }
        SnapshotKind::Text => Ok(Snapshot::Text(page.text_content().await?)),
    }
}

/// Where and how [`display_snapshot`] surfaces a capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotDisplay {
    pub mode: ScreenshotMode,
    pub dir: PathBuf,
    pub prefix: String,
}

impl SnapshotDisplay {
    pub fn from_options(options: &LoginOptions) -> Self {
        Self {
            mode: options.screenshot,
            dir: options.screenshot_dir.clone(),
            prefix: options.screenshot_prefix.clone(),
        }
    }

    pub fn off() -> Self {
        Self {
            mode: ScreenshotMode::Off,
            dir: PathBuf::from("."),
            prefix: "screenshot".to_string(),
        }
    }
}

/// Surface the current page state per `display.mode`. Failures are reported
/// on the logger's error channel and never propagate.
pub async fn display_snapshot<P: LoginPage + ?Sized>(
    page: &P,
    display: &SnapshotDisplay,
    logger: &dyn Logger,
) {
    let result = match display.mode {
        ScreenshotMode::Off => return,
        ScreenshotMode::Log => page
            .text_content()
            .await
            .map(|text| logger.info(&format!("Page text:\n{}", text.trim()))),
        ScreenshotMode::File => save_screenshot(page, &display.dir, &display.prefix)
            .await
            .map(|path| logger.info(&format!("Saved a screenshot to {}", path.display()))),
    };

    if let Err(err) = result {
        logger.error(&format!("Failed to take a screenshot: {err}"));
    }
}

async fn save_screenshot<P: LoginPage + ?Sized>(
    page: &P,
    dir: &Path,
    prefix: &str,
) -> Result<PathBuf, PageError> {
    page.add_style_tag(HIDE_CARET_CSS).await?;
    let png = page.screenshot().await?;
    let path = dir.join(screenshot_file_name(prefix));
    tokio::fs::write(&path, png).await?;
    Ok(path)
}

/// `<prefix>-<UTC timestamp>.png`, millisecond resolution.
pub fn screenshot_file_name(prefix: &str) -> String {
    format!("{prefix}-{}.png", Utc::now().format("%Y%m%dT%H%M%S%.3fZ"))
}

//! Settle-wait: pause until the page stops visibly changing.
//!
//! After a code submission the page may redirect, spin or re-render. Two
//! identical consecutive snapshots are treated as "done transitioning". This
//! is a heuristic pause and never fails the caller.

use std::time::Duration;

use tokio::time::sleep;

use crate::config::SnapshotKind;
use crate::logging::Logger;
use crate::page::LoginPage;
use crate::snapshot::{SnapshotDisplay, SnapshotPair, capture_snapshot, display_snapshot};

/// Parameters for [`wait_for_trial`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrialSettings {
    pub trial_count: u32,
    pub trial_timeout: Duration,
    pub kind: SnapshotKind,
    pub display: SnapshotDisplay,
}

/// Poll snapshots until two consecutive captures match or `trial_count`
/// sleeps have elapsed. Returns the number of successful captures.
///
/// The first capture happens immediately; each later one is preceded by a
/// `trial_timeout` sleep. A failed capture leaves the pair untouched but
/// still consumes its iteration.
pub async fn wait_for_trial<P: LoginPage + ?Sized>(
    page: &P,
    settings: &TrialSettings,
    logger: &dyn Logger,
) -> u32 {
    let mut pair = SnapshotPair::new();
    let mut captured = 0;
    let trial_count = i64::from(settings.trial_count);

    let mut attempt: i64 = -1;
    while attempt < trial_count && !pair.is_settled() {
        if attempt > 0 {
            logger.warn(&format!("Changed on attempt {attempt}. Taking a screenshot..."));
            display_snapshot(page, &settings.display, logger).await;
        }
        if attempt > -1 {
            sleep(settings.trial_timeout).await;
        }
        if let Some(snapshot) = capture_snapshot(page, settings.kind, logger).await {
            pair.push(snapshot);
            captured += 1;
        }
        attempt += 1;
    }

    captured
}

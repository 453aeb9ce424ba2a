//! Login flow controller.
//!
//! Drives credential entry, detects a one-time code challenge, submits fresh
//! TOTP codes and polls until the caller's target element shows up or the
//! challenge budget runs out.
//!
//! ```text
//! email → Enter → password → Enter
//!   └─ attempt 0: race(target, code field)
//!        ├─ target wins → done
//!        └─ code field wins → attempt 1..n:
//!             warn, display, sleep (attempt ≥ 2), clear field, type code,
//!             Enter, settle-wait, race again
//! final: fresh lookup of target
//! ```

use std::sync::Arc;

use chrono::Utc;
use futures_util::future::{FutureExt, TryFutureExt, select_ok};
use thiserror::Error;
use tokio::time::sleep;

use crate::config::{Credentials, LoginOptions};
use crate::logging::{Logger, NoopLogger};
use crate::page::{LoginPage, PageError, clear_field_script};
use crate::settle::{TrialSettings, wait_for_trial};
use crate::snapshot::{SnapshotDisplay, display_snapshot};
use crate::totp::{TokenGenerator, Totp, TotpError};

const SUBMIT_KEY: &str = "Enter";

/// Errors that abort a login run.
///
/// Challenge exhaustion is not among them: it yields `Ok(None)`.
#[derive(Debug, Error)]
pub enum LoginError {
    #[error(transparent)]
    Page(#[from] PageError),
    #[error(transparent)]
    Totp(#[from] TotpError),
    #[error("failed to build page script: {0}")]
    Script(#[from] serde_json::Error),
}

/// Reusable login controller with an injected logger and code generator.
#[derive(Clone)]
pub struct LoginFlow {
    options: LoginOptions,
    logger: Arc<dyn Logger>,
    generator: Arc<dyn TokenGenerator>,
}

impl std::fmt::Debug for LoginFlow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginFlow")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Default for LoginFlow {
    fn default() -> Self {
        Self::new(LoginOptions::default())
    }
}

impl LoginFlow {
    pub fn new(options: LoginOptions) -> Self {
        Self {
            options,
            logger: Arc::new(NoopLogger),
            generator: Arc::new(Totp::default()),
        }
    }

    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn with_generator(mut self, generator: Arc<dyn TokenGenerator>) -> Self {
        self.generator = generator;
        self
    }

    pub fn options(&self) -> &LoginOptions {
        &self.options
    }

    /// Run the flow against `page` and return whatever matches `target`
    /// afterwards.
    pub async fn authenticate<P: LoginPage + ?Sized>(
        &self,
        page: &P,
        credentials: &Credentials,
        target: &str,
    ) -> Result<Option<P::Element>, LoginError> {
        run(
            page,
            credentials,
            target,
            &self.options,
            self.logger.as_ref(),
            self.generator.as_ref(),
        )
        .await
    }
}

/// One-shot login with the default RFC 6238 generator.
pub async fn authenticate<P: LoginPage + ?Sized>(
    page: &P,
    credentials: &Credentials,
    target: &str,
    options: &LoginOptions,
    logger: &dyn Logger,
) -> Result<Option<P::Element>, LoginError> {
    run(page, credentials, target, options, logger, &Totp::default()).await
}

async fn run<P: LoginPage + ?Sized>(
    page: &P,
    credentials: &Credentials,
    target: &str,
    options: &LoginOptions,
    logger: &dyn Logger,
    generator: &dyn TokenGenerator,
) -> Result<Option<P::Element>, LoginError> {
    let selectors = &options.selectors;

    logger.info("Waiting to enter the email...");
    page.wait_for_selector(&selectors.email, &options.field_wait).await?;
    logger.info("Entering the email...");
    page.type_text(&selectors.email, &credentials.email).await?;
    page.press_key(SUBMIT_KEY).await?;

    logger.info("Waiting to enter the password...");
    page.wait_for_selector(&selectors.password, &options.field_wait).await?;
    logger.info("Entering the password...");
    page.type_text(&selectors.password, &credentials.password).await?;
    page.press_key(SUBMIT_KEY).await?;

    let display = SnapshotDisplay::from_options(options);
    let trial = TrialSettings {
        trial_count: options.trial_count,
        trial_timeout: options.trial_timeout(),
        kind: options.snapshot_kind,
        display: display.clone(),
    };

    let mut found = false;
    let mut attempt = 0;
    while attempt < options.challenge_count && !found {
        if attempt > 0 {
            logger.warn(&format!("Challenged on attempt {attempt}. Entering the code..."));
            display_snapshot(page, &display, logger).await;
            if attempt > 1 {
                sleep(options.challenge_timeout()).await;
            }
            let code = generator.generate(&credentials.secret, Utc::now())?;
            page.evaluate(&clear_field_script(&selectors.code)?).await?;
            page.type_text(&selectors.code, &code).await?;
            page.press_key(SUBMIT_KEY).await?;
            wait_for_trial(page, &trial, logger).await;
        }
        found = race_target_against_challenge(page, target, options).await?;
        attempt += 1;
    }

    if found {
        logger.info(&format!("Found the target on attempt {}.", attempt - 1));
    } else {
        logger.warn(&format!("Gave up on the challenge after {attempt} attempts."));
    }

    Ok(page.query_selector(target).await?)
}

/// `true` if the target resolves first, `false` if the code field does.
///
/// A failing wait does not decide the race; only when both fail does the
/// last error propagate. The losing wait is dropped once a winner resolves.
async fn race_target_against_challenge<P: LoginPage + ?Sized>(
    page: &P,
    target: &str,
    options: &LoginOptions,
) -> Result<bool, PageError> {
    let target_wait = page
        .wait_for_selector(target, &options.target_wait)
        .map_ok(|_| true)
        .boxed();
    let challenge_wait = page
        .wait_for_selector(&options.selectors.code, &options.field_wait)
        .map_ok(|_| false)
        .boxed();

    let (found, losers) = select_ok([target_wait, challenge_wait]).await?;
    drop(losers);
    Ok(found)
}

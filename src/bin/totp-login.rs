//! TOTP login CLI.
//!
//! Attaches to an already-running Chrome/Chromium (started with
//! `--remote-debugging-port`), opens the login page and runs the login flow.
//!
//! Usage:
//!   $ LOGIN_EMAIL=... LOGIN_PASSWORD=... LOGIN_TOTP_SECRET=... \
//!     cargo run --bin totp-login -- \
//!       --cdp-url http://127.0.0.1:9222 \
//!       --url https://mail.google.com \
//!       --target '[aria-label="Search mail"]'

use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use clap::{Parser, ValueEnum};
use log::{info, warn};
use totp_login_rs::config::{Credentials, LoginOptions, LoginOptionsOverrides, ScreenshotMode};
use totp_login_rs::flow::LoginFlow;
use totp_login_rs::logging::LogCrateLogger;
use totp_login_rs::runtime::BrowserSession;

#[derive(Parser)]
#[command(
    name = "totp-login",
    author,
    version,
    about = "Log into a web page, answering TOTP challenges"
)]
struct Cli {
    /// Increase log verbosity (pass multiple times for DEBUG).
    #[arg(long, short, action = clap::ArgAction::Count)]
    verbose: u8,

    /// DevTools endpoint of the running browser.
    #[arg(long, default_value = "http://127.0.0.1:9222")]
    cdp_url: String,

    /// Login page to open.
    #[arg(long)]
    url: String,

    /// Selector that only appears once the login succeeded.
    #[arg(long)]
    target: String,

    /// Maximum number of challenge attempts.
    #[arg(long)]
    challenge_count: Option<u32>,

    /// Seconds between challenge retries after the first one.
    #[arg(long)]
    challenge_timeout_seconds: Option<u64>,

    /// How to surface page snapshots while retrying.
    #[arg(long, value_enum)]
    screenshot: Option<Screenshot>,

    /// Directory for file-mode screenshots.
    #[arg(long)]
    screenshot_dir: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum, Debug)]
enum Screenshot {
    Off,
    Log,
    File,
}

impl From<Screenshot> for ScreenshotMode {
    fn from(value: Screenshot) -> Self {
        match value {
            Screenshot::Off => ScreenshotMode::Off,
            Screenshot::Log => ScreenshotMode::Log,
            Screenshot::File => ScreenshotMode::File,
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_env_logger(cli.verbose);

    let options = LoginOptions::from_env()
        .context("failed to read login options from the environment")?
        .with_overrides(LoginOptionsOverrides {
            challenge_count: cli.challenge_count,
            challenge_timeout_seconds: cli.challenge_timeout_seconds,
            screenshot: cli.screenshot.map(ScreenshotMode::from),
            screenshot_dir: cli.screenshot_dir.clone(),
            ..Default::default()
        });
    let credentials = Credentials::new(
        env_var("LOGIN_EMAIL")?,
        env_var("LOGIN_PASSWORD")?,
        env_var("LOGIN_TOTP_SECRET")?,
    );

    let session = BrowserSession::attach(&cli.cdp_url)
        .await
        .context("failed to attach to the browser")?;
    let page = session
        .open_page(&cli.url)
        .await
        .with_context(|| format!("failed to open {}", cli.url))?;
    info!("Opened {}", cli.url);

    let flow = LoginFlow::new(options).with_logger(Arc::new(LogCrateLogger));
    let outcome = flow
        .authenticate(&page, &credentials, &cli.target)
        .await
        .context("login flow failed")?;

    session.detach();

    if outcome.is_some() {
        info!("Login succeeded: '{}' is present", cli.target);
        Ok(ExitCode::SUCCESS)
    } else {
        warn!("Login not confirmed: '{}' never appeared", cli.target);
        Ok(ExitCode::FAILURE)
    }
}

fn env_var(name: &str) -> Result<String> {
    let value = env::var(name).with_context(|| format!("{name} environment variable must be set"))?;
    if value.trim().is_empty() {
        return Err(anyhow!("{name} environment variable cannot be empty"));
    }
    Ok(value)
}

fn init_env_logger(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        _ => "debug",
    };

    let env = env_logger::Env::default().default_filter_or(default_level);
    let _ = env_logger::Builder::from_env(env)
        .format_timestamp_secs()
        .try_init();
}

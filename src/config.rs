//! Strongly-typed configuration for the login flow.
//!
//! Options can be constructed from defaults, loaded from environment variables
//! (with optional `.env` support), or merged with explicit overrides at the
//! call boundary. The flow itself never falls back to defaults on its own.

use std::env;
use std::fmt;
use std::num::ParseIntError;
use std::path::PathBuf;
use std::time::Duration;

use dotenvy::dotenv;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default selector for the email input.
pub const DEFAULT_EMAIL_SELECTOR: &str = "input[type=email]";
/// Default selector for the password input.
pub const DEFAULT_PASSWORD_SELECTOR: &str = "input[type=password]";
/// Default selector for the one-time code input.
pub const DEFAULT_CODE_SELECTOR: &str = "input[type=tel]";

/// How snapshots are surfaced while the flow is retrying.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScreenshotMode {
    #[default]
    Off,
    /// Emit the page text as a log line.
    Log,
    /// Save a PNG into the screenshot directory.
    File,
}

impl ScreenshotMode {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "off" | "none" => Some(ScreenshotMode::Off),
            "log" | "text" => Some(ScreenshotMode::Log),
            "file" => Some(ScreenshotMode::File),
            _ => None,
        }
    }
}

/// Representation captured for settle comparisons.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotKind {
    /// Base64-encoded PNG screenshot.
    #[default]
    Image,
    /// Visible page text.
    Text,
}

impl SnapshotKind {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "image" | "png" => Some(SnapshotKind::Image),
            "text" => Some(SnapshotKind::Text),
            _ => None,
        }
    }
}

/// Selector wait configuration handed to [`LoginPage::wait_for_selector`].
///
/// [`LoginPage::wait_for_selector`]: crate::page::LoginPage::wait_for_selector
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WaitOptions {
    pub visible: bool,
    pub timeout_ms: u64,
    pub poll_interval_ms: u64,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            visible: false,
            timeout_ms: 30_000,
            poll_interval_ms: 100,
        }
    }
}

impl WaitOptions {
    /// Wait that only resolves once the element is rendered visibly.
    pub fn visible() -> Self {
        Self {
            visible: true,
            ..Default::default()
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

/// Selectors for the three fields the flow interacts with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginSelectors {
    pub email: String,
    pub password: String,
    pub code: String,
}

impl Default for LoginSelectors {
    fn default() -> Self {
        Self {
            email: DEFAULT_EMAIL_SELECTOR.to_string(),
            password: DEFAULT_PASSWORD_SELECTOR.to_string(),
            code: DEFAULT_CODE_SELECTOR.to_string(),
        }
    }
}

/// Tunable timing, retry and snapshot settings for one login run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginOptions {
    #[serde(alias = "challengeCount")]
    pub challenge_count: u32,
    #[serde(alias = "challengeTimeoutSeconds")]
    pub challenge_timeout_seconds: u64,
    #[serde(alias = "trialCount")]
    pub trial_count: u32,
    #[serde(alias = "trialTimeoutSeconds")]
    pub trial_timeout_seconds: u64,
    pub screenshot: ScreenshotMode,
    #[serde(alias = "snapshotKind")]
    pub snapshot_kind: SnapshotKind,
    #[serde(alias = "screenshotDir")]
    pub screenshot_dir: PathBuf,
    #[serde(alias = "screenshotPrefix")]
    pub screenshot_prefix: String,
    pub selectors: LoginSelectors,
    /// Passed through untouched to the target selector wait.
    #[serde(alias = "targetWait")]
    pub target_wait: WaitOptions,
    #[serde(alias = "fieldWait")]
    pub field_wait: WaitOptions,
}

impl Default for LoginOptions {
    fn default() -> Self {
        Self {
            challenge_count: 3,
            challenge_timeout_seconds: 30,
            trial_count: 10,
            trial_timeout_seconds: 2,
            screenshot: ScreenshotMode::default(),
            snapshot_kind: SnapshotKind::default(),
            screenshot_dir: PathBuf::from("."),
            screenshot_prefix: "screenshot".to_string(),
            selectors: LoginSelectors::default(),
            target_wait: WaitOptions::default(),
            field_wait: WaitOptions::visible(),
        }
    }
}

impl LoginOptions {
    /// Construct options from environment variables, after loading a `.env`
    /// file if present.
    pub fn from_env() -> Result<Self, LoginConfigError> {
        let _ = dotenv();
        let mut options = LoginOptions::default();

        if let Some(value) = env_var("TOTP_LOGIN_CHALLENGE_COUNT") {
            options.challenge_count = parse_u32("TOTP_LOGIN_CHALLENGE_COUNT", &value)?;
        }

        if let Some(value) = env_var("TOTP_LOGIN_CHALLENGE_TIMEOUT_SECONDS") {
            options.challenge_timeout_seconds =
                parse_u64("TOTP_LOGIN_CHALLENGE_TIMEOUT_SECONDS", &value)?;
        }

        if let Some(value) = env_var("TOTP_LOGIN_TRIAL_COUNT") {
            options.trial_count = parse_u32("TOTP_LOGIN_TRIAL_COUNT", &value)?;
        }

        if let Some(value) = env_var("TOTP_LOGIN_TRIAL_TIMEOUT_SECONDS") {
            options.trial_timeout_seconds =
                parse_u64("TOTP_LOGIN_TRIAL_TIMEOUT_SECONDS", &value)?;
        }

        if let Some(value) = env_var("TOTP_LOGIN_SCREENSHOT") {
            options.screenshot = ScreenshotMode::parse(&value)
                .ok_or_else(|| LoginConfigError::invalid_enum("TOTP_LOGIN_SCREENSHOT", value))?;
        }

        if let Some(value) = env_var("TOTP_LOGIN_SNAPSHOT_KIND") {
            options.snapshot_kind = SnapshotKind::parse(&value).ok_or_else(|| {
                LoginConfigError::invalid_enum("TOTP_LOGIN_SNAPSHOT_KIND", value)
            })?;
        }

        if let Some(value) = env_var("TOTP_LOGIN_SCREENSHOT_DIR") {
            options.screenshot_dir = PathBuf::from(value);
        }

        if let Some(value) = env_var("TOTP_LOGIN_TARGET_TIMEOUT_MS") {
            options.target_wait.timeout_ms = parse_u64("TOTP_LOGIN_TARGET_TIMEOUT_MS", &value)?;
        }

        Ok(options)
    }

    /// Create a new set of options with explicit field overrides applied.
    pub fn with_overrides(&self, overrides: LoginOptionsOverrides) -> LoginOptions {
        let mut next = self.clone();

        if let Some(value) = overrides.challenge_count {
            next.challenge_count = value;
        }
        if let Some(value) = overrides.challenge_timeout_seconds {
            next.challenge_timeout_seconds = value;
        }
        if let Some(value) = overrides.trial_count {
            next.trial_count = value;
        }
        if let Some(value) = overrides.trial_timeout_seconds {
            next.trial_timeout_seconds = value;
        }
        if let Some(value) = overrides.screenshot {
            next.screenshot = value;
        }
        if let Some(value) = overrides.snapshot_kind {
            next.snapshot_kind = value;
        }
        if let Some(value) = overrides.screenshot_dir {
            next.screenshot_dir = value;
        }
        if let Some(value) = overrides.screenshot_prefix {
            next.screenshot_prefix = value;
        }
        if let Some(value) = overrides.selectors {
            next.selectors = value;
        }
        if let Some(value) = overrides.target_wait {
            next.target_wait = value;
        }
        if let Some(value) = overrides.field_wait {
            next.field_wait = value;
        }

        next
    }

    pub fn challenge_timeout(&self) -> Duration {
        Duration::from_secs(self.challenge_timeout_seconds)
    }

    pub fn trial_timeout(&self) -> Duration {
        Duration::from_secs(self.trial_timeout_seconds)
    }
}

/// Field-level overrides for [`LoginOptions::with_overrides`].
#[derive(Debug, Default, Clone)]
pub struct LoginOptionsOverrides {
    pub challenge_count: Option<u32>,
    pub challenge_timeout_seconds: Option<u64>,
    pub trial_count: Option<u32>,
    pub trial_timeout_seconds: Option<u64>,
    pub screenshot: Option<ScreenshotMode>,
    pub snapshot_kind: Option<SnapshotKind>,
    pub screenshot_dir: Option<PathBuf>,
    pub screenshot_prefix: Option<String>,
    pub selectors: Option<LoginSelectors>,
    pub target_wait: Option<WaitOptions>,
    pub field_wait: Option<WaitOptions>,
}

impl LoginOptionsOverrides {
    /// Builder-style helper to set the `challenge_count` override.
    pub fn challenge_count(mut self, count: u32) -> Self {
        self.challenge_count = Some(count);
        self
    }

    /// Builder-style helper to set the `screenshot` override.
    pub fn screenshot(mut self, mode: ScreenshotMode) -> Self {
        self.screenshot = Some(mode);
        self
    }
}

/// Values typed into the login form.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
    /// Base32 TOTP seed, handed to the token generator as-is.
    pub secret: String,
}

impl Credentials {
    pub fn new(
        email: impl Into<String>,
        password: impl Into<String>,
        secret: impl Into<String>,
    ) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            secret: secret.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Errors that can arise while constructing [`LoginOptions`].
#[derive(Debug, Error)]
pub enum LoginConfigError {
    #[error("invalid value '{value}' for {field}")]
    InvalidEnumVariant { field: &'static str, value: String },
    #[error("invalid number '{value}' for {field}: {source}")]
    InvalidNumber {
        field: &'static str,
        value: String,
        #[source]
        source: ParseIntError,
    },
}

impl LoginConfigError {
    fn invalid_enum(field: &'static str, value: String) -> Self {
        LoginConfigError::InvalidEnumVariant { field, value }
    }
}

fn env_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_u32(field: &'static str, value: &str) -> Result<u32, LoginConfigError> {
    value
        .trim()
        .parse::<u32>()
        .map_err(|source| LoginConfigError::InvalidNumber {
            field,
            value: value.to_string(),
            source,
        })
}

fn parse_u64(field: &'static str, value: &str) -> Result<u64, LoginConfigError> {
    value
        .trim()
        .parse::<u64>()
        .map_err(|source| LoginConfigError::InvalidNumber {
            field,
            value: value.to_string(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Mutex, OnceLock};

    fn env_lock() -> &'static Mutex<()> {
        static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        LOCK.get_or_init(|| Mutex::new(()))
    }

    #[derive(Debug)]
    struct EnvGuard {
        saved: Vec<(String, Option<String>)>,
    }

    impl EnvGuard {
        fn new(vars: &[(&str, Option<&str>)]) -> Self {
            let saved = vars
                .iter()
                .map(|(key, value)| {
                    let original = env::var(key).ok();
                    match value {
                        Some(v) => unsafe {
                            env::set_var(key, v);
                        },
                        None => unsafe {
                            env::remove_var(key);
                        },
                    };
                    ((*key).to_string(), original)
                })
                .collect();
            EnvGuard { saved }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            for (key, value) in self.saved.drain(..) {
                match value {
                    Some(v) => unsafe {
                        env::set_var(&key, v);
                    },
                    None => unsafe {
                        env::remove_var(&key);
                    },
                }
            }
        }
    }

    fn with_env<F, T>(vars: &[(&str, Option<&str>)], f: F) -> T
    where
        F: FnOnce() -> T,
    {
        let lock = env_lock().lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let guard = EnvGuard::new(vars);
        let result = f();
        drop(guard);
        drop(lock);
        result
    }

    #[test]
    fn defaults_match_documented_values() {
        let options = LoginOptions::default();
        assert_eq!(options.challenge_count, 3);
        assert_eq!(options.challenge_timeout_seconds, 30);
        assert_eq!(options.trial_count, 10);
        assert_eq!(options.trial_timeout_seconds, 2);
        assert_eq!(options.screenshot, ScreenshotMode::Off);
        assert_eq!(options.snapshot_kind, SnapshotKind::Image);
        assert_eq!(options.selectors.code, "input[type=tel]");
        assert!(options.field_wait.visible);
        assert!(!options.target_wait.visible);
    }

    #[test]
    fn from_env_parses_values() {
        let vars = [
            ("TOTP_LOGIN_CHALLENGE_COUNT", Some("5")),
            ("TOTP_LOGIN_CHALLENGE_TIMEOUT_SECONDS", Some("12")),
            ("TOTP_LOGIN_TRIAL_COUNT", Some("4")),
            ("TOTP_LOGIN_TRIAL_TIMEOUT_SECONDS", Some("1")),
            ("TOTP_LOGIN_SCREENSHOT", Some("FILE")),
            ("TOTP_LOGIN_SNAPSHOT_KIND", Some("text")),
            ("TOTP_LOGIN_SCREENSHOT_DIR", Some("/tmp/shots")),
            ("TOTP_LOGIN_TARGET_TIMEOUT_MS", Some("9000")),
        ];

        with_env(&vars, || {
            let options = LoginOptions::from_env().expect("options from env");
            assert_eq!(options.challenge_count, 5);
            assert_eq!(options.challenge_timeout_seconds, 12);
            assert_eq!(options.trial_count, 4);
            assert_eq!(options.trial_timeout_seconds, 1);
            assert_eq!(options.screenshot, ScreenshotMode::File);
            assert_eq!(options.snapshot_kind, SnapshotKind::Text);
            assert_eq!(options.screenshot_dir, PathBuf::from("/tmp/shots"));
            assert_eq!(options.target_wait.timeout_ms, 9_000);
        });
    }

    #[test]
    fn from_env_rejects_bad_numbers() {
        with_env(&[("TOTP_LOGIN_TRIAL_COUNT", Some("many"))], || {
            let err = LoginOptions::from_env().expect_err("should reject");
            assert!(err.to_string().contains("TOTP_LOGIN_TRIAL_COUNT"));
        });
    }

    #[test]
    fn from_env_rejects_unknown_screenshot_mode() {
        with_env(&[("TOTP_LOGIN_SCREENSHOT", Some("video"))], || {
            let err = LoginOptions::from_env().expect_err("should reject");
            assert!(matches!(
                err,
                LoginConfigError::InvalidEnumVariant {
                    field: "TOTP_LOGIN_SCREENSHOT",
                    ..
                }
            ));
        });
    }

    #[test]
    fn overrides_replace_only_given_fields() {
        let base = LoginOptions::default();
        let overrides = LoginOptionsOverrides::default()
            .challenge_count(1)
            .screenshot(ScreenshotMode::Log);
        let overrides = LoginOptionsOverrides {
            trial_timeout_seconds: Some(0),
            ..overrides
        };

        let updated = base.with_overrides(overrides);
        assert_eq!(updated.challenge_count, 1);
        assert_eq!(updated.screenshot, ScreenshotMode::Log);
        assert_eq!(updated.trial_timeout_seconds, 0);
        assert_eq!(updated.trial_count, base.trial_count);
        assert_eq!(updated.selectors, base.selectors);
    }

    #[test]
    fn options_deserialize_from_camel_case() {
        let options: LoginOptions = serde_json::from_value(serde_json::json!({
            "challengeCount": 2,
            "screenshot": "log",
            "targetWait": { "visible": true, "timeoutMs": 500 }
        }))
        .unwrap();
        assert_eq!(options.challenge_count, 2);
        assert_eq!(options.screenshot, ScreenshotMode::Log);
        assert!(options.target_wait.visible);
        assert_eq!(options.target_wait.timeout_ms, 500);
        assert_eq!(options.target_wait.poll_interval_ms, 100);
        assert_eq!(options.trial_count, 10);
    }

    #[test]
    fn credentials_debug_redacts_secrets() {
        let credentials = Credentials::new("user@example.com", "hunter2", "JBSWY3DPEHPK3PXP");
        let rendered = format!("{credentials:?}");
        assert!(rendered.contains("user@example.com"));
        assert!(!rendered.contains("hunter2"));
        assert!(!rendered.contains("JBSWY3DPEHPK3PXP"));
    }
}

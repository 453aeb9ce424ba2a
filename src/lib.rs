//! Browser login automation with TOTP second-factor handling.
//!
//! [`flow::authenticate`] types credentials into an already-open page, detects
//! a one-time code challenge, submits fresh TOTP codes and waits for a
//! caller-supplied success selector. The page is anything implementing
//! [`page::LoginPage`]; [`adapter::chromiumoxide::ChromiumoxidePage`] covers
//! real Chrome sessions.

pub mod adapter {
    pub mod chromiumoxide;
}
pub mod config;
pub mod flow;
pub mod logging;
pub mod page;
pub mod runtime;
pub mod settle;
pub mod snapshot;
pub mod totp;

pub use config::{
    Credentials, LoginOptions, LoginOptionsOverrides, LoginSelectors, ScreenshotMode,
    SnapshotKind, WaitOptions,
};
pub use flow::{LoginError, LoginFlow, authenticate};
pub use logging::{FlowLogger, LogCrateLogger, Logger, NoopLogger};
pub use page::{LoginPage, PageError};
pub use totp::{TokenGenerator, Totp, TotpError};

//! Scripted in-memory page used by the integration tests.
//!
//! Waits that can never succeed sleep for their configured timeout and then
//! fail, so tests should run with `start_paused = true`.

#![allow(dead_code)]

use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use tokio::time::sleep;
use totp_login_rs::config::{LoginSelectors, WaitOptions};
use totp_login_rs::logging::Logger;
use totp_login_rs::page::{LoginPage, PageError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Wait { selector: String, options: WaitOptions },
    Type { selector: String, text: String },
    Press(String),
    Evaluate(String),
    Query(String),
    StyleTag(String),
    Screenshot,
    Text,
}

/// Behaviour of the scripted page.
#[derive(Debug, Clone)]
pub struct Script {
    pub selectors: LoginSelectors,
    pub target: String,
    /// Whether the email field ever shows up.
    pub email_present: bool,
    /// Whether the code field shows up once the password was submitted.
    pub challenge: bool,
    /// Target appears once this many codes were typed; `Some(0)` means right
    /// after the password.
    pub accept_after: Option<usize>,
    /// Overrides the answer of `query_selector(target)`.
    pub final_lookup: Option<bool>,
    /// Screenshot payloads, one per call; the last one repeats.
    pub frames: Vec<String>,
    pub fail_captures: bool,
    pub page_text: String,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            selectors: LoginSelectors::default(),
            target: "#inbox".to_string(),
            email_present: true,
            challenge: true,
            accept_after: None,
            final_lookup: None,
            frames: vec!["stable".to_string()],
            fail_captures: false,
            page_text: "Enter the code from your authenticator app".to_string(),
        }
    }
}

#[derive(Debug, Default)]
struct State {
    events: Vec<Event>,
    password_submitted: bool,
    codes_typed: usize,
    screenshots: usize,
}

pub struct ScriptedPage {
    script: Script,
    state: Mutex<State>,
}

impl ScriptedPage {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            state: Mutex::new(State::default()),
        }
    }

    pub fn events(&self) -> Vec<Event> {
        self.state.lock().unwrap().events.clone()
    }

    pub fn typed_codes(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                Event::Type { selector, text } if selector == self.script.selectors.code => {
                    Some(text)
                }
                _ => None,
            })
            .collect()
    }

    pub fn screenshot_calls(&self) -> usize {
        self.state.lock().unwrap().screenshots
    }

    fn record(&self, event: Event) {
        self.state.lock().unwrap().events.push(event);
    }

    fn target_visible(&self) -> bool {
        let state = self.state.lock().unwrap();
        state.password_submitted
            && self
                .script
                .accept_after
                .is_some_and(|needed| state.codes_typed >= needed)
    }

    fn resolvable(&self, selector: &str, options: &WaitOptions) -> bool {
        let selectors = &self.script.selectors;
        if selector == self.script.target {
            return self.target_visible();
        }
        if selector == selectors.email {
            return self.script.email_present;
        }
        if selector == selectors.password {
            return true;
        }
        if selector == selectors.code {
            let submitted = self.state.lock().unwrap().password_submitted;
            return self.script.challenge
                && submitted
                && !(options.visible && self.target_visible());
        }
        false
    }
}

#[async_trait]
impl LoginPage for ScriptedPage {
    type Element = String;

    async fn wait_for_selector(
        &self,
        selector: &str,
        options: &WaitOptions,
    ) -> Result<String, PageError> {
        self.record(Event::Wait {
            selector: selector.to_string(),
            options: options.clone(),
        });
        if self.resolvable(selector, options) {
            return Ok(selector.to_string());
        }
        sleep(options.timeout()).await;
        Err(PageError::Timeout {
            selector: selector.to_string(),
            timeout_ms: options.timeout_ms,
        })
    }

    async fn type_text(&self, selector: &str, text: &str) -> Result<(), PageError> {
        let mut state = self.state.lock().unwrap();
        if selector == self.script.selectors.password {
            state.password_submitted = true;
        }
        if selector == self.script.selectors.code {
            state.codes_typed += 1;
        }
        state.events.push(Event::Type {
            selector: selector.to_string(),
            text: text.to_string(),
        });
        Ok(())
    }

    async fn press_key(&self, key: &str) -> Result<(), PageError> {
        self.record(Event::Press(key.to_string()));
        Ok(())
    }

    async fn evaluate(&self, script: &str) -> Result<JsonValue, PageError> {
        self.record(Event::Evaluate(script.to_string()));
        Ok(JsonValue::Bool(true))
    }

    async fn query_selector(&self, selector: &str) -> Result<Option<String>, PageError> {
        self.record(Event::Query(selector.to_string()));
        let present = match self.script.final_lookup {
            Some(present) if selector == self.script.target => present,
            _ => self.resolvable(selector, &WaitOptions::default()),
        };
        Ok(present.then(|| selector.to_string()))
    }

    async fn screenshot(&self) -> Result<Vec<u8>, PageError> {
        let mut state = self.state.lock().unwrap();
        state.events.push(Event::Screenshot);
        if self.script.fail_captures {
            return Err(PageError::Cdp("page is navigating".to_string()));
        }
        let index = state.screenshots.min(self.script.frames.len().saturating_sub(1));
        state.screenshots += 1;
        Ok(self
            .script
            .frames
            .get(index)
            .cloned()
            .unwrap_or_default()
            .into_bytes())
    }

    async fn text_content(&self) -> Result<String, PageError> {
        self.record(Event::Text);
        if self.script.fail_captures {
            return Err(PageError::Script("execution context destroyed".to_string()));
        }
        Ok(self.script.page_text.clone())
    }

    async fn add_style_tag(&self, css: &str) -> Result<(), PageError> {
        self.record(Event::StyleTag(css.to_string()));
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Warn,
    Error,
}

/// Logger that keeps every info/warn/error line.
#[derive(Debug, Default)]
pub struct RecordingLogger {
    lines: Mutex<Vec<(Level, String)>>,
}

impl RecordingLogger {
    pub fn lines(&self) -> Vec<(Level, String)> {
        self.lines.lock().unwrap().clone()
    }

    pub fn at(&self, level: Level) -> Vec<String> {
        self.lines()
            .into_iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, message)| message)
            .collect()
    }
}

impl Logger for RecordingLogger {
    fn info(&self, message: &str) {
        self.lines.lock().unwrap().push((Level::Info, message.to_string()));
    }

    fn warn(&self, message: &str) {
        self.lines.lock().unwrap().push((Level::Warn, message.to_string()));
    }

    fn error(&self, message: &str) {
        self.lines.lock().unwrap().push((Level::Error, message.to_string()));
    }
}

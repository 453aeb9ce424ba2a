//! Page automation capability consumed by the login flow.
//!
//! The flow never talks to a browser directly. It drives whatever implements
//! [`LoginPage`], which keeps the state machine testable against scripted
//! pages while the chromiumoxide adapter handles real CDP sessions.

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use thiserror::Error;

use crate::config::WaitOptions;

/// Errors surfaced by [`LoginPage`] implementations.
#[derive(Debug, Error)]
pub enum PageError {
    #[error("timed out after {timeout_ms}ms waiting for '{selector}'")]
    Timeout { selector: String, timeout_ms: u64 },
    #[error("no element matches '{0}'")]
    NotFound(String),
    #[error("CDP error: {0}")]
    Cdp(String),
    #[error("script evaluation failed: {0}")]
    Script(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Minimal set of page operations the login flow depends on.
///
/// Every method is a suspension point. Implementations must tolerate having a
/// pending wait dropped mid-flight, since the flow races two waits and drops
/// the loser.
#[async_trait]
pub trait LoginPage: Send + Sync {
    /// Handle to an element located on the page.
    type Element: Send;

    /// Resolve once an element matching `selector` satisfies `options`.
    async fn wait_for_selector(
        &self,
        selector: &str,
        options: &WaitOptions,
    ) -> Result<Self::Element, PageError>;

    /// Type `text` into the element matching `selector`.
    async fn type_text(&self, selector: &str, text: &str) -> Result<(), PageError>;

    /// Press a named key (e.g. `Enter`) on the focused element.
    async fn press_key(&self, key: &str) -> Result<(), PageError>;

    /// Evaluate a script in page context and return its JSON result.
    async fn evaluate(&self, script: &str) -> Result<JsonValue, PageError>;

    /// Look up a single element without waiting.
    async fn query_selector(&self, selector: &str) -> Result<Option<Self::Element>, PageError>;

    /// Capture the viewport as PNG bytes.
    async fn screenshot(&self) -> Result<Vec<u8>, PageError>;

    /// Extract the visible text of the page.
    async fn text_content(&self) -> Result<String, PageError>;

    /// Inject a stylesheet rule into the page.
    async fn add_style_tag(&self, css: &str) -> Result<(), PageError>;
}

/// Build a script that blanks the value of the first element matching `selector`.
pub fn clear_field_script(selector: &str) -> Result<String, serde_json::Error> {
    let selector_json = serde_json::to_string(selector)?;
    Ok(format!(
        "(function() {{
            const field = document.querySelector({selector_json});
            if (field) {{
                field.setAttribute('value', '');
                field.value = '';
            }}
            return true;
        }})()"
    ))
}

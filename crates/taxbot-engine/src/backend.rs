use async_trait::async_trait;
use std::time::Duration;
pub use taxbot_common::error::backend_error::BackendError;
use taxbot_common::locator::{ElementRef, Locator};

#[derive(Debug, Clone)]
pub struct NavigationResult {
    pub url: String,
    pub title: String,
}

/// The browser capability the interpreter drives.
///
/// Implementations own exactly one browser session between `launch` and
/// `close`. Element handles returned by `find_element` stay valid until the
/// page they came from goes away.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Start the browser session.
    async fn launch(&mut self) -> Result<(), BackendError>;

    /// Close the session and release the browser. Must be safe to call twice.
    async fn close(&mut self) -> Result<(), BackendError>;

    /// Check if the backend is ready to accept commands.
    async fn is_ready(&self) -> bool;

    /// Navigate to a specific URL.
    async fn navigate(&mut self, url: &str) -> Result<NavigationResult, BackendError>;

    /// Navigate back in browser history.
    async fn go_back(&mut self) -> Result<NavigationResult, BackendError>;

    /// Suspend the workflow for a number of seconds.
    async fn wait_seconds(&mut self, seconds: f64) -> Result<(), BackendError> {
        let duration = Duration::try_from_secs_f64(seconds)
            .map_err(|e| BackendError::Other(format!("Invalid wait of {seconds}s: {e}")))?;
        tokio::time::sleep(duration).await;
        Ok(())
    }

    /// Poll for an element until it shows up or `timeout` elapses.
    ///
    /// `Ok(None)` means the element was not there; it is not an error.
    async fn find_element(
        &mut self,
        locator: &Locator,
        timeout: Duration,
    ) -> Result<Option<ElementRef>, BackendError>;

    /// Visible text of an element.
    async fn element_text(&mut self, element: &ElementRef) -> Result<String, BackendError>;

    async fn click(&mut self, element: &ElementRef) -> Result<(), BackendError>;

    /// Clear the element, then type `text` into it.
    async fn fill_text(&mut self, element: &ElementRef, text: &str) -> Result<(), BackendError>;

    /// Activate a selection widget, choosing the option labelled `option` when given.
    async fn select_option(
        &mut self,
        element: &ElementRef,
        option: Option<&str>,
    ) -> Result<(), BackendError>;

    /// Switch the browsing context into the frame hosted by `element`.
    async fn enter_frame(&mut self, element: &ElementRef) -> Result<(), BackendError>;

    /// Switch the browsing context back to the top-level document.
    async fn exit_frame(&mut self) -> Result<(), BackendError>;

    /// Capture a screenshot of the current viewport as PNG bytes.
    async fn screenshot(&mut self) -> Result<Vec<u8>, BackendError> {
        Err(BackendError::NotSupported("screenshot".into()))
    }
}

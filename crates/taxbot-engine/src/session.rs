//! Scoped ownership of one browser session.

use crate::backend::{Backend, BackendError};
use tracing::{debug, warn};

/// A launched browser, released exactly once.
///
/// `release` is the normal exit path. If the session is dropped while still
/// open (a panic, or an early return), the close is handed to the current
/// Tokio runtime so the browser process is not leaked.
pub struct BrowserSession<B: Backend + 'static> {
    backend: Option<B>,
}

impl<B: Backend + 'static> BrowserSession<B> {
    /// Launch `backend` and take ownership of it.
    pub async fn open(mut backend: B) -> Result<Self, BackendError> {
        if let Err(e) = backend.launch().await {
            if let Err(close_err) = backend.close().await {
                debug!("Cleanup after failed launch also failed: {}", close_err);
            }
            return Err(e);
        }
        Ok(Self {
            backend: Some(backend),
        })
    }

    pub fn is_open(&self) -> bool {
        self.backend.is_some()
    }

    pub fn backend(&mut self) -> Result<&mut B, BackendError> {
        self.backend.as_mut().ok_or(BackendError::NotReady)
    }

    /// Close the browser. Later calls are no-ops.
    pub async fn release(&mut self) {
        if let Some(mut backend) = self.backend.take() {
            match backend.close().await {
                Ok(()) => debug!("Browser session released"),
                Err(e) => warn!("Failed to close browser session: {}", e),
            }
        }
    }
}

impl<B: Backend + 'static> Drop for BrowserSession<B> {
    fn drop(&mut self) {
        let Some(mut backend) = self.backend.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                warn!("Browser session dropped while open, closing in background");
                handle.spawn(async move {
                    if let Err(e) = backend.close().await {
                        warn!("Background close of browser session failed: {}", e);
                    }
                });
            }
            Err(_) => warn!("Browser session dropped outside a runtime; browser left open"),
        }
    }
}

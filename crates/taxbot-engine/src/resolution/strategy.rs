use crate::backend::{Backend, BackendError};
use crate::directive::{DirectiveRecord, ElementAction};
use std::time::Duration;
use taxbot_common::locator::{ElementRef, Locator};
use tracing::{debug, info, warn};

pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(3);

/// Locates the element a directive record targets.
///
/// The record's authoritative locator is tried first. When it finds nothing,
/// or finds an element with empty text for a `return`, each `alt_selector`
/// is tried as a CSS selector in order. Missing elements are `Ok(None)`.
#[derive(Debug, Clone)]
pub struct ElementResolver {
    timeout: Duration,
}

impl Default for ElementResolver {
    fn default() -> Self {
        Self::new(DEFAULT_LOOKUP_TIMEOUT)
    }
}

impl ElementResolver {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn resolve<B: Backend + ?Sized>(
        &self,
        backend: &mut B,
        action: ElementAction,
        record: &DirectiveRecord,
    ) -> Result<Option<ElementRef>, BackendError> {
        let Some(locator) = record.locator() else {
            return Ok(None);
        };

        if let Some(element) = self.lookup(backend, action, &locator).await? {
            return Ok(Some(element));
        }

        if record.alt_selector.is_empty() {
            debug!("No alternative selectors for {}", locator);
            return Ok(None);
        }

        for alt in &record.alt_selector {
            info!("Failed to find {}, trying alternative selector '{}'", locator, alt);
            let alt_locator = Locator::Css(alt.clone());
            if let Some(element) = self.lookup(backend, action, &alt_locator).await? {
                return Ok(Some(element));
            }
        }

        warn!(
            "Exhausted {} alternative selector(s) for {}",
            record.alt_selector.len(),
            locator
        );
        Ok(None)
    }

    async fn lookup<B: Backend + ?Sized>(
        &self,
        backend: &mut B,
        action: ElementAction,
        locator: &Locator,
    ) -> Result<Option<ElementRef>, BackendError> {
        let element = match backend.find_element(locator, self.timeout).await {
            Ok(Some(element)) => element,
            Ok(None) => {
                debug!("Failed to find element {}", locator);
                return Ok(None);
            }
            Err(BackendError::SelectorInvalid { selector }) => {
                warn!("Invalid selector '{}', treating as not found", selector);
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        // An empty value cannot be told apart from a missing one.
        if action == ElementAction::Return && backend.element_text(&element).await?.is_empty() {
            debug!("Element {} has no text, treating as not found", locator);
            return Ok(None);
        }

        Ok(Some(element))
    }
}

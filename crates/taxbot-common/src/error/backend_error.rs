/// Failures reported by a browser capability.
#[derive(thiserror::Error, Debug, Clone)]
pub enum BackendError {
    // ============================================================
    // Session Errors
    // ============================================================
    #[error("Failed to launch browser session: {0}")]
    Launch(String),

    #[error("Not ready")]
    NotReady,

    // ============================================================
    // Navigation Errors
    // ============================================================
    #[error("Navigation failed: {0}")]
    Navigation(String),

    // ============================================================
    // Element Errors
    // ============================================================
    #[error("Unknown element handle {0}")]
    UnknownElement(u32),

    #[error("Element {id} is stale (removed from DOM)")]
    ElementStale { id: u32 },

    #[error("Element {id} is not interactable: {reason}")]
    ElementNotInteractable { id: u32, reason: String },

    #[error("Click on element {id} was intercepted: {reason}")]
    ElementClickIntercepted { id: u32, reason: String },

    #[error("Option not found: {value}")]
    OptionNotFound { value: String },

    #[error("Invalid selector: {selector}")]
    SelectorInvalid { selector: String },

    #[error("Frame switch failed: {0}")]
    Frame(String),

    // ============================================================
    // System Errors
    // ============================================================
    #[error("IO error: {0}")]
    Io(String),

    #[error("Other: {0}")]
    Other(String),

    #[error("Not supported: {0}")]
    NotSupported(String),
}

impl From<std::io::Error> for BackendError {
    fn from(err: std::io::Error) -> Self {
        BackendError::Io(err.to_string())
    }
}

impl BackendError {
    /// Stable error code for logs and reports.
    pub fn code(&self) -> &'static str {
        match self {
            BackendError::Launch(_) => "LAUNCH_ERROR",
            BackendError::NotReady => "NOT_READY",
            BackendError::Navigation(_) => "NAVIGATION_ERROR",
            BackendError::UnknownElement(_) => "UNKNOWN_ELEMENT",
            BackendError::ElementStale { .. } => "ELEMENT_STALE",
            BackendError::ElementNotInteractable { .. } => "ELEMENT_NOT_INTERACTABLE",
            BackendError::ElementClickIntercepted { .. } => "ELEMENT_CLICK_INTERCEPTED",
            BackendError::OptionNotFound { .. } => "OPTION_NOT_FOUND",
            BackendError::SelectorInvalid { .. } => "SELECTOR_INVALID",
            BackendError::Frame(_) => "FRAME_ERROR",
            BackendError::Io(_) => "IO_ERROR",
            BackendError::Other(_) => "INTERNAL_ERROR",
            BackendError::NotSupported(_) => "NOT_SUPPORTED",
        }
    }

    /// Whether the page refused an interaction with an element it did find.
    ///
    /// These end a workflow run; every other capability error is propagated.
    pub fn is_interaction_failure(&self) -> bool {
        matches!(
            self,
            BackendError::ElementNotInteractable { .. }
                | BackendError::ElementClickIntercepted { .. }
                | BackendError::ElementStale { .. }
                | BackendError::OptionNotFound { .. }
        )
    }
}

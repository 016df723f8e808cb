//! The directive interpreter.
//!
//! An `Interpreter` runs one job's script against one browser session:
//! directives are popped from the front of the queue and dispatched until the
//! queue drains (success) or an abort condition is hit. Both are terminal.

use crate::backend::{Backend, BackendError};
use crate::config::schema::TaxbotConfig;
use crate::directive::{Directive, DirectiveRecord, ElementAction, SELECTOR_FIELDS};
use crate::job::Job;
use crate::resolution::strategy::{DEFAULT_LOOKUP_TIMEOUT, ElementResolver};
use crate::session::BrowserSession;
use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::time::Duration;
use taxbot_common::locator::Locator;
use tracing::{Instrument, debug, error, info, info_span, warn};

/// Extracted values keyed by the `value` of each `return` record.
pub type Results = HashMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AbortReason {
    #[error("{directive}: unable to find element {locator}")]
    ElementNotFound {
        directive: &'static str,
        locator: Locator,
    },

    #[error("{directive}: {message} [{code}]")]
    Interaction {
        directive: &'static str,
        code: &'static str,
        message: String,
    },

    #[error("browser failure: {0}")]
    Backend(String),
}

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("Workflow aborted: {0}")]
    Aborted(AbortReason),

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),
}

/// Mutable state of one workflow run.
#[derive(Debug, Default)]
pub struct WorkflowState {
    complete: bool,
    success: bool,
    directives: VecDeque<Directive>,
    results: Results,
    abort_reason: Option<AbortReason>,
}

impl WorkflowState {
    pub fn new(directives: impl IntoIterator<Item = Directive>) -> Self {
        Self {
            directives: directives.into_iter().collect(),
            ..Default::default()
        }
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Only meaningful once `is_complete` is true.
    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn remaining(&self) -> usize {
        self.directives.len()
    }

    pub fn results(&self) -> &Results {
        &self.results
    }

    pub fn abort_reason(&self) -> Option<&AbortReason> {
        self.abort_reason.as_ref()
    }
}

#[derive(Debug, Clone)]
pub struct InterpreterOptions {
    pub lookup_timeout: Duration,
    /// Save a screenshot as `<dir>/<pid>.png` before releasing an aborted session.
    pub screenshot_dir: Option<PathBuf>,
}

impl Default for InterpreterOptions {
    fn default() -> Self {
        Self {
            lookup_timeout: DEFAULT_LOOKUP_TIMEOUT,
            screenshot_dir: None,
        }
    }
}

impl From<&TaxbotConfig> for InterpreterOptions {
    fn from(config: &TaxbotConfig) -> Self {
        Self {
            lookup_timeout: config.interpreter.lookup_timeout(),
            screenshot_dir: config.artifacts.screenshot_dir.clone(),
        }
    }
}

pub struct Interpreter<B: Backend + 'static> {
    job: Job,
    state: WorkflowState,
    session: BrowserSession<B>,
    resolver: ElementResolver,
    screenshot_dir: Option<PathBuf>,
}

impl<B: Backend + 'static> Interpreter<B> {
    pub fn new(
        job: Job,
        steps: Vec<Directive>,
        session: BrowserSession<B>,
        options: InterpreterOptions,
    ) -> Self {
        Self {
            job,
            state: WorkflowState::new(steps),
            session,
            resolver: ElementResolver::new(options.lookup_timeout),
            screenshot_dir: options.screenshot_dir,
        }
    }

    pub fn job(&self) -> &Job {
        &self.job
    }

    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    /// Run the workflow to a terminal state.
    ///
    /// Returns the results on success and `RunError::Aborted` otherwise. A
    /// capability failure the interpreter does not handle is returned as
    /// `RunError::Backend`; the session is released on every path. Once
    /// terminal, further calls return the recorded outcome.
    pub async fn run(&mut self) -> Result<Results, RunError> {
        if self.state.complete {
            return self.outcome();
        }

        let span = info_span!("workflow", pid = %self.job.pid, fips = %self.job.fips);
        let driven = self.drive().instrument(span).await;
        if let Err(e) = driven {
            error!("Workflow for pid {} failed [{}]: {}", self.job.pid, e.code(), e);
            self.state.complete = true;
            self.state.success = false;
            self.state.abort_reason = Some(AbortReason::Backend(e.to_string()));
            self.session.release().await;
            return Err(RunError::Backend(e));
        }
        self.outcome()
    }

    fn outcome(&self) -> Result<Results, RunError> {
        if self.state.success {
            return Ok(self.state.results.clone());
        }
        let reason = self
            .state
            .abort_reason
            .clone()
            .unwrap_or_else(|| AbortReason::Backend("workflow did not complete".into()));
        Err(RunError::Aborted(reason))
    }

    async fn drive(&mut self) -> Result<(), BackendError> {
        info!(
            "Processing pid {} with fips {} ({} directives)",
            self.job.pid,
            self.job.fips,
            self.state.directives.len()
        );
        while !self.state.complete {
            match self.state.directives.pop_front() {
                Some(directive) => self.process_step(directive).await?,
                None => self.finish().await,
            }
        }
        Ok(())
    }

    async fn finish(&mut self) {
        self.state.complete = true;
        self.state.success = true;
        info!(
            "Workflow for pid {} completed with {} result(s)",
            self.job.pid,
            self.state.results.len()
        );
        self.session.release().await;
    }

    async fn abort(&mut self, reason: AbortReason) {
        error!("Aborting workflow for pid {}: {}", self.job.pid, reason);
        self.state.complete = true;
        self.state.success = false;
        self.state.abort_reason = Some(reason);
        self.capture_screenshot().await;
        self.session.release().await;
    }

    async fn capture_screenshot(&mut self) {
        let Some(dir) = self.screenshot_dir.clone() else {
            return;
        };
        let Ok(backend) = self.session.backend() else {
            return;
        };
        let bytes = match backend.screenshot().await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Could not capture screenshot: {}", e);
                return;
            }
        };
        let file_name: String = self
            .job
            .pid
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
            .collect();
        let path = dir.join(format!("{file_name}.png"));
        let written = async {
            tokio::fs::create_dir_all(&dir).await?;
            tokio::fs::write(&path, &bytes).await
        };
        match written.await {
            Ok(()) => info!("Screenshot saved to {:?}", path),
            Err(e) => warn!("Could not save screenshot to {:?}: {}", path, e),
        }
    }

    async fn process_step(&mut self, directive: Directive) -> Result<(), BackendError> {
        debug!("Processing directive {}", directive.tag());

        match directive {
            Directive::Visit(url) => {
                let nav = self.session.backend()?.navigate(&url).await?;
                debug!("Navigated to {} ({:?})", nav.url, nav.title);
            }
            Directive::Wait(seconds) => {
                debug!("Sleeping for {} seconds", seconds);
                self.session.backend()?.wait_seconds(seconds).await?;
            }
            Directive::Back => {
                self.session.backend()?.go_back().await?;
            }
            Directive::ExitIframe => {
                self.session.backend()?.exit_frame().await?;
            }
            Directive::Element { action, records } => {
                for record in &records {
                    if self.state.complete {
                        break;
                    }
                    self.apply(action, record).await?;
                }
            }
        }
        Ok(())
    }

    async fn apply(
        &mut self,
        action: ElementAction,
        record: &DirectiveRecord,
    ) -> Result<(), BackendError> {
        let directive = action.tag();
        let Some(locator) = record.locator() else {
            error!(
                "{} directive requiring a find on element missing {:?} entries, skipping",
                directive, SELECTOR_FIELDS
            );
            return Ok(());
        };

        let backend = self.session.backend()?;
        let element = match self.resolver.resolve(backend, action, record).await? {
            Some(element) => element,
            None if record.is_try() => {
                warn!(
                    "{}: element {} not found, continuing (TRY)",
                    directive, locator
                );
                return Ok(());
            }
            None => {
                self.abort(AbortReason::ElementNotFound { directive, locator })
                    .await;
                return Ok(());
            }
        };

        let value = record
            .value
            .as_deref()
            .map(|v| self.job.resolve_alias(v));

        let backend = self.session.backend()?;
        let acted = match action {
            ElementAction::FillIn => match &value {
                Some(text) => backend.fill_text(&element, text).await,
                None => {
                    error!("fill_in directive missing \"value\" entry, skipping");
                    Ok(())
                }
            },
            ElementAction::ClickOn => backend.click(&element).await,
            ElementAction::Select => backend.select_option(&element, value.as_deref()).await,
            ElementAction::EnterIframe => backend.enter_frame(&element).await,
            ElementAction::Return => match value {
                Some(key) => match backend.element_text(&element).await {
                    Ok(text) => {
                        let text = match record.modifier {
                            Some(modifier) => modifier.apply(&text),
                            None => text,
                        };
                        debug!("Returning {} = {:?}", key, text);
                        self.state.results.insert(key, text);
                        Ok(())
                    }
                    Err(e) => Err(e),
                },
                None => {
                    error!("return directive missing \"value\" entry, skipping");
                    Ok(())
                }
            },
        };

        match acted {
            Ok(()) => Ok(()),
            Err(e) if e.is_interaction_failure() => {
                self.abort(AbortReason::Interaction {
                    directive,
                    code: e.code(),
                    message: e.to_string(),
                })
                .await;
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

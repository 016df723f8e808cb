//! Running jobs: one browser session per job, results collected per pid.

use crate::backend::{Backend, BackendError};
use crate::interpreter::{Interpreter, InterpreterOptions, Results, RunError};
use crate::job::Job;
use crate::script::{ScriptError, ScriptLoader};
use crate::session::BrowserSession;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{error, info};

/// `pid -> results`, with `None` for jobs that produced no result.
pub type BatchReport = BTreeMap<String, Option<Results>>;

#[derive(Debug, Error)]
pub enum JobError {
    #[error(transparent)]
    Script(#[from] ScriptError),

    #[error("Failed to start browser session: {0}")]
    Session(#[source] BackendError),

    #[error(transparent)]
    Run(#[from] RunError),
}

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("Failed to access {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in {path:?}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to start browser session: {0}")]
    Session(#[source] BackendError),
}

/// Load the job's script, open a session on `backend` and run it.
pub async fn execute_job<B: Backend + 'static>(
    job: &Job,
    loader: &ScriptLoader,
    backend: B,
    options: &InterpreterOptions,
) -> Result<Results, JobError> {
    let script = loader.load(&job.fips).await?;
    let session = BrowserSession::open(backend)
        .await
        .map_err(JobError::Session)?;
    let mut interpreter = Interpreter::new(job.clone(), script.into_steps(), session, options.clone());
    Ok(interpreter.run().await?)
}

/// Runs a list of jobs, each against a fresh backend from `make_backend`.
pub struct BatchRunner<F> {
    loader: ScriptLoader,
    options: InterpreterOptions,
    make_backend: F,
}

impl<B, F> BatchRunner<F>
where
    B: Backend + 'static,
    F: FnMut() -> B,
{
    pub fn new(loader: ScriptLoader, options: InterpreterOptions, make_backend: F) -> Self {
        Self {
            loader,
            options,
            make_backend,
        }
    }

    /// Run every job in order.
    ///
    /// A job that cannot load its script, aborts, or hits a browser error is
    /// recorded as `None`. Failing to start a browser session stops the batch.
    pub async fn run(&mut self, jobs: &[Job]) -> Result<BatchReport, BatchError> {
        let mut report = BatchReport::new();
        for (index, job) in jobs.iter().enumerate() {
            info!("Job {}/{}: pid {} fips {}", index + 1, jobs.len(), job.pid, job.fips);
            let backend = (self.make_backend)();
            let outcome = match execute_job(job, &self.loader, backend, &self.options).await {
                Ok(results) => Some(results),
                Err(JobError::Session(e)) => return Err(BatchError::Session(e)),
                Err(e) => {
                    error!("No result for pid {}: {}", job.pid, e);
                    None
                }
            };
            report.insert(job.pid.clone(), outcome);
        }
        let succeeded = report.values().filter(|r| r.is_some()).count();
        info!("Batch finished: {}/{} jobs succeeded", succeeded, report.len());
        Ok(report)
    }
}

pub async fn load_jobs(path: &Path) -> Result<Vec<Job>, BatchError> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| BatchError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    serde_json::from_str(&content).map_err(|source| BatchError::Json {
        path: path.to_path_buf(),
        source,
    })
}

pub async fn write_report(path: &Path, report: &BatchReport) -> Result<(), BatchError> {
    let json = serde_json::to_string_pretty(report).map_err(|source| BatchError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    tokio::fs::write(path, json)
        .await
        .map_err(|source| BatchError::Io {
            path: path.to_path_buf(),
            source,
        })
}

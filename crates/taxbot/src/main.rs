mod logging;

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::io::{self, Write};
use std::path::PathBuf;
use taxbot_e::backend::WebDriverBackend;
use taxbot_engine::batch::{self, BatchRunner, JobError};
use taxbot_engine::config::loader::ConfigLoader;
use taxbot_engine::config::schema::TaxbotConfig;
use taxbot_engine::interpreter::{InterpreterOptions, RunError};
use taxbot_engine::job::Job;
use taxbot_engine::script::ScriptLoader;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "taxbot", version, about = "County tax record extraction")]
struct Args {
    #[command(subcommand)]
    mode: Mode,

    /// Config file (defaults to ./taxbot.yaml, then ~/.taxbot/config.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// URL of the WebDriver server
    #[arg(long, global = true)]
    webdriver_url: Option<String>,

    /// Directory holding <fips>.yaml scripts
    #[arg(long, global = true)]
    scripts_dir: Option<PathBuf>,

    /// Also write logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Mode {
    /// Process a single property and print its results
    Run {
        /// The pid you are using
        #[arg(short, long)]
        pid: Option<String>,
        /// The county fips code you are using
        #[arg(short, long)]
        fips: Option<String>,
    },
    /// Process a JSON list of {pid, fips} jobs and write {pid: results} JSON
    Batch {
        #[arg(long)]
        jobs: Option<PathBuf>,
        #[arg(long)]
        out: Option<PathBuf>,
        /// Only process the first N jobs
        #[arg(long)]
        limit: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let _log_guard = logging::init_logging(args.verbose, args.log_file.as_deref())?;

    let mut config = match &args.config {
        Some(path) => ConfigLoader::load_from(path).await?,
        None => ConfigLoader::load_default().await?,
    };
    if let Some(url) = args.webdriver_url {
        config.browser.webdriver_url = url;
    }
    if let Some(dir) = args.scripts_dir {
        config.scripts.dir = dir;
    }

    match args.mode {
        Mode::Run { pid, fips } => run_single(&config, pid, fips).await,
        Mode::Batch { jobs, out, limit } => {
            if let Some(jobs) = jobs {
                config.batch.jobs_file = jobs;
            }
            if let Some(out) = out {
                config.batch.output_file = out;
            }
            if limit.is_some() {
                config.batch.limit = limit;
            }
            run_batch(&config).await
        }
    }
}

async fn run_single(
    config: &TaxbotConfig,
    pid: Option<String>,
    fips: Option<String>,
) -> anyhow::Result<()> {
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let pid = match pid {
        Some(pid) => pid,
        None => prompt(&mut stdin, "enter pid: ").await?,
    };
    let fips = match fips {
        Some(fips) => fips,
        None => prompt(&mut stdin, "enter fips: ").await?,
    };

    let job = Job::new(pid, fips);
    let loader = ScriptLoader::new(config.scripts.dir.clone());
    let options = InterpreterOptions::from(config);
    let backend = WebDriverBackend::new(config.browser.clone());

    match batch::execute_job(&job, &loader, backend, &options).await {
        Ok(results) => {
            println!("{}", serde_json::to_string_pretty(&results)?);
            Ok(())
        }
        Err(JobError::Run(RunError::Aborted(reason))) => {
            warn!("No result for pid {}: {}", job.pid, reason);
            println!("null");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

async fn run_batch(config: &TaxbotConfig) -> anyhow::Result<()> {
    let mut jobs = batch::load_jobs(&config.batch.jobs_file).await?;
    if let Some(limit) = config.batch.limit {
        jobs.truncate(limit);
    }
    info!(
        "Loaded {} job(s) from {}",
        jobs.len(),
        config.batch.jobs_file.display()
    );

    let loader = ScriptLoader::new(config.scripts.dir.clone());
    let browser = config.browser.clone();
    let mut runner = BatchRunner::new(loader, InterpreterOptions::from(config), || {
        WebDriverBackend::new(browser.clone())
    });
    let report = runner.run(&jobs).await?;

    batch::write_report(&config.batch.output_file, &report).await?;
    let succeeded = report.values().filter(|r| r.is_some()).count();
    println!(
        "{}/{} job(s) succeeded, results written to {}",
        succeeded,
        report.len(),
        config.batch.output_file.display()
    );
    Ok(())
}

async fn prompt(
    reader: &mut tokio::io::Lines<BufReader<tokio::io::Stdin>>,
    message: &str,
) -> anyhow::Result<String> {
    print!("{}", message);
    io::stdout().flush()?;
    let line = reader
        .next_line()
        .await?
        .context("stdin closed before a value was entered")?;
    Ok(line.trim().to_string())
}

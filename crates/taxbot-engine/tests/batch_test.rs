mod common;

use common::{Call, MockBackend, calls, fast_options};
use std::sync::{Arc, Mutex};
use taxbot_engine::batch::{self, BatchError, BatchRunner, JobError};
use taxbot_engine::interpreter::RunError;
use taxbot_engine::job::Job;
use taxbot_engine::locator::Locator;
use taxbot_engine::script::{ScriptError, ScriptLoader};
use tempfile::TempDir;

const RETURN_AMOUNT: &str = r#"
form:
  steps:
    - visit: "http://county.example"
    - return:
        - id: amount
          value: amount_due
          mod: CLEAN_INT
"#;

const CLICK_MISSING: &str = r#"
form:
  steps:
    - click_on:
        - id: missing
"#;

fn scripts() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("100.yaml"), RETURN_AMOUNT).unwrap();
    std::fs::write(dir.path().join("200.yaml"), CLICK_MISSING).unwrap();
    dir
}

fn page() -> MockBackend {
    MockBackend::new().with_text(Locator::Id("amount".into()), "$ 88.20")
}

#[tokio::test]
async fn test_execute_job_success() {
    let dir = scripts();
    let loader = ScriptLoader::new(dir.path());

    let results = batch::execute_job(&Job::new("P1", "100"), &loader, page(), &fast_options())
        .await
        .unwrap();

    assert_eq!(results["amount_due"], "88.20");
}

#[tokio::test]
async fn test_execute_job_missing_script_never_launches() {
    let dir = scripts();
    let loader = ScriptLoader::new(dir.path());
    let backend = page();
    let log = backend.calls.clone();

    let err = batch::execute_job(&Job::new("P1", "999"), &loader, backend, &fast_options())
        .await
        .unwrap_err();

    assert!(matches!(err, JobError::Script(ScriptError::Io { .. })));
    assert!(calls(&log).is_empty());
}

#[tokio::test]
async fn test_execute_job_abort() {
    let dir = scripts();
    let loader = ScriptLoader::new(dir.path());

    let err = batch::execute_job(&Job::new("P2", "200"), &loader, page(), &fast_options())
        .await
        .unwrap_err();

    assert!(matches!(err, JobError::Run(RunError::Aborted(_))));
}

#[tokio::test]
async fn test_batch_records_none_for_failed_jobs() {
    let dir = scripts();
    let log = Arc::new(Mutex::new(Vec::new()));
    let shared = log.clone();
    let mut runner = BatchRunner::new(ScriptLoader::new(dir.path()), fast_options(), move || {
        MockBackend {
            calls: shared.clone(),
            ..page()
        }
    });

    let jobs = vec![
        Job::new("P1", "100"),
        Job::new("P2", "200"),
        Job::new("P3", "999"),
        Job::new("P4", "100"),
    ];
    let report = runner.run(&jobs).await.unwrap();

    assert_eq!(report.len(), 4);
    assert_eq!(report["P1"].as_ref().unwrap()["amount_due"], "88.20");
    assert!(report["P2"].is_none());
    assert!(report["P3"].is_none());
    assert!(report["P4"].is_some());

    // One session per job that had a script, each closed.
    let log = calls(&log);
    let launches = log.iter().filter(|c| **c == Call::Launch).count();
    let closes = log.iter().filter(|c| **c == Call::Close).count();
    assert_eq!(launches, 3);
    assert_eq!(closes, 3);
}

#[tokio::test]
async fn test_launch_failure_stops_batch() {
    let dir = scripts();
    let mut runner = BatchRunner::new(ScriptLoader::new(dir.path()), fast_options(), || {
        MockBackend {
            fail_launch: true,
            ..page()
        }
    });

    let err = runner
        .run(&[Job::new("P1", "100"), Job::new("P4", "100")])
        .await
        .unwrap_err();
    assert!(matches!(err, BatchError::Session(_)));
}

#[tokio::test]
async fn test_report_round_trips_through_files() {
    let dir = tempfile::tempdir().unwrap();
    let jobs_path = dir.path().join("test.json");
    std::fs::write(
        &jobs_path,
        r#"[{"pid": "0420-17", "fips": "51059"}, {"pid": "77", "fips": "51107"}]"#,
    )
    .unwrap();

    let jobs = batch::load_jobs(&jobs_path).await.unwrap();
    assert_eq!(jobs, vec![Job::new("0420-17", "51059"), Job::new("77", "51107")]);

    let mut report = batch::BatchReport::new();
    report.insert(
        "0420-17".into(),
        Some([("amount_due".to_string(), "12.00".to_string())].into()),
    );
    report.insert("77".into(), None);

    let out = dir.path().join("out.json");
    batch::write_report(&out, &report).await.unwrap();

    let written: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(written["0420-17"]["amount_due"], "12.00");
    assert!(written["77"].is_null());
}

#[tokio::test]
async fn test_load_jobs_errors() {
    let dir = tempfile::tempdir().unwrap();
    let missing = batch::load_jobs(&dir.path().join("nope.json")).await;
    assert!(matches!(missing, Err(BatchError::Io { .. })));

    let bad = dir.path().join("bad.json");
    std::fs::write(&bad, "[{\"pid\": 1}]").unwrap();
    assert!(matches!(
        batch::load_jobs(&bad).await,
        Err(BatchError::Json { .. })
    ));
}

use taxbot_engine::directive::{Directive, ElementAction};
use taxbot_engine::script::{ScriptError, ScriptLoader};
use tempfile::TempDir;

const FAIRFAX: &str = r##"
form:
  steps:
    - visit: "https://county.example/search"
    - fill_in:
        - id: parcel
          value: $PID
    - click_on:
        id: submit
    - wait: 1.5
    - return:
        - selector: "td.amount"
          value: amount_due
          mod: CLEAN_INT
          alt_selector:
            - "span.amount"
            - "#total"
"##;

fn scripts_dir(files: &[(&str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for (name, content) in files {
        std::fs::write(dir.path().join(name), content).unwrap();
    }
    dir
}

#[tokio::test]
async fn test_load_script_by_fips() {
    let dir = scripts_dir(&[("51059.yaml", FAIRFAX)]);
    let loader = ScriptLoader::new(dir.path());

    let script = loader.load("51059").await.expect("script should load");
    let steps = script.steps();

    assert_eq!(steps.len(), 5);
    assert_eq!(steps[0], Directive::Visit("https://county.example/search".into()));
    assert_eq!(steps[3], Directive::Wait(1.5));
    match &steps[2] {
        Directive::Element { action, records } => {
            assert_eq!(*action, ElementAction::ClickOn);
            assert_eq!(records.len(), 1);
        }
        other => panic!("unexpected directive {other:?}"),
    }
    match &steps[4] {
        Directive::Element { records, .. } => {
            assert_eq!(records[0].alt_selector, vec!["span.amount", "#total"]);
        }
        other => panic!("unexpected directive {other:?}"),
    }
}

#[tokio::test]
async fn test_missing_script_is_io_error() {
    let dir = scripts_dir(&[]);
    let loader = ScriptLoader::new(dir.path());

    let err = loader.load("99999").await.unwrap_err();
    assert!(matches!(err, ScriptError::Io { .. }));
}

#[tokio::test]
async fn test_fips_cannot_escape_scripts_dir() {
    let loader = ScriptLoader::new("yamls");
    for fips in ["../etc/passwd", "", "51 059", "a/b"] {
        let err = loader.load(fips).await.unwrap_err();
        assert!(
            matches!(err, ScriptError::InvalidFips(_)),
            "{fips:?} should be rejected"
        );
    }
    assert!(loader.path_for("51059").unwrap().ends_with("51059.yaml"));
}

#[tokio::test]
async fn test_missing_steps_is_parse_error() {
    let dir = scripts_dir(&[("1.yaml", "form:\n  name: nothing here\n")]);
    let loader = ScriptLoader::new(dir.path());

    let err = loader.load("1").await.unwrap_err();
    assert!(matches!(err, ScriptError::Parse { .. }));
}

#[tokio::test]
async fn test_unknown_directive_is_reported() {
    let script = "form:\n  steps:\n    - scroll_to:\n        - id: footer\n";
    let dir = scripts_dir(&[("1.yaml", script)]);
    let loader = ScriptLoader::new(dir.path());

    let err = loader.load("1").await.unwrap_err();
    assert!(matches!(err, ScriptError::Parse { .. }));
    assert!(err.to_string().contains("1.yaml"));
}

#[tokio::test]
async fn test_unknown_modifier_is_reported() {
    let script = "form:\n  steps:\n    - return:\n        - id: a\n          value: a\n          mod: UPPERCASE\n";
    let dir = scripts_dir(&[("1.yaml", script)]);
    let loader = ScriptLoader::new(dir.path());

    assert!(matches!(
        loader.load("1").await.unwrap_err(),
        ScriptError::Parse { .. }
    ));
}

#[tokio::test]
async fn test_unrepresentable_wait_is_reported() {
    let script = "form:\n  steps:\n    - visit: \"http://x\"\n    - wait: 1e20\n";
    let dir = scripts_dir(&[("1.yaml", script)]);
    let loader = ScriptLoader::new(dir.path());

    let err = loader.load("1").await.unwrap_err();
    assert!(matches!(err, ScriptError::Parse { .. }));
    assert!(err.to_string().contains("wait"));
}

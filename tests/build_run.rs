//! End-to-end runs of the orchestrator against a throwaway project

use qualis_core::{Args, GlobalOptions, HistoryStore, ProjectPaths, Qualis};
use qualis_suite::ScriptedFactory;
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

const CONFIG: &str = r#"
project_name = "suite"
build_order = "cs,missing,info"

[modules.lint]
command = "cs"
class = "Scripted"
label = "lint"

[modules.info]
class = "Scripted"
label = "info"
code = "8"
pass = "false"
"#;

fn project(config: &str) -> (TempDir, ProjectPaths) {
    let dir = TempDir::new().unwrap();
    let paths = ProjectPaths::new(dir.path());
    fs::create_dir_all(paths.state_dir()).unwrap();
    fs::write(paths.config_file(), config).unwrap();
    (dir, paths)
}

fn run(paths: &ProjectPaths, tokens: &[&str]) -> (i32, String) {
    let args = Args::parse(tokens.iter().copied());
    let options = GlobalOptions::default().merge_args(&args);
    let mut app = Qualis::new(paths.clone(), options).with_factory(Arc::new(ScriptedFactory));
    let mut out = Vec::new();
    let code = app.run(&args, &mut out).unwrap();
    (code, String::from_utf8(out).unwrap())
}

#[test]
fn test_all_runs_build_order_and_records_history() {
    let (_dir, paths) = project(CONFIG);

    let (code, out) = run(&paths, &["all"]);
    assert_eq!(code, 0);
    assert!(out.contains("Project: suite"));
    assert!(out.contains("Running lint"));
    assert!(out.contains("Running info"));
    // Separators follow executed modules only
    assert_eq!(out.matches(&"%".repeat(80)).count(), 2);

    let history = HistoryStore::new(paths.history_file());
    let records = history.read(Some("cs")).unwrap();
    assert_eq!(records.len(), 1);
    assert!(records[0].status);
    assert_eq!(records[0].summary, "lint: PASS");
    assert_eq!(records[0].metric, "1");

    // Benign return codes are not recorded
    assert!(history.read(Some("info")).unwrap().is_empty());
}

#[test]
fn test_history_accumulates_across_invocations() {
    let (_dir, paths) = project(CONFIG);

    run(&paths, &["all"]);
    run(&paths, &["cs"]);

    let records = HistoryStore::new(paths.history_file()).read(None).unwrap();
    let lint: Vec<_> = records.iter().filter(|r| r.module == "cs").collect();
    assert_eq!(lint.len(), 2);
    assert_eq!(lint[1].metric, "2");

    let (code, out) = run(&paths, &["history", "cs"]);
    assert_eq!(code, 0);
    assert!(out.contains("Module filter: cs"));
    assert!(out.contains("PASS"));
}

#[test]
fn test_short_summary_after_a_build() {
    let (_dir, paths) = project(CONFIG);
    run(&paths, &["all"]);

    let (code, out) = run(&paths, &["summary", "--short", "--no-color", "-q"]);
    assert_eq!(code, 0);
    assert!(out.starts_with(&"-".repeat(32)));
    assert!(out.contains("lint: PASS\n"));
    assert!(out.contains("info: FAIL\n"));
}

#[test]
fn test_default_build_order_skips_unregistered_modules() {
    let (_dir, paths) = project(
        r#"
project_name = "suite"

[modules.lint]
command = "cs"
class = "Scripted"
label = "lint"
"#,
    );

    // Default order is cs,test,coverage and only cs is registered
    let (code, out) = run(&paths, &["all", "-q"]);
    assert_eq!(code, 0);
    assert!(out.contains("Running lint"));
    assert_eq!(out.matches(&"%".repeat(80)).count(), 1);
}

#[test]
fn test_unregistered_class_leaves_module_out() {
    let (_dir, paths) = project(
        r#"
project_name = "suite"

[modules.mystery]
class = "DoesNotExist"
"#,
    );

    let (code, out) = run(&paths, &["modules"]);
    assert_eq!(code, 0);
    assert!(!out.contains("mystery"));
}

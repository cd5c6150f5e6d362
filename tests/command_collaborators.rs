//! A full run driven purely by configured shell commands

#![cfg(target_os = "linux")]

use std::path::Path;
use sweep::{CompletionReason, Engine, Orchestrator, RunOutcome, StartMode, SweepConfig};

const LINT_COMMAND: &str = r#"sh -c 'for f in src/*.rs; do n=$(grep -c "^LINT" "$f"); [ "$n" -gt 0 ] && printf "{\"file\":\"%s\",\"severity\":%s,\"occurrences\":%s}\n" "$f" "$n" "$n"; done | paste -sd, - | sed "s/.*/[&]/"'"#;

fn write(root: &Path, name: &str, content: &str) {
    std::fs::write(root.join("src").join(name), content).unwrap();
}

fn config() -> SweepConfig {
    let mut config = SweepConfig::default();
    config.commands.lint = Some(LINT_COMMAND.to_string());
    config.commands.build = Some("true".to_string());
    config.commands.test = Some("true".to_string());
    config.commands.coverage_total = Some(r#"echo '{"percent": 88.5}'"#.to_string());
    config.commands.transform = Some("sed -i /^LINT/d {file}".to_string());
    config
}

#[tokio::test]
async fn test_commands_fix_lint_until_clean() {
    let dir = tempfile::TempDir::new().unwrap();
    std::fs::create_dir_all(dir.path().join("src")).unwrap();
    write(dir.path(), "a.rs", "LINT\nfn a() {}\nLINT\n");
    write(dir.path(), "b.rs", "fn b() {}\n");

    let engine = Engine::builder(dir.path())
        .with_config(config())
        .with_configured_commands()
        .unwrap()
        .build()
        .unwrap();
    let summary = Orchestrator::new(engine).run(StartMode::Fresh).await;

    assert_eq!(
        summary.outcome,
        RunOutcome::Complete {
            completion: CompletionReason::Clean
        }
    );
    assert_eq!(
        std::fs::read_to_string(dir.path().join("src/a.rs")).unwrap(),
        "fn a() {}\n"
    );
    assert_eq!(summary.metrics.coverage_percent, Some(88.5));
}

#[tokio::test]
async fn test_failing_test_command_restores_files() {
    let dir = tempfile::TempDir::new().unwrap();
    std::fs::create_dir_all(dir.path().join("src")).unwrap();
    write(dir.path(), "a.rs", "LINT\nfn a() {}\n");

    let mut config = config();
    config.commands.test = Some("sh -c 'echo 1 test failed >&2; exit 101'".to_string());
    let engine = Engine::builder(dir.path())
        .with_config(config)
        .with_configured_commands()
        .unwrap()
        .build()
        .unwrap();
    let summary = Orchestrator::new(engine).run(StartMode::Fresh).await;

    assert!(matches!(
        summary.outcome,
        RunOutcome::Complete {
            completion: CompletionReason::Exhausted { .. }
        }
    ));
    assert_eq!(
        std::fs::read_to_string(dir.path().join("src/a.rs")).unwrap(),
        "LINT\nfn a() {}\n"
    );
    assert_eq!(
        summary.skipped[0].reason.as_deref(),
        Some("test gate failed: 1 test failed")
    );
}

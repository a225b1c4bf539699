//! Integration tests for the averloc CLI.

use flate2::Compression;
use flate2::write::GzEncoder;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use std::process::{Command, Output};

const TRANSFORM_DIRS: [&str; 9] = [
    "transforms.Identity",
    "transforms.AddDeadCode",
    "transforms.WrapTryCatch",
    "transforms.UnrollWhiles",
    "transforms.InsertPrintStatements",
    "transforms.RenameFields",
    "transforms.RenameLocalVariables",
    "transforms.RenameParameters",
    "transforms.ReplaceTrueFalse",
];

/// Touched by every transform.
const FULL: &str = "class WRAPPER {
    boolean flag = true;
    int count(int n) {
        int total = 0;
        while (n > 0) {
            total += n;
            n--;
        }
        return total;
    }
}";

const BROKEN: &str = "class WRAPPER { void f( { }";

/// Command with a clean environment: no stray sampling or config settings.
fn averloc(config_dir: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_averloc"));
    cmd.env_remove("DEPTH_K")
        .env_remove("SAMPLES")
        .env_remove("AVERLOC_JUST_TEST")
        .env_remove("AVERLOC_INPUT_DIR")
        .env_remove("AVERLOC_OUTPUT_DIR")
        .env_remove("RUST_LOG")
        .arg("--config")
        .arg(config_dir.join("config.toml"));
    cmd
}

fn run(cmd: &mut Command) -> Output {
    cmd.output().expect("Failed to execute command")
}

fn write_split(dir: &Path, split: &str, records: &[(&str, &str)]) {
    let file = File::create(dir.join(format!("{split}.jsonl.gz"))).unwrap();
    let mut encoder = GzEncoder::new(file, Compression::default());
    for (hash, code) in records {
        let line = serde_json::json!({ "source_code": code, "sha256_hash": hash });
        writeln!(encoder, "{line}").unwrap();
    }
    encoder.finish().unwrap();
}

fn count_files(dir: &Path) -> usize {
    fs::read_dir(dir).map(|entries| entries.count()).unwrap_or(0)
}

#[test]
fn test_help() {
    let dir = tempfile::tempdir().unwrap();
    let output = run(averloc(dir.path()).arg("--help"));

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Semantics-preserving source transformation"));
}

#[test]
fn test_list() {
    let dir = tempfile::tempdir().unwrap();
    let output = run(averloc(dir.path()).arg("list"));

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for name in &TRANSFORM_DIRS[1..] {
        assert!(stdout.contains(name), "missing {name} in:\n{stdout}");
    }
    assert!(stdout.contains("Total: 8 transforms"));
}

#[test]
fn test_plan_default() {
    let dir = tempfile::tempdir().unwrap();
    let output = run(averloc(dir.path()).arg("plan"));

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Plan (9 entries)"));
    assert!(stdout.contains("1. transforms.Identity"));
    assert!(stdout.contains("transforms.ReplaceTrueFalse (pass 1)"));
}

#[test]
fn test_plan_sampled_from_env() {
    let dir = tempfile::tempdir().unwrap();
    let output = run(averloc(dir.path())
        .arg("plan")
        .env("DEPTH_K", "2")
        .env("SAMPLES", "3"));

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Plan (4 entries)"));
    assert!(stdout.contains("depth-2-sample-1 ["));
    assert!(stdout.contains("depth-2-sample-3 ["));
}

#[test]
fn test_plan_rejects_half_sampling() {
    let dir = tempfile::tempdir().unwrap();
    let output = run(averloc(dir.path()).args(["plan", "--depth-k", "2"]));
    assert!(!output.status.success());

    let output = run(averloc(dir.path()).args(["plan", "--depth-k", "0", "--samples", "1"]));
    assert!(!output.status.success());
}

#[test]
fn test_run_all_splits() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in");
    let out = dir.path().join("out");
    fs::create_dir_all(&input).unwrap();

    write_split(&input, "test", &[("t1", FULL), ("t2", FULL)]);
    write_split(&input, "train", &[("r1", FULL)]);
    write_split(&input, "valid", &[("v1", FULL)]);

    let output = run(averloc(dir.path())
        .args(["run", "--workers", "2", "--chunk-size", "1"])
        .arg("--input-dir")
        .arg(&input)
        .arg("--output-dir")
        .arg(&out));

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Processed 4 units in 4 tasks"));
    assert!(stdout.contains("Wrote 36 files"));

    for name in TRANSFORM_DIRS {
        assert_eq!(count_files(&out.join(name).join("test")), 2, "{name}");
        assert!(out.join(name).join("train/r1.java").exists(), "{name}");
        assert!(out.join(name).join("valid/v1.java").exists(), "{name}");
    }

    let identity = fs::read_to_string(out.join("transforms.Identity/test/t1.java")).unwrap();
    assert!(identity.starts_with("class WRAPPER_t1 {"));
}

#[test]
fn test_run_test_only_from_env() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");
    write_split(dir.path(), "test", &[("t1", FULL)]);

    let output = run(averloc(dir.path())
        .args(["-q", "run", "--sequential"])
        .env("AVERLOC_JUST_TEST", "TRUE")
        .env("AVERLOC_INPUT_DIR", dir.path())
        .env("AVERLOC_OUTPUT_DIR", &out));

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(output.stdout.is_empty());
    assert!(out.join("transforms.Identity/test/t1.java").exists());
    assert!(!out.join("transforms.Identity/train").exists());
}

#[test]
fn test_run_isolates_broken_unit() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");
    write_split(
        dir.path(),
        "test",
        &[("good1", FULL), ("broken", BROKEN), ("good2", FULL)],
    );

    let output = run(averloc(dir.path())
        .args(["run", "--test-only", "--sequential"])
        .arg("--input-dir")
        .arg(dir.path())
        .arg("--output-dir")
        .arg(&out));

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Units failed: 1"));

    for name in TRANSFORM_DIRS {
        let split_dir = out.join(name).join("test");
        assert!(split_dir.join("good1.java").exists(), "{name}");
        assert!(split_dir.join("good2.java").exists(), "{name}");
        assert!(!split_dir.join("broken.java").exists(), "{name}");
    }
}

#[test]
fn test_run_sampled_writes_sequence_dirs() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");
    write_split(dir.path(), "test", &[("t1", FULL)]);

    let output = run(averloc(dir.path())
        .args(["run", "--test-only", "--depth-k", "1", "--samples", "2", "--seed", "5"])
        .arg("--input-dir")
        .arg(dir.path())
        .arg("--output-dir")
        .arg(&out));

    assert!(output.status.success());
    assert!(out.join("transforms.Identity/test/t1.java").exists());
    // Every atomic transform changes FULL, so each depth-1 sequence writes it.
    assert!(out.join("depth-1-sample-1/test/t1.java").exists());
    assert!(out.join("depth-1-sample-2/test/t1.java").exists());
}

#[test]
fn test_run_depth_three_sequences() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");
    write_split(dir.path(), "test", &[("t1", FULL), ("t2", FULL)]);

    let output = run(averloc(dir.path())
        .args(["run", "--test-only", "--depth-k", "3", "--samples", "2", "--seed", "17"])
        .arg("--input-dir")
        .arg(dir.path())
        .arg("--output-dir")
        .arg(&out));

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let mut sequences: Vec<String> = fs::read_dir(&out)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|name| name.starts_with("depth-"))
        .collect();
    sequences.sort();
    assert_eq!(sequences, vec!["depth-3-sample-1", "depth-3-sample-2"]);

    for name in &sequences {
        assert_eq!(count_files(&out.join(name).join("test")), 2, "{name}");
    }
    assert_eq!(count_files(&out.join("transforms.Identity/test")), 2);
}

#[test]
fn test_run_without_inputs_completes() {
    let dir = tempfile::tempdir().unwrap();
    let output = run(averloc(dir.path())
        .args(["run", "--test-only"])
        .arg("--input-dir")
        .arg(dir.path().join("missing"))
        .arg("--output-dir")
        .arg(dir.path().join("out")));

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Processed 0 units in 0 tasks"));
    assert!(stdout.contains("Wrote 0 files"));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Skipping test"));
}

#[test]
fn test_run_keeps_task_logs_off_progress_output() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");
    write_split(dir.path(), "test", &[("t1", FULL), ("t2", FULL)]);

    let output = run(averloc(dir.path())
        .args(["run", "--test-only", "--chunk-size", "1"])
        .arg("--input-dir")
        .arg(dir.path())
        .arg("--output-dir")
        .arg(&out));

    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(!stderr.contains("Tasks finished"), "stderr: {stderr}");

    let output = run(averloc(dir.path())
        .args(["-v", "run", "--test-only", "--chunk-size", "1"])
        .arg("--input-dir")
        .arg(dir.path())
        .arg("--output-dir")
        .arg(&out));

    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Tasks finished: 2/2"), "stderr: {stderr}");
}

#[test]
fn test_completions() {
    let dir = tempfile::tempdir().unwrap();
    let output = run(averloc(dir.path()).args(["completions", "bash"]));

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("averloc"));
}

use std::process::{Command, Output};

fn ultramem(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_ultramem"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("run ultramem")
}

fn assert_rejected(args: &[&str], needle: &str) {
    let output = ultramem(args);
    assert_eq!(output.status.code(), Some(1), "args {args:?}");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains(needle),
        "args {args:?}: expected {needle:?} in stderr, got: {stderr}"
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        !stdout.contains("UltraMem - Memory Bandwidth Benchmark"),
        "args {args:?}: run banner printed before rejection"
    );
}

#[test]
fn thread_count_bounds() {
    assert_rejected(&["0", "1:1", "1"], "num_threads must be between 1 and 1024");
    assert_rejected(&["1025", "1:1", "1"], "num_threads must be between 1 and 1024");
}

#[test]
fn pattern_bounds() {
    assert_rejected(&["1", "0:0", "1"], "cannot both be 0");
    assert_rejected(&["1", "101:5", "1"], "between 0 and 100");
    assert_rejected(&["1", "1-1", "1"], "unknown kernel");
    assert_rejected(&["1", "a:1", "1"], "reads:writes");
}

#[test]
fn array_size_bounds() {
    assert_rejected(&["1", "1:1", "0"], "array_size_mb must be between 1 and 65536");
    assert_rejected(&["1", "1:1", "65537"], "array_size_mb must be between 1 and 65536");
    assert_rejected(&["1", "1:1", "-5"], "between 1 and 65536 (got -5)");
}

#[test]
fn trial_bounds() {
    assert_rejected(&["1", "1:1", "1", "--trials", "1"], "trials must be between 2");
}

#[test]
fn non_numeric_threads_fail() {
    let output = ultramem(&["many", "1:1"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(!output.stderr.is_empty());
}

#[test]
fn missing_arguments_print_usage_to_stdout() {
    for args in [&[][..], &["4"][..]] {
        let output = ultramem(args);
        assert_eq!(output.status.code(), Some(1), "args {args:?}");
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("Usage:"), "args {args:?}: {stdout}");
        assert!(stdout.contains("<NUM_THREADS>"));
    }
}

#[test]
fn help_exits_zero() {
    let output = ultramem(&["--help"]);
    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("--trials"));
    assert!(stdout.contains("--format"));
}

#[test]
fn json_end_to_end_64_mib() {
    let output = ultramem(&["4", "1:1", "64", "--format", "json"]);
    assert!(
        output.status.success(),
        "ultramem failed: stderr={}",
        String::from_utf8_lossy(&output.stderr)
    );

    let v: serde_json::Value = serde_json::from_slice(&output.stdout).expect("stdout is JSON");
    assert_eq!(v["threads"], 4);
    assert_eq!(v["trials"], 20);
    assert_eq!(v["size"]["element_count"], 8_388_608);
    assert_eq!(v["size"]["per_array_mib"], 64);
    assert_eq!(v["size"]["source"], "operator");

    let result = &v["results"][0];
    assert_eq!(result["label"], "1:1");
    assert_eq!(result["bytes_per_trial"], 134_217_728u64);
    assert_eq!(result["measured"], 19);
    let best = result["best_mbps"].as_f64().expect("best_mbps is a number");
    assert!(best.is_finite() && best > 0.0, "best_mbps = {best}");
    assert!(result["avg_mbps"].as_f64().unwrap() <= best * (1.0 + 1e-9));
}

#[test]
fn text_report_for_named_kernel() {
    let output = ultramem(&["2", "triad", "1", "--trials", "3"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("System info:"));
    assert!(stdout.contains("Cache Hierarchy Detected"));
    assert!(stdout.contains("  Threads:           2"));
    assert!(stdout.contains("  Array elements:    131072"));
    assert!(stdout.contains("  Iterations:        3"));
    assert!(stdout.contains("\nTriad "));
    assert!(stdout.contains("PEAK BANDWIDTH:"));
}

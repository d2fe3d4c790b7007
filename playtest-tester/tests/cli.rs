use std::process::Command;

fn temp_path(label: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!(
        "playtest-cli-{label}-{}",
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos()
    ))
}

#[test]
fn cli_list_personas_writes_output() {
    let exe = env!("CARGO_BIN_EXE_playtest-tester");
    let output_path = temp_path("list");
    let status = Command::new(exe)
        .args(["--list-personas", "--output"])
        .arg(&output_path)
        .status()
        .expect("run cli");
    assert!(status.success());
    let content = std::fs::read_to_string(output_path).expect("read output");
    assert!(content.contains("Available personas"));
    assert!(content.contains("aggressive_rusher"));
}

#[test]
fn cli_runs_a_small_session_with_json_report() {
    let exe = env!("CARGO_BIN_EXE_playtest-tester");
    let output_path = temp_path("run");
    let output = Command::new(exe)
        .args([
            "--personas",
            "tech_innovator,risk_taker",
            "--games-per-persona",
            "1",
            "--max-ticks",
            "120",
            "--seed",
            "99",
            "--report",
            "json",
            "--output",
        ])
        .arg(&output_path)
        .output()
        .expect("run cli");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("RTS Playtest Runner"));
    let content = std::fs::read_to_string(output_path).expect("read output");
    let json: serde_json::Value = serde_json::from_str(&content).expect("valid json");
    assert_eq!(json["total_games"], 2);
    assert_eq!(json["seed"], 99);
}

#[test]
fn cli_accepts_negative_seed() {
    let exe = env!("CARGO_BIN_EXE_playtest-tester");
    let output_path = temp_path("negative-seed");
    let output = Command::new(exe)
        .args([
            "--personas",
            "risk_taker",
            "--games-per-persona",
            "1",
            "--max-ticks",
            "60",
            "--seed",
            "-7",
            "--report",
            "json",
            "--output",
        ])
        .arg(&output_path)
        .output()
        .expect("run cli");
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let content = std::fs::read_to_string(output_path).expect("read output");
    let json: serde_json::Value = serde_json::from_str(&content).expect("valid json");
    assert_eq!(json["seed"], 7);
}

#[test]
fn cli_rejects_unknown_persona() {
    let exe = env!("CARGO_BIN_EXE_playtest-tester");
    let output = Command::new(exe)
        .args(["--personas", "pacifist", "--max-ticks", "10"])
        .output()
        .expect("run cli");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Unknown persona"));
}

mod common;
mod utils;

use anyhow::Result;
use common::TestEnvironment;
use serde_json::json;

#[test]
fn test_plan_prints_keep_timeline() -> Result<()> {
    let env = TestEnvironment::new()?;
    let report = env.fixture("talk_silencedetect.log");

    let output = utils::run_removesilence_command(
        &env,
        &["plan", "--report", report.to_str().unwrap()],
    )?;

    assert_eq!(output.exit_code, 0, "plan failed: {}", output.stderr);
    // Defaults: 2s max pause, no intro/outro trimming
    assert!(
        output.stdout.contains("[0-9 12-]"),
        "unexpected timeline:\n{}",
        output.stdout
    );
    Ok(())
}

#[test]
fn test_plan_json_output_with_paddings() -> Result<()> {
    let env = TestEnvironment::new()?;
    let report = env.fixture("talk_silencedetect.log");

    let output = utils::run_removesilence_command(
        &env,
        &[
            "--output",
            "json",
            "plan",
            "--report",
            report.to_str().unwrap(),
            "--max-pause",
            "2",
            "--intro-padding",
            "0.5",
            "--outro-padding",
            "1",
        ],
    )?;

    assert_eq!(output.exit_code, 0, "plan failed: {}", output.stderr);

    let silences = output.event("silence.detect.report")?;
    assert_eq!(silences["data"]["duration"], json!(30.0));
    assert_eq!(
        silences["data"]["silences"],
        json!([
            { "start": 0.0, "end": 2.5 },
            { "start": 8.0, "end": 13.0 },
            { "start": 20.0, "end": 21.5 },
            { "start": 26.0, "end": 30.0 },
        ])
    );

    let timeline = output.event("silence.plan.timeline")?;
    assert_eq!(
        timeline["data"]["segments"],
        json!([
            { "start": 2.0, "end": 9.0 },
            { "start": 12.0, "end": 27.0 },
        ])
    );
    assert_eq!(timeline["data"]["kept_seconds"], json!(22.0));
    Ok(())
}

#[test]
fn test_plan_uses_config_defaults() -> Result<()> {
    let env = TestEnvironment::new()?;
    std::fs::create_dir_all(env.config_path().parent().unwrap())?;
    std::fs::write(env.config_path(), "max_pause = 6.0\n")?;
    let report = env.fixture("talk_silencedetect.log");

    let output = utils::run_removesilence_command(
        &env,
        &["--output", "json", "plan", "--report", report.to_str().unwrap()],
    )?;

    assert_eq!(output.exit_code, 0, "plan failed: {}", output.stderr);
    let timeline = output.event("silence.plan.timeline")?;
    assert_eq!(timeline["data"]["segments"], json!([{ "start": 0.0, "end": null }]));
    Ok(())
}

#[test]
fn test_plan_rejects_report_without_duration() -> Result<()> {
    let env = TestEnvironment::new()?;
    let report = env.write_file(
        "broken.log",
        "[silencedetect @ 0x1] silence_start: 1\n[silencedetect @ 0x1] silence_end: 4\n",
    )?;

    let output = utils::run_removesilence_command(
        &env,
        &["plan", "--report", report.to_str().unwrap()],
    )?;

    assert_eq!(output.exit_code, 1);
    assert!(output.stderr.contains("Duration"), "stderr: {}", output.stderr);
    Ok(())
}

#[test]
fn test_plan_rejects_end_before_start() -> Result<()> {
    let env = TestEnvironment::new()?;
    let report = env.write_file(
        "broken.log",
        "  Duration: 00:00:05.00, bitrate: 1 kb/s\n[silencedetect @ 0x1] silence_end: 4\n",
    )?;

    let output = utils::run_removesilence_command(
        &env,
        &["plan", "--report", report.to_str().unwrap()],
    )?;

    assert_eq!(output.exit_code, 1);
    assert!(output.stderr.contains("malformed"), "stderr: {}", output.stderr);
    Ok(())
}

#[test]
fn test_plan_rejects_invalid_max_pause() -> Result<()> {
    let env = TestEnvironment::new()?;
    let report = env.fixture("talk_silencedetect.log");

    let output = utils::run_removesilence_command(
        &env,
        &["plan", "--report", report.to_str().unwrap(), "--max-pause", "0"],
    )?;

    assert_eq!(output.exit_code, 1);
    assert!(output.stderr.contains("max pause"), "stderr: {}", output.stderr);
    Ok(())
}

#[test]
fn test_config_show_writes_defaults() -> Result<()> {
    let env = TestEnvironment::new()?;

    let output = utils::run_removesilence_command(&env, &["config", "show"])?;

    assert_eq!(output.exit_code, 0, "config show failed: {}", output.stderr);
    assert!(output.stdout.contains("max_pause = 2.0"), "stdout: {}", output.stdout);
    assert!(env.config_path().exists());
    Ok(())
}

#[test]
fn test_config_path_honors_override() -> Result<()> {
    let env = TestEnvironment::new()?;

    let output = utils::run_removesilence_command(&env, &["config", "path"])?;

    assert_eq!(output.exit_code, 0);
    assert!(output
        .stdout
        .contains(env.config_path().to_str().unwrap()));
    Ok(())
}

#[test]
fn test_trim_missing_input_fails() -> Result<()> {
    let env = TestEnvironment::new()?;

    let output = utils::run_removesilence_command(
        &env,
        &["trim", "does-not-exist.mp4", "-o", "out.mp4"],
    )?;

    assert_eq!(output.exit_code, 1);
    assert!(!env.path().join("out.mp4").exists());
    Ok(())
}

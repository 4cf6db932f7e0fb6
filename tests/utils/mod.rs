use anyhow::Result;
use std::process::Command;

use super::common::TestEnvironment;

pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl CommandOutput {
    /// Parses every stdout line as a JSON event.
    pub fn json_events(&self) -> Result<Vec<serde_json::Value>> {
        self.stdout
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| Ok(serde_json::from_str(line)?))
            .collect()
    }

    pub fn event(&self, code: &str) -> Result<serde_json::Value> {
        self.json_events()?
            .into_iter()
            .find(|event| event["code"] == code)
            .ok_or_else(|| anyhow::anyhow!("no '{}' event in output:\n{}", code, self.stdout))
    }
}

pub fn run_removesilence_command(env: &TestEnvironment, args: &[&str]) -> Result<CommandOutput> {
    let output = Command::new(env!("CARGO_BIN_EXE_removesilence"))
        .args(args)
        .env("REMOVESILENCE_CONFIG", env.config_path())
        .env("NO_COLOR", "1")
        .current_dir(env.path())
        .output()?;

    Ok(CommandOutput {
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        exit_code: output.status.code().unwrap_or(-1),
    })
}

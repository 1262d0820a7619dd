//! Process execution utilities.
//!
//! Commands are always argv arrays handed straight to the OS; nothing here
//! composes a shell string, so metadata-derived values can never be
//! interpreted by a shell.

use genesis_types::Result;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Captured result of a subprocess: stdout, exit code, stderr.
pub type RunOutput = (String, i32, String);

/// Environment adjustments applied to a subprocess.
#[derive(Debug, Clone, Default)]
pub struct EnvSpec<'a> {
    /// Variables forced to a specific value
    pub set: &'a [(&'a str, &'a str)],
    /// Variables scrubbed from the inherited environment
    pub unset: &'a [&'a str],
}

/// Execute a command, capturing stdout, exit code, and stderr.
pub async fn run(command: &str, args: &[&str]) -> Result<RunOutput> {
    run_with_env(command, args, &EnvSpec::default()).await
}

/// Execute a command with environment adjustments.
pub async fn run_with_env(command: &str, args: &[&str], env: &EnvSpec<'_>) -> Result<RunOutput> {
    let mut cmd = Command::new(command);
    cmd.args(args);
    apply_env(&mut cmd, env);

    let output = cmd.output().await?;

    Ok((
        String::from_utf8_lossy(&output.stdout).to_string(),
        output.status.code().unwrap_or(-1),
        String::from_utf8_lossy(&output.stderr).to_string(),
    ))
}

/// Execute a command, feeding `stdin_data` on its standard input.
///
/// Used for tool pipelines that inspect key material: the material goes
/// over a pipe, never through argv or a shell heredoc.
pub async fn run_with_stdin(
    command: &str,
    args: &[&str],
    env: &EnvSpec<'_>,
    stdin_data: &[u8],
) -> Result<RunOutput> {
    let mut cmd = Command::new(command);
    cmd.args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    apply_env(&mut cmd, env);

    let mut child = cmd.spawn()?;
    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(stdin_data).await?;
        stdin.shutdown().await?;
    }

    let output = child.wait_with_output().await?;

    Ok((
        String::from_utf8_lossy(&output.stdout).to_string(),
        output.status.code().unwrap_or(-1),
        String::from_utf8_lossy(&output.stderr).to_string(),
    ))
}

fn apply_env(cmd: &mut Command, env: &EnvSpec<'_>) {
    for name in env.unset {
        cmd.env_remove(name);
    }
    for (name, value) in env.set {
        cmd.env(name, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn captures_stdout_and_exit_code() {
        let (out, rc, _) = run("echo", &["hello"]).await.unwrap();
        assert_eq!(out.trim(), "hello");
        assert_eq!(rc, 0);
    }

    #[tokio::test]
    async fn env_spec_sets_and_unsets() {
        std::env::set_var("GENESIS_PROC_TEST_INHERITED", "leak");
        let env = EnvSpec {
            set: &[("GENESIS_PROC_TEST_SET", "pinned")],
            unset: &["GENESIS_PROC_TEST_INHERITED"],
        };
        let (out, rc, _) = run_with_env(
            "sh",
            &["-c", "printf '%s/%s' \"$GENESIS_PROC_TEST_SET\" \"$GENESIS_PROC_TEST_INHERITED\""],
            &env,
        )
        .await
        .unwrap();
        assert_eq!(rc, 0);
        assert_eq!(out, "pinned/");
        std::env::remove_var("GENESIS_PROC_TEST_INHERITED");
    }

    #[tokio::test]
    async fn stdin_is_piped() {
        let (out, rc, _) = run_with_stdin("cat", &[], &EnvSpec::default(), b"fed via pipe")
            .await
            .unwrap();
        assert_eq!(rc, 0);
        assert_eq!(out, "fed via pipe");
    }
}

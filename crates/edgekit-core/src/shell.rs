//! Run bash commands and scripts.

use crate::error::{EdgeKitError, Result};
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use std::process::{Command, ExitStatus, Output, Stdio};
use tracing::{debug, warn};

const SHELL: &str = "bash";

/// Separated, trimmed output of a finished command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub status: ExitStatus,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status.success()
    }
}

/// Run `bash -c <command>` and return its combined output, trimmed.
///
/// Stdout and stderr share one pipe, so lines keep the order they were written in.
pub fn run_command(command: &str) -> Result<String> {
    let mut cmd = Command::new(SHELL);
    cmd.arg("-c").arg(command);
    run_combined(command, cmd)
}

/// Run a script file with `bash <script> <args..>`.
pub fn run_script<S: AsRef<str>>(script: impl AsRef<Path>, args: &[S]) -> Result<String> {
    let script = script.as_ref();
    let mut cmd = Command::new(SHELL);
    cmd.arg(script)
        .args(args.iter().map(|a| AsRef::<str>::as_ref(a)));
    run_combined(&script.display().to_string(), cmd)
}

/// Like [`run_command`] with extra environment variables on top of the inherited ones.
pub fn run_command_with_env(command: &str, env: &HashMap<String, String>) -> Result<String> {
    let mut cmd = Command::new(SHELL);
    cmd.arg("-c").arg(command).envs(env);
    run_combined(command, cmd)
}

/// Run a command keeping stdout and stderr apart.
///
/// A non-zero exit is not an error here; check [`CommandOutput::status`].
pub fn run_and_capture(command: &str) -> Result<CommandOutput> {
    let mut cmd = Command::new(SHELL);
    cmd.arg("-c").arg(command);
    let output = spawn(command, cmd)?;
    Ok(CommandOutput {
        stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        status: output.status,
    })
}

fn spawn(label: &str, mut cmd: Command) -> Result<Output> {
    debug!("Running `{}`", label);
    cmd.output().map_err(|source| EdgeKitError::CommandSpawn {
        command: label.to_string(),
        source,
    })
}

fn run_combined(label: &str, mut cmd: Command) -> Result<String> {
    let (mut reader, writer) = os_pipe::pipe()?;
    let stderr_writer = writer.try_clone()?;
    cmd.stdin(Stdio::null()).stdout(writer).stderr(stderr_writer);

    debug!("Running `{}`", label);
    let mut child = cmd.spawn().map_err(|source| EdgeKitError::CommandSpawn {
        command: label.to_string(),
        source,
    })?;
    // The command still owns both write ends; the read below only sees EOF once they are closed.
    drop(cmd);

    let mut raw = Vec::new();
    reader.read_to_end(&mut raw)?;
    let status = child.wait()?;
    let combined = String::from_utf8_lossy(&raw).trim().to_string();

    if status.success() {
        Ok(combined)
    } else {
        warn!("`{}` exited with {}", label, status);
        Err(EdgeKitError::CommandFailed {
            command: label.to_string(),
            status: status.to_string(),
            output: combined,
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn combined_output_is_trimmed() {
        let out = run_command("echo '  hi  '; echo oops >&2").unwrap();
        assert_eq!(out, "hi  \noops");
    }

    #[test]
    fn combined_output_keeps_write_order() {
        let out = run_command("echo first >&2; echo second; echo third >&2").unwrap();
        assert_eq!(out, "first\nsecond\nthird");
    }

    #[test]
    fn failure_keeps_output() {
        let err = run_command("echo partial; exit 3").unwrap_err();
        match err {
            EdgeKitError::CommandFailed { output, status, .. } => {
                assert_eq!(output, "partial");
                assert!(status.contains('3'));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn env_overrides_are_visible() {
        let mut env = HashMap::new();
        env.insert("EDGEKIT_SHELL_TEST".to_string(), "value-42".to_string());
        let out =
            run_command_with_env("echo $EDGEKIT_SHELL_TEST-${PATH:+inherited}", &env).unwrap();
        assert_eq!(out, "value-42-inherited");
    }

    #[test]
    fn script_receives_args() {
        let dir = TempDir::new().unwrap();
        let script = dir.path().join("greet.sh");
        std::fs::write(&script, "echo \"hello $1 $2\"\n").unwrap();
        assert_eq!(run_script(&script, &["a", "b"]).unwrap(), "hello a b");
        assert_eq!(run_script(&script, &[] as &[&str]).unwrap(), "hello");
    }

    #[test]
    fn capture_separates_streams() {
        let out = run_and_capture("echo out; echo err >&2; exit 1").unwrap();
        assert_eq!(out.stdout, "out");
        assert_eq!(out.stderr, "err");
        assert!(!out.success());
        assert_eq!(out.status.code(), Some(1));
    }
}

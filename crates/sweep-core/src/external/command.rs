//! Command line parsing and execution

use crate::error::{SweepError, SweepResult};
use shell_words::split;
use std::collections::BTreeMap;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio::time::timeout;

/// Output of a finished command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Stderr if anything was written there, otherwise stdout
    pub fn diagnostics(&self) -> String {
        let text = if self.stderr.trim().is_empty() {
            &self.stdout
        } else {
            &self.stderr
        };
        match self.exit_code {
            Some(code) if text.trim().is_empty() => format!("exited with status {}", code),
            None if text.trim().is_empty() => "terminated by signal".to_string(),
            _ => text.trim().to_string(),
        }
    }
}

/// Parsed command line with program and args separated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandLine {
    /// Split a command string into argv.
    ///
    /// No shell is involved, so pipes and redirections are passed through
    /// as plain arguments.
    pub fn parse(command: &str) -> SweepResult<Self> {
        let argv = split(command.trim()).map_err(|e| {
            SweepError::invalid_input(format!("Failed to parse command '{}': {}", command, e))
        })?;
        let (program, args) = argv
            .split_first()
            .map(|(p, rest)| (p.clone(), rest.to_vec()))
            .ok_or_else(|| SweepError::invalid_input("Command must include a program"))?;
        Ok(Self { program, args })
    }

    /// Replace `{name}` placeholders in every argument
    pub fn substitute(&self, values: &[(&str, &str)]) -> Self {
        let replace = |arg: &String| {
            values.iter().fold(arg.clone(), |acc, (name, value)| {
                acc.replace(&format!("{{{}}}", name), value)
            })
        };
        Self {
            program: replace(&self.program),
            args: self.args.iter().map(replace).collect(),
        }
    }

    pub fn display(&self) -> String {
        let mut argv = Vec::with_capacity(1 + self.args.len());
        argv.push(self.program.as_str());
        argv.extend(self.args.iter().map(String::as_str));
        shell_words::join(argv)
    }

    /// Run to completion in `cwd`.
    ///
    /// A failure to spawn or a timeout is an error; a non-zero exit is not.
    pub async fn run(
        &self,
        cwd: &Path,
        env: &BTreeMap<String, String>,
        limit: Option<Duration>,
    ) -> SweepResult<CommandOutput> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .current_dir(cwd)
            .envs(env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| {
            SweepError::other(format!("Failed to spawn '{}': {}", self.display(), e))
        })?;

        let stdout_handle = child.stdout.take();
        let stderr_handle = child.stderr.take();
        let stdout_future = async move {
            let mut output = String::new();
            if let Some(mut handle) = stdout_handle {
                handle.read_to_string(&mut output).await.ok();
            }
            output
        };
        let stderr_future = async move {
            let mut output = String::new();
            if let Some(mut handle) = stderr_handle {
                handle.read_to_string(&mut output).await.ok();
            }
            output
        };
        let finished = async {
            let (status, stdout, stderr) = tokio::join!(child.wait(), stdout_future, stderr_future);
            (status, stdout, stderr)
        };

        let (status, stdout, stderr) = match limit {
            Some(limit) => timeout(limit, finished).await.map_err(|_| {
                SweepError::other(format!("'{}' timed out after {:?}", self.display(), limit))
            })?,
            None => finished.await,
        };
        let status = status.map_err(|e| {
            SweepError::other(format!("Failed to wait for '{}': {}", self.display(), e))
        })?;

        tracing::debug!(
            command = %self.display(),
            exit_code = ?status.code(),
            "Command finished"
        );
        Ok(CommandOutput {
            exit_code: status.code(),
            stdout,
            stderr,
        })
    }
}

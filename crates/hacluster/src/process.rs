//! External process invocation.
//!
//! Every tool this crate drives (apt, maas-cli, `ip`, the hook tools) goes
//! through a [`CommandRunner`], so tests can substitute scripted output.
//! [`ProcessRunner`] is the real implementation: it runs the child with
//! stdin closed and kills it once the configured timeout elapses.

use async_trait::async_trait;
use hacluster_common::HaclusterError;
use std::process::Stdio;
use std::time::Duration;

/// A command line to execute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
    /// Arguments are hidden from logs and error messages
    pub sensitive: bool,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
            sensitive: false,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    /// Full command line, unredacted
    pub fn line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Command line safe for logs
    pub fn display(&self) -> String {
        if self.sensitive {
            format!("{} <redacted>", self.program)
        } else {
            self.line()
        }
    }
}

/// Captured result of a finished process
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` when killed by a signal
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Capability to run external commands
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run to completion. Errors only when the process cannot be spawned or
    /// times out; a non-zero exit is reported through [`CommandOutput`].
    async fn run(&self, command: &CommandSpec) -> Result<CommandOutput, HaclusterError>;

    /// Run and fail on non-zero exit, returning stdout
    async fn check_output(&self, command: &CommandSpec) -> Result<String, HaclusterError> {
        let output = self.run(command).await?;
        if output.success() {
            return Ok(output.stdout);
        }

        let reason = match output.code {
            Some(code) => format!("exit status {}: {}", code, output.stderr.trim()),
            None => "terminated by signal".to_string(),
        };
        Err(HaclusterError::Command {
            command: command.display(),
            reason,
        })
    }

    /// Run and fail on non-zero exit
    async fn check_call(&self, command: &CommandSpec) -> Result<(), HaclusterError> {
        self.check_output(command).await.map(|_| ())
    }
}

/// Runs commands as child processes with a bounded lifetime
pub struct ProcessRunner {
    timeout: Duration,
}

impl ProcessRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, command: &CommandSpec) -> Result<CommandOutput, HaclusterError> {
        let mut cmd = tokio::process::Command::new(&command.program);
        cmd.args(&command.args)
            .envs(command.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .kill_on_drop(true);

        tracing::debug!(command = %command.display(), "Running command");

        let output = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| HaclusterError::CommandTimeout {
                command: command.display(),
                secs: self.timeout.as_secs(),
            })?
            .map_err(|e| HaclusterError::Command {
                command: command.display(),
                reason: format!("failed to spawn: {}", e),
            })?;

        let output = CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        if !output.success() {
            tracing::debug!(
                command = %command.display(),
                code = ?output.code,
                "Command exited unsuccessfully"
            );
        }

        Ok(output)
    }
}

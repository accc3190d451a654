//! SSH session wrapper
//!
//! Thin wrapper around the system ssh client. Key-based batch mode only:
//! the client is never allowed to fall back to password prompts.

use std::path::PathBuf;
use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::config::RemoteTarget;
use crate::errors::DeployError;
use crate::remote::command::{PlannedStep, RemoteCommand};

const CONNECT_TIMEOUT_SECS: u32 = 10;

/// An SSH target bound to a key, ready to execute remote commands
#[derive(Debug, Clone)]
pub struct SshSession {
    login: String,
    key_path: PathBuf,
    needs_sudo: bool,
}

impl SshSession {
    pub fn new(target: &RemoteTarget) -> Self {
        Self {
            login: target.login(),
            key_path: target.key_path.clone(),
            needs_sudo: target.needs_sudo(),
        }
    }

    pub fn login(&self) -> &str {
        &self.login
    }

    fn ssh_command(&self, remote: &RemoteCommand) -> Command {
        let mut cmd = Command::new("ssh");
        cmd.arg("-i")
            .arg(&self.key_path)
            .args(["-o", "BatchMode=yes"])
            .arg("-o")
            .arg(format!("ConnectTimeout={}", CONNECT_TIMEOUT_SECS))
            .args(["-o", "StrictHostKeyChecking=accept-new"])
            .arg(&self.login)
            .arg(remote.shell_line(self.needs_sudo));
        cmd
    }

    /// Probe reachability with a no-op command
    pub async fn check(&self) -> Result<(), DeployError> {
        let noop = RemoteCommand::new("true");
        debug!("Probing {} over ssh", self.login);
        let status = self
            .ssh_command(&noop)
            .stdout(Stdio::null())
            .status()
            .await
            .map_err(|e| DeployError::RemoteError(format!("failed to run ssh: {}", e)))?;

        if !status.success() {
            return Err(DeployError::RemoteError(format!(
                "{} is not reachable with key-based ssh",
                self.login
            )));
        }
        Ok(())
    }

    /// Run a command; a non-zero exit is fatal
    pub async fn run(&self, remote: &RemoteCommand) -> Result<(), DeployError> {
        debug!("Remote: {}", remote);
        let status = self
            .ssh_command(remote)
            .status()
            .await
            .map_err(|e| DeployError::RemoteError(format!("failed to run ssh: {}", e)))?;

        if !status.success() {
            return Err(DeployError::RemoteError(format!(
                "remote command failed: {}",
                remote
            )));
        }
        Ok(())
    }

    /// Run a command, tolerating failure; returns whether it succeeded
    pub async fn run_tolerated(&self, remote: &RemoteCommand) -> bool {
        debug!("Remote (tolerated): {}", remote);
        match self.ssh_command(remote).status().await {
            Ok(status) => status.success(),
            Err(e) => {
                warn!("Failed to run ssh for tolerated command: {}", e);
                false
            }
        }
    }

    /// Run a command and capture its stdout
    pub async fn capture(&self, remote: &RemoteCommand) -> Result<String, DeployError> {
        debug!("Remote (capture): {}", remote);
        let output = self
            .ssh_command(remote)
            .output()
            .await
            .map_err(|e| DeployError::RemoteError(format!("failed to run ssh: {}", e)))?;

        if !output.status.success() {
            return Err(DeployError::RemoteError(format!(
                "remote command failed: {}: {}",
                remote,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Run a command with bytes streamed to its stdin
    pub async fn run_with_stdin(
        &self,
        remote: &RemoteCommand,
        data: &[u8],
    ) -> Result<(), DeployError> {
        debug!("Remote (stdin, {} bytes): {}", data.len(), remote);
        let mut child = self
            .ssh_command(remote)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .spawn()
            .map_err(|e| DeployError::RemoteError(format!("failed to run ssh: {}", e)))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(data)
                .await
                .map_err(|e| DeployError::RemoteError(format!("stream to remote failed: {}", e)))?;
        }

        let status = child
            .wait()
            .await
            .map_err(|e| DeployError::RemoteError(format!("failed to wait for ssh: {}", e)))?;

        if !status.success() {
            return Err(DeployError::RemoteError(format!(
                "remote command failed: {}",
                remote
            )));
        }
        Ok(())
    }

    /// Execute a stage plan in order, collecting tolerated failures as warnings
    pub async fn run_plan(
        &self,
        plan: &[PlannedStep],
        warnings: &mut Vec<String>,
    ) -> Result<(), DeployError> {
        for step in plan {
            if step.tolerated {
                if !self.run_tolerated(&step.command).await {
                    warn!("{} failed (tolerated)", step.label);
                    warnings.push(format!("{} failed (tolerated)", step.label));
                }
            } else {
                self.run(&step.command).await.map_err(|e| {
                    DeployError::RemoteError(format!("{}: {}", step.label, e))
                })?;
            }
        }
        Ok(())
    }
}

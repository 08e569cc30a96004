//! Tokio Launcher
//! Real implementation of the Launcher port using tokio child processes
//!
//! Children run in their own process group so shutdown signals do not leak
//! back to the manager. Reaping is event-driven: a background task awaits
//! each child and forwards the exit on the reap channel.

use async_trait::async_trait;
use std::os::unix::process::ExitStatusExt;
use std::process::Stdio;
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::domain::ports::{ChildHandle, Launcher, ReapEvent, SpawnRequest};
use crate::domain::{DomainError, Result};

/// Tokio-based launcher
pub struct TokioLauncher {
    reap_tx: mpsc::UnboundedSender<ReapEvent>,
}

impl TokioLauncher {
    /// Create the launcher and the receiver its reap events arrive on
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ReapEvent>) {
        let (reap_tx, reap_rx) = mpsc::unbounded_channel();
        (Self { reap_tx }, reap_rx)
    }
}

#[async_trait]
impl Launcher for TokioLauncher {
    async fn spawn(&self, request: SpawnRequest) -> Result<ChildHandle> {
        let mut command = Command::new(&request.executable);
        command
            .args(&request.args)
            .envs(request.env.iter().cloned())
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        // New session: the child leads its own process group
        unsafe {
            command.pre_exec(|| {
                if libc::setsid() < 0 {
                    return Err(std::io::Error::last_os_error());
                }
                Ok(())
            });
        }

        let mut child = command.spawn().map_err(|e| {
            DomainError::InternalFailure(format!(
                "Failed to spawn '{}': {}",
                request.executable.display(),
                e
            ))
        })?;
        let pid = child.id().ok_or_else(|| {
            DomainError::InternalFailure(format!(
                "Spawned '{}' but it exited before a pid was known",
                request.executable.display()
            ))
        })?;
        debug!(pid = pid, executable = ?request.executable, "Child spawned");

        let reap_tx = self.reap_tx.clone();
        tokio::spawn(async move {
            let event = match child.wait().await {
                Ok(status) => match status.signal() {
                    Some(signal) => ReapEvent::signalled(pid, signal),
                    None => ReapEvent::exited(pid, status.code().unwrap_or(0)),
                },
                Err(e) => {
                    warn!(pid = pid, error = %e, "Error waiting for child; treating as failure");
                    ReapEvent::exited(pid, 1)
                }
            };
            if reap_tx.send(event).is_err() {
                debug!(pid = pid, "Reap channel closed; dropping exit event");
            }
        });

        Ok(ChildHandle { pid })
    }

    fn signal(&self, pid: u32, signal: i32) {
        let result = unsafe { libc::kill(pid as i32, signal) };
        if result != 0 {
            // Already-gone children are expected during escalation
            debug!(pid = pid, signal = signal, "Signal delivery failed");
        }
    }

    fn is_alive(&self, pid: u32) -> bool {
        unsafe { libc::kill(pid as i32, 0) == 0 }
    }
}

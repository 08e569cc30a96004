//! Launcher port
//! Interface for spawning child processes and delivering reap notifications

use crate::domain::DomainError;
use async_trait::async_trait;
use std::path::PathBuf;

/// Everything needed to start one child process
#[derive(Debug, Clone)]
pub struct SpawnRequest {
    pub executable: PathBuf,
    /// Key/value launch arguments, flattened in order
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
}

impl SpawnRequest {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            args: Vec::new(),
            env: Vec::new(),
        }
    }

    /// Append one key/value launch argument pair
    pub fn arg_pair(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.args.push(key.into());
        self.args.push(value.into());
        self
    }
}

/// Handle returned from a successful spawn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChildHandle {
    pub pid: u32,
}

/// Delivered on the reap channel when a child terminates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReapEvent {
    pub pid: u32,
    /// Exit status when the child exited normally
    pub exit_code: Option<i32>,
    /// Terminating signal when the child was killed
    pub signal: Option<i32>,
}

impl ReapEvent {
    pub fn exited(pid: u32, code: i32) -> Self {
        Self {
            pid,
            exit_code: Some(code),
            signal: None,
        }
    }

    pub fn signalled(pid: u32, signal: i32) -> Self {
        Self {
            pid,
            exit_code: None,
            signal: Some(signal),
        }
    }
}

/// Port for launching and signalling child processes
///
/// Reap events arrive asynchronously on the channel handed out by the
/// concrete launcher at construction time.
#[async_trait]
pub trait Launcher: Send + Sync {
    /// Start a child process
    async fn spawn(&self, request: SpawnRequest) -> Result<ChildHandle, DomainError>;

    /// Send a signal to a child; delivery to an already-gone pid is not an error
    fn signal(&self, pid: u32, signal: i32);

    /// Liveness probe, the `kill(pid, 0)` check
    fn is_alive(&self, pid: u32) -> bool;
}

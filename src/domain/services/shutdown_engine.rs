//! Shutdown Engine
//! Escalating teardown of all children: request-release, SIGINT, SIGTERM,
//! SIGKILL, with bounded waits between escalations
//!
//! Every failure in here is logged and swallowed; shutdown always attempts
//! to clean up everything.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, info, warn};

use crate::constants::{SHUTDOWN_POLL, SIGINT, SIGKILL, SIGTERM};
use crate::domain::ports::{Launcher, NameDirectory};
use crate::domain::services::{ChildRegistry, ManagerSettings, RegistrationService};
use crate::domain::value_objects::{ChildKind, ManagerIdentity};

/// Fixed wait between SIGTERM and SIGKILL for services
const SERVICE_QUIT_WAIT: Duration = Duration::from_millis(500);

/// Orchestrates the release of all children during the ShuttingDown phase
pub struct ShutdownEngine {
    identity: ManagerIdentity,
    registry: Arc<ChildRegistry>,
    launcher: Arc<dyn Launcher>,
    registration: Arc<RegistrationService>,
    directory: Arc<dyn NameDirectory>,
    settings: Arc<ManagerSettings>,
    release_timeout: Duration,
}

impl ShutdownEngine {
    pub fn new(
        identity: ManagerIdentity,
        registry: Arc<ChildRegistry>,
        launcher: Arc<dyn Launcher>,
        registration: Arc<RegistrationService>,
        directory: Arc<dyn NameDirectory>,
        settings: Arc<ManagerSettings>,
        release_timeout: Duration,
    ) -> Self {
        Self {
            identity,
            registry,
            launcher,
            registration,
            directory,
            settings,
            release_timeout,
        }
    }

    /// Run the full teardown sequence
    pub async fn run(&self) {
        self.release_external_services().await;
        self.release_registered_devices().await;
        self.unbind_manager_context().await;
        self.escalate_pending_children().await;
        self.terminate_registered_services().await;
    }

    /// Send SIGKILL to every pending child immediately; the abort path
    pub fn kill_all_pending(&self) {
        for pid in self
            .registry
            .pending_pids(ChildKind::Device)
            .into_iter()
            .chain(self.registry.pending_pids(ChildKind::Service))
        {
            self.launcher.signal(pid, SIGKILL);
        }
    }

    /// Services registered from an external source have no process to signal;
    /// withdraw their registrations instead.
    async fn release_external_services(&self) {
        for record in self.registry.external_services() {
            debug!(service = %record.label, "Releasing externally registered service");
            self.registry.demote(&record.identifier);
            self.registration.release_registration(&record).await;
        }
    }

    /// Invoke `releaseObject` on every registered device with a bounded call
    /// timeout. Releasing an aggregate device may release its children, so
    /// devices are taken one at a time rather than from a snapshot.
    async fn release_registered_devices(&self) {
        while let Some(record) = self.registry.any_registered_device() {
            info!(device = %record.label, "Releasing device");
            if let Some(object) = &record.object {
                match timeout(self.release_timeout, object.release_object()).await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => {
                        debug!(device = %record.label, error = %e, "releaseObject failed")
                    }
                    Err(_) => {
                        warn!(device = %record.label, "releaseObject timed out")
                    }
                }
            }

            // If the device did not unregister itself, move it along by hand:
            // back to pending when its process is still ours to reap.
            if let Some(still) = self.registry.demote(&record.identifier) {
                debug!(
                    device = %still.label,
                    "Device did not unregister on release; demoting"
                );
                self.registration.release_registration(&still).await;
            }
        }
    }

    async fn unbind_manager_context(&self) {
        debug!("Unbinding manager naming context");
        if let Err(e) = self.directory.unbind(&self.identity.naming_context()).await {
            debug!(error = %e, "Unable to unbind manager context");
        }
    }

    /// Escalate over all pending children: SIGINT, SIGTERM with bounded
    /// waits, then SIGKILL outright.
    ///
    /// NOTE: if the manager was terminated with a ^C, sending SIGINT may
    /// forward the original interrupt to children that share the terminal;
    /// harmless, but visible in their logs.
    async fn escalate_pending_children(&self) {
        let quit_time = self.settings.device_force_quit_time();
        self.signal_pending(SIGINT, Some(quit_time)).await;
        self.signal_pending(SIGTERM, Some(quit_time)).await;
        self.signal_pending(SIGKILL, None).await;
    }

    /// One escalation step over the current pending set
    async fn signal_pending(&self, signal: i32, wait: Option<Duration>) {
        let pids: Vec<u32> = self
            .registry
            .pending_pids(ChildKind::Device)
            .into_iter()
            .chain(self.registry.pending_pids(ChildKind::Service))
            .collect();
        if pids.is_empty() {
            return;
        }

        debug!(signal = signal, count = pids.len(), "Signalling pending children");
        for pid in &pids {
            self.launcher.signal(*pid, signal);
        }
        if let Some(wait) = wait {
            self.wait_for_exit(&pids, wait).await;
        }
    }

    /// Services that never unregistered but still have a live process get a
    /// SIGTERM with a short wait, then SIGKILL.
    async fn terminate_registered_services(&self) {
        let pids = self.registry.registered_live_pids(ChildKind::Service);
        if pids.is_empty() {
            return;
        }

        debug!(count = pids.len(), "Terminating registered services");
        for pid in &pids {
            self.launcher.signal(*pid, SIGTERM);
        }
        self.wait_for_exit(&pids, SERVICE_QUIT_WAIT).await;
        for pid in &pids {
            if self.launcher.is_alive(*pid) {
                self.launcher.signal(*pid, SIGKILL);
            }
        }
    }

    /// Bounded wait for a set of pids to disappear. Polls liveness at 1 ms
    /// granularity; a reap wakes the wait early.
    async fn wait_for_exit(&self, pids: &[u32], wait: Duration) {
        let deadline = Instant::now() + wait;
        loop {
            if pids.iter().all(|pid| !self.launcher.is_alive(*pid)) {
                return;
            }
            if Instant::now() >= deadline {
                return;
            }
            tokio::select! {
                _ = self.registry.reap_signal().notified() => {}
                _ = sleep(SHUTDOWN_POLL) => {}
            }
        }
    }
}

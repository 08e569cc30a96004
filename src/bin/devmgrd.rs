//! Device Manager Daemon
//!
//! Launches the node's devices and services from its node profile, registers
//! them with the domain, and tears everything down on SIGINT/SIGTERM.
//!
//! Configuration is loaded from environment variables (no CLI arguments):
//! `DCD_FILE` (required), `DOMAIN_NAME`, `SDRROOT`, `SDRCACHE`, `HOSTNAME`,
//! `LOGGING_CONFIG_URI`, `DEVICE_FORCE_QUIT_TIME`, `CLIENT_WAIT_TIME`.

use std::path::Path;
use std::sync::Arc;

use tokio::signal::unix::{signal as unix_signal, SignalKind};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use devmgr_engine::application::{Supervisor, SupervisorConfig};
use devmgr_engine::constants::DEFAULT_RELEASE_TIMEOUT;
use devmgr_engine::domain::ports::FileView;
use devmgr_engine::domain::DomainError;
use devmgr_engine::infrastructure::{
    detect_host_facts, InMemoryNameDirectory, LocalFileView, LoopbackRegistry, ManagerConfig,
    TokioLauncher,
};

/// Wait for SIGINT or SIGTERM
async fn wait_for_shutdown_signal() -> &'static str {
    let mut sigterm =
        unix_signal(SignalKind::terminate()).expect("Failed to install SIGTERM handler");
    let mut sigint =
        unix_signal(SignalKind::interrupt()).expect("Failed to install SIGINT handler");

    tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    }
}

fn init_tracing(config: &ManagerConfig) {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.log_level))
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() {
    std::process::exit(run().await);
}

async fn run() -> i32 {
    let config = ManagerConfig::from_env();
    init_tracing(&config);

    let Some(dcd_path) = config.dcd_file.clone() else {
        error!("DCD_FILE is not set; nothing to manage");
        return 1;
    };

    let mut host_facts = detect_host_facts();
    if let Some(hostname) = &config.hostname {
        host_facts.hostname = hostname.clone();
    }
    info!(
        machine = %host_facts.machine,
        os = %host_facts.sysname,
        host = %host_facts.hostname,
        "Starting device manager"
    );

    let file_view = Arc::new(LocalFileView::new(config.sdr_root.clone()));

    let mut node_profile = match file_view.load_node_profile(&dcd_path) {
        Ok(profile) => profile,
        Err(e) => {
            error!(error = %e, dcd = %dcd_path, "Terminating; unable to load node profile");
            return 1;
        }
    };
    if let Some(domain) = &config.domain_name {
        node_profile.domain_name = domain.clone();
    }

    // Relative manager SPD references resolve against the DCD directory
    let manager_spd = if node_profile.manager_soft_pkg.starts_with('/') {
        node_profile.manager_soft_pkg.clone()
    } else {
        let dcd_dir = Path::new(&dcd_path)
            .parent()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_default();
        format!("{}/{}", dcd_dir, node_profile.manager_soft_pkg)
    };
    let manager_profile = match file_view.load_program_profile(&manager_spd) {
        Ok(profile) => profile,
        Err(e) => {
            error!(error = %e, spd = %manager_spd, "Terminating; unable to load manager profile");
            return 1;
        }
    };

    let manager_ior = format!("devmgr:{}@{}", node_profile.name, host_facts.hostname);

    // The directory and registry adapters are the node's link to the domain;
    // this binary wires the in-process loopback pair.
    let directory = Arc::new(InMemoryNameDirectory::new());
    directory.install_registry(
        &format!("{}/{}", node_profile.domain_name, node_profile.domain_name),
        Arc::new(LoopbackRegistry::new()),
    );

    let (launcher, reap_rx) = TokioLauncher::new();

    let supervisor = Supervisor::new(
        SupervisorConfig {
            node_profile,
            manager_profile,
            host_facts,
            manager_ior,
            dcd_path,
            cache_root: config.cache_root.clone(),
            logging_config_uri: config.logging_config_uri.clone(),
            release_timeout: DEFAULT_RELEASE_TIMEOUT,
        },
        Arc::new(launcher),
        directory,
        file_view,
    );
    supervisor
        .settings()
        .set_device_force_quit_time(config.device_force_quit_time);
    supervisor
        .settings()
        .set_client_wait_time_ms(config.client_wait_time_ms);

    tokio::select! {
        result = supervisor.run(reap_rx) => match result {
            Ok(()) => {
                info!(manager = %supervisor.label(), "Device manager started");
                let signal = wait_for_shutdown_signal().await;
                info!(signal = signal, "Received shutdown signal");
                supervisor.shutdown().await;
                0
            }
            Err(DomainError::Cancelled) => {
                supervisor.shutdown().await;
                0
            }
            Err(e) => {
                error!(error = %e, "Fatal initialization error");
                supervisor.abort().await;
                1
            }
        },
        signal = wait_for_shutdown_signal() => {
            info!(signal = signal, "Received shutdown signal during startup");
            supervisor.shutdown().await;
            0
        }
    }
}

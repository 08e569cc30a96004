//! Manager configuration from environment variables
//!
//! All configuration is read from environment variables with sensible
//! defaults; there is no command-line parsing.

use std::env;
use std::path::PathBuf;

use tracing::warn;

use crate::constants::{DEFAULT_CLIENT_WAIT_TIME_MS, DEFAULT_DEVICE_FORCE_QUIT_TIME_SEC};

const DEFAULT_SDR_ROOT: &str = "/var/redhawk/sdr";
const DEFAULT_CACHE_ROOT: &str = "/var/tmp/devmgr";
const DEFAULT_LOG_LEVEL: &str = "info";

/// Manager configuration loaded from the environment
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// Logging filter-spec URI handed to children; also overrides the
    /// manager's own log filter when set
    pub logging_config_uri: Option<String>,

    /// Overrides the domain name from the node profile
    pub domain_name: Option<String>,

    /// Path of the node profile document
    pub dcd_file: Option<String>,

    /// Root of the file view profiles and code artifacts live under
    pub sdr_root: PathBuf,

    /// Root under which the manager cache `.<label>` is created
    pub cache_root: PathBuf,

    /// Overrides the detected host name
    pub hostname: Option<String>,

    /// Seconds between shutdown signal escalations; writable at runtime
    pub device_force_quit_time: f64,

    /// Milliseconds allowed per outbound child call; writable at runtime
    pub client_wait_time_ms: u64,

    pub log_level: String,
}

impl ManagerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            logging_config_uri: env::var("LOGGING_CONFIG_URI").ok(),
            domain_name: env::var("DOMAIN_NAME").ok(),
            dcd_file: env::var("DCD_FILE").ok(),
            sdr_root: env::var("SDRROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_SDR_ROOT)),
            cache_root: env::var("SDRCACHE")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_CACHE_ROOT)),
            hostname: env::var("HOSTNAME").ok(),
            device_force_quit_time: Self::parse_f64(
                "DEVICE_FORCE_QUIT_TIME",
                DEFAULT_DEVICE_FORCE_QUIT_TIME_SEC,
            ),
            client_wait_time_ms: Self::parse_u64("CLIENT_WAIT_TIME", DEFAULT_CLIENT_WAIT_TIME_MS),
            log_level: env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string()),
        }
    }

    fn parse_f64(var: &str, default: f64) -> f64 {
        match env::var(var) {
            Ok(raw) => match raw.parse::<f64>() {
                Ok(value) if value >= 0.0 => value,
                _ => {
                    warn!(var = var, value = %raw, "Invalid value; using default");
                    default
                }
            },
            Err(_) => default,
        }
    }

    fn parse_u64(var: &str, default: u64) -> u64 {
        match env::var(var) {
            Ok(raw) => match raw.parse::<u64>() {
                Ok(value) => value,
                Err(_) => {
                    warn!(var = var, value = %raw, "Invalid value; using default");
                    default
                }
            },
            Err(_) => default,
        }
    }
}

//! Domain Constants
//!
//! Common constants used throughout the engine

use std::time::Duration;

/// Signal numbers used by the shutdown escalation chain
pub const SIGINT: i32 = 2;
pub const SIGTERM: i32 = 15;
pub const SIGKILL: i32 = 9;

/// Default bounded call timeout for `releaseObject` during shutdown
pub const DEFAULT_RELEASE_TIMEOUT: Duration = Duration::from_secs(3);

/// Default wait between shutdown signal escalations, seconds
pub const DEFAULT_DEVICE_FORCE_QUIT_TIME_SEC: f64 = 0.5;

/// Default bounded call timeout for outbound calls on child references, ms
pub const DEFAULT_CLIENT_WAIT_TIME_MS: u64 = 10_000;

/// Poll interval while waiting for the domain naming context to appear
pub const DOMAIN_RESOLVE_POLL: Duration = Duration::from_millis(10);

/// Retry interval for transient registerManager failures
pub const MANAGER_REGISTER_RETRY: Duration = Duration::from_millis(100);

/// Every Nth transient registration failure gets a warning log
pub const MANAGER_REGISTER_LOG_EVERY: u64 = 10;

/// Poll interval while waiting for a composite parent's IOR
pub const COMPOSITE_IOR_POLL: Duration = Duration::from_micros(100);

/// Granularity of the liveness poll inside bounded shutdown waits
pub const SHUTDOWN_POLL: Duration = Duration::from_millis(1);

/// Name of the event channel used for device state notifications
pub const IDM_CHANNEL_NAME: &str = "IDM_Channel";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_numbers() {
        assert_eq!(SIGINT, libc::SIGINT);
        assert_eq!(SIGTERM, libc::SIGTERM);
        assert_eq!(SIGKILL, libc::SIGKILL);
    }

    #[test]
    fn test_release_timeout() {
        assert_eq!(DEFAULT_RELEASE_TIMEOUT, Duration::from_secs(3));
    }
}

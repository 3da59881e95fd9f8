//! Agent configuration
//!
//! All knobs come from environment variables with conservative defaults:
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | TILL_WORK_DIR | /var/lib/till | Working directory (logs, state) |
//! | TILL_LOG_DIR | (unset) | Rolling log file directory |
//! | TILL_CONNECT_TIMEOUT_MS | 10000 | Transport connect deadline |
//! | TILL_PROBE_TIMEOUT_MS | 4000 | Post-connect liveness deadline |
//! | TILL_SCAN_TIMEOUT_SECS | 30 | Device scan duration |
//! | TILL_INTER_COPY_DELAY_MS | 400 | Pause between receipt copies |

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    /// Working directory for agent state
    pub work_dir: String,
    /// Rolling log directory; stdout only when unset
    pub log_dir: Option<String>,
    /// Transport connect deadline (milliseconds)
    pub connect_timeout_ms: u64,
    /// Post-connect probe deadline (milliseconds)
    pub probe_timeout_ms: u64,
    /// Device scan duration (seconds)
    pub scan_timeout_secs: u64,
    /// Pause between copies of one print job (milliseconds)
    pub inter_copy_delay_ms: u64,
}

impl Config {
    /// Load from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            work_dir: std::env::var("TILL_WORK_DIR").unwrap_or_else(|_| "/var/lib/till".into()),
            log_dir: std::env::var("TILL_LOG_DIR").ok(),
            connect_timeout_ms: env_u64("TILL_CONNECT_TIMEOUT_MS", 10_000),
            probe_timeout_ms: env_u64("TILL_PROBE_TIMEOUT_MS", 4_000),
            scan_timeout_secs: env_u64("TILL_SCAN_TIMEOUT_SECS", 30),
            inter_copy_delay_ms: env_u64("TILL_INTER_COPY_DELAY_MS", 400),
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn scan_timeout(&self) -> Duration {
        Duration::from_secs(self.scan_timeout_secs)
    }

    pub fn inter_copy_delay(&self) -> Duration {
        Duration::from_millis(self.inter_copy_delay_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::from_env();
        assert_eq!(config.connect_timeout(), Duration::from_secs(10));
        assert_eq!(config.probe_timeout(), Duration::from_secs(4));
        assert_eq!(config.scan_timeout(), Duration::from_secs(30));
        assert_eq!(config.inter_copy_delay(), Duration::from_millis(400));
    }
}

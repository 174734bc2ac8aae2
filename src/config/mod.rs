//! Configuration management
//!
//! Layered with the `config` crate: built-in defaults, then an optional
//! `config.{toml,json,yaml}` in the config directory, then `PDC_*`
//! environment variables (`PDC_POLL__LOGS_SECS=20` sets `poll.logs_secs`).

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::poller::PollIntervals;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_port")]
    pub port: u16,

    /// Base URL of the dispenser backend
    #[serde(default = "default_backend_url")]
    pub backend_url: String,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Inactivity period after which the manual/schedule mode lock is released
    #[serde(default = "default_mode_lock_timeout_secs")]
    pub mode_lock_timeout_secs: u64,

    #[serde(default)]
    pub poll: PollConfig,
}

fn default_port() -> u16 {
    8090
}

fn default_backend_url() -> String {
    // Dispenser's own access point address
    "http://192.168.4.1".to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_mode_lock_timeout_secs() -> u64 {
    30
}

impl Config {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn mode_lock_timeout(&self) -> Duration {
        Duration::from_secs(self.mode_lock_timeout_secs)
    }
}

/// Poll periods in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollConfig {
    #[serde(default = "default_status_secs")]
    pub status_secs: u64,
    #[serde(default = "default_logs_secs")]
    pub logs_secs: u64,
    #[serde(default = "default_last_action_secs")]
    pub last_action_secs: u64,
    #[serde(default = "default_upcoming_schedules_secs")]
    pub upcoming_schedules_secs: u64,
    #[serde(default = "default_dispenser_status_secs")]
    pub dispenser_status_secs: u64,
}

fn default_status_secs() -> u64 {
    5
}

fn default_logs_secs() -> u64 {
    10
}

fn default_last_action_secs() -> u64 {
    5
}

fn default_upcoming_schedules_secs() -> u64 {
    30
}

fn default_dispenser_status_secs() -> u64 {
    15
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            status_secs: default_status_secs(),
            logs_secs: default_logs_secs(),
            last_action_secs: default_last_action_secs(),
            upcoming_schedules_secs: default_upcoming_schedules_secs(),
            dispenser_status_secs: default_dispenser_status_secs(),
        }
    }
}

impl PollConfig {
    /// Zero would make `tokio::time::interval` panic; clamp to one second.
    pub fn intervals(&self) -> PollIntervals {
        let secs = |s: u64| Duration::from_secs(s.max(1));
        PollIntervals {
            status: secs(self.status_secs),
            logs: secs(self.logs_secs),
            last_action: secs(self.last_action_secs),
            upcoming_schedules: secs(self.upcoming_schedules_secs),
            dispenser_status: secs(self.dispenser_status_secs),
        }
    }
}

const APP_DIR_NAME: &str = "pill-dispenser-console";

/// Get config directory (PDC_CONFIG_DIR, XDG_CONFIG_HOME or platform default)
pub fn get_config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("PDC_CONFIG_DIR") {
        return PathBuf::from(dir);
    }

    #[cfg(target_os = "macos")]
    {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home)
                .join("Library/Application Support")
                .join(APP_DIR_NAME);
        }
    }

    #[cfg(target_os = "linux")]
    {
        if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
            return PathBuf::from(xdg).join(APP_DIR_NAME);
        }
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(".config").join(APP_DIR_NAME);
        }
    }

    #[cfg(target_os = "windows")]
    {
        if let Ok(appdata) = std::env::var("APPDATA") {
            return PathBuf::from(appdata).join(APP_DIR_NAME);
        }
    }

    PathBuf::from(".")
}

pub fn load_config() -> Result<Config> {
    let config_dir = get_config_dir();

    let mut builder = ::config::Config::builder()
        .set_default("port", default_port() as i64)?
        .add_source(
            ::config::File::with_name(&config_dir.join("config").to_string_lossy()).required(false),
        )
        // PDC_PORT, PDC_BACKEND_URL, PDC_POLL__STATUS_SECS, ...
        .add_source(
            ::config::Environment::with_prefix("PDC")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

    // Port precedence: PDC_PORT > PORT > config file > default
    if let Ok(port) = std::env::var("PDC_PORT") {
        if let Ok(port_num) = port.parse::<u16>() {
            builder = builder.set_override("port", port_num as i64)?;
        }
    } else if let Ok(port) = std::env::var("PORT") {
        if let Ok(port_num) = port.parse::<u16>() {
            builder = builder.set_override("port", port_num as i64)?;
        }
    }

    // DISPENSER_URL is accepted when PDC_BACKEND_URL is not set
    if std::env::var("PDC_BACKEND_URL").is_err() {
        if let Ok(url) = std::env::var("DISPENSER_URL") {
            builder = builder.set_override("backend_url", url)?;
        }
    }

    let config = builder.build()?;

    Ok(config.try_deserialize()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    const ENV_VARS: &[&str] = &[
        "PDC_PORT",
        "PORT",
        "PDC_BACKEND_URL",
        "DISPENSER_URL",
        "PDC_POLL__LOGS_SECS",
        "PDC_MODE_LOCK_TIMEOUT_SECS",
    ];

    fn clean_env(config_dir: &std::path::Path) {
        for var in ENV_VARS {
            env::remove_var(var);
        }
        env::set_var("PDC_CONFIG_DIR", config_dir);
    }

    fn restore_env() {
        for var in ENV_VARS {
            env::remove_var(var);
        }
        env::remove_var("PDC_CONFIG_DIR");
    }

    #[test]
    #[serial]
    fn test_defaults() {
        let dir = tempfile::tempdir().expect("create temp dir");
        clean_env(dir.path());

        let config = load_config().expect("config should load");
        restore_env();

        assert_eq!(config.port, 8090);
        assert_eq!(config.backend_url, "http://192.168.4.1");
        assert_eq!(config.mode_lock_timeout(), Duration::from_secs(30));
        assert_eq!(config.poll.intervals(), PollIntervals::default());
    }

    #[test]
    #[serial]
    fn test_pdc_port_takes_precedence_over_port() {
        let dir = tempfile::tempdir().expect("create temp dir");
        clean_env(dir.path());
        env::set_var("PDC_PORT", "5000");
        env::set_var("PORT", "3000");

        let config = load_config().expect("config should load");
        restore_env();

        assert_eq!(config.port, 5000);
    }

    #[test]
    #[serial]
    fn test_port_env_fallback() {
        let dir = tempfile::tempdir().expect("create temp dir");
        clean_env(dir.path());
        env::set_var("PORT", "3000");

        let config = load_config().expect("config should load");
        restore_env();

        assert_eq!(config.port, 3000);
    }

    #[test]
    #[serial]
    fn test_invalid_port_uses_default() {
        let dir = tempfile::tempdir().expect("create temp dir");
        clean_env(dir.path());
        env::set_var("PORT", "not-a-number");

        let config = load_config().expect("config should load");
        restore_env();

        assert_eq!(config.port, 8090);
    }

    #[test]
    #[serial]
    fn test_nested_env_overrides() {
        let dir = tempfile::tempdir().expect("create temp dir");
        clean_env(dir.path());
        env::set_var("PDC_POLL__LOGS_SECS", "20");
        env::set_var("PDC_MODE_LOCK_TIMEOUT_SECS", "45");
        env::set_var("DISPENSER_URL", "http://dispenser.local");

        let config = load_config().expect("config should load");
        restore_env();

        assert_eq!(config.poll.logs_secs, 20);
        assert_eq!(config.poll.status_secs, 5);
        assert_eq!(config.mode_lock_timeout_secs, 45);
        assert_eq!(config.backend_url, "http://dispenser.local");
    }

    #[test]
    #[serial]
    fn test_config_file() {
        let dir = tempfile::tempdir().expect("create temp dir");
        std::fs::write(
            dir.path().join("config.toml"),
            "backend_url = \"http://10.0.0.42\"\n[poll]\nstatus_secs = 2\n",
        )
        .expect("write config");
        clean_env(dir.path());

        let config = load_config().expect("config should load");
        restore_env();

        assert_eq!(config.backend_url, "http://10.0.0.42");
        assert_eq!(config.poll.status_secs, 2);
        assert_eq!(config.poll.upcoming_schedules_secs, 30);
    }

    #[test]
    fn test_zero_interval_clamped() {
        let poll = PollConfig {
            logs_secs: 0,
            ..PollConfig::default()
        };
        assert_eq!(poll.intervals().logs, Duration::from_secs(1));
    }
}

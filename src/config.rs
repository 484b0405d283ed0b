use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable names - single source of truth
pub mod env_vars {
    /// Data directory holding the journal file.
    pub const DATA_DIR: &str = "DOCKET_DIR";
    /// Credential for the text-enhancement endpoint. Unset means the
    /// enhancement flow reports a missing credential instead of calling out.
    pub const API_KEY: &str = "GEMINI_API_KEY";
    /// Shared lock-screen passphrase.
    pub const PASSPHRASE: &str = "DOCKET_PASSPHRASE";
    /// Inactivity window in seconds before the journal locks.
    pub const LOCK_SECS: &str = "DOCKET_LOCK_SECS";
}

pub mod defaults {
    pub const DATA_DIR: &str = ".docket";
    pub const PASSPHRASE: &str = "cagatay";
    pub const LOCK_SECS: u64 = 300;
}

#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub api_key: String,
    pub passphrase: String,
    pub lock_timeout: Duration,
}

impl Config {
    /// Read configuration from the environment. Every secret is overridable;
    /// the passphrase stays a single shared value either way.
    pub fn from_env() -> Self {
        let data_dir = env::var(env_vars::DATA_DIR)
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                let home = env::var("HOME")
                    .or_else(|_| env::var("USERPROFILE"))
                    .unwrap_or_else(|_| ".".to_string());
                PathBuf::from(home).join(defaults::DATA_DIR)
            });

        let api_key = env::var(env_vars::API_KEY).unwrap_or_default();
        let passphrase =
            env::var(env_vars::PASSPHRASE).unwrap_or_else(|_| defaults::PASSPHRASE.to_string());
        let lock_secs = env::var(env_vars::LOCK_SECS)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults::LOCK_SECS);

        Config {
            data_dir,
            api_key,
            passphrase,
            lock_timeout: Duration::from_secs(lock_secs),
        }
    }
}

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use vm_orchestrator::{DispatcherConfig, RoleDirectory};
use vm_provider::{BreakerConfig, HttpCloudClientConfig};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    #[serde(default = "default_provider_url")]
    pub provider_url: String,

    #[serde(default = "default_provider_timeout_ms")]
    pub provider_timeout_ms: u64,

    #[serde(default = "default_breaker_failure_threshold")]
    pub breaker_failure_threshold: u32,

    #[serde(default = "default_breaker_failure_window_secs")]
    pub breaker_failure_window_secs: u64,

    #[serde(default = "default_breaker_cooldown_secs")]
    pub breaker_cooldown_secs: u64,

    #[serde(default = "default_breaker_half_open_calls")]
    pub breaker_half_open_calls: u32,

    #[serde(default = "default_dispatch_workers")]
    pub dispatch_workers: usize,

    #[serde(default = "default_dispatch_queue_capacity")]
    pub dispatch_queue_capacity: usize,

    /// `principal=ROLE` pairs, comma separated.
    #[serde(default = "default_role_directory")]
    pub role_directory: String,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn default_bind_addr() -> String {
    std::env::var("VM_API_BIND").unwrap_or_else(|_| "0.0.0.0:3121".to_string())
}

fn default_db_path() -> PathBuf {
    if let Ok(path) = std::env::var("VM_API_DB_PATH") {
        return PathBuf::from(path);
    }

    if cfg!(windows) {
        let appdata = std::env::var("APPDATA").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(appdata)
            .join("vm")
            .join("provisioning")
            .join("provisioning.db")
    } else {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home)
            .join(".vm")
            .join("provisioning")
            .join("provisioning.db")
    }
}

fn default_provider_url() -> String {
    std::env::var("VM_PROVIDER_URL").unwrap_or_else(|_| "http://localhost:8081".to_string())
}

fn default_provider_timeout_ms() -> u64 {
    env_or("VM_PROVIDER_TIMEOUT_MS", 3000)
}

fn default_breaker_failure_threshold() -> u32 {
    env_or("VM_BREAKER_FAILURE_THRESHOLD", 5)
}

fn default_breaker_failure_window_secs() -> u64 {
    env_or("VM_BREAKER_WINDOW_SECS", 60)
}

fn default_breaker_cooldown_secs() -> u64 {
    env_or("VM_BREAKER_COOLDOWN_SECS", 30)
}

fn default_breaker_half_open_calls() -> u32 {
    env_or("VM_BREAKER_HALF_OPEN_CALLS", 3)
}

fn default_dispatch_workers() -> usize {
    env_or("VM_DISPATCH_WORKERS", vm_orchestrator::dispatcher::DEFAULT_WORKERS)
}

fn default_dispatch_queue_capacity() -> usize {
    env_or(
        "VM_DISPATCH_QUEUE",
        vm_orchestrator::signal::DEFAULT_QUEUE_CAPACITY,
    )
}

fn default_role_directory() -> String {
    std::env::var("VM_ROLE_DIRECTORY").unwrap_or_default()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            db_path: default_db_path(),
            provider_url: default_provider_url(),
            provider_timeout_ms: default_provider_timeout_ms(),
            breaker_failure_threshold: default_breaker_failure_threshold(),
            breaker_failure_window_secs: default_breaker_failure_window_secs(),
            breaker_cooldown_secs: default_breaker_cooldown_secs(),
            breaker_half_open_calls: default_breaker_half_open_calls(),
            dispatch_workers: default_dispatch_workers(),
            dispatch_queue_capacity: default_dispatch_queue_capacity(),
            role_directory: default_role_directory(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::default()
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_millis(self.provider_timeout_ms)
    }

    pub fn breaker(&self) -> BreakerConfig {
        BreakerConfig {
            failure_threshold: self.breaker_failure_threshold,
            failure_window: Duration::from_secs(self.breaker_failure_window_secs),
            cooldown: Duration::from_secs(self.breaker_cooldown_secs),
            half_open_max_calls: self.breaker_half_open_calls,
        }
    }

    pub fn dispatcher(&self) -> DispatcherConfig {
        DispatcherConfig {
            workers: self.dispatch_workers,
            queue_capacity: self.dispatch_queue_capacity,
        }
    }

    pub fn cloud_client(&self) -> HttpCloudClientConfig {
        HttpCloudClientConfig {
            base_url: self.provider_url.clone(),
            ..HttpCloudClientConfig::default()
        }
    }

    pub fn roles(&self) -> vm_orchestrator::Result<RoleDirectory> {
        self.role_directory.parse()
    }
}

//! Local settings (`syncbak.yml`) and their defaults.
//!
//! Everything needed to reach the device and shape a run: endpoint,
//! credentials, target directory, worker count and retry policy. The backup
//! profiles themselves live on the server (see `mirror::remote_config`).

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::config::{ConfigSpec, FieldMeta};
use super::retry::RetryPolicy;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    // Connection
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_username")]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    // Run shape
    #[serde(default)]
    pub target: String,
    #[serde(default)]
    pub default_profile: String,
    #[serde(default = "default_config_file")]
    pub config_file: String,
    #[serde(default)]
    pub max_workers: usize,
    #[serde(default = "default_true")]
    pub progress_bar: bool,

    // Retry policy
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_min_wait_time")]
    pub min_wait_time: u64,
    #[serde(default = "default_max_wait_time")]
    pub max_wait_time: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            username: default_username(),
            password: String::new(),
            timeout_secs: default_timeout_secs(),
            target: String::new(),
            default_profile: String::new(),
            config_file: default_config_file(),
            max_workers: 0,
            progress_bar: default_true(),
            max_retries: default_max_retries(),
            min_wait_time: default_min_wait_time(),
            max_wait_time: default_max_wait_time(),
        }
    }
}

impl Settings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_retries,
            min_delay: Duration::from_millis(self.min_wait_time),
            max_delay: Duration::from_millis(self.max_wait_time.max(self.min_wait_time)),
        }
    }
}

impl ConfigSpec for Settings {
    const FILE_NAME: &'static str = "syncbak.yml";

    fn fields() -> &'static [FieldMeta] {
        static FIELDS: [FieldMeta; 13] = [
            FieldMeta {
                name: "host",
                description: "FTP server host (the device being backed up)",
            },
            FieldMeta {
                name: "port",
                description: "FTP server port",
            },
            FieldMeta {
                name: "username",
                description: "FTP login username",
            },
            FieldMeta {
                name: "password",
                description: "FTP login password",
            },
            FieldMeta {
                name: "timeout_secs",
                description: "Socket timeout in seconds",
            },
            FieldMeta {
                name: "target",
                description: "Local directory the remote tree is mirrored into",
            },
            FieldMeta {
                name: "default_profile",
                description: "Backup profile used when --profile is not given",
            },
            FieldMeta {
                name: "config_file",
                description: "Name of the profile document at the FTP root",
            },
            FieldMeta {
                name: "max_workers",
                description: "Concurrent transfer workers; 0 = half the CPU count",
            },
            FieldMeta {
                name: "progress_bar",
                description: "Show a progress bar during transfers",
            },
            FieldMeta {
                name: "max_retries",
                description: "Attempts per network operation; 0 = retry forever",
            },
            FieldMeta {
                name: "min_wait_time",
                description: "Initial retry cooldown in ms",
            },
            FieldMeta {
                name: "max_wait_time",
                description: "Retry cooldown cap in ms",
            },
        ];
        &FIELDS
    }
}

fn default_host() -> String {
    "192.168.100.16".to_string()
}

fn default_port() -> u16 {
    2121
}

fn default_username() -> String {
    "anonymous".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_config_file() -> String {
    "syncbak.conf.json".to_string()
}

fn default_true() -> bool {
    true
}

fn default_max_retries() -> u32 {
    5
}

fn default_min_wait_time() -> u64 {
    500
}

fn default_max_wait_time() -> u64 {
    8000
}

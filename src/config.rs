// src/config.rs

//! Manages server configuration: loading, resolving dynamic values, and validation.
//!
//! This module stops at the structural subset of configuration this subsystem cares
//! about — control endpoints, TLS material paths, and the per-view/forward/stub
//! declarations the fast-reload construct step consumes. Actual zone-file/RR grammar
//! parsing is a named external collaborator and is not reproduced here.

use crate::core::errors::ControlError;
use serde::{Deserialize, Serialize};
use std::fs;

/// A TCP endpoint the control listener binds.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TcpEndpoint {
    pub host: String,
    pub port: u16,
}

/// A filesystem-socket endpoint, with the permissions and ownership required by §4.1.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct UnixEndpoint {
    pub path: String,
    #[serde(default = "default_unix_mode")]
    pub mode: u32,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub group: Option<String>,
}

fn default_unix_mode() -> u32 {
    0o660
}

/// TLS material. The same CA file is trusted both for the server's own chain and as
/// the client-certificate verifier's trust root, per §6.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct TlsConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_server_cert")]
    pub server_cert: String,
    #[serde(default = "default_server_key")]
    pub server_key: String,
    #[serde(default = "default_client_ca")]
    pub client_ca: String,
}

fn default_server_cert() -> String {
    "control.crt".to_string()
}
fn default_server_key() -> String {
    "control.key".to_string()
}
fn default_client_ca() -> String {
    "control.crt".to_string()
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            server_cert: default_server_cert(),
            server_key: default_server_key(),
            client_ca: default_client_ca(),
        }
    }
}

/// A named view, consumed by the fast-reload construct step (§3 `Config`).
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct ViewConfig {
    pub name: String,
    #[serde(default)]
    pub local_zones: Vec<String>,
}

/// A forward-zone declaration (`forward_add`/`forward` table, §4.2).
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ForwardConfig {
    pub zone: String,
    pub servers: Vec<String>,
    #[serde(default)]
    pub insecure: bool,
    #[serde(default)]
    pub tls: bool,
}

/// A stub-zone declaration (`stub_add` table, §4.2).
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct StubConfig {
    pub zone: String,
    pub servers: Vec<String>,
    #[serde(default)]
    pub prime: bool,
}

/// The scalar/table fields excluded from no-pause publication per §4.5: their
/// shape (length, byte content) must stay in lockstep with indices used elsewhere,
/// so only a paused swap can safely replace them.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct NoPauseExcluded {
    pub tag_table: Vec<String>,
    #[serde(default)]
    pub cookie_secret: String,
    #[serde(default)]
    pub interfaces: Vec<String>,
    #[serde(default)]
    pub nsid: Option<String>,
}

/// A raw representation of the config file before validation.
#[derive(Deserialize)]
struct RawConfig {
    #[serde(default = "default_tcp_endpoints")]
    tcp_endpoints: Vec<TcpEndpoint>,
    #[serde(default)]
    unix_endpoints: Vec<UnixEndpoint>,
    #[serde(default = "default_max_active")]
    max_active: usize,
    #[serde(default = "default_num_workers")]
    num_workers: usize,
    #[serde(default = "default_log_level")]
    log_level: String,
    #[serde(default)]
    tls: TlsConfig,
    #[serde(default)]
    views: Vec<ViewConfig>,
    #[serde(default)]
    forwards: Vec<ForwardConfig>,
    #[serde(default)]
    stubs: Vec<StubConfig>,
    #[serde(default)]
    excluded: NoPauseExcluded,
}

fn default_tcp_endpoints() -> Vec<TcpEndpoint> {
    vec![TcpEndpoint {
        host: "127.0.0.1".to_string(),
        port: 8953,
    }]
}
fn default_max_active() -> usize {
    10
}
fn default_num_workers() -> usize {
    4
}
fn default_log_level() -> String {
    "info".to_string()
}

/// The final, validated server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub tcp_endpoints: Vec<TcpEndpoint>,
    pub unix_endpoints: Vec<UnixEndpoint>,
    pub max_active: usize,
    pub num_workers: usize,
    pub log_level: String,
    pub tls: TlsConfig,
    pub views: Vec<ViewConfig>,
    pub forwards: Vec<ForwardConfig>,
    pub stubs: Vec<StubConfig>,
    pub excluded: NoPauseExcluded,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tcp_endpoints: default_tcp_endpoints(),
            unix_endpoints: Vec::new(),
            max_active: default_max_active(),
            num_workers: default_num_workers(),
            log_level: default_log_level(),
            tls: TlsConfig::default(),
            views: Vec::new(),
            forwards: Vec::new(),
            stubs: Vec::new(),
            excluded: NoPauseExcluded::default(),
        }
    }
}

impl Config {
    /// Creates a new `Config` instance by reading and parsing a TOML file.
    pub fn from_file(path: &str) -> Result<Self, ControlError> {
        let contents = fs::read_to_string(path).map_err(|e| ControlError::ConfigReadFailed {
            path: path.to_string(),
            reason: e.to_string(),
        })?;
        let raw: RawConfig =
            toml::from_str(&contents).map_err(|e| ControlError::ConfigReadFailed {
                path: path.to_string(),
                reason: e.to_string(),
            })?;

        let config = Config {
            tcp_endpoints: raw.tcp_endpoints,
            unix_endpoints: raw.unix_endpoints,
            max_active: raw.max_active,
            num_workers: raw.num_workers,
            log_level: raw.log_level,
            tls: raw.tls,
            views: raw.views,
            forwards: raw.forwards,
            stubs: raw.stubs,
            excluded: raw.excluded,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for logical consistency.
    fn validate(&self) -> Result<(), ControlError> {
        if self.tcp_endpoints.is_empty() && self.unix_endpoints.is_empty() {
            return Err(ControlError::Internal(
                "at least one control endpoint must be configured".to_string(),
            ));
        }
        if self.max_active == 0 {
            return Err(ControlError::Internal("max_active cannot be 0".to_string()));
        }
        if self.num_workers == 0 {
            return Err(ControlError::Internal("num_workers cannot be 0".to_string()));
        }
        for ep in &self.tcp_endpoints {
            if ep.port == 0 {
                return Err(ControlError::Internal(format!(
                    "tcp endpoint '{}' has port 0",
                    ep.host
                )));
            }
        }
        if self.tls.enabled {
            if self.tls.server_cert.trim().is_empty() {
                return Err(ControlError::Internal(
                    "tls.server_cert cannot be empty when TLS is enabled".to_string(),
                ));
            }
            if self.tls.server_key.trim().is_empty() {
                return Err(ControlError::Internal(
                    "tls.server_key cannot be empty when TLS is enabled".to_string(),
                ));
            }
            if self.tls.client_ca.trim().is_empty() {
                return Err(ControlError::Internal(
                    "tls.client_ca cannot be empty when TLS is enabled".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// True if `other`'s excluded-field set differs from this config's, per §4.5 —
    /// used to decide whether a `fast_reload +p` must fall back to paused mode.
    pub fn excluded_fields_differ(&self, other: &Config) -> bool {
        self.excluded != other.excluded
    }
}

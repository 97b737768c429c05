//! Configuration for the ovpnctl CLI.
//!
//! One TOML file (platform config dir, or an explicit path) layered over
//! built-in defaults and under `OVPNCTL_*` environment variables, then
//! validated and translated to `ovpnctl_core::ManagerConfig`. The CLI
//! adds its flag overrides on top.

use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use ovpnctl_core::{CLIENT_TEMPLATE, ManagerConfig, SERVER_TEMPLATE, Subnet};

/// Environment variable prefix, e.g. `OVPNCTL_VPN_SUBNET`.
pub const ENV_PREFIX: &str = "OVPNCTL_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("cannot read {kind} template {}: {source}", path.display())]
    Template {
        kind: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// Client configuration directory read by the OpenVPN server.
    #[serde(default = "default_ccd_dir")]
    pub ccd_dir: PathBuf,

    /// Address space for static client addresses, in CIDR notation.
    #[serde(default = "default_vpn_subnet")]
    pub vpn_subnet: String,

    /// Server-side tunnel address. Must be the subnet's first host.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway: Option<Ipv4Addr>,

    /// Common name of the server certificate.
    #[serde(default = "default_server_name")]
    pub server_name: String,

    /// Root of the exported certificate material.
    #[serde(default = "default_pki_dir")]
    pub pki_dir: PathBuf,

    /// Replacement for the built-in client template.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_template: Option<PathBuf>,

    /// Replacement for the built-in server template.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_template: Option<PathBuf>,

    /// CLI presentation defaults.
    #[serde(default)]
    pub defaults: Defaults,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ccd_dir: default_ccd_dir(),
            vpn_subnet: default_vpn_subnet(),
            gateway: None,
            server_name: default_server_name(),
            pki_dir: default_pki_dir(),
            client_template: None,
            server_template: None,
            defaults: Defaults::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
        }
    }
}

fn default_ccd_dir() -> PathBuf {
    PathBuf::from("/etc/openvpn/ccd")
}
fn default_vpn_subnet() -> String {
    "10.43.0.0/16".into()
}
fn default_server_name() -> String {
    "vpn.example.com".into()
}
fn default_pki_dir() -> PathBuf {
    PathBuf::from("/etc/openvpn/pki")
}
fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}

// ── Validation ──────────────────────────────────────────────────────

impl Config {
    /// Check cross-field constraints and return the parsed subnet.
    pub fn validate(&self) -> Result<Subnet, ConfigError> {
        let subnet: Subnet = self.vpn_subnet.parse().map_err(|e| ConfigError::Validation {
            field: "vpn_subnet".into(),
            reason: format!("{e}"),
        })?;

        if subnet.usable_count() == 0 {
            return Err(ConfigError::Validation {
                field: "vpn_subnet".into(),
                reason: format!("{subnet} has no room for client addresses"),
            });
        }

        if let Some(gateway) = self.gateway {
            if subnet.gateway() != Some(gateway) {
                return Err(ConfigError::Validation {
                    field: "gateway".into(),
                    reason: format!("{gateway} is not the first host of {subnet}"),
                });
            }
        }

        if self.server_name.trim().is_empty() {
            return Err(ConfigError::Validation {
                field: "server_name".into(),
                reason: "must not be empty".into(),
            });
        }

        Ok(subnet)
    }

    /// Build the manager configuration, reading any template overrides.
    pub fn to_manager_config(&self) -> Result<ManagerConfig, ConfigError> {
        let subnet = self.validate()?;
        let mut config =
            ManagerConfig::new(&self.ccd_dir, subnet, &self.server_name, &self.pki_dir);
        config.client_template =
            read_template("client", self.client_template.as_deref(), CLIENT_TEMPLATE)?;
        config.server_template =
            read_template("server", self.server_template.as_deref(), SERVER_TEMPLATE)?;
        Ok(config)
    }
}

fn read_template(
    kind: &'static str,
    path: Option<&Path>,
    builtin: &str,
) -> Result<String, ConfigError> {
    let Some(path) = path else {
        return Ok(builtin.to_owned());
    };
    debug!(kind, path = %path.display(), "loading template override");
    std::fs::read_to_string(path).map_err(|source| ConfigError::Template {
        kind,
        path: path.to_owned(),
        source,
    })
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "ovpnctl", "ovpnctl").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("ovpnctl");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Layered provider chain: defaults, then the TOML file at `path`, then
/// `OVPNCTL_*` variables. Callers may merge further providers on top.
pub fn figment(path: &Path) -> Figment {
    Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX))
}

/// Load and validate the Config from `path` + environment.
///
/// A missing file is not an error; defaults and environment still apply.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let config: Config = figment(path).extract()?;
    config.validate()?;
    debug!(path = %path.display(), subnet = %config.vpn_subnet, "configuration loaded");
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write it to `path`.
pub fn save_config(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

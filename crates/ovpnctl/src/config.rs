//! CLI configuration: thin wrapper around `ovpnctl_config`.
//!
//! Adds the `GlobalOpts` flag overrides (--ccd-dir, --subnet, ...) as the
//! last figment layer, above file and environment.

use std::path::PathBuf;

use clap::ValueEnum;
use figment::Figment;
use figment::providers::Serialized;
use serde::Serialize;

use ovpnctl_core::{FsProvider, VpnManager};

use crate::cli::{ColorMode, GlobalOpts, OutputFormat};
use crate::error::CliError;

pub use ovpnctl_config::{Config, config_path, save_config};

/// Flag values that override the config file. Unset flags are skipped so
/// lower layers show through.
#[derive(Debug, Default, Serialize)]
struct FlagOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    ccd_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    vpn_subnet: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pki_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    server_name: Option<String>,
}

impl From<&GlobalOpts> for FlagOverrides {
    fn from(global: &GlobalOpts) -> Self {
        Self {
            ccd_dir: global.ccd_dir.clone(),
            vpn_subnet: global.subnet.clone(),
            pki_dir: global.pki_dir.clone(),
            server_name: global.server_name.clone(),
        }
    }
}

/// The config file in effect: `--config` / `OVPNCTL_CONFIG`, else the
/// platform default.
pub fn config_file(global: &GlobalOpts) -> PathBuf {
    global.config.clone().unwrap_or_else(config_path)
}

/// Resolve defaults → file → environment → flags, then validate.
pub fn load(global: &GlobalOpts) -> Result<Config, CliError> {
    let path = config_file(global);
    let cfg: Config = ovpnctl_config::figment(&path)
        .merge(Serialized::defaults(FlagOverrides::from(global)))
        .extract()?;
    cfg.validate()?;
    tracing::debug!(
        path = %path.display(),
        ccd_dir = %cfg.ccd_dir.display(),
        "resolved configuration"
    );
    Ok(cfg)
}

/// Defaults plus flag overrides, ignoring any existing file. Seeds `config init`.
pub fn initial(global: &GlobalOpts) -> Result<Config, CliError> {
    let cfg: Config = Figment::from(Serialized::defaults(Config::default()))
        .merge(Serialized::defaults(FlagOverrides::from(global)))
        .extract()?;
    Ok(cfg)
}

/// Build the manager the command handlers operate on.
pub fn manager(cfg: &Config) -> Result<VpnManager<FsProvider>, CliError> {
    Ok(VpnManager::from_config(cfg.to_manager_config()?))
}

/// Fill unset presentation flags from `[defaults]`.
pub fn apply_defaults(global: &mut GlobalOpts, cfg: &Config) -> Result<(), CliError> {
    if global.output.is_none() {
        global.output = Some(parse_choice("defaults.output", &cfg.defaults.output)?);
    }
    if global.color.is_none() {
        global.color = Some(parse_choice::<ColorMode>("defaults.color", &cfg.defaults.color)?);
    }
    Ok(())
}

fn parse_choice<T: ValueEnum>(field: &str, value: &str) -> Result<T, CliError> {
    T::from_str(value, true).map_err(|reason| CliError::Validation {
        field: field.into(),
        reason,
    })
}

/// Output format after defaults have been applied.
pub fn output_format(global: &GlobalOpts) -> OutputFormat {
    global.output.unwrap_or(OutputFormat::Table)
}

//! Config subcommand handlers.

use std::path::PathBuf;

use dialoguer::Input;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, Config};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Helpers ─────────────────────────────────────────────────────────

fn format_config(cfg: &Config) -> String {
    toml::to_string_pretty(cfg).unwrap_or_else(|e| format!("# cannot render config: {e}"))
}

/// Map a dialoguer / interactive I/O failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

fn prompt_text(prompt: &str, default: String) -> Result<String, CliError> {
    Input::new()
        .with_prompt(prompt)
        .default(default)
        .interact_text()
        .map_err(prompt_err)
}

/// Walk through the fields that have no sensible default.
fn prompt_fields(mut cfg: Config) -> Result<Config, CliError> {
    cfg.ccd_dir = PathBuf::from(prompt_text(
        "Client config directory",
        cfg.ccd_dir.display().to_string(),
    )?);
    cfg.vpn_subnet = prompt_text("VPN subnet", cfg.vpn_subnet)?;
    cfg.server_name = prompt_text("Server certificate common name", cfg.server_name)?;
    cfg.pki_dir = PathBuf::from(prompt_text(
        "Exported PKI directory",
        cfg.pki_dir.display().to_string(),
    )?);
    Ok(cfg)
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        // ── Init: guided unless --yes ───────────────────────────────
        ConfigCommand::Init => {
            let path = config::config_file(global);
            if path.exists()
                && !util::confirm(
                    &format!("Overwrite {}?", path.display()),
                    "config init",
                    global.yes,
                )?
            {
                return Ok(());
            }

            let mut cfg = config::initial(global)?;
            if !global.yes {
                if !global.quiet {
                    eprintln!("ovpnctl configuration");
                    eprintln!("   Config path: {}\n", path.display());
                }
                cfg = prompt_fields(cfg)?;
            }
            cfg.validate()?;

            config::save_config(&cfg, &path)?;
            output::success(global, &format!("Configuration written to {}", path.display()));
            Ok(())
        }

        // ── Show ────────────────────────────────────────────────────
        ConfigCommand::Show => {
            let cfg = config::load(global)?;
            let out = output::render_single(
                config::output_format(global),
                &cfg,
                format_config,
                |c| c.vpn_subnet.clone(),
            )?;
            output::print_output(out.trim_end(), global.quiet);
            Ok(())
        }

        // ── Path ────────────────────────────────────────────────────
        ConfigCommand::Path => {
            output::print_output(&config::config_file(global).display().to_string(), global.quiet);
            Ok(())
        }
    }
}

//! Client command handlers.

use std::path::Path;

use ovpnctl_core::{ClientRecord, FsProvider, VpnManager};
use tabled::Tabled;

use crate::cli::{ClientsArgs, ClientsCommand, GlobalOpts, OutputFormat};
use crate::config::output_format;
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct ClientRow {
    #[tabled(rename = "Common Name")]
    common_name: String,
    #[tabled(rename = "Address")]
    ip: String,
    #[tabled(rename = "Serial")]
    serial: String,
    #[tabled(rename = "Expires")]
    expires: String,
}

impl From<&ClientRecord> for ClientRow {
    fn from(c: &ClientRecord) -> Self {
        Self {
            common_name: c.common_name.clone(),
            ip: c.ip.map(|ip| ip.to_string()).unwrap_or_default(),
            serial: c.serial.clone(),
            expires: if c.expired {
                format!("{} (expired)", c.expires_at_human)
            } else {
                c.expires_at_human.clone()
            },
        }
    }
}

fn detail(c: &ClientRecord) -> String {
    [
        format!("Common name: {}", c.common_name),
        format!("Serial:      {}", c.serial),
        format!(
            "Address:     {}",
            c.ip.map_or_else(|| "-".into(), |ip| ip.to_string())
        ),
        format!("Expires:     {}", c.expires_at_human),
        format!("Expired:     {}", c.expired),
    ]
    .join("\n")
}

/// Deliver a rendered client config: to `out` if given, else to stdout.
///
/// Structured formats on stdout wrap the config with the record instead.
fn deliver(
    record: &ClientRecord,
    config: &str,
    out: Option<&Path>,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    if let Some(path) = out {
        util::write_file(path, config.as_bytes(), true)?;
        output::success(
            global,
            &format!("Wrote configuration for {} to {}", record.common_name, path.display()),
        );
        let rendered = output::render_single(output_format(global), record, detail, |c| {
            c.ip.map(|ip| ip.to_string()).unwrap_or_default()
        })?;
        output::print_output(&rendered, global.quiet);
        return Ok(());
    }

    match output_format(global) {
        OutputFormat::Table | OutputFormat::Plain => output::print_document(config, global.quiet),
        format => {
            let bundle = ovpnctl_core::ClientBundle {
                record: record.clone(),
                config: config.to_owned(),
            };
            let rendered =
                output::render_single(format, &bundle, |_| String::new(), |_| String::new())?;
            output::print_output(&rendered, global.quiet);
        }
    }
    Ok(())
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(
    manager: &VpnManager<FsProvider>,
    args: ClientsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        ClientsCommand::List => {
            let clients = manager.clients()?;
            let out = output::render_list(
                output_format(global),
                &clients,
                |c| ClientRow::from(c),
                |c| {
                    let ip = c.ip.map(|ip| ip.to_string()).unwrap_or_default();
                    format!("{}\t{ip}", c.common_name)
                },
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ClientsCommand::Provision { cn, out } => {
            let bundle = manager.provision_client(&cn)?;
            if bundle.record.expired {
                output::notice(global, &format!("certificate for {cn} has expired"));
            }
            deliver(&bundle.record, &bundle.config, out.as_deref(), global)
        }

        ClientsCommand::Show { cn } => {
            let record = manager.client(&cn)?;
            let out = output::render_single(output_format(global), &record, detail, |c| {
                c.common_name.clone()
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ClientsCommand::Config { cn, out } => {
            let record = manager.client(&cn)?;
            if record.ip.is_none() {
                output::notice(
                    global,
                    &format!("{cn} has no static address yet; run: ovpnctl clients provision {cn}"),
                );
            }
            let config = manager.client_config(&cn)?;
            deliver(&record, &config, out.as_deref(), global)
        }

        ClientsCommand::Remove { cn } => {
            if !util::confirm(
                &format!("Release the address of {cn}? The certificate stays valid."),
                "clients remove",
                global.yes,
            )? {
                return Ok(());
            }
            manager.remove_client(&cn)?;
            output::success(global, &format!("Removed {cn}"));
            Ok(())
        }
    }
}

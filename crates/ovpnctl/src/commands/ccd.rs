//! CCD command handlers.

use std::net::Ipv4Addr;

use serde::Serialize;
use tabled::Tabled;

use ovpnctl_core::{FsProvider, Subnet, VpnManager};

use crate::cli::{CcdArgs, CcdCommand, GlobalOpts};
use crate::config::output_format;
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct Assignment {
    common_name: String,
    ip: Ipv4Addr,
    in_subnet: bool,
}

#[derive(Tabled)]
struct AssignmentRow {
    #[tabled(rename = "Common Name")]
    common_name: String,
    #[tabled(rename = "Address")]
    ip: String,
    #[tabled(rename = "In Subnet")]
    in_subnet: String,
}

impl From<&Assignment> for AssignmentRow {
    fn from(a: &Assignment) -> Self {
        Self {
            common_name: a.common_name.clone(),
            ip: a.ip.to_string(),
            in_subnet: if a.in_subnet { "yes" } else { "no" }.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct DirectiveView {
    common_name: String,
    directive: String,
    ip: Ipv4Addr,
    netmask: Option<Ipv4Addr>,
}

fn detail(d: &DirectiveView) -> String {
    [
        format!("Common name: {}", d.common_name),
        format!("Address:     {}", d.ip),
        format!(
            "Netmask:     {}",
            d.netmask.map_or_else(|| "-".into(), |m| m.to_string())
        ),
        format!("Directive:   {}", d.directive.trim_end()),
    ]
    .join("\n")
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(
    manager: &VpnManager<FsProvider>,
    args: CcdArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let format = output_format(global);

    match args.command {
        CcdCommand::List => {
            let scan = manager.scan()?;
            if scan.skipped > 0 {
                output::notice(
                    global,
                    &format!("{} entries without a valid directive were skipped", scan.skipped),
                );
            }
            let subnet = manager.subnet();
            let assignments: Vec<Assignment> = scan
                .entries
                .into_iter()
                .map(|(common_name, ip)| Assignment {
                    common_name,
                    ip,
                    in_subnet: subnet.contains(ip),
                })
                .collect();
            let out = output::render_list(
                format,
                &assignments,
                |a| AssignmentRow::from(a),
                |a| format!("{}\t{}", a.common_name, a.ip),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        CcdCommand::Show { cn } => {
            let directive = manager.ccd().read(&cn)?;
            let parsed = manager.ccd().read_directive(&cn)?;
            let view = DirectiveView {
                common_name: cn,
                directive,
                ip: parsed.address,
                netmask: parsed.netmask,
            };
            let out = output::render_single(format, &view, detail, |d| d.directive.clone())?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        CcdCommand::Ip { cn } => {
            let ip = manager.ccd().read_ip(&cn)?;
            print_assignment(manager.subnet(), &cn, ip, global)
        }

        CcdCommand::Assign { cn, ip: Some(ip), .. } => {
            let holder = manager
                .ip_map()?
                .into_iter()
                .find(|(other, addr)| *addr == ip && *other != cn);
            if let Some((other, _)) = holder {
                let message =
                    format!("{ip} is already assigned to {other}. Assign it to {cn} as well?");
                if !util::confirm(&message, "ccd assign", global.yes)? {
                    return Ok(());
                }
            }
            manager.assign_ip(&cn, ip)?;
            output::success(global, &format!("Assigned {ip} to {cn}"));
            print_assignment(manager.subnet(), &cn, ip, global)
        }

        CcdCommand::Assign {
            cn,
            ip: None,
            reassign,
        } => {
            let ip = if reassign {
                manager.ccd().write_next_static_ip(&cn)?
            } else {
                manager.ensure_ip(&cn)?
            };
            output::success(global, &format!("{cn} has {ip}"));
            print_assignment(manager.subnet(), &cn, ip, global)
        }

        CcdCommand::Delete { cn } => {
            if !util::confirm(&format!("Release the address of {cn}?"), "ccd delete", global.yes)? {
                return Ok(());
            }
            manager.ccd().delete(&cn)?;
            output::success(global, &format!("Released {cn}"));
            Ok(())
        }
    }
}

fn print_assignment(
    subnet: &Subnet,
    cn: &str,
    ip: Ipv4Addr,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let assignment = Assignment {
        common_name: cn.into(),
        ip,
        in_subnet: subnet.contains(ip),
    };
    let out = output::render_single(
        output_format(global),
        &assignment,
        |a| a.ip.to_string(),
        |a| a.ip.to_string(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

//! Server command handlers.

use ovpnctl_core::export::tls_crypt;
use ovpnctl_core::{FsProvider, ServerData, VpnManager};

use crate::cli::{GlobalOpts, ServerArgs, ServerCommand};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(
    manager: &VpnManager<FsProvider>,
    args: ServerArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        ServerCommand::Config { out } => {
            let config = manager.server_config()?;
            match out {
                Some(path) => {
                    util::write_file(&path, config.as_bytes(), true)?;
                    output::success(
                        global,
                        &format!("Wrote server configuration to {}", path.display()),
                    );
                }
                None => output::print_document(&config, global.quiet),
            }
            Ok(())
        }

        ServerCommand::PackAux {
            port,
            tls_crypt: key_file,
            out,
        } => {
            let key = match key_file {
                Some(path) => tls_crypt::parse(&util::read_file(&path)?)?,
                None => Vec::new(),
            };
            let blob = ServerData {
                port,
                tls_crypt: key,
            }
            .encode()?;
            util::write_file(&out, &blob, true)?;
            tracing::info!(port, bytes = blob.len(), "packed server data");
            output::success(
                global,
                &format!("Wrote {} bytes of server data to {}", blob.len(), out.display()),
            );
            Ok(())
        }
    }
}

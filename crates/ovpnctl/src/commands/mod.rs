//! Command dispatch: bridges CLI args -> manager calls -> output formatting.

pub mod ccd;
pub mod clients;
pub mod config_cmd;
pub mod server;
pub mod util;

use ovpnctl_core::{FsProvider, VpnManager};

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a manager-bound command to the appropriate handler.
pub fn dispatch(
    cmd: Command,
    manager: &VpnManager<FsProvider>,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Ccd(args) => ccd::handle(manager, args, global),
        Command::Clients(args) => clients::handle(manager, args, global),
        Command::Server(args) => server::handle(manager, args, global),
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => unreachable!(),
    }
}

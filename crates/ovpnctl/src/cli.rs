//! Clap derive structures for the `ovpnctl` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use std::net::Ipv4Addr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// ovpnctl -- static addresses and config export for OpenVPN clients
#[derive(Debug, Parser)]
#[command(
    name = "ovpnctl",
    version,
    about = "Manage OpenVPN client addresses and configurations",
    long_about = "Allocates static tunnel addresses for OpenVPN clients through the\n\
        server's client-config-dir and assembles ready-to-use client and server\n\
        configurations from certificate material exported by your CA.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Config file (defaults to the platform config directory)
    #[arg(long, env = "OVPNCTL_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Client configuration directory (overrides config)
    #[arg(long, global = true)]
    pub ccd_dir: Option<PathBuf>,

    /// VPN subnet in CIDR notation (overrides config)
    #[arg(long, global = true)]
    pub subnet: Option<String>,

    /// Exported PKI directory (overrides config)
    #[arg(long, global = true)]
    pub pki_dir: Option<PathBuf>,

    /// Common name of the server certificate (overrides config)
    #[arg(long, global = true)]
    pub server_name: Option<String>,

    /// Output format [default: from config, else table]
    #[arg(long, short = 'o', env = "OVPNCTL_OUTPUT", global = true)]
    pub output: Option<OutputFormat>,

    /// When to use color output [default: from config, else auto]
    #[arg(long, global = true)]
    pub color: Option<ColorMode>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Inspect and edit static address assignments
    Ccd(CcdArgs),

    /// Provision clients and export their configurations
    #[command(alias = "cl")]
    Clients(ClientsArgs),

    /// Server configuration and certificate data
    Server(ServerArgs),

    /// Manage CLI configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── CCD ──────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CcdArgs {
    #[command(subcommand)]
    pub command: CcdCommand,
}

#[derive(Debug, Subcommand)]
pub enum CcdCommand {
    /// List every identity with a static address
    #[command(alias = "ls")]
    List,

    /// Show the raw directive stored for an identity
    Show {
        /// Certificate common name
        cn: String,
    },

    /// Print the address assigned to an identity
    Ip {
        /// Certificate common name
        cn: String,
    },

    /// Assign a static address (the next free one unless --ip is given)
    Assign {
        /// Certificate common name
        cn: String,

        /// Explicit address; skips allocation and collision checks
        #[arg(long)]
        ip: Option<Ipv4Addr>,

        /// Allocate a fresh address even if one is already assigned
        #[arg(long, conflicts_with = "ip")]
        reassign: bool,
    },

    /// Release an identity's address
    #[command(alias = "rm")]
    Delete {
        /// Certificate common name
        cn: String,
    },
}

// ── Clients ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ClientsArgs {
    #[command(subcommand)]
    pub command: ClientsCommand,
}

#[derive(Debug, Subcommand)]
pub enum ClientsCommand {
    /// List issued client certificates with their addresses
    #[command(alias = "ls")]
    List,

    /// Assign an address (if needed) and render the client configuration
    Provision {
        /// Certificate common name
        cn: String,

        /// Write the configuration to this file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Show certificate facts and the assigned address
    Show {
        /// Certificate common name
        cn: String,
    },

    /// Render the client configuration without allocating
    Config {
        /// Certificate common name
        cn: String,

        /// Write the configuration to this file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Release the client's address (revocation is the CA's job)
    #[command(alias = "rm")]
    Remove {
        /// Certificate common name
        cn: String,
    },
}

// ── Server ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ServerArgs {
    #[command(subcommand)]
    pub command: ServerCommand,
}

#[derive(Debug, Subcommand)]
pub enum ServerCommand {
    /// Render the server configuration
    Config {
        /// Write the configuration to this file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Encode the server data blob carried by the server certificate
    PackAux {
        /// Listening port
        #[arg(long)]
        port: u16,

        /// OpenVPN static key file to embed as the tls-crypt key
        #[arg(long)]
        tls_crypt: Option<PathBuf>,

        /// Destination file
        #[arg(long)]
        out: PathBuf,
    },
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create the config file (prompts unless --yes)
    Init,

    /// Display current resolved configuration
    Show,

    /// Print the config file location
    Path,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}

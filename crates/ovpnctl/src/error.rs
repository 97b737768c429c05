//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors
//! with actionable help text and stable exit codes.

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

use ovpnctl_config::ConfigError;
use ovpnctl_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const CONFLICT: i32 = 6;
    pub const DATA: i32 = 9;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Lookup ───────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(code(ovpnctl::not_found), help("{hint}"))]
    NotFound {
        resource_type: String,
        identifier: String,
        hint: String,
    },

    // ── Allocation ───────────────────────────────────────────────────
    #[error("No free address left in {subnet}")]
    #[diagnostic(
        code(ovpnctl::exhausted),
        help(
            "Release unused addresses with: ovpnctl ccd delete <cn>\n\
             Or widen vpn_subnet in your config."
        )
    )]
    Exhausted { subnet: String },

    #[error("Certificate for '{requested}' was issued to '{found}'")]
    #[diagnostic(
        code(ovpnctl::identity_mismatch),
        help("Check that the PKI export puts each certificate under its own common name.")
    )]
    IdentityMismatch { requested: String, found: String },

    // ── Data ─────────────────────────────────────────────────────────
    #[error("{what}: {reason}")]
    #[diagnostic(code(ovpnctl::data))]
    Data { what: String, reason: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(ovpnctl::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error(transparent)]
    #[diagnostic(
        code(ovpnctl::config),
        help("Inspect the resolved configuration with: ovpnctl config show")
    )]
    Config(Box<figment::Error>),

    #[error("Cannot read {kind} template {}", path.display())]
    #[diagnostic(code(ovpnctl::template))]
    TemplateFile {
        kind: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Interactive ──────────────────────────────────────────────────
    #[error("Destructive operation '{action}' requires confirmation")]
    #[diagnostic(
        code(ovpnctl::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── IO / Serialization ───────────────────────────────────────────
    #[error("Storage error while accessing {identity}")]
    #[diagnostic(code(ovpnctl::storage))]
    Storage {
        identity: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot write {}", path.display())]
    #[diagnostic(code(ovpnctl::write))]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot read {}", path.display())]
    #[diagnostic(code(ovpnctl::read))]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Certificate material unavailable for {identity}: {reason}")]
    #[diagnostic(
        code(ovpnctl::provider),
        help("Check pki_dir and the exported files' permissions.")
    )]
    Provider { identity: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Cannot serialize output: {0}")]
    #[diagnostic(code(ovpnctl::serialize))]
    Serialize(String),
}

impl From<figment::Error> for CliError {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Exhausted { .. } => exit_code::CONFLICT,
            Self::Validation { .. } | Self::Config(_) | Self::NonInteractiveRequiresYes { .. } => {
                exit_code::USAGE
            }
            Self::IdentityMismatch { .. } | Self::Data { .. } => exit_code::DATA,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::NotFound { kind, identity } => CliError::NotFound {
                hint: not_found_hint(kind),
                resource_type: kind.into(),
                identifier: identity,
            },

            CoreError::IdentityMismatch { requested, found } => {
                CliError::IdentityMismatch { requested, found }
            }

            CoreError::InvalidIdentity { identity, reason } => CliError::Validation {
                field: "common name".into(),
                reason: format!("'{identity}' {reason}"),
            },

            CoreError::Exhausted { subnet } => CliError::Exhausted { subnet },

            CoreError::Subnet { subnet, reason } => CliError::Validation {
                field: "subnet".into(),
                reason: format!("'{subnet}': {reason}"),
            },

            CoreError::Parse { identity, reason } => CliError::Data {
                what: format!("Malformed directive for {identity}"),
                reason,
            },

            CoreError::Decode { reason } => CliError::Data {
                what: "Corrupt server data".into(),
                reason,
            },

            CoreError::Format { reason } => CliError::Data {
                what: "Unusable tls-crypt key".into(),
                reason,
            },

            CoreError::Template { reason } => CliError::Data {
                what: "Template error".into(),
                reason,
            },

            CoreError::Storage { identity, source } => CliError::Storage { identity, source },

            CoreError::Provider { identity, reason } => CliError::Provider { identity, reason },
        }
    }
}

fn not_found_hint(kind: &str) -> String {
    match kind {
        "directive" => "Run: ovpnctl ccd list to see assigned identities".into(),
        _ => format!("Export the {kind} from your CA into pki_dir"),
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::Template { kind, path, source } => {
                CliError::TemplateFile { kind, path, source }
            }
            ConfigError::Figment(err) => CliError::Config(err),
            ConfigError::Serialization(err) => CliError::Serialize(err.to_string()),
            ConfigError::Io(err) => CliError::Io(err),
        }
    }
}

//! Static address allocation and config assembly for OpenVPN clients.
//!
//! This crate owns the business logic of the ovpnctl workspace:
//!
//! - **[`Ccd`]** — The client configuration directory as an allocation
//!   index. One `ifconfig-push` directive file per identity; the
//!   identity→address map is rebuilt by listing the directory. New
//!   identities get the lowest free address of the [`Subnet`], skipping the
//!   network, gateway and broadcast addresses. Writes are serialized per
//!   directory and made visible by rename.
//!
//! - **[`View`]** — Template context assembled from a subject certificate,
//!   an optional server certificate (whose [`ServerData`] blob carries the
//!   listening port and tls-crypt key) and the CA chain.
//!
//! - **[`export::render`]** — Placeholder substitution over the built-in
//!   [`CLIENT_TEMPLATE`] / [`SERVER_TEMPLATE`] or operator-supplied text.
//!
//! - **[`VpnManager`]** — Facade tying the store, a
//!   [`CertificateProvider`] and the export pipeline together.

pub mod ccd;
pub mod config;
pub mod error;
pub mod export;
pub mod manager;
pub mod model;
pub mod provider;
pub mod subnet;

// ── Primary re-exports ──────────────────────────────────────────────
pub use ccd::{Ccd, CcdScan, Directive};
pub use config::ManagerConfig;
pub use error::{CoreError, Result};
pub use export::{CLIENT_TEMPLATE, SERVER_TEMPLATE, ServerData, View};
pub use manager::VpnManager;
pub use model::{CertMaterial, CertRole, ClientBundle, ClientRecord};
pub use provider::{CertificateProvider, FsProvider};
pub use subnet::Subnet;

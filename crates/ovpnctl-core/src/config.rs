// ── Runtime manager configuration ──
//
// What a `VpnManager` needs to operate: where the CCD store and the
// exported PKI live, which subnet to allocate from, which server the
// clients connect to, and the template texts. Core never reads config
// files; the CLI builds this and hands it in.

use std::path::PathBuf;

use crate::export::{CLIENT_TEMPLATE, SERVER_TEMPLATE};
use crate::subnet::Subnet;

/// Configuration for one VPN server's client management.
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// Client configuration directory read by the OpenVPN server.
    pub ccd_dir: PathBuf,
    /// Address space for static client addresses.
    pub vpn_subnet: Subnet,
    /// Common name of the server certificate clients connect to.
    pub server_name: String,
    /// Root of the exported certificate material.
    pub pki_dir: PathBuf,
    pub client_template: String,
    pub server_template: String,
}

impl ManagerConfig {
    /// Config with the built-in templates.
    pub fn new(
        ccd_dir: impl Into<PathBuf>,
        vpn_subnet: Subnet,
        server_name: impl Into<String>,
        pki_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            ccd_dir: ccd_dir.into(),
            vpn_subnet,
            server_name: server_name.into(),
            pki_dir: pki_dir.into(),
            client_template: CLIENT_TEMPLATE.to_owned(),
            server_template: SERVER_TEMPLATE.to_owned(),
        }
    }
}

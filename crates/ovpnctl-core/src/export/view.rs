// ── Render view ──
//
// Everything a config template can reference, assembled fresh for
// each render from certificate material and the server's network data.

use std::net::Ipv4Addr;

use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;
use serde::Serialize;

use super::server_data::ServerData;
use super::tls_crypt;
use crate::error::Result;
use crate::model::CertMaterial;
use crate::subnet::Subnet;

pub const DEFAULT_PORT: u16 = 1194;
pub const TOOL_NAME: &str = "ovpnctl";

/// Placeholder host when the server certificate names neither a DNS
/// name nor an IP address.
pub const UNSPECIFIED_HOST: &str = "0.0.0.0";

/// RFC 1123 with a numeric zone, e.g. `Mon, 02 Jan 2006 15:04:05 +0000`.
pub const DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S %z";

/// Template context. Field names are PascalCase on the template side.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct View {
    pub common_name: String,
    pub date: String,
    pub tool: String,
    pub cert: String,
    pub key: String,
    pub ca: String,
    /// Inline `<tls-crypt>` block, or empty.
    pub tls_crypt: String,

    pub server_common_name: String,
    /// Server IP address; used by the server template.
    #[serde(rename = "IP")]
    pub ip: String,
    /// Server DNS name, falling back to its IP; used by the client template.
    pub host: String,
    pub port: u16,

    /// The subject's static tunnel address, when it has one.
    pub address: String,
    pub network: String,
    pub netmask: String,
}

/// Server-side parameters shared by client and server views.
#[derive(Debug, Clone, PartialEq, Eq)]
struct NetworkParams {
    server_common_name: String,
    ip: String,
    host: String,
    port: u16,
    tls_crypt: String,
}

impl Default for NetworkParams {
    fn default() -> Self {
        Self {
            server_common_name: String::new(),
            ip: UNSPECIFIED_HOST.into(),
            host: UNSPECIFIED_HOST.into(),
            port: DEFAULT_PORT,
            tls_crypt: String::new(),
        }
    }
}

impl NetworkParams {
    /// Pull host, port and tls-crypt key from a server certificate.
    ///
    /// A damaged auxiliary blob or a wrong-sized key fails the whole view.
    fn resolve(server: &CertMaterial) -> Result<Self> {
        let ip = server
            .ip_addresses
            .first()
            .map_or_else(|| UNSPECIFIED_HOST.to_owned(), ToString::to_string);
        let host = server.dns_names.first().cloned().unwrap_or_else(|| ip.clone());

        let (port, tls_crypt) = match ServerData::decode(&server.aux)? {
            Some(data) => {
                let port = if data.port == 0 { DEFAULT_PORT } else { data.port };
                let block = if data.tls_crypt.is_empty() {
                    String::new()
                } else {
                    tls_crypt::format(&data.tls_crypt)?
                };
                (port, block)
            }
            None => (DEFAULT_PORT, String::new()),
        };

        Ok(Self {
            server_common_name: server.common_name.clone(),
            ip,
            host,
            port,
            tls_crypt,
        })
    }
}

impl View {
    /// View for a client connecting to `server`.
    ///
    /// Without a server certificate the network parameters fall back to
    /// the unspecified host and the default port.
    pub fn client(
        client: &CertMaterial,
        server: Option<&CertMaterial>,
        ca_pem: &str,
    ) -> Result<Self> {
        let params = server.map(NetworkParams::resolve).transpose()?.unwrap_or_default();
        Ok(Self::assemble(client, params, ca_pem, Utc::now()))
    }

    /// View for a server rendering its own configuration.
    pub fn server(server: &CertMaterial, ca_pem: &str) -> Result<Self> {
        let params = NetworkParams::resolve(server)?;
        Ok(Self::assemble(server, params, ca_pem, Utc::now()))
    }

    pub fn with_address(mut self, address: Ipv4Addr) -> Self {
        self.address = address.to_string();
        self
    }

    pub fn with_subnet(mut self, subnet: &Subnet) -> Self {
        self.network = subnet.network().to_string();
        self.netmask = subnet.netmask().to_string();
        self
    }

    fn assemble(
        subject: &CertMaterial,
        params: NetworkParams,
        ca_pem: &str,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            common_name: subject.common_name.clone(),
            date: now.format(DATE_FORMAT).to_string(),
            tool: TOOL_NAME.into(),
            cert: subject.cert_pem.clone(),
            key: subject.key_pem.expose_secret().to_owned(),
            ca: ca_pem.to_owned(),
            tls_crypt: params.tls_crypt,
            server_common_name: params.server_common_name,
            ip: params.ip,
            host: params.host,
            port: params.port,
            address: String::new(),
            network: String::new(),
            netmask: String::new(),
        }
    }
}

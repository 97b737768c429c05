// ── Certificate material ──
//
// What the certificate authority hands back for one identity. The core
// only reads it; issuance and revocation happen elsewhere.

use std::net::{IpAddr, Ipv4Addr};

use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::Serialize;
use strum::{Display, EnumString};

/// Which side of the tunnel a certificate identifies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CertRole {
    Client,
    Server,
}

/// A certificate plus its key and metadata.
#[derive(Debug)]
pub struct CertMaterial {
    pub common_name: String,
    pub not_after: DateTime<Utc>,
    /// Hex serial, `0x`-prefixed.
    pub serial: String,
    pub cert_pem: String,
    pub key_pem: SecretString,
    /// Opaque server data (port, tls-crypt key). Empty for clients.
    pub aux: Vec<u8>,
    pub dns_names: Vec<String>,
    pub ip_addresses: Vec<IpAddr>,
}

impl CertMaterial {
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.not_after
    }
}

/// Public view of a provisioned client, as listed by the CLI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientRecord {
    pub common_name: String,
    pub serial: String,
    pub ip: Option<Ipv4Addr>,
    pub expired: bool,
    /// Unix seconds.
    pub expires_at: i64,
    pub expires_at_human: String,
}

impl ClientRecord {
    pub fn new(cert: &CertMaterial, ip: Option<Ipv4Addr>) -> Self {
        Self {
            common_name: cert.common_name.clone(),
            serial: cert.serial.clone(),
            ip,
            expired: cert.is_expired(),
            expires_at: cert.not_after.timestamp(),
            expires_at_human: cert.not_after.to_rfc3339(),
        }
    }
}

/// A record together with the rendered client configuration.
#[derive(Debug, Clone, Serialize)]
pub struct ClientBundle {
    #[serde(flatten)]
    pub record: ClientRecord,
    pub config: String,
}

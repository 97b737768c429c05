// ── Directory-backed provider ──
//
// Layout, as exported from the CA:
//
//   <root>/ca.pem
//   <root>/clients/<cn>/{cert.pem,key.pem,meta.json[,aux.bin]}
//   <root>/servers/<cn>/{cert.pem,key.pem,meta.json[,aux.bin]}

use std::fs;
use std::io;
use std::net::IpAddr;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::Deserialize;
use tracing::debug;

use super::CertificateProvider;
use crate::ccd::validate_identity;
use crate::error::{CoreError, Result};
use crate::model::{CertMaterial, CertRole};

const CA_FILE: &str = "ca.pem";
const CERT_FILE: &str = "cert.pem";
const KEY_FILE: &str = "key.pem";
const META_FILE: &str = "meta.json";
const AUX_FILE: &str = "aux.bin";

/// Certificate metadata stored next to the PEM files.
#[derive(Debug, Deserialize)]
struct Meta {
    common_name: Option<String>,
    serial: String,
    not_after: DateTime<Utc>,
    #[serde(default)]
    dns_names: Vec<String>,
    #[serde(default)]
    ip_addresses: Vec<IpAddr>,
}

#[derive(Debug, Clone)]
pub struct FsProvider {
    root: PathBuf,
}

impl FsProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn identity_dir(&self, role: CertRole, cn: &str) -> PathBuf {
        self.root.join(format!("{role}s")).join(cn)
    }
}

impl CertificateProvider for FsProvider {
    fn find(&self, role: CertRole, cn: &str) -> Result<CertMaterial> {
        validate_identity(cn)?;
        let dir = self.identity_dir(role, cn);
        if !dir.is_dir() {
            return Err(CoreError::not_found(certificate_kind(role), cn));
        }
        debug!(identity = cn, %role, "loading certificate material");

        let meta: Meta = serde_json::from_str(&read(&dir.join(META_FILE), cn)?)
            .map_err(|e| provider_err(cn, format!("invalid {META_FILE}: {e}")))?;
        let aux = match fs::read(dir.join(AUX_FILE)) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(provider_err(cn, format!("{AUX_FILE}: {e}"))),
        };

        Ok(CertMaterial {
            common_name: meta.common_name.unwrap_or_else(|| cn.to_owned()),
            not_after: meta.not_after,
            serial: meta.serial,
            cert_pem: read(&dir.join(CERT_FILE), cn)?,
            key_pem: SecretString::from(read(&dir.join(KEY_FILE), cn)?),
            aux,
            dns_names: meta.dns_names,
            ip_addresses: meta.ip_addresses,
        })
    }

    fn list(&self, role: CertRole) -> Result<Vec<CertMaterial>> {
        let dir = self.root.join(format!("{role}s"));
        let listing = match fs::read_dir(&dir) {
            Ok(listing) => listing,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(%role, "no certificates exported for role");
                return Ok(Vec::new());
            }
            Err(e) => return Err(provider_err(certificate_kind(role), e.to_string())),
        };

        let mut certs = Vec::new();
        for entry in listing {
            let Ok(entry) = entry else { continue };
            let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
                continue;
            };
            if name.starts_with('.') {
                continue;
            }
            match self.find(role, &name) {
                Ok(cert) => certs.push(cert),
                Err(e) => {
                    debug!(identity = %name, %role, error = %e, "skipping unreadable certificate");
                }
            }
        }
        certs.sort_by(|a, b| a.common_name.cmp(&b.common_name));
        Ok(certs)
    }

    fn ca_pem(&self) -> Result<String> {
        fs::read_to_string(self.root.join(CA_FILE)).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => CoreError::not_found("CA certificate", CA_FILE),
            _ => provider_err("CA", e.to_string()),
        })
    }
}

fn certificate_kind(role: CertRole) -> &'static str {
    match role {
        CertRole::Client => "client certificate",
        CertRole::Server => "server certificate",
    }
}

/// Read one file of an identity, naming the file but not its path.
fn read(path: &Path, cn: &str) -> Result<String> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_owned();
    fs::read_to_string(path).map_err(|e| provider_err(cn, format!("{name}: {e}")))
}

fn provider_err(identity: &str, reason: String) -> CoreError {
    CoreError::Provider {
        identity: identity.into(),
        reason,
    }
}

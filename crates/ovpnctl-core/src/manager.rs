// ── VpnManager ──
//
// Facade over the CCD store, the certificate provider and the export
// pipeline. Every call runs to completion on the calling thread; the
// only shared state is the store directory.

use std::collections::BTreeMap;
use std::net::Ipv4Addr;

use tracing::{info, warn};

use crate::ccd::{Ccd, CcdScan};
use crate::config::ManagerConfig;
use crate::error::{CoreError, Result};
use crate::export::{self, View};
use crate::model::{CertMaterial, CertRole, ClientBundle, ClientRecord};
use crate::provider::{CertificateProvider, FsProvider};
use crate::subnet::Subnet;

pub struct VpnManager<P> {
    ccd: Ccd,
    provider: P,
    subnet: Subnet,
    server_name: String,
    client_template: String,
    server_template: String,
}

impl VpnManager<FsProvider> {
    /// Manager reading certificate material from `config.pki_dir`.
    pub fn from_config(config: ManagerConfig) -> Self {
        let provider = FsProvider::new(config.pki_dir.clone());
        Self::new(config, provider)
    }
}

impl<P: CertificateProvider> VpnManager<P> {
    pub fn new(config: ManagerConfig, provider: P) -> Self {
        Self {
            ccd: Ccd::new(config.ccd_dir, config.vpn_subnet.to_string()),
            provider,
            subnet: config.vpn_subnet,
            server_name: config.server_name,
            client_template: config.client_template,
            server_template: config.server_template,
        }
    }

    pub fn ccd(&self) -> &Ccd {
        &self.ccd
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn subnet(&self) -> &Subnet {
        &self.subnet
    }

    pub fn server_name(&self) -> &str {
        &self.server_name
    }

    // ── Addresses ────────────────────────────────────────────────────

    /// The identity's existing address, or a freshly allocated one.
    ///
    /// Only a missing directive triggers allocation; a malformed one is
    /// surfaced rather than silently replaced.
    pub fn ensure_ip(&self, cn: &str) -> Result<Ipv4Addr> {
        self.ccd.ensure_static_ip(cn)
    }

    pub fn assign_ip(&self, cn: &str, ip: Ipv4Addr) -> Result<()> {
        if !self.subnet.contains(ip) {
            warn!(
                identity = cn,
                %ip,
                subnet = %self.subnet,
                "assigning address outside the VPN subnet"
            );
        }
        self.ccd.write_static_ip(cn, ip)
    }

    pub fn ip_map(&self) -> Result<BTreeMap<String, Ipv4Addr>> {
        self.ccd.current_ip_map()
    }

    pub fn scan(&self) -> Result<CcdScan> {
        self.ccd.scan()
    }

    // ── Clients ──────────────────────────────────────────────────────

    /// Give `cn` an address (reusing any existing one) and render its config.
    pub fn provision_client(&self, cn: &str) -> Result<ClientBundle> {
        let cert = self.client_material(cn)?;
        let ip = self.ensure_ip(cn)?;
        let config = self.render_client(&cert, Some(ip))?;
        info!(identity = cn, %ip, "provisioned client");

        Ok(ClientBundle {
            record: ClientRecord::new(&cert, Some(ip)),
            config,
        })
    }

    /// Every client certificate the CA has issued, with its address if any.
    pub fn clients(&self) -> Result<Vec<ClientRecord>> {
        let ips = self.ccd.current_ip_map()?;
        Ok(self
            .provider
            .list(CertRole::Client)?
            .iter()
            .map(|cert| ClientRecord::new(cert, ips.get(&cert.common_name).copied()))
            .collect())
    }

    pub fn client(&self, cn: &str) -> Result<ClientRecord> {
        let cert = self.client_material(cn)?;
        let ip = self.optional_ip(cn)?;
        Ok(ClientRecord::new(&cert, ip))
    }

    pub fn client_config(&self, cn: &str) -> Result<String> {
        let cert = self.client_material(cn)?;
        let ip = self.optional_ip(cn)?;
        self.render_client(&cert, ip)
    }

    /// Release the client's address. Revocation belongs to the CA.
    pub fn remove_client(&self, cn: &str) -> Result<()> {
        self.ccd.delete(cn)
    }

    // ── Server ───────────────────────────────────────────────────────

    pub fn server_config(&self) -> Result<String> {
        let server = self.provider.find_server(&self.server_name)?;
        let ca = self.provider.ca_pem()?;
        let view = View::server(&server, &ca)?.with_subnet(&self.subnet);
        export::render(&self.server_template, &view)
    }

    // ── Private helpers ──────────────────────────────────────────────

    fn client_material(&self, cn: &str) -> Result<CertMaterial> {
        let cert = self.provider.find_client(cn)?;
        if cert.common_name != cn {
            return Err(CoreError::IdentityMismatch {
                requested: cn.into(),
                found: cert.common_name,
            });
        }
        Ok(cert)
    }

    fn optional_ip(&self, cn: &str) -> Result<Option<Ipv4Addr>> {
        match self.ccd.read_ip(cn) {
            Ok(ip) => Ok(Some(ip)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Clients still get a config when the server certificate is missing,
    /// with default network parameters.
    fn server_material(&self) -> Result<Option<CertMaterial>> {
        match self.provider.find_server(&self.server_name) {
            Ok(server) => Ok(Some(server)),
            Err(e) if e.is_not_found() => {
                warn!(
                    server = %self.server_name,
                    "server certificate not found, using default network parameters"
                );
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn render_client(&self, cert: &CertMaterial, ip: Option<Ipv4Addr>) -> Result<String> {
        let server = self.server_material()?;
        let ca = self.provider.ca_pem()?;
        let mut view = View::client(cert, server.as_ref(), &ca)?.with_subnet(&self.subnet);
        if let Some(ip) = ip {
            view = view.with_address(ip);
        }
        export::render(&self.client_template, &view)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use secrecy::SecretString;
    use tempfile::TempDir;

    use super::*;
    use crate::export::ServerData;

    #[derive(Default)]
    struct MemoryProvider {
        certs: HashMap<(CertRole, String), (String, Vec<u8>)>,
    }

    impl MemoryProvider {
        fn with(mut self, role: CertRole, cn: &str, subject: &str, aux: Vec<u8>) -> Self {
            self.certs.insert((role, cn.into()), (subject.into(), aux));
            self
        }
    }

    impl CertificateProvider for MemoryProvider {
        fn find(&self, role: CertRole, cn: &str) -> Result<CertMaterial> {
            let (subject, aux) = self
                .certs
                .get(&(role, cn.to_owned()))
                .ok_or_else(|| CoreError::not_found("certificate", cn))?;
            Ok(CertMaterial {
                common_name: subject.clone(),
                not_after: Utc.with_ymd_and_hms(2035, 1, 1, 0, 0, 0).unwrap(),
                serial: "0x10".into(),
                cert_pem: format!("CERT {subject}\n"),
                key_pem: SecretString::from(format!("KEY {subject}\n")),
                aux: aux.clone(),
                dns_names: vec!["vpn.example.com".into()],
                ip_addresses: Vec::new(),
            })
        }

        fn list(&self, role: CertRole) -> Result<Vec<CertMaterial>> {
            let mut names: Vec<_> = self
                .certs
                .keys()
                .filter(|(r, _)| *r == role)
                .map(|(_, cn)| cn.clone())
                .collect();
            names.sort();
            names.iter().map(|cn| self.find(role, cn)).collect()
        }

        fn ca_pem(&self) -> Result<String> {
            Ok("CA\n".into())
        }
    }

    fn manager(provider: MemoryProvider) -> (TempDir, VpnManager<MemoryProvider>) {
        let dir = tempfile::tempdir().unwrap();
        let config = ManagerConfig::new(
            dir.path(),
            "10.43.0.0/29".parse().unwrap(),
            "vpn.example.com",
            "/nonexistent",
        );
        (dir, VpnManager::new(config, provider))
    }

    fn standard_provider() -> MemoryProvider {
        let aux = ServerData {
            port: 1195,
            tls_crypt: Vec::new(),
        }
        .encode()
        .unwrap();
        MemoryProvider::default()
            .with(CertRole::Server, "vpn.example.com", "vpn.example.com", aux)
            .with(CertRole::Client, "alice", "alice", Vec::new())
            .with(CertRole::Client, "bob", "bob", Vec::new())
            .with(CertRole::Client, "mallory", "eve", Vec::new())
    }

    #[test]
    fn provisioning_allocates_once() {
        let (_dir, mgr) = manager(standard_provider());

        let first = mgr.provision_client("alice").unwrap();
        assert_eq!(first.record.ip, Some(Ipv4Addr::new(10, 43, 0, 2)));
        assert!(first.config.contains("remote vpn.example.com 1195"));
        assert!(first.config.contains("# Static address: 10.43.0.2"));

        let again = mgr.provision_client("alice").unwrap();
        assert_eq!(again.record.ip, first.record.ip);

        let bob = mgr.provision_client("bob").unwrap();
        assert_eq!(bob.record.ip, Some(Ipv4Addr::new(10, 43, 0, 3)));
    }

    #[test]
    fn unknown_client_gets_no_address() {
        let (_dir, mgr) = manager(standard_provider());
        assert!(mgr.provision_client("ghost").unwrap_err().is_not_found());
        assert!(mgr.ip_map().unwrap().is_empty());
    }

    #[test]
    fn subject_mismatch_is_rejected() {
        let (_dir, mgr) = manager(standard_provider());
        let err = mgr.client("mallory").unwrap_err();
        assert!(matches!(err, CoreError::IdentityMismatch { ref found, .. } if found == "eve"));
    }

    #[test]
    fn malformed_directive_blocks_provisioning() {
        let (dir, mgr) = manager(standard_provider());
        std::fs::write(dir.path().join("alice"), "garbage").unwrap();
        assert!(matches!(
            mgr.provision_client("alice").unwrap_err(),
            CoreError::Parse { .. }
        ));
    }

    #[test]
    fn client_record_reports_address_when_present() {
        let (_dir, mgr) = manager(standard_provider());
        assert_eq!(mgr.client("bob").unwrap().ip, None);

        mgr.assign_ip("bob", Ipv4Addr::new(10, 43, 0, 6)).unwrap();
        let record = mgr.client("bob").unwrap();
        assert_eq!(record.ip, Some(Ipv4Addr::new(10, 43, 0, 6)));
        assert_eq!(record.serial, "0x10");
        assert!(!record.expired);
    }

    #[test]
    fn missing_server_certificate_falls_back_to_defaults() {
        let provider =
            MemoryProvider::default().with(CertRole::Client, "alice", "alice", Vec::new());
        let (_dir, mgr) = manager(provider);

        let config = mgr.client_config("alice").unwrap();
        assert!(config.contains("remote 0.0.0.0 1194"));
        assert!(mgr.server_config().unwrap_err().is_not_found());
    }

    #[test]
    fn corrupt_server_data_fails_client_config() {
        let provider = MemoryProvider::default()
            .with(CertRole::Server, "vpn.example.com", "vpn.example.com", vec![7, 7])
            .with(CertRole::Client, "alice", "alice", Vec::new());
        let (_dir, mgr) = manager(provider);

        assert!(matches!(
            mgr.provision_client("alice").unwrap_err(),
            CoreError::Decode { .. }
        ));
    }

    #[test]
    fn server_config_includes_network() {
        let (_dir, mgr) = manager(standard_provider());
        let config = mgr.server_config().unwrap();
        assert!(config.contains("port 1195\n"));
        assert!(config.contains("server 10.43.0.0 255.255.255.248\n"));
    }

    #[test]
    fn removal_releases_the_address() {
        let (_dir, mgr) = manager(standard_provider());
        mgr.provision_client("alice").unwrap();
        mgr.remove_client("alice").unwrap();
        mgr.remove_client("alice").unwrap();
        assert!(mgr.ip_map().unwrap().is_empty());
    }

    #[test]
    fn client_listing_joins_addresses() {
        let (_dir, mgr) = manager(standard_provider());
        mgr.provision_client("bob").unwrap();

        let clients = mgr.clients().unwrap();
        let summary: Vec<_> = clients
            .iter()
            .map(|c| (c.common_name.as_str(), c.ip))
            .collect();
        assert_eq!(
            summary,
            [
                ("alice", None),
                ("bob", Some(Ipv4Addr::new(10, 43, 0, 2))),
                ("eve", None),
            ]
        );
    }

    #[test]
    fn concurrent_provisioning_agrees_on_one_address() {
        let (_dir, mgr) = manager(standard_provider());
        let shared = &mgr;
        let records: Vec<_> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..4)
                .map(move |_| {
                    s.spawn(move || shared.provision_client("alice").unwrap().record.ip)
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let on_disk = mgr.ccd().read_ip("alice").unwrap();
        assert!(records.iter().all(|ip| *ip == Some(on_disk)));
        assert_eq!(mgr.ip_map().unwrap().len(), 1);
    }
}

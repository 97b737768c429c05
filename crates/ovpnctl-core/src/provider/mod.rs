// ── Certificate material providers ──
//
// The certificate authority is an external collaborator. The core only
// asks it for material by common name and for the CA chain.

mod fs;

pub use fs::FsProvider;

use crate::error::Result;
use crate::model::{CertMaterial, CertRole};

/// Read-only access to issued certificates.
pub trait CertificateProvider {
    /// Material for `cn` in the given role, or `CoreError::NotFound`.
    fn find(&self, role: CertRole, cn: &str) -> Result<CertMaterial>;

    /// Every readable certificate in `role`, ordered by common name.
    fn list(&self, role: CertRole) -> Result<Vec<CertMaterial>>;

    /// PEM-encoded CA chain.
    fn ca_pem(&self) -> Result<String>;

    fn find_client(&self, cn: &str) -> Result<CertMaterial> {
        self.find(CertRole::Client, cn)
    }

    fn find_server(&self, cn: &str) -> Result<CertMaterial> {
        self.find(CertRole::Server, cn)
    }
}

impl<P: CertificateProvider + ?Sized> CertificateProvider for &P {
    fn find(&self, role: CertRole, cn: &str) -> Result<CertMaterial> {
        (**self).find(role, cn)
    }

    fn list(&self, role: CertRole) -> Result<Vec<CertMaterial>> {
        (**self).list(role)
    }

    fn ca_pem(&self) -> Result<String> {
        (**self).ca_pem()
    }
}

// ── Domain model ──

mod cert;

pub use cert::{CertMaterial, CertRole, ClientBundle, ClientRecord};

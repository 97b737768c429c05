// ── Core error types ──
//
// User-facing errors from ovpnctl-core. Messages name the failing
// operation and the identity involved, never a file-system path or raw
// auxiliary bytes, so they can cross a request boundary unchanged.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Lookup errors ────────────────────────────────────────────────
    #[error("{kind} not found: {identity}")]
    NotFound { kind: &'static str, identity: String },

    #[error("Certificate for '{requested}' carries common name '{found}'")]
    IdentityMismatch { requested: String, found: String },

    #[error("Invalid identity name '{identity}': {reason}")]
    InvalidIdentity { identity: String, reason: String },

    // ── Allocation errors ────────────────────────────────────────────
    #[error("Malformed directive for {identity}: {reason}")]
    Parse { identity: String, reason: String },

    #[error("No free address left in subnet {subnet}")]
    Exhausted { subnet: String },

    #[error("Invalid VPN subnet '{subnet}': {reason}")]
    Subnet { subnet: String, reason: String },

    // ── Certificate metadata errors ──────────────────────────────────
    #[error("Cannot decode server data: {reason}")]
    Decode { reason: String },

    #[error("Cannot format tls-crypt key: {reason}")]
    Format { reason: String },

    #[error("Cannot render template: {reason}")]
    Template { reason: String },

    // ── I/O errors ───────────────────────────────────────────────────
    #[error("Storage error while accessing {identity}: {source}")]
    Storage {
        identity: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Certificate provider error for {identity}: {reason}")]
    Provider { identity: String, reason: String },
}

impl CoreError {
    pub(crate) fn not_found(kind: &'static str, identity: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            identity: identity.into(),
        }
    }

    pub(crate) fn storage(identity: impl Into<String>, source: std::io::Error) -> Self {
        Self::Storage {
            identity: identity.into(),
            source,
        }
    }

    /// Whether the error means "nothing recorded for this identity yet".
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

pub type Result<T, E = CoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_do_not_leak_paths() {
        let err = CoreError::storage(
            "alice",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "permission denied"),
        );
        let msg = err.to_string();
        assert!(msg.contains("alice"));
        assert!(!msg.contains('/'));
    }

    #[test]
    fn not_found_is_recognised() {
        assert!(CoreError::not_found("directive", "bob").is_not_found());
        assert!(
            !CoreError::Exhausted {
                subnet: "10.0.0.0/30".into()
            }
            .is_not_found()
        );
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CoreError>();
    }
}

// ── Client configuration directory ──
//
// The directory is the allocation index: one directive file per
// identity, and the identity→address map is rebuilt by listing it.
// There is no in-memory copy that could drift from disk.

mod directive;
mod lock;

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::{self, Write};
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};

use crate::error::{CoreError, Result};
use crate::subnet::Subnet;

pub use directive::{Directive, DirectiveError, IFCONFIG_PUSH};
use lock::DirLock;

/// Label used in errors about the directory itself (never its path).
const STORE: &str = "ccd store";

/// Result of enumerating the store directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CcdScan {
    /// Identity → assigned address, for every parseable directive.
    pub entries: BTreeMap<String, Ipv4Addr>,
    /// Files that were present but not valid directives.
    pub skipped: usize,
}

/// Static address allocation over a CCD directory.
#[derive(Debug, Clone)]
pub struct Ccd {
    dir: PathBuf,
    vpn_subnet: String,
}

impl Ccd {
    /// `vpn_subnet` is kept as text and re-parsed on every allocation.
    pub fn new(dir: impl Into<PathBuf>, vpn_subnet: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            vpn_subnet: vpn_subnet.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn subnet(&self) -> Result<Subnet> {
        self.vpn_subnet.parse()
    }

    // ── Reads ────────────────────────────────────────────────────────

    /// Raw directive text for `cn`.
    pub fn read(&self, cn: &str) -> Result<String> {
        let path = self.path_for(cn)?;
        fs::read_to_string(&path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => CoreError::not_found("directive", cn),
            _ => CoreError::storage(cn, e),
        })
    }

    pub fn read_directive(&self, cn: &str) -> Result<Directive> {
        self.read(cn)?.parse().map_err(|e: DirectiveError| CoreError::Parse {
            identity: cn.into(),
            reason: e.to_string(),
        })
    }

    /// The address currently pushed to `cn`.
    pub fn read_ip(&self, cn: &str) -> Result<Ipv4Addr> {
        Ok(self.read_directive(cn)?.address)
    }

    /// Enumerate the directory, parsing every entry independently.
    ///
    /// Entries that are not valid directives are counted and skipped.
    /// Dot-files (in-flight temp files among them) are ignored outright.
    pub fn scan(&self) -> Result<CcdScan> {
        let mut scan = CcdScan::default();
        let listing = fs::read_dir(&self.dir).map_err(|e| CoreError::storage(STORE, e))?;

        for entry in listing {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    debug!(error = %e, "skipping unreadable ccd entry");
                    scan.skipped += 1;
                    continue;
                }
            };
            let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
                scan.skipped += 1;
                continue;
            };
            if name.starts_with('.') {
                continue;
            }
            match self.read_ip(&name) {
                Ok(ip) => {
                    scan.entries.insert(name, ip);
                }
                Err(e) => {
                    debug!(identity = %name, error = %e, "skipping non-directive ccd entry");
                    scan.skipped += 1;
                }
            }
        }

        debug!(
            entries = scan.entries.len(),
            skipped = scan.skipped,
            "scanned ccd store"
        );
        Ok(scan)
    }

    pub fn current_ips(&self) -> Result<BTreeSet<Ipv4Addr>> {
        Ok(self.scan()?.entries.into_values().collect())
    }

    pub fn current_ip_map(&self) -> Result<BTreeMap<String, Ipv4Addr>> {
        Ok(self.scan()?.entries)
    }

    /// Lowest usable address not held by any identity. Does not reserve it.
    pub fn next_available_ip(&self) -> Result<Ipv4Addr> {
        let subnet = self.subnet()?;
        let taken = self.current_ips()?;
        first_free(&subnet, &taken)
    }

    // ── Writes ───────────────────────────────────────────────────────

    /// Allocate the lowest free address in the subnet to `cn`.
    ///
    /// Overwrites any directive `cn` already has.
    pub fn write_next_static_ip(&self, cn: &str) -> Result<Ipv4Addr> {
        let path = self.path_for(cn)?;
        let lock = DirLock::for_dir(&self.dir);
        let _guard = lock.acquire();

        self.allocate_locked(&path, cn)
    }

    /// `cn`'s existing address, or the lowest free one if it has none.
    ///
    /// The check and the allocation run under one lock hold, so concurrent
    /// callers for the same identity all see the same address. A malformed
    /// directive is surfaced rather than replaced.
    pub fn ensure_static_ip(&self, cn: &str) -> Result<Ipv4Addr> {
        let path = self.path_for(cn)?;
        let lock = DirLock::for_dir(&self.dir);
        let _guard = lock.acquire();

        match self.read_ip(cn) {
            Ok(ip) => {
                debug!(identity = cn, %ip, "reusing static address");
                Ok(ip)
            }
            Err(e) if e.is_not_found() => self.allocate_locked(&path, cn),
            Err(e) => Err(e),
        }
    }

    /// Bind `cn` to `ip` verbatim.
    ///
    /// No collision or subnet-membership check is made; callers doing
    /// administrative overrides own that decision.
    pub fn write_static_ip(&self, cn: &str, ip: Ipv4Addr) -> Result<()> {
        let path = self.path_for(cn)?;
        let lock = DirLock::for_dir(&self.dir);
        let _guard = lock.acquire();

        let subnet = self.subnet()?;
        self.write_locked(&path, cn, Directive::new(ip, subnet.netmask()))?;

        info!(identity = cn, %ip, "assigned static address");
        Ok(())
    }

    /// Release `cn`'s address. Missing directives are not an error.
    pub fn delete(&self, cn: &str) -> Result<()> {
        let path = self.path_for(cn)?;
        let lock = DirLock::for_dir(&self.dir);
        let _guard = lock.acquire();

        match fs::remove_file(&path) {
            Ok(()) => {
                info!(identity = cn, "released static address");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(identity = cn, "no directive to delete");
                Ok(())
            }
            Err(e) => Err(CoreError::storage(cn, e)),
        }
    }

    // ── Private helpers ──────────────────────────────────────────────

    fn path_for(&self, cn: &str) -> Result<PathBuf> {
        validate_identity(cn)?;
        Ok(self.dir.join(cn))
    }

    /// First-fit allocation. Caller must hold the directory lock.
    fn allocate_locked(&self, path: &Path, cn: &str) -> Result<Ipv4Addr> {
        let subnet = self.subnet()?;
        let taken = self.current_ips()?;
        let ip = first_free(&subnet, &taken)?;
        self.write_locked(path, cn, Directive::new(ip, subnet.netmask()))?;

        info!(identity = cn, %ip, "allocated static address");
        Ok(ip)
    }

    /// Write-to-temp-then-rename, so readers never see a partial line.
    /// Caller must hold the directory lock.
    fn write_locked(&self, path: &Path, cn: &str, directive: Directive) -> Result<()> {
        let mut tmp = tempfile::Builder::new()
            .prefix(".ccd-")
            .tempfile_in(&self.dir)
            .map_err(|e| CoreError::storage(cn, e))?;

        tmp.write_all(directive.to_string().as_bytes())
            .map_err(|e| CoreError::storage(cn, e))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tmp.as_file()
                .set_permissions(fs::Permissions::from_mode(0o644))
                .map_err(|e| CoreError::storage(cn, e))?;
        }

        tmp.persist(path).map_err(|e| CoreError::storage(cn, e.error))?;
        Ok(())
    }
}

/// First-fit over the usable range, ascending.
fn first_free(subnet: &Subnet, taken: &BTreeSet<Ipv4Addr>) -> Result<Ipv4Addr> {
    subnet
        .usable_hosts()
        .find(|ip| !taken.contains(ip))
        .ok_or_else(|| CoreError::Exhausted {
            subnet: subnet.to_string(),
        })
}

/// Identities name files directly inside the store directory.
pub fn validate_identity(cn: &str) -> Result<()> {
    let reason = if cn.is_empty() {
        "must not be empty"
    } else if cn.starts_with('.') {
        "must not start with '.'"
    } else if cn.contains(['/', '\\', '\0']) {
        "must not contain path separators"
    } else {
        return Ok(());
    };
    Err(CoreError::InvalidIdentity {
        identity: cn.into(),
        reason: reason.into(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::{Arc, Barrier};
    use std::thread;

    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use super::*;

    fn store(subnet: &str) -> (TempDir, Ccd) {
        let dir = tempfile::tempdir().unwrap();
        let ccd = Ccd::new(dir.path(), subnet);
        (dir, ccd)
    }

    fn ip(s: &str) -> Ipv4Addr {
        s.parse().unwrap()
    }

    #[test]
    fn read_missing_identity_is_not_found() {
        let (_dir, ccd) = store("10.43.0.0/16");
        assert!(ccd.read("ghost").unwrap_err().is_not_found());
        assert!(ccd.read_ip("ghost").unwrap_err().is_not_found());
    }

    #[test]
    fn explicit_assignment_round_trips() {
        let (dir, ccd) = store("10.43.0.0/16");
        ccd.write_static_ip("alice", ip("10.43.7.9")).unwrap();

        assert_eq!(ccd.read_ip("alice").unwrap(), ip("10.43.7.9"));
        let on_disk = fs::read_to_string(dir.path().join("alice")).unwrap();
        assert_eq!(on_disk, "ifconfig-push 10.43.7.9 255.255.0.0");
        assert_eq!(ccd.read("alice").unwrap(), on_disk);
    }

    #[test]
    fn explicit_assignment_is_not_checked_against_subnet() {
        let (_dir, ccd) = store("10.43.0.0/29");
        ccd.write_static_ip("ops", ip("192.168.1.1")).unwrap();
        assert_eq!(ccd.read_ip("ops").unwrap(), ip("192.168.1.1"));
    }

    #[test]
    fn malformed_directive_is_parse_error() {
        let (dir, ccd) = store("10.43.0.0/16");
        fs::write(dir.path().join("broken"), "ifconfig-push").unwrap();
        let err = ccd.read_ip("broken").unwrap_err();
        assert!(matches!(err, CoreError::Parse { ref identity, .. } if identity == "broken"));
    }

    #[test]
    fn allocation_is_first_fit() {
        let (_dir, ccd) = store("10.43.0.0/29");
        ccd.write_static_ip("x", ip("10.43.0.2")).unwrap();
        ccd.write_static_ip("y", ip("10.43.0.4")).unwrap();

        assert_eq!(ccd.write_next_static_ip("z").unwrap(), ip("10.43.0.3"));
        assert_eq!(ccd.write_next_static_ip("w").unwrap(), ip("10.43.0.5"));
    }

    #[test]
    fn freed_address_is_reused_first() {
        let (_dir, ccd) = store("10.43.0.0/29");
        for cn in ["a", "b", "c"] {
            ccd.write_next_static_ip(cn).unwrap();
        }
        ccd.delete("b").unwrap();
        assert_eq!(ccd.write_next_static_ip("d").unwrap(), ip("10.43.0.3"));
    }

    #[test]
    fn exhaustion_after_every_usable_address() {
        let (_dir, ccd) = store("10.9.0.0/30");
        assert_eq!(ccd.write_next_static_ip("only").unwrap(), ip("10.9.0.2"));
        let err = ccd.write_next_static_ip("late").unwrap_err();
        assert!(matches!(err, CoreError::Exhausted { .. }));
        assert!(ccd.read("late").unwrap_err().is_not_found());
    }

    #[test]
    fn malformed_subnet_fails_allocation() {
        let (_dir, ccd) = store("10.43.0.0/40");
        assert!(matches!(
            ccd.write_next_static_ip("a").unwrap_err(),
            CoreError::Subnet { .. }
        ));
        assert!(matches!(
            ccd.write_static_ip("a", ip("10.43.0.2")).unwrap_err(),
            CoreError::Subnet { .. }
        ));
    }

    #[test]
    fn delete_is_idempotent() {
        let (_dir, ccd) = store("10.43.0.0/16");
        ccd.write_next_static_ip("bob").unwrap();
        ccd.delete("bob").unwrap();
        ccd.delete("bob").unwrap();
        assert!(ccd.read("bob").unwrap_err().is_not_found());
    }

    #[test]
    fn scan_skips_stray_files() {
        let (dir, ccd) = store("10.43.0.0/16");
        ccd.write_static_ip("alice", ip("10.43.0.2")).unwrap();
        ccd.write_static_ip("bob", ip("10.43.0.3")).unwrap();
        fs::write(dir.path().join("README"), "notes").unwrap();
        fs::write(dir.path().join(".ccd-partial"), "ifconfig-push 10.43.0.9 x").unwrap();
        fs::create_dir(dir.path().join("archive")).unwrap();

        let scan = ccd.scan().unwrap();
        assert_eq!(
            scan.entries,
            BTreeMap::from([
                ("alice".to_owned(), ip("10.43.0.2")),
                ("bob".to_owned(), ip("10.43.0.3")),
            ])
        );
        assert_eq!(scan.skipped, 2);
        assert_eq!(
            ccd.current_ips().unwrap(),
            BTreeSet::from([ip("10.43.0.2"), ip("10.43.0.3")])
        );
        assert_eq!(ccd.current_ip_map().unwrap(), scan.entries);
    }

    #[test]
    fn stray_files_do_not_block_allocation() {
        let (dir, ccd) = store("10.43.0.0/29");
        fs::write(dir.path().join("garbage"), "\u{0}\u{1}").unwrap();
        assert_eq!(ccd.write_next_static_ip("a").unwrap(), ip("10.43.0.2"));
    }

    #[test]
    fn missing_store_directory_is_surfaced() {
        let dir = tempfile::tempdir().unwrap();
        let ccd = Ccd::new(dir.path().join("absent"), "10.43.0.0/16");
        let err = ccd.scan().unwrap_err();
        assert!(matches!(err, CoreError::Storage { .. }));
        assert!(!err.to_string().contains("absent"));
    }

    #[test]
    fn next_available_does_not_reserve() {
        let (_dir, ccd) = store("10.43.0.0/29");
        assert_eq!(ccd.next_available_ip().unwrap(), ip("10.43.0.2"));
        assert_eq!(ccd.next_available_ip().unwrap(), ip("10.43.0.2"));
        assert!(ccd.current_ips().unwrap().is_empty());
    }

    #[test]
    fn identities_cannot_escape_the_directory() {
        let (_dir, ccd) = store("10.43.0.0/16");
        for bad in ["", ".hidden", "../etc/passwd", "a/b", "a\\b"] {
            assert!(
                matches!(
                    ccd.write_next_static_ip(bad).unwrap_err(),
                    CoreError::InvalidIdentity { .. }
                ),
                "{bad:?}"
            );
        }
    }

    #[test]
    fn concurrent_allocations_never_collide() {
        let (_dir, ccd) = store("10.43.0.0/24");
        let ccd = Arc::new(ccd);

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let ccd = Arc::clone(&ccd);
                thread::spawn(move || ccd.write_next_static_ip(&format!("client{i}")).unwrap())
            })
            .collect();
        let ips: BTreeSet<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(ips.len(), 16);
        assert_eq!(ccd.current_ips().unwrap(), ips);
    }

    #[test]
    fn ensure_keeps_existing_address() {
        let (_dir, ccd) = store("10.43.0.0/29");
        ccd.write_static_ip("alice", ip("10.43.0.5")).unwrap();
        assert_eq!(ccd.ensure_static_ip("alice").unwrap(), ip("10.43.0.5"));
        assert_eq!(ccd.ensure_static_ip("bob").unwrap(), ip("10.43.0.2"));
        assert_eq!(ccd.ensure_static_ip("bob").unwrap(), ip("10.43.0.2"));
    }

    #[test]
    fn ensure_surfaces_malformed_directive() {
        let (dir, ccd) = store("10.43.0.0/29");
        fs::write(dir.path().join("alice"), "garbage").unwrap();
        assert!(matches!(
            ccd.ensure_static_ip("alice").unwrap_err(),
            CoreError::Parse { .. }
        ));
        assert_eq!(fs::read_to_string(dir.path().join("alice")).unwrap(), "garbage");
    }

    #[test]
    fn concurrent_ensure_for_one_identity_agrees() {
        for _ in 0..50 {
            let (_dir, ccd) = store("10.43.0.0/24");
            let ccd = Arc::new(ccd);
            let barrier = Arc::new(Barrier::new(4));

            let handles: Vec<_> = (0..4)
                .map(|_| {
                    let ccd = Arc::clone(&ccd);
                    let barrier = Arc::clone(&barrier);
                    thread::spawn(move || {
                        barrier.wait();
                        ccd.ensure_static_ip("alice").unwrap()
                    })
                })
                .collect();
            let ips: BTreeSet<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

            assert_eq!(ips, BTreeSet::from([ip("10.43.0.2")]));
            assert_eq!(ccd.read_ip("alice").unwrap(), ip("10.43.0.2"));
            assert_eq!(ccd.current_ips().unwrap().len(), 1);
        }
    }
}

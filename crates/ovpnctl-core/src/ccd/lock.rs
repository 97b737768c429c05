// ── Per-directory write locks ──
//
// Allocation is list-then-pick-then-write, which races across callers.
// Every mutation of a store directory runs under the mutex registered
// for that directory. Readers never take it.

use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock, Mutex, MutexGuard, PoisonError};

use dashmap::DashMap;

static LOCKS: LazyLock<DashMap<PathBuf, Arc<Mutex<()>>>> = LazyLock::new(DashMap::new);

/// Handle on the process-wide writer lock of one store directory.
pub(crate) struct DirLock(Arc<Mutex<()>>);

impl DirLock {
    /// Look up (or register) the lock for `dir`.
    ///
    /// Keys are canonicalized when possible so two spellings of the same
    /// directory share one lock.
    pub(crate) fn for_dir(dir: &Path) -> Self {
        let key = dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf());
        let lock = LOCKS.entry(key).or_default().clone();
        Self(lock)
    }

    /// Block until this process holds the directory.
    ///
    /// The guarded data is `()`, so a poisoned lock carries no broken state.
    pub(crate) fn acquire(&self) -> MutexGuard<'_, ()> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn same_directory_shares_one_lock() {
        let dir = tempfile::tempdir().unwrap();
        let a = DirLock::for_dir(dir.path());
        let b = DirLock::for_dir(&dir.path().join("."));
        assert!(Arc::ptr_eq(&a.0, &b.0));
    }

    #[test]
    fn distinct_directories_do_not_contend() {
        let one = tempfile::tempdir().unwrap();
        let two = tempfile::tempdir().unwrap();
        let a = DirLock::for_dir(one.path());
        let b = DirLock::for_dir(two.path());
        let _held = a.acquire();
        assert!(b.0.try_lock().is_ok());
    }
}

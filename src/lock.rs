//! Poison-recovering lock guards.
//!
//! A panic while holding a cache lock must not take the whole coordinator
//! down with it; the cached state is reconstructible, so recovery is
//! always safe here.

use std::sync::{Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::warn;

fn report_recovery(target: &'static str, op: &'static str, lock_kind: &'static str) {
    warn!(
        target_module = target,
        op,
        lock_kind,
        "poisoned lock recovered; state may be stale after a panic in another thread"
    );
}

pub(crate) fn rw_read<'a, T>(
    lock: &'a RwLock<T>,
    target: &'static str,
    op: &'static str,
) -> RwLockReadGuard<'a, T> {
    lock.read().unwrap_or_else(|poisoned| {
        report_recovery(target, op, "rwlock.read");
        poisoned.into_inner()
    })
}

pub(crate) fn rw_write<'a, T>(
    lock: &'a RwLock<T>,
    target: &'static str,
    op: &'static str,
) -> RwLockWriteGuard<'a, T> {
    lock.write().unwrap_or_else(|poisoned| {
        report_recovery(target, op, "rwlock.write");
        poisoned.into_inner()
    })
}

pub(crate) fn mutex_lock<'a, T>(
    lock: &'a Mutex<T>,
    target: &'static str,
    op: &'static str,
) -> MutexGuard<'a, T> {
    lock.lock().unwrap_or_else(|poisoned| {
        report_recovery(target, op, "mutex.lock");
        poisoned.into_inner()
    })
}

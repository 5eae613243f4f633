//! Re-entrant collection write locks.

use crate::error::{StoreError, StoreResult};
use crate::path::ResourcePath;
use crate::types::TxnId;
use parking_lot::{Condvar, Mutex};
use std::collections::HashMap;
use std::time::{Duration, Instant};

#[derive(Debug)]
struct Holder {
    txn: TxnId,
    depth: u32,
}

/// Write locks keyed by collection path.
///
/// A lock is owned by one transaction at a time and may be re-acquired by
/// its owner; it is free again once every acquisition has been released.
#[derive(Debug)]
pub(crate) struct LockTable {
    held: Mutex<HashMap<ResourcePath, Holder>>,
    released: Condvar,
    timeout: Duration,
}

impl LockTable {
    pub(crate) fn new(timeout: Duration) -> Self {
        Self {
            held: Mutex::new(HashMap::new()),
            released: Condvar::new(),
            timeout,
        }
    }

    /// Blocks until `txn` owns the lock on `path` or the timeout elapses.
    pub(crate) fn acquire(&self, path: &ResourcePath, txn: TxnId) -> StoreResult<()> {
        let deadline = Instant::now() + self.timeout;
        let mut held = self.held.lock();

        loop {
            match held.get_mut(path) {
                None => {
                    held.insert(path.clone(), Holder { txn, depth: 1 });
                    return Ok(());
                }
                Some(holder) if holder.txn == txn => {
                    holder.depth += 1;
                    return Ok(());
                }
                Some(_) => {
                    if self.released.wait_until(&mut held, deadline).timed_out() {
                        return Err(StoreError::LockTimeout {
                            path: path.to_string(),
                        });
                    }
                }
            }
        }
    }

    /// Releases one acquisition of `path` by `txn`.
    ///
    /// Returns false if `txn` did not hold the lock.
    pub(crate) fn release(&self, path: &ResourcePath, txn: TxnId) -> bool {
        let mut held = self.held.lock();
        let Some(holder) = held.get_mut(path) else {
            return false;
        };
        if holder.txn != txn {
            return false;
        }

        holder.depth -= 1;
        if holder.depth == 0 {
            held.remove(path);
            self.released.notify_all();
        }
        true
    }

    /// Drops every lock still held by `txn`, returning how many paths were freed.
    pub(crate) fn release_all(&self, txn: TxnId) -> usize {
        let mut held = self.held.lock();
        let before = held.len();
        held.retain(|_, holder| holder.txn != txn);
        let freed = before - held.len();
        if freed > 0 {
            self.released.notify_all();
        }
        freed
    }

    pub(crate) fn is_held_by(&self, path: &ResourcePath, txn: TxnId) -> bool {
        self.held
            .lock()
            .get(path)
            .is_some_and(|holder| holder.txn == txn)
    }

    pub(crate) fn held_count(&self) -> usize {
        self.held.lock().len()
    }
}

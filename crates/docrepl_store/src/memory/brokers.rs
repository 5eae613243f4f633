//! Bounded pool of broker sessions.

use crate::error::{StoreError, StoreResult};
use crate::types::{BrokerId, Subject};
use parking_lot::{Condvar, Mutex};
use std::collections::HashMap;
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
struct PoolState {
    next_id: u64,
    active: HashMap<BrokerId, Subject>,
}

/// Hands out at most `capacity` broker sessions at a time.
#[derive(Debug)]
pub(crate) struct BrokerPool {
    state: Mutex<PoolState>,
    returned: Condvar,
    capacity: usize,
    timeout: Duration,
}

impl BrokerPool {
    pub(crate) fn new(capacity: usize, timeout: Duration) -> Self {
        Self {
            state: Mutex::new(PoolState::default()),
            returned: Condvar::new(),
            capacity: capacity.max(1),
            timeout,
        }
    }

    pub(crate) fn acquire(&self, subject: &Subject) -> StoreResult<BrokerId> {
        let deadline = Instant::now() + self.timeout;
        let mut state = self.state.lock();

        while state.active.len() >= self.capacity {
            if self.returned.wait_until(&mut state, deadline).timed_out() {
                return Err(StoreError::BrokerPoolExhausted {
                    active: state.active.len(),
                    capacity: self.capacity,
                });
            }
        }

        state.next_id += 1;
        let id = BrokerId::new(state.next_id);
        state.active.insert(id, subject.clone());
        Ok(id)
    }

    pub(crate) fn release(&self, broker: BrokerId) -> bool {
        let removed = self.state.lock().active.remove(&broker).is_some();
        if removed {
            self.returned.notify_one();
        }
        removed
    }

    pub(crate) fn subject(&self, broker: BrokerId) -> Option<Subject> {
        self.state.lock().active.get(&broker).cloned()
    }

    pub(crate) fn active_count(&self) -> usize {
        self.state.lock().active.len()
    }
}

use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, warn};
use parking_lot::{Mutex, MutexGuard};

use crate::workbook::{Workbook, WorkbookError};

/// A lease outlives its holder by at most this long if the holder dies
/// without releasing it.
pub const LEASE_TTL: Duration = Duration::from_secs(30);

const LEASE_POLL: Duration = Duration::from_millis(20);

/// Serializes every read-modify-append of the order table.
///
/// Clones share the same in-process mutex. [`acquire_shared`] additionally
/// takes the store's lease on the table, which is what keeps a `serve`
/// process and a `scan` process from allocating the same order number.
/// Acquisition is bounded so a stuck holder turns into a visible error
/// instead of a hang.
///
/// [`acquire_shared`]: OrderTableLock::acquire_shared
#[derive(Debug, Clone, Default)]
pub struct OrderTableLock {
    inner: Arc<Mutex<()>>,
}

/// Held for the whole critical section; releases the lease on drop.
pub struct OrderTableGuard<'a> {
    lease: Option<Lease<'a>>,
    _local: MutexGuard<'a, ()>,
}

struct Lease<'a> {
    workbook: &'a dyn Workbook,
    table: &'a str,
    holder: String,
}

impl Drop for Lease<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.workbook.release_lease(self.table, &self.holder) {
            // Expires on its own after LEASE_TTL.
            warn!("Could not release lease on '{}': {}", self.table, e);
        }
    }
}

impl OrderTableGuard<'_> {
    pub fn holds_lease(&self) -> bool {
        self.lease.is_some()
    }
}

impl OrderTableLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// In-process only. Waits up to `timeout`; `None` when the lock stayed busy.
    pub fn acquire(&self, timeout: Duration) -> Option<OrderTableGuard<'_>> {
        self.inner.try_lock_for(timeout).map(|local| OrderTableGuard {
            lease: None,
            _local: local,
        })
    }

    /// Takes the in-process lock, then `workbook`'s lease on `table`, both
    /// within `timeout`. `Ok(None)` when either stayed busy.
    pub fn acquire_shared<'a>(
        &'a self,
        workbook: &'a dyn Workbook,
        table: &'a str,
        timeout: Duration,
    ) -> Result<Option<OrderTableGuard<'a>>, WorkbookError> {
        let deadline = Instant::now() + timeout;
        let Some(local) = self.inner.try_lock_until(deadline) else {
            return Ok(None);
        };

        let holder = uuid::Uuid::new_v4().to_string();
        loop {
            if workbook.try_lease(table, &holder, LEASE_TTL)? {
                debug!("Lease on '{}' taken by {}", table, holder);
                return Ok(Some(OrderTableGuard {
                    lease: Some(Lease {
                        workbook,
                        table,
                        holder,
                    }),
                    _local: local,
                }));
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            std::thread::sleep(LEASE_POLL.min(deadline - now));
        }
    }

    pub fn is_locked(&self) -> bool {
        self.inner.is_locked()
    }
}

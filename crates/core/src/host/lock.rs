//! Process-wide single-flight guard for the host application.
//!
//! The host is a single-instance, stateful external program: only one
//! headless render or interactive script may be in flight at a time.
//! [`HostLock::try_acquire`] fails fast with [`EngineError::Busy`] instead
//! of queuing, and the returned [`HostLockGuard`] releases the lock when
//! dropped, on every exit path.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use crate::error::EngineError;

static PROCESS_LOCK: OnceLock<HostLock> = OnceLock::new();

/// Busy/free flag shared by every handle cloned from it.
#[derive(Debug, Clone, Default)]
pub struct HostLock {
    busy: Arc<AtomicBool>,
}

impl HostLock {
    /// Create an independent lock. Production code uses [`HostLock::process`].
    pub fn new() -> Self {
        Self::default()
    }

    /// The lock shared by every host gate in this process.
    pub fn process() -> Self {
        PROCESS_LOCK.get_or_init(HostLock::new).clone()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Fail with [`EngineError::Busy`] if an invocation is in flight.
    pub fn ensure_free(&self) -> Result<(), EngineError> {
        if self.is_busy() {
            return Err(busy_error());
        }
        Ok(())
    }

    /// Mark the host busy, or fail immediately if it already is.
    pub fn try_acquire(&self) -> Result<HostLockGuard, EngineError> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| busy_error())?;
        Ok(HostLockGuard {
            busy: Arc::clone(&self.busy),
        })
    }
}

/// Holds the host for the duration of one invocation.
#[derive(Debug)]
pub struct HostLockGuard {
    busy: Arc<AtomicBool>,
}

impl Drop for HostLockGuard {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

fn busy_error() -> EngineError {
    EngineError::Busy("already running another instance of the host application".to_string())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

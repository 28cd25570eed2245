//! Shared state between the render loop, the network monitor and the
//! control API.
//!
//! Each cell is a `Mutex` around a small `Copy` value. Readers copy the value
//! out and release the lock immediately; writers swap the whole value. A
//! poisoned lock is recovered rather than propagated: the guarded value is
//! plain data, so a panic elsewhere cannot have left it half-written.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::monitor::NetworkStatus;
use crate::params::SimulationParameters;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Clone, Copy)]
struct Versioned {
    generation: u64,
    params: SimulationParameters,
}

/// Owner of the live parameter record.
///
/// Every [`replace`](Self::replace) bumps a generation counter so the render
/// loop can tell that the parameters changed and restart its clock.
#[derive(Debug)]
pub struct Coordinator {
    inner: Mutex<Versioned>,
}

impl Coordinator {
    pub fn new(initial: SimulationParameters) -> Self {
        Self {
            inner: Mutex::new(Versioned {
                generation: 0,
                params: initial,
            }),
        }
    }

    /// Latest committed parameter set.
    pub fn snapshot(&self) -> SimulationParameters {
        lock(&self.inner).params
    }

    /// Latest parameter set together with its generation.
    pub fn versioned(&self) -> (u64, SimulationParameters) {
        let v = *lock(&self.inner);
        (v.generation, v.params)
    }

    pub fn generation(&self) -> u64 {
        lock(&self.inner).generation
    }

    /// Swap in a new parameter set. Callers validate beforehand.
    pub fn replace(&self, params: SimulationParameters) {
        let mut inner = lock(&self.inner);
        inner.generation = inner.generation.wrapping_add(1);
        inner.params = params;
    }

    /// Derive the next record from the current one under the lock.
    ///
    /// On `Err` nothing changes. `f` must be cheap; it runs while the lock is
    /// held.
    pub fn try_update<E>(
        &self,
        f: impl FnOnce(&SimulationParameters) -> Result<SimulationParameters, E>,
    ) -> Result<SimulationParameters, E> {
        let mut inner = lock(&self.inner);
        let next = f(&inner.params)?;
        inner.generation = inner.generation.wrapping_add(1);
        inner.params = next;
        Ok(next)
    }
}

impl Default for Coordinator {
    fn default() -> Self {
        Self::new(SimulationParameters::default())
    }
}

/// Network status published by the monitor.
#[derive(Debug, Default)]
pub struct StatusCell {
    inner: Mutex<NetworkStatus>,
}

impl StatusCell {
    pub fn new(status: NetworkStatus) -> Self {
        Self {
            inner: Mutex::new(status),
        }
    }

    pub fn get(&self) -> NetworkStatus {
        *lock(&self.inner)
    }

    pub fn set(&self, status: NetworkStatus) {
        *lock(&self.inner) = status;
    }
}

/// Process-wide stop signal. Sleeping on it wakes immediately once triggered.
#[derive(Debug, Default)]
pub struct Shutdown {
    stopped: Mutex<bool>,
    cond: Condvar,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        *lock(&self.stopped) = true;
        self.cond.notify_all();
    }

    pub fn is_triggered(&self) -> bool {
        *lock(&self.stopped)
    }

    /// Sleep up to `timeout`. Returns `true` if shutdown was triggered.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let guard = lock(&self.stopped);
        let (guard, _) = self
            .cond
            .wait_timeout_while(guard, timeout, |stopped| !*stopped)
            .unwrap_or_else(PoisonError::into_inner);
        *guard
    }

    /// Block until shutdown is triggered.
    pub fn wait(&self) {
        let guard = lock(&self.stopped);
        let _guard = self
            .cond
            .wait_while(guard, |stopped| !*stopped)
            .unwrap_or_else(PoisonError::into_inner);
    }
}

// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Low-power wake handshake and the lock that serialises it.
// Author: Lukas Bower

//! Low-power wake coordination.
//!
//! When the RPU may be asleep, every RAM-class transaction runs inside a short
//! critical section: assert wake, spin until the status register reports the
//! RPU awake, then transact. The lock is a `spin::Mutex` so the section never
//! sleeps; [`PsLock`] clones share it with any data path that must serialise
//! against the same handshake.

use std::sync::Arc;

use log::{debug, warn};
use spin::{Mutex, MutexGuard};

use super::regs::PowerRegs;
use super::Bus;
use crate::error::{Result, RpuError};

#[derive(Debug, Default)]
struct PsState {
    wakes: u64,
}

/// Shareable handle to the power-save critical section.
#[derive(Debug, Clone, Default)]
pub struct PsLock {
    inner: Arc<Mutex<PsState>>,
}

/// Held for the duration of one woken transaction.
pub struct PsGuard<'a> {
    state: MutexGuard<'a, PsState>,
}

impl PsLock {
    /// Create an unshared lock.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter the critical section.
    pub fn lock(&self) -> PsGuard<'_> {
        PsGuard {
            state: self.inner.lock(),
        }
    }

    /// Number of completed wake handshakes.
    #[must_use]
    pub fn wakes(&self) -> u64 {
        self.inner.lock().wakes
    }
}

/// Power-save registers plus the spin bound for the wake handshake.
#[derive(Debug, Clone)]
pub struct PowerSave {
    regs: PowerRegs,
    spins: u32,
    lock: PsLock,
}

impl PowerSave {
    /// Build a handshake over `regs` that gives up after `spins` status reads.
    #[must_use]
    pub fn new(regs: PowerRegs, spins: u32, lock: PsLock) -> Self {
        Self { regs, spins, lock }
    }

    /// The shared lock handle.
    #[must_use]
    pub fn lock_handle(&self) -> &PsLock {
        &self.lock
    }

    /// Wake the RPU and run `op` while the critical section is held.
    pub fn with_awake<B, T>(
        &self,
        bus: &mut B,
        op: impl FnOnce(&mut B) -> Result<T>,
    ) -> Result<T>
    where
        B: Bus + ?Sized,
    {
        let mut guard = self.lock.lock();
        self.wake(bus)?;
        guard.state.wakes += 1;
        op(bus)
    }

    fn wake<B: Bus + ?Sized>(&self, bus: &mut B) -> Result<()> {
        bus.write_word(self.regs.ctrl, self.regs.wake)?;
        for spin in 0..self.spins {
            if bus.read_word(self.regs.status)? & self.regs.awake != 0 {
                if spin > 0 {
                    debug!("[rpu-ps] awake after {spin} spins");
                }
                return Ok(());
            }
            core::hint::spin_loop();
        }
        warn!("[rpu-ps] RPU did not wake within {} spins", self.spins);
        Err(RpuError::Timeout {
            what: "RPU wake",
            attempts: self.spins,
        })
    }
}

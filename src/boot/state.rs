// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Per-core boot state machine for one bring-up session.
// Author: Lukas Bower

use core::fmt;

use log::debug;

use crate::error::{Result, RpuError};
use crate::hal::Processor;

/// Boot progress of one core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CoreState {
    /// Nothing loaded this session.
    #[default]
    NotLoaded,
    /// Held in soft reset.
    Reset,
    /// Image in place (or ROM-resident image selected).
    Loaded,
    /// Launched; boot signature not confirmed.
    Booted,
    /// Boot signature confirmed.
    VerifiedRunning,
    /// A fatal step failed; terminal for the session.
    Failed,
}

impl CoreState {
    /// Whether `self -> to` is a legal step.
    #[must_use]
    pub fn can_become(self, to: CoreState) -> bool {
        use CoreState::*;
        match (self, to) {
            (Failed, _) => false,
            (_, Failed) => true,
            (_, Reset) => true,
            (NotLoaded | Reset, Loaded) => true,
            (Loaded, Booted) => true,
            (Booted, VerifiedRunning) => true,
            _ => false,
        }
    }
}

impl fmt::Display for CoreState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NotLoaded => "not-loaded",
            Self::Reset => "reset",
            Self::Loaded => "loaded",
            Self::Booted => "booted",
            Self::VerifiedRunning => "verified-running",
            Self::Failed => "failed",
        })
    }
}

/// States of both cores for one bring-up attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BootSession {
    states: [CoreState; 2],
}

impl BootSession {
    /// Fresh session with both cores `NotLoaded`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state of `processor`.
    #[must_use]
    pub fn state(&self, processor: Processor) -> CoreState {
        self.states[processor.index()]
    }

    /// True once any core has failed.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.states.contains(&CoreState::Failed)
    }

    /// Move `processor` to `to`, rejecting out-of-order steps.
    pub fn advance(&mut self, processor: Processor, to: CoreState) -> Result<()> {
        let slot = &mut self.states[processor.index()];
        if !slot.can_become(to) {
            return Err(RpuError::InvalidState {
                processor,
                from: *slot,
                to,
            });
        }
        debug!("[rpu-boot] {processor}: {} -> {to}", *slot);
        *slot = to;
        Ok(())
    }

    /// Select the ROM-resident image of `processor`.
    ///
    /// Pure ROM boot has no reset step, so this is legal from every state
    /// except `Failed`.
    pub fn select_rom(&mut self, processor: Processor) -> Result<()> {
        let slot = &mut self.states[processor.index()];
        if *slot == CoreState::Failed {
            return Err(RpuError::InvalidState {
                processor,
                from: CoreState::Failed,
                to: CoreState::Loaded,
            });
        }
        debug!("[rpu-boot] {processor}: {} -> {} (rom)", *slot, CoreState::Loaded);
        *slot = CoreState::Loaded;
        Ok(())
    }

    /// Mark `processor` failed.
    pub fn fail(&mut self, processor: Processor) {
        self.states[processor.index()] = CoreState::Failed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boot_requires_loaded_first() {
        let mut session = BootSession::new();
        assert!(session.advance(Processor::Lmac, CoreState::Booted).is_err());
        session.advance(Processor::Lmac, CoreState::Reset).unwrap();
        session.advance(Processor::Lmac, CoreState::Loaded).unwrap();
        session.advance(Processor::Lmac, CoreState::Booted).unwrap();
        session.advance(Processor::Lmac, CoreState::VerifiedRunning).unwrap();
        assert_eq!(session.state(Processor::Umac), CoreState::NotLoaded);
    }

    #[test]
    fn rom_selection_restarts_a_running_core() {
        let mut session = BootSession::new();
        for _ in 0..2 {
            session.select_rom(Processor::Lmac).unwrap();
            session.advance(Processor::Lmac, CoreState::Booted).unwrap();
            session.advance(Processor::Lmac, CoreState::VerifiedRunning).unwrap();
        }
        session.fail(Processor::Lmac);
        assert!(session.select_rom(Processor::Lmac).is_err());
    }

    #[test]
    fn failed_is_terminal() {
        let mut session = BootSession::new();
        session.fail(Processor::Umac);
        assert!(session.is_failed());
        assert_eq!(
            session.advance(Processor::Umac, CoreState::Reset),
            Err(RpuError::InvalidState {
                processor: Processor::Umac,
                from: CoreState::Failed,
                to: CoreState::Reset,
            })
        );
    }
}

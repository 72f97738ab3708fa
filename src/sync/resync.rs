//! Per-dataset resync state machine: `Idle → Pending → Running → Idle`
use parking_lot::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResyncState {
    #[default]
    Idle,
    /// A resync is scheduled and waiting out its grace period.
    Pending,
    /// A resync is in flight; `dirty` records changes seen meanwhile.
    Running { dirty: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOutcome {
    /// The caller must schedule a resync.
    Scheduled,
    /// Folded into the resync already pending or running.
    Coalesced,
}

/// Guarantees at most one resync in flight per dataset.
#[derive(Debug, Default)]
pub struct ResyncGate {
    state: Mutex<ResyncState>,
}

impl ResyncGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ResyncState {
        *self.state.lock()
    }

    pub fn on_change(&self) -> ChangeOutcome {
        let mut state = self.state.lock();
        match *state {
            ResyncState::Idle => {
                *state = ResyncState::Pending;
                ChangeOutcome::Scheduled
            }
            ResyncState::Pending => ChangeOutcome::Coalesced,
            ResyncState::Running { .. } => {
                *state = ResyncState::Running { dirty: true };
                ChangeOutcome::Coalesced
            }
        }
    }

    /// `Pending → Running`. False if there was nothing pending.
    pub fn begin(&self) -> bool {
        let mut state = self.state.lock();
        if *state == ResyncState::Pending {
            *state = ResyncState::Running { dirty: false };
            true
        } else {
            false
        }
    }

    /// Leave `Running`. Returns true (and moves back to `Pending`) when
    /// changes arrived during the run and another resync is owed.
    pub fn finish(&self) -> bool {
        let mut state = self.state.lock();
        match *state {
            ResyncState::Running { dirty: true } => {
                *state = ResyncState::Pending;
                true
            }
            _ => {
                *state = ResyncState::Idle;
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_burst_schedules_once() {
        let gate = ResyncGate::new();
        assert_eq!(gate.on_change(), ChangeOutcome::Scheduled);
        for _ in 0..10 {
            assert_eq!(gate.on_change(), ChangeOutcome::Coalesced);
        }
        assert_eq!(gate.state(), ResyncState::Pending);
    }

    #[test]
    fn test_full_cycle() {
        let gate = ResyncGate::new();
        assert!(!gate.begin());
        gate.on_change();
        assert!(gate.begin());
        assert_eq!(gate.state(), ResyncState::Running { dirty: false });
        assert!(!gate.finish());
        assert_eq!(gate.state(), ResyncState::Idle);
        assert_eq!(gate.on_change(), ChangeOutcome::Scheduled);
    }

    #[test]
    fn test_change_during_run_owes_one_more() {
        let gate = ResyncGate::new();
        gate.on_change();
        gate.begin();
        assert_eq!(gate.on_change(), ChangeOutcome::Coalesced);
        assert_eq!(gate.on_change(), ChangeOutcome::Coalesced);
        assert!(gate.finish());
        assert_eq!(gate.state(), ResyncState::Pending);
        assert!(gate.begin());
        assert!(!gate.finish());
    }
}

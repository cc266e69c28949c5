//! Shared activity state.
//!
//! One [`ActivityState`] exists per process. The timestamps and positions
//! live under a single mutex; the two booleans that hot paths poll are
//! `SeqCst` atomics kept beside it. The contract is:
//!
//! - `simulating` and `synthetic_in_progress` may be *read* without the
//!   lock (the listener callback and the per-step loops do this), but a
//!   read alone is never the basis for a mutation.
//! - Every write to `simulating` happens while the field mutex is held,
//!   so check-then-act sequences (start a simulation, cancel it on genuine
//!   input) are atomic with respect to each other.
//! - `synthetic_in_progress` is set and cleared by the motion engine
//!   around each injected operation; it is a plain atomic flag.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// The lock-guarded portion of the activity record.
pub(crate) struct StateFields {
    pub(crate) last_real_activity: Instant,
    pub(crate) last_known_position: Option<(i32, i32)>,
    pub(crate) last_synthetic_position: Option<(i32, i32)>,
    pub(crate) last_synthetic_time: Option<Instant>,
}

/// Cross-thread record of real and synthetic input activity.
pub struct ActivityState {
    fields: Mutex<StateFields>,
    simulating: AtomicBool,
    synthetic_in_progress: AtomicBool,
}

impl ActivityState {
    /// Create a fresh record. The idle clock starts now.
    pub fn new() -> Self {
        Self {
            fields: Mutex::new(StateFields {
                last_real_activity: Instant::now(),
                last_known_position: None,
                last_synthetic_position: None,
                last_synthetic_time: None,
            }),
            simulating: AtomicBool::new(false),
            synthetic_in_progress: AtomicBool::new(false),
        }
    }

    pub(crate) fn fields(&self) -> MutexGuard<'_, StateFields> {
        self.fields.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether the driver loop should currently be producing activity.
    pub fn is_simulating(&self) -> bool {
        self.simulating.load(Ordering::SeqCst)
    }

    /// Whether a synthetic injection is in flight right now.
    pub fn synthetic_in_progress(&self) -> bool {
        self.synthetic_in_progress.load(Ordering::SeqCst)
    }

    /// Time since the last genuine input event.
    pub fn idle_for(&self) -> Duration {
        self.fields().last_real_activity.elapsed()
    }

    /// Position of the last genuine move, if one has been seen.
    pub fn last_known_position(&self) -> Option<(i32, i32)> {
        self.fields().last_known_position
    }

    /// Endpoint and completion time of the last synthetic move.
    pub fn last_synthetic(&self) -> Option<((i32, i32), Instant)> {
        let fields = self.fields();
        match (fields.last_synthetic_position, fields.last_synthetic_time) {
            (Some(position), Some(time)) => Some((position, time)),
            _ => None,
        }
    }

    /// Clear `simulating` while the caller already holds the field lock.
    pub(crate) fn clear_simulating_locked(&self, _fields: &mut StateFields) {
        self.simulating.store(false, Ordering::SeqCst);
    }

    /// Record a genuine event: reset the idle clock, remember the position,
    /// and cancel any running simulation. Returns whether a simulation was
    /// cancelled.
    pub fn record_genuine(&self, position: Option<(i32, i32)>) -> bool {
        let mut fields = self.fields();
        fields.last_real_activity = Instant::now();
        if let Some(position) = position {
            fields.last_known_position = Some(position);
        }
        let was_simulating = self.simulating.load(Ordering::SeqCst);
        if was_simulating {
            self.clear_simulating_locked(&mut fields);
        }
        was_simulating
    }

    /// Flip into the simulating state. Returns `false` if a simulation is
    /// already flagged. Clears stale synthetic bookkeeping on success.
    pub fn try_begin_simulation(&self) -> bool {
        let mut fields = self.fields();
        if self.simulating.load(Ordering::SeqCst) {
            return false;
        }
        self.simulating.store(true, Ordering::SeqCst);
        fields.last_synthetic_position = None;
        fields.last_synthetic_time = None;
        true
    }

    /// Cancel a running simulation, keeping the synthetic bookkeeping so
    /// tail echoes of an in-flight move are still filtered. Returns whether
    /// a simulation was actually running.
    pub fn cancel_simulation(&self) -> bool {
        let mut fields = self.fields();
        let was_simulating = self.simulating.load(Ordering::SeqCst);
        if was_simulating {
            self.clear_simulating_locked(&mut fields);
        }
        was_simulating
    }

    /// Stop simulating and forget the synthetic bookkeeping. Used on
    /// explicit shutdown, not on genuine-input cancellation.
    pub fn stop_simulation(&self) {
        let mut fields = self.fields();
        self.clear_simulating_locked(&mut fields);
        fields.last_synthetic_position = None;
        fields.last_synthetic_time = None;
    }

    /// Mark a synthetic operation as in flight.
    pub fn begin_synthetic(&self) {
        self.synthetic_in_progress.store(true, Ordering::SeqCst);
    }

    /// Mark the in-flight synthetic operation as finished, recording the
    /// achieved endpoint (if the operation moved the cursor) for the echo
    /// filter.
    pub fn end_synthetic(&self, final_position: Option<(i32, i32)>) {
        let mut fields = self.fields();
        if let Some(position) = final_position {
            fields.last_synthetic_position = Some(position);
            fields.last_synthetic_time = Some(Instant::now());
        }
        self.synthetic_in_progress.store(false, Ordering::SeqCst);
    }
}

impl Default for ActivityState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn test_record_genuine_resets_idle_clock() {
        let state = ActivityState::new();
        sleep(Duration::from_millis(20));
        assert!(state.idle_for() >= Duration::from_millis(15));

        state.record_genuine(Some((10, 20)));
        assert!(state.idle_for() < Duration::from_millis(15));
        assert_eq!(state.last_known_position(), Some((10, 20)));
    }

    #[test]
    fn test_record_genuine_cancels_simulation() {
        let state = ActivityState::new();
        assert!(state.try_begin_simulation());
        assert!(state.is_simulating());

        assert!(state.record_genuine(None));
        assert!(!state.is_simulating());
        // A second genuine event has nothing left to cancel.
        assert!(!state.record_genuine(None));
    }

    #[test]
    fn test_begin_simulation_is_exclusive() {
        let state = ActivityState::new();
        assert!(state.try_begin_simulation());
        assert!(!state.try_begin_simulation());
        assert!(state.cancel_simulation());
        assert!(!state.cancel_simulation());
        assert!(state.try_begin_simulation());
    }

    #[test]
    fn test_begin_simulation_clears_stale_bookkeeping() {
        let state = ActivityState::new();
        state.end_synthetic(Some((5, 5)));
        assert!(state.last_synthetic().is_some());

        assert!(state.try_begin_simulation());
        assert!(state.last_synthetic().is_none());
    }

    #[test]
    fn test_cancel_keeps_bookkeeping_but_stop_clears_it() {
        let state = ActivityState::new();
        assert!(state.try_begin_simulation());
        state.end_synthetic(Some((7, 9)));

        state.cancel_simulation();
        assert_eq!(state.last_synthetic().map(|(p, _)| p), Some((7, 9)));

        state.stop_simulation();
        assert!(state.last_synthetic().is_none());
    }

    #[test]
    fn test_synthetic_flag_and_endpoint() {
        let state = ActivityState::new();
        assert!(!state.synthetic_in_progress());

        state.begin_synthetic();
        assert!(state.synthetic_in_progress());

        state.end_synthetic(None);
        assert!(!state.synthetic_in_progress());
        // No movement happened, so no endpoint was recorded.
        assert!(state.last_synthetic().is_none());

        state.begin_synthetic();
        state.end_synthetic(Some((42, 24)));
        assert_eq!(state.last_synthetic().map(|(p, _)| p), Some((42, 24)));
    }
}

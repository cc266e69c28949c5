//! Classification of raw input into genuine activity and synthetic echoes.
//!
//! The tracker is the crate's [`EventSink`]: the platform listener pushes
//! every raw event through it. Moves are the only event kind that can be
//! an echo of our own injection; they pass a two-stage filter before they
//! are allowed to reset the idle clock or cancel a simulation.

use crate::config::Config;
use crate::event::Button;
use crate::listener::EventSink;
use crate::state::ActivityState;
use std::sync::Arc;
use std::time::Duration;

/// Maintains the "last real activity" record by classifying raw events.
pub struct ActivityTracker {
    state: Arc<ActivityState>,
    echo_radius: f64,
    echo_window: Duration,
}

impl ActivityTracker {
    pub fn new(state: Arc<ActivityState>, config: &Config) -> Self {
        Self {
            state,
            echo_radius: config.echo_radius,
            echo_window: config.echo_window,
        }
    }

    /// Shared handling for clicks, scrolls, and key presses. These carry no
    /// echo risk of their own, but while an injection is in flight every
    /// event kind is discarded so our own scrolls and key taps cannot
    /// cancel the simulation that produced them.
    fn record_non_move(&self, what: &str, position: Option<(i32, i32)>) {
        if self.state.synthetic_in_progress() {
            log::debug!("ignoring {} during synthetic operation", what);
            return;
        }
        if self.state.record_genuine(position) {
            log::info!("genuine {} detected, stopping synthetic activity", what);
        }
    }
}

impl EventSink for ActivityTracker {
    fn mouse_moved(&self, x: i32, y: i32) {
        // Fast path, no lock: drop reports of an in-flight synthetic move.
        if self.state.synthetic_in_progress() {
            log::debug!("ignoring move during synthetic operation: ({}, {})", x, y);
            return;
        }

        let mut fields = self.state.fields();

        // Re-validate under the lock; an injection may have started since
        // the check above.
        if self.state.synthetic_in_progress() {
            return;
        }

        // Driver-coalesced events can trail a synthetic move by a beat.
        // Anything close to the last synthetic endpoint, shortly after it,
        // is treated as that move's tail echo.
        if let (Some((sx, sy)), Some(done_at)) =
            (fields.last_synthetic_position, fields.last_synthetic_time)
            && done_at.elapsed() <= self.echo_window
        {
            let distance = f64::from(x - sx).hypot(f64::from(y - sy));
            if distance < self.echo_radius {
                log::debug!(
                    "ignoring synthetic echo at ({}, {}), {:.1}px from last endpoint",
                    x,
                    y,
                    distance
                );
                return;
            }
        }

        fields.last_real_activity = std::time::Instant::now();
        fields.last_known_position = Some((x, y));
        let cancelled = self.state.is_simulating();
        if cancelled {
            self.state.clear_simulating_locked(&mut fields);
        }
        drop(fields);

        if cancelled {
            log::info!(
                "manual mouse movement at ({}, {}), stopping synthetic activity",
                x,
                y
            );
        } else {
            log::trace!("manual mouse move to ({}, {})", x, y);
        }
    }

    fn mouse_clicked(&self, _button: Button, x: i32, y: i32, pressed: bool) {
        let what = if pressed { "click" } else { "button release" };
        self.record_non_move(what, Some((x, y)));
    }

    fn mouse_scrolled(&self, x: i32, y: i32, _dx: f64, _dy: f64) {
        self.record_non_move("scroll", Some((x, y)));
    }

    fn key_pressed(&self, _raw_code: u32) {
        // The code itself is deliberately not recorded anywhere.
        self.record_non_move("key press", None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    fn tracker_with(echo_window: Duration) -> (Arc<ActivityState>, ActivityTracker) {
        let state = Arc::new(ActivityState::new());
        let config = Config {
            echo_window,
            ..Config::default()
        };
        let tracker = ActivityTracker::new(state.clone(), &config);
        (state, tracker)
    }

    #[test]
    fn test_move_during_synthetic_operation_is_discarded() {
        let (state, tracker) = tracker_with(Duration::from_secs(1));
        assert!(state.try_begin_simulation());
        state.begin_synthetic();

        tracker.mouse_moved(500, 500);

        assert!(state.is_simulating());
        assert_eq!(state.last_known_position(), None);
        state.end_synthetic(None);
    }

    #[test]
    fn test_echo_near_synthetic_endpoint_is_discarded() {
        let (state, tracker) = tracker_with(Duration::from_secs(1));
        assert!(state.try_begin_simulation());
        state.begin_synthetic();
        state.end_synthetic(Some((100, 100)));

        // 105,107 is ~8.6px from the endpoint: inside the 10px radius.
        tracker.mouse_moved(105, 107);

        assert!(state.is_simulating());
        assert_eq!(state.last_known_position(), None);
    }

    #[test]
    fn test_echo_does_not_reset_idle_clock() {
        let (state, tracker) = tracker_with(Duration::from_secs(1));
        assert!(state.try_begin_simulation());
        state.begin_synthetic();
        state.end_synthetic(Some((100, 100)));

        sleep(Duration::from_millis(30));
        let idle_before = state.idle_for();
        tracker.mouse_moved(102, 99);
        assert!(state.idle_for() >= idle_before);
    }

    #[test]
    fn test_distant_move_within_window_is_genuine() {
        let (state, tracker) = tracker_with(Duration::from_secs(1));
        assert!(state.try_begin_simulation());
        state.begin_synthetic();
        state.end_synthetic(Some((100, 100)));

        // 10px exactly is outside the `< radius` echo zone.
        tracker.mouse_moved(110, 100);

        assert!(!state.is_simulating());
        assert_eq!(state.last_known_position(), Some((110, 100)));
    }

    #[test]
    fn test_near_move_after_window_is_genuine() {
        let (state, tracker) = tracker_with(Duration::from_millis(40));
        assert!(state.try_begin_simulation());
        state.begin_synthetic();
        state.end_synthetic(Some((100, 100)));

        sleep(Duration::from_millis(80));
        tracker.mouse_moved(101, 101);

        assert!(!state.is_simulating());
        assert_eq!(state.last_known_position(), Some((101, 101)));
    }

    #[test]
    fn test_genuine_move_without_simulation_updates_state() {
        let (state, tracker) = tracker_with(Duration::from_secs(1));
        tracker.mouse_moved(3, 4);
        assert_eq!(state.last_known_position(), Some((3, 4)));
        assert!(state.idle_for() < Duration::from_millis(100));
    }

    #[test]
    fn test_click_cancels_simulation_regardless_of_proximity() {
        let (state, tracker) = tracker_with(Duration::from_secs(1));
        assert!(state.try_begin_simulation());
        state.begin_synthetic();
        state.end_synthetic(Some((100, 100)));

        // Right on top of the synthetic endpoint; clicks are never echoes.
        tracker.mouse_clicked(Button::Left, 100, 100, true);

        assert!(!state.is_simulating());
        assert_eq!(state.last_known_position(), Some((100, 100)));
    }

    #[test]
    fn test_scroll_and_key_cancel_simulation() {
        let (state, tracker) = tracker_with(Duration::from_secs(1));

        assert!(state.try_begin_simulation());
        tracker.mouse_scrolled(50, 50, 0.0, -1.0);
        assert!(!state.is_simulating());

        assert!(state.try_begin_simulation());
        tracker.key_pressed(0x41);
        assert!(!state.is_simulating());
    }

    #[test]
    fn test_events_during_synthetic_operation_never_cancel() {
        let (state, tracker) = tracker_with(Duration::from_secs(1));
        assert!(state.try_begin_simulation());
        state.begin_synthetic();

        tracker.mouse_clicked(Button::Left, 0, 0, true);
        tracker.mouse_scrolled(0, 0, 0.0, 1.0);
        tracker.key_pressed(0x20);

        assert!(state.is_simulating());
        state.end_synthetic(None);
    }
}

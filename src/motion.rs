//! Eased synthetic cursor trajectories.
//!
//! A trajectory is planned from the *queried* cursor position, never from
//! stored state, so the plan cannot drift from where the pointer actually
//! is. Progress along the displacement follows a smoothstep ease, emitted
//! as integer relative deltas whose fractional remainders accumulate:
//! the emitted deltas always sum to the full displacement.

use crate::config::Config;
use crate::injector::InputInjector;
use crate::state::ActivityState;
use std::sync::Arc;
use std::time::Duration;

/// Smoothstep ease: `f(t) = t²(3 − 2t)`.
///
/// Zero derivative at both endpoints and monotonic on `[0, 1]`, so a
/// trajectory accelerates from rest and decelerates to rest.
pub(crate) fn smoothstep(t: f64) -> f64 {
    t * t * (3.0 - 2.0 * t)
}

/// Step count for a trajectory of the given pixel length.
///
/// Coarser buckets for longer hops keep the number of injected events
/// bounded no matter how far the target is.
pub(crate) fn steps_for_distance(distance: f64) -> u32 {
    if distance < 40.0 {
        8
    } else if distance < 120.0 {
        12
    } else if distance < 250.0 {
        20
    } else {
        25
    }
}

/// One planned synthetic movement, consumed by a single trajectory.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionPlan {
    pub start: (i32, i32),
    pub end: (i32, i32),
    /// Zero when the move is a sub-pixel no-op.
    pub steps: u32,
}

impl MotionPlan {
    /// Plan a movement between two points.
    pub fn between(start: (i32, i32), end: (i32, i32)) -> Self {
        let distance = f64::from(end.0 - start.0).hypot(f64::from(end.1 - start.1));
        let steps = if distance < 1.0 {
            0
        } else {
            steps_for_distance(distance)
        };
        Self { start, end, steps }
    }

    /// Euclidean length of the planned movement in pixels.
    pub fn distance(&self) -> f64 {
        f64::from(self.end.0 - self.start.0).hypot(f64::from(self.end.1 - self.start.1))
    }
}

/// What a single trajectory actually did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveOutcome {
    /// Steps the plan called for (zero for a no-op).
    pub planned_steps: u32,
    /// Steps that were actually injected.
    pub injected_steps: u32,
    /// Where the cursor ended up according to our bookkeeping, if the
    /// starting position could be queried at all.
    pub final_position: Option<(i32, i32)>,
    /// Whether the trajectory was cut short by a cancelled simulation.
    pub aborted: bool,
}

/// Generates naturalistic cursor movement through an [`InputInjector`].
pub struct MotionEngine {
    state: Arc<ActivityState>,
    injector: Arc<dyn InputInjector>,
    step_pause: Duration,
    min_step: f64,
}

impl MotionEngine {
    pub fn new(state: Arc<ActivityState>, injector: Arc<dyn InputInjector>, config: &Config) -> Self {
        Self {
            state,
            injector,
            step_pause: config.step_pause,
            min_step: config.min_step,
        }
    }

    /// Glide the cursor to `target` with eased interpolation.
    ///
    /// The whole call is bracketed by the `synthetic_in_progress` flag so
    /// the tracker discards the listener's reports of these injections.
    /// The trajectory aborts early if the simulation is cancelled, and the
    /// achieved endpoint is recorded for the echo filter either way.
    pub fn move_to(&self, target: (i32, i32)) -> MoveOutcome {
        self.state.begin_synthetic();
        let outcome = self.run_trajectory(target);
        self.state.end_synthetic(outcome.final_position);
        outcome
    }

    fn run_trajectory(&self, target: (i32, i32)) -> MoveOutcome {
        let start = match self.injector.mouse_position() {
            Ok(position) => position,
            Err(e) => {
                log::warn!("cannot query cursor position, skipping move: {}", e);
                return MoveOutcome {
                    planned_steps: 0,
                    injected_steps: 0,
                    final_position: None,
                    aborted: false,
                };
            }
        };

        let plan = MotionPlan::between(start, target);
        if plan.steps == 0 {
            return MoveOutcome {
                planned_steps: 0,
                injected_steps: 0,
                final_position: Some(start),
                aborted: false,
            };
        }

        log::trace!(
            "trajectory of {:.0}px in {} steps from ({}, {})",
            plan.distance(),
            plan.steps,
            start.0,
            start.1
        );

        let total_dx = f64::from(target.0 - start.0);
        let total_dy = f64::from(target.1 - start.1);
        let mut emitted = (0i32, 0i32);
        let mut injected = 0u32;
        let mut aborted = false;

        for step in 1..=plan.steps {
            if !self.state.is_simulating() {
                aborted = true;
                break;
            }

            let eased = smoothstep(f64::from(step) / f64::from(plan.steps));
            let step_dx = total_dx * eased - f64::from(emitted.0);
            let step_dy = total_dy * eased - f64::from(emitted.1);

            if step_dx.hypot(step_dy) >= self.min_step {
                let dx = step_dx.round() as i32;
                let dy = step_dy.round() as i32;
                if (dx, dy) != (0, 0) {
                    match self.injector.mouse_move_relative(dx, dy) {
                        Ok(()) => {
                            emitted.0 += dx;
                            emitted.1 += dy;
                            injected += 1;
                        }
                        // A failed step is skipped; the remainder folds
                        // into the next step's delta.
                        Err(e) => log::debug!("skipping step {}/{}: {}", step, plan.steps, e),
                    }
                }
            }

            self.pause(step, plan.steps);
        }

        MoveOutcome {
            planned_steps: plan.steps,
            injected_steps: injected,
            final_position: Some((start.0 + emitted.0, start.1 + emitted.1)),
            aborted,
        }
    }

    /// Sleep between steps: full pause in the first and last 15% of the
    /// trajectory, shorter in the middle, giving the slow-fast-slow
    /// velocity profile of a hand-driven pointer.
    fn pause(&self, step: u32, total: u32) {
        if self.step_pause.is_zero() {
            return;
        }
        let edge = ((f64::from(total)) * 0.15).ceil() as u32;
        let pause = if step <= edge || step > total.saturating_sub(edge) {
            self.step_pause
        } else {
            self.step_pause.mul_f64(0.6)
        };
        std::thread::sleep(pause);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, Result};
    use std::sync::Mutex;

    /// Test double that applies deltas to a virtual cursor and records
    /// them, optionally failing one specific call.
    struct RecordingInjector {
        cursor: Mutex<(i32, i32)>,
        deltas: Mutex<Vec<(i32, i32)>>,
        fail_on_call: Option<u32>,
        calls: Mutex<u32>,
    }

    impl RecordingInjector {
        fn at(position: (i32, i32)) -> Self {
            Self {
                cursor: Mutex::new(position),
                deltas: Mutex::new(Vec::new()),
                fail_on_call: None,
                calls: Mutex::new(0),
            }
        }

        fn failing_on(position: (i32, i32), call: u32) -> Self {
            Self {
                fail_on_call: Some(call),
                ..Self::at(position)
            }
        }

        fn deltas(&self) -> Vec<(i32, i32)> {
            self.deltas.lock().unwrap().clone()
        }
    }

    impl InputInjector for RecordingInjector {
        fn mouse_move_relative(&self, dx: i32, dy: i32) -> Result<()> {
            let mut calls = self.calls.lock().unwrap();
            *calls += 1;
            if self.fail_on_call == Some(*calls) {
                return Err(Error::InjectFailed("synthetic failure".into()));
            }
            let mut cursor = self.cursor.lock().unwrap();
            cursor.0 += dx;
            cursor.1 += dy;
            self.deltas.lock().unwrap().push((dx, dy));
            Ok(())
        }

        fn mouse_scroll(&self, _notches: i32, _horizontal: bool) -> Result<()> {
            Ok(())
        }

        fn key_tap(&self, _key: crate::keycode::Key) -> Result<()> {
            Ok(())
        }

        fn mouse_position(&self) -> Result<(i32, i32)> {
            Ok(*self.cursor.lock().unwrap())
        }
    }

    fn fast_config() -> Config {
        Config {
            step_pause: Duration::ZERO,
            ..Config::default()
        }
    }

    fn engine_with(injector: Arc<dyn InputInjector>) -> (Arc<ActivityState>, MotionEngine) {
        let state = Arc::new(ActivityState::new());
        assert!(state.try_begin_simulation());
        let engine = MotionEngine::new(state.clone(), injector, &fast_config());
        (state, engine)
    }

    #[test]
    fn test_smoothstep_shape() {
        assert_eq!(smoothstep(0.0), 0.0);
        assert_eq!(smoothstep(1.0), 1.0);
        assert!((smoothstep(0.5) - 0.5).abs() < 1e-12);

        let mut previous = 0.0;
        for i in 1..=100 {
            let value = smoothstep(f64::from(i) / 100.0);
            assert!(value >= previous);
            previous = value;
        }
    }

    #[test]
    fn test_fractional_progress_covers_whole_trajectory() {
        // The per-step fractions f(t_i) - f(t_{i-1}) telescope to f(1) = 1.
        for steps in [8u32, 12, 20, 25] {
            let mut sum = 0.0;
            let mut previous = 0.0;
            for i in 1..=steps {
                let eased = smoothstep(f64::from(i) / f64::from(steps));
                sum += eased - previous;
                previous = eased;
            }
            assert!((sum - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_step_buckets() {
        assert_eq!(steps_for_distance(10.0), 8);
        assert_eq!(steps_for_distance(39.9), 8);
        assert_eq!(steps_for_distance(40.0), 12);
        assert_eq!(steps_for_distance(150.0), 20);
        assert_eq!(steps_for_distance(600.0), 25);

        // A 200px hop lands in the long bucket.
        let plan = MotionPlan::between((0, 0), (200, 0));
        assert!((18..=25).contains(&plan.steps));
    }

    #[test]
    fn test_sub_pixel_move_is_a_no_op() {
        let injector = Arc::new(RecordingInjector::at((10, 10)));
        let (_state, engine) = engine_with(injector.clone());

        let outcome = engine.move_to((10, 10));

        assert_eq!(outcome.planned_steps, 0);
        assert_eq!(outcome.injected_steps, 0);
        assert_eq!(outcome.final_position, Some((10, 10)));
        assert!(injector.deltas().is_empty());
    }

    #[test]
    fn test_emitted_deltas_sum_to_displacement() {
        let injector = Arc::new(RecordingInjector::at((50, 80)));
        let (state, engine) = engine_with(injector.clone());

        let outcome = engine.move_to((187, -9));

        assert!(!outcome.aborted);
        assert_eq!(outcome.final_position, Some((187, -9)));
        let sum = injector
            .deltas()
            .iter()
            .fold((0, 0), |acc, d| (acc.0 + d.0, acc.1 + d.1));
        assert_eq!(sum, (137, -89));
        assert!(outcome.injected_steps <= outcome.planned_steps);

        // Endpoint bookkeeping feeds the echo filter.
        assert_eq!(state.last_synthetic().map(|(p, _)| p), Some((187, -9)));
        assert!(!state.synthetic_in_progress());
    }

    #[test]
    fn test_failed_step_is_skipped_not_fatal() {
        let injector = Arc::new(RecordingInjector::failing_on((0, 0), 2));
        let (_state, engine) = engine_with(injector.clone());

        let outcome = engine.move_to((100, 0));

        assert!(!outcome.aborted);
        // The remainder of the failed step folded into a later delta.
        assert_eq!(outcome.final_position, Some((100, 0)));
        assert!(outcome.injected_steps < outcome.planned_steps);
    }

    #[test]
    fn test_cancelled_simulation_aborts_mid_flight() {
        struct CancellingInjector {
            inner: RecordingInjector,
            state: Arc<ActivityState>,
            cancel_after: u32,
        }

        impl InputInjector for CancellingInjector {
            fn mouse_move_relative(&self, dx: i32, dy: i32) -> Result<()> {
                self.inner.mouse_move_relative(dx, dy)?;
                if *self.inner.calls.lock().unwrap() == self.cancel_after {
                    self.state.cancel_simulation();
                }
                Ok(())
            }

            fn mouse_scroll(&self, notches: i32, horizontal: bool) -> Result<()> {
                self.inner.mouse_scroll(notches, horizontal)
            }

            fn key_tap(&self, key: crate::keycode::Key) -> Result<()> {
                self.inner.key_tap(key)
            }

            fn mouse_position(&self) -> Result<(i32, i32)> {
                self.inner.mouse_position()
            }
        }

        let state = Arc::new(ActivityState::new());
        assert!(state.try_begin_simulation());
        let injector = Arc::new(CancellingInjector {
            inner: RecordingInjector::at((0, 0)),
            state: state.clone(),
            cancel_after: 3,
        });
        let engine = MotionEngine::new(state.clone(), injector.clone(), &fast_config());

        let outcome = engine.move_to((400, 300));

        assert!(outcome.aborted);
        assert_eq!(outcome.injected_steps, 3);
        // The partial endpoint is still recorded for the echo filter.
        let endpoint = outcome.final_position.unwrap();
        assert_eq!(state.last_synthetic().map(|(p, _)| p), Some(endpoint));
        assert_ne!(endpoint, (400, 300));
    }

    #[test]
    fn test_unqueryable_cursor_degrades_to_nothing() {
        struct BlindInjector;

        impl InputInjector for BlindInjector {
            fn mouse_move_relative(&self, _dx: i32, _dy: i32) -> Result<()> {
                panic!("must not inject without a known position");
            }

            fn mouse_scroll(&self, _notches: i32, _horizontal: bool) -> Result<()> {
                Ok(())
            }

            fn key_tap(&self, _key: crate::keycode::Key) -> Result<()> {
                Ok(())
            }

            fn mouse_position(&self) -> Result<(i32, i32)> {
                Err(Error::QueryFailed("no cursor".into()))
            }
        }

        let (state, engine) = engine_with(Arc::new(BlindInjector));
        let outcome = engine.move_to((100, 100));

        assert_eq!(outcome.injected_steps, 0);
        assert_eq!(outcome.final_position, None);
        assert!(!state.synthetic_in_progress());
        assert!(state.last_synthetic().is_none());
    }
}

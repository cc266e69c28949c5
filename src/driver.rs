//! The simulation action loop.
//!
//! Runs on its own thread while the shared `simulating` flag is set:
//! pick a randomized action, perform it through the motion engine or the
//! injector, sleep a jittered interval, repeat. The flag is checked at
//! the top of every iteration and inside every sleep, so cancellation is
//! observed within one slice.

use crate::config::Config;
use crate::injector::InputInjector;
use crate::motion::MotionEngine;
use crate::state::ActivityState;
use rand::seq::SliceRandom;
use rand::{Rng, thread_rng};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Granularity at which cooperative sleeps re-check their condition.
const SLEEP_SLICE: Duration = Duration::from_millis(50);

/// Sleep for `total`, waking early if `keep_going` turns false.
/// Returns `false` when the sleep was cut short.
pub(crate) fn sleep_while<F: Fn() -> bool>(keep_going: F, total: Duration) -> bool {
    let deadline = Instant::now() + total;
    loop {
        if !keep_going() {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        std::thread::sleep(SLEEP_SLICE.min(deadline - now));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Move,
    Scroll,
    KeyTap,
    MoveThenScroll,
}

/// Produces synthetic activity until the simulation is cancelled.
pub struct SimulationDriver {
    state: Arc<ActivityState>,
    injector: Arc<dyn InputInjector>,
    engine: MotionEngine,
    config: Config,
}

impl SimulationDriver {
    pub fn new(state: Arc<ActivityState>, injector: Arc<dyn InputInjector>, config: Config) -> Self {
        let engine = MotionEngine::new(state.clone(), injector.clone(), &config);
        Self {
            state,
            injector,
            engine,
            config,
        }
    }

    /// Run the action loop. Returns once `simulating` is observed false.
    pub fn run(&self) {
        log::info!(
            "synthetic activity started (moves of {}-{}px every {:?})",
            self.config.min_move_distance,
            self.config.max_move_distance,
            self.config.action_interval
        );

        let mut moves = 0u64;
        while self.state.is_simulating() {
            self.perform(self.pick_action(), &mut moves);
            if !self.state.is_simulating() {
                break;
            }
            if !sleep_while(|| self.state.is_simulating(), self.jittered_interval()) {
                break;
            }
        }

        log::info!("synthetic activity stopped after {} moves", moves);
    }

    fn pick_action(&self) -> Action {
        let mut rng = thread_rng();
        let action = match rng.gen_range(0..100u32) {
            0..=54 => Action::Move,
            55..=69 => Action::Scroll,
            70..=84 => Action::KeyTap,
            _ => Action::MoveThenScroll,
        };
        if action == Action::KeyTap && self.config.keys.is_empty() {
            return Action::Move;
        }
        action
    }

    fn perform(&self, action: Action, moves: &mut u64) {
        match action {
            Action::Move => self.perform_move(moves),
            Action::Scroll => self.perform_scroll(),
            Action::KeyTap => self.perform_key_tap(),
            Action::MoveThenScroll => {
                self.perform_move(moves);
                if self.state.is_simulating() {
                    self.perform_scroll();
                }
            }
        }
    }

    fn perform_move(&self, moves: &mut u64) {
        let Some((target, distance, angle)) = self.random_target() else {
            return;
        };
        let outcome = self.engine.move_to(target);
        if outcome.aborted {
            log::debug!(
                "synthetic move aborted after {}/{} steps",
                outcome.injected_steps,
                outcome.planned_steps
            );
            return;
        }
        *moves += 1;
        if let Some(end) = outcome.final_position {
            // Log every third completed move at info, the rest quietly.
            if *moves % 3 == 0 {
                log::info!(
                    "synthetic move #{}: {:.0}px at {:.0}°, ended at ({}, {})",
                    moves,
                    distance,
                    angle.to_degrees(),
                    end.0,
                    end.1
                );
            } else {
                log::debug!(
                    "synthetic move #{}: {:.0}px at {:.0}°, ended at ({}, {})",
                    moves,
                    distance,
                    angle.to_degrees(),
                    end.0,
                    end.1
                );
            }
        }
    }

    /// Pick a target a random distance and direction away from the live
    /// cursor position, with a small jitter on both axes.
    fn random_target(&self) -> Option<((i32, i32), f64, f64)> {
        let (x, y) = match self.injector.mouse_position() {
            Ok(position) => position,
            Err(e) => {
                log::debug!("cannot query cursor position: {}", e);
                return None;
            }
        };
        let mut rng = thread_rng();
        let distance =
            f64::from(rng.gen_range(self.config.min_move_distance..=self.config.max_move_distance));
        let angle = rng.gen_range(0.0..std::f64::consts::TAU);
        let target = (
            x + (distance * angle.cos()).round() as i32 + rng.gen_range(-10..=10),
            y + (distance * angle.sin()).round() as i32 + rng.gen_range(-10..=10),
        );
        Some((target, distance, angle))
    }

    fn perform_scroll(&self) {
        let mut rng = thread_rng();
        let mut notches = rng.gen_range(1..=self.config.max_scroll_notches);
        if rng.gen_bool(0.5) {
            notches = -notches;
        }
        let horizontal = rng.gen_bool(0.1);

        self.state.begin_synthetic();
        if let Err(e) = self.injector.mouse_scroll(notches, horizontal) {
            log::debug!("scroll injection failed: {}", e);
        }
        self.state.end_synthetic(None);
        log::debug!(
            "synthetic scroll: {} notches{}",
            notches,
            if horizontal { " (horizontal)" } else { "" }
        );
    }

    fn perform_key_tap(&self) {
        let key = {
            let mut rng = thread_rng();
            match self.config.keys.choose(&mut rng) {
                Some(key) => *key,
                None => return,
            }
        };

        self.state.begin_synthetic();
        if let Err(e) = self.injector.key_tap(key) {
            log::debug!("key injection failed for {:?}: {}", key, e);
        }
        self.state.end_synthetic(None);
        log::debug!("synthetic key tap: {:?}", key);
    }

    fn jittered_interval(&self) -> Duration {
        let base = self.config.action_interval;
        let jitter = self.config.action_jitter;
        if jitter.is_zero() {
            return base;
        }
        let mut rng = thread_rng();
        let span = 2 * jitter.as_millis() as u64;
        base.saturating_sub(jitter) + Duration::from_millis(rng.gen_range(0..=span))
    }
}

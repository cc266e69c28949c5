//! Tunable parameters for idle detection and synthetic activity.
//!
//! There is no configuration file; everything has a sensible default and
//! can be overridden through `RESTLESS_*` environment variables, so
//! thresholds can be retuned without a rebuild.

use crate::error::{Error, Result};
use crate::keycode::Key;
use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Runtime tuning for the monitor, driver, and motion engine.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Config {
    /// How long real input must be absent before simulation starts.
    pub idle_threshold: Duration,
    /// How often the idle monitor re-evaluates the idle duration.
    pub poll_interval: Duration,
    /// Pause between synthetic actions while simulating.
    pub action_interval: Duration,
    /// Maximum random deviation applied to `action_interval` in either
    /// direction.
    pub action_jitter: Duration,
    /// Shortest synthetic move, in pixels.
    pub min_move_distance: u32,
    /// Longest synthetic move, in pixels.
    pub max_move_distance: u32,
    /// Largest synthetic scroll, in wheel notches.
    pub max_scroll_notches: i32,
    /// Keys the driver may tap. Empty disables key actions.
    pub keys: Vec<Key>,
    /// A reported move within this distance (pixels, Euclidean) of the last
    /// synthetic endpoint may be an echo of our own injection.
    ///
    /// Heuristic carried over from field tuning; different input stacks may
    /// need a different radius.
    pub echo_radius: f64,
    /// A reported move later than this after a synthetic move completes is
    /// never treated as an echo.
    pub echo_window: Duration,
    /// Pause between trajectory steps at the slow ends of a move. The
    /// middle of a trajectory runs faster.
    pub step_pause: Duration,
    /// Step deltas smaller than this (pixels) are not injected.
    pub min_step: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            idle_threshold: Duration::from_secs(20),
            poll_interval: Duration::from_secs(5),
            action_interval: Duration::from_secs(5),
            action_jitter: Duration::from_millis(500),
            min_move_distance: 100,
            max_move_distance: 600,
            max_scroll_notches: 3,
            keys: vec![Key::F15],
            echo_radius: 10.0,
            echo_window: Duration::from_secs(1),
            step_pause: Duration::from_millis(10),
            min_step: 0.1,
        }
    }
}

impl Config {
    /// Build a config from defaults plus any `RESTLESS_*` overrides present
    /// in the environment. Unparseable values are ignored with a warning.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(secs) = env_u64("RESTLESS_IDLE_SECS") {
            config.idle_threshold = Duration::from_secs(secs);
        }
        if let Some(secs) = env_u64("RESTLESS_POLL_SECS") {
            config.poll_interval = Duration::from_secs(secs);
        }
        if let Some(secs) = env_u64("RESTLESS_ACTION_SECS") {
            config.action_interval = Duration::from_secs(secs);
        }
        if let Some(px) = env_u64("RESTLESS_MIN_DISTANCE") {
            config.min_move_distance = px as u32;
        }
        if let Some(px) = env_u64("RESTLESS_MAX_DISTANCE") {
            config.max_move_distance = px as u32;
        }
        config
    }

    /// Check that the values are usable together.
    pub fn validate(&self) -> Result<()> {
        if self.idle_threshold.is_zero() {
            return Err(Error::InvalidConfig("idle threshold must be non-zero".into()));
        }
        if self.poll_interval.is_zero() {
            return Err(Error::InvalidConfig("poll interval must be non-zero".into()));
        }
        if self.min_move_distance == 0 || self.min_move_distance > self.max_move_distance {
            return Err(Error::InvalidConfig(format!(
                "move distance range {}..={} is empty",
                self.min_move_distance, self.max_move_distance
            )));
        }
        if self.echo_radius < 0.0 {
            return Err(Error::InvalidConfig("echo radius must not be negative".into()));
        }
        if self.max_scroll_notches < 1 {
            return Err(Error::InvalidConfig("max scroll notches must be at least 1".into()));
        }
        Ok(())
    }
}

fn env_u64(name: &str) -> Option<u64> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            log::warn!("ignoring unparseable {}={:?}", name, raw);
            None
        }
    }
}

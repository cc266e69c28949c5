//! Capability trait for synthesizing input, plus the degraded backend.

use crate::error::Result;
use crate::keycode::Key;
use std::sync::{Mutex, PoisonError};

/// Low-level synthetic input primitives.
///
/// Callers treat every method as best-effort: a failed injection is logged
/// and skipped at the call site, never propagated further (a step that
/// fails costs one step, not the monitor).
pub trait InputInjector: Send + Sync {
    /// Move the pointer by `(dx, dy)` pixels relative to where it is.
    fn mouse_move_relative(&self, dx: i32, dy: i32) -> Result<()>;

    /// Scroll by `notches` wheel notches, vertically unless `horizontal`.
    /// Positive is up / right.
    fn mouse_scroll(&self, notches: i32, horizontal: bool) -> Result<()>;

    /// Press and release `key`.
    fn key_tap(&self, key: Key) -> Result<()>;

    /// Current pointer position in screen coordinates.
    fn mouse_position(&self) -> Result<(i32, i32)>;
}

/// Injector used when no platform backend is available.
///
/// Tracks a virtual cursor so the motion engine and driver run their full
/// logic with no visible effect, which keeps the process alive and
/// harmless instead of crashing on an unsupported host.
pub struct NullInjector {
    cursor: Mutex<(i32, i32)>,
}

impl NullInjector {
    pub fn new() -> Self {
        Self {
            cursor: Mutex::new((0, 0)),
        }
    }
}

impl Default for NullInjector {
    fn default() -> Self {
        Self::new()
    }
}

impl InputInjector for NullInjector {
    fn mouse_move_relative(&self, dx: i32, dy: i32) -> Result<()> {
        let mut cursor = self.cursor.lock().unwrap_or_else(PoisonError::into_inner);
        cursor.0 += dx;
        cursor.1 += dy;
        Ok(())
    }

    fn mouse_scroll(&self, _notches: i32, _horizontal: bool) -> Result<()> {
        Ok(())
    }

    fn key_tap(&self, _key: Key) -> Result<()> {
        Ok(())
    }

    fn mouse_position(&self) -> Result<(i32, i32)> {
        Ok(*self.cursor.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

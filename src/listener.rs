//! Capability traits for the raw input side.
//!
//! The listener holds a reference to an [`EventSink`] and pushes events
//! into it; components never poll the listener. [`ActivityTracker`] is the
//! one sink in this crate.
//!
//! [`ActivityTracker`]: crate::tracker::ActivityTracker

use crate::error::Result;
use crate::event::Button;
use std::sync::Arc;

/// Receiver for raw input notifications, one method per event kind.
pub trait EventSink: Send + Sync {
    /// The pointer moved to screen coordinates `(x, y)`.
    fn mouse_moved(&self, x: i32, y: i32);

    /// A mouse button went down (`pressed`) or up at `(x, y)`.
    fn mouse_clicked(&self, button: Button, x: i32, y: i32, pressed: bool);

    /// The wheel scrolled by `(dx, dy)` notches at `(x, y)`.
    fn mouse_scrolled(&self, x: i32, y: i32, dx: f64, dy: f64);

    /// A key went down. `raw_code` is the platform virtual-key code; sinks
    /// must not log or store it.
    fn key_pressed(&self, raw_code: u32);
}

/// A source of raw input events that can be started and stopped.
pub trait InputListener: Send + Sync {
    /// Start delivering events to `sink`. Delivery happens on a thread
    /// owned by the listener.
    fn start(&self, sink: Arc<dyn EventSink>) -> Result<()>;

    /// Stop delivering events and release the underlying hook.
    fn stop(&self) -> Result<()>;

    /// Whether the listener is currently delivering events.
    fn is_running(&self) -> bool;
}

//! Virtual key codes the simulator is allowed to tap.
//!
//! Deliberately a small set: only keys with no typing or focus side
//! effects are safe to press on an unattended desktop. `F15` is unbound
//! on virtually every system and is the default.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Virtual key codes for side-effect-free keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Key {
    /// Left Shift. Pressing it alone types nothing.
    ShiftLeft,
    /// Right Shift.
    ShiftRight,
    /// Left Control.
    ControlLeft,
    /// F13. Unmapped on standard keyboards.
    F13,
    /// F14.
    F14,
    /// F15. The classic keep-awake key.
    F15,
}

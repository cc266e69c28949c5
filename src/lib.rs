//! # restless
//!
//! Keeps a desktop session looking active. The crate watches real mouse
//! and keyboard input and, once it has been idle past a threshold, starts
//! synthesizing naturalistic input — eased cursor moves, the occasional
//! scroll or harmless key tap — until real input returns.
//!
//! ## Features
//!
//! - Genuine/echo classification: the listener's reports of our own
//!   injected motion are filtered out, so simulation never feeds back
//!   into the idle clock
//! - Any real click, scroll, key press, or sufficiently distinct move
//!   cancels simulation immediately
//! - Eased (smoothstep) cursor trajectories with a bounded step count
//! - Thread-safe design: one mutex-guarded state record plus two atomic
//!   flags with documented lock discipline
//! - Degrades gracefully: no injection backend means a no-op virtual
//!   cursor, no listener means running blind — never a crash
//!
//! ## Quick Start
//!
//! ```no_run
//! use restless::{ActivityState, ActivityTracker, Config, IdleMonitor, NullInjector, platform};
//! use std::sync::Arc;
//!
//! let config = Config::default();
//! let state = Arc::new(ActivityState::new());
//!
//! // Real backend where available, virtual cursor otherwise.
//! let injector = platform::system_injector()
//!     .unwrap_or_else(|_| Arc::new(NullInjector::new()));
//!
//! // The tracker classifies raw events; the listener feeds it.
//! let tracker = Arc::new(ActivityTracker::new(state.clone(), &config));
//! if let Ok(listener) = platform::system_listener() {
//!     listener.start(tracker).expect("failed to start listener");
//! }
//!
//! let monitor = IdleMonitor::new(state, injector, config);
//! monitor.start().expect("failed to start monitor");
//! ```
//!
//! ## Architecture
//!
//! Raw events flow listener → [`ActivityTracker`] (classify, record) →
//! [`IdleMonitor`] (poll, decide) → [`SimulationDriver`] +
//! [`MotionEngine`] (act, through an [`InputInjector`]) → back into the
//! tracker's echo filter. All shared state lives in one
//! [`ActivityState`] record (see the [`state`] module for the exact
//! locking contract).

pub mod config;
pub mod driver;
pub mod error;
pub mod event;
pub mod injector;
pub mod keycode;
pub mod listener;
pub mod monitor;
pub mod motion;
pub mod platform;
pub mod state;
pub mod tracker;

// Re-exports
pub use config::Config;
pub use driver::SimulationDriver;
pub use error::{Error, Result};
pub use event::Button;
pub use injector::{InputInjector, NullInjector};
pub use keycode::Key;
pub use listener::{EventSink, InputListener};
pub use monitor::IdleMonitor;
pub use motion::{MotionEngine, MotionPlan, MoveOutcome};
pub use state::ActivityState;
pub use tracker::ActivityTracker;

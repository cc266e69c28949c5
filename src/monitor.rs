//! The idle monitor: the only periodic driver of state transitions.
//!
//! A two-state machine (active / simulating) advanced by a fixed-interval
//! poll loop. Entering the simulating state spawns the driver thread;
//! check-then-spawn happens under the driver-slot lock so at most one
//! driver thread is ever alive. The monitor owns both thread handles and
//! joins them on [`IdleMonitor::stop`].

use crate::config::Config;
use crate::driver::{SimulationDriver, sleep_while};
use crate::error::{Error, Result};
use crate::injector::InputInjector;
use crate::state::ActivityState;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;

/// Watches the idle clock and starts/stops synthetic activity.
pub struct IdleMonitor {
    running: Arc<AtomicBool>,
    poll_thread: Mutex<Option<JoinHandle<()>>>,
    shared: PollLoop,
}

impl IdleMonitor {
    pub fn new(
        state: Arc<ActivityState>,
        injector: Arc<dyn InputInjector>,
        config: Config,
    ) -> Self {
        let running = Arc::new(AtomicBool::new(false));
        Self {
            shared: PollLoop {
                state,
                injector,
                config,
                running: running.clone(),
                driver_slot: Arc::new(Mutex::new(None)),
            },
            running,
            poll_thread: Mutex::new(None),
        }
    }

    /// Start the poll loop in a background thread.
    pub fn start(&self) -> Result<()> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(Error::AlreadyRunning);
        }

        let poll_loop = self.shared.clone();
        let handle = std::thread::spawn(move || poll_loop.run());
        *self
            .poll_thread
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(handle);
        Ok(())
    }

    /// Whether the poll loop is running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Stop simulating and shut the poll loop down, joining both threads.
    pub fn stop(&self) -> Result<()> {
        if !self.running.swap(false, Ordering::SeqCst) {
            return Err(Error::NotRunning);
        }

        // The poll thread is joined first; once it is gone nothing can
        // spawn a new driver, so clearing the flag below is final.
        if let Some(handle) = self
            .poll_thread
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            handle
                .join()
                .map_err(|_| Error::ThreadError("failed to join monitor thread".into()))?;
        }

        // Clearing the flag makes the driver exit on its next check.
        self.shared.state.stop_simulation();
        if let Some(handle) = self
            .shared
            .driver_slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            handle
                .join()
                .map_err(|_| Error::ThreadError("failed to join driver thread".into()))?;
        }

        log::info!("idle monitor stopped");
        Ok(())
    }
}

impl Drop for IdleMonitor {
    fn drop(&mut self) {
        if self.is_running() {
            let _ = self.stop();
        }
    }
}

/// The state shared with (and cloned into) the poll thread.
#[derive(Clone)]
struct PollLoop {
    state: Arc<ActivityState>,
    injector: Arc<dyn InputInjector>,
    config: Config,
    running: Arc<AtomicBool>,
    driver_slot: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl PollLoop {
    fn run(&self) {
        log::info!(
            "idle monitor started: threshold {:.0}s, polling every {:.0}s",
            self.config.idle_threshold.as_secs_f64(),
            self.config.poll_interval.as_secs_f64()
        );

        let mut checks = 0u64;
        while self.running.load(Ordering::SeqCst) {
            checks += 1;
            let idle = self.state.idle_for();
            log::debug!("check #{}: idle for {:.1}s", checks, idle.as_secs_f64());

            if idle >= self.config.idle_threshold {
                self.ensure_driver(idle);
            } else {
                if self.state.cancel_simulation() {
                    log::info!("input activity resumed, stopping synthetic activity");
                }
                self.reap_driver();
            }

            if !sleep_while(
                || self.running.load(Ordering::SeqCst),
                self.config.poll_interval,
            ) {
                break;
            }
        }
    }

    /// Flag the simulation on and make sure a driver thread is serving it.
    /// The slot lock makes check-then-spawn atomic: either we observe a
    /// live driver, or we replace a finished one.
    fn ensure_driver(&self, idle: Duration) {
        let mut slot = self
            .driver_slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let fresh = self.state.try_begin_simulation();
        if fresh {
            log::warn!(
                "no real input for {:.1}s (threshold {:.0}s), starting synthetic activity",
                idle.as_secs_f64(),
                self.config.idle_threshold.as_secs_f64()
            );
        }

        let alive = slot.as_ref().is_some_and(|handle| !handle.is_finished());
        if alive {
            // A driver from the previous burst is still draining; it will
            // pick the freshly set flag up on its next iteration.
            if fresh {
                log::debug!("reusing driver thread that is still running");
            }
            return;
        }

        if let Some(finished) = slot.take() {
            let _ = finished.join();
        }

        let driver = SimulationDriver::new(
            self.state.clone(),
            self.injector.clone(),
            self.config.clone(),
        );
        *slot = Some(std::thread::spawn(move || driver.run()));
    }

    /// Join a driver thread that exited on its own after cancellation.
    fn reap_driver(&self) {
        let mut slot = self
            .driver_slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if slot.as_ref().is_some_and(|handle| handle.is_finished()) {
            if let Some(finished) = slot.take() {
                let _ = finished.join();
            }
        }
    }
}

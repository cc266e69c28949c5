//! restless — keeps a desktop session active.
//!
//! Watches real input through the platform listener and synthesizes
//! naturalistic activity once the session has been idle past the
//! configured threshold. Stop with Ctrl+C.

use log::{info, warn};
use restless::{
    ActivityState, ActivityTracker, Config, Error, IdleMonitor, InputInjector, NullInjector,
    Result, platform,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run() {
        log::error!("fatal: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let config = Config::from_env();
    config.validate()?;

    println!("restless {}", env!("CARGO_PKG_VERSION"));
    println!(
        "Idle threshold: {}s, checking every {}s.",
        config.idle_threshold.as_secs(),
        config.poll_interval.as_secs()
    );
    println!("Monitor is running. Press Ctrl+C to stop.\n");

    let state = Arc::new(ActivityState::new());

    let injector: Arc<dyn InputInjector> = match platform::system_injector() {
        Ok(injector) => injector,
        Err(e) => {
            warn!(
                "input injection unavailable ({}); simulation will have no visible effect",
                e
            );
            Arc::new(NullInjector::new())
        }
    };

    let tracker = Arc::new(ActivityTracker::new(state.clone(), &config));
    let listener = match platform::system_listener() {
        Ok(listener) => match listener.start(tracker) {
            Ok(()) => Some(listener),
            Err(e) => {
                warn!(
                    "input listener failed to start ({}); real input will not cancel simulation",
                    e
                );
                None
            }
        },
        Err(e) => {
            warn!(
                "input listening unavailable ({}); real input will not cancel simulation",
                e
            );
            None
        }
    };

    let monitor = IdleMonitor::new(state, injector, config);
    monitor.start()?;

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = shutdown.clone();
        ctrlc::set_handler(move || shutdown.store(true, Ordering::SeqCst))
            .map_err(|e| Error::Other(format!("failed to install interrupt handler: {}", e)))?;
    }

    // Keep-alive loop; all work happens on the component threads.
    while !shutdown.load(Ordering::SeqCst) {
        std::thread::sleep(Duration::from_millis(200));
    }

    info!("interrupt received, shutting down");
    monitor.stop()?;
    if let Some(listener) = listener {
        if let Err(e) = listener.stop() {
            warn!("listener did not stop cleanly: {}", e);
        }
    }
    info!("stopped");
    Ok(())
}

//! Platform backends for the input capabilities.
//!
//! Only Windows gets a real backend. On other hosts both constructors
//! return [`Error::NotSupported`] and the binary degrades: a
//! [`NullInjector`](crate::injector::NullInjector) stands in for
//! injection and the monitor runs without genuine-input cancellation.

use crate::error::Result;
use crate::injector::InputInjector;
use crate::listener::InputListener;
use std::sync::Arc;

#[cfg(target_os = "windows")]
mod windows;

/// The OS injection backend, if this platform has one.
#[cfg(target_os = "windows")]
pub fn system_injector() -> Result<Arc<dyn InputInjector>> {
    Ok(Arc::new(windows::SystemInjector::new()))
}

/// The OS input-listening backend, if this platform has one.
#[cfg(target_os = "windows")]
pub fn system_listener() -> Result<Box<dyn InputListener>> {
    Ok(Box::new(windows::SystemListener::new()))
}

#[cfg(not(target_os = "windows"))]
pub fn system_injector() -> Result<Arc<dyn InputInjector>> {
    Err(crate::error::Error::NotSupported(
        "no input injection backend for this platform".into(),
    ))
}

#[cfg(not(target_os = "windows"))]
pub fn system_listener() -> Result<Box<dyn InputListener>> {
    Err(crate::error::Error::NotSupported(
        "no input listening backend for this platform".into(),
    ))
}

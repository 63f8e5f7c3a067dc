//! Base serial session and the device handle it provides.
//!
//! The feature layer never opens or closes devices itself. It asks a
//! [`HandleProvider`] for the live handle at the start of every operation,
//! so a session that is closed and reopened keeps working with the new
//! handle.
//!
//! ```text
//! +------------------+  device_handle()  +------------------+
//! |   FastcomPort    | ----------------> |  HandleProvider  |
//! +------------------+                   +--------+---------+
//!                                                 |
//!                                   +-------------+-------------+
//!                                   |                           |
//!                          +--------+---------+      +----------+-------+
//!                          |   NativePort     |      |  DetachedHandle  |
//!                          |  (serialport)    |      | (fixed / tests)  |
//!                          +------------------+      +------------------+
//! ```

#[cfg(feature = "native")]
pub mod native;

use std::time::Duration;

use crate::control::DeviceHandle;

#[cfg(feature = "native")]
pub use native::NativePort;

/// Serial port configuration for the base session.
#[derive(Debug, Clone)]
pub struct SerialConfig {
    /// Port name/path (e.g., "COM3", "/dev/ttyS4").
    pub port_name: String,
    /// Baud rate.
    pub baud_rate: u32,
    /// Read/write timeout.
    pub timeout: Duration,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port_name: String::new(),
            baud_rate: 115200,
            timeout: Duration::from_millis(1000),
        }
    }
}

impl SerialConfig {
    /// Create a new configuration with port name and baud rate.
    pub fn new(port_name: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            port_name: port_name.into(),
            baud_rate,
            ..Default::default()
        }
    }

    /// Set the timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Source of the native handle of an open serial session.
///
/// This is the deliberate extension point through which a base serial
/// session exposes its OS handle to the feature layer.
pub trait HandleProvider {
    /// The current open handle, or `None` when the session is not open.
    fn device_handle(&self) -> Option<DeviceHandle>;
}

impl<P: HandleProvider + ?Sized> HandleProvider for &P {
    fn device_handle(&self) -> Option<DeviceHandle> {
        (**self).device_handle()
    }
}

impl<P: HandleProvider + ?Sized> HandleProvider for &mut P {
    fn device_handle(&self) -> Option<DeviceHandle> {
        (**self).device_handle()
    }
}

impl<P: HandleProvider + ?Sized> HandleProvider for Box<P> {
    fn device_handle(&self) -> Option<DeviceHandle> {
        (**self).device_handle()
    }
}

/// A provider holding a handle opened elsewhere.
///
/// Useful when the handle comes from another library, for dry runs against
/// the simulated driver, and for tests that need to close or swap handles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DetachedHandle {
    handle: Option<DeviceHandle>,
}

impl DetachedHandle {
    /// Provider for an open handle.
    #[must_use]
    pub const fn new(handle: DeviceHandle) -> Self {
        Self {
            handle: Some(handle),
        }
    }

    /// Provider with no open handle.
    #[must_use]
    pub const fn closed() -> Self {
        Self { handle: None }
    }

    /// Replace the handle, as after a reopen.
    pub fn replace(&mut self, handle: DeviceHandle) {
        self.handle = Some(handle);
    }

    /// Forget the handle, as after a close.
    pub fn close(&mut self) {
        self.handle = None;
    }
}

impl HandleProvider for DetachedHandle {
    fn device_handle(&self) -> Option<DeviceHandle> {
        self.handle
    }
}

//! Native base serial session using the `serialport` crate.
//!
//! The port is opened as the platform's concrete type (`COMPort` on Windows,
//! `TTYPort` elsewhere) so that its raw handle can be handed to the control
//! channel through `AsRawHandle` / `AsRawFd`.

#[cfg(unix)]
use std::os::unix::io::AsRawFd;
#[cfg(windows)]
use std::os::windows::io::AsRawHandle;
use {
    crate::{
        control::DeviceHandle,
        error::Result,
        port::{HandleProvider, SerialConfig},
    },
    log::debug,
    std::io::{Read, Write},
};

#[cfg(windows)]
type NativeSerial = serialport::COMPort;
#[cfg(unix)]
type NativeSerial = serialport::TTYPort;

/// Native serial session.
///
/// Byte I/O is delegated to the underlying port. The handle is looked up on
/// every [`HandleProvider::device_handle`] call, so [`NativePort::reopen`]
/// is picked up by the feature layer without rebuilding anything.
pub struct NativePort {
    port: Option<NativeSerial>,
    config: SerialConfig,
}

impl NativePort {
    /// Open a serial port with the given configuration.
    pub fn open(config: &SerialConfig) -> Result<Self> {
        let port = Self::open_native(config)?;
        Ok(Self {
            port: Some(port),
            config: config.clone(),
        })
    }

    /// Open a serial port with default settings.
    pub fn open_simple(port_name: &str, baud_rate: u32) -> Result<Self> {
        Self::open(&SerialConfig::new(port_name, baud_rate))
    }

    fn open_native(config: &SerialConfig) -> Result<NativeSerial> {
        debug!(
            "Opening {} at {} baud",
            config.port_name, config.baud_rate
        );
        let port = serialport::new(&config.port_name, config.baud_rate)
            .timeout(config.timeout)
            .open_native()?;
        Ok(port)
    }

    /// Close and open the port again with the same configuration.
    ///
    /// The OS handle usually changes across a reopen.
    pub fn reopen(&mut self) -> Result<()> {
        self.close();
        self.port = Some(Self::open_native(&self.config)?);
        Ok(())
    }

    /// Close the port. Feature calls fail with `HandleUnavailable` afterwards.
    pub fn close(&mut self) {
        if self
            .port
            .take()
            .is_some()
        {
            debug!("Closed {}", self.config.port_name);
        }
    }

    /// Whether the port is open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.port.is_some()
    }

    /// Port name/path.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.config.port_name
    }

    /// Configuration used to open the port.
    #[must_use]
    pub fn config(&self) -> &SerialConfig {
        &self.config
    }
}

impl HandleProvider for NativePort {
    #[cfg(windows)]
    fn device_handle(&self) -> Option<DeviceHandle> {
        self.port
            .as_ref()
            .map(|p| DeviceHandle::from_raw(p.as_raw_handle() as isize))
    }

    #[cfg(unix)]
    fn device_handle(&self) -> Option<DeviceHandle> {
        self.port
            .as_ref()
            .map(|p| DeviceHandle::from_raw(p.as_raw_fd() as isize))
    }
}

impl Read for NativePort {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.port
            .as_mut()
            .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::NotConnected, "port closed"))
            .and_then(|p| p.read(buf))
    }
}

impl Write for NativePort {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.port
            .as_mut()
            .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::NotConnected, "port closed"))
            .and_then(|p| p.write(buf))
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.port
            .as_mut()
            .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::NotConnected, "port closed"))
            .and_then(std::io::Write::flush)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_open_missing_port_fails() {
        let result = NativePort::open_simple("/dev/serialfc-does-not-exist", 115200);
        assert!(matches!(result, Err(Error::Serial(_))));
    }
}

//! Command implementations.
//!
//! Each subcommand family lives in its own module. Commands that talk to
//! an adapter share [`open_session`].

pub(crate) mod completions;
pub(crate) mod feature;
pub(crate) mod profile;

use {
    anyhow::{Context, Result},
    log::debug,
    serialfc::{
        ControlChannel, DetachedHandle, DeviceHandle, FastcomPort, HandleProvider, SimulatedDriver,
    },
};

/// Feature session used by the CLI, independent of the backend.
pub(crate) type Session = FastcomPort<Box<dyn HandleProvider>, Box<dyn ControlChannel>>;

/// Handle value reported for dry runs.
const DRY_RUN_HANDLE: isize = 0x5FC;

/// Where and how to reach the adapter.
#[derive(Debug, Clone)]
pub(crate) struct SessionOptions {
    /// Port name, from the command line, environment or config.
    pub port: Option<String>,
    /// Baud rate for the base session.
    pub baud: u32,
    /// Use the simulated driver instead of hardware.
    pub dry_run: bool,
}

impl SessionOptions {
    /// Label for messages.
    pub fn target(&self) -> String {
        if self.dry_run {
            "simulated adapter".to_string()
        } else {
            self.port
                .clone()
                .unwrap_or_default()
        }
    }
}

/// Open a feature session for the selected port.
pub(crate) fn open_session(opts: &SessionOptions) -> Result<Session> {
    if opts.dry_run {
        debug!("Dry run: using the simulated driver");
        let provider = DetachedHandle::new(DeviceHandle::from_raw(DRY_RUN_HANDLE));
        return Ok(FastcomPort::new(
            Box::new(provider),
            Box::new(SimulatedDriver::new()),
        ));
    }

    let Some(port) = opts.port.as_deref() else {
        anyhow::bail!(
            "No serial port specified. Use --port, set SERIALFC_PORT, or add [port] name to the config file"
        );
    };

    let channel = native_channel()?;
    let provider = open_native_port(port, opts.baud)?;
    Ok(FastcomPort::new(provider, channel))
}

#[cfg(windows)]
fn native_channel() -> Result<Box<dyn ControlChannel>> {
    Ok(Box::new(serialfc::IoctlChannel::new()))
}

#[cfg(not(windows))]
fn native_channel() -> Result<Box<dyn ControlChannel>> {
    Err(serialfc::Error::Unsupported(
        "SerialFC driver control is only available on Windows (try --dry-run)".to_string(),
    )
    .into())
}

fn open_native_port(port: &str, baud: u32) -> Result<Box<dyn HandleProvider>> {
    let native = serialfc::NativePort::open_simple(port, baud)
        .with_context(|| format!("Failed to open serial port {port}"))?;
    debug!("Opened {port} at {baud} baud");
    Ok(Box::new(native))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dry_run_session_has_handle() {
        let opts = SessionOptions {
            port: None,
            baud: 115200,
            dry_run: true,
        };
        let mut session = open_session(&opts).unwrap();
        assert!(
            session
                .provider()
                .device_handle()
                .is_some()
        );
        assert!(!session.rs485().unwrap());
    }

    #[test]
    fn test_missing_port_is_an_error() {
        let opts = SessionOptions {
            port: None,
            baud: 115200,
            dry_run: false,
        };
        let err = open_session(&opts).err().unwrap();
        assert!(
            err.to_string()
                .contains("No serial port")
        );
    }

    #[test]
    fn test_target_label() {
        let opts = SessionOptions {
            port: Some("COM7".to_string()),
            baud: 9600,
            dry_run: false,
        };
        assert_eq!(opts.target(), "COM7");
        let dry = SessionOptions {
            dry_run: true,
            ..opts
        };
        assert_eq!(dry.target(), "simulated adapter");
    }
}

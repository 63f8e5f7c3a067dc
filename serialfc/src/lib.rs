//! # serialfc
//!
//! A library for controlling the hardware features of SerialFC (Fastcom)
//! multiport serial adapters.
//!
//! The adapters expose features that a plain serial port does not: RS-485
//! transceiver mode, echo cancellation, line termination, UART sample rate,
//! FIFO trigger levels, clock rate, isochronous mode, external transmit,
//! frame length, 9-bit mode and a fixed baud rate. They are driven by
//! device-specific control calls on the handle of an already open port.
//!
//! - [`control`]: control operations, payload encoding and result-code
//!   translation, plus the Windows I/O control channel and a simulated driver
//! - [`feature`]: the feature registry and driver value types
//! - [`fastcom`]: [`FastcomPort`], one accessor per feature
//! - [`port`]: the base serial session that supplies the device handle
//!
//! ## Features
//!
//! - `native` (default): native base session via the `serialport` crate
//! - `serde`: serialization support for feature value types
//!
//! ## Example
//!
//! ```rust
//! use serialfc::{DetachedHandle, DeviceHandle, FastcomPort, IsochronousMode, SimulatedDriver};
//!
//! fn main() -> serialfc::Result<()> {
//!     // Dry run against the simulated driver
//!     let provider = DetachedHandle::new(DeviceHandle::from_raw(0x10));
//!     let mut port = FastcomPort::new(provider, SimulatedDriver::new());
//!
//!     port.set_rs485(true)?;
//!     port.enable_isochronous(3)?;
//!
//!     assert!(port.rs485()?);
//!     assert_eq!(port.isochronous()?, IsochronousMode::Enabled(3));
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod control;
pub mod error;
pub mod fastcom;
pub mod feature;
pub mod port;

// Re-exports for convenience
#[cfg(windows)]
pub use control::IoctlChannel;
#[cfg(feature = "native")]
pub use port::NativePort;
pub use {
    control::{
        ControlChannel, DeviceHandle, Operation, Payload, PayloadKind, Reply, SimulatedDriver,
        check, is_failure, translate,
    },
    error::{Error, Result},
    fastcom::{FastcomPort, FeatureSnapshot},
    feature::{
        CardType, ExternalTransmit, Feature, FixedBaudRate, IsochronousMode, Mode, Setting, Shape,
        Toggle,
    },
    port::{DetachedHandle, HandleProvider, SerialConfig},
};

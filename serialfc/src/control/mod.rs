//! Control channel to the SerialFC driver.
//!
//! Every hardware feature is reached through a single calling convention:
//! an [`Operation`] is issued against an open [`DeviceHandle`] with an
//! optional input [`Payload`], and the driver answers with a signed result
//! code plus, for queries, an output payload.
//!
//! ```text
//! +--------------+   Operation + Payload   +----------------+
//! | FastcomPort  | ----------------------> | ControlChannel |
//! |  (features)  | <---------------------- | (ioctl / sim)  |
//! +--------------+      Reply { code }     +----------------+
//! ```
//!
//! On Windows the operations are device I/O controls built with
//! `CTL_CODE(0x8019, function, METHOD_BUFFERED, FILE_ANY_ACCESS)`.

#[cfg(windows)]
pub mod ioctl;
pub mod sim;
pub mod translate;

use std::fmt;

use byteorder::{ByteOrder, NativeEndian};

use crate::error::{Error, Result};

#[cfg(windows)]
pub use ioctl::IoctlChannel;
pub use sim::{Call, SimulatedDriver};
pub use translate::{check, is_failure, translate};

/// Device type used by the driver for its control codes.
pub const SERIALFC_IOCTL_MAGIC: u32 = 0x8019;

const METHOD_BUFFERED: u32 = 0;
const FILE_ANY_ACCESS: u32 = 0;

/// Build a Windows device I/O control code.
#[must_use]
pub const fn ctl_code(device_type: u32, function: u32, method: u32, access: u32) -> u32 {
    (device_type << 16) | (access << 14) | (function << 2) | method
}

/// Opaque reference to an open serial device.
///
/// The value is the platform's raw handle (a `HANDLE` on Windows, a file
/// descriptor elsewhere). It is borrowed for the duration of one call and
/// never closed or duplicated by this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceHandle(isize);

impl DeviceHandle {
    /// Wrap a raw platform handle value.
    #[must_use]
    pub const fn from_raw(raw: isize) -> Self {
        Self(raw)
    }

    /// The raw platform handle value.
    #[must_use]
    pub const fn as_raw(self) -> isize {
        self.0
    }
}

impl fmt::Display for DeviceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Driver control operations.
///
/// The discriminant is the function number inside the driver's control code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Operation {
    /// Put the transceiver into RS-485 mode (0x800).
    EnableRs485 = 0x800,
    /// Take the transceiver out of RS-485 mode (0x801).
    DisableRs485 = 0x801,
    /// Query RS-485 mode (0x802).
    GetRs485 = 0x802,
    /// Turn echo cancellation on (0x803).
    EnableEchoCancel = 0x803,
    /// Turn echo cancellation off (0x804).
    DisableEchoCancel = 0x804,
    /// Query echo cancellation (0x805).
    GetEchoCancel = 0x805,
    /// Turn line termination on (0x806).
    EnableTermination = 0x806,
    /// Turn line termination off (0x807).
    DisableTermination = 0x807,
    /// Query line termination (0x808).
    GetTermination = 0x808,
    /// Set the UART sample rate (0x809).
    SetSampleRate = 0x809,
    /// Query the UART sample rate (0x80A).
    GetSampleRate = 0x80A,
    /// Set the transmit FIFO trigger level (0x80B).
    SetTxTrigger = 0x80B,
    /// Query the transmit FIFO trigger level (0x80C).
    GetTxTrigger = 0x80C,
    /// Set the receive FIFO trigger level (0x80D).
    SetRxTrigger = 0x80D,
    /// Query the receive FIFO trigger level (0x80E).
    GetRxTrigger = 0x80E,
    /// Set the clock generator rate in Hz (0x80F). Write-only.
    SetClockRate = 0x80F,
    /// Enable isochronous mode with a driver-defined mode selector (0x810).
    EnableIsochronous = 0x810,
    /// Disable isochronous mode (0x811).
    DisableIsochronous = 0x811,
    /// Query isochronous mode (0x812).
    GetIsochronous = 0x812,
    /// Enable external transmit with a character count (0x813).
    EnableExternalTransmit = 0x813,
    /// Disable external transmit (0x814).
    DisableExternalTransmit = 0x814,
    /// Query external transmit (0x815).
    GetExternalTransmit = 0x815,
    /// Set the number of characters per frame (0x816).
    SetFrameLength = 0x816,
    /// Query the number of characters per frame (0x817).
    GetFrameLength = 0x817,
    /// Query the adapter family (0x818).
    GetCardType = 0x818,
    /// Turn 9-bit mode on (0x819).
    EnableNineBit = 0x819,
    /// Turn 9-bit mode off (0x81A).
    DisableNineBit = 0x81A,
    /// Query 9-bit mode (0x81B).
    GetNineBit = 0x81B,
    /// Lock the port to a fixed baud rate (0x81C).
    EnableFixedBaudRate = 0x81C,
    /// Release the fixed baud rate (0x81D).
    DisableFixedBaudRate = 0x81D,
    /// Query the fixed baud rate (0x81E).
    GetFixedBaudRate = 0x81E,
}

impl Operation {
    /// Every operation, in function-number order.
    pub const ALL: [Self; 31] = [
        Self::EnableRs485,
        Self::DisableRs485,
        Self::GetRs485,
        Self::EnableEchoCancel,
        Self::DisableEchoCancel,
        Self::GetEchoCancel,
        Self::EnableTermination,
        Self::DisableTermination,
        Self::GetTermination,
        Self::SetSampleRate,
        Self::GetSampleRate,
        Self::SetTxTrigger,
        Self::GetTxTrigger,
        Self::SetRxTrigger,
        Self::GetRxTrigger,
        Self::SetClockRate,
        Self::EnableIsochronous,
        Self::DisableIsochronous,
        Self::GetIsochronous,
        Self::EnableExternalTransmit,
        Self::DisableExternalTransmit,
        Self::GetExternalTransmit,
        Self::SetFrameLength,
        Self::GetFrameLength,
        Self::GetCardType,
        Self::EnableNineBit,
        Self::DisableNineBit,
        Self::GetNineBit,
        Self::EnableFixedBaudRate,
        Self::DisableFixedBaudRate,
        Self::GetFixedBaudRate,
    ];

    /// Function number inside the control code.
    #[must_use]
    pub const fn function(self) -> u32 {
        self as u32
    }

    /// Full device I/O control code.
    #[must_use]
    pub const fn code(self) -> u32 {
        ctl_code(
            SERIALFC_IOCTL_MAGIC,
            self.function(),
            METHOD_BUFFERED,
            FILE_ANY_ACCESS,
        )
    }

    /// Shape of the input payload the operation takes.
    #[must_use]
    pub const fn input_kind(self) -> PayloadKind {
        match self {
            Self::SetSampleRate
            | Self::SetTxTrigger
            | Self::SetRxTrigger
            | Self::SetClockRate
            | Self::EnableIsochronous
            | Self::EnableExternalTransmit
            | Self::SetFrameLength
            | Self::EnableFixedBaudRate => PayloadKind::Value,
            _ => PayloadKind::None,
        }
    }

    /// Shape of the output payload the operation produces.
    #[must_use]
    pub const fn output_kind(self) -> PayloadKind {
        match self {
            Self::GetRs485 | Self::GetEchoCancel | Self::GetTermination | Self::GetNineBit => {
                PayloadKind::Flag
            },
            Self::GetSampleRate
            | Self::GetTxTrigger
            | Self::GetRxTrigger
            | Self::GetExternalTransmit
            | Self::GetFrameLength
            | Self::GetCardType => PayloadKind::Value,
            Self::GetIsochronous | Self::GetFixedBaudRate => PayloadKind::Signed,
            _ => PayloadKind::None,
        }
    }

    /// Whether this operation only reads driver state.
    #[must_use]
    pub const fn is_query(self) -> bool {
        !matches!(self.output_kind(), PayloadKind::None)
    }

    /// Driver-style name of the operation.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::EnableRs485 => "ENABLE_RS485",
            Self::DisableRs485 => "DISABLE_RS485",
            Self::GetRs485 => "GET_RS485",
            Self::EnableEchoCancel => "ENABLE_ECHO_CANCEL",
            Self::DisableEchoCancel => "DISABLE_ECHO_CANCEL",
            Self::GetEchoCancel => "GET_ECHO_CANCEL",
            Self::EnableTermination => "ENABLE_TERMINATION",
            Self::DisableTermination => "DISABLE_TERMINATION",
            Self::GetTermination => "GET_TERMINATION",
            Self::SetSampleRate => "SET_SAMPLE_RATE",
            Self::GetSampleRate => "GET_SAMPLE_RATE",
            Self::SetTxTrigger => "SET_TX_TRIGGER",
            Self::GetTxTrigger => "GET_TX_TRIGGER",
            Self::SetRxTrigger => "SET_RX_TRIGGER",
            Self::GetRxTrigger => "GET_RX_TRIGGER",
            Self::SetClockRate => "SET_CLOCK_RATE",
            Self::EnableIsochronous => "ENABLE_ISOCHRONOUS",
            Self::DisableIsochronous => "DISABLE_ISOCHRONOUS",
            Self::GetIsochronous => "GET_ISOCHRONOUS",
            Self::EnableExternalTransmit => "ENABLE_EXTERNAL_TRANSMIT",
            Self::DisableExternalTransmit => "DISABLE_EXTERNAL_TRANSMIT",
            Self::GetExternalTransmit => "GET_EXTERNAL_TRANSMIT",
            Self::SetFrameLength => "SET_FRAME_LENGTH",
            Self::GetFrameLength => "GET_FRAME_LENGTH",
            Self::GetCardType => "GET_CARD_TYPE",
            Self::EnableNineBit => "ENABLE_9BIT",
            Self::DisableNineBit => "DISABLE_9BIT",
            Self::GetNineBit => "GET_9BIT",
            Self::EnableFixedBaudRate => "ENABLE_FIXED_BAUD_RATE",
            Self::DisableFixedBaudRate => "DISABLE_FIXED_BAUD_RATE",
            Self::GetFixedBaudRate => "GET_FIXED_BAUD_RATE",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Payload shape of an operation's input or output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    /// No payload.
    None,
    /// Boolean status (a 4-byte `BOOL` on the wire).
    Flag,
    /// Unsigned 32-bit value.
    Value,
    /// Signed 32-bit value (negative values are driver sentinels).
    Signed,
}

impl PayloadKind {
    /// Buffer size in bytes.
    #[must_use]
    pub const fn size(self) -> usize {
        match self {
            Self::None => 0,
            Self::Flag | Self::Value | Self::Signed => 4,
        }
    }
}

/// Input or output data of a control call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Payload {
    /// No data.
    #[default]
    None,
    /// Boolean status.
    Flag(bool),
    /// Unsigned value.
    Value(u32),
    /// Signed value.
    Signed(i32),
}

impl Payload {
    /// Shape of this payload.
    #[must_use]
    pub const fn kind(&self) -> PayloadKind {
        match self {
            Self::None => PayloadKind::None,
            Self::Flag(_) => PayloadKind::Flag,
            Self::Value(_) => PayloadKind::Value,
            Self::Signed(_) => PayloadKind::Signed,
        }
    }

    /// Encode into the native-endian buffer handed to the driver.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = vec![0u8; self.kind().size()];
        match *self {
            Self::None => {},
            Self::Flag(flag) => NativeEndian::write_u32(&mut buf, u32::from(flag)),
            Self::Value(value) => NativeEndian::write_u32(&mut buf, value),
            Self::Signed(value) => NativeEndian::write_i32(&mut buf, value),
        }
        buf
    }

    /// Decode a driver output buffer of the given shape.
    pub fn decode(kind: PayloadKind, buf: &[u8]) -> Result<Self> {
        if buf.len() < kind.size() {
            return Err(Error::InvalidValue(format!(
                "expected {} output bytes, driver returned {}",
                kind.size(),
                buf.len()
            )));
        }

        Ok(match kind {
            PayloadKind::None => Self::None,
            PayloadKind::Flag => Self::Flag(NativeEndian::read_u32(buf) != 0),
            PayloadKind::Value => Self::Value(NativeEndian::read_u32(buf)),
            PayloadKind::Signed => Self::Signed(NativeEndian::read_i32(buf)),
        })
    }
}

/// Raw answer from a control channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reply {
    /// Driver result code; `>= 1` means failure.
    pub code: i32,
    /// Output payload, meaningful only on success.
    pub payload: Payload,
}

impl Reply {
    /// Successful reply carrying `payload`.
    #[must_use]
    pub const fn ok(payload: Payload) -> Self {
        Self { code: 0, payload }
    }

    /// Successful reply decoded from the bytes a channel received for `op`.
    ///
    /// An output shorter than the operation's payload yields
    /// [`Payload::None`], which the typed accessors reject as an invalid value.
    #[must_use]
    pub fn from_output(op: Operation, output: &[u8]) -> Self {
        match Payload::decode(op.output_kind(), output) {
            Ok(payload) => Self::ok(payload),
            Err(e) => {
                log::debug!("{op}: {e}");
                Self::ok(Payload::None)
            },
        }
    }

    /// Failed reply with a driver code.
    #[must_use]
    pub const fn failed(code: i32) -> Self {
        Self {
            code,
            payload: Payload::None,
        }
    }
}

/// A channel able to issue driver control operations.
///
/// Implementations perform exactly one call per invocation: no retries and
/// no validation beyond the payload type. A successful enable/disable/set
/// may immediately change the electrical or timing behavior of the port.
pub trait ControlChannel {
    /// Issue `op` against `handle` with `input` and return the raw reply.
    fn call(&mut self, handle: DeviceHandle, op: Operation, input: Payload) -> Reply;
}

impl<C: ControlChannel + ?Sized> ControlChannel for &mut C {
    fn call(&mut self, handle: DeviceHandle, op: Operation, input: Payload) -> Reply {
        (**self).call(handle, op, input)
    }
}

impl<C: ControlChannel + ?Sized> ControlChannel for Box<C> {
    fn call(&mut self, handle: DeviceHandle, op: Operation, input: Payload) -> Reply {
        (**self).call(handle, op, input)
    }
}

//! Feature registry.
//!
//! Each hardware feature exposed by the driver has one of a few shapes, and
//! each shape maps to a fixed set of control operations:
//!
//! | Shape      | Features                                     | Operations              |
//! |------------|----------------------------------------------|-------------------------|
//! | [`Toggle`] | RS-485, echo cancel, termination, 9-bit      | enable / disable / get  |
//! | [`Setting`]| sample rate, TX/RX trigger, frame length     | set / get               |
//! | write-only | clock rate                                   | set                     |
//! | [`Mode`]   | isochronous, external transmit, fixed baud   | enable(arg) / disable / get |
//! | read-only  | card type                                    | get                     |

use std::fmt;
use std::str::FromStr;

use crate::control::Operation;
use crate::error::Error;

/// Boolean features, switched through two distinct operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Toggle {
    /// RS-485 transceiver mode.
    Rs485,
    /// Echo cancellation (independent of RS-485 mode).
    EchoCancel,
    /// Line termination.
    Termination,
    /// 9-bit character mode.
    NineBit,
}

impl Toggle {
    /// Every toggle.
    pub const ALL: [Self; 4] = [Self::Rs485, Self::EchoCancel, Self::Termination, Self::NineBit];

    /// Operation that turns the feature on.
    #[must_use]
    pub const fn enable_op(self) -> Operation {
        match self {
            Self::Rs485 => Operation::EnableRs485,
            Self::EchoCancel => Operation::EnableEchoCancel,
            Self::Termination => Operation::EnableTermination,
            Self::NineBit => Operation::EnableNineBit,
        }
    }

    /// Operation that turns the feature off.
    #[must_use]
    pub const fn disable_op(self) -> Operation {
        match self {
            Self::Rs485 => Operation::DisableRs485,
            Self::EchoCancel => Operation::DisableEchoCancel,
            Self::Termination => Operation::DisableTermination,
            Self::NineBit => Operation::DisableNineBit,
        }
    }

    /// Operation that reads the feature.
    #[must_use]
    pub const fn get_op(self) -> Operation {
        match self {
            Self::Rs485 => Operation::GetRs485,
            Self::EchoCancel => Operation::GetEchoCancel,
            Self::Termination => Operation::GetTermination,
            Self::NineBit => Operation::GetNineBit,
        }
    }

    /// Enable or disable operation, chosen by `enabled`.
    #[must_use]
    pub const fn set_op(self, enabled: bool) -> Operation {
        if enabled {
            self.enable_op()
        } else {
            self.disable_op()
        }
    }

    /// The feature this toggle belongs to.
    #[must_use]
    pub const fn feature(self) -> Feature {
        match self {
            Self::Rs485 => Feature::Rs485,
            Self::EchoCancel => Feature::EchoCancel,
            Self::Termination => Feature::Termination,
            Self::NineBit => Feature::NineBit,
        }
    }
}

/// Numeric features with a matching query.
///
/// No valid range is enforced here; the driver validates values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Setting {
    /// UART sample rate.
    SampleRate,
    /// Transmit FIFO trigger level.
    TxTrigger,
    /// Receive FIFO trigger level.
    RxTrigger,
    /// Characters per frame.
    FrameLength,
}

impl Setting {
    /// Every setting.
    pub const ALL: [Self; 4] = [
        Self::SampleRate,
        Self::TxTrigger,
        Self::RxTrigger,
        Self::FrameLength,
    ];

    /// Operation that writes the value.
    #[must_use]
    pub const fn set_op(self) -> Operation {
        match self {
            Self::SampleRate => Operation::SetSampleRate,
            Self::TxTrigger => Operation::SetTxTrigger,
            Self::RxTrigger => Operation::SetRxTrigger,
            Self::FrameLength => Operation::SetFrameLength,
        }
    }

    /// Operation that reads the value.
    #[must_use]
    pub const fn get_op(self) -> Operation {
        match self {
            Self::SampleRate => Operation::GetSampleRate,
            Self::TxTrigger => Operation::GetTxTrigger,
            Self::RxTrigger => Operation::GetRxTrigger,
            Self::FrameLength => Operation::GetFrameLength,
        }
    }

    /// The feature this setting belongs to.
    #[must_use]
    pub const fn feature(self) -> Feature {
        match self {
            Self::SampleRate => Feature::SampleRate,
            Self::TxTrigger => Feature::TxTrigger,
            Self::RxTrigger => Feature::RxTrigger,
            Self::FrameLength => Feature::FrameLength,
        }
    }
}

/// Features enabled with an argument and disabled without one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Isochronous mode; the argument is a driver-defined mode selector.
    Isochronous,
    /// External transmit; the argument is a character count.
    ExternalTransmit,
    /// Fixed baud rate; the argument is the rate.
    FixedBaudRate,
}

impl Mode {
    /// Every mode feature.
    pub const ALL: [Self; 3] = [Self::Isochronous, Self::ExternalTransmit, Self::FixedBaudRate];

    /// Operation that enables the mode with an argument.
    #[must_use]
    pub const fn enable_op(self) -> Operation {
        match self {
            Self::Isochronous => Operation::EnableIsochronous,
            Self::ExternalTransmit => Operation::EnableExternalTransmit,
            Self::FixedBaudRate => Operation::EnableFixedBaudRate,
        }
    }

    /// Operation that disables the mode.
    #[must_use]
    pub const fn disable_op(self) -> Operation {
        match self {
            Self::Isochronous => Operation::DisableIsochronous,
            Self::ExternalTransmit => Operation::DisableExternalTransmit,
            Self::FixedBaudRate => Operation::DisableFixedBaudRate,
        }
    }

    /// Operation that reads the mode.
    #[must_use]
    pub const fn get_op(self) -> Operation {
        match self {
            Self::Isochronous => Operation::GetIsochronous,
            Self::ExternalTransmit => Operation::GetExternalTransmit,
            Self::FixedBaudRate => Operation::GetFixedBaudRate,
        }
    }

    /// The feature this mode belongs to.
    #[must_use]
    pub const fn feature(self) -> Feature {
        match self {
            Self::Isochronous => Feature::Isochronous,
            Self::ExternalTransmit => Feature::ExternalTransmit,
            Self::FixedBaudRate => Feature::FixedBaudRate,
        }
    }
}

/// Access pattern of a feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// Boolean enable/disable/get.
    Toggle(Toggle),
    /// Numeric set/get.
    Setting(Setting),
    /// Numeric set without a query (clock rate).
    WriteOnly,
    /// Enable with argument, disable, get.
    Mode(Mode),
    /// Query only (card type).
    ReadOnly,
}

/// Every feature of the adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    /// RS-485 transceiver mode.
    Rs485,
    /// Echo cancellation.
    EchoCancel,
    /// Line termination.
    Termination,
    /// 9-bit mode.
    NineBit,
    /// UART sample rate.
    SampleRate,
    /// Transmit FIFO trigger level.
    TxTrigger,
    /// Receive FIFO trigger level.
    RxTrigger,
    /// Characters per frame.
    FrameLength,
    /// Clock generator rate (write-only).
    ClockRate,
    /// Isochronous mode.
    Isochronous,
    /// External transmit.
    ExternalTransmit,
    /// Fixed baud rate.
    FixedBaudRate,
    /// Adapter family (read-only).
    CardType,
}

impl Feature {
    /// Every feature.
    pub const ALL: [Self; 13] = [
        Self::Rs485,
        Self::EchoCancel,
        Self::Termination,
        Self::NineBit,
        Self::SampleRate,
        Self::TxTrigger,
        Self::RxTrigger,
        Self::FrameLength,
        Self::ClockRate,
        Self::Isochronous,
        Self::ExternalTransmit,
        Self::FixedBaudRate,
        Self::CardType,
    ];

    /// Stable kebab-case name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Rs485 => "rs485",
            Self::EchoCancel => "echo-cancel",
            Self::Termination => "termination",
            Self::NineBit => "nine-bit",
            Self::SampleRate => "sample-rate",
            Self::TxTrigger => "tx-trigger",
            Self::RxTrigger => "rx-trigger",
            Self::FrameLength => "frame-length",
            Self::ClockRate => "clock-rate",
            Self::Isochronous => "isochronous",
            Self::ExternalTransmit => "external-transmit",
            Self::FixedBaudRate => "fixed-baud-rate",
            Self::CardType => "card-type",
        }
    }

    /// One-line description.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Rs485 => "RS-485 transceiver mode",
            Self::EchoCancel => "Echo cancellation",
            Self::Termination => "Line termination",
            Self::NineBit => "9-bit character mode",
            Self::SampleRate => "UART sample rate",
            Self::TxTrigger => "Transmit FIFO trigger level",
            Self::RxTrigger => "Receive FIFO trigger level",
            Self::FrameLength => "Characters per frame",
            Self::ClockRate => "Clock generator rate in Hz",
            Self::Isochronous => "Isochronous mode",
            Self::ExternalTransmit => "External transmit character count",
            Self::FixedBaudRate => "Fixed baud rate",
            Self::CardType => "Adapter family",
        }
    }

    /// Access pattern of this feature.
    #[must_use]
    pub const fn shape(self) -> Shape {
        match self {
            Self::Rs485 => Shape::Toggle(Toggle::Rs485),
            Self::EchoCancel => Shape::Toggle(Toggle::EchoCancel),
            Self::Termination => Shape::Toggle(Toggle::Termination),
            Self::NineBit => Shape::Toggle(Toggle::NineBit),
            Self::SampleRate => Shape::Setting(Setting::SampleRate),
            Self::TxTrigger => Shape::Setting(Setting::TxTrigger),
            Self::RxTrigger => Shape::Setting(Setting::RxTrigger),
            Self::FrameLength => Shape::Setting(Setting::FrameLength),
            Self::ClockRate => Shape::WriteOnly,
            Self::Isochronous => Shape::Mode(Mode::Isochronous),
            Self::ExternalTransmit => Shape::Mode(Mode::ExternalTransmit),
            Self::FixedBaudRate => Shape::Mode(Mode::FixedBaudRate),
            Self::CardType => Shape::ReadOnly,
        }
    }

    /// Whether the feature can be queried.
    #[must_use]
    pub const fn is_readable(self) -> bool {
        !matches!(self.shape(), Shape::WriteOnly)
    }

    /// Whether the feature can be changed.
    #[must_use]
    pub const fn is_writable(self) -> bool {
        !matches!(self.shape(), Shape::ReadOnly)
    }

    /// Control operations implementing this feature.
    #[must_use]
    pub fn operations(self) -> Vec<Operation> {
        match self.shape() {
            Shape::Toggle(t) => vec![t.enable_op(), t.disable_op(), t.get_op()],
            Shape::Setting(s) => vec![s.set_op(), s.get_op()],
            Shape::WriteOnly => vec![Operation::SetClockRate],
            Shape::Mode(m) => vec![m.enable_op(), m.disable_op(), m.get_op()],
            Shape::ReadOnly => vec![Operation::GetCardType],
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Feature {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('_', "-");
        let normalized = match normalized.as_str() {
            "rs-485" => "rs485",
            "9bit" | "9-bit" | "ninebit" => "nine-bit",
            other => other,
        }
        .to_string();

        Self::ALL
            .into_iter()
            .find(|f| f.name() == normalized)
            .ok_or_else(|| Error::InvalidValue(format!("unknown feature '{s}'")))
    }
}

/// Isochronous mode as reported by the driver.
///
/// The driver encodes "disabled" as `-1`; any negative value is read as
/// disabled. Mode selectors are passed through uninterpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum IsochronousMode {
    /// Isochronous mode is off.
    Disabled,
    /// Isochronous mode is on with the given selector.
    Enabled(u32),
}

impl IsochronousMode {
    /// Driver sentinel for "disabled".
    pub const DISABLED: i32 = -1;

    /// Decode the driver's signed mode indicator.
    #[must_use]
    pub fn from_raw(raw: i32) -> Self {
        u32::try_from(raw).map_or(Self::Disabled, Self::Enabled)
    }

    /// Driver encoding of this mode.
    #[must_use]
    pub fn raw(self) -> i32 {
        match self {
            Self::Disabled => Self::DISABLED,
            Self::Enabled(mode) => i32::try_from(mode).unwrap_or(i32::MAX),
        }
    }

    /// Mode selector, if enabled.
    #[must_use]
    pub const fn mode(self) -> Option<u32> {
        match self {
            Self::Disabled => None,
            Self::Enabled(mode) => Some(mode),
        }
    }
}

impl fmt::Display for IsochronousMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabled => write!(f, "disabled"),
            Self::Enabled(mode) => write!(f, "mode {mode}"),
        }
    }
}

/// External transmit state; a count of 0 means disabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ExternalTransmit {
    /// External transmit is off.
    Disabled,
    /// Characters sent per external signal.
    Enabled(u32),
}

impl ExternalTransmit {
    /// Driver encoding of "disabled".
    pub const DISABLED: u32 = 0;

    /// Decode the driver's character count.
    #[must_use]
    pub const fn from_count(count: u32) -> Self {
        if count == Self::DISABLED {
            Self::Disabled
        } else {
            Self::Enabled(count)
        }
    }

    /// Character count (0 when disabled).
    #[must_use]
    pub const fn count(self) -> u32 {
        match self {
            Self::Disabled => Self::DISABLED,
            Self::Enabled(count) => count,
        }
    }
}

impl fmt::Display for ExternalTransmit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabled => write!(f, "disabled"),
            Self::Enabled(count) => write!(f, "{count} characters"),
        }
    }
}

/// Fixed baud rate state; the driver reports `-1` when disabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum FixedBaudRate {
    /// The port follows the requested baud rate.
    Disabled,
    /// The port is locked to this rate.
    Enabled(u32),
}

impl FixedBaudRate {
    /// Driver sentinel for "disabled".
    pub const DISABLED: i32 = -1;

    /// Decode the driver's signed rate.
    #[must_use]
    pub fn from_raw(raw: i32) -> Self {
        u32::try_from(raw).map_or(Self::Disabled, Self::Enabled)
    }
}

impl fmt::Display for FixedBaudRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabled => write!(f, "disabled"),
            Self::Enabled(rate) => write!(f, "{rate} baud"),
        }
    }
}

/// Adapter family reported by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum CardType {
    /// Async-PCI family.
    Pci,
    /// Async-PCIe family.
    Pcie,
    /// FSCC family (asynchronous ports).
    Fscc,
    /// Unrecognized adapter.
    Unknown,
}

impl CardType {
    /// Decode the driver's card type value.
    #[must_use]
    pub const fn from_raw(raw: u32) -> Self {
        match raw {
            0 => Self::Pci,
            1 => Self::Pcie,
            2 => Self::Fscc,
            _ => Self::Unknown,
        }
    }

    /// Driver encoding of this card type.
    #[must_use]
    pub const fn raw(self) -> u32 {
        match self {
            Self::Pci => 0,
            Self::Pcie => 1,
            Self::Fscc => 2,
            Self::Unknown => 3,
        }
    }
}

impl fmt::Display for CardType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pci => write!(f, "Async-PCI"),
            Self::Pcie => write!(f, "Async-PCIe"),
            Self::Fscc => write!(f, "FSCC"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_dispatches_to_two_operations() {
        assert_eq!(Toggle::Rs485.set_op(true), Operation::EnableRs485);
        assert_eq!(Toggle::Rs485.set_op(false), Operation::DisableRs485);
        assert_eq!(Toggle::EchoCancel.set_op(false), Operation::DisableEchoCancel);
        assert_eq!(Toggle::NineBit.get_op(), Operation::GetNineBit);
    }

    #[test]
    fn test_every_operation_belongs_to_one_feature() {
        let mut ops: Vec<Operation> = Feature::ALL
            .iter()
            .flat_map(|f| f.operations())
            .collect();
        assert_eq!(ops.len(), Operation::ALL.len());
        ops.sort_by_key(|op| op.function());
        assert_eq!(ops, Operation::ALL.to_vec());
    }

    #[test]
    fn test_clock_rate_is_write_only() {
        assert!(!Feature::ClockRate.is_readable());
        assert!(Feature::ClockRate.is_writable());
        assert_eq!(Feature::ClockRate.operations(), vec![Operation::SetClockRate]);
        assert!(!Feature::CardType.is_writable());
    }

    #[test]
    fn test_feature_from_str() {
        assert_eq!("rs485".parse::<Feature>().ok(), Some(Feature::Rs485));
        assert_eq!("RS-485".parse::<Feature>().ok(), Some(Feature::Rs485));
        assert_eq!("echo_cancel".parse::<Feature>().ok(), Some(Feature::EchoCancel));
        assert_eq!("9bit".parse::<Feature>().ok(), Some(Feature::NineBit));
        assert!("baud".parse::<Feature>().is_err());

        for feature in Feature::ALL {
            assert_eq!(feature.name().parse::<Feature>().ok(), Some(feature));
            assert!(!feature.description().is_empty());
        }
    }

    #[test]
    fn test_isochronous_sentinel() {
        assert_eq!(IsochronousMode::from_raw(-1), IsochronousMode::Disabled);
        assert_eq!(IsochronousMode::from_raw(-7), IsochronousMode::Disabled);
        assert_eq!(IsochronousMode::from_raw(3), IsochronousMode::Enabled(3));
        assert_eq!(IsochronousMode::Disabled.raw(), -1);
        assert_eq!(IsochronousMode::Enabled(0).mode(), Some(0));
    }

    #[test]
    fn test_external_transmit_zero_is_disabled() {
        assert_eq!(ExternalTransmit::from_count(0), ExternalTransmit::Disabled);
        assert_eq!(ExternalTransmit::from_count(4).count(), 4);
    }

    #[test]
    fn test_card_type_raw() {
        assert_eq!(CardType::from_raw(2), CardType::Fscc);
        assert_eq!(CardType::from_raw(99), CardType::Unknown);
        assert_eq!(CardType::Pcie.to_string(), "Async-PCIe");
    }
}

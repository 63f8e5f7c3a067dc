//! Feature accessors on top of a base serial session.
//!
//! [`FastcomPort`] combines a [`HandleProvider`] (the open serial session)
//! with a [`ControlChannel`] and exposes one accessor per feature. Every
//! accessor is a single driver round-trip: nothing is cached, and a failure
//! is returned immediately without retrying.
//!
//! ## Example
//!
//! ```rust,no_run
//! # #[cfg(all(windows, feature = "native"))]
//! # fn main() -> serialfc::Result<()> {
//! use serialfc::{FastcomPort, NativePort};
//!
//! let mut port = FastcomPort::native(NativePort::open_simple("COM3", 115200)?);
//! port.set_rs485(true)?;
//! port.set_echo_cancel(true)?;
//! port.set_rx_trigger(32)?;
//! println!("RS-485: {}", port.rs485()?);
//! # Ok(())
//! # }
//! # #[cfg(not(all(windows, feature = "native")))]
//! # fn main() {}
//! ```

use log::trace;

use crate::{
    control::{
        ControlChannel, DeviceHandle, Operation, Payload,
        translate::{into_flag, into_signed, into_value, translate_for},
    },
    error::{Error, Result},
    feature::{CardType, ExternalTransmit, FixedBaudRate, IsochronousMode, Mode, Setting, Toggle},
    port::HandleProvider,
};

/// A serial session with SerialFC feature control.
pub struct FastcomPort<P, C> {
    provider: P,
    channel: C,
}

#[cfg(all(windows, feature = "native"))]
impl<P: HandleProvider> FastcomPort<P, crate::control::IoctlChannel> {
    /// Control features of `provider` through the driver's I/O controls.
    pub fn native(provider: P) -> Self {
        Self::new(provider, crate::control::IoctlChannel::new())
    }
}

impl<P: HandleProvider, C: ControlChannel> FastcomPort<P, C> {
    /// Combine a base session with a control channel.
    pub fn new(provider: P, channel: C) -> Self {
        Self { provider, channel }
    }

    /// The base serial session.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Mutable access to the base serial session (I/O, reopen, ...).
    pub fn provider_mut(&mut self) -> &mut P {
        &mut self.provider
    }

    /// The control channel.
    pub fn channel(&self) -> &C {
        &self.channel
    }

    /// Mutable access to the control channel.
    pub fn channel_mut(&mut self) -> &mut C {
        &mut self.channel
    }

    /// Split back into session and channel.
    pub fn into_parts(self) -> (P, C) {
        (self.provider, self.channel)
    }

    fn handle(&self) -> Result<DeviceHandle> {
        self.provider
            .device_handle()
            .ok_or(Error::HandleUnavailable)
    }

    /// Issue one operation and translate its reply.
    pub fn execute(&mut self, op: Operation, input: Payload) -> Result<Payload> {
        let handle = self.handle()?;
        trace!("{op} on {handle} with {input:?}");
        let reply = self
            .channel
            .call(handle, op, input);
        translate_for(op, reply)
    }

    fn command(&mut self, op: Operation, input: Payload) -> Result<()> {
        self.execute(op, input)
            .map(|_| ())
    }

    fn query_flag(&mut self, op: Operation) -> Result<bool> {
        let payload = self.execute(op, Payload::None)?;
        into_flag(op, payload)
    }

    fn query_value(&mut self, op: Operation) -> Result<u32> {
        let payload = self.execute(op, Payload::None)?;
        into_value(op, payload)
    }

    fn query_signed(&mut self, op: Operation) -> Result<i32> {
        let payload = self.execute(op, Payload::None)?;
        into_signed(op, payload)
    }

    // ---- Generic accessors ----

    /// Read a boolean feature.
    pub fn toggle(&mut self, toggle: Toggle) -> Result<bool> {
        self.query_flag(toggle.get_op())
    }

    /// Enable or disable a boolean feature.
    ///
    /// `true` issues the feature's enable operation, `false` its disable
    /// operation.
    pub fn set_toggle(&mut self, toggle: Toggle, enabled: bool) -> Result<()> {
        self.command(toggle.set_op(enabled), Payload::None)
    }

    /// Read a numeric setting.
    pub fn setting(&mut self, setting: Setting) -> Result<u32> {
        self.query_value(setting.get_op())
    }

    /// Write a numeric setting.
    pub fn set_setting(&mut self, setting: Setting, value: u32) -> Result<()> {
        self.command(setting.set_op(), Payload::Value(value))
    }

    /// Enable a mode feature with its argument.
    pub fn enable_mode(&mut self, mode: Mode, arg: u32) -> Result<()> {
        self.command(mode.enable_op(), Payload::Value(arg))
    }

    /// Disable a mode feature.
    pub fn disable_mode(&mut self, mode: Mode) -> Result<()> {
        self.command(mode.disable_op(), Payload::None)
    }

    // ---- Toggles ----

    /// Whether the port is in RS-485 mode.
    pub fn rs485(&mut self) -> Result<bool> {
        self.toggle(Toggle::Rs485)
    }

    /// Put the port into or out of RS-485 mode.
    pub fn set_rs485(&mut self, enabled: bool) -> Result<()> {
        self.set_toggle(Toggle::Rs485, enabled)
    }

    /// Whether echo cancellation is on.
    pub fn echo_cancel(&mut self) -> Result<bool> {
        self.toggle(Toggle::EchoCancel)
    }

    /// Turn echo cancellation on or off.
    pub fn set_echo_cancel(&mut self, enabled: bool) -> Result<()> {
        self.set_toggle(Toggle::EchoCancel, enabled)
    }

    /// Whether line termination is on.
    pub fn termination(&mut self) -> Result<bool> {
        self.toggle(Toggle::Termination)
    }

    /// Turn line termination on or off.
    pub fn set_termination(&mut self, enabled: bool) -> Result<()> {
        self.set_toggle(Toggle::Termination, enabled)
    }

    /// Whether 9-bit mode is on.
    pub fn nine_bit(&mut self) -> Result<bool> {
        self.toggle(Toggle::NineBit)
    }

    /// Turn 9-bit mode on or off.
    pub fn set_nine_bit(&mut self, enabled: bool) -> Result<()> {
        self.set_toggle(Toggle::NineBit, enabled)
    }

    // ---- Settings ----

    /// UART sample rate.
    pub fn sample_rate(&mut self) -> Result<u32> {
        self.setting(Setting::SampleRate)
    }

    /// Set the UART sample rate.
    pub fn set_sample_rate(&mut self, rate: u32) -> Result<()> {
        self.set_setting(Setting::SampleRate, rate)
    }

    /// Transmit FIFO trigger level.
    pub fn tx_trigger(&mut self) -> Result<u32> {
        self.setting(Setting::TxTrigger)
    }

    /// Set the transmit FIFO trigger level.
    pub fn set_tx_trigger(&mut self, level: u32) -> Result<()> {
        self.set_setting(Setting::TxTrigger, level)
    }

    /// Receive FIFO trigger level.
    pub fn rx_trigger(&mut self) -> Result<u32> {
        self.setting(Setting::RxTrigger)
    }

    /// Set the receive FIFO trigger level.
    pub fn set_rx_trigger(&mut self, level: u32) -> Result<()> {
        self.set_setting(Setting::RxTrigger, level)
    }

    /// Characters per frame.
    pub fn frame_length(&mut self) -> Result<u32> {
        self.setting(Setting::FrameLength)
    }

    /// Set the characters per frame.
    pub fn set_frame_length(&mut self, num_chars: u32) -> Result<()> {
        self.set_setting(Setting::FrameLength, num_chars)
    }

    /// Set the clock generator rate in Hz.
    ///
    /// The driver offers no way to read it back.
    pub fn set_clock_rate(&mut self, rate: u32) -> Result<()> {
        self.command(Operation::SetClockRate, Payload::Value(rate))
    }

    // ---- Modes ----

    /// Enable isochronous mode with a driver-defined mode selector.
    pub fn enable_isochronous(&mut self, mode: u32) -> Result<()> {
        self.enable_mode(Mode::Isochronous, mode)
    }

    /// Disable isochronous mode.
    pub fn disable_isochronous(&mut self) -> Result<()> {
        self.disable_mode(Mode::Isochronous)
    }

    /// Current isochronous mode.
    pub fn isochronous(&mut self) -> Result<IsochronousMode> {
        self.query_signed(Operation::GetIsochronous)
            .map(IsochronousMode::from_raw)
    }

    /// Enable external transmit, sending `num_chars` per external signal.
    pub fn enable_external_transmit(&mut self, num_chars: u32) -> Result<()> {
        self.enable_mode(Mode::ExternalTransmit, num_chars)
    }

    /// Disable external transmit.
    pub fn disable_external_transmit(&mut self) -> Result<()> {
        self.disable_mode(Mode::ExternalTransmit)
    }

    /// Current external transmit state.
    pub fn external_transmit(&mut self) -> Result<ExternalTransmit> {
        self.query_value(Operation::GetExternalTransmit)
            .map(ExternalTransmit::from_count)
    }

    /// Lock the port to a fixed baud rate.
    pub fn enable_fixed_baud_rate(&mut self, rate: u32) -> Result<()> {
        self.enable_mode(Mode::FixedBaudRate, rate)
    }

    /// Release the fixed baud rate.
    pub fn disable_fixed_baud_rate(&mut self) -> Result<()> {
        self.disable_mode(Mode::FixedBaudRate)
    }

    /// Current fixed baud rate state.
    pub fn fixed_baud_rate(&mut self) -> Result<FixedBaudRate> {
        self.query_signed(Operation::GetFixedBaudRate)
            .map(FixedBaudRate::from_raw)
    }

    /// Adapter family.
    pub fn card_type(&mut self) -> Result<CardType> {
        self.query_value(Operation::GetCardType)
            .map(CardType::from_raw)
    }

    /// Read every readable feature.
    ///
    /// Each feature keeps its own result: cards that lack a feature report
    /// an error for it without hiding the others.
    pub fn snapshot(&mut self) -> FeatureSnapshot {
        FeatureSnapshot {
            card_type: self.card_type(),
            rs485: self.rs485(),
            echo_cancel: self.echo_cancel(),
            termination: self.termination(),
            nine_bit: self.nine_bit(),
            sample_rate: self.sample_rate(),
            tx_trigger: self.tx_trigger(),
            rx_trigger: self.rx_trigger(),
            frame_length: self.frame_length(),
            isochronous: self.isochronous(),
            external_transmit: self.external_transmit(),
            fixed_baud_rate: self.fixed_baud_rate(),
        }
    }
}

/// Results of reading every readable feature once.
#[derive(Debug)]
pub struct FeatureSnapshot {
    /// Adapter family.
    pub card_type: Result<CardType>,
    /// RS-485 mode.
    pub rs485: Result<bool>,
    /// Echo cancellation.
    pub echo_cancel: Result<bool>,
    /// Line termination.
    pub termination: Result<bool>,
    /// 9-bit mode.
    pub nine_bit: Result<bool>,
    /// UART sample rate.
    pub sample_rate: Result<u32>,
    /// Transmit FIFO trigger level.
    pub tx_trigger: Result<u32>,
    /// Receive FIFO trigger level.
    pub rx_trigger: Result<u32>,
    /// Characters per frame.
    pub frame_length: Result<u32>,
    /// Isochronous mode.
    pub isochronous: Result<IsochronousMode>,
    /// External transmit.
    pub external_transmit: Result<ExternalTransmit>,
    /// Fixed baud rate.
    pub fixed_baud_rate: Result<FixedBaudRate>,
}

//! In-memory model of the SerialFC driver.
//!
//! `SimulatedDriver` answers control operations the way the driver does,
//! keeping feature state in memory. It records every call and can be told
//! to fail specific operations, which makes it the substitute channel for
//! unit tests and for dry runs that must not touch hardware.

use std::collections::HashMap;

use log::trace;

use super::{ControlChannel, DeviceHandle, Operation, Payload, Reply};
use crate::feature::{CardType, ExternalTransmit, FixedBaudRate, IsochronousMode};

/// Windows `ERROR_INVALID_PARAMETER`, returned for malformed requests.
pub const ERROR_INVALID_PARAMETER: i32 = 87;

/// Windows `ERROR_NOT_SUPPORTED`, returned for features the card lacks.
pub const ERROR_NOT_SUPPORTED: i32 = 50;

/// Highest isochronous mode selector the driver accepts.
const MAX_ISOCHRONOUS_MODE: u32 = 10;

/// A control call seen by the simulated driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Call {
    /// Handle the call was issued against.
    pub handle: DeviceHandle,
    /// Operation issued.
    pub op: Operation,
    /// Input payload.
    pub input: Payload,
}

/// Feature state held by the simulated driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverState {
    /// RS-485 transceiver mode.
    pub rs485: bool,
    /// Echo cancellation.
    pub echo_cancel: bool,
    /// Line termination.
    pub termination: bool,
    /// 9-bit mode.
    pub nine_bit: bool,
    /// UART sample rate.
    pub sample_rate: u32,
    /// Transmit FIFO trigger level.
    pub tx_trigger: u32,
    /// Receive FIFO trigger level.
    pub rx_trigger: u32,
    /// Characters per frame.
    pub frame_length: u32,
    /// Last clock rate written, if any.
    pub clock_rate: Option<u32>,
    /// Isochronous mode in driver encoding (-1 when disabled).
    pub isochronous: i32,
    /// External transmit character count (0 when disabled).
    pub external_transmit: u32,
    /// Fixed baud rate in driver encoding (-1 when disabled).
    pub fixed_baud_rate: i32,
    /// Raw card type.
    pub card_type: u32,
}

impl Default for DriverState {
    fn default() -> Self {
        Self {
            rs485: false,
            echo_cancel: false,
            termination: false,
            nine_bit: false,
            sample_rate: 16,
            tx_trigger: 32,
            rx_trigger: 32,
            frame_length: 1,
            clock_rate: None,
            isochronous: IsochronousMode::DISABLED,
            external_transmit: ExternalTransmit::DISABLED,
            fixed_baud_rate: FixedBaudRate::DISABLED,
            card_type: CardType::Fscc.raw(),
        }
    }
}

/// Simulated driver implementing [`ControlChannel`].
#[derive(Debug, Clone, Default)]
pub struct SimulatedDriver {
    state: DriverState,
    failures: HashMap<Operation, i32>,
    calls: Vec<Call>,
    card_gated: bool,
}

impl SimulatedDriver {
    /// Create a driver with power-on state.
    ///
    /// Every feature answers, whatever card type is reported.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer as an adapter of the `card_type` family does.
    ///
    /// Operations the family lacks fail with [`ERROR_NOT_SUPPORTED`] and
    /// leave the state untouched.
    #[must_use]
    pub fn with_card_type(mut self, card_type: CardType) -> Self {
        self.state.card_type = card_type.raw();
        self.card_gated = true;
        self
    }

    /// Make every future `op` call fail with `code`.
    pub fn fail_with(&mut self, op: Operation, code: i32) -> &mut Self {
        self.failures.insert(op, code);
        self
    }

    /// Stop injecting failures.
    pub fn clear_failures(&mut self) {
        self.failures.clear();
    }

    /// Current feature state.
    #[must_use]
    pub fn state(&self) -> &DriverState {
        &self.state
    }

    /// Mutable feature state, for preloading values.
    pub fn state_mut(&mut self) -> &mut DriverState {
        &mut self.state
    }

    /// Every call received, in order.
    #[must_use]
    pub fn calls(&self) -> &[Call] {
        &self.calls
    }

    /// Number of calls received for `op`.
    #[must_use]
    pub fn calls_to(&self, op: Operation) -> usize {
        self.calls
            .iter()
            .filter(|c| c.op == op)
            .count()
    }

    fn apply(&mut self, op: Operation, input: Payload) -> Result<Payload, i32> {
        let value = match input {
            Payload::Value(v) => v,
            _ => 0,
        };
        let s = &mut self.state;

        let output = match op {
            Operation::EnableRs485 => set_flag(&mut s.rs485, true),
            Operation::DisableRs485 => set_flag(&mut s.rs485, false),
            Operation::GetRs485 => Payload::Flag(s.rs485),
            Operation::EnableEchoCancel => set_flag(&mut s.echo_cancel, true),
            Operation::DisableEchoCancel => set_flag(&mut s.echo_cancel, false),
            Operation::GetEchoCancel => Payload::Flag(s.echo_cancel),
            Operation::EnableTermination => set_flag(&mut s.termination, true),
            Operation::DisableTermination => set_flag(&mut s.termination, false),
            Operation::GetTermination => Payload::Flag(s.termination),
            Operation::EnableNineBit => set_flag(&mut s.nine_bit, true),
            Operation::DisableNineBit => set_flag(&mut s.nine_bit, false),
            Operation::GetNineBit => Payload::Flag(s.nine_bit),
            Operation::SetSampleRate => set_value(&mut s.sample_rate, value),
            Operation::GetSampleRate => Payload::Value(s.sample_rate),
            Operation::SetTxTrigger => set_value(&mut s.tx_trigger, value),
            Operation::GetTxTrigger => Payload::Value(s.tx_trigger),
            Operation::SetRxTrigger => set_value(&mut s.rx_trigger, value),
            Operation::GetRxTrigger => Payload::Value(s.rx_trigger),
            Operation::SetFrameLength => set_value(&mut s.frame_length, value),
            Operation::GetFrameLength => Payload::Value(s.frame_length),
            Operation::SetClockRate => {
                s.clock_rate = Some(value);
                Payload::None
            },
            Operation::EnableIsochronous => {
                if value > MAX_ISOCHRONOUS_MODE {
                    return Err(ERROR_INVALID_PARAMETER);
                }
                s.isochronous = i32::try_from(value).map_err(|_| ERROR_INVALID_PARAMETER)?;
                Payload::None
            },
            Operation::DisableIsochronous => {
                s.isochronous = IsochronousMode::DISABLED;
                Payload::None
            },
            Operation::GetIsochronous => Payload::Signed(s.isochronous),
            Operation::EnableExternalTransmit => set_value(&mut s.external_transmit, value),
            Operation::DisableExternalTransmit => {
                set_value(&mut s.external_transmit, ExternalTransmit::DISABLED)
            },
            Operation::GetExternalTransmit => Payload::Value(s.external_transmit),
            Operation::EnableFixedBaudRate => {
                s.fixed_baud_rate = i32::try_from(value).map_err(|_| ERROR_INVALID_PARAMETER)?;
                Payload::None
            },
            Operation::DisableFixedBaudRate => {
                s.fixed_baud_rate = FixedBaudRate::DISABLED;
                Payload::None
            },
            Operation::GetFixedBaudRate => Payload::Signed(s.fixed_baud_rate),
            Operation::GetCardType => Payload::Value(s.card_type),
        };

        Ok(output)
    }
}

/// Whether an adapter family implements `op`.
fn supports(card: CardType, op: Operation) -> bool {
    match op {
        Operation::GetCardType
        | Operation::SetSampleRate
        | Operation::GetSampleRate
        | Operation::EnableFixedBaudRate
        | Operation::DisableFixedBaudRate
        | Operation::GetFixedBaudRate => true,
        Operation::EnableTermination | Operation::DisableTermination | Operation::GetTermination => {
            card == CardType::Pcie
        },
        Operation::SetClockRate => matches!(card, CardType::Pci | CardType::Fscc),
        Operation::EnableNineBit
        | Operation::DisableNineBit
        | Operation::GetNineBit
        | Operation::SetFrameLength
        | Operation::GetFrameLength
        | Operation::EnableIsochronous
        | Operation::DisableIsochronous
        | Operation::GetIsochronous
        | Operation::EnableExternalTransmit
        | Operation::DisableExternalTransmit
        | Operation::GetExternalTransmit => card == CardType::Fscc,
        _ => card != CardType::Unknown,
    }
}

fn set_flag(slot: &mut bool, flag: bool) -> Payload {
    *slot = flag;
    Payload::None
}

fn set_value(slot: &mut u32, value: u32) -> Payload {
    *slot = value;
    Payload::None
}

impl ControlChannel for SimulatedDriver {
    fn call(&mut self, handle: DeviceHandle, op: Operation, input: Payload) -> Reply {
        self.calls.push(Call { handle, op, input });

        if let Some(&code) = self.failures.get(&op) {
            trace!("sim {op}: injected failure {code}");
            return Reply::failed(code);
        }

        if self.card_gated && !supports(CardType::from_raw(self.state.card_type), op) {
            trace!("sim {op}: not supported on this card");
            return Reply::failed(ERROR_NOT_SUPPORTED);
        }

        if input.kind() != op.input_kind() {
            trace!("sim {op}: unexpected input {input:?}");
            return Reply::failed(ERROR_INVALID_PARAMETER);
        }

        match self.apply(op, input) {
            Ok(payload) => {
                trace!("sim {op}({input:?}) -> {payload:?}");
                Reply::ok(payload)
            },
            Err(code) => {
                trace!("sim {op}({input:?}) rejected with {code}");
                Reply::failed(code)
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::PayloadKind;

    const HANDLE: DeviceHandle = DeviceHandle::from_raw(3);

    #[test]
    fn test_records_calls_in_order() {
        let mut sim = SimulatedDriver::new();
        sim.call(HANDLE, Operation::EnableRs485, Payload::None);
        sim.call(HANDLE, Operation::GetRs485, Payload::None);

        let ops: Vec<Operation> = sim
            .calls()
            .iter()
            .map(|c| c.op)
            .collect();
        assert_eq!(ops, vec![Operation::EnableRs485, Operation::GetRs485]);
        assert!(sim.calls().iter().all(|c| c.handle == HANDLE));
    }

    #[test]
    fn test_injected_failure_leaves_state_untouched() {
        let mut sim = SimulatedDriver::new();
        sim.fail_with(Operation::SetTxTrigger, 2);

        let reply = sim.call(HANDLE, Operation::SetTxTrigger, Payload::Value(100));
        assert_eq!(reply, Reply::failed(2));
        assert_eq!(sim.state().tx_trigger, DriverState::default().tx_trigger);
    }

    #[test]
    fn test_wrong_input_shape_is_invalid_parameter() {
        let mut sim = SimulatedDriver::new();
        let reply = sim.call(HANDLE, Operation::SetSampleRate, Payload::None);
        assert_eq!(reply.code, ERROR_INVALID_PARAMETER);
    }

    #[test]
    fn test_isochronous_mode_range() {
        let mut sim = SimulatedDriver::new();
        let reply = sim.call(HANDLE, Operation::EnableIsochronous, Payload::Value(11));
        assert_eq!(reply.code, ERROR_INVALID_PARAMETER);
        assert_eq!(sim.state().isochronous, -1);

        let reply = sim.call(HANDLE, Operation::EnableIsochronous, Payload::Value(10));
        assert_eq!(reply.code, 0);
        assert_eq!(sim.state().isochronous, 10);
    }

    #[test]
    fn test_clock_rate_is_recorded() {
        let mut sim = SimulatedDriver::new();
        assert_eq!(sim.state().clock_rate, None);
        sim.call(HANDLE, Operation::SetClockRate, Payload::Value(18_432_000));
        assert_eq!(sim.state().clock_rate, Some(18_432_000));
    }

    #[test]
    fn test_card_type_override() {
        let mut sim = SimulatedDriver::new().with_card_type(CardType::Pcie);
        let reply = sim.call(HANDLE, Operation::GetCardType, Payload::None);
        assert_eq!(reply.payload, Payload::Value(1));
    }

    #[test]
    fn test_default_driver_answers_every_operation() {
        let mut sim = SimulatedDriver::new();
        for op in Operation::ALL {
            let input = match op.input_kind() {
                PayloadKind::Value => Payload::Value(1),
                _ => Payload::None,
            };
            let reply = sim.call(HANDLE, op, input);
            assert_ne!(reply.code, ERROR_NOT_SUPPORTED, "{op}");
        }
    }

    #[test]
    fn test_pci_card_rejects_fscc_features() {
        let mut sim = SimulatedDriver::new().with_card_type(CardType::Pci);

        let reply = sim.call(HANDLE, Operation::EnableIsochronous, Payload::Value(2));
        assert_eq!(reply.code, ERROR_NOT_SUPPORTED);
        assert_eq!(sim.state().isochronous, IsochronousMode::DISABLED);

        let reply = sim.call(HANDLE, Operation::EnableExternalTransmit, Payload::Value(4));
        assert_eq!(reply.code, ERROR_NOT_SUPPORTED);
        assert_eq!(sim.state().external_transmit, ExternalTransmit::DISABLED);

        assert_eq!(
            sim.call(HANDLE, Operation::GetTermination, Payload::None)
                .code,
            ERROR_NOT_SUPPORTED
        );
        assert_eq!(sim.call(HANDLE, Operation::EnableRs485, Payload::None).code, 0);
        assert_eq!(
            sim.call(HANDLE, Operation::SetClockRate, Payload::Value(1_843_200))
                .code,
            0
        );
    }

    #[test]
    fn test_card_specific_features() {
        let mut fscc = SimulatedDriver::new().with_card_type(CardType::Fscc);
        assert_eq!(fscc.call(HANDLE, Operation::GetIsochronous, Payload::None).code, 0);
        assert_eq!(
            fscc.call(HANDLE, Operation::EnableTermination, Payload::None)
                .code,
            ERROR_NOT_SUPPORTED
        );

        let mut pcie = SimulatedDriver::new().with_card_type(CardType::Pcie);
        assert_eq!(pcie.call(HANDLE, Operation::EnableTermination, Payload::None).code, 0);
        assert!(pcie.state().termination);
        assert_eq!(
            pcie.call(HANDLE, Operation::SetClockRate, Payload::Value(1_843_200))
                .code,
            ERROR_NOT_SUPPORTED
        );

        let mut unknown = SimulatedDriver::new().with_card_type(CardType::Unknown);
        assert_eq!(
            unknown
                .call(HANDLE, Operation::GetRs485, Payload::None)
                .code,
            ERROR_NOT_SUPPORTED
        );
        assert_eq!(unknown.call(HANDLE, Operation::GetCardType, Payload::None).code, 0);
    }
}

//! Translation of raw driver replies into `Result` values.
//!
//! The driver reports failure with a result code of 1 or more. Zero and
//! negative codes both mean success.

use log::debug;

use super::{Operation, Payload, Reply};
use crate::error::{Error, Result};

/// Whether a raw result code denotes a failed call.
#[must_use]
pub const fn is_failure(code: i32) -> bool {
    code >= 1
}

/// Check a bare result code.
pub fn check(code: i32) -> Result<()> {
    if is_failure(code) {
        Err(Error::Driver { code })
    } else {
        Ok(())
    }
}

/// Translate a reply, passing the payload through on success.
pub fn translate(reply: Reply) -> Result<Payload> {
    check(reply.code)?;
    Ok(reply.payload)
}

/// Translate a reply for `op`, logging the failing operation.
pub(crate) fn translate_for(op: Operation, reply: Reply) -> Result<Payload> {
    translate(reply).inspect_err(|e| debug!("{op} failed: {e}"))
}

pub(crate) fn into_flag(op: Operation, payload: Payload) -> Result<bool> {
    match payload {
        Payload::Flag(flag) => Ok(flag),
        other => Err(mismatch(op, other)),
    }
}

pub(crate) fn into_value(op: Operation, payload: Payload) -> Result<u32> {
    match payload {
        Payload::Value(value) => Ok(value),
        other => Err(mismatch(op, other)),
    }
}

pub(crate) fn into_signed(op: Operation, payload: Payload) -> Result<i32> {
    match payload {
        Payload::Signed(value) => Ok(value),
        other => Err(mismatch(op, other)),
    }
}

fn mismatch(op: Operation, payload: Payload) -> Error {
    Error::InvalidValue(format!(
        "{op} returned {:?} payload, expected {:?}",
        payload.kind(),
        op.output_kind()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_and_negative_codes_succeed() {
        assert!(check(0).is_ok());
        assert!(check(-1).is_ok());
        assert!(check(i32::MIN).is_ok());
    }

    #[test]
    fn test_positive_codes_fail_verbatim() {
        for code in [1, 2, 255, i32::MAX] {
            let err = check(code).err();
            assert_eq!(err.and_then(|e| e.driver_code()), Some(code));
        }
    }

    #[test]
    fn test_translate_passes_payload_through() {
        let reply = Reply {
            code: -5,
            payload: Payload::Value(9),
        };
        assert_eq!(translate(reply).ok(), Some(Payload::Value(9)));
    }

    #[test]
    fn test_translate_drops_payload_on_failure() {
        let reply = Reply {
            code: 31,
            payload: Payload::Flag(true),
        };
        assert!(matches!(translate(reply), Err(Error::Driver { code: 31 })));
    }

    #[test]
    fn test_payload_shape_mismatch() {
        let err = into_flag(Operation::GetRs485, Payload::Value(1));
        assert!(matches!(err, Err(Error::InvalidValue(_))));
        assert_eq!(
            into_signed(Operation::GetIsochronous, Payload::Signed(-1)).ok(),
            Some(-1)
        );
        assert_eq!(
            into_value(Operation::GetTxTrigger, Payload::Value(64)).ok(),
            Some(64)
        );
    }
}

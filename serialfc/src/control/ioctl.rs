//! Windows control channel backed by `DeviceIoControl`.

use std::ptr;

use log::trace;
use windows_sys::Win32::{
    Foundation::{GetLastError, HANDLE},
    System::IO::DeviceIoControl,
};

use super::{ControlChannel, DeviceHandle, Operation, Payload, Reply};

/// Issues driver operations as synchronous device I/O controls.
///
/// Result codes are 0 on success and the `GetLastError()` value on failure.
#[derive(Debug, Default, Clone, Copy)]
pub struct IoctlChannel;

impl IoctlChannel {
    /// Create a new channel.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl ControlChannel for IoctlChannel {
    #[allow(unsafe_code)]
    fn call(&mut self, handle: DeviceHandle, op: Operation, input: Payload) -> Reply {
        let input_buf = input.encode();
        let output_kind = op.output_kind();
        let mut output_buf = vec![0u8; output_kind.size()];
        let mut returned: u32 = 0;

        trace!(
            "DeviceIoControl({handle}, {op} {:#010x}, in={} bytes, out={} bytes)",
            op.code(),
            input_buf.len(),
            output_buf.len()
        );

        let in_ptr = if input_buf.is_empty() {
            ptr::null()
        } else {
            input_buf.as_ptr().cast()
        };
        let out_ptr = if output_buf.is_empty() {
            ptr::null_mut()
        } else {
            output_buf.as_mut_ptr().cast()
        };

        // SAFETY: both buffers live across this synchronous (non-overlapped)
        // call and the sizes passed are their exact lengths. The handle is
        // borrowed from an open base session.
        let ok = unsafe {
            DeviceIoControl(
                handle.as_raw() as HANDLE,
                op.code(),
                in_ptr,
                buffer_len(&input_buf),
                out_ptr,
                buffer_len(&output_buf),
                &mut returned,
                ptr::null_mut(),
            )
        };

        if ok == 0 {
            // SAFETY: reads the calling thread's last-error value.
            let err = unsafe { GetLastError() };
            trace!("{op} failed with system error {err}");
            // A failed call must never look like success, even without an error code.
            return Reply::failed(i32::try_from(err).unwrap_or(i32::MAX).max(1));
        }

        let len = usize::try_from(returned).map_or(0, |n| n.min(output_buf.len()));
        let reply = Reply::from_output(op, &output_buf[..len]);
        trace!("{op} -> {:?} ({returned} bytes)", reply.payload);
        reply
    }
}

fn buffer_len(buf: &[u8]) -> u32 {
    u32::try_from(buf.len()).unwrap_or(u32::MAX)
}

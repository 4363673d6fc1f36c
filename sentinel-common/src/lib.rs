#![cfg_attr(not(test), no_std)]

//! Record layout shared by the execve probe and the userspace consumer.
//!
//! Both sides are compiled separately and read the same bytes, so everything
//! here is `#[repr(C)]`, fixed size and free of padding.

use core::mem::{offset_of, size_of};

/// Length of the kernel's `task_struct::comm`, including the trailing NUL.
pub const TASK_COMM_LEN: usize = 16;
/// Space reserved for the executed path, including the trailing NUL.
pub const FILENAME_LEN: usize = 128;
/// Capacity of the shared ring in bytes. Must be a power of two and a multiple of the page size.
pub const RING_BUF_BYTE_SIZE: u32 = 256 * 1024;

/// Name of the ring buffer map inside the probe object.
pub const EVENTS_MAP: &str = "EVENTS";
/// Name of the kprobe program inside the probe object.
pub const PROGRAM_NAME: &str = "sentinel";

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExecEvent {
    pub pid: u32,
    pub comm: [u8; TASK_COMM_LEN],
    pub filename: [u8; FILENAME_LEN],
}

const _: () = {
    assert!(offset_of!(ExecEvent, pid) == 0);
    assert!(offset_of!(ExecEvent, comm) == 4);
    assert!(offset_of!(ExecEvent, filename) == 20);
    assert!(size_of::<ExecEvent>() == 148);
};

#[cfg(feature = "user")]
unsafe impl aya::Pod for ExecEvent {}

#[cfg(feature = "user")]
unsafe impl bytemuck::Zeroable for ExecEvent {}

#[cfg(feature = "user")]
unsafe impl bytemuck::Pod for ExecEvent {}

impl ExecEvent {
    pub const fn zeroed() -> Self {
        Self {
            pid: 0,
            comm: [0; TASK_COMM_LEN],
            filename: [0; FILENAME_LEN],
        }
    }

    /// Process name up to the first NUL.
    pub fn comm_bytes(&self) -> &[u8] {
        until_nul(&self.comm)
    }

    /// Executed path up to the first NUL.
    pub fn filename_bytes(&self) -> &[u8] {
        until_nul(&self.filename)
    }

    /// `false` when the probe could not read the path argument.
    pub fn has_filename(&self) -> bool {
        self.filename[0] != 0
    }
}

impl Default for ExecEvent {
    fn default() -> Self {
        Self::zeroed()
    }
}

fn until_nul(field: &[u8]) -> &[u8] {
    match field.iter().position(|&b| b == 0) {
        Some(end) => &field[..end],
        None => field,
    }
}

/// Copies `src` into `dst` the way `bpf_probe_read_user_str` and
/// `bpf_get_current_comm` fill their buffers: at most `dst.len() - 1` bytes,
/// then a NUL. Everything after the NUL is zeroed. Returns the number of
/// bytes copied, not counting the NUL.
pub fn truncate_into(src: &[u8], dst: &mut [u8]) -> usize {
    let Some(max) = dst.len().checked_sub(1) else {
        return 0;
    };
    let src = until_nul(src);
    let n = src.len().min(max);
    dst[..n].copy_from_slice(&src[..n]);
    dst[n..].fill(0);
    n
}

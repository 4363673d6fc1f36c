#![no_std]
#![no_main]

use aya_ebpf::{
    args::PtRegs,
    helpers::{bpf_get_current_comm, bpf_get_current_pid_tgid, bpf_probe_read_user_str_bytes},
    macros::{kprobe, map},
    maps::RingBuf,
    programs::ProbeContext,
};
use sentinel_common::{ExecEvent, RING_BUF_BYTE_SIZE};

// Shared by all CPUs, so records come out in the order they were reserved.
#[map(name = "EVENTS")]
static EVENTS: RingBuf = RingBuf::with_byte_size(RING_BUF_BYTE_SIZE, 0);

#[kprobe]
pub fn sentinel(ctx: ProbeContext) -> u32 {
    capture(&ctx);
    0
}

fn capture(ctx: &ProbeContext) {
    let pid = (bpf_get_current_pid_tgid() >> 32) as u32;

    // Ring full: the record is lost, the caller is never held up.
    let Some(mut slot) = EVENTS.reserve::<ExecEvent>(0) else {
        return;
    };

    // Reserved memory still holds whatever the previous record left behind.
    let event = slot.write(ExecEvent::zeroed());
    event.pid = pid;
    if let Ok(comm) = bpf_get_current_comm() {
        event.comm = comm;
    }

    // On a fault the helper leaves filename zeroed; the record is still published.
    if let Some(ptr) = filename_ptr(ctx) {
        let _ = unsafe { bpf_probe_read_user_str_bytes(ptr, &mut event.filename) };
    }

    slot.submit(0);
}

/// The syscall wrapper gets the caller's saved registers as its only argument;
/// the path is the first syscall argument inside them.
#[inline(always)]
fn filename_ptr(ctx: &ProbeContext) -> Option<*const u8> {
    let regs = PtRegs::new(ctx.arg(0)?);
    regs.arg::<*const u8>(0).filter(|ptr| !ptr.is_null())
}

#[cfg(not(test))]
#[panic_handler]
fn panic(_info: &core::panic::PanicInfo) -> ! {
    loop {}
}

#[unsafe(link_section = "license")]
#[unsafe(no_mangle)]
static LICENSE: [u8; 13] = *b"Dual MIT/GPL\0";

use aya::{
    Ebpf,
    maps::{MapData, RingBuf},
    programs::KProbe,
};
use sentinel_common::{EVENTS_MAP, PROGRAM_NAME};
use tracing::{info, warn};

use crate::error::SentinelError;

/// The loaded probe. Dropping it detaches the kprobe.
pub struct Probe {
    _ebpf: Ebpf,
    pub events: RingBuf<MapData>,
}

pub fn remove_locked_mem_limit() {
    // Bump the memlock rlimit. This is needed for older kernels that don't use the
    // new memcg based accounting, see https://lwn.net/Articles/837122/
    let rlim = libc::rlimit {
        rlim_cur: libc::RLIM_INFINITY,
        rlim_max: libc::RLIM_INFINITY,
    };
    let ret = unsafe { libc::setrlimit(libc::RLIMIT_MEMLOCK, &rlim) };
    if ret != 0 {
        warn!("remove limit on locked memory failed, ret is: {ret}");
    }
}

/// Loads the embedded probe, attaches it to `symbol` and takes the ring it writes to.
pub fn load(symbol: &str) -> Result<Probe, SentinelError> {
    remove_locked_mem_limit();

    let mut ebpf = Ebpf::load(aya::include_bytes_aligned!(concat!(
        env!("OUT_DIR"),
        "/sentinel"
    )))?;

    let program = ebpf
        .program_mut(PROGRAM_NAME)
        .ok_or(SentinelError::ProgramNotFound(PROGRAM_NAME))?;
    let program = <&mut KProbe>::try_from(program).map_err(|source| SentinelError::Program {
        program: PROGRAM_NAME,
        source,
    })?;
    program.load().map_err(|source| SentinelError::Program {
        program: PROGRAM_NAME,
        source,
    })?;
    program
        .attach(symbol, 0)
        .map_err(|source| SentinelError::Attach {
            program: PROGRAM_NAME,
            symbol: symbol.to_string(),
            source,
        })?;
    info!(symbol, "kprobe attached");

    let map = ebpf
        .take_map(EVENTS_MAP)
        .ok_or(SentinelError::MapNotFound(EVENTS_MAP))?;
    let events = RingBuf::try_from(map).map_err(|source| SentinelError::Map {
        map: EVENTS_MAP,
        source,
    })?;

    Ok(Probe {
        _ebpf: ebpf,
        events,
    })
}

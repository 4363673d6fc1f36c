//! End-to-end checks against the real probe. They load BPF programs, so run
//! them as root with `cargo test -- --ignored`. Every loaded probe sees every
//! execve on the machine, so the tests run one at a time.

use std::ffi::{CString, c_char};
use std::io;
use std::os::unix::process::CommandExt;
use std::process::Command;
use std::ptr;
use std::time::Duration;

use aya::maps::{MapData, RingBuf};
use sentinel::{
    config::{DEFAULT_SYMBOL, Format},
    consumer::Consumer,
    event::decode,
    loader,
    store::ExecutionStorage,
};
use sentinel_common::{ExecEvent, RING_BUF_BYTE_SIZE};
use serial_test::serial;

/// Ring records carry an 8 byte header and are padded to 8 bytes.
const RECORD_FOOTPRINT: usize = (size_of::<ExecEvent>() + 8).next_multiple_of(8);

fn drain(events: &mut RingBuf<MapData>) -> Vec<ExecEvent> {
    let mut drained = Vec::new();
    while let Some(record) = events.next() {
        drained.push(decode(&record).expect("probe wrote a malformed record"));
    }
    drained
}

/// Calls execve directly. Only used with paths that can't succeed.
fn failing_execve(path: *const c_char) -> io::Error {
    let argv: [*const c_char; 1] = [ptr::null()];
    let ret = unsafe { libc::execve(path, argv.as_ptr(), argv.as_ptr()) };
    assert_eq!(ret, -1, "execve unexpectedly succeeded");
    io::Error::last_os_error()
}

fn own_pid() -> u32 {
    std::process::id()
}

#[tokio::test]
#[ignore = "needs root and a kernel with BPF ring buffers"]
#[serial]
async fn reports_bin_echo() -> anyhow::Result<()> {
    let mut probe = loader::load(DEFAULT_SYMBOL)?;

    let mut child = Command::new("/bin/echo").arg("hello").spawn()?;
    let child_pid = child.id();
    assert!(child.wait()?.success());

    let events = drain(&mut probe.events);
    let matching: Vec<_> = events.iter().filter(|e| e.pid == child_pid).collect();
    assert_eq!(matching.len(), 1, "expected one record for pid {child_pid}");
    assert_eq!(matching[0].filename_bytes(), b"/bin/echo");
    Ok(())
}

#[tokio::test]
#[ignore = "needs root and a kernel with BPF ring buffers"]
#[serial]
async fn truncates_long_process_name() -> anyhow::Result<()> {
    let mut probe = loader::load(DEFAULT_SYMBOL)?;

    let name = CString::new("twenty_chars_process")?;
    assert_eq!(name.as_bytes().len(), 20);

    let mut command = Command::new("/bin/true");
    unsafe {
        command.pre_exec(move || {
            if libc::prctl(libc::PR_SET_NAME, name.as_ptr()) != 0 {
                return Err(io::Error::last_os_error());
            }
            Ok(())
        });
    }
    let mut child = command.spawn()?;
    let child_pid = child.id();
    assert!(child.wait()?.success());

    let events = drain(&mut probe.events);
    let record = events
        .iter()
        .find(|e| e.pid == child_pid)
        .expect("no record for the renamed child");
    assert_eq!(record.comm_bytes(), b"twenty_chars_pr");
    assert_eq!(record.comm[15], 0);
    Ok(())
}

#[tokio::test]
#[ignore = "needs root and a kernel with BPF ring buffers"]
#[serial]
async fn unmapped_path_yields_empty_filename() -> anyhow::Result<()> {
    let mut probe = loader::load(DEFAULT_SYMBOL)?;

    let page = unsafe {
        let len = libc::sysconf(libc::_SC_PAGESIZE) as usize;
        let addr = libc::mmap(
            ptr::null_mut(),
            len,
            libc::PROT_READ | libc::PROT_WRITE,
            libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
            -1,
            0,
        );
        assert_ne!(addr, libc::MAP_FAILED);
        assert_eq!(libc::munmap(addr, len), 0);
        addr as *const c_char
    };

    let err = failing_execve(page);
    assert_eq!(err.raw_os_error(), Some(libc::EFAULT));

    let events = drain(&mut probe.events);
    let record = events
        .iter()
        .find(|e| e.pid == own_pid() && !e.has_filename())
        .expect("no record for the faulting execve");
    assert!(!record.comm_bytes().is_empty());
    assert!(record.filename.iter().all(|&b| b == 0));
    Ok(())
}

#[tokio::test]
#[ignore = "needs root and a kernel with BPF ring buffers"]
#[serial]
async fn drains_in_reservation_order() -> anyhow::Result<()> {
    let mut probe = loader::load(DEFAULT_SYMBOL)?;

    let prefix = "/nonexistent/sentinel-order/";
    for i in 0..200 {
        let path = CString::new(format!("{prefix}{i:04}"))?;
        assert_eq!(failing_execve(path.as_ptr()).raw_os_error(), Some(libc::ENOENT));
    }

    let seen: Vec<usize> = drain(&mut probe.events)
        .iter()
        .filter(|e| e.pid == own_pid())
        .filter_map(|e| {
            let path = std::str::from_utf8(e.filename_bytes()).ok()?;
            path.strip_prefix(prefix)?.parse().ok()
        })
        .collect();
    assert_eq!(seen, (0..200).collect::<Vec<_>>());
    Ok(())
}

#[tokio::test]
#[ignore = "needs root and a kernel with BPF ring buffers"]
#[serial]
async fn saturated_ring_drops_without_stalling_callers() -> anyhow::Result<()> {
    let mut probe = loader::load(DEFAULT_SYMBOL)?;

    const CALLS: usize = 10_000;
    let threads = std::thread::available_parallelism()?.get();
    let path = CString::new("/nonexistent/sentinel-saturation")?;

    // Nothing drains while the calls run.
    let failures: usize = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..threads)
            .map(|t| {
                let path = &path;
                scope.spawn(move || {
                    (t..CALLS)
                        .step_by(threads)
                        .filter(|_| failing_execve(path.as_ptr()).raw_os_error() == Some(libc::ENOENT))
                        .count()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).sum()
    });
    assert_eq!(failures, CALLS, "every call must return normally");

    let capacity = RING_BUF_BYTE_SIZE as usize / RECORD_FOOTPRINT;
    assert!(capacity < 2_000);

    let captured = drain(&mut probe.events)
        .iter()
        .filter(|e| e.pid == own_pid() && e.filename_bytes() == path.as_bytes())
        .count();
    assert!(captured > 0);
    assert!(captured <= capacity, "{captured} records exceed ring capacity {capacity}");
    Ok(())
}

#[tokio::test]
#[ignore = "needs root and a kernel with BPF ring buffers"]
#[serial]
async fn consumer_stores_records_in_drain_order_and_stops_at_count() -> anyhow::Result<()> {
    let probe = loader::load(DEFAULT_SYMBOL)?;

    const CALLS: usize = 50;
    let prefix = "/nonexistent/sentinel-consumer/";
    for i in 0..CALLS {
        let path = CString::new(format!("{prefix}{i:04}"))?;
        assert_eq!(failing_execve(path.as_ptr()).raw_os_error(), Some(libc::ENOENT));
    }

    let storage = ExecutionStorage::new(CALLS * 2);
    let consumer = Consumer::new(storage.clone(), Format::Json);
    tokio::time::timeout(
        Duration::from_secs(10),
        consumer.run(probe.events, Some(CALLS as u64)),
    )
    .await??;

    let executions = storage.get_all_executions().await;
    let seqs: Vec<u64> = executions.iter().map(|e| e.seq).collect();
    assert_eq!(seqs, (1..=CALLS as u64).collect::<Vec<_>>());

    let ours: Vec<usize> = executions
        .iter()
        .filter(|e| e.pid == own_pid())
        .filter_map(|e| e.filename.strip_prefix(prefix)?.parse().ok())
        .collect();
    assert_eq!(ours, (0..CALLS).collect::<Vec<_>>());

    let stats = storage.stats().await;
    assert_eq!(stats.received, CALLS as u64);
    assert_eq!(stats.malformed, 0);
    Ok(())
}

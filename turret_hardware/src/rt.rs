//! Soft real-time scheduling helpers for the control loop.

use std::io;

/// Switch the calling process to SCHED_FIFO at `priority` (1..=99) and
/// lock its memory, so servo step timing stops depending on the scheduler
/// and the page cache. Needs CAP_SYS_NICE; callers should treat failure
/// as a degraded start, not a fatal one.
pub fn promote_to_realtime(priority: i32) -> io::Result<()> {
    let priority = priority.clamp(1, 99);
    // SAFETY: plain syscalls on the current process with a valid
    // sched_param; no memory is handed over.
    unsafe {
        let param = libc::sched_param {
            sched_priority: priority,
        };
        if libc::sched_setscheduler(0, libc::SCHED_FIFO, &raw const param) != 0 {
            return Err(io::Error::last_os_error());
        }
        if libc::mlockall(libc::MCL_CURRENT | libc::MCL_FUTURE) != 0 {
            return Err(io::Error::last_os_error());
        }
    }
    tracing::info!(priority, "running SCHED_FIFO with locked memory");
    Ok(())
}

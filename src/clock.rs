use std::sync::OnceLock;
use std::time::Instant;

static START: OnceLock<Instant> = OnceLock::new();

/// Milliseconds elapsed since an arbitrary, process-wide reference point.
///
/// This is a monotonic clock, not wall-clock time: it only ever moves
/// forward and is unaffected by clock adjustments, which is all
/// [`MainLoop`](crate::MainLoop) needs to compute timer deadlines and poll
/// durations.
pub fn now_ms() -> u64 {
    let start = START.get_or_init(Instant::now);
    start.elapsed().as_millis() as u64
}

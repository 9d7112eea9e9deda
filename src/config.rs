/// Configures [`MainLoop`](crate::MainLoop) runtime details.
///
/// Modelled on the historical `mio::EventLoopConfig`, trimmed to the knobs
/// this loop's simpler (non-wheel, non-queued-notify) timer and wake-up model
/// actually needs.
#[derive(Debug, Clone, Copy)]
pub struct MainLoopConfig {
    /// Upper bound, in milliseconds, on how long a single [`iterate`]
    /// call may block in the readiness poll, even if no timer is armed.
    ///
    /// The abstract spec this loop implements allows an unbounded,
    /// "infinite" block when no timer exists; in practice a bounded ceiling
    /// is kept (as `mio`'s historical event loop does via
    /// `io_poll_timeout_ms`) so the loop periodically re-evaluates its
    /// state even with no armed timer.
    ///
    /// [`iterate`]: crate::MainLoop::iterate
    pub max_poll_wait_ms: u64,

    /// Hint for the initial capacity of the per-iteration scratch tables.
    /// Purely an allocation-size hint; it does not bound how many sources
    /// may be registered.
    pub source_capacity_hint: usize,
}

impl Default for MainLoopConfig {
    fn default() -> MainLoopConfig {
        MainLoopConfig {
            max_poll_wait_ms: 1_000,
            source_capacity_hint: 16,
        }
    }
}

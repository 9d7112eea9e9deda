use std::io;
use std::os::fd::AsRawFd;
use std::sync::Arc;

use crate::sys;

/// A cheaply cloneable handle that wakes a [`MainLoop`](crate::MainLoop)
/// blocked in [`iterate`](crate::MainLoop::iterate) from another thread.
///
/// Grounded on mio's `Waker`, but backed by the same self-pipe the loop
/// already uses internally for its own control source, rather than a
/// separate `eventfd`/`kqueue` `EVFILT_USER` mechanism (this crate only
/// targets `poll(2)`, so a second wake-up primitive buys nothing).
#[derive(Debug, Clone)]
pub struct WakeHandle {
    pub(crate) write_fd: Arc<std::os::fd::OwnedFd>,
}

impl WakeHandle {
    /// Wakes the loop. Safe to call from any thread, any number of times;
    /// concurrent wakes may coalesce into a single pipe byte, which is fine
    /// since a wake only ever means "re-check your state", never "you owe
    /// me one event".
    pub fn wake(&self) -> io::Result<()> {
        sys::write_wake_byte(self.write_fd.as_raw_fd())
    }
}

use std::collections::HashMap;
use std::io;
use std::os::fd::{AsRawFd, OwnedFd};
use std::sync::Arc;
use std::time::Duration;

use crate::clock;
use crate::config::MainLoopConfig;
use crate::interest::Interest;
use crate::source::{Source, SourceId};
use crate::sys;
use crate::waker::WakeHandle;

/// A single-threaded, source-based event loop.
///
/// Sources are added with [`add`](MainLoop::add) or the timer-only
/// shorthand [`add_timeout`](MainLoop::add_timeout), then serviced one
/// readiness/timer pass at a time by [`iterate`](MainLoop::iterate), or
/// continuously by [`run`](MainLoop::run) until [`quit`](MainLoop::quit) is
/// called (from a callback, or from another thread via a [`WakeHandle`]).
///
/// Grounded on the historical `mio::EventLoop<T, M>` in structure (a
/// callback-driven reactor owning its own readiness backend) but rebuilt
/// around `poll(2)` and a `Source` abstraction that carries its own
/// callback, rather than dispatching through a separate `Handler` trait.
pub struct MainLoop {
    by_id: HashMap<SourceId, Source>,
    order: Vec<SourceId>,
    running: bool,
    in_dispatch: bool,
    wake_read: OwnedFd,
    wake_write: Arc<OwnedFd>,
    config: MainLoopConfig,
}

impl MainLoop {
    /// Creates a loop with default [`MainLoopConfig`].
    pub fn new() -> io::Result<MainLoop> {
        MainLoop::with_config(MainLoopConfig::default())
    }

    /// Creates a loop with an explicit configuration.
    pub fn with_config(config: MainLoopConfig) -> io::Result<MainLoop> {
        let (wake_read, wake_write) = sys::new_wake_pipe()?;
        let wake_write = Arc::new(wake_write);

        let mut main_loop = MainLoop {
            by_id: HashMap::with_capacity(config.source_capacity_hint),
            order: Vec::with_capacity(config.source_capacity_hint),
            running: false,
            in_dispatch: false,
            wake_read,
            wake_write,
            config,
        };

        let read_fd = main_loop.wake_read.as_raw_fd();
        let control = Source::new_fd(read_fd, Interest::READ, 0, move |_main_loop, _interest| {
            sys::drain_pipe(read_fd);
            true
        });
        main_loop.add(control);

        Ok(main_loop)
    }

    /// Registers a source, consuming it. Returns its [`SourceId`] for later
    /// [`remove`](MainLoop::remove).
    pub fn add(&mut self, mut source: Source) -> SourceId {
        if source.timeout_ms > 0 && source.expire_ms.is_none() {
            source.expire_ms = Some(clock::now_ms() + source.timeout_ms);
        }
        let id = source.id;
        log::trace!("main loop: adding source {:?}", id);
        self.order.push(id);
        self.by_id.insert(id, source);
        id
    }

    /// Shorthand for `add(Source::new_timer(timeout_ms, callback))`.
    pub fn add_timeout<F>(&mut self, timeout_ms: u64, callback: F) -> SourceId
    where
        F: FnMut(&mut MainLoop, Interest) -> bool + 'static,
    {
        self.add(Source::new_timer(timeout_ms, callback))
    }

    /// Unlinks a source immediately, running its finaliser if it has one.
    /// Returns `false` if no source with this id is currently registered
    /// (already removed, or never added).
    pub fn remove(&mut self, id: SourceId) -> bool {
        match self.by_id.remove(&id) {
            Some(source) => {
                log::trace!("main loop: removing source {:?}", id);
                self.order.retain(|&x| x != id);
                if let Some(finaliser) = source.on_remove {
                    finaliser();
                }
                true
            }
            None => false,
        }
    }

    /// A cloneable handle that can wake this loop from another thread.
    pub fn wake_handle(&self) -> WakeHandle {
        WakeHandle {
            write_fd: Arc::clone(&self.wake_write),
        }
    }

    /// Runs [`iterate`](MainLoop::iterate) until [`quit`](MainLoop::quit) is
    /// called, from inside a callback or from another thread.
    pub fn run(&mut self) {
        self.running = true;
        while self.running {
            self.iterate();
        }
    }

    /// Stops a [`run`](MainLoop::run) loop after its current iteration and
    /// wakes the loop so a blocked poll returns promptly instead of waiting
    /// out its timeout.
    pub fn quit(&mut self) {
        self.running = false;
        let _ = self.wake_handle().wake();
    }

    /// Services the loop for at least `duration_ms`: registers a one-shot
    /// timer whose callback calls [`quit`](MainLoop::quit), then
    /// [`run`](MainLoop::run)s until it fires. The armed timer is what
    /// bounds each `iterate`'s poll wait; without it an otherwise-idle loop
    /// would block for a full `max_poll_wait_ms` on the first iteration.
    pub fn sleep(&mut self, duration_ms: u64) {
        if duration_ms == 0 {
            return;
        }
        self.add_timeout(duration_ms, |main_loop, _interest| {
            main_loop.quit();
            false
        });
        self.run();
    }

    /// Runs one readiness/timer pass: blocks in `poll(2)` for at most the
    /// nearest timer deadline (capped by
    /// [`max_poll_wait_ms`](MainLoopConfig::max_poll_wait_ms)), then
    /// dispatches every fd that became ready and every timer that expired,
    /// in the order their sources were added.
    ///
    /// An unexpected OS error from the underlying `poll(2)` call is logged
    /// at error level and abandons dispatch for this iteration only; the
    /// loop itself keeps running, per this crate's error taxonomy (no
    /// single poll failure is fatal).
    ///
    /// # Panics
    ///
    /// Panics if called reentrantly, from inside a source's own callback,
    /// while already dispatching a previous `iterate()` call. Only one
    /// execution context may be inside `iterate`/`run` at a time.
    pub fn iterate(&mut self) {
        if self.in_dispatch {
            panic!("MainLoop::iterate called reentrantly; only one iterate/run may be active at a time");
        }
        self.in_dispatch = true;
        self.iterate_inner();
        self.in_dispatch = false;
    }

    /// Drops the loop, running the finaliser of every source still
    /// registered, in no particular order. Equivalent to simply letting the
    /// loop go out of scope; provided so callers can name the moment
    /// explicitly.
    pub fn destroy(self) {}

    fn iterate_inner(&mut self) {
        let now = clock::now_ms();

        let next_expire = self
            .by_id
            .values()
            .filter(|s| s.timeout_ms > 0)
            .filter_map(|s| s.expire_ms)
            .min();

        let wait_ms = match next_expire {
            Some(expire) => expire.saturating_sub(now).min(self.config.max_poll_wait_ms),
            None => self.config.max_poll_wait_ms,
        };

        let mut fds: Vec<(std::os::fd::RawFd, Interest)> = Vec::new();
        for source in self.by_id.values() {
            if let Some(fd) = source.fd {
                if !source.interest.is_empty() {
                    fds.push((fd, source.interest));
                }
            }
        }

        let ready = match sys::poll(&mut fds, Some(Duration::from_millis(wait_ms))) {
            Ok(ready) => ready,
            Err(e) => {
                log::error!("main loop: poll failed, abandoning this iteration: {e}");
                return;
            }
        };

        let mut revents_by_fd: HashMap<std::os::fd::RawFd, Interest> = HashMap::new();
        for pollfd in ready {
            revents_by_fd.insert(pollfd.fd, pollfd.revents);
        }

        let now = clock::now_ms();
        let snapshot = self.order.clone();
        for id in snapshot {
            let Some(source) = self.by_id.get(&id) else {
                continue;
            };
            if source.is_inert() {
                continue;
            }
            let revents = source
                .fd
                .and_then(|fd| revents_by_fd.get(&fd).copied())
                .unwrap_or(Interest::EMPTY);
            let timer_due = source.timeout_ms > 0 && source.expire_ms.is_some_and(|e| e <= now);

            if revents.is_empty() && !timer_due {
                continue;
            }

            let timer_fired = revents.is_empty() && timer_due;
            self.dispatch(id, revents, timer_fired);
        }
    }

    fn dispatch(&mut self, id: SourceId, interest: Interest, timer_fired: bool) {
        let mut source = match self.by_id.remove(&id) {
            Some(source) => source,
            None => return,
        };

        log::trace!("main loop: dispatching source {:?} ({:?})", id, interest);
        let keep = (source.notify)(self, interest);

        if keep {
            if timer_fired {
                if let Some(expire) = source.expire_ms.as_mut() {
                    *expire += source.timeout_ms;
                }
            }
            self.by_id.insert(id, source);
        } else {
            log::trace!("main loop: source {:?} unregistered itself", id);
            self.order.retain(|&x| x != id);
            if let Some(finaliser) = source.on_remove {
                finaliser();
            }
        }
    }
}

impl Drop for MainLoop {
    fn drop(&mut self) {
        for id in std::mem::take(&mut self.order) {
            if let Some(source) = self.by_id.remove(&id) {
                if let Some(finaliser) = source.on_remove {
                    finaliser();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::os::unix::net::UnixStream;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc as StdArc;

    fn init() {
        let _ = env_logger::try_init();
    }

    #[test]
    fn pure_sleep_returns_after_roughly_the_requested_duration() {
        init();
        let mut main_loop = MainLoop::new().unwrap();
        let start = clock::now_ms();
        main_loop.sleep(100);
        let elapsed = clock::now_ms() - start;
        assert!(elapsed >= 100, "elapsed = {elapsed}");
        assert!(elapsed <= 400, "elapsed = {elapsed}");
        main_loop.destroy();
    }

    #[test]
    fn counter_timer_fires_roughly_on_cadence() {
        init();
        let mut main_loop = MainLoop::new().unwrap();
        let counter = StdArc::new(AtomicUsize::new(0));
        let counter_cb = StdArc::clone(&counter);
        main_loop.add_timeout(50, move |_main_loop, _interest| {
            counter_cb.fetch_add(1, Ordering::SeqCst);
            true
        });
        main_loop.sleep(220);
        let n = counter.load(Ordering::SeqCst);
        assert!((4..=6).contains(&n), "counter = {n}");
    }

    #[test]
    fn self_removing_fd_source_is_unlinked_after_first_fire() {
        init();
        let mut main_loop = MainLoop::new().unwrap();
        let (mut tx, rx) = UnixStream::pair().unwrap();
        rx.set_nonblocking(true).unwrap();

        let id = main_loop.add(Source::new_fd(rx.as_raw_fd(), Interest::READ, 0, move |_main_loop, _interest| {
            let mut byte = [0u8; 1];
            let _ = (&rx).read(&mut byte);
            false
        }));

        tx.write_all(&[7]).unwrap();
        main_loop.iterate();

        assert!(!main_loop.remove(id));
    }

    #[test]
    fn quit_from_inside_callback_stops_run() {
        init();
        let mut main_loop = MainLoop::new().unwrap();
        main_loop.add_timeout(10, |main_loop, _interest| {
            main_loop.quit();
            false
        });
        let start = clock::now_ms();
        main_loop.run();
        let elapsed = clock::now_ms() - start;
        assert!(elapsed < 500, "elapsed = {elapsed}");
    }

    #[test]
    fn two_same_deadline_timers_fire_in_fifo_order() {
        init();
        let mut main_loop = MainLoop::new().unwrap();
        let order = StdArc::new(std::sync::Mutex::new(Vec::new()));

        let order_a = StdArc::clone(&order);
        main_loop.add_timeout(1, move |_main_loop, _interest| {
            order_a.lock().unwrap().push('A');
            false
        });
        let order_b = StdArc::clone(&order);
        main_loop.add_timeout(1, move |_main_loop, _interest| {
            order_b.lock().unwrap().push('B');
            false
        });

        std::thread::sleep(Duration::from_millis(5));
        main_loop.iterate();
        assert_eq!(*order.lock().unwrap(), vec!['A', 'B']);
    }

    #[test]
    fn inert_source_is_never_dispatched() {
        init();
        let mut main_loop = MainLoop::new().unwrap();
        let fired = StdArc::new(AtomicUsize::new(0));
        let fired_cb = StdArc::clone(&fired);
        main_loop.add(Source::new_timer(0, move |_main_loop, _interest| {
            fired_cb.fetch_add(1, Ordering::SeqCst);
            true
        }));
        main_loop.iterate();
        main_loop.iterate();
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[test]
    #[should_panic(expected = "reentrantly")]
    fn reentrant_iterate_panics() {
        init();
        let mut main_loop = MainLoop::new().unwrap();
        main_loop.add_timeout(1, |main_loop, _interest| {
            main_loop.iterate();
            true
        });
        std::thread::sleep(Duration::from_millis(5));
        main_loop.iterate();
    }
}

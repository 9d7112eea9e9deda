use std::os::unix::io::RawFd;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::{Interest, MainLoop};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Stable, process-wide identity of a [`Source`].
///
/// Ids are handed out from a single monotonic counter shared by fd-sources
/// and timer-sources alike, so [`MainLoop::add_timeout`]'s returned id is
/// comparable with any other source's id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceId(u64);

impl SourceId {
    fn next() -> SourceId {
        SourceId(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// The raw numeric identity, for logging or correlating with external state.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

/// A source's readiness/notification callback.
///
/// Invoked with the loop that dispatched it (so the callback may itself
/// add sources, remove sources, or call [`MainLoop::quit`]) and the mask of
/// events that caused the dispatch (`Interest::EMPTY` for a plain timer
/// firing). Returns `true` to remain registered ("keep me") or `false` to be
/// unlinked from the loop immediately after this call returns ("drop me").
pub(crate) type NotifyFn = dyn FnMut(&mut MainLoop, Interest) -> bool;

/// One unit of work registered with a [`MainLoop`]: an optional file
/// descriptor readiness subscription, an optional periodic timer, or both.
///
/// A `Source` is free-standing until moved into a loop via
/// [`MainLoop::add`], which consumes it and hands back a [`SourceId`].
/// There is deliberately no way to reclaim a `Source` value once it has
/// been added: unlike the C original this is grounded on, where a source
/// remains independently reachable through a raw pointer and destroying it
/// while still linked is a runtime-checked fatal error, Rust's ownership
/// transfer makes that misuse impossible to *express* in the first place.
/// A `Source` that is never added is simply dropped like any other value.
pub struct Source {
    pub(crate) id: SourceId,
    pub(crate) fd: Option<RawFd>,
    pub(crate) interest: Interest,
    pub(crate) timeout_ms: u64,
    pub(crate) expire_ms: Option<u64>,
    pub(crate) notify: Box<NotifyFn>,
    pub(crate) on_remove: Option<Box<dyn FnOnce()>>,
}

impl Source {
    /// Builds a free-standing source watching `fd` for `interest`, optionally
    /// also carrying a periodic timer (`timeout_ms == 0` means no timer).
    pub fn new_fd<F>(fd: RawFd, interest: Interest, timeout_ms: u64, notify: F) -> Source
    where
        F: FnMut(&mut MainLoop, Interest) -> bool + 'static,
    {
        Source {
            id: SourceId::next(),
            fd: Some(fd),
            interest,
            timeout_ms,
            expire_ms: None,
            notify: Box::new(notify),
            on_remove: None,
        }
    }

    /// Builds a free-standing, fd-less timer source that fires every
    /// `timeout_ms` once added to a loop.
    pub fn new_timer<F>(timeout_ms: u64, notify: F) -> Source
    where
        F: FnMut(&mut MainLoop, Interest) -> bool + 'static,
    {
        Source {
            id: SourceId::next(),
            fd: None,
            interest: Interest::EMPTY,
            timeout_ms,
            expire_ms: None,
            notify: Box::new(notify),
            on_remove: None,
        }
    }

    /// The source's stable identity. Available before the source is added,
    /// so callers can correlate it with the id returned later by
    /// [`MainLoop::add`] or [`MainLoop::add_timeout`].
    pub fn id(&self) -> SourceId {
        self.id
    }

    /// Attaches a finaliser run exactly once when the source leaves the
    /// loop, whether by explicit [`MainLoop::remove`] or because the
    /// callback returned "drop me". The loop does not otherwise free any
    /// resources the source's callback or data captured; this is the hook
    /// for that cleanup.
    #[must_use]
    pub fn on_remove<F>(mut self, finaliser: F) -> Source
    where
        F: FnOnce() + 'static,
    {
        self.on_remove = Some(Box::new(finaliser));
        self
    }

    /// `true` for a source with no fd and no timer: inert, never dispatched.
    pub(crate) fn is_inert(&self) -> bool {
        self.fd.is_none() && self.timeout_ms == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique_and_positive() {
        let a = Source::new_timer(0, |_, _| true);
        let b = Source::new_timer(0, |_, _| true);
        assert_ne!(a.id(), b.id());
        assert!(a.id().as_u64() > 0);
        assert!(b.id().as_u64() > a.id().as_u64());
    }

    #[test]
    fn fd_none_and_no_timeout_is_inert() {
        let timer_only = Source::new_timer(0, |_, _| true);
        assert!(timer_only.is_inert());

        let armed_timer = Source::new_timer(50, |_, _| true);
        assert!(!armed_timer.is_inert());

        let fd_source = Source::new_fd(0, Interest::READ, 0, |_, _| true);
        assert!(!fd_source.is_inert());
    }
}

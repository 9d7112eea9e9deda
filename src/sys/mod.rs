//! Platform glue.
//!
//! This loop is written directly in terms of `pipe(2)` and `poll(2)`;
//! unlike `mio`, which abstracts over epoll/kqueue/IOCP/wasi backends, this
//! crate only ever targets POSIX-ish Unix and does not try to hide that
//! fact behind a portable `Selector` trait.

#[cfg(unix)]
mod unix;

#[cfg(unix)]
pub(crate) use unix::{drain_pipe, new_wake_pipe, poll, write_wake_byte, PollFd};

#[cfg(not(unix))]
compile_error!("sip-mainloop only supports Unix targets (it is built directly on pipe(2) and poll(2))");

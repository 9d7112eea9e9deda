//! A single-threaded, source-based event loop for a SIP protocol stack.
//!
//! The loop multiplexes file-descriptor readiness and periodic timers onto
//! callbacks through a single [`poll(2)`] syscall per iteration. Sources are
//! registered with [`MainLoop::add`] (or the timer-only shorthand
//! [`MainLoop::add_timeout`]); the loop itself is driven by
//! [`MainLoop::run`] or one iteration at a time by [`MainLoop::iterate`].
//!
//! [`poll(2)`]: https://man7.org/linux/man-pages/man2/poll.2.html
//!
//! ```no_run
//! use sip_mainloop::MainLoop;
//!
//! let mut main_loop = MainLoop::new()?;
//! main_loop.add_timeout(1_000, |main_loop, _interest| {
//!     println!("tick");
//!     main_loop.quit();
//!     true
//! });
//! main_loop.run();
//! # Ok::<(), std::io::Error>(())
//! ```

#![deny(unsafe_op_in_unsafe_fn)]

#[macro_use]
mod macros;

mod clock;
mod config;
mod interest;
mod main_loop;
mod source;
mod sys;
mod waker;

pub use config::MainLoopConfig;
pub use interest::Interest;
pub use main_loop::MainLoop;
pub use source::{Source, SourceId};
pub use waker::WakeHandle;

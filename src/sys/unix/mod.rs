mod pipe;
mod poll;

pub(crate) use pipe::{drain_pipe, new_wake_pipe, write_wake_byte};
pub(crate) use poll::{poll, PollFd};

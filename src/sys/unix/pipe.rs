use std::io;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};

/// Creates the main loop's internal wake-up pipe.
///
/// The read end is put in non-blocking mode so [`drain_pipe`] can empty it
/// without risking a block if a writer raced it; the write end is left
/// blocking, matching `mio`'s own `create_notify_fds` (only the read side
/// needs `O_NONBLOCK` there too).
pub(crate) fn new_wake_pipe() -> io::Result<(OwnedFd, OwnedFd)> {
    let mut fds: [RawFd; 2] = [0, 0];
    syscall!(pipe(fds.as_mut_ptr()))?;
    // Safety: `pipe(2)` just handed us two freshly opened, uniquely owned descriptors.
    let read = unsafe { OwnedFd::from_raw_fd(fds[0]) };
    let write = unsafe { OwnedFd::from_raw_fd(fds[1]) };

    let flags = syscall!(fcntl(read.as_raw_fd(), libc::F_GETFL))?;
    syscall!(fcntl(read.as_raw_fd(), libc::F_SETFL, flags | libc::O_NONBLOCK))?;

    Ok((read, write))
}

/// Writes a single wake-up byte, retrying on `EINTR` and treating a full
/// buffer (`EWOULDBLOCK`) as "already woken, nothing to do".
pub(crate) fn write_wake_byte(fd: RawFd) -> io::Result<()> {
    loop {
        match syscall!(write(fd, [1u8].as_ptr().cast(), 1)) {
            Ok(_) => return Ok(()),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(()),
            Err(e) => return Err(e),
        }
    }
}

/// Drains every byte currently buffered on the read end. Called from the
/// control source's callback; a single wake only needs one byte consumed,
/// but bursts of `quit()`-adjacent wakes can queue more than one, so this
/// loops until the read would block.
pub(crate) fn drain_pipe(fd: RawFd) {
    let mut buf = [0u8; 64];
    loop {
        match syscall!(read(fd, buf.as_mut_ptr().cast(), buf.len())) {
            Ok(n) if n > 0 => continue,
            Ok(_) => return,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(_) => return,
        }
    }
}

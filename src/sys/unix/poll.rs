use std::io;
use std::os::fd::RawFd;
use std::time::Duration;

use crate::Interest;

/// One descriptor's worth of poll input/output, keyed by the caller via index.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PollFd {
    pub(crate) fd: RawFd,
    pub(crate) revents: Interest,
}

/// Blocks in `poll(2)` for at most `timeout`, or indefinitely if `timeout`
/// is `None`.
///
/// Mirrors belle-sip's own non-retrying treatment of `EINTR`: a signal
/// interrupting the wait is reported back as "zero descriptors ready" rather
/// than silently retried, so the caller's next `iterate()` re-evaluates
/// timer deadlines instead of the same poll blocking for the original
/// duration all over again.
pub(crate) fn poll(fds: &mut [(RawFd, Interest)], timeout: Option<Duration>) -> io::Result<Vec<PollFd>> {
    let mut pollfds: Vec<libc::pollfd> = fds
        .iter()
        .map(|(fd, interest)| libc::pollfd {
            fd: *fd,
            events: interest_to_poll(*interest),
            revents: 0,
        })
        .collect();

    let timeout_ms = match timeout {
        Some(d) => d.as_millis().min(i32::MAX as u128) as libc::c_int,
        None => -1,
    };

    let n = match syscall!(poll(pollfds.as_mut_ptr(), pollfds.len() as libc::nfds_t, timeout_ms)) {
        Ok(n) => n,
        Err(e) if e.kind() == io::ErrorKind::Interrupted => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    if n == 0 {
        return Ok(Vec::new());
    }

    let ready = pollfds
        .into_iter()
        .filter(|pfd| pfd.revents != 0)
        .map(|pfd| PollFd {
            fd: pfd.fd,
            revents: poll_to_interest(pfd.revents),
        })
        .collect();
    Ok(ready)
}

fn interest_to_poll(interest: Interest) -> libc::c_short {
    let mut events: libc::c_short = 0;
    if interest.is_readable() {
        events |= libc::POLLIN;
    }
    if interest.is_writable() {
        events |= libc::POLLOUT;
    }
    events
}

fn poll_to_interest(revents: libc::c_short) -> Interest {
    let mut interest = Interest::EMPTY;
    if revents & libc::POLLIN != 0 || revents & libc::POLLHUP != 0 {
        interest |= Interest::READ;
    }
    if revents & libc::POLLOUT != 0 {
        interest |= Interest::WRITE;
    }
    if revents & libc::POLLERR != 0 || revents & libc::POLLNVAL != 0 {
        interest |= Interest::ERROR;
    }
    interest
}

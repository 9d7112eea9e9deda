use std::fmt;
use std::ops::{BitOr, BitOrAssign};

const READABLE: u8 = 0b001;
const WRITABLE: u8 = 0b010;
const ERROR: u8 = 0b100;

/// Abstract bitset over `{READ, WRITE, ERROR}`.
///
/// The same type is used both to declare a [`Source`](crate::Source)'s interest
/// and, symmetrically, to report which of those interests actually fired
/// (`revents`). Unlike [`mio::Interests`], an empty `Interest` is a valid value:
/// it is exactly what a pure timer source carries, since it has no file
/// descriptor to wait on.
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct Interest(u8);

impl Interest {
    /// No interest at all. The value every timer-only [`Source`](crate::Source) is built with.
    pub const EMPTY: Interest = Interest(0);
    /// Readiness to read without blocking.
    pub const READ: Interest = Interest(READABLE);
    /// Readiness to write without blocking.
    pub const WRITE: Interest = Interest(WRITABLE);
    /// An error condition is pending on the descriptor.
    pub const ERROR: Interest = Interest(ERROR);

    #[must_use]
    pub const fn is_readable(self) -> bool {
        self.0 & READABLE != 0
    }

    #[must_use]
    pub const fn is_writable(self) -> bool {
        self.0 & WRITABLE != 0
    }

    #[must_use]
    pub const fn is_error(self) -> bool {
        self.0 & ERROR != 0
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for Interest {
    type Output = Interest;

    fn bitor(self, other: Interest) -> Interest {
        Interest(self.0 | other.0)
    }
}

impl BitOrAssign for Interest {
    fn bitor_assign(&mut self, other: Interest) {
        self.0 |= other.0;
    }
}

impl fmt::Debug for Interest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "EMPTY");
        }
        let mut one = false;
        for (flag, name) in [
            (Interest::READ, "READ"),
            (Interest::WRITE, "WRITE"),
            (Interest::ERROR, "ERROR"),
        ] {
            if self.0 & flag.0 != 0 {
                if one {
                    write!(f, " | ")?;
                }
                write!(f, "{name}")?;
                one = true;
            }
        }
        Ok(())
    }
}

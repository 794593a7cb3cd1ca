//! Kernel error taxonomy.
//!
//! A single `Errno` enum carries every error the kernel core returns, both
//! internally (as a positive discriminant compared against) and at the
//! syscall boundary (negated). There is deliberately no separate
//! "internal" error type layered on top: the taxonomy is closed and
//! small enough that one enum covers call-chain and ABI alike.

#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Errno {
    /// Operation not permitted.
    EPERM = 1,
    /// No such file or directory.
    ENOENT = 2,
    /// No such process.
    ESRCH = 3,
    /// I/O error.
    EIO = 5,
    /// No such device or address.
    ENXIO = 6,
    /// Bad file descriptor.
    EBADF = 9,
    /// Try again (would block).
    EAGAIN = 11,
    /// Out of memory.
    ENOMEM = 12,
    /// Bad address.
    EFAULT = 14,
    /// Device or resource busy.
    EBUSY = 16,
    /// File exists.
    EEXIST = 17,
    /// No such device.
    ENODEV = 19,
    /// Not a directory.
    ENOTDIR = 20,
    /// Is a directory.
    EISDIR = 21,
    /// Invalid argument.
    EINVAL = 22,
    /// Too many open files.
    EMFILE = 24,
    /// Illegal seek.
    ESPIPE = 29,
    /// Read-only file system.
    EROFS = 30,
    /// Directory not empty.
    ENOTEMPTY = 39,
    /// Function not implemented (used for `sys_kill` and friends).
    ENOSYS = 38,
    /// No space left on device (also used when a file grows past the
    /// indirect-block range ramfs supports).
    ENOSPC = 28,
    /// Kernel-internal inconsistency. Usually fatal; see `panic::kernel_panic`.
    EKERN = 200,
    /// Feature declared but not yet implemented.
    ETODO = 201,
}

impl Errno {
    /// The negative value returned in `eax` at the syscall boundary.
    pub const fn as_syscall_ret(self) -> isize {
        -(self as i32 as isize)
    }
}

impl core::fmt::Display for Errno {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            Errno::EPERM => "EPERM",
            Errno::ENOENT => "ENOENT",
            Errno::ESRCH => "ESRCH",
            Errno::EIO => "EIO",
            Errno::ENXIO => "ENXIO",
            Errno::EBADF => "EBADF",
            Errno::EAGAIN => "EAGAIN",
            Errno::ENOMEM => "ENOMEM",
            Errno::EFAULT => "EFAULT",
            Errno::EBUSY => "EBUSY",
            Errno::EEXIST => "EEXIST",
            Errno::ENODEV => "ENODEV",
            Errno::ENOTDIR => "ENOTDIR",
            Errno::EISDIR => "EISDIR",
            Errno::EINVAL => "EINVAL",
            Errno::EMFILE => "EMFILE",
            Errno::ESPIPE => "ESPIPE",
            Errno::EROFS => "EROFS",
            Errno::ENOTEMPTY => "ENOTEMPTY",
            Errno::ENOSYS => "ENOSYS",
            Errno::ENOSPC => "ENOSPC",
            Errno::EKERN => "EKERN",
            Errno::ETODO => "ETODO",
        };
        f.write_str(s)
    }
}

pub type KResult<T> = Result<T, Errno>;

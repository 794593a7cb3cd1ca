//! Syscall number table and the argument-unpacking dispatch (syscall.c's
//! `syscalls[]`/`int_syscall`). Numbers are a POSIX-ish subset picked to
//! cover the filesystem, process, and mount operations the shell and VFS
//! need.

pub const SYS_READ: u32 = 3;
pub const SYS_WRITE: u32 = 4;
pub const SYS_OPEN: u32 = 5;
pub const SYS_CLOSE: u32 = 6;
pub const SYS_LINK: u32 = 9;
pub const SYS_UNLINK: u32 = 10;
pub const SYS_CHDIR: u32 = 12;
pub const SYS_TIME: u32 = 13;
pub const SYS_LSEEK: u32 = 19;
pub const SYS_GETPID: u32 = 20;
pub const SYS_MOUNT: u32 = 21;
pub const SYS_UMOUNT: u32 = 22;
pub const SYS_KILL: u32 = 37;
pub const SYS_RENAME: u32 = 38;
pub const SYS_MKDIR: u32 = 39;
pub const SYS_RMDIR: u32 = 40;
pub const SYS_TRUNC: u32 = 53;
pub const SYS_PRINT: u32 = 0xFF;

use alloc::string::String;

use crate::error::Errno;
use crate::syscall::{fd, process, uaccess};
use crate::vfs::inode::FileType;

/// Dispatches one syscall given its raw register arguments, returning the
/// raw value to load back into `eax` (already negated on error).
pub fn dispatch(num: u32, arg1: u32, arg2: u32, arg3: u32) -> isize {
    let pid = process::current_pid();
    let result: Result<isize, Errno> = (|| {
        match num {
            SYS_READ => {
                let buf = unsafe { uaccess::write_buf(arg2, arg3 as usize) }?;
                Ok(fd::sys_read(pid, arg1 as usize, buf)? as isize)
            }
            SYS_WRITE => {
                let buf = unsafe { uaccess::read_buf(arg2, arg3 as usize) }?;
                Ok(fd::sys_write(pid, arg1 as usize, buf)? as isize)
            }
            SYS_OPEN => {
                let path = unsafe { uaccess::read_cstr(arg1) }?;
                Ok(fd::sys_open(&path, arg2, arg3)? as isize)
            }
            SYS_CLOSE => {
                fd::sys_close(pid, arg1 as usize)?;
                Ok(0)
            }
            SYS_LINK => {
                let existing = unsafe { uaccess::read_cstr(arg1) }?;
                let new_path = unsafe { uaccess::read_cstr(arg2) }?;
                crate::vfs::link(&existing, &new_path)?;
                Ok(0)
            }
            SYS_UNLINK => {
                let path = unsafe { uaccess::read_cstr(arg1) }?;
                crate::vfs::unlink(&path)?;
                Ok(0)
            }
            SYS_CHDIR => {
                let path = unsafe { uaccess::read_cstr(arg1) }?;
                let meta = crate::vfs::stat(&path)?;
                if meta.ftype != FileType::Directory {
                    return Err(Errno::ENOTDIR);
                }
                process::with_current(|p| p.cwd = path)?;
                Ok(0)
            }
            SYS_TIME => Ok(crate::time::unix_now() as isize),
            SYS_LSEEK => {
                let off = fd::sys_lseek(pid, arg1 as usize, arg2 as i32 as i64, arg3)?;
                Ok(off as isize)
            }
            SYS_GETPID => Ok(pid as isize),
            SYS_MOUNT => {
                let driver = unsafe { uaccess::read_cstr(arg1) }?;
                let target = unsafe { uaccess::read_cstr(arg2) }?;
                crate::vfs::mount(&driver, "", &target)?;
                Ok(0)
            }
            SYS_UMOUNT => Err(Errno::ENOSYS),
            SYS_KILL => {
                // fork/execve/kill are out of scope for now: log and
                // report "not implemented" rather than silently succeeding.
                crate::warn!("sys_kill({}, {}): not implemented", arg1, arg2);
                Err(Errno::ENOSYS)
            }
            SYS_RENAME => {
                let old = unsafe { uaccess::read_cstr(arg1) }?;
                let new = unsafe { uaccess::read_cstr(arg2) }?;
                crate::vfs::rename(&old, &new)?;
                Ok(0)
            }
            SYS_MKDIR => {
                let path = unsafe { uaccess::read_cstr(arg1) }?;
                crate::vfs::mkdir(&path, arg2)?;
                Ok(0)
            }
            SYS_RMDIR => {
                let path = unsafe { uaccess::read_cstr(arg1) }?;
                crate::vfs::rmdir(&path)?;
                Ok(0)
            }
            SYS_TRUNC => {
                let path = unsafe { uaccess::read_cstr(arg1) }?;
                crate::vfs::truncate(&path, arg2 as u64)?;
                Ok(0)
            }
            SYS_PRINT => {
                let s: String = unsafe { uaccess::read_cstr(arg1) }?;
                crate::printk!(crate::log::LogLevel::Info, "{}", s);
                Ok(0)
            }
            _ => Err(Errno::ENOSYS),
        }
    })();

    match result {
        Ok(v) => v,
        Err(e) => e.as_syscall_ret(),
    }
}

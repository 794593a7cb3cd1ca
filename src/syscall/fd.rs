//! `sys_open`/`sys_read`/`sys_write`/`sys_close`/`sys_lseek` (fs_sys.c).

use alloc::string::{String, ToString};

use crate::dev::{blockdev, chardev};
use crate::error::{Errno, KResult};
use crate::syscall::process::{self, FileDescr, Pid};
use crate::vfs::inode::FileType;

pub const O_RDONLY: u32 = 0;
pub const O_WRONLY: u32 = 1;
pub const O_RDWR: u32 = 2;
const O_ACCMODE: u32 = 0o3;
pub const O_CREAT: u32 = 0o100;
pub const O_TRUNC: u32 = 0o1000;
pub const O_APPEND: u32 = 0o2000;

pub const SEEK_SET: u32 = 0;
pub const SEEK_CUR: u32 = 1;
pub const SEEK_END: u32 = 2;

/// Resolve a possibly-relative path against `cwd`.
fn abspath(cwd: &str, path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else if cwd == "/" {
        alloc::format!("/{}", path)
    } else {
        alloc::format!("{}/{}", cwd, path)
    }
}

pub fn sys_open(path: &str, flags: u32, mode: u32) -> KResult<usize> {
    let rw = flags & O_ACCMODE;
    // O_RDONLY/O_WRONLY/O_RDWR are 0/1/2: the only bit pattern the gate
    // must reject is O_WRONLY|O_RDWR (== 3), which names no real mode.
    if rw == (O_WRONLY | O_RDWR) {
        return Err(Errno::EINVAL);
    }

    let pid = process::current_pid();
    let (cwd, umask) = process::with_current(|p| (p.cwd.clone(), p.umask))?;
    let full = abspath(&cwd, path);

    let meta = match crate::vfs::stat(&full) {
        Ok(meta) => meta,
        Err(Errno::ENOENT) if flags & O_CREAT != 0 => {
            crate::vfs::create(&full, FileType::Regular, mode & !umask, None)?;
            crate::vfs::stat(&full)?
        }
        Err(e) => return Err(e),
    };

    let is_char = meta.ftype == FileType::CharDevice;
    let is_block = meta.ftype == FileType::BlockDevice;

    let mut pos: i64 = 0;
    if is_char {
        // every char class we ship is a stream: all of them supply
        // has_data, so none can report a meaningful seek position.
        pos = -1;
    } else if rw & (O_RDWR | O_WRONLY) != 0 {
        if flags & O_TRUNC != 0 {
            let _ = crate::vfs::truncate(&full, 0);
        } else if flags & O_APPEND != 0 {
            pos = meta.size as i64;
        }
    }

    let (mount, ino) = crate::vfs::path::resolve(&full, false)?;
    let fd = process::alloc_fd_for_pid(pid)?;
    process::set_filedescr_for_pid(
        pid,
        fd,
        Some(FileDescr { mount, ino, pos, flags, rdev: meta.rdev, is_char, is_block }),
    )?;
    Ok(fd)
}

pub fn sys_close(pid: Pid, fd: usize) -> KResult<()> {
    process::set_filedescr_for_pid(pid, fd, None)
}

pub fn sys_read(pid: Pid, fd: usize, buf: &mut [u8]) -> KResult<usize> {
    let descr = process::get_filedescr_for_pid(pid, fd)?;
    if descr.flags & O_ACCMODE == O_WRONLY {
        return Err(Errno::EBADF);
    }

    let n = if descr.is_char {
        let (major, minor) = descr.rdev.ok_or(Errno::ENXIO)?;
        chardev::read(major as usize, minor, buf, descr.pos)?
    } else if descr.is_block {
        let (major, minor) = descr.rdev.ok_or(Errno::ENXIO)?;
        blockdev::bdev_blocking_read(major as usize, minor, descr.pos as u64, buf)
            .map_err(|(e, _)| e)?
    } else {
        crate::vfs::mount::with_mount(descr.mount, |m| m.sb.read_inode(descr.ino, descr.pos as u64, buf))??
    };

    if descr.pos >= 0 {
        process::update_filedescr_for_pid(pid, fd, |d| d.pos += n as i64)?;
    }
    Ok(n)
}

pub fn sys_write(pid: Pid, fd: usize, buf: &[u8]) -> KResult<usize> {
    let descr = process::get_filedescr_for_pid(pid, fd)?;
    if descr.flags & O_ACCMODE == O_RDONLY {
        return Err(Errno::EBADF);
    }

    let n = if descr.is_char {
        let (major, minor) = descr.rdev.ok_or(Errno::ENXIO)?;
        chardev::write(major as usize, minor, buf, descr.pos)?
    } else if descr.is_block {
        let (major, minor) = descr.rdev.ok_or(Errno::ENXIO)?;
        blockdev::bdev_blocking_write(major as usize, minor, descr.pos as u64, buf)
            .map_err(|(e, _)| e)?
    } else {
        crate::vfs::mount::with_mount(descr.mount, |m| m.sb.write_inode(descr.ino, descr.pos as u64, buf))??
    };

    if descr.pos >= 0 {
        process::update_filedescr_for_pid(pid, fd, |d| d.pos += n as i64)?;
    }
    Ok(n)
}

pub fn sys_lseek(pid: Pid, fd: usize, offset: i64, whence: u32) -> KResult<i64> {
    let descr = process::get_filedescr_for_pid(pid, fd)?;
    if descr.is_char {
        return Err(Errno::ESPIPE);
    }
    let meta = crate::vfs::mount::with_mount(descr.mount, |m| m.sb.inode_get(descr.ino))??;
    if meta.ftype == FileType::Directory {
        return Err(Errno::EISDIR);
    }
    if meta.ftype == FileType::Fifo || meta.ftype == FileType::Socket {
        return Err(Errno::ESPIPE);
    }

    let mut new_pos = match whence {
        SEEK_SET => offset,
        SEEK_CUR => descr.pos + offset,
        SEEK_END => meta.size as i64 - offset,
        _ => return Err(Errno::EINVAL),
    };
    if new_pos > meta.size as i64 {
        new_pos = meta.size as i64;
    }
    if new_pos < 0 {
        new_pos = 0;
    }
    process::update_filedescr_for_pid(pid, fd, |d| d.pos = new_pos)?;
    Ok(new_pos)
}

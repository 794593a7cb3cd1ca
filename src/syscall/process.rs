//! Per-process state: `process`/`filedescr` from process.h, with the fd
//! table sized `N_PROCESS_FDS` and looked up by `(pid, fd)` pairs.

use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};

use spin::Mutex;

use crate::error::{Errno, KResult};
use crate::vfs::inode::Ino;
use crate::vfs::mount::MountId;

pub type Pid = u32;

pub const N_PROCESS_FDS: usize = 32;

/// `filedescr`: an open file's position plus its resolved (mount, inode)
/// and the flags it was opened with. `pos == -1` marks a non-seekable
/// stream (a char device supplying `has_data`).
#[derive(Clone, Copy)]
pub struct FileDescr {
    pub mount: MountId,
    pub ino: Ino,
    pub pos: i64,
    pub flags: u32,
    pub rdev: Option<(u32, u32)>,
    pub is_char: bool,
    pub is_block: bool,
}

pub struct Process {
    pub pid: Pid,
    pub ppid: Pid,
    pub umask: u32,
    pub cwd: String,
    pub tty: Option<u32>,
    pub heap_end: u32,
    pub user_stack_base: u32,
    pub fds: [Option<FileDescr>; N_PROCESS_FDS],
}

impl Process {
    fn new(pid: Pid, ppid: Pid) -> Self {
        Process {
            pid,
            ppid,
            umask: 0o022,
            cwd: "/".to_string(),
            tty: None,
            heap_end: 0,
            user_stack_base: 0,
            fds: [None; N_PROCESS_FDS],
        }
    }
}

static PROCESSES: Mutex<BTreeMap<Pid, Process>> = Mutex::new(BTreeMap::new());
static CURRENT_PID: Mutex<Pid> = Mutex::new(1);

/// Creates the boot process (pid 1, its own parent) used until real
/// multitasking hands off `current_pid`: `fork`/`execve` are stubbed, so
/// every syscall today runs as pid 1.
pub fn init() {
    PROCESSES.lock().insert(1, Process::new(1, 1));
}

pub fn current_pid() -> Pid {
    *CURRENT_PID.lock()
}

pub fn with_current<R>(f: impl FnOnce(&mut Process) -> R) -> KResult<R> {
    let pid = current_pid();
    let mut table = PROCESSES.lock();
    let proc = table.get_mut(&pid).ok_or(Errno::ESRCH)?;
    Ok(f(proc))
}

/// `alloc_fd_for_pid`: lowest free index, does not mark it used.
pub fn alloc_fd_for_pid(pid: Pid) -> KResult<usize> {
    let table = PROCESSES.lock();
    let proc = table.get(&pid).ok_or(Errno::ESRCH)?;
    proc.fds.iter().position(|f| f.is_none()).ok_or(Errno::EMFILE)
}

pub fn get_filedescr_for_pid(pid: Pid, fd: usize) -> KResult<FileDescr> {
    let table = PROCESSES.lock();
    let proc = table.get(&pid).ok_or(Errno::ESRCH)?;
    proc.fds.get(fd).copied().flatten().ok_or(Errno::EBADF)
}

pub fn set_filedescr_for_pid(pid: Pid, fd: usize, descr: Option<FileDescr>) -> KResult<()> {
    let mut table = PROCESSES.lock();
    let proc = table.get_mut(&pid).ok_or(Errno::ESRCH)?;
    let slot = proc.fds.get_mut(fd).ok_or(Errno::EBADF)?;
    *slot = descr;
    Ok(())
}

pub fn update_filedescr_for_pid(
    pid: Pid,
    fd: usize,
    f: impl FnOnce(&mut FileDescr),
) -> KResult<()> {
    let mut table = PROCESSES.lock();
    let proc = table.get_mut(&pid).ok_or(Errno::ESRCH)?;
    let slot = proc.fds.get_mut(fd).ok_or(Errno::EBADF)?.as_mut().ok_or(Errno::EBADF)?;
    f(slot);
    Ok(())
}

//! Kernel logging (printk) with a ring buffer.
//!
//! Every log line is pushed into a fixed-capacity ring so `dmesg` can replay
//! it later, and Error/Warn lines are also written to the serial console
//! immediately. This is the kernel's only logging sink: there's no
//! userspace to hand log records to, and no allocator guarantee this early
//! in boot, so a `log`-crate-style global logger facade would have nothing
//! to sit in front of.

use core::fmt::{self, Write};
use heapless::Deque;
use spin::Mutex;

const LOG_LINE_CAP: usize = 120;
const LOG_RING_CAP: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum LogLevel {
    Error = 0,
    Warn = 1,
    Info = 2,
    Debug = 3,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "ERROR",
            LogLevel::Warn => "WARN",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
        }
    }
}

#[derive(Clone)]
pub struct LogLine {
    pub level: LogLevel,
    pub len: usize,
    pub text: [u8; LOG_LINE_CAP],
}

impl LogLine {
    pub fn as_str(&self) -> &str {
        core::str::from_utf8(&self.text[..self.len]).unwrap_or("<invalid utf8>")
    }
}

struct LineBuf {
    buf: [u8; LOG_LINE_CAP],
    len: usize,
}

impl Write for LineBuf {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let remaining = LOG_LINE_CAP - self.len;
        let take = core::cmp::min(remaining, s.len());
        self.buf[self.len..self.len + take].copy_from_slice(&s.as_bytes()[..take]);
        self.len += take;
        Ok(())
    }
}

static LOG_RING: Mutex<Deque<LogLine, LOG_RING_CAP>> = Mutex::new(Deque::new());

/// Format `args` into a line, push it to the ring, and mirror Error/Warn to serial.
pub fn log(level: LogLevel, args: fmt::Arguments<'_>) {
    let mut line = LineBuf { buf: [0; LOG_LINE_CAP], len: 0 };
    let _ = write!(line, "{}", args);

    let entry = LogLine { level, len: line.len, text: line.buf };

    {
        let mut ring = LOG_RING.lock();
        if ring.is_full() {
            ring.pop_front();
        }
        let _ = ring.push_back(entry.clone());
    }

    if level <= LogLevel::Warn {
        crate::drivers::serial::write_str(level.as_str());
        crate::drivers::serial::write_str(": ");
        crate::drivers::serial::write_str(entry.as_str());
        crate::drivers::serial::write_str("\n");
    }
}

/// Drain the ring buffer into `out`, oldest first (used by the `dmesg` shell command).
pub fn for_each_line<F: FnMut(&LogLine)>(mut out: F) {
    let ring = LOG_RING.lock();
    for line in ring.iter() {
        out(line);
    }
}

#[macro_export]
macro_rules! printk {
    ($level:expr, $($arg:tt)*) => {
        $crate::log::log($level, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => { $crate::printk!($crate::log::LogLevel::Error, $($arg)*) };
}

#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => { $crate::printk!($crate::log::LogLevel::Warn, $($arg)*) };
}

#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => { $crate::printk!($crate::log::LogLevel::Info, $($arg)*) };
}

#[macro_export]
macro_rules! debugk {
    ($($arg:tt)*) => { $crate::printk!($crate::log::LogLevel::Debug, $($arg)*) };
}

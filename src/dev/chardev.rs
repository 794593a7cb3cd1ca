//! Character-device classes: stream-style `read_buffer`/`write_buffer` plus
//! `has_data`/`ioctl`.

use spin::Mutex;

use crate::error::{Errno, KResult};

use super::{CHR_TTY, CHR_TTY_OTH};

#[derive(Clone, Copy)]
pub struct CharOps {
    pub read: fn(minor: u32, buf: &mut [u8], pos: i64) -> KResult<usize>,
    pub write: fn(minor: u32, buf: &[u8], pos: i64) -> KResult<usize>,
    pub has_data: fn(minor: u32) -> bool,
}

#[derive(Clone, Copy)]
pub struct CharClass {
    pub name: &'static str,
    pub ops: CharOps,
}

static CLASSES: Mutex<[Option<CharClass>; super::N_CHR]> = Mutex::new([None; super::N_CHR]);

pub fn register(major: usize, class: CharClass) -> KResult<()> {
    if major >= super::N_CHR {
        return Err(Errno::ENXIO);
    }
    CLASSES.lock()[major] = Some(class);
    Ok(())
}

pub fn read(major: usize, minor: u32, buf: &mut [u8], pos: i64) -> KResult<usize> {
    let classes = CLASSES.lock();
    let class = classes.get(major).and_then(|c| c.as_ref()).ok_or(Errno::ENODEV)?;
    (class.ops.read)(minor, buf, pos)
}

pub fn write(major: usize, minor: u32, buf: &[u8], pos: i64) -> KResult<usize> {
    let classes = CLASSES.lock();
    let class = classes.get(major).and_then(|c| c.as_ref()).ok_or(Errno::ENODEV)?;
    (class.ops.write)(minor, buf, pos)
}

pub fn has_data(major: usize, minor: u32) -> bool {
    let classes = CLASSES.lock();
    classes.get(major).and_then(|c| c.as_ref()).map(|c| (c.ops.has_data)(minor)).unwrap_or(false)
}

pub fn init() {
    let _ = register(
        CHR_TTY,
        CharClass {
            name: "tty",
            ops: CharOps {
                read: |_minor, buf, _pos| crate::tty::read_active(buf),
                write: |_minor, buf, _pos| crate::tty::write_active(buf),
                has_data: |_minor| crate::tty::has_input_active(),
            },
        },
    );
    let _ = register(
        CHR_TTY_OTH,
        CharClass {
            name: "ttyS0",
            ops: CharOps {
                read: |_minor, buf, _pos| {
                    let mut n = 0;
                    while n < buf.len() {
                        match crate::drivers::serial::read_byte() {
                            Some(b) => {
                                buf[n] = b;
                                n += 1;
                            }
                            None => break,
                        }
                    }
                    Ok(n)
                },
                write: |_minor, buf, _pos| {
                    for &b in buf {
                        crate::drivers::serial::write_byte(b);
                    }
                    Ok(buf.len())
                },
                has_data: |_minor| false,
            },
        },
    );
}

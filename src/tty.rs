//! Virtual console TTY layer (tty.c/kbd.c): scancode translation, a
//! per-VCS circular input buffer, canonical/raw line discipline, and the
//! keyboard+VGA bridge. `dev::chardev`'s tty class routes through
//! `read_active`/`write_active`/`has_input_active`; `drivers::keyboard`
//! feeds scancodes in through `feed_scancode`.

use spin::Mutex;

use crate::drivers::{keyboard, vga};
use crate::error::{Errno, KResult};

/// original_source's `N_VCSA_DEVICES`.
pub const N_VCS: usize = 8;
/// `termios.h`'s `MAX_INPUT`.
pub const MAX_INPUT: usize = 512;

/// Sane defaults (`stty_sane` in tty.c): canonical line discipline, local
/// echo, erase/kill echoed, newline translated to CRLF on output.
#[derive(Clone, Copy)]
pub struct Termios {
    pub canonical: bool,
    pub echo: bool,
    pub echoe: bool,
    pub echoke: bool,
    pub onlcr: bool,
}

impl Termios {
    const fn sane() -> Self {
        Termios { canonical: true, echo: true, echoe: true, echoke: true, onlcr: true }
    }
}

#[derive(Clone, Copy)]
pub struct Winsize {
    pub rows: u16,
    pub cols: u16,
}

struct InputQueue {
    buf: [u8; MAX_INPUT],
    start: usize,
    end: usize,
    len: usize,
}

impl InputQueue {
    const fn new() -> Self {
        InputQueue { buf: [0; MAX_INPUT], start: 0, end: 0, len: 0 }
    }

    fn push(&mut self, byte: u8) -> bool {
        if self.len == MAX_INPUT {
            return false;
        }
        self.buf[self.end] = byte;
        self.end = (self.end + 1) % MAX_INPUT;
        self.len += 1;
        true
    }

    /// Drop the most recently pushed byte (backspace/erase).
    fn pop_back(&mut self) -> Option<u8> {
        if self.len == 0 {
            return None;
        }
        self.end = (self.end + MAX_INPUT - 1) % MAX_INPUT;
        self.len -= 1;
        Some(self.buf[self.end])
    }

    fn pop_front(&mut self) -> Option<u8> {
        if self.len == 0 {
            return None;
        }
        let byte = self.buf[self.start];
        self.start = (self.start + 1) % MAX_INPUT;
        self.len -= 1;
        Some(byte)
    }

    fn contains_newline(&self) -> bool {
        let mut i = self.start;
        for _ in 0..self.len {
            if self.buf[i] == b'\n' {
                return true;
            }
            i = (i + 1) % MAX_INPUT;
        }
        false
    }
}

struct Vcs {
    input: InputQueue,
    termios: Termios,
    winsize: Winsize,
    backbuf: [u16; vga::WIDTH * vga::HEIGHT],
    cursor: usize,
}

impl Vcs {
    const fn new() -> Self {
        Vcs {
            input: InputQueue::new(),
            termios: Termios::sane(),
            winsize: Winsize { rows: vga::HEIGHT as u16, cols: vga::WIDTH as u16 },
            backbuf: [0; vga::WIDTH * vga::HEIGHT],
            cursor: 0,
        }
    }

    fn blank_cell() -> u16 {
        vga::make_cell(b' ', vga::DEFAULT_ATTRIBUTE)
    }

    fn put_char(&mut self, ch: u8) {
        match ch {
            b'\n' => {
                let row = self.cursor / vga::WIDTH;
                self.cursor = (row + 1) * vga::WIDTH;
            }
            0x08 => {
                if self.cursor % vga::WIDTH != 0 {
                    self.cursor -= 1;
                    self.backbuf[self.cursor] = Self::blank_cell();
                }
            }
            _ => {
                self.backbuf[self.cursor] = vga::make_cell(ch, vga::DEFAULT_ATTRIBUTE);
                self.cursor += 1;
            }
        }
        if self.cursor >= self.backbuf.len() {
            self.scroll();
        }
    }

    fn scroll(&mut self) {
        self.backbuf.copy_within(vga::WIDTH.., 0);
        for cell in &mut self.backbuf[self.backbuf.len() - vga::WIDTH..] {
            *cell = Self::blank_cell();
        }
        self.cursor -= vga::WIDTH;
    }

    fn clear(&mut self) {
        self.backbuf = [Self::blank_cell(); vga::WIDTH * vga::HEIGHT];
        self.cursor = 0;
    }
}

static VCS: Mutex<[Vcs; N_VCS]> = Mutex::new([
    Vcs::new(),
    Vcs::new(),
    Vcs::new(),
    Vcs::new(),
    Vcs::new(),
    Vcs::new(),
    Vcs::new(),
    Vcs::new(),
]);
static ACTIVE: Mutex<usize> = Mutex::new(0);

/// `(normal, shift, ctrl)` per make-code, QWERTY, scancodes 0x00-0x39
/// (kbd.c's `qwerty_layout`); anything beyond is unmapped.
const QWERTY: [(u8, u8, u8); 0x3A] = {
    let mut t = [(0u8, 0u8, 0u8); 0x3A];
    t[0x02] = (b'1', b'!', 0);
    t[0x03] = (b'2', b'@', 0);
    t[0x04] = (b'3', b'#', 0);
    t[0x05] = (b'4', b'$', 0);
    t[0x06] = (b'5', b'%', 0);
    t[0x07] = (b'6', b'^', 0);
    t[0x08] = (b'7', b'&', 0);
    t[0x09] = (b'8', b'*', 0);
    t[0x0A] = (b'9', b'(', 0);
    t[0x0B] = (b'0', b')', 0);
    t[0x0C] = (b'-', b'_', 0);
    t[0x0D] = (b'=', b'+', 0);
    t[0x0E] = (0x08, 0x08, 0);
    t[0x10] = (b'q', b'Q', 17);
    t[0x11] = (b'w', b'W', 23);
    t[0x12] = (b'e', b'E', 5);
    t[0x13] = (b'r', b'R', 18);
    t[0x14] = (b't', b'T', 20);
    t[0x15] = (b'y', b'Y', 25);
    t[0x16] = (b'u', b'U', 21);
    t[0x17] = (b'i', b'I', 9);
    t[0x18] = (b'o', b'O', 15);
    t[0x19] = (b'p', b'P', 16);
    t[0x1A] = (b'[', b'{', 0);
    t[0x1B] = (b']', b'}', 0);
    t[0x1C] = (b'\n', b'\n', 0);
    t[0x1E] = (b'a', b'A', 1);
    t[0x1F] = (b's', b'S', 19);
    t[0x20] = (b'd', b'D', 4);
    t[0x21] = (b'f', b'F', 6);
    t[0x22] = (b'g', b'G', 7);
    t[0x23] = (b'h', b'H', 8);
    t[0x24] = (b'j', b'J', 10);
    t[0x25] = (b'k', b'K', 11);
    t[0x26] = (b'l', b'L', 12);
    t[0x27] = (b';', b':', 0);
    t[0x28] = (b'\'', b'"', 0);
    t[0x2B] = (b'\\', b'|', 0);
    t[0x2C] = (b'z', b'Z', 26);
    t[0x2D] = (b'x', b'X', 24);
    t[0x2E] = (b'c', b'C', 3);
    t[0x2F] = (b'v', b'V', 22);
    t[0x30] = (b'b', b'B', 2);
    t[0x31] = (b'n', b'N', 14);
    t[0x32] = (b'm', b'M', 13);
    t[0x33] = (b',', b'<', 0);
    t[0x34] = (b'.', b'>', 0);
    t[0x35] = (b'/', b'?', 0);
    t[0x39] = (b' ', b' ', 0);
    t
};

/// Ctrl+F1..F8 switches the active VCS. Plain Ctrl rather than Alt, since
/// the Alt key isn't modeled separately here.
const CTRL_SWITCH_BASE: u8 = 0x3B; // F1 make code

fn translate(scancode: u8) -> Option<u8> {
    let entry = QWERTY.get(scancode as usize).copied().unwrap_or((0, 0, 0));
    let ch = if keyboard::ctrl_held() {
        entry.2
    } else if keyboard::shift_held() {
        entry.1
    } else {
        entry.0
    };
    if ch == 0 {
        None
    } else {
        Some(ch)
    }
}

/// Called from the keyboard IRQ handler with the raw make/break code.
pub fn feed_scancode(scancode: u8) {
    if scancode & 0x80 != 0 {
        return; // break code; only makes are translated (kbd.c behavior)
    }

    if keyboard::ctrl_held() && (CTRL_SWITCH_BASE..CTRL_SWITCH_BASE + N_VCS as u8).contains(&scancode) {
        switch_vcs((scancode - CTRL_SWITCH_BASE) as usize);
        return;
    }

    let Some(ch) = translate(scancode) else { return };

    let active = *ACTIVE.lock();
    let mut vcs = VCS.lock();
    let con = &mut vcs[active];

    if ch == 0x0C {
        // Ctrl-L: clear screen.
        con.clear();
        vga::blit(&con.backbuf);
        return;
    }

    if con.termios.canonical && ch == 0x08 {
        if con.input.pop_back().is_some() && con.termios.echoe {
            con.put_char(0x08);
            vga::blit(&con.backbuf);
        }
        return;
    }

    if !con.input.push(ch) {
        return; // full, drop
    }

    if con.termios.echo {
        // ONLCR: a bare '\n' also returns the cursor to column 0, which
        // `put_char` already does by advancing to the next row start.
        con.put_char(ch);
        vga::blit(&con.backbuf);
    }
}

fn switch_vcs(index: usize) {
    if index >= N_VCS {
        return;
    }
    *ACTIVE.lock() = index;
    let vcs = VCS.lock();
    vga::blit(&vcs[index].backbuf);
}

/// In canonical mode, only returns bytes once a full line (terminated by
/// `\n`) is buffered; in raw mode, returns whatever is immediately
/// available. Returns `Ok(0)` rather than blocking if nothing qualifies
/// (there is no task-blocking primitive wired to the tty layer yet).
pub fn read_active(buf: &mut [u8]) -> KResult<usize> {
    let active = *ACTIVE.lock();
    let mut vcs = VCS.lock();
    let con = &mut vcs[active];

    if con.termios.canonical && !con.input.contains_newline() {
        return Ok(0);
    }

    let mut n = 0;
    while n < buf.len() {
        match con.input.pop_front() {
            Some(byte) => {
                buf[n] = byte;
                n += 1;
                if con.termios.canonical && byte == b'\n' {
                    break;
                }
            }
            None => break,
        }
    }
    Ok(n)
}

pub fn write_active(buf: &[u8]) -> KResult<usize> {
    let active = *ACTIVE.lock();
    let mut vcs = VCS.lock();
    let con = &mut vcs[active];
    for &byte in buf {
        con.put_char(byte);
    }
    vga::blit(&con.backbuf);
    Ok(buf.len())
}

pub fn has_input_active() -> bool {
    let active = *ACTIVE.lock();
    let vcs = VCS.lock();
    let con = &vcs[active];
    if con.termios.canonical {
        con.input.contains_newline()
    } else {
        con.input.len > 0
    }
}

pub fn winsize_active() -> Winsize {
    let active = *ACTIVE.lock();
    VCS.lock()[active].winsize
}

pub fn set_termios_active(canonical: bool, echo: bool) -> KResult<()> {
    let active = *ACTIVE.lock();
    let mut vcs = VCS.lock();
    let con = vcs.get_mut(active).ok_or(Errno::ENODEV)?;
    con.termios.canonical = canonical;
    con.termios.echo = echo;
    Ok(())
}

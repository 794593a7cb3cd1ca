//! PS/2 keyboard driver: reads scancodes from port 0x60 on IRQ1 and feeds
//! them to the tty layer, which owns the layout table and modifier state.
//! This module only drains the hardware FIFO.

use spin::Mutex;

const DATA_PORT: u16 = 0x60;
const STATUS_PORT: u16 = 0x64;
const STATUS_OUTPUT_FULL: u8 = 0x01;

static SHIFT_HELD: Mutex<bool> = Mutex::new(false);
static CTRL_HELD: Mutex<bool> = Mutex::new(false);

/// Called from the IRQ1 handler. Reads one scancode (if present) and hands
/// it to the tty layer for layout translation.
pub fn on_irq() {
    if let Some(code) = read_scancode() {
        track_modifiers(code);
        crate::tty::feed_scancode(code);
    }
}

fn read_scancode() -> Option<u8> {
    let status = unsafe { crate::arch::x86::cpu::inb(STATUS_PORT) };
    if status & STATUS_OUTPUT_FULL == 0 {
        return None;
    }
    Some(unsafe { crate::arch::x86::cpu::inb(DATA_PORT) })
}

fn track_modifiers(code: u8) {
    const LSHIFT_MAKE: u8 = 0x2A;
    const RSHIFT_MAKE: u8 = 0x36;
    const LCTRL_MAKE: u8 = 0x1D;
    const RELEASE_BIT: u8 = 0x80;

    let released = code & RELEASE_BIT != 0;
    let base = code & !RELEASE_BIT;
    match base {
        LSHIFT_MAKE | RSHIFT_MAKE => *SHIFT_HELD.lock() = !released,
        LCTRL_MAKE => *CTRL_HELD.lock() = !released,
        _ => {}
    }
}

pub fn shift_held() -> bool {
    *SHIFT_HELD.lock()
}

pub fn ctrl_held() -> bool {
    *CTRL_HELD.lock()
}

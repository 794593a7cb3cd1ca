//! IRQ dispatch table, `irq_happened` wait counters, and the fatal vs.
//! logged exception split.

use core::sync::atomic::{AtomicU32, Ordering};
use spin::Mutex;

use super::idt::InterruptFrame;

const IRQ_COUNT: usize = 16;

type IrqHandler = fn(u8);

static IRQ_TABLE: Mutex<[Option<IrqHandler>; IRQ_COUNT]> = Mutex::new([None; IRQ_COUNT]);
static IRQ_HAPPENED: [AtomicU32; IRQ_COUNT] = [
    AtomicU32::new(0), AtomicU32::new(0), AtomicU32::new(0), AtomicU32::new(0),
    AtomicU32::new(0), AtomicU32::new(0), AtomicU32::new(0), AtomicU32::new(0),
    AtomicU32::new(0), AtomicU32::new(0), AtomicU32::new(0), AtomicU32::new(0),
    AtomicU32::new(0), AtomicU32::new(0), AtomicU32::new(0), AtomicU32::new(0),
];

/// Install a handler for IRQ `n` (0..16). Overwrites any previous handler.
pub fn set_handler(irq: u8, handler: IrqHandler) {
    IRQ_TABLE.lock()[irq as usize] = Some(handler);
}

pub fn handle_irq(irq: u8) {
    IRQ_HAPPENED[irq as usize].fetch_add(1, Ordering::Release);
    if let Some(handler) = IRQ_TABLE.lock()[irq as usize] {
        handler(irq);
    }
}

/// Block (via `hlt` in a loop) until IRQ `n` fires at least once more.
pub fn irq_wait(irq: u8) {
    let before = IRQ_HAPPENED[irq as usize].load(Ordering::Acquire);
    while IRQ_HAPPENED[irq as usize].load(Ordering::Acquire) == before {
        unsafe { super::cpu::halt() };
    }
}

pub fn irq_enable(irq: u8) {
    super::pic::enable_irq(irq);
}

pub fn irq_disable(irq: u8) {
    super::pic::disable_irq(irq);
}

/// Vectors that imply corrupted kernel state and must panic rather than
/// log-and-continue: divide-error, invalid opcode, double fault.
fn is_fatal(vector: u8) -> bool {
    matches!(vector, 0x00 | 0x06 | 0x08)
}

pub fn handle_exception(vector: u8, frame: &InterruptFrame) {
    match vector {
        0x0D | 0x0E => {
            let cr2 = if vector == 0x0E { read_cr2() } else { 0 };
            crate::error!(
                "exception {:#04x} at cs:eip={:#06x}:{:#010x} err={:#x} cr2={:#010x}",
                vector,
                frame.cs,
                frame.eip,
                frame.error_code,
                cr2
            );
            // GPF and page fault hang rather than panic: the faulting context
            // is usually still inspectable over serial this way.
            loop {
                unsafe { super::cpu::halt() };
            }
        }
        _ if is_fatal(vector) => {
            panic!("fatal CPU exception {:#04x} at eip={:#010x}", vector, frame.eip);
        }
        _ => {
            crate::warn!(
                "exception {:#04x} at cs:eip={:#06x}:{:#010x} err={:#x}",
                vector,
                frame.cs,
                frame.eip,
                frame.error_code
            );
        }
    }
}

/// 0x30-0xFF dummy call gates: no-op, logged.
pub fn handle_dummy_gate(vector: u8) {
    crate::debugk!("dummy call gate {:#04x} invoked", vector);
}

fn read_cr2() -> u32 {
    let value: u32;
    unsafe {
        core::arch::asm!("mov {}, cr2", out(reg) value, options(nomem, nostack, preserves_flags));
    }
    value
}

//! Kernel panic handler.
//!
//! Exceptions and faults that imply corrupted kernel state call `panic()`,
//! which disables interrupts, clears the screen, prints the message, and
//! halts forever. Recursive panics are caught and degrade to a minimal
//! serial-only message rather than looping.

use core::panic::PanicInfo;
use core::sync::atomic::{AtomicBool, AtomicU64, Ordering};

static PANICKING: AtomicBool = AtomicBool::new(false);
static PANIC_COUNT: AtomicU64 = AtomicU64::new(0);

pub fn panic_handler(info: &PanicInfo<'_>) -> ! {
    if PANICKING.swap(true, Ordering::SeqCst) {
        crate::drivers::serial::write_str("\n!!! recursive panic, halting !!!\n");
        halt();
    }
    let n = PANIC_COUNT.fetch_add(1, Ordering::SeqCst) + 1;

    unsafe { crate::arch::x86::cpu::disable_interrupts() };
    crate::drivers::vga::clear_screen();

    crate::drivers::serial::write_str("\n*** KERNEL PANIC ");
    if n > 1 {
        crate::drivers::serial::write_str("(repeated) ");
    }
    crate::drivers::serial::write_str("***\n");

    if let Some(loc) = info.location() {
        crate::error!("panic at {}:{}:{}", loc.file(), loc.line(), loc.column());
    } else {
        crate::error!("panic at <unknown location>");
    }
    crate::error!("{}", info.message());

    crate::drivers::vga::print_str("\n*** KERNEL PANIC - system halted ***\n");
    halt();
}

fn halt() -> ! {
    loop {
        unsafe { crate::arch::x86::cpu::halt() };
    }
}

pub fn panic_count() -> u64 {
    PANIC_COUNT.load(Ordering::Relaxed)
}

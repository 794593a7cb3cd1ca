//! Two cascaded 8259A-class PICs, remapped from 0x08/0x70 to 0x20/0x28.
//! Uses the `pic8259` crate for the ICW1-4 programming
//! sequence; everything above this (the IDT vector layout, IRQ dispatch
//! table) lives in `idt`/`interrupts`.

use pic8259::ChainedPics;
use spin::Mutex;

pub const PIC1_OFFSET: u8 = 0x20;
pub const PIC2_OFFSET: u8 = 0x28;

pub static PICS: Mutex<ChainedPics> =
    Mutex::new(unsafe { ChainedPics::new(PIC1_OFFSET, PIC2_OFFSET) });

/// Remap both PICs and mask every IRQ. Must run with interrupts disabled.
pub fn init() {
    unsafe { PICS.lock().initialize() };
}

pub fn enable_irq(irq: u8) {
    let mut pics = PICS.lock();
    unsafe {
        let masks = pics.read_masks();
        let mut masks = masks;
        if irq < 8 {
            masks[0] &= !(1 << irq);
        } else {
            masks[1] &= !(1 << (irq - 8));
            masks[0] &= !(1 << 2); // cascade line
        }
        pics.write_masks(masks[0], masks[1]);
    }
}

pub fn disable_irq(irq: u8) {
    let mut pics = PICS.lock();
    unsafe {
        let mut masks = pics.read_masks();
        if irq < 8 {
            masks[0] |= 1 << irq;
        } else {
            masks[1] |= 1 << (irq - 8);
        }
        pics.write_masks(masks[0], masks[1]);
    }
}

/// Send EOI for `vector`. Safe to call unconditionally from `irq_handler`;
/// the crate itself decides whether the slave also needs one.
pub fn end_of_interrupt(vector: u8) {
    let mut pics = PICS.lock();
    if unsafe { pics.handles_interrupt(vector) } {
        unsafe { pics.notify_end_of_interrupt(vector) };
    }
}

//! x86 (32-bit, protected mode) architecture support: segmentation,
//! interrupt dispatch, and the port-I/O/CPU-control primitives everything
//! else is built on.

pub mod cpu;
pub mod gdt;
pub mod idt;
pub mod interrupts;
pub mod pic;
pub mod tss;

/// `cpu_setup()`: build the GDT, remap and arm the PICs, load the IDT.
/// Called once from `main` after the bootstrap stack is live but before
/// paging or the heap exist.
pub fn cpu_setup() {
    unsafe { cpu::disable_interrupts() };
    gdt::init();
    pic::init();
    idt::init();
}

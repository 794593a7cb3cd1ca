//! coselle: an experimental 32-bit protected-mode x86 kernel.
//!
//! Boot sequence: bootloader → CPU init → interrupt tables → physical
//! memory + paging → heap → device registry → VFS mounts root ramfs →
//! timer enabled, scheduler armed → shell.

#![no_std]
#![no_main]

extern crate alloc;

pub mod arch;
pub mod boot;
pub mod build_info;
pub mod dev;
pub mod drivers;
pub mod error;
pub mod fs;
pub mod log;
pub mod mm;
pub mod multiboot;
pub mod net;
pub mod panic;
pub mod pci;
pub mod sched;
pub mod shell;
pub mod syscall;
pub mod time;
pub mod tty;
pub mod vfs;

use core::panic::PanicInfo;
use core::sync::atomic::{AtomicU32, Ordering};

use multiboot::MultibootInfo;

#[panic_handler]
fn on_panic(info: &PanicInfo<'_>) -> ! {
    panic::panic_handler(info)
}

extern "C" {
    static _kernel_end_phys: u8;
}

static BOOT_EPOCH: AtomicU32 = AtomicU32::new(0);

/// Unix time at the moment `kernel_main` ran `time::unix_now()` for the
/// first time, used by the shell's `uptime` command.
pub fn boot_epoch() -> u32 {
    BOOT_EPOCH.load(Ordering::Relaxed)
}

fn timer_tick(_vector: u8) {
    static TICKS: AtomicU32 = AtomicU32::new(0);
    let tick = TICKS.fetch_add(1, Ordering::Relaxed) as u64 + 1;
    sched::on_tick(tick);
}

pub fn kernel_main(multiboot_info_phys: u32, multiboot_magic: u32) -> ! {
    arch::x86::cpu_setup();
    drivers::serial::init();

    build_info::print_banner();

    let mboot = unsafe { MultibootInfo::from_boot_registers(multiboot_info_phys, multiboot_magic) };
    let Some(mboot) = mboot else {
        crate::error!("not booted via Multiboot v1, halting");
        loop {
            unsafe { arch::x86::cpu::halt() };
        }
    };

    let kernel_end_phys = unsafe { core::ptr::addr_of!(_kernel_end_phys) as u32 };
    let modules_end_phys = mboot.highest_module_end();
    mm::pmem::setup(mboot.mem_upper_kb(), kernel_end_phys, modules_end_phys);
    mm::paging::setup(core::cmp::max(kernel_end_phys, modules_end_phys) + mm::pmem::PAGE_BYTES);
    mm::heap::init();

    dev::init();
    drivers::vga::clear_screen();

    fs::init();
    if let Err(e) = vfs::mount_root("ramfs", "") {
        crate::error!("root mount failed: {}", e);
    }

    syscall::init();

    arch::x86::interrupts::set_handler(0, timer_tick);
    arch::x86::interrupts::set_handler(1, |_| drivers::keyboard::on_irq());
    arch::x86::pic::enable_irq(0);
    arch::x86::pic::enable_irq(1);

    net::init();
    pci::init();

    BOOT_EPOCH.store(time::unix_now(), Ordering::Relaxed);

    unsafe { arch::x86::cpu::enable_interrupts() };

    crate::info!("coselle: boot complete, entering shell");
    shell::run()
}

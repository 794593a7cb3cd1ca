//! Global Descriptor Table: kernel/user code+data, a default LDT, and a
//! pool of per-task TSS descriptors.
//!
//! Unlike a long-mode kernel, hardware task switching here is load-bearing:
//! every live task owns a TSS descriptor allocated from this pool, and the
//! scheduler (`crate::sched`) context-switches by loading the task register
//! rather than by hand-saving registers on a software stack.

use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicBool, Ordering};

use spin::Mutex;

/// Matches original_source/arch/i386.c: `N_TASKS`.
pub const N_TASKS: usize = 40;

const NULL_INDEX: u16 = 0;
const KERNEL_CODE_INDEX: u16 = 1;
const KERNEL_DATA_INDEX: u16 = 2;
const USER_CODE_INDEX: u16 = 3;
const USER_DATA_INDEX: u16 = 4;
const DEFAULT_LDT_INDEX: u16 = 5;
const FIRST_TASK_INDEX: u16 = 6;

/// `N_GDT = 5 + N_TASKS * 2` (original_source/arch/i386.c), plus the null
/// descriptor at index 0.
pub const GDT_ENTRY_COUNT: usize = 1 + 5 + N_TASKS * 2;

const RPL_RING0: u16 = 0;
const RPL_RING3: u16 = 3;

pub const KERNEL_CODE_SELECTOR: u16 = (KERNEL_CODE_INDEX << 3) | RPL_RING0;
pub const KERNEL_DATA_SELECTOR: u16 = (KERNEL_DATA_INDEX << 3) | RPL_RING0;
pub const USER_CODE_SELECTOR: u16 = (USER_CODE_INDEX << 3) | RPL_RING3;
pub const USER_DATA_SELECTOR: u16 = (USER_DATA_INDEX << 3) | RPL_RING3;
pub const DEFAULT_LDT_SELECTOR: u16 = DEFAULT_LDT_INDEX << 3;

// Access-byte bits (32-bit protected-mode descriptor format).
const ACCESS_PRESENT: u8 = 1 << 7;
const ACCESS_SEGMENT: u8 = 1 << 4; // 1 = code/data, 0 = system
const ACCESS_EXECUTABLE: u8 = 1 << 3;
const ACCESS_RW: u8 = 1 << 1;
const ACCESS_DPL3: u8 = 0b11 << 5;
const ACCESS_TSS32_AVAILABLE: u8 = 0x9;
const ACCESS_TSS32_BUSY: u8 = 0xB;
const ACCESS_LDT: u8 = 0x2;

// Granularity-byte upper nibble: G (4 KiB granularity) and D/B (32-bit).
const FLAGS_GRANULARITY_4K: u8 = 1 << 7;
const FLAGS_SIZE_32BIT: u8 = 1 << 6;

#[repr(C, packed)]
struct DescriptorTablePointer {
    limit: u16,
    base: u32,
}

#[inline]
const fn build_descriptor(base: u32, limit: u32, access: u8, flags: u8) -> u64 {
    let mut d = 0u64;
    d |= (limit as u64) & 0xFFFF;
    d |= ((base as u64) & 0xFFFF) << 16;
    d |= (((base >> 16) as u64) & 0xFF) << 32;
    d |= (access as u64) << 40;
    d |= (((limit >> 16) as u64) & 0x0F) << 48;
    d |= ((flags as u64) & 0x0F) << 52;
    d |= (((base >> 24) as u64) & 0xFF) << 56;
    d
}

struct GdtTable(UnsafeCell<[u64; GDT_ENTRY_COUNT]>);
unsafe impl Sync for GdtTable {}

static GDT: GdtTable = GdtTable(UnsafeCell::new([0; GDT_ENTRY_COUNT]));
static NEXT_FREE: Mutex<u16> = Mutex::new(FIRST_TASK_INDEX);
static INITIALIZED: AtomicBool = AtomicBool::new(false);

extern "C" {
    fn gdt_flush(ptr: *const DescriptorTablePointer, code_sel: u16, data_sel: u16);
}

core::arch::global_asm!(
    r#"
.section .text
.global gdt_flush
.type gdt_flush, @function
gdt_flush:
    mov eax, [esp + 4]
    lgdt [eax]
    movzx eax, word ptr [esp + 12]
    mov ds, ax
    mov es, ax
    mov fs, ax
    mov gs, ax
    mov ss, ax
    movzx eax, word ptr [esp + 8]
    push eax
    push offset .reload_cs
    retf
.reload_cs:
    ret
"#,
);

fn set_entry(index: u16, descriptor: u64) {
    unsafe {
        let table = &mut *GDT.0.get();
        table[index as usize] = descriptor;
    }
}

/// Build the fixed kernel/user/LDT descriptors and load the GDT + data
/// segment registers + (via a far return) the code segment register.
pub fn init() {
    set_entry(NULL_INDEX, 0);

    set_entry(
        KERNEL_CODE_INDEX,
        build_descriptor(
            0,
            0xFFFFF,
            ACCESS_PRESENT | ACCESS_SEGMENT | ACCESS_EXECUTABLE | ACCESS_RW,
            FLAGS_GRANULARITY_4K | FLAGS_SIZE_32BIT,
        ),
    );
    set_entry(
        KERNEL_DATA_INDEX,
        build_descriptor(
            0,
            0xFFFFF,
            ACCESS_PRESENT | ACCESS_SEGMENT | ACCESS_RW,
            FLAGS_GRANULARITY_4K | FLAGS_SIZE_32BIT,
        ),
    );
    set_entry(
        USER_CODE_INDEX,
        build_descriptor(
            0,
            0xFFFFF,
            ACCESS_PRESENT | ACCESS_DPL3 | ACCESS_SEGMENT | ACCESS_EXECUTABLE | ACCESS_RW,
            FLAGS_GRANULARITY_4K | FLAGS_SIZE_32BIT,
        ),
    );
    set_entry(
        USER_DATA_INDEX,
        build_descriptor(
            0,
            0xFFFFF,
            ACCESS_PRESENT | ACCESS_DPL3 | ACCESS_SEGMENT | ACCESS_RW,
            FLAGS_GRANULARITY_4K | FLAGS_SIZE_32BIT,
        ),
    );
    // Default LDT: empty (base=0, limit=0) until a task installs its own.
    set_entry(
        DEFAULT_LDT_INDEX,
        build_descriptor(0, 0, ACCESS_PRESENT | ACCESS_LDT, 0),
    );

    let ptr = DescriptorTablePointer {
        limit: (core::mem::size_of::<u64>() * GDT_ENTRY_COUNT - 1) as u16,
        base: unsafe { (*GDT.0.get()).as_ptr() as u32 },
    };

    unsafe {
        gdt_flush(&ptr, KERNEL_CODE_SELECTOR, KERNEL_DATA_SELECTOR);
    }

    INITIALIZED.store(true, Ordering::Release);
}

pub fn is_initialized() -> bool {
    INITIALIZED.load(Ordering::Acquire)
}

/// Allocate the lowest free task-descriptor pair (TSS slot) and install a
/// 32-bit available-TSS descriptor pointing at `tss_base`/`tss_limit`.
/// Returns the GDT index, or 0 on exhaustion.
pub fn gdt_alloc_task_descriptor(tss_base: u32, tss_limit: u32) -> u16 {
    let mut next = NEXT_FREE.lock();
    if *next as usize >= GDT_ENTRY_COUNT {
        return 0;
    }
    let index = *next;
    set_entry(
        index,
        build_descriptor(
            tss_base,
            tss_limit,
            ACCESS_PRESENT | ACCESS_TSS32_AVAILABLE,
            0,
        ),
    );
    *next += 1;
    index
}

/// Clear the busy bit of a TSS descriptor before it is reloaded into TR —
/// the CPU refuses to `ltr` a descriptor that's still marked busy.
pub fn clear_busy_bit(index: u16) {
    unsafe {
        let table = &mut *GDT.0.get();
        let entry = &mut table[index as usize];
        let access = ((*entry >> 40) & 0xFF) as u8;
        if access & 0x0F == ACCESS_TSS32_BUSY {
            let cleared = (access & !0x0F) | ACCESS_TSS32_AVAILABLE;
            *entry = (*entry & !(0xFFu64 << 40)) | ((cleared as u64) << 40);
        }
    }
}

pub fn task_selector(index: u16) -> u16 {
    index << 3
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gdt_entry_count_matches_n_tasks() {
        assert_eq!(GDT_ENTRY_COUNT, 1 + 5 + N_TASKS * 2);
    }

    #[test]
    fn selectors_carry_expected_rpl() {
        assert_eq!(KERNEL_CODE_SELECTOR & 0b11, 0);
        assert_eq!(USER_CODE_SELECTOR & 0b11, 3);
    }
}

//! Low-level task-switch plumbing: the interrupt-stack-frame size
//! arithmetic from `task_sysinfo_size`/`intr_context_esp` in
//! original_source's tasks.c, and the far jump that performs a hardware
//! TSS switch.
//!
//! Task switching here is a genuine x86 hardware task switch (`jmp far`
//! to a TSS-type selector reloads every GPR, segment register, `eip`,
//! `eflags`, `esp`/`ss` straight from the target TSS) — the textbook
//! mechanism the per-task TSS descriptors built by `arch::x86::gdt` exist
//! to support. The `task_sysinfo_size` arithmetic is still carried here,
//! sizing the "as if interrupted" frame `task::task_init` pre-seeds at the
//! top of a new task's kernel stack.

/// Saved segment registers at the top of a freshly-seeded kernel stack:
/// gs, fs, es, ds.
pub const CONTEXT_WORDS: usize = 4;

/// `task_sysinfo_size`: eip/cs/eflags only for a ring-0 task (3 words);
/// ring-3 tasks additionally carry esp3/ss3 (5 words).
pub fn sysinfo_words(is_kernel_task: bool) -> usize {
    if is_kernel_task {
        3
    } else {
        5
    }
}

/// Bytes occupied by the full preloaded frame (sysinfo words + the saved
/// segment-register context block).
pub fn frame_size_bytes(is_kernel_task: bool) -> u32 {
    ((CONTEXT_WORDS + sysinfo_words(is_kernel_task)) * 4) as u32
}

/// Writes a plausible "as if interrupted" frame at the top of a new
/// task's kernel stack and returns the resulting stack pointer
/// (`task_init`'s `tss->esp0 - ...` bookkeeping, folded into one call).
///
/// # Safety
/// `kstack_top` must point one-past-the-end of a stack region at least
/// `frame_size_bytes` bytes, entirely owned by the new task.
pub unsafe fn seed_kernel_stack(
    kstack_top: u32,
    eip: u32,
    cs: u16,
    eflags: u32,
    user_esp_ss: Option<(u32, u16)>,
    ds: u16,
    es: u16,
    fs: u16,
    gs: u16,
) -> u32 {
    let is_kernel_task = user_esp_ss.is_none();
    let sp = kstack_top - frame_size_bytes(is_kernel_task);
    let write_u32 = |offset: u32, value: u32| unsafe {
        core::ptr::write_volatile((sp + offset) as *mut u32, value);
    };

    write_u32(0, eip);
    write_u32(4, cs as u32);
    write_u32(8, eflags);
    if let Some((esp3, ss3)) = user_esp_ss {
        write_u32(12, esp3);
        write_u32(16, ss3 as u32);
    }

    let sysinfo_bytes = (sysinfo_words(is_kernel_task) * 4) as u32;
    let write_ctx = |offset: u32, value: u32| unsafe {
        core::ptr::write_volatile((sp + sysinfo_bytes + offset) as *mut u32, value);
    };
    write_ctx(0, gs as u32);
    write_ctx(4, fs as u32);
    write_ctx(8, es as u32);
    write_ctx(12, ds as u32);

    sp
}

extern "C" {
    fn task_switch_far_jump(selector: u16);
}

core::arch::global_asm!(
    r#"
.section .text
.global task_switch_far_jump
.type task_switch_far_jump, @function
task_switch_far_jump:
    mov eax, [esp + 4]
    sub esp, 6
    mov dword ptr [esp], 0
    mov word ptr [esp + 4], ax
    jmp far ptr [esp]
    add esp, 6
    ret
"#,
);

/// Performs a hardware task switch to the TSS descriptor at `selector`
/// (a value from `arch::x86::gdt::task_selector`). Returns once this
/// task is switched back in by some future call to this same function.
///
/// # Safety
/// `selector` must reference a present, non-busy, TSS-type GDT
/// descriptor whose TSS is fully initialized (`task::task_init`'s job).
pub unsafe fn far_jump_to_task(selector: u16) {
    task_switch_far_jump(selector);
}

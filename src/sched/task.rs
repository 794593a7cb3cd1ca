//! Task construction: `task_init`/`task_kthread_init` from tasks.c,
//! translated to build a hardware TSS and its pre-seeded kernel-stack
//! frame instead of software-switch bookkeeping (see `sched::context`).

use alloc::boxed::Box;

use crate::arch::x86::gdt;
use crate::arch::x86::tss::TaskStateSegment;
use crate::error::{Errno, KResult};
use crate::sched::context;

pub type TaskId = u16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Ready,
    Running,
    Stopped,
}

pub struct Task {
    pub id: TaskId,
    pub tss: Box<TaskStateSegment>,
    pub state: TaskState,
}

/// `task_init(task, entry, kstack_top, ustack_top, code_sel, data_sel)`:
/// fills a TSS, allocates its GDT slot, and preloads the kernel stack as
/// if a cross-privilege interrupt had just returned from `entry`.
pub fn task_init(
    entry: u32,
    kstack_top: u32,
    ustack_top: u32,
    code_sel: u16,
    data_sel: u16,
) -> KResult<Task> {
    let is_kernel_task = code_sel == gdt::KERNEL_CODE_SELECTOR;

    let mut tss = TaskStateSegment::new();
    tss.eip = entry;
    tss.eflags = 0x0202;
    tss.cs = code_sel;
    tss.ds = data_sel;
    tss.es = data_sel;
    tss.fs = data_sel;
    tss.gs = data_sel;
    tss.ldt = gdt::DEFAULT_LDT_SELECTOR;
    tss.ss0 = gdt::KERNEL_DATA_SELECTOR;

    if is_kernel_task {
        tss.esp = kstack_top;
        tss.ss = gdt::KERNEL_DATA_SELECTOR;
    } else {
        tss.esp = ustack_top;
        tss.ss = data_sel;
    }

    let user_esp_ss = if is_kernel_task { None } else { Some((ustack_top, data_sel)) };
    tss.esp0 = unsafe {
        context::seed_kernel_stack(
            kstack_top, entry, code_sel, tss.eflags, user_esp_ss, data_sel, data_sel, data_sel,
            data_sel,
        )
    };

    let mut tss_box = Box::new(tss);
    let tss_base = tss_box.as_mut() as *mut TaskStateSegment as u32;
    let tss_limit = tss_box.limit();

    let gdt_index = gdt::gdt_alloc_task_descriptor(tss_base, tss_limit);
    if gdt_index == 0 {
        return Err(Errno::EAGAIN);
    }

    Ok(Task { id: gdt_index, tss: tss_box, state: TaskState::Ready })
}

/// `task_kthread_init(task, entry, kstack)`: the ring-0 specialization.
pub fn task_kthread_init(entry: u32, kstack_top: u32) -> KResult<Task> {
    task_init(entry, kstack_top, kstack_top, gdt::KERNEL_CODE_SELECTOR, gdt::KERNEL_DATA_SELECTOR)
}

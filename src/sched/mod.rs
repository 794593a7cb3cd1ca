//! Preemptive multitasking (tasks.c): building tasks on top of hardware
//! TSS descriptors, and rotating them on the timer tick.

pub mod context;
pub mod scheduler;
pub mod task;

use crate::error::KResult;
use task::TaskId;

/// Build and register a task, ready to be run by the scheduler.
pub fn spawn_kthread(entry: u32, kstack_top: u32) -> KResult<TaskId> {
    let t = task::task_kthread_init(entry, kstack_top)?;
    Ok(scheduler::add_task(t))
}

pub fn spawn_user_task(
    entry: u32,
    kstack_top: u32,
    ustack_top: u32,
    code_sel: u16,
    data_sel: u16,
) -> KResult<TaskId> {
    let t = task::task_init(entry, kstack_top, ustack_top, code_sel, data_sel)?;
    Ok(scheduler::add_task(t))
}

pub use scheduler::{current, on_tick, set_initial_task, set_scheduler};

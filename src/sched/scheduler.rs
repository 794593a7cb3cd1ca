//! Timer-tick task rotation (`task_set_scheduler`/`task_timer_handler`
//! in tasks.c). Model: single-CPU, cooperative plus timer-driven rotation
//! — `on_tick` only ever switches when the registered callback names a
//! different task, and runs with interrupts already disabled (the timer
//! IRQ is delivered through an interrupt gate), so no locks are needed
//! around the switch itself.

use alloc::collections::BTreeMap;

use spin::Mutex;

use crate::arch::x86::gdt;
use crate::sched::task::{Task, TaskId, TaskState};

/// `next_callback(tick)`: returns the task to run next, or `None` to keep
/// running the current one.
pub type NextTaskFn = fn(tick: u64) -> Option<TaskId>;

static TASKS: Mutex<BTreeMap<TaskId, Task>> = Mutex::new(BTreeMap::new());
static SCHEDULER: Mutex<Option<NextTaskFn>> = Mutex::new(None);
static CURRENT: Mutex<Option<TaskId>> = Mutex::new(None);

pub fn add_task(task: Task) -> TaskId {
    let id = task.id;
    TASKS.lock().insert(id, task);
    id
}

/// The first task ever added becomes current without a switch (there is
/// nothing to save yet).
pub fn set_initial_task(id: TaskId) {
    *CURRENT.lock() = Some(id);
    if let Some(task) = TASKS.lock().get_mut(&id) {
        task.state = TaskState::Running;
    }
}

/// `task_set_scheduler(next_callback)`.
pub fn set_scheduler(next: NextTaskFn) {
    *SCHEDULER.lock() = Some(next);
}

pub fn current() -> Option<TaskId> {
    *CURRENT.lock()
}

/// Invoked from the timer IRQ handler on every tick.
pub fn on_tick(tick: u64) {
    let Some(next_fn) = *SCHEDULER.lock() else { return };
    let Some(next_id) = next_fn(tick) else { return };

    let cur_id = *CURRENT.lock();
    if cur_id == Some(next_id) {
        return;
    }
    if !TASKS.lock().contains_key(&next_id) {
        crate::warn!("sched: next_callback named unknown task {}", next_id);
        return;
    }

    {
        let mut tasks = TASKS.lock();
        if let Some(cur) = cur_id {
            if let Some(task) = tasks.get_mut(&cur) {
                task.state = TaskState::Ready;
            }
        }
        if let Some(task) = tasks.get_mut(&next_id) {
            task.state = TaskState::Running;
        }
    }

    // Clear busy bit before reloading TR with this descriptor, then
    // perform the hardware task switch.
    gdt::clear_busy_bit(next_id);
    *CURRENT.lock() = Some(next_id);
    unsafe {
        crate::sched::context::far_jump_to_task(gdt::task_selector(next_id));
    }
}

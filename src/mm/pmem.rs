//! Physical memory as a sequence of page frames: a bump allocator over the
//! Multiboot-reported usable range, plus a free list for reclaimed frames
//! that don't happen to sit at the bump edge.
//!
//! Grounded on original_source/src/mem/pmem.c, extended with a real
//! intrusive free list for the interior-free case.

use spin::Mutex;

use crate::error::{Errno, KResult};

pub const PAGE_BYTES: u32 = 4096;
const UPPER_MEMORY_OFFSET: u32 = 0x0010_0000;

/// A singly-linked free-list node stored inline in the freed frame itself.
#[repr(C)]
struct FreeNode {
    next: u32, // page index of next free run's start, or u32::MAX
    len: u32,  // run length in pages
}

struct PmemState {
    /// One past the highest page index ever handed out by the bump path.
    edge: u32,
    /// Highest usable page index (exclusive), from the Multiboot memory map.
    end_of_upper_memory: u32,
    /// Head of the free list, or `None`.
    free_head: Option<u32>,
}

static STATE: Mutex<Option<PmemState>> = Mutex::new(None);

/// Consume the Multiboot memory map and module list; compute the bump edge
/// past the kernel image and every module.
pub fn setup(upper_memory_kb: u32, kernel_end_phys: u32, modules_end_phys: u32) {
    let mut upper_memory_pages = upper_memory_kb / (PAGE_BYTES / 1024);
    const CAP_PAGES: u32 = 1024 * 1024; // 4 GiB worth of 4 KiB pages, minus one
    if upper_memory_pages >= CAP_PAGES {
        upper_memory_pages = CAP_PAGES - 1;
        crate::info!("capping usable RAM at 4096 MiB");
    }

    let end_of_upper_memory = (UPPER_MEMORY_OFFSET / PAGE_BYTES) + upper_memory_pages;

    let free_edge_phys = core::cmp::max(kernel_end_phys, modules_end_phys);
    let edge = page_aligned_up(free_edge_phys);

    *STATE.lock() = Some(PmemState { edge, end_of_upper_memory, free_head: None });
}

fn page_aligned_up(addr: u32) -> u32 {
    if addr % PAGE_BYTES == 0 {
        addr / PAGE_BYTES
    } else {
        1 + addr / PAGE_BYTES
    }
}

/// Reserve `pages_count` contiguous, page-aligned frames. Tries the free
/// list first (first-fit over runs), then falls back to the bump edge.
pub fn alloc(pages_count: u32) -> KResult<u32> {
    let mut guard = STATE.lock();
    let state = guard.as_mut().expect("pmem::setup not called");

    if let Some(addr) = alloc_from_free_list(state, pages_count) {
        return Ok(addr);
    }

    let old_edge = state.edge;
    let new_edge = old_edge + pages_count;
    if new_edge > state.end_of_upper_memory {
        return Err(Errno::ENOMEM);
    }
    state.edge = new_edge;
    Ok(old_edge * PAGE_BYTES)
}

fn alloc_from_free_list(state: &mut PmemState, pages_count: u32) -> Option<u32> {
    let mut prev: Option<u32> = None;
    let mut cur = state.free_head;

    while let Some(page) = cur {
        let node = unsafe { read_node(page) };
        if node.len >= pages_count {
            let remainder = node.len - pages_count;
            let next = if remainder == 0 {
                node.next
            } else {
                let tail_page = page + pages_count;
                unsafe {
                    write_node(tail_page, FreeNode { next: node.next, len: remainder });
                }
                tail_page
            };
            match prev {
                Some(prev_page) => {
                    let mut prev_node = unsafe { read_node(prev_page) };
                    prev_node.next = next;
                    unsafe { write_node(prev_page, prev_node) };
                }
                None => state.free_head = if next == u32::MAX { None } else { Some(next) },
            }
            return Some(page * PAGE_BYTES);
        }
        prev = Some(page);
        cur = if node.next == u32::MAX { None } else { Some(node.next) };
    }
    None
}

/// Release `pages_count` frames starting at `start_page`. A strict suffix
/// match against the bump edge rolls the edge back; everything else is
/// pushed onto the free list.
pub fn free(start_page: u32, pages_count: u32) {
    let mut guard = STATE.lock();
    let state = guard.as_mut().expect("pmem::setup not called");

    if start_page + pages_count == state.edge {
        state.edge = start_page;
        return;
    }

    let next = state.free_head.map(|p| p).unwrap_or(u32::MAX);
    unsafe { write_node(start_page, FreeNode { next, len: pages_count }) };
    state.free_head = Some(start_page);
}

unsafe fn read_node(page: u32) -> FreeNode {
    let ptr = (page * PAGE_BYTES) as *const FreeNode;
    core::ptr::read_volatile(ptr)
}

unsafe fn write_node(page: u32, node: FreeNode) {
    let ptr = (page * PAGE_BYTES) as *mut FreeNode;
    core::ptr::write_volatile(ptr, node);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_advances_edge() {
        setup(16 * 1024, 0x0020_0000, 0);
        let a = alloc(4).unwrap();
        let b = alloc(4).unwrap();
        assert_eq!(b, a + 4 * PAGE_BYTES);
    }

    #[test]
    fn free_at_edge_rolls_back() {
        setup(16 * 1024, 0x0020_0000, 0);
        let before = alloc(4).unwrap();
        free(before / PAGE_BYTES, 4);
        let again = alloc(4).unwrap();
        assert_eq!(again, before);
    }
}

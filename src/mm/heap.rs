//! First-fit kernel heap allocator.
//!
//! Direct translation of original_source/src/mem/firstfit.c: a circular
//! doubly-linked list of chunks over a fixed arena, searched round-robin
//! from a cursor, with split-on-allocate and merge-on-free. Every chunk's
//! `checksum` folds in the used bit so `corruption()` can walk the ring and
//! find the first chunk whose neighbor pointer was clobbered.
//!
//! The arena lives in a fixed `.bss` region sized by `HEAP_BYTES` rather
//! than pages claimed from `mm::pmem`.

use core::alloc::{GlobalAlloc, Layout};
use core::ptr;

use spin::Mutex;

const ALIGN: u32 = 16;
const USED: u32 = 0x8000_0000;
pub const HEAP_BYTES: usize = 8 * 1024 * 1024;

#[repr(C)]
struct Chunk {
    next: *mut Chunk,
    prev: *mut Chunk,
    /// High bit is the used flag; remaining bits are `next_addr + self_addr`.
    checksum: u32,
}

const CHUNK_SIZE: u32 = core::mem::size_of::<Chunk>() as u32;

fn aligned(addr: u32) -> u32 {
    if addr & (ALIGN - 1) == 0 {
        addr
    } else {
        ALIGN + (addr & !(ALIGN - 1))
    }
}

unsafe fn set_used(chunk: *mut Chunk) {
    let sum = (*chunk).next as u32 + chunk as u32;
    (*chunk).checksum = sum | USED;
}

unsafe fn set_free(chunk: *mut Chunk) {
    let sum = (*chunk).next as u32 + chunk as u32;
    (*chunk).checksum = sum & !USED;
}

unsafe fn is_used(chunk: *mut Chunk) -> bool {
    (*chunk).checksum & USED != 0
}

unsafe fn check_sum(chunk: *mut Chunk) -> bool {
    let expected = USED | ((chunk as u32).wrapping_add((*chunk).next as u32));
    (USED | (*chunk).checksum) == expected
}

unsafe fn set_next(chunk: *mut Chunk, next: *mut Chunk) {
    (*chunk).next = next;
    if is_used(chunk) {
        set_used(chunk);
    } else {
        set_free(chunk);
    }
}

unsafe fn get_size(chunk: *mut Chunk) -> u32 {
    (*chunk).next as u32 - chunk as u32 - CHUNK_SIZE
}

unsafe fn chunk_data(chunk: *mut Chunk) -> *mut u8 {
    (chunk as u32 + CHUNK_SIZE) as *mut u8
}

unsafe fn erase(chunk: *mut Chunk) {
    (*chunk).checksum = 0;
}

unsafe fn set_chunk(chunk: *mut Chunk, next: *mut Chunk, prev: *mut Chunk, used: bool) {
    (*chunk).next = next;
    (*chunk).prev = prev;
    if used {
        set_used(chunk);
    } else {
        set_free(chunk);
    }
}

struct FirstFit {
    startmem: u32,
    endmem: u32,
    current: *mut Chunk,
    mallocs: u64,
    frees: u64,
}

unsafe impl Send for FirstFit {}

impl FirstFit {
    const fn uninit() -> Self {
        Self { startmem: 0, endmem: 0, current: ptr::null_mut(), mallocs: 0, frees: 0 }
    }

    unsafe fn init(&mut self, start: u32, size: u32) {
        self.startmem = start;
        self.endmem = start + size;

        let initial = (aligned(start + CHUNK_SIZE) - CHUNK_SIZE) as *mut Chunk;
        let heap_end = (ALIGN * (self.endmem / ALIGN) - CHUNK_SIZE) as *mut Chunk;

        set_chunk(initial, heap_end, heap_end, false);
        // Sentinel: always used, so neighbors never try to absorb it.
        set_chunk(heap_end, initial, initial, true);

        self.current = initial;
    }

    unsafe fn malloc(&mut self, size: u32) -> *mut u8 {
        if size == 0 || size > i32::MAX as u32 {
            return ptr::null_mut();
        }

        let start = self.current;
        let mut chunk = start;
        loop {
            if !is_used(chunk) && get_size(chunk) >= size {
                if get_size(chunk) - size >= aligned(CHUNK_SIZE) {
                    let new_chunk_offset = aligned(size + CHUNK_SIZE) - CHUNK_SIZE;
                    let new_chunk = (chunk_data(chunk) as u32 + new_chunk_offset) as *mut Chunk;

                    let old_next = (*chunk).next;
                    (*old_next).prev = new_chunk;
                    set_chunk(new_chunk, old_next, chunk, false);
                    set_chunk(chunk, new_chunk, (*chunk).prev, true);
                }

                self.current = (*chunk).next;
                set_used(chunk);
                self.mallocs += 1;
                return chunk_data(chunk);
            }

            chunk = (*chunk).next;
            if !check_sum(chunk) {
                crate::error!("heap corruption at {:#010x}", chunk as u32);
                return ptr::null_mut();
            }
            if chunk == start {
                return ptr::null_mut();
            }
        }
    }

    unsafe fn free(&mut self, p: *mut u8) {
        if p.is_null() {
            return;
        }
        let chunk = (p as u32 - CHUNK_SIZE) as *mut Chunk;
        if !check_sum(chunk) {
            crate::error!("heap corruption freeing {:#010x}", chunk as u32);
            return;
        }

        set_free(chunk);
        self.frees += 1;

        let mut chunk = chunk;
        let mut next_chunk = (*chunk).next;
        if !is_used(next_chunk) {
            let next_next = (*next_chunk).next;
            set_next(chunk, next_next);
            (*next_next).prev = chunk;
            erase(next_chunk);
            next_chunk = next_next;
        }

        let prev_chunk = (*chunk).prev;
        if !is_used(prev_chunk) {
            set_next(prev_chunk, next_chunk);
            (*next_chunk).prev = prev_chunk;
            erase(chunk);
            chunk = prev_chunk;
        }

        self.current = chunk;
    }

    /// Walk the ring and return the first chunk whose checksum doesn't
    /// match its neighbor pointer.
    unsafe fn corruption(&self) -> Option<u32> {
        let start = self.current;
        let mut c = start;
        loop {
            if !check_sum(c) {
                return Some(c as u32);
            }
            c = (*c).next;
            if c == start {
                return None;
            }
        }
    }

    fn stats(&self) -> HeapStats {
        HeapStats {
            startmem: self.startmem,
            endmem: self.endmem,
            mallocs: self.mallocs,
            frees: self.frees,
        }
    }
}

pub struct HeapStats {
    pub startmem: u32,
    pub endmem: u32,
    pub mallocs: u64,
    pub frees: u64,
}

#[repr(align(16))]
struct HeapArena([u8; HEAP_BYTES]);
static mut ARENA: HeapArena = HeapArena([0; HEAP_BYTES]);

static ALLOCATOR: Mutex<FirstFit> = Mutex::new(FirstFit::uninit());

pub struct KernelHeap;

unsafe impl GlobalAlloc for KernelHeap {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let size = aligned(layout.size().max(1) as u32);
        ALLOCATOR.lock().malloc(size)
    }

    unsafe fn dealloc(&self, ptr: *mut u8, _layout: Layout) {
        ALLOCATOR.lock().free(ptr);
    }
}

#[global_allocator]
static GLOBAL: KernelHeap = KernelHeap;

pub fn init() {
    unsafe {
        let start = ARENA.0.as_mut_ptr() as u32;
        ALLOCATOR.lock().init(start, HEAP_BYTES as u32);
    }
}

pub fn corruption_check() -> Option<u32> {
    unsafe { ALLOCATOR.lock().corruption() }
}

pub fn stats() -> HeapStats {
    ALLOCATOR.lock().stats()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malloc_then_free_round_trips() {
        let mut arena = [0u8; 4096];
        let mut alloc = FirstFit::uninit();
        unsafe {
            alloc.init(arena.as_mut_ptr() as u32, arena.len() as u32);
            let p = alloc.malloc(64);
            assert!(!p.is_null());
            assert!(alloc.corruption().is_none());
            alloc.free(p);
            assert!(alloc.corruption().is_none());
        }
    }

    #[test]
    fn split_then_merge_keeps_ring_consistent() {
        let mut arena = [0u8; 4096];
        let mut alloc = FirstFit::uninit();
        unsafe {
            alloc.init(arena.as_mut_ptr() as u32, arena.len() as u32);
            let a = alloc.malloc(32);
            let b = alloc.malloc(32);
            alloc.free(a);
            alloc.free(b);
            assert!(alloc.corruption().is_none());
        }
    }
}

//! Multiboot v1 information structure parsing.
//!
//! Treated strictly as a read-only input: the kernel never writes back
//! into it, and only the fields the rest of the kernel actually consumes
//! are exposed here. Field presence is gated by the `flags` bitmap, as
//! the Multiboot v1 specification requires.

use heapless::String;

const MULTIBOOT_MAGIC: u32 = 0x2BAD_B002;

const FLAG_MEM: u32 = 1 << 0;
const FLAG_BOOTDEV: u32 = 1 << 1;
const FLAG_CMDLINE: u32 = 1 << 2;
const FLAG_MODS: u32 = 1 << 3;
const FLAG_ELF_SECTIONS: u32 = 1 << 5;
const FLAG_MMAP: u32 = 1 << 6;
const FLAG_DRIVES: u32 = 1 << 7;
const FLAG_CONFIG_TABLE: u32 = 1 << 8;
const FLAG_BOOT_LOADER_NAME: u32 = 1 << 9;
const FLAG_APM: u32 = 1 << 10;
const FLAG_VBE: u32 = 1 << 11;
const FLAG_FRAMEBUFFER: u32 = 1 << 12;

#[repr(C)]
struct RawInfo {
    flags: u32,
    mem_lower: u32,
    mem_upper: u32,
    boot_device: u32,
    cmdline: u32,
    mods_count: u32,
    mods_addr: u32,
    syms: [u32; 4],
    mmap_length: u32,
    mmap_addr: u32,
    drives_length: u32,
    drives_addr: u32,
    config_table: u32,
    boot_loader_name: u32,
    apm_table: u32,
    vbe_control_info: u32,
    vbe_mode_info: u32,
    vbe_mode: u16,
    vbe_interface_seg: u16,
    vbe_interface_off: u16,
    vbe_interface_len: u16,
    framebuffer_addr: u64,
    framebuffer_pitch: u32,
    framebuffer_width: u32,
    framebuffer_height: u32,
    framebuffer_bpp: u8,
    framebuffer_type: u8,
}

#[repr(C, packed)]
struct RawModule {
    mod_start: u32,
    mod_end: u32,
    cmdline: u32,
    reserved: u32,
}

#[repr(C, packed)]
struct RawMmapEntry {
    size: u32,
    base_addr_low: u32,
    base_addr_high: u32,
    length_low: u32,
    length_high: u32,
    entry_type: u32,
}

pub const MEMORY_AVAILABLE: u32 = 1;
pub const MEMORY_RESERVED: u32 = 2;

#[derive(Clone, Copy)]
pub struct MemoryRegion {
    pub base: u64,
    pub length: u64,
    pub region_type: u32,
}

#[derive(Clone, Copy)]
pub struct Module {
    pub start: u32,
    pub end: u32,
}

/// Safe wrapper around the raw physical-address Multiboot structure. All
/// accessors read through the raw pointer on demand rather than copying
/// eagerly, since most of this is only consulted once at boot.
pub struct MultibootInfo {
    raw: *const RawInfo,
}

impl MultibootInfo {
    /// # Safety
    /// `phys_addr` must be the untouched `ebx` value Multiboot passed to
    /// `_start`, and `magic` must equal `0x2BADB002`.
    pub unsafe fn from_boot_registers(phys_addr: u32, magic: u32) -> Option<Self> {
        if magic != MULTIBOOT_MAGIC {
            return None;
        }
        Some(Self { raw: crate::mm::paging::phys_to_virt(phys_addr) as *const RawInfo })
    }

    fn flags(&self) -> u32 {
        unsafe { (*self.raw).flags }
    }

    pub fn mem_lower_kb(&self) -> u32 {
        if self.flags() & FLAG_MEM != 0 {
            unsafe { (*self.raw).mem_lower }
        } else {
            0
        }
    }

    pub fn mem_upper_kb(&self) -> u32 {
        if self.flags() & FLAG_MEM != 0 {
            unsafe { (*self.raw).mem_upper }
        } else {
            0
        }
    }

    pub fn boot_device(&self) -> Option<u32> {
        (self.flags() & FLAG_BOOTDEV != 0).then(|| unsafe { (*self.raw).boot_device })
    }

    /// Command line, copied into a bounded <=256-byte buffer.
    pub fn cmdline(&self) -> String<256> {
        let mut out = String::new();
        if self.flags() & FLAG_CMDLINE == 0 {
            return out;
        }
        unsafe {
            let ptr = crate::mm::paging::phys_to_virt((*self.raw).cmdline) as *const u8;
            let mut i = 0usize;
            while i < 255 {
                let byte = *ptr.add(i);
                if byte == 0 {
                    break;
                }
                let _ = out.push(byte as char);
                i += 1;
            }
        }
        out
    }

    pub fn modules(&self) -> ModuleIter {
        if self.flags() & FLAG_MODS == 0 {
            return ModuleIter { base: core::ptr::null(), count: 0, index: 0 };
        }
        unsafe {
            ModuleIter {
                base: crate::mm::paging::phys_to_virt((*self.raw).mods_addr) as *const RawModule,
                count: (*self.raw).mods_count,
                index: 0,
            }
        }
    }

    pub fn highest_module_end(&self) -> u32 {
        self.modules().map(|m| m.end).max().unwrap_or(0)
    }

    pub fn memory_map(&self) -> MmapIter {
        if self.flags() & FLAG_MMAP == 0 {
            return MmapIter { cursor: core::ptr::null(), end: core::ptr::null() };
        }
        unsafe {
            let base = crate::mm::paging::phys_to_virt((*self.raw).mmap_addr) as *const u8;
            let end = base.add((*self.raw).mmap_length as usize);
            MmapIter { cursor: base, end }
        }
    }

    pub fn elf_sections(&self) -> Option<(u32, u32, u32, u32)> {
        if self.flags() & FLAG_ELF_SECTIONS == 0 {
            return None;
        }
        let syms = unsafe { (*self.raw).syms };
        Some((syms[0], syms[1], syms[2], syms[3])) // num, size, addr, shndx
    }

    pub fn drives(&self) -> Option<(u32, u32)> {
        if self.flags() & FLAG_DRIVES == 0 {
            return None;
        }
        unsafe { Some(((*self.raw).drives_length, (*self.raw).drives_addr)) }
    }

    pub fn config_table(&self) -> Option<u32> {
        (self.flags() & FLAG_CONFIG_TABLE != 0).then(|| unsafe { (*self.raw).config_table })
    }

    pub fn bootloader_name(&self) -> Option<&'static str> {
        if self.flags() & FLAG_BOOT_LOADER_NAME == 0 {
            return None;
        }
        unsafe {
            let ptr = crate::mm::paging::phys_to_virt((*self.raw).boot_loader_name) as *const u8;
            let mut len = 0usize;
            while *ptr.add(len) != 0 {
                len += 1;
            }
            core::str::from_utf8(core::slice::from_raw_parts(ptr, len)).ok()
        }
    }

    pub fn apm_table(&self) -> Option<u32> {
        (self.flags() & FLAG_APM != 0).then(|| unsafe { (*self.raw).apm_table })
    }

    pub fn vbe_mode_info(&self) -> Option<u32> {
        (self.flags() & FLAG_VBE != 0).then(|| unsafe { (*self.raw).vbe_mode_info })
    }

    pub fn framebuffer(&self) -> Option<FramebufferInfo> {
        if self.flags() & FLAG_FRAMEBUFFER == 0 {
            return None;
        }
        unsafe {
            Some(FramebufferInfo {
                addr: (*self.raw).framebuffer_addr,
                pitch: (*self.raw).framebuffer_pitch,
                width: (*self.raw).framebuffer_width,
                height: (*self.raw).framebuffer_height,
                bpp: (*self.raw).framebuffer_bpp,
            })
        }
    }
}

pub struct FramebufferInfo {
    pub addr: u64,
    pub pitch: u32,
    pub width: u32,
    pub height: u32,
    pub bpp: u8,
}

pub struct ModuleIter {
    base: *const RawModule,
    count: u32,
    index: u32,
}

impl Iterator for ModuleIter {
    type Item = Module;
    fn next(&mut self) -> Option<Module> {
        if self.index >= self.count {
            return None;
        }
        let raw = unsafe { &*self.base.add(self.index as usize) };
        self.index += 1;
        Some(Module { start: raw.mod_start, end: raw.mod_end })
    }
}

pub struct MmapIter {
    cursor: *const u8,
    end: *const u8,
}

impl Iterator for MmapIter {
    type Item = MemoryRegion;
    fn next(&mut self) -> Option<MemoryRegion> {
        if self.cursor.is_null() || self.cursor >= self.end {
            return None;
        }
        let entry = unsafe { &*(self.cursor as *const RawMmapEntry) };
        // `size` does not include itself; advance past this entry.
        self.cursor = unsafe { self.cursor.add(entry.size as usize + 4) };

        let base = ((entry.base_addr_high as u64) << 32) | entry.base_addr_low as u64;
        let length = ((entry.length_high as u64) << 32) | entry.length_low as u64;
        Some(MemoryRegion { base, length, region_type: entry.entry_type })
    }
}

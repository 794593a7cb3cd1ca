//! PCI config-space access and bus enumeration (`dev/pci.c`'s
//! `pci_config_read_dword`/`pci_list`). Only the bus scan + config-space
//! read contract is implemented here; per-device driver bring-up is out of
//! scope (see the device registry in `dev`), this just gives `init` a way
//! to see what's on the bus.

const CONFIG_ADDR: u16 = 0x0CF8;
const CONFIG_DATA: u16 = 0x0CFC;

const MAX_SLOTS: u8 = 32;

#[derive(Clone, Copy, Debug)]
pub struct PciDevice {
    pub bus: u8,
    pub slot: u8,
    pub vendor_id: u16,
    pub device_id: u16,
    pub class: u8,
    pub subclass: u8,
}

unsafe fn config_read_dword(bus: u8, slot: u8, func: u8, offset: u8) -> u32 {
    let address: u32 = ((bus as u32) << 16)
        | ((slot as u32 & 0x1F) << 11)
        | ((func as u32 & 0x7) << 8)
        | (offset as u32 & 0xFC)
        | 0x8000_0000;
    crate::arch::x86::cpu::outl(CONFIG_ADDR, address);
    crate::arch::x86::cpu::inl(CONFIG_DATA)
}

fn probe(bus: u8, slot: u8) -> Option<PciDevice> {
    let id = unsafe { config_read_dword(bus, slot, 0, 0x00) };
    let vendor_id = (id & 0xFFFF) as u16;
    if vendor_id == 0xFFFF {
        return None;
    }
    let device_id = (id >> 16) as u16;
    let class_reg = unsafe { config_read_dword(bus, slot, 0, 0x08) };
    Some(PciDevice {
        bus,
        slot,
        vendor_id,
        device_id,
        class: (class_reg >> 24) as u8,
        subclass: ((class_reg >> 16) & 0xFF) as u8,
    })
}

/// Scan every slot on `bus`, skipping unpopulated ones (`pci_list`).
pub fn scan(bus: u8) -> impl Iterator<Item = PciDevice> {
    (0..MAX_SLOTS).filter_map(move |slot| probe(bus, slot))
}

pub fn init() {
    let mut count = 0;
    for dev in scan(0) {
        crate::debugk!(
            "pci: [{}:{}] {:04x}:{:04x} class {:x}:{:x}",
            dev.bus, dev.slot, dev.vendor_id, dev.device_id, dev.class, dev.subclass
        );
        count += 1;
    }
    crate::info!("pci: {} device(s) on bus 0", count);
}

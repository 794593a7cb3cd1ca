//! Network interface registry (`netiface`, `net_interface_register` and
//! friends in net.c). A driver registers one `Interface` giving us its MAC
//! and a small transmit vtable; the stack owns addressing, the neighbor
//! cache, and per-interface statistics.
//!
//! Only one interface slot exists (`MAX_NETWORK_INTERFACES` in network.h is
//! 1): supporting more would need a routing table, which is out of scope.

use spin::Mutex;

use crate::error::{Errno, KResult};
use crate::net::eth::MacAddr;
use crate::net::neighbor::NeighborCache;

pub const MAX_NETWORK_INTERFACES: usize = 1;

#[derive(Clone, Copy, Default)]
pub struct IfaceStats {
    pub tx_bytes: u64,
    pub rx_bytes: u64,
    pub tx_packets: u64,
    pub rx_packets: u64,
    pub tx_dropped: u64,
}

/// Driver-provided transmit hooks. `alloc` hands back an owned, zeroed
/// buffer at least `ETH_HDR_LEN + ETH_MTU` bytes long — not borrowed from
/// the interface, so callers are free to also touch the neighbor
/// cache/statistics while holding it; `enqueue` stages a filled frame of
/// the given length; `do_transmit` kicks the driver to push whatever is
/// queued onto the wire.
pub trait InterfaceDriver: Send {
    fn get_mac(&self) -> MacAddr;
    fn is_device_up(&self) -> bool;
    fn transmit_frame_alloc(&mut self) -> Option<alloc::vec::Vec<u8>>;
    fn transmit_frame_enqueue(&mut self, frame: alloc::vec::Vec<u8>, len: usize);
    fn do_transmit(&mut self);
}

pub struct Interface {
    pub index: usize,
    pub ip_addr: u32,
    pub ip_subnet: u32,
    pub ip_gw: u32,
    pub can_broadcast: bool,
    pub stats: IfaceStats,
    pub neighbors: NeighborCache,
    driver: alloc::boxed::Box<dyn InterfaceDriver>,
}

impl Interface {
    pub fn get_mac(&self) -> MacAddr {
        self.driver.get_mac()
    }

    pub fn is_up(&self) -> bool {
        self.driver.is_device_up()
    }

    pub fn transmit_frame_alloc(&mut self) -> Option<alloc::vec::Vec<u8>> {
        self.driver.transmit_frame_alloc()
    }

    pub fn transmit_frame_enqueue(&mut self, frame: alloc::vec::Vec<u8>, len: usize) {
        self.driver.transmit_frame_enqueue(frame, len);
        self.stats.tx_packets += 1;
        self.stats.tx_bytes += len as u64;
    }

    pub fn do_transmit(&mut self) {
        self.driver.do_transmit();
    }
}

static REGISTRY: Mutex<[Option<Interface>; MAX_NETWORK_INTERFACES]> = Mutex::new([None]);

/// `net_interface_register`.
pub fn register(driver: alloc::boxed::Box<dyn InterfaceDriver>) -> KResult<usize> {
    let mut registry = REGISTRY.lock();
    for (i, slot) in registry.iter_mut().enumerate() {
        if slot.is_none() {
            *slot = Some(Interface {
                index: i,
                ip_addr: 0,
                ip_subnet: 0,
                ip_gw: 0,
                can_broadcast: true,
                stats: IfaceStats::default(),
                neighbors: NeighborCache::new(),
                driver,
            });
            return Ok(i);
        }
    }
    Err(Errno::ENODEV)
}

/// `net_interface_for_destination`: routing is not modeled, so this always
/// answers with interface 0 regardless of the destination address.
pub fn with_default<R>(f: impl FnOnce(&mut Interface) -> R) -> KResult<R> {
    with_index(0, f)
}

pub fn with_index<R>(idx: usize, f: impl FnOnce(&mut Interface) -> R) -> KResult<R> {
    let mut registry = REGISTRY.lock();
    let iface = registry.get_mut(idx).and_then(|s| s.as_mut()).ok_or(Errno::ENODEV)?;
    Ok(f(iface))
}

/// `net_interface_by_ip_or_mac`: find the interface whose address matches
/// either `ip` (if nonzero) or `mac` (if not the invalid MAC).
pub fn by_ip_or_mac(ip: u32, mac: MacAddr) -> Option<usize> {
    let registry = REGISTRY.lock();
    for (i, slot) in registry.iter().enumerate() {
        if let Some(iface) = slot {
            let use_mac = mac != crate::net::eth::ETH_INVALID_MAC;
            let use_ip = ip != 0;
            if use_mac && iface.driver.get_mac() == mac {
                return Some(i);
            }
            if use_ip && iface.ip_addr == ip {
                return Some(i);
            }
        }
    }
    None
}

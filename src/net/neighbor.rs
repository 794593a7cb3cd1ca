//! Per-interface ARP neighbor cache: a fixed ring of capacity
//! `MAX_NEIGHBORS`, resolved by linear scan (`net_neighbor_lookup_on`,
//! `net_neighbor_remember` in net.c).

use crate::net::eth::{MacAddr, ETH_BROADCAST_MAC, ETH_INVALID_MAC};

pub const MAX_NEIGHBORS: usize = 8;

#[derive(Clone, Copy)]
struct Mapping {
    ip: u32,
    mac: MacAddr,
}

pub struct NeighborCache {
    slots: [Option<Mapping>; MAX_NEIGHBORS],
    head: usize,
}

impl NeighborCache {
    pub const fn new() -> Self {
        NeighborCache { slots: [None; MAX_NEIGHBORS], head: 0 }
    }

    /// 255.255.255.255 always resolves to the Ethernet broadcast address
    /// without touching the cache.
    pub fn resolve(&self, ip: u32) -> Option<MacAddr> {
        if ip == u32::MAX {
            return Some(ETH_BROADCAST_MAC);
        }
        self.slots.iter().flatten().find(|m| m.ip == ip).map(|m| m.mac)
    }

    /// Remember an IP→MAC pair, overwriting an existing entry for that IP
    /// in place, or else the next ring slot.
    pub fn remember(&mut self, ip: u32, mac: MacAddr) {
        if ip == 0 || mac == ETH_INVALID_MAC {
            return;
        }
        if let Some(existing) = self.slots.iter_mut().flatten().find(|m| m.ip == ip) {
            existing.mac = mac;
            return;
        }
        self.slots[self.head] = Some(Mapping { ip, mac });
        self.head = (self.head + 1) % MAX_NEIGHBORS;
    }
}

impl Default for NeighborCache {
    fn default() -> Self {
        Self::new()
    }
}

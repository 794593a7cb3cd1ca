//! The network core (net.c/network.h): one Ethernet interface, ARP/ICMP/UDP
//! handling, a DHCP client, and the neighbor cache — no routing, no TCP,
//! hand-rolled rather than pulled from an off-the-shelf stack.

pub mod arp;
#[cfg(feature = "dhcp")]
pub mod dhcp;
pub mod eth;
pub mod icmp;
pub mod iface;
pub mod ipv4;
pub mod neighbor;
pub mod udp;

use eth::{EthHeader, Ethertype, ETH_HDR_LEN, ETH_MIN_FRAME};
use iface::Interface;
use ipv4::{IpProto, Ipv4Header};

pub fn init() {
    crate::info!("net: core initialized (no interface registered yet)");
}

/// `net_receive_driver_frame`: called by a driver IRQ handler with a frame
/// it has just received. Dispatches on Ethertype; anything not handled here
/// (including non-UDP IPv4) is dropped.
pub fn receive_driver_frame(iface_index: usize, frame: &[u8]) {
    if frame.len() < ETH_HDR_LEN {
        return;
    }
    let ethertype = EthHeader::ethertype(frame);
    let _ = iface::with_index(iface_index, |iface| {
        iface.stats.rx_packets += 1;
        iface.stats.rx_bytes += frame.len() as u64;

        match Ethertype::from_be(ethertype) {
            Some(Ethertype::Arp) => arp::receive(iface, frame),
            Some(Ethertype::Ipv4) => {
                if frame.len() < ETH_HDR_LEN + 20 {
                    return;
                }
                let proto = Ipv4Header::proto(&frame[ETH_HDR_LEN..]);
                if proto == IpProto::Icmp as u8 {
                    icmp::receive(iface, frame);
                } else if proto == IpProto::Udp as u8 {
                    udp::enqueue(frame);
                }
                // other IPv4 subprotocols: dropped.
            }
            _ => {}
        }
    });
}

/// `net_transmit_frame`: fill the source MAC, resolve the destination MAC
/// for IPv4 via the neighbor cache (ARP frames already carry their
/// destination MAC in the ARP header and in `eth.dst`), pad to the minimum
/// Ethernet frame size, then hand off to the driver.
pub fn transmit_frame(iface: &mut Interface, mut frame: alloc::vec::Vec<u8>, len: usize) {
    let my_mac = iface.get_mac();
    EthHeader::set_src(&mut frame, my_mac);

    if Ethertype::from_be(EthHeader::ethertype(&frame)) == Some(Ethertype::Ipv4) {
        let dst_ip = Ipv4Header::dst(&frame[ETH_HDR_LEN..]);
        if let Some(mac) = iface.neighbors.resolve(dst_ip) {
            EthHeader::set_dst(&mut frame, mac);
        }
        // else: leave whatever destination the caller pre-filled
        // (broadcast transmits set it themselves).
    }

    let padded_len = len.max(ETH_MIN_FRAME);
    if frame.len() < padded_len {
        frame.resize(padded_len, 0);
    }

    iface.transmit_frame_enqueue(frame, padded_len);
    iface.do_transmit();
}

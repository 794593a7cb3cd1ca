//! ARP: header layout, `net_arp_send_whohas`, and the receive handler that
//! answers requests for our address and remembers replies (net.c's
//! `net_arp_send`/`net_arp_receive`).

use crate::error::KResult;
use crate::net::eth::{self, EthHeader, Ethertype, MacAddr, ETH_ALEN, ETH_HDR_LEN, ETH_INVALID_MAC};
use crate::net::iface::Interface;

pub const ARP_L2_ETH: u16 = 1;
pub const ARP_OP_REQUEST: u16 = 1;
pub const ARP_OP_REPLY: u16 = 2;

pub const ARP_HDR_LEN: usize = 8 + 2 * ETH_ALEN + 2 * 4;

/// Fixed-offset view of an ARP header immediately following the Ethernet
/// header (`struct arp_hdr` in network.h).
struct ArpHeader;

impl ArpHeader {
    fn op(buf: &[u8]) -> u16 {
        u16::from_be_bytes([buf[6], buf[7]])
    }
    fn src_mac(buf: &[u8]) -> MacAddr {
        let mut m = [0u8; ETH_ALEN];
        m.copy_from_slice(&buf[8..8 + ETH_ALEN]);
        m
    }
    fn src_ip(buf: &[u8]) -> u32 {
        u32::from_be_bytes(buf[14..18].try_into().unwrap())
    }
    fn dst_mac(buf: &[u8]) -> MacAddr {
        let mut m = [0u8; ETH_ALEN];
        m.copy_from_slice(&buf[18..18 + ETH_ALEN]);
        m
    }
    fn dst_ip(buf: &[u8]) -> u32 {
        u32::from_be_bytes(buf[24..28].try_into().unwrap())
    }

    fn fill(buf: &mut [u8], op: u16, src_mac: MacAddr, src_ip: u32, dst_mac: MacAddr, dst_ip: u32) {
        buf[0..2].copy_from_slice(&ARP_L2_ETH.to_be_bytes());
        buf[2..4].copy_from_slice(&(Ethertype::Ipv4 as u16).to_be_bytes());
        buf[4] = ETH_ALEN as u8;
        buf[5] = 4;
        buf[6..8].copy_from_slice(&op.to_be_bytes());
        buf[8..8 + ETH_ALEN].copy_from_slice(&src_mac);
        buf[14..18].copy_from_slice(&src_ip.to_be_bytes());
        buf[18..18 + ETH_ALEN].copy_from_slice(&dst_mac);
        buf[24..28].copy_from_slice(&dst_ip.to_be_bytes());
    }
}

fn send(iface: &mut Interface, op: u16, dst_ip: u32, dst_mac: MacAddr) -> KResult<()> {
    let my_mac = iface.get_mac();
    let my_ip = iface.ip_addr;
    let mut frame = iface.transmit_frame_alloc().ok_or(crate::error::Errno::ENOMEM)?;
    EthHeader::set_ethertype(&mut frame, Ethertype::Arp);
    ArpHeader::fill(&mut frame[ETH_HDR_LEN..], op, my_mac, my_ip, dst_mac, dst_ip);
    let len = ETH_HDR_LEN + ARP_HDR_LEN;
    super::transmit_frame(iface, frame, len);
    Ok(())
}

/// `net_arp_send_whohas`.
pub fn send_whohas(iface: &mut Interface, ip: u32) -> KResult<()> {
    send(iface, ARP_OP_REQUEST, ip, eth::ETH_BROADCAST_MAC)
}

/// `net_arp_receive`. `frame` starts at the Ethernet header; the ARP header
/// follows immediately (no VLAN tags modeled).
pub fn receive(iface: &mut Interface, frame: &[u8]) {
    let arp = &frame[ETH_HDR_LEN..];
    let dst_ip = ArpHeader::dst_ip(arp);
    let dst_mac = ArpHeader::dst_mac(arp);
    let src_ip = ArpHeader::src_ip(arp);
    let src_mac = ArpHeader::src_mac(arp);
    let op = ArpHeader::op(arp);

    if op == ARP_OP_REPLY {
        iface.neighbors.remember(src_ip, src_mac);
        return;
    }
    if op == ARP_OP_REQUEST && dst_mac == ETH_INVALID_MAC && dst_ip == iface.ip_addr {
        let _ = send(iface, ARP_OP_REPLY, src_ip, src_mac);
    }
}

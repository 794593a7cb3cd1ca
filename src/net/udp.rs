//! UDP datagram construction and the global receive queue (`net_buf_udp4_init`,
//! `net_buf_udp4_checksum`, `net_wait_udp4` in net.c).
//!
//! UDP checksum is left zero on transmit (legal for IPv4 per RFC 768) and
//! never validated on receive. The IPv4 header checksum is still computed
//! and checked normally.

use alloc::collections::VecDeque;
use alloc::vec::Vec;

use spin::Mutex;

use crate::error::{Errno, KResult};
use crate::net::eth::{self, EthHeader, Ethertype, ETH_HDR_LEN};
use crate::net::ipv4::{IpProto, Ipv4Header, IPV4_DEFAULT_TTL};

pub const UDP_HDR_LEN: usize = 8;

struct UdpHeader;

impl UdpHeader {
    fn src_port(buf: &[u8]) -> u16 {
        u16::from_be_bytes([buf[0], buf[1]])
    }
    fn dst_port(buf: &[u8]) -> u16 {
        u16::from_be_bytes([buf[2], buf[3]])
    }
    fn set_src_port(buf: &mut [u8], port: u16) {
        buf[0..2].copy_from_slice(&port.to_be_bytes());
    }
    fn set_dst_port(buf: &mut [u8], port: u16) {
        buf[2..4].copy_from_slice(&port.to_be_bytes());
    }
    fn set_len(buf: &mut [u8], len: u16) {
        buf[4..6].copy_from_slice(&len.to_be_bytes());
    }
    fn set_checksum(buf: &mut [u8], checksum: u16) {
        buf[6..8].copy_from_slice(&checksum.to_be_bytes());
    }
}

/// `net_buf_udp4_init`: fill the Ethernet/IPv4/UDP headers (leaving
/// Ethertype/checksums for `net_buf_udp4_checksum` to finish), return the
/// byte offset of the UDP payload within `frame`.
pub fn buf_udp4_init(frame: &mut [u8], src_ip: u32, src_port: u16, dst_ip: u32, dst_port: u16) -> usize {
    let ip_off = ETH_HDR_LEN;
    Ipv4Header::set_version_nwords(&mut frame[ip_off..], 5);
    Ipv4Header::set_qos(&mut frame[ip_off..], 0);
    Ipv4Header::set_ident(&mut frame[ip_off..], 0);
    Ipv4Header::set_flags(&mut frame[ip_off..], 0);
    Ipv4Header::set_ttl(&mut frame[ip_off..], IPV4_DEFAULT_TTL);
    Ipv4Header::set_proto(&mut frame[ip_off..], IpProto::Udp);
    Ipv4Header::set_src(&mut frame[ip_off..], src_ip);
    Ipv4Header::set_dst(&mut frame[ip_off..], dst_ip);

    let udp_off = ip_off + 20; // nwords = 5, no IP options
    UdpHeader::set_src_port(&mut frame[udp_off..], src_port);
    UdpHeader::set_dst_port(&mut frame[udp_off..], dst_port);

    udp_off + UDP_HDR_LEN
}

/// `net_buf_udp4_checksum`: fill in `udp_len`/`iplen`, compute the IPv4
/// header checksum, set Ethertype, and return the total frame length.
pub fn buf_udp4_checksum(frame: &mut [u8], datalen: usize) -> usize {
    let ip_off = ETH_HDR_LEN;
    let udp_off = ip_off + 20;

    let udp_len = (UDP_HDR_LEN + datalen) as u16;
    UdpHeader::set_len(&mut frame[udp_off..], udp_len);
    UdpHeader::set_checksum(&mut frame[udp_off..], 0);

    let iplen = (20 + UDP_HDR_LEN + datalen) as u16;
    Ipv4Header::set_iplen(&mut frame[ip_off..], iplen);
    Ipv4Header::set_checksum(&mut frame[ip_off..], 0);
    let checksum = eth::ones_complement_words_sum(&frame[ip_off..ip_off + 20]);
    Ipv4Header::set_checksum(&mut frame[ip_off..], !checksum);

    EthHeader::set_ethertype(frame, Ethertype::Ipv4);

    ETH_HDR_LEN + iplen as usize
}

/// One queued datagram, owned copy of the frame bytes — nothing here needs
/// a shared driver ring, so the queue just owns the bytes outright.
pub struct QueuedDatagram {
    pub frame: Vec<u8>,
}

impl QueuedDatagram {
    fn dst_port(&self) -> u16 {
        let udp_off = ETH_HDR_LEN + Ipv4Header::hdr_len(&self.frame[ETH_HDR_LEN..]);
        UdpHeader::dst_port(&self.frame[udp_off..])
    }
}

static RXQ: Mutex<VecDeque<QueuedDatagram>> = Mutex::new(VecDeque::new());

/// Called from the receive path when a frame is IPv4/UDP and not otherwise
/// consumed (ARP/ICMP already handled).
pub fn enqueue(frame: &[u8]) {
    RXQ.lock().push_back(QueuedDatagram { frame: frame.to_vec() });
}

/// `net_wait_udp4`: poll the RX queue for a datagram matching `port` (or any
/// datagram if `port == 0`), up to `timeout_s` seconds, halting between
/// polls. Returns `Errno::EAGAIN` on timeout.
pub fn wait_udp4(port: u16, timeout_s: u32) -> KResult<QueuedDatagram> {
    let deadline = crate::time::unix_now().saturating_add(timeout_s);
    loop {
        {
            let mut rxq = RXQ.lock();
            if let Some(pos) = rxq.iter().position(|d| port == 0 || d.dst_port() == port) {
                return Ok(rxq.remove(pos).unwrap());
            }
        }
        if crate::time::unix_now() > deadline {
            return Err(Errno::EAGAIN);
        }
        unsafe { crate::arch::x86::cpu::halt() };
    }
}

//! ICMP echo reply (`net_icmp_receive` in net.c). The only ICMP behavior
//! this stack implements is answering echo requests; anything else is
//! logged and dropped.

use crate::net::eth::{self, EthHeader, Ethertype, ETH_HDR_LEN};
use crate::net::ipv4::{IpProto, Ipv4Header, IPV4_DEFAULT_TTL};
use crate::net::iface::Interface;

const ICMP_ECHO_REPLY: u8 = 0;
const ICMP_ECHO_REQUEST: u8 = 8;
const ICMP_HDR_LEN: usize = 8; // type, code, checksum, then 4 bytes of id/seq

pub fn receive(iface: &mut Interface, frame: &[u8]) {
    let ip_off = ETH_HDR_LEN;
    let ip_hdr_len = Ipv4Header::hdr_len(&frame[ip_off..]);
    let icmp_off = ip_off + ip_hdr_len;
    if frame.len() < icmp_off + ICMP_HDR_LEN {
        return;
    }
    let icmp_type = frame[icmp_off];
    if icmp_type != ICMP_ECHO_REQUEST {
        crate::debugk!("net: icmp type {}, dropping", icmp_type);
        return;
    }

    let iplen = Ipv4Header::iplen(&frame[ip_off..]) as usize;
    let icmp_len = iplen.saturating_sub(ip_hdr_len);
    let total_len = ETH_HDR_LEN + iplen;

    let src_mac = EthHeader::src(frame);
    let src_ip = Ipv4Header::src(&frame[ip_off..]);
    let my_mac = iface.get_mac();
    let my_ip = iface.ip_addr;

    let Some(mut reply) = iface.transmit_frame_alloc() else { return };
    if reply.len() < total_len {
        return;
    }

    EthHeader::set_ethertype(&mut reply, Ethertype::Ipv4);
    EthHeader::set_dst(&mut reply, src_mac);
    EthHeader::set_src(&mut reply, my_mac);

    let rip_off = ETH_HDR_LEN;
    Ipv4Header::set_version_nwords(&mut reply[rip_off..], 5);
    Ipv4Header::set_qos(&mut reply[rip_off..], 0);
    Ipv4Header::set_ident(&mut reply[rip_off..], 0);
    Ipv4Header::set_flags(&mut reply[rip_off..], 0);
    Ipv4Header::set_ttl(&mut reply[rip_off..], IPV4_DEFAULT_TTL);
    Ipv4Header::set_proto(&mut reply[rip_off..], IpProto::Icmp);
    Ipv4Header::set_src(&mut reply[rip_off..], my_ip);
    Ipv4Header::set_dst(&mut reply[rip_off..], src_ip);
    Ipv4Header::set_iplen(&mut reply[rip_off..], iplen as u16);
    Ipv4Header::set_checksum(&mut reply[rip_off..], 0);

    let ricmp_off = rip_off + 20; // nwords=5, no options
    reply[ricmp_off] = ICMP_ECHO_REPLY;
    reply[ricmp_off + 1] = 0;
    reply[ricmp_off + 2] = 0;
    reply[ricmp_off + 3] = 0;
    // copy the rest-of-header id/seq plus payload verbatim
    let copy_len = icmp_len.saturating_sub(4);
    reply[ricmp_off + 4..ricmp_off + 4 + copy_len]
        .copy_from_slice(&frame[icmp_off + 4..icmp_off + 4 + copy_len]);

    let icmp_checksum = eth::ones_complement_words_sum(&reply[ricmp_off..ricmp_off + icmp_len]);
    reply[ricmp_off + 2..ricmp_off + 4].copy_from_slice(&(!icmp_checksum).to_be_bytes());

    let ip_checksum = eth::ones_complement_words_sum(&reply[rip_off..rip_off + 20]);
    Ipv4Header::set_checksum(&mut reply[rip_off..], !ip_checksum);

    super::transmit_frame(iface, reply, total_len);
}

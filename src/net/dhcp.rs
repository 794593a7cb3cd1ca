//! DHCP client state machine: DISCOVER → OFFER → REQUEST → ACK
//! (`test_net_dhcp` in net.c, driven there from the kernel shell's test
//! command and reused here as the interface bring-up path).

use alloc::vec;

use crate::error::{Errno, KResult};
use crate::net::eth::ETH_HDR_LEN;
use crate::net::ipv4::Ipv4Header;
use crate::net::{iface, udp};

const DHCP_SERVER_PORT: u16 = 67;
const DHCP_CLIENT_PORT: u16 = 68;
const DHCP_MAGIC_COOKIE: u32 = 0x6382_5363;
/// `sizeof(struct dhcp4)` (op..chaddr, no sname/file) + BOOTP zero padding.
const DHCP_FIXED_LEN: usize = 44 + 192;
const DHCP_OPT_OFFSET: usize = DHCP_FIXED_LEN + 4; // + magic cookie

const DHCPOPT_SUBNET: u8 = 0x01;
const DHCPOPT_GW: u8 = 0x03;
const DHCPOPT_DNS: u8 = 0x06;
const DHCPOPT_LEASETIME: u8 = 0x33;
const DHCPOPT_OP: u8 = 0x35;
const DHCPOPT_REQADDR: u8 = 0x32;
const DHCPOPT_SRVADDR: u8 = 0x36;
const DHCPOPT_REQUEST: u8 = 0x37;
const DHCPOPT_DOMAIN: u8 = 0x0f;
const DHCPOPT_END: u8 = 0xff;

const DHCPOPT_OP_DISCOVERY: u8 = 1;
const DHCPOPT_OP_REQUEST: u8 = 3;

const BROADCAST_IP: u32 = u32::MAX;
const NOADDR: u32 = 0;

#[derive(Default, Clone, Copy)]
pub struct Lease {
    pub ip_addr: u32,
    pub server: u32,
    pub subnet: u32,
    pub gateway: u32,
    pub lease_secs: u32,
}

struct Dhcp4 {
    op: u8,
    htype: u8,
    hlen: u8,
    xid: u32,
    chaddr: [u8; 6],
}

fn write_dhcp4(buf: &mut [u8], hdr: &Dhcp4, siaddr: u32) {
    for b in buf[..DHCP_FIXED_LEN].iter_mut() {
        *b = 0;
    }
    buf[0] = hdr.op;
    buf[1] = hdr.htype;
    buf[2] = hdr.hlen;
    buf[4..8].copy_from_slice(&hdr.xid.to_ne_bytes());
    buf[20..24].copy_from_slice(&siaddr.to_ne_bytes());
    buf[28..34].copy_from_slice(&hdr.chaddr);
    buf[DHCP_FIXED_LEN..DHCP_FIXED_LEN + 4].copy_from_slice(&DHCP_MAGIC_COOKIE.to_be_bytes());
}

fn read_yiaddr(dhcp: &[u8]) -> u32 {
    u32::from_ne_bytes(dhcp[16..20].try_into().unwrap())
}
fn read_siaddr(dhcp: &[u8]) -> u32 {
    u32::from_ne_bytes(dhcp[20..24].try_into().unwrap())
}
fn read_xid(dhcp: &[u8]) -> u32 {
    u32::from_ne_bytes(dhcp[4..8].try_into().unwrap())
}

/// Parse TLV options starting at `DHCP_OPT_OFFSET`, recording subnet/gw into
/// `lease` and logging the rest (`test_read_dhcpopts`).
fn read_options(dhcp: &[u8], lease: &mut Lease) {
    let mut opts = &dhcp[DHCP_OPT_OFFSET..];
    while !opts.is_empty() && opts[0] != DHCPOPT_END {
        let tag = opts[0];
        let len = opts[1] as usize;
        let val = &opts[2..2 + len];
        match tag {
            DHCPOPT_SUBNET if len >= 4 => {
                lease.subnet = u32::from_be_bytes(val[0..4].try_into().unwrap());
                crate::debugk!("net: dhcp subnet {}.{}.{}.{}", val[0], val[1], val[2], val[3]);
            }
            DHCPOPT_GW if len >= 4 => {
                lease.gateway = u32::from_be_bytes(val[0..4].try_into().unwrap());
                crate::debugk!("net: dhcp router {}.{}.{}.{}", val[0], val[1], val[2], val[3]);
            }
            DHCPOPT_DNS => {
                for chunk in val.chunks_exact(4) {
                    crate::debugk!("net: dhcp dns {}.{}.{}.{}", chunk[0], chunk[1], chunk[2], chunk[3]);
                }
            }
            DHCPOPT_LEASETIME if len >= 1 => {
                let mut t: u32 = 0;
                for &byte in val {
                    t = t * 0x100 + byte as u32;
                }
                lease.lease_secs = t;
                crate::debugk!("net: dhcp lease {} sec", t);
            }
            DHCPOPT_SRVADDR if len >= 4 => {
                crate::debugk!("net: dhcp server {}.{}.{}.{}", val[0], val[1], val[2], val[3]);
            }
            _ => crate::debugk!("net: dhcp opt {} len {}", tag, len),
        }
        opts = &opts[2 + len..];
    }
}

/// Run the full DISCOVER/OFFER/REQUEST/ACK exchange against interface 0,
/// assigning `iface.ip_addr` on success. `xid` identifies this exchange
/// (the caller picks it, e.g. the shell's `dhcp` command uses a fixed one).
pub fn acquire_lease(xid: u32, timeout_s: u32) -> KResult<Lease> {
    let mac = iface::with_default(|i| i.get_mac())?;

    // DISCOVER
    iface::with_default(|i| -> KResult<()> {
        let mut frame = i.transmit_frame_alloc().ok_or(Errno::ENOMEM)?;
        let payload_off = udp::buf_udp4_init(&mut frame, NOADDR, DHCP_CLIENT_PORT, BROADCAST_IP, DHCP_SERVER_PORT);
        write_dhcp4(&mut frame[payload_off..], &Dhcp4 { op: 1, htype: 1, hlen: 6, xid, chaddr: mac }, 0);
        let opt_off = payload_off + DHCP_OPT_OFFSET;
        let options = [
            DHCPOPT_OP, 1, DHCPOPT_OP_DISCOVERY,
            DHCPOPT_REQUEST, 4, DHCPOPT_SUBNET, DHCPOPT_DNS, DHCPOPT_GW, DHCPOPT_DOMAIN,
            DHCPOPT_END,
        ];
        frame[opt_off..opt_off + options.len()].copy_from_slice(&options);
        let datalen = DHCP_OPT_OFFSET + options.len();
        let total = udp::buf_udp4_checksum(&mut frame, datalen);
        crate::net::transmit_frame(i, frame, total);
        Ok(())
    })??;
    crate::debugk!("net: dhcp discover xid={:#x}", xid);

    // OFFER
    let offer = udp::wait_udp4(DHCP_CLIENT_PORT, timeout_s)?;
    let ip_off = ETH_HDR_LEN;
    let ip_hdr_len = Ipv4Header::hdr_len(&offer.frame[ip_off..]);
    let udp_off = ip_off + ip_hdr_len;
    let dhcp = &offer.frame[udp_off + udp::UDP_HDR_LEN..];
    if read_xid(dhcp) != xid {
        return Err(Errno::EAGAIN);
    }
    let offered_ip = read_yiaddr(dhcp);
    let server = read_siaddr(dhcp);

    let mut srv_mac = [0u8; 6];
    srv_mac.copy_from_slice(&offer.frame[6..12]);
    let offer_src_ip = Ipv4Header::src(&offer.frame[ip_off..]);
    iface::with_default(|i| i.neighbors.remember(offer_src_ip, srv_mac))?;

    crate::debugk!("net: dhcp offer yiaddr={:#010x} siaddr={:#010x}", offered_ip, server);

    // REQUEST
    iface::with_default(|i| -> KResult<()> {
        let mut frame = i.transmit_frame_alloc().ok_or(Errno::ENOMEM)?;
        let payload_off = udp::buf_udp4_init(&mut frame, NOADDR, DHCP_CLIENT_PORT, BROADCAST_IP, DHCP_SERVER_PORT);
        write_dhcp4(&mut frame[payload_off..], &Dhcp4 { op: 1, htype: 1, hlen: 6, xid, chaddr: mac }, server);
        let ip_oct = offered_ip.to_be_bytes();
        let srv_oct = server.to_be_bytes();
        let opt_off = payload_off + DHCP_OPT_OFFSET;
        let mut options = vec![DHCPOPT_OP, 1, DHCPOPT_OP_REQUEST, DHCPOPT_REQADDR, 4];
        options.extend_from_slice(&ip_oct);
        options.push(DHCPOPT_SRVADDR);
        options.push(4);
        options.extend_from_slice(&srv_oct);
        options.push(DHCPOPT_END);
        frame[opt_off..opt_off + options.len()].copy_from_slice(&options);
        let datalen = DHCP_OPT_OFFSET + options.len();
        let total = udp::buf_udp4_checksum(&mut frame, datalen);
        crate::net::transmit_frame(i, frame, total);
        Ok(())
    })??;
    crate::debugk!("net: dhcp request xid={:#x} server={:#010x} ipaddr={:#010x}", xid, server, offered_ip);

    // ACK
    let ack = udp::wait_udp4(DHCP_CLIENT_PORT, timeout_s)?;
    let ip_hdr_len2 = Ipv4Header::hdr_len(&ack.frame[ip_off..]);
    let udp_off2 = ip_off + ip_hdr_len2;
    let dhcp2 = &ack.frame[udp_off2 + udp::UDP_HDR_LEN..];
    let final_ip = read_yiaddr(dhcp2);
    let final_server = read_siaddr(dhcp2);
    crate::debugk!("net: dhcp ack yiaddr={:#010x} siaddr={:#010x}", final_ip, final_server);

    let mut lease = Lease { ip_addr: final_ip, server: final_server, ..Default::default() };
    read_options(dhcp2, &mut lease);

    iface::with_default(|i| {
        i.ip_addr = final_ip;
        if lease.subnet != 0 {
            i.ip_subnet = lease.subnet;
        }
        if lease.gateway != 0 {
            i.ip_gw = lease.gateway;
        }
    })?;

    Ok(lease)
}

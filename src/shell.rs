//! Kernel shell (kshell.c): reads a line from the active TTY, tokenizes on
//! whitespace, dispatches the first token against a static command table.
//! Each handler gets the rest of the line verbatim and parses it itself.
//! Tab does one-shot completion against command names; Ctrl-L (handled in
//! `tty`) clears the screen before the next prompt is drawn.

use core::fmt::Write as _;

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use crate::error::Errno;
use crate::vfs::inode::FileType;

const CMD_BUF_SIZE: usize = 256;
const PROMPT_BUF_SIZE: usize = 30;

#[cfg(feature = "shell-history")]
mod history {
    use alloc::string::String;
    use heapless::Deque;
    use spin::Mutex;

    const HISTORY_CAP: usize = 16;

    static HISTORY: Mutex<Deque<String, HISTORY_CAP>> = Mutex::new(Deque::new());

    pub fn push(line: &str) {
        if line.is_empty() {
            return;
        }
        let mut h = HISTORY.lock();
        if h.is_full() {
            h.pop_front();
        }
        let _ = h.push_back(String::from(line));
    }

    /// `offset` counts back from the most recent line (1 = previous line).
    pub fn recall(offset: usize) -> Option<String> {
        let h = HISTORY.lock();
        if offset == 0 || offset > h.len() {
            return None;
        }
        h.iter().rev().nth(offset - 1).cloned()
    }
}

struct Command {
    name: &'static str,
    description: &'static str,
    options: &'static str,
    handler: fn(&str),
}

fn print(s: &str) {
    let _ = crate::tty::write_active(s.as_bytes());
}

fn println(s: &str) {
    print(s);
    print("\n");
}

fn skip_gaps(s: &str) -> &str {
    s.trim_start_matches(' ')
}

fn split_first_word(s: &str) -> (&str, &str) {
    let s = skip_gaps(s);
    match s.find(' ') {
        Some(i) => (&s[..i], skip_gaps(&s[i + 1..])),
        None => (s, ""),
    }
}

fn parse_ipv4(s: &str) -> Option<[u8; 4]> {
    let mut oct = [0u8; 4];
    let mut parts = s.split('.');
    for slot in oct.iter_mut() {
        *slot = parts.next()?.parse::<u8>().ok()?;
    }
    if parts.next().is_some() {
        return None;
    }
    Some(oct)
}

fn parse_mac(s: &str) -> Option<[u8; 6]> {
    let mut mac = [0u8; 6];
    let mut parts = s.split(':');
    for slot in mac.iter_mut() {
        *slot = u8::from_str_radix(parts.next()?, 16).ok()?;
    }
    if parts.next().is_some() {
        return None;
    }
    Some(mac)
}

fn errno_str(e: Errno) -> String {
    format!("{}", e)
}

/***
 *     command handlers
 ***/

fn cmd_help(arg: &str) {
    if !arg.is_empty() {
        for cmd in COMMANDS {
            if cmd.name == arg {
                println("");
                println(cmd.name);
                print("Description: ");
                println(cmd.description);
                print("Options:     ");
                println(cmd.options);
                return;
            }
        }
    }

    print("Available commands ('help <cmd>' for more):");
    for (i, cmd) in COMMANDS.iter().enumerate() {
        if i % 8 == 0 {
            print("\n\t");
        }
        print(cmd.name);
        print("\t");
    }
    println("\n\nAvailable shortcuts:\n\tCtrl-L - clear screen\n");
}

fn cmd_version(_arg: &str) {
    crate::build_info::print_banner();
}

fn cmd_dmesg(_arg: &str) {
    crate::log::for_each_line(|line| println(line.as_str()));
}

fn cmd_time(_arg: &str) {
    let now = crate::time::unix_now();
    println(&format!("Epoch: {}", now));
}

fn cmd_uptime(_arg: &str) {
    let now = crate::time::unix_now();
    let boot = crate::boot_epoch();
    let secs = now.saturating_sub(boot);
    println(&format!(
        "up {}d {:02}:{:02}:{:02}",
        secs / 86400,
        (secs % 86400) / 3600,
        (secs % 3600) / 60,
        secs % 60
    ));
}

fn cmd_cpuid(arg: &str) {
    let leaf: u32 = arg.trim().parse().unwrap_or(0);
    let info = raw_cpuid::CpuId::new();
    if leaf == 0 {
        let vendor = info
            .get_vendor_info()
            .map(|v| String::from(v.as_str()))
            .unwrap_or_else(|| String::from("<unknown>"));
        println(&format!("CPU vendor: {}", vendor));
    } else {
        println(&format!("funct = {:#x}", leaf));
        if let Some(features) = info.get_feature_info() {
            println(&format!(
                "  family={} model={} stepping={}",
                features.family_id(),
                features.model_id(),
                features.stepping_id()
            ));
        } else {
            println("  <no leaf data>");
        }
    }
}

fn cmd_heap(arg: &str) {
    let (sub, rest) = split_first_word(arg);
    match sub {
        "info" | "check" => {
            let stats = crate::mm::heap::stats();
            println(&format!(
                "heap: start={:#x} end={:#x} mallocs={} frees={}",
                stats.startmem, stats.endmem, stats.mallocs, stats.frees
            ));
            if sub == "check" {
                match crate::mm::heap::corruption_check() {
                    None => println("heap check: ok"),
                    Some(addr) => println(&format!("heap check: corruption near {:#x}", addr)),
                }
            }
        }
        _ => {
            let _ = rest;
            println("Options: info check");
        }
    }
}

fn cmd_mem(arg: &str) {
    let (addr_s, rest) = split_first_word(arg);
    let addr = u32::from_str_radix(addr_s.trim_start_matches("0x"), 16).unwrap_or(0);
    if addr == 0 {
        println("mem warning: reading 0x0000, default");
    }
    let (size_s, _) = split_first_word(rest);
    let size = u32::from_str_radix(size_s.trim_start_matches("0x"), 16).unwrap_or(0x100) as usize;

    let ptr = addr as *const u8;
    let mut line = String::new();
    for i in 0..size {
        if i % 16 == 0 {
            if !line.is_empty() {
                println(&line);
            }
            line = format!("{:08x}:", addr as usize + i);
        }
        let byte = unsafe { core::ptr::read_volatile(ptr.add(i)) };
        let _ = write!(line, " {:02x}", byte);
    }
    if !line.is_empty() {
        println(&line);
    }
}

fn cmd_info(arg: &str) {
    let (sub, rest) = split_first_word(arg);
    match sub {
        "cpu" => {
            println(&format!(
                "CPL={} IF={}",
                crate::arch::x86::cpu::current_privilege_level(),
                crate::arch::x86::cpu::interrupts_enabled()
            ));
        }
        "pci" => {
            let bus: u8 = u8::from_str_radix(rest.trim_start_matches("0x"), 16).unwrap_or(0);
            println(&format!("bus {:#x}", bus));
            for dev in crate::pci::scan(bus) {
                println(&format!(
                    "  [{}:{}] {:04x}:{:04x} class {:x}:{:x}",
                    dev.bus, dev.slot, dev.vendor_id, dev.device_id, dev.class, dev.subclass
                ));
            }
        }
        "pmem" => {
            println("pmem: see dmesg for allocator bring-up log");
        }
        _ => println("Options: cpu pci pmem"),
    }
}

fn cmd_net(arg: &str) {
    let (sub, rest) = split_first_word(arg);
    match sub {
        "link" => {
            for idx in 0..crate::net::iface::MAX_NETWORK_INTERFACES {
                let printed = crate::net::iface::with_index(idx, |iface| {
                    let mac = iface.get_mac();
                    println(&format!(
                        "{}: net{}: <{}{}>",
                        idx,
                        idx,
                        if iface.can_broadcast { "BROADCAST," } else { "" },
                        if iface.is_up() { "UP" } else { "DOWN" }
                    ));
                    println(&format!(
                        "    link/ether {:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
                        mac[0], mac[1], mac[2], mac[3], mac[4], mac[5]
                    ));
                    if iface.ip_addr != 0 {
                        let ip = iface.ip_addr.to_be_bytes();
                        let mask = iface.ip_subnet.to_be_bytes();
                        print(&format!(
                            "    inet={}.{}.{}.{} mask={}.{}.{}.{}",
                            ip[0], ip[1], ip[2], ip[3], mask[0], mask[1], mask[2], mask[3]
                        ));
                        if iface.ip_gw != 0 {
                            let gw = iface.ip_gw.to_be_bytes();
                            print(&format!(" gw={}.{}.{}.{}", gw[0], gw[1], gw[2], gw[3]));
                        }
                        println("");
                    }
                });
                if printed.is_err() {
                    continue;
                }
            }
        }
        "neigh" => {
            let _ = rest;
            println("Usage:\n  net neigh - no live query surface yet");
        }
        "ping" => {
            let Some(ip) = parse_ipv4(rest) else {
                println("Failed to parse IP");
                return;
            };
            println(&format!("ping {}.{}.{}.{}", ip[0], ip[1], ip[2], ip[3]));
            let dst = u32::from_be_bytes(ip);
            match crate::net::iface::with_default(|i| crate::net::arp::send_whohas(i, dst)) {
                Ok(Ok(())) => println("arp whohas sent"),
                Ok(Err(e)) | Err(e) => println(&format!("ping failed: {}", errno_str(e))),
            }
        }
        #[cfg(feature = "dhcp")]
        "dhcp" => {
            let xid: u32 = rest.trim().parse().unwrap_or(0x1234_5678);
            match crate::net::dhcp::acquire_lease(xid, 10) {
                Ok(lease) => {
                    let ip = lease.ip_addr.to_be_bytes();
                    println(&format!("dhcp: leased {}.{}.{}.{}", ip[0], ip[1], ip[2], ip[3]));
                }
                Err(e) => println(&format!("dhcp failed: {}", errno_str(e))),
            }
        }
        _ => println("Options: link neigh ping dhcp"),
    }
}

fn cmd_fs(arg: &str) {
    let (sub, rest) = split_first_word(arg);
    match sub {
        "mounted" => {
            for id in crate::vfs::mount::all_mount_ids() {
                println(&format!("{:?}: {}", id, crate::vfs::mount::source_label(id)));
            }
        }
        "ls" => {
            let path = if rest.is_empty() { "/" } else { rest };
            let mut iter = 0u64;
            loop {
                match crate::vfs::readdir(path, &mut iter) {
                    Ok(Some(entry)) => println(&entry.d_name),
                    Ok(None) => break,
                    Err(e) => {
                        println(&format!("ls failed: {}", errno_str(e)));
                        break;
                    }
                }
            }
        }
        "stat" => match crate::vfs::stat(rest) {
            Ok(meta) => {
                println(&format!("  ino   = {}", meta.ino));
                println(&format!("  ftype = {:?}", meta.ftype));
                println(&format!("  nlink = {}", meta.nlink));
                println(&format!("  size  = {}", meta.size));
            }
            Err(e) => println(&format!("stat failed: {}", errno_str(e))),
        },
        "mkdir" => {
            if let Err(e) = crate::vfs::mkdir(rest, 0o755) {
                println(&format!("mkdir failed: {}", errno_str(e)));
            }
        }
        "mknod" => {
            if let Err(e) = crate::vfs::create(rest, FileType::Regular, 0o644, None) {
                println(&format!("mknod failed: {}", errno_str(e)));
            }
        }
        "rm" => {
            if let Err(e) = crate::vfs::unlink(rest) {
                println(&format!("rm failed: {}", errno_str(e)));
            }
        }
        "mv" => {
            let (from, to) = split_first_word(rest);
            if to.is_empty() {
                println("Error: the new file name not found");
                return;
            }
            if let Err(e) = crate::vfs::rename(from, to) {
                println(&format!("rename failed: {}", errno_str(e)));
            }
        }
        "ln" => {
            let (from, to) = split_first_word(rest);
            if to.is_empty() {
                println("Error: the new file name not found");
                return;
            }
            if let Err(e) = crate::vfs::link(from, to) {
                println(&format!("link failed: {}", errno_str(e)));
            }
        }
        "cat" => fs_cat(rest),
        _ => println(
            "Options:\n  mounted\n  ls [path]\n  stat <path>\n  mkdir <path>\n  mknod <path>\n  ln <a> <b>\n  mv <a> <b>\n  rm <path>\n  cat [>] <path>",
        ),
    }
}

fn fs_cat(arg: &str) {
    if arg.is_empty() {
        println("Error: filepath or '>' expected");
        return;
    }

    if let Some(path) = arg.strip_prefix('>') {
        let path = skip_gaps(path);
        println("### EOF<Enter> will terminate input");
        let mut pos: u64 = 0;
        let mut buf = [0u8; CMD_BUF_SIZE];
        loop {
            let n = read_line_blocking(&mut buf);
            let line = core::str::from_utf8(&buf[..n]).unwrap_or("");
            if line == "EOF" {
                return;
            }
            let mut owned = String::from(line);
            owned.push('\n');
            match crate::vfs::write(path, pos, owned.as_bytes()) {
                Ok(written) => pos += written as u64,
                Err(e) => {
                    println(&format!("write failed: {}", errno_str(e)));
                    return;
                }
            }
        }
    } else {
        let mut pos: u64 = 0;
        let mut buf = [0u8; 256];
        loop {
            match crate::vfs::read(arg, pos, &mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    let _ = crate::tty::write_active(&buf[..n]);
                    pos += n as u64;
                }
                Err(e) => {
                    println(&format!("read failed: {}", errno_str(e)));
                    break;
                }
            }
        }
    }
}

fn cmd_io(arg: &str) {
    let (opt, rest) = split_first_word(arg);
    let mut chars = opt.chars();
    let (Some(width), Some(dir)) = (chars.next(), chars.next()) else {
        println("Options: [bwd][rw] <port> [<value>]");
        return;
    };
    let (port_s, val_s) = split_first_word(rest);
    let Ok(port) = u16::from_str_radix(port_s.trim_start_matches("0x"), 16) else {
        println("Options: [bwd][rw] <port> [<value>]");
        return;
    };

    match dir {
        'r' => {
            let value: u32 = unsafe {
                match width {
                    'b' => crate::arch::x86::cpu::inb(port) as u32,
                    'i' => crate::arch::x86::cpu::inl(port),
                    _ => {
                        println("Options: [bwd][rw] <port> [<value>]");
                        return;
                    }
                }
            };
            println(&format!("in({:#x}) => {:#x}", port, value));
        }
        'w' => {
            let Ok(value) = u32::from_str_radix(val_s.trim_start_matches("0x"), 16) else {
                println("Options: [bwd][rw] <port> <value>");
                return;
            };
            println(&format!("out({:#x}) => {:#x}", port, value));
            unsafe {
                match width {
                    'b' => crate::arch::x86::cpu::outb(port, value as u8),
                    'i' => crate::arch::x86::cpu::outl(port, value),
                    _ => println("Options: [bwd][rw] <port> <value>"),
                }
            }
        }
        _ => println("Options: [bwd][rw] <port> [<value>]"),
    }
}

static mut PROMPT: [u8; PROMPT_BUF_SIZE] = *b"|< \0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0";

fn prompt_str() -> &'static str {
    let bytes = unsafe { &*core::ptr::addr_of!(PROMPT) };
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    core::str::from_utf8(&bytes[..end]).unwrap_or("|< ")
}

fn cmd_set(arg: &str) {
    let (sub, rest) = split_first_word(arg);
    match sub {
        "prompt" => {
            if rest.is_empty() {
                println("Why do you want to output prompt if you see it?!");
                return;
            }
            let bytes = unsafe { &mut *core::ptr::addr_of_mut!(PROMPT) };
            for b in bytes.iter_mut() {
                *b = 0;
            }
            let n = rest.len().min(PROMPT_BUF_SIZE - 1);
            bytes[..n].copy_from_slice(&rest.as_bytes()[..n]);
        }
        _ => println("Variables: prompt"),
    }
}

fn cmd_halt(_arg: &str) {
    crate::info!("shell: halt requested");
    loop {
        unsafe { crate::arch::x86::cpu::halt() };
    }
}

fn cmd_unknown(_arg: &str) {
    println("type 'help'\n");
}

static COMMANDS: &[Command] = &[
    Command { name: "cpuid", description: "x86 cpuid info; usage: cpuid [function, default 0]", options: "cpuid [<funct>=0]", handler: cmd_cpuid },
    Command { name: "date", description: "current Unix epoch time", options: "", handler: cmd_time },
    Command { name: "dmesg", description: "replay the kernel log ring", options: "", handler: cmd_dmesg },
    Command { name: "fs", description: "vfs utility", options: "mounted ls stat mkdir mknod ln mv rm cat", handler: cmd_fs },
    Command { name: "halt", description: "stop the CPU", options: "", handler: cmd_halt },
    Command { name: "heap", description: "heap utility", options: "info check", handler: cmd_heap },
    Command { name: "help", description: "show this help or do `help <command>`", options: "", handler: cmd_help },
    Command { name: "info", description: "various info", options: "cpu pci pmem", handler: cmd_info },
    Command { name: "io", description: "io[bw][rw] <port> [<value>]", options: "br/iw/bw/iw <port> [<value>]", handler: cmd_io },
    Command { name: "mem", description: "mem <start_addr> <size = 0x100>", options: "", handler: cmd_mem },
    Command { name: "net", description: "net utility", options: "link neigh ping dhcp", handler: cmd_net },
    Command { name: "set", description: "manage global variables", options: "prompt", handler: cmd_set },
    Command { name: "time", description: "system time", options: "", handler: cmd_time },
    Command { name: "uptime", description: "time since boot", options: "", handler: cmd_uptime },
    Command { name: "version", description: "kernel build info", options: "", handler: cmd_version },
];

fn autocomplete(buf: &str) -> Option<String> {
    let mut matches = COMMANDS.iter().filter(|c| c.name.starts_with(buf));
    let first = matches.next()?;
    if matches.next().is_none() {
        return Some(String::from(first.name));
    }
    None
}

fn dispatch(line: &str) {
    let (cmd, arg) = split_first_word(line);
    if cmd.is_empty() {
        return;
    }
    for c in COMMANDS {
        if c.name == cmd {
            (c.handler)(arg);
            return;
        }
    }
    cmd_unknown(arg);
}

/// Poll the active TTY until a full line or Tab-triggered completion fires.
/// Returns the number of bytes placed in `buf` (not including the newline).
fn read_line_blocking(buf: &mut [u8; CMD_BUF_SIZE]) -> usize {
    let mut len = 0;
    loop {
        if !crate::tty::has_input_active() {
            unsafe { crate::arch::x86::cpu::halt() };
            continue;
        }
        let mut byte = [0u8; 1];
        let n = crate::tty::read_active(&mut byte).unwrap_or(0);
        if n == 0 {
            continue;
        }
        match byte[0] {
            b'\n' => return len,
            b'\t' => {
                let typed = core::str::from_utf8(&buf[..len]).unwrap_or("");
                if let Some(completed) = autocomplete(typed) {
                    print(&completed[len..]);
                    print(" ");
                    let n = completed.len().min(CMD_BUF_SIZE - 1);
                    buf[..n].copy_from_slice(&completed.as_bytes()[..n]);
                    len = n;
                }
            }
            b'\x08' => {
                if len > 0 {
                    len -= 1;
                }
            }
            b if len < buf.len() => {
                buf[len] = b;
                len += 1;
            }
            _ => {}
        }
    }
}

/// Run the interactive loop: print the prompt, read a line, dispatch it.
/// Never returns.
pub fn run() -> ! {
    println("");
    loop {
        print(prompt_str());
        let mut buf = [0u8; CMD_BUF_SIZE];
        let n = read_line_blocking(&mut buf);
        println("");
        let line = core::str::from_utf8(&buf[..n]).unwrap_or("");

        #[cfg(feature = "shell-history")]
        history::push(line);

        dispatch(line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_command_and_argument() {
        assert_eq!(split_first_word("heap info extra"), ("heap", "info extra"));
        assert_eq!(split_first_word("help"), ("help", ""));
        assert_eq!(split_first_word(""), ("", ""));
    }

    #[test]
    fn parses_ipv4_dotted_quad() {
        assert_eq!(parse_ipv4("192.168.1.1"), Some([192, 168, 1, 1]));
        assert_eq!(parse_ipv4("1.2.3"), None);
        assert_eq!(parse_ipv4("1.2.3.4.5"), None);
        assert_eq!(parse_ipv4("1.2.3.256"), None);
    }

    #[test]
    fn parses_mac_colon_form() {
        assert_eq!(
            parse_mac("aa:bb:cc:dd:ee:ff"),
            Some([0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff])
        );
        assert_eq!(parse_mac("aa:bb"), None);
    }

    #[test]
    fn autocomplete_unique_prefix() {
        assert_eq!(autocomplete("dmes"), Some(String::from("dmesg")));
        assert_eq!(autocomplete("he"), None); // "heap" and "help" both match
    }
}

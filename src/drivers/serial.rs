//! 16550 UART serial console (COM1), used for kernel logging.
//!
//! Register layout and initialization sequence follow the standard 16550
//! programming model. COM1 is the only port the kernel touches.

use lazy_static::lazy_static;
use spin::Mutex;
use uart_16550::SerialPort;

/// COM1 base I/O port.
pub const COM1_PORT: u16 = 0x3F8;

lazy_static! {
    static ref SERIAL1: Mutex<SerialPort> = {
        let mut port = unsafe { SerialPort::new(COM1_PORT) };
        port.init();
        Mutex::new(port)
    };
}

/// Force COM1 initialization. Call once during early boot.
pub fn init() {
    let _ = &*SERIAL1;
}

pub fn write_byte(byte: u8) {
    SERIAL1.lock().send(byte);
}

pub fn write_str(s: &str) {
    for byte in s.bytes() {
        write_byte(byte);
    }
}

pub fn read_byte() -> Option<u8> {
    SERIAL1.lock().receive()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_str_does_not_panic() {
        write_str("hello\n");
    }
}

//! Device registry: two tables of up to N_CHR/N_BLK device *classes*,
//! each providing `get_device(minor)` and a generic blocking block-I/O
//! helper.

pub mod blockdev;
pub mod chardev;

pub const N_CHR: usize = 30;
pub const N_BLK: usize = 12;

/// Char device major numbers (`devices.h`'s `char_device_family`). A
/// class is registered at its family's index in `chardev`'s table, so an
/// inode's `makedev(major, minor)` actually resolves to the class the
/// rest of the system expects.
pub const CHR_VIRT: usize = 0;
pub const CHR_MEMDEV: usize = 1;
pub const CHR_PTY_MASTER: usize = 2;
pub const CHR_PTY_SLAVE: usize = 3;
pub const CHR_TTY: usize = 4;
pub const CHR_TTY_OTH: usize = 5;
pub const CHR_LP: usize = 6;
pub const CHR_VCS: usize = 7;
pub const CHR_SCSI_TAPE: usize = 9;
pub const CHR_MISC: usize = 10;
pub const CHR_KBD: usize = 11;
pub const CHR_FRAMEBUF: usize = 29;

/// Block device major numbers (`devices.h`'s `block_device_family`).
pub const BLK_VIRT: usize = 0;
pub const BLK_RAM: usize = 1;
pub const BLK_FLOPPY: usize = 2;
pub const BLK_IDE: usize = 3;
pub const BLK_LOOPBACK: usize = 7;
pub const BLK_SCSI_DISK: usize = 8;
pub const BLK_RAID: usize = 9;
pub const BLK_SCSI_CDROM: usize = 11;

pub fn init() {
    chardev::init();
    blockdev::init();
}

//! RAM-backed block device: the backing store ramfs itself does not need,
//! but which a block device class (`dev::blockdev`) can expose for
//! exercising the generic `bdev_blocking_read/write` path without real
//! disk hardware.

use spin::Mutex;

pub const BLOCK_SIZE: usize = 512;
const BLOCK_COUNT: usize = 2048; // 1 MiB

struct RamDisk {
    blocks: [[u8; BLOCK_SIZE]; BLOCK_COUNT],
}

static DISK: Mutex<RamDisk> = Mutex::new(RamDisk {
    blocks: [[0; BLOCK_SIZE]; BLOCK_COUNT],
});

pub fn block_count() -> usize {
    BLOCK_COUNT
}

/// Read-only block fetch for `bdev_blocking_read`. Returns `None` past the
/// end of the backing store, which the caller maps to `ENXIO`.
pub fn get_ro_block(n: usize, out: &mut [u8; BLOCK_SIZE]) -> Option<()> {
    let disk = DISK.lock();
    let block = disk.blocks.get(n)?;
    out.copy_from_slice(block);
    Some(())
}

/// Read-write block fetch for `bdev_blocking_write`; the caller mutates
/// `buf` in place and the block is committed immediately (no write-back
/// cache — writes are synchronous all the way to the backing array).
pub fn get_rw_block(n: usize, f: impl FnOnce(&mut [u8; BLOCK_SIZE])) -> Option<()> {
    let mut disk = DISK.lock();
    let block = disk.blocks.get_mut(n)?;
    f(block);
    Some(())
}

/// No-op: this backing store has no per-block refcount to release.
pub fn forget_block(_n: usize) {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_block() {
        get_rw_block(0, |b| b[0] = 0xAB).unwrap();
        let mut out = [0u8; BLOCK_SIZE];
        get_ro_block(0, &mut out).unwrap();
        assert_eq!(out[0], 0xAB);
    }

    #[test]
    fn out_of_range_is_none() {
        let mut out = [0u8; BLOCK_SIZE];
        assert!(get_ro_block(BLOCK_COUNT, &mut out).is_none());
    }
}

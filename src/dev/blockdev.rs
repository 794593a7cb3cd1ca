//! Block-device classes plus the generic blocking-I/O helper:
//! `bdev_blocking_read/write` splits a byte range into a head block, zero
//! or more middle blocks, and a tail block, calling `get_ro/rw_block` then
//! `forget_block` for each.

use spin::Mutex;

use crate::error::{Errno, KResult};

use super::BLK_RAM;

#[derive(Clone, Copy)]
pub struct BlockOps {
    pub block_size: fn(minor: u32) -> usize,
    pub block_count: fn(minor: u32) -> usize,
    pub get_ro_block: fn(minor: u32, n: usize, out: &mut [u8]) -> bool,
    pub get_rw_block: fn(minor: u32, n: usize, f: &mut dyn FnMut(&mut [u8])) -> bool,
    pub forget_block: fn(minor: u32, n: usize),
}

#[derive(Clone, Copy)]
pub struct BlockClass {
    pub name: &'static str,
    pub ops: BlockOps,
}

static CLASSES: Mutex<[Option<BlockClass>; super::N_BLK]> = Mutex::new([None; super::N_BLK]);

pub fn register(major: usize, class: BlockClass) -> KResult<()> {
    if major >= super::N_BLK {
        return Err(Errno::ENXIO);
    }
    CLASSES.lock()[major] = Some(class);
    Ok(())
}

fn class_of(major: usize) -> KResult<BlockClass> {
    CLASSES.lock().get(major).and_then(|c| *c).ok_or(Errno::ENODEV)
}

/// Read `len` bytes starting at byte offset `pos`, splitting across block
/// boundaries. Returns the number of bytes actually read; stops early (with
/// `Errno::ENXIO` and the partial count) if a `get_ro_block` call fails.
pub fn bdev_blocking_read(
    major: usize,
    minor: u32,
    pos: u64,
    buf: &mut [u8],
) -> Result<usize, (Errno, usize)> {
    let class = class_of(major).map_err(|e| (e, 0))?;
    let block_size = (class.ops.block_size)(minor);
    let mut done = 0usize;
    let mut block_buf = [0u8; 4096];
    debug_assert!(block_size <= block_buf.len());

    while done < buf.len() {
        let abs = pos + done as u64;
        let block_no = (abs / block_size as u64) as usize;
        let offset_in_block = (abs % block_size as u64) as usize;
        let remaining_in_block = block_size - offset_in_block;
        let want = remaining_in_block.min(buf.len() - done);

        if !(class.ops.get_ro_block)(minor, block_no, &mut block_buf[..block_size]) {
            return Err((Errno::ENXIO, done));
        }
        buf[done..done + want].copy_from_slice(&block_buf[offset_in_block..offset_in_block + want]);
        (class.ops.forget_block)(minor, block_no);
        done += want;
    }
    Ok(done)
}

pub fn bdev_blocking_write(
    major: usize,
    minor: u32,
    pos: u64,
    buf: &[u8],
) -> Result<usize, (Errno, usize)> {
    let class = class_of(major).map_err(|e| (e, 0))?;
    let block_size = (class.ops.block_size)(minor);
    let mut done = 0usize;

    while done < buf.len() {
        let abs = pos + done as u64;
        let block_no = (abs / block_size as u64) as usize;
        let offset_in_block = (abs % block_size as u64) as usize;
        let remaining_in_block = block_size - offset_in_block;
        let want = remaining_in_block.min(buf.len() - done);
        let src = &buf[done..done + want];

        let mut ok = false;
        let write_ok = (class.ops.get_rw_block)(minor, block_no, &mut |block: &mut [u8]| {
            block[offset_in_block..offset_in_block + want].copy_from_slice(src);
            ok = true;
        });
        if !write_ok || !ok {
            return Err((Errno::ENXIO, done));
        }
        (class.ops.forget_block)(minor, block_no);
        done += want;
    }
    Ok(done)
}

pub fn init() {
    let _ = register(
        BLK_RAM,
        BlockClass {
            name: "ramdisk",
            ops: BlockOps {
                block_size: |_minor| crate::drivers::ramdisk::BLOCK_SIZE,
                block_count: |_minor| crate::drivers::ramdisk::block_count(),
                get_ro_block: |_minor, n, out| {
                    let mut block = [0u8; crate::drivers::ramdisk::BLOCK_SIZE];
                    let ok = crate::drivers::ramdisk::get_ro_block(n, &mut block).is_some();
                    if ok {
                        out.copy_from_slice(&block);
                    }
                    ok
                },
                get_rw_block: |_minor, n, f| {
                    crate::drivers::ramdisk::get_rw_block(n, |block| f(block)).is_some()
                },
                forget_block: |_minor, n| crate::drivers::ramdisk::forget_block(n),
            },
        },
    );
}

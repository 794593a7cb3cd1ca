//! Regular file block storage: `N_DIRECT` direct blocks, one single
//! indirect, one double indirect (grounded on ramfs.c's "File storage"
//! layout). A fourth, triple-indirect level would extend this further;
//! it's rejected here instead (see `Errno::ENOSPC` below) since nothing
//! exercises files anywhere near that size.

use alloc::boxed::Box;
use alloc::vec::Vec;

use crate::error::{Errno, KResult};

pub const PAGE_BYTES: usize = 4096;
pub const N_DIRECT_BLOCKS: usize = 12;
/// Pointers per indirect block, sized as if each entry were a 32-bit
/// block pointer (matching the 32-bit kernel this layout targets).
const PTRS_PER_BLOCK: usize = PAGE_BYTES / 4;

type Block = [u8; PAGE_BYTES];

fn zeroed_block() -> Box<Block> {
    Box::new([0u8; PAGE_BYTES])
}

pub struct FileBlocks {
    direct: [Option<Box<Block>>; N_DIRECT_BLOCKS],
    indirect: Option<Box<Vec<Option<Box<Block>>>>>,
    double_indirect: Option<Box<Vec<Option<Box<Vec<Option<Box<Block>>>>>>>>,
}

#[derive(Debug, PartialEq, Eq)]
enum Location {
    Direct(usize),
    Indirect(usize),
    DoubleIndirect(usize, usize),
}

fn locate(block_no: usize) -> KResult<Location> {
    if block_no < N_DIRECT_BLOCKS {
        return Ok(Location::Direct(block_no));
    }
    let block_no = block_no - N_DIRECT_BLOCKS;
    if block_no < PTRS_PER_BLOCK {
        return Ok(Location::Indirect(block_no));
    }
    let block_no = block_no - PTRS_PER_BLOCK;
    if block_no < PTRS_PER_BLOCK * PTRS_PER_BLOCK {
        return Ok(Location::DoubleIndirect(block_no / PTRS_PER_BLOCK, block_no % PTRS_PER_BLOCK));
    }
    // Triple indirect range: out of scope, rejected here.
    Err(Errno::ENOSPC)
}

impl FileBlocks {
    pub fn new() -> Self {
        FileBlocks {
            direct: [
                None, None, None, None, None, None, None, None, None, None, None, None,
            ],
            indirect: None,
            double_indirect: None,
        }
    }

    fn block(&self, block_no: usize) -> KResult<Option<&Block>> {
        match locate(block_no)? {
            Location::Direct(i) => Ok(self.direct[i].as_deref()),
            Location::Indirect(i) => {
                Ok(self.indirect.as_ref().and_then(|ind| ind[i].as_deref()))
            }
            Location::DoubleIndirect(hi, lo) => Ok(self
                .double_indirect
                .as_ref()
                .and_then(|d| d[hi].as_ref())
                .and_then(|ind| ind[lo].as_deref())),
        }
    }

    fn block_mut_or_alloc(&mut self, block_no: usize) -> KResult<&mut Block> {
        match locate(block_no)? {
            Location::Direct(i) => {
                Ok(self.direct[i].get_or_insert_with(zeroed_block).as_mut())
            }
            Location::Indirect(i) => {
                let ind = self
                    .indirect
                    .get_or_insert_with(|| Box::new(new_ptr_block()));
                Ok(ind[i].get_or_insert_with(zeroed_block).as_mut())
            }
            Location::DoubleIndirect(hi, lo) => {
                let outer = self
                    .double_indirect
                    .get_or_insert_with(|| Box::new(new_double_ptr_block()));
                let inner = outer[hi].get_or_insert_with(|| Box::new(new_ptr_block()));
                Ok(inner[lo].get_or_insert_with(zeroed_block).as_mut())
            }
        }
    }

    /// Reads past EOF (tracked by the caller via `size`) stop early;
    /// blocks inside the file range that were never written read as zero
    /// (a sparse hole).
    pub fn read(&self, offset: u64, buf: &mut [u8]) -> KResult<()> {
        let mut done = 0usize;
        while done < buf.len() {
            let abs = offset + done as u64;
            let block_no = (abs / PAGE_BYTES as u64) as usize;
            let in_block = (abs % PAGE_BYTES as u64) as usize;
            let want = (PAGE_BYTES - in_block).min(buf.len() - done);
            match self.block(block_no)? {
                Some(block) => buf[done..done + want].copy_from_slice(&block[in_block..in_block + want]),
                None => buf[done..done + want].fill(0),
            }
            done += want;
        }
        Ok(())
    }

    pub fn write(&mut self, offset: u64, buf: &[u8]) -> KResult<()> {
        let mut done = 0usize;
        while done < buf.len() {
            let abs = offset + done as u64;
            let block_no = (abs / PAGE_BYTES as u64) as usize;
            let in_block = (abs % PAGE_BYTES as u64) as usize;
            let want = (PAGE_BYTES - in_block).min(buf.len() - done);
            let block = self.block_mut_or_alloc(block_no)?;
            block[in_block..in_block + want].copy_from_slice(&buf[done..done + want]);
            done += want;
        }
        Ok(())
    }

    /// Frees every block whose index is `>= first_freed_block` (shrinking
    /// truncation). Blocks below that index, including any indirect
    /// blocks that still hold a live pointer, are left untouched.
    pub fn truncate_from(&mut self, first_freed_block: usize) {
        for i in first_freed_block.min(N_DIRECT_BLOCKS)..N_DIRECT_BLOCKS {
            self.direct[i] = None;
        }
        if first_freed_block < N_DIRECT_BLOCKS + PTRS_PER_BLOCK {
            if let Some(ind) = &mut self.indirect {
                let start = first_freed_block.saturating_sub(N_DIRECT_BLOCKS);
                for slot in ind.iter_mut().skip(start) {
                    *slot = None;
                }
            }
        }
        let double_start = N_DIRECT_BLOCKS + PTRS_PER_BLOCK;
        if first_freed_block < double_start + PTRS_PER_BLOCK * PTRS_PER_BLOCK {
            if let Some(outer) = &mut self.double_indirect {
                let rel = first_freed_block.saturating_sub(double_start);
                let hi_start = rel / PTRS_PER_BLOCK;
                let lo_start = rel % PTRS_PER_BLOCK;
                for (hi, inner_slot) in outer.iter_mut().enumerate().skip(hi_start) {
                    if let Some(inner) = inner_slot {
                        let from = if hi == hi_start { lo_start } else { 0 };
                        for slot in inner.iter_mut().skip(from) {
                            *slot = None;
                        }
                    }
                }
            }
        }
    }
}

fn new_ptr_block() -> Vec<Option<Box<Block>>> {
    let mut v = Vec::with_capacity(PTRS_PER_BLOCK);
    for _ in 0..PTRS_PER_BLOCK {
        v.push(None);
    }
    v
}

fn new_double_ptr_block() -> Vec<Option<Box<Vec<Option<Box<Block>>>>>> {
    let mut v = Vec::with_capacity(PTRS_PER_BLOCK);
    for _ in 0..PTRS_PER_BLOCK {
        v.push(None);
    }
    v
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read_direct_block_round_trips() {
        let mut f = FileBlocks::new();
        f.write(0, b"hello").unwrap();
        let mut out = [0u8; 5];
        f.read(0, &mut out).unwrap();
        assert_eq!(&out, b"hello");
    }

    #[test]
    fn unwritten_block_within_range_reads_zero() {
        let mut f = FileBlocks::new();
        f.write(PAGE_BYTES as u64 * 2, b"x").unwrap();
        let mut out = [0xffu8; 4];
        f.read(0, &mut out).unwrap();
        assert_eq!(out, [0, 0, 0, 0]);
    }

    #[test]
    fn write_past_direct_range_reaches_indirect_block() {
        let mut f = FileBlocks::new();
        let offset = (N_DIRECT_BLOCKS as u64) * PAGE_BYTES as u64;
        f.write(offset, b"indirect").unwrap();
        let mut out = [0u8; 8];
        f.read(offset, &mut out).unwrap();
        assert_eq!(&out, b"indirect");
    }

    #[test]
    fn triple_indirect_range_is_rejected() {
        let offset = N_DIRECT_BLOCKS + PTRS_PER_BLOCK + PTRS_PER_BLOCK * PTRS_PER_BLOCK;
        assert_eq!(locate(offset), Err(Errno::ENOSPC));
    }

    #[test]
    fn truncate_drops_blocks_past_new_length() {
        let mut f = FileBlocks::new();
        f.write(0, b"abc").unwrap();
        f.write(PAGE_BYTES as u64, b"def").unwrap();
        f.truncate_from(1);
        assert!(f.direct[0].is_some());
        assert!(f.direct[1].is_none());
    }
}

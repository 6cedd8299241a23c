//! Fixed-block-size bitmap allocator for variable-sized allocations (§4.2).
//!
//! Grounded on `SIMDBitmapAllocator.hpp`: power-of-two block rounding, a
//! small slab-bucket free list capped at [`MAX_FREE_SLAB_BUCKETS`] entries
//! with a per-bucket offset queue capped at [`MAX_SLAB_QUEUE_DEPTH`], and a
//! batched bitmap scan that tries to reject or accept whole 256-bit batches
//! before falling back to a per-word search. The batch pre-check is the
//! only part that differs between the AVX2 and scalar paths — both mutate
//! the same per-word logic, so a build without AVX2 produces bit-identical
//! allocations to one with it (§4.2).

use std::collections::VecDeque;

use crate::error::{CacheError, Result};

const BLOCKS_PER_WORD: u32 = 64;
const WORDS_PER_BATCH: usize = 4;
const MAX_FREE_SLAB_BUCKETS: usize = 10;
const MAX_SLAB_QUEUE_DEPTH: usize = 50;

fn next_power_of_two(n: u32) -> u32 {
    if n <= 1 {
        1
    } else {
        n.next_power_of_two()
    }
}

fn blocks_needed(bytes: u32, block_size: u32) -> u32 {
    next_power_of_two((bytes + block_size - 1) / block_size)
}

/// One bucket of same-sized free runs, kept sorted by `slab_size` so lookup
/// is a binary search. `offsets` is a bounded recency queue; `min_offset`
/// stays authoritative even once the queue drops older entries.
struct FreeSlab {
    slab_size: u32,
    slabs_count: u32,
    min_offset: u32,
    offsets: VecDeque<u32>,
}

#[derive(PartialEq, Eq)]
enum BatchState {
    AllFree,
    AllFull,
    Mixed,
}

/// A bitmap allocator over a fixed-size-block arena.
///
/// Allocations request a byte count, are rounded up to the nearest
/// power-of-two number of blocks, and placed either by extending
/// `next_block` (the common bump-allocator fast path) or by reusing a slab
/// freed earlier. A single allocation is capped below
/// [`BLOCKS_PER_WORD`] blocks — a known limitation of the batched-word
/// scan rather than a design goal, enforced here with a `debug_assert`.
pub struct BitmapAllocator {
    block_size: u32,
    total_blocks: u32,
    bitmap: Vec<u64>,
    free_slabs: Vec<FreeSlab>,
    available_blocks: u32,
    next_block: u32,
}

impl BitmapAllocator {
    pub fn new(block_size: u32, storage_size: u64) -> Self {
        assert!(block_size > 0, "block size must be non-zero");
        let total_blocks = (storage_size / block_size as u64) as u32;
        let total_words = ((total_blocks + BLOCKS_PER_WORD - 1) / BLOCKS_PER_WORD).max(1) as usize;
        BitmapAllocator {
            block_size,
            total_blocks,
            bitmap: vec![0u64; total_words],
            free_slabs: Vec::with_capacity(MAX_FREE_SLAB_BUCKETS),
            available_blocks: total_blocks,
            next_block: 0,
        }
    }

    pub fn block_size(&self) -> u32 {
        self.block_size
    }

    pub fn total_blocks(&self) -> u32 {
        self.total_blocks
    }

    pub fn available_blocks(&self) -> u32 {
        self.available_blocks
    }

    /// Allocate enough blocks to hold `bytes`, returning the byte offset of
    /// the run. Tries the bump pointer first, then the slab buckets from
    /// smallest-fit to largest, then a scan starting at the smallest known
    /// free offset.
    pub fn allocate(&mut self, bytes: u32) -> Result<u64> {
        let required_blocks = blocks_needed(bytes, self.block_size);
        debug_assert!(
            required_blocks > 0 && required_blocks < BLOCKS_PER_WORD,
            "a single allocation spanning 64 or more blocks is not supported"
        );

        if self.next_block + required_blocks < self.total_blocks {
            if let Some(offset) = self.try_find_block(required_blocks, self.next_block) {
                self.available_blocks -= required_blocks;
                self.next_block = offset + required_blocks;
                return Ok(offset as u64 * self.block_size as u64);
            }
        }

        let mut i = 0;
        while i < self.free_slabs.len() {
            if self.free_slabs[i].slab_size >= required_blocks && self.free_slabs[i].slabs_count > 0 {
                let mut offset = self.free_slabs[i].min_offset;
                if let Some(front) = self.free_slabs[i].offsets.pop_front() {
                    offset = front;
                }
                if let Some(found) = self.try_find_block(required_blocks, offset) {
                    self.available_blocks -= required_blocks;
                    let slab_size = self.free_slabs[i].slab_size;
                    let remaining = slab_size - required_blocks;
                    let new_offset = offset + required_blocks;

                    self.free_slabs[i].slabs_count -= 1;
                    if self.free_slabs[i].slabs_count == 0 {
                        self.free_slabs.remove(i);
                    } else {
                        self.free_slabs[i].min_offset = self.free_slabs[i].min_offset.min(new_offset);
                    }

                    if remaining > 0 {
                        self.insert_or_merge_slab(remaining, 1, offset);
                    }
                    return Ok(found as u64 * self.block_size as u64);
                } else {
                    self.free_slabs.remove(i);
                }
            } else {
                i += 1;
            }
        }

        let min_offset = self
            .free_slabs
            .iter()
            .map(|s| s.min_offset)
            .min()
            .unwrap_or(0);
        if let Some(found) = self.try_find_block(required_blocks, min_offset) {
            self.available_blocks -= required_blocks;
            return Ok(found as u64 * self.block_size as u64);
        }

        Err(CacheError::OutOfStorage {
            blocks: required_blocks,
            available: self.available_blocks,
        })
    }

    /// Release a previously allocated run back to the bitmap and register
    /// it with the free-slab buckets for reuse.
    pub fn free(&mut self, offset: u64, bytes: u32) {
        let block_offset = (offset / self.block_size as u64) as u32;
        let blocks_count = blocks_needed(bytes, self.block_size);
        debug_assert!(block_offset < self.total_blocks);
        self.reclaim_bitmap(block_offset, blocks_count);
        self.insert_or_merge_slab(blocks_count, 1, block_offset);
    }

    fn reclaim_bitmap(&mut self, mut block_offset: u32, mut blocks_count: u32) {
        self.available_blocks += blocks_count;
        while blocks_count > 0 {
            let word_idx = (block_offset / BLOCKS_PER_WORD) as usize;
            let bit_offset = block_offset % BLOCKS_PER_WORD;
            let trailing = BLOCKS_PER_WORD - bit_offset;
            let bits_to_reset = blocks_count.min(trailing);
            let mask = ((1u64 << bits_to_reset) - 1) << bit_offset;
            debug_assert_eq!(
                self.bitmap[word_idx] & mask,
                mask,
                "freeing a range that wasn't fully allocated"
            );
            self.bitmap[word_idx] &= !mask;
            block_offset += bits_to_reset;
            blocks_count -= bits_to_reset;
        }
    }

    fn insert_or_merge_slab(&mut self, slab_size: u32, count: u32, offset: u32) {
        match self.free_slabs.binary_search_by_key(&slab_size, |s| s.slab_size) {
            Ok(idx) => {
                let slab = &mut self.free_slabs[idx];
                slab.slabs_count += count;
                slab.min_offset = slab.min_offset.min(offset);
                if slab.offsets.len() < MAX_SLAB_QUEUE_DEPTH {
                    slab.offsets.push_back(offset);
                }
            }
            Err(idx) => {
                if self.free_slabs.len() < MAX_FREE_SLAB_BUCKETS {
                    self.free_slabs.insert(
                        idx,
                        FreeSlab {
                            slab_size,
                            slabs_count: count,
                            min_offset: offset,
                            offsets: VecDeque::new(),
                        },
                    );
                }
            }
        }
    }

    /// Find and mark `required_blocks` contiguous free blocks, scanning
    /// from `offset_hint`'s containing word, wrapping around once.
    fn try_find_block(&mut self, required_blocks: u32, offset_hint: u32) -> Option<u32> {
        if self.bitmap.is_empty() || offset_hint >= self.total_blocks {
            return None;
        }
        let total_words = self.bitmap.len();
        let start_word = (offset_hint / BLOCKS_PER_WORD) as usize;

        for (lo, hi) in [(start_word, total_words), (0, start_word)] {
            let mut word_idx = lo;
            while word_idx < hi {
                if word_idx + WORDS_PER_BATCH <= hi {
                    match self.batch_state(word_idx) {
                        BatchState::AllFull => {
                            word_idx += WORDS_PER_BATCH;
                            continue;
                        }
                        BatchState::AllFree => {
                            let mask = (1u64 << required_blocks) - 1;
                            self.bitmap[word_idx] |= mask;
                            return Some(word_idx as u32 * BLOCKS_PER_WORD);
                        }
                        BatchState::Mixed => {}
                    }
                }
                if let Some(bit) = self.scan_word_and_next(word_idx, required_blocks) {
                    return Some(bit);
                }
                word_idx += 1;
            }
        }
        None
    }

    /// Try to satisfy the request entirely within `bitmap[word_idx]`, or by
    /// spanning across the boundary into `bitmap[word_idx + 1]`.
    fn scan_word_and_next(&mut self, word_idx: usize, required_blocks: u32) -> Option<u32> {
        let word = self.bitmap[word_idx];
        let inverted = !word;

        let mut remaining = inverted;
        while remaining != 0 {
            let free_bit = remaining.trailing_zeros();
            if free_bit + required_blocks <= BLOCKS_PER_WORD {
                let mask = ((1u64 << required_blocks) - 1) << free_bit;
                if word & mask == 0 {
                    self.bitmap[word_idx] |= mask;
                    return Some(word_idx as u32 * BLOCKS_PER_WORD + free_bit);
                }
            }
            remaining &= remaining - 1;
        }

        if word_idx + 1 < self.bitmap.len() {
            let top_free = inverted.leading_ones();
            if top_free > 0 && top_free < required_blocks {
                let needed_in_next = required_blocks - top_free;
                let next_word = self.bitmap[word_idx + 1];
                let bottom_free = (!next_word).trailing_ones();
                if needed_in_next <= bottom_free {
                    let bit_offset = BLOCKS_PER_WORD - top_free;
                    let mask_here = ((1u64 << top_free) - 1) << bit_offset;
                    let mask_next = (1u64 << needed_in_next) - 1;
                    self.bitmap[word_idx] |= mask_here;
                    self.bitmap[word_idx + 1] |= mask_next;
                    return Some(word_idx as u32 * BLOCKS_PER_WORD + bit_offset);
                }
            }
        }
        None
    }

    fn batch_state(&self, word_idx: usize) -> BatchState {
        let words = &self.bitmap[word_idx..word_idx + WORDS_PER_BATCH];
        #[cfg(target_arch = "x86_64")]
        {
            if is_x86_feature_detected!("avx2") {
                return unsafe { batch_state_avx2(words) };
            }
        }
        batch_state_scalar(words)
    }
}

fn batch_state_scalar(words: &[u64]) -> BatchState {
    if words.iter().all(|&w| w == 0) {
        BatchState::AllFree
    } else if words.iter().all(|&w| w == u64::MAX) {
        BatchState::AllFull
    } else {
        BatchState::Mixed
    }
}

#[cfg(target_arch = "x86_64")]
unsafe fn batch_state_avx2(words: &[u64]) -> BatchState {
    use std::arch::x86_64::*;
    debug_assert_eq!(words.len(), WORDS_PER_BATCH);
    let v = _mm256_loadu_si256(words.as_ptr() as *const __m256i);
    if _mm256_testz_si256(v, v) != 0 {
        return BatchState::AllFree;
    }
    let ones = _mm256_set1_epi32(-1);
    if _mm256_testc_si256(v, ones) != 0 {
        return BatchState::AllFull;
    }
    BatchState::Mixed
}

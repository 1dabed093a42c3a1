//! Monotonic bump allocator over a region of guest linear memory.
//!
//! The arena claims its region by growing linear memory, so the pages it owns
//! are disjoint from anything the Rust global allocator manages. When the
//! global allocator has taken the pages after the arena, the arena opens a
//! new segment on freshly grown pages instead. Allocations only ever move the
//! cursor forward; nothing is reused until the instance is destroyed.

use crate::memory::{LinearMemory, MemoryError, MAX_MEMORY_BYTES, PAGE_SIZE};
use std::ops::Range;
use thiserror::Error;

/// Bytes kept unused when the region starts at address 0, so that `0` stays
/// free to signal failure across the ABI.
const NULL_GUARD: u32 = 8;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AllocError {
    #[error("Arena exhausted: {requested} bytes requested, {remaining} available")]
    Exhausted { requested: u32, remaining: u64 },

    #[error("Allocation of {requested} bytes overflows the address space")]
    Overflow { requested: u32 },

    #[error("Memory growth of {pages} pages refused")]
    GrowRefused { pages: u32 },

    #[error("Write into arena failed: {0}")]
    Write(#[from] MemoryError),
}

/// 内存池配置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArenaConfig {
    /// Pages claimed up front when the arena is created.
    pub reserve_pages: u32,
    /// Whether the arena may grow memory once the reservation is used up.
    pub growable: bool,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            reserve_pages: 16,
            growable: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Arena {
    // 当前段
    base: u32,
    offset: u32,
    capacity: u64,
    segment_pages: u32,
    growable: bool,
    /// Used spans of earlier segments, in address order.
    retired: Vec<Range<u64>>,
    used: u64,
    allocations: u64,
    released: u64,
}

impl Arena {
    /// Claim `config.reserve_pages` fresh pages of `memory` for the arena.
    pub fn reserve<M: LinearMemory>(memory: &mut M, config: ArenaConfig) -> Result<Self, AllocError> {
        let previous = memory
            .grow(config.reserve_pages)
            .ok_or(AllocError::GrowRefused {
                pages: config.reserve_pages,
            })?;
        let base = previous as u64 * PAGE_SIZE as u64;
        let capacity = config.reserve_pages as u64 * PAGE_SIZE as u64;
        if base + capacity > MAX_MEMORY_BYTES {
            return Err(AllocError::GrowRefused {
                pages: config.reserve_pages,
            });
        }

        Ok(Self {
            base: base as u32,
            offset: segment_start(base),
            capacity,
            segment_pages: config.reserve_pages.max(1),
            growable: config.growable,
            retired: Vec::new(),
            used: 0,
            allocations: 0,
            released: 0,
        })
    }

    /// Reserve `size` contiguous bytes and return their address.
    ///
    /// On failure the arena is left exactly as it was.
    pub fn allocate<M: LinearMemory>(&mut self, memory: &mut M, size: u32) -> Result<u32, AllocError> {
        // 新段总在当前游标之上，所以这里越界意味着任何段都放不下
        if self.cursor() as u64 + size as u64 > MAX_MEMORY_BYTES - 1 {
            return Err(AllocError::Overflow { requested: size });
        }

        let end = self.offset as u64 + size as u64;
        if end > self.capacity {
            self.grow_to(memory, end, size)?;
        }

        let ptr = self.base + self.offset;
        self.offset += size;
        self.used += size as u64;
        self.allocations += 1;
        Ok(ptr)
    }

    fn grow_to<M: LinearMemory>(&mut self, memory: &mut M, end: u64, requested: u32) -> Result<(), AllocError> {
        let exhausted = AllocError::Exhausted {
            requested,
            remaining: self.remaining(),
        };
        if !self.growable {
            return Err(exhausted);
        }

        // 区域位于线性内存末尾：原地扩展
        if self.base as u64 + self.capacity == memory.size() as u64 {
            let pages = pages_for(end - self.capacity).ok_or(AllocError::Overflow { requested })?;
            memory.grow(pages).ok_or(exhausted)?;
            self.capacity += pages as u64 * PAGE_SIZE as u64;
            return Ok(());
        }

        // 尾部已被其他分配器占用：在新增的页上开启新段
        let needed = pages_for(requested as u64).ok_or(AllocError::Overflow { requested })?;
        let preferred = needed.max(self.segment_pages);
        let (previous, pages) = match memory.grow(preferred) {
            Some(previous) => (previous, preferred),
            None if preferred > needed => (memory.grow(needed).ok_or(exhausted)?, needed),
            None => return Err(exhausted),
        };

        let base = previous as u64 * PAGE_SIZE as u64;
        let capacity = pages as u64 * PAGE_SIZE as u64;
        if base + capacity > MAX_MEMORY_BYTES {
            return Err(AllocError::Overflow { requested });
        }

        crate::debug!(
            "arena segment moved from {:#x} to {:#x} ({} pages)",
            self.base,
            base,
            pages
        );
        let span = self.base as u64 + segment_start(self.base as u64) as u64..self.cursor() as u64;
        self.retired.push(span);
        self.base = base as u32;
        self.offset = segment_start(base);
        self.capacity = capacity;
        Ok(())
    }

    /// Advisory release. The bytes are counted but never handed out again.
    pub fn deallocate(&mut self, ptr: u32, size: u32) -> bool {
        let range = ptr as u64..ptr as u64 + size as u64;
        let current = self.base as u64..self.cursor() as u64;
        let owned = std::iter::once(&current)
            .chain(self.retired.iter())
            .any(|span| range.start >= span.start && range.end <= span.end);
        if owned {
            self.released += size as u64;
        }
        owned
    }

    /// Base of the current segment.
    pub fn base(&self) -> u32 {
        self.base
    }

    /// Offset inside the current segment.
    pub fn offset(&self) -> u32 {
        self.offset
    }

    /// Address the next allocation will start at.
    pub fn cursor(&self) -> u32 {
        self.base + self.offset
    }

    /// Bytes handed out over the arena's lifetime.
    pub fn used(&self) -> u64 {
        self.used
    }

    /// Capacity of the current segment.
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Bytes left before the arena has to grow.
    pub fn remaining(&self) -> u64 {
        self.capacity.saturating_sub(self.offset as u64)
    }

    /// Number of segments opened so far, the current one included.
    pub fn segments(&self) -> usize {
        self.retired.len() + 1
    }

    pub fn allocations(&self) -> u64 {
        self.allocations
    }

    pub fn released_bytes(&self) -> u64 {
        self.released
    }
}

/// First usable offset of a segment starting at `base`.
fn segment_start(base: u64) -> u32 {
    if base == 0 {
        NULL_GUARD
    } else {
        0
    }
}

fn pages_for(bytes: u64) -> Option<u32> {
    u32::try_from(bytes.div_ceil(PAGE_SIZE as u64)).ok()
}

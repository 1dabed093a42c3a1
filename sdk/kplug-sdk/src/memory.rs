//! Guest linear memory access.
//!
//! Every read and write the SDK performs goes through [`LinearMemory`], which
//! validates `[ptr, ptr + len)` against the current memory size first. The
//! wasm32 implementation talks to the module's own memory; [`VecMemory`]
//! simulates one for native builds and tests.

use std::ops::Range;
use thiserror::Error;

/// Wasm page size in bytes.
pub const PAGE_SIZE: usize = 65536;

/// Largest address space a wasm32 memory can describe.
pub const MAX_MEMORY_BYTES: u64 = 1 << 32;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MemoryError {
    #[error("range {ptr:#x}+{len} is outside linear memory of {size} bytes")]
    OutOfBounds { ptr: u64, len: u64, size: usize },

    #[error("null pointer for a {len} byte range")]
    NullPointer { len: u64 },
}

/// Validate `[ptr, ptr + len)` against a memory of `size` bytes.
pub fn check_range(ptr: u64, len: u64, size: usize) -> Result<Range<usize>, MemoryError> {
    if len == 0 {
        return Ok(0..0);
    }
    if ptr == 0 {
        return Err(MemoryError::NullPointer { len });
    }
    let end = ptr
        .checked_add(len)
        .filter(|end| *end <= size as u64)
        .ok_or(MemoryError::OutOfBounds { ptr, len, size })?;
    Ok(ptr as usize..end as usize)
}

/// 线性内存抽象
pub trait LinearMemory {
    /// Current size in bytes.
    fn size(&self) -> usize;

    /// Grow by `pages` wasm pages. Returns the previous size in pages, or
    /// `None` when the growth is refused.
    fn grow(&mut self, pages: u32) -> Option<u32>;

    fn read(&self, ptr: u32, len: u32) -> Result<&[u8], MemoryError>;

    fn write(&mut self, ptr: u32, bytes: &[u8]) -> Result<(), MemoryError>;

    fn pages(&self) -> u32 {
        (self.size() / PAGE_SIZE) as u32
    }
}

/// `Vec<u8>` backed linear memory with a page maximum.
#[derive(Debug, Clone)]
pub struct VecMemory {
    data: Vec<u8>,
    max_pages: u32,
}

impl VecMemory {
    pub fn new(initial_pages: u32, max_pages: u32) -> Self {
        Self {
            data: vec![0; initial_pages as usize * PAGE_SIZE],
            max_pages: max_pages.max(initial_pages),
        }
    }

    pub fn max_pages(&self) -> u32 {
        self.max_pages
    }
}

impl LinearMemory for VecMemory {
    fn size(&self) -> usize {
        self.data.len()
    }

    fn grow(&mut self, pages: u32) -> Option<u32> {
        let previous = self.pages();
        let next = previous.checked_add(pages)?;
        if next > self.max_pages {
            return None;
        }
        self.data.resize(next as usize * PAGE_SIZE, 0);
        Some(previous)
    }

    fn read(&self, ptr: u32, len: u32) -> Result<&[u8], MemoryError> {
        let range = check_range(ptr as u64, len as u64, self.size())?;
        Ok(&self.data[range])
    }

    fn write(&mut self, ptr: u32, bytes: &[u8]) -> Result<(), MemoryError> {
        let range = check_range(ptr as u64, bytes.len() as u64, self.size())?;
        self.data[range].copy_from_slice(bytes);
        Ok(())
    }
}

/// The running module's own memory (index 0).
#[cfg(target_arch = "wasm32")]
#[derive(Debug, Default, Clone, Copy)]
pub struct WasmMemory;

#[cfg(target_arch = "wasm32")]
impl LinearMemory for WasmMemory {
    fn size(&self) -> usize {
        core::arch::wasm32::memory_size(0) * PAGE_SIZE
    }

    fn grow(&mut self, pages: u32) -> Option<u32> {
        let previous = core::arch::wasm32::memory_grow(0, pages as usize);
        if previous == usize::MAX {
            None
        } else {
            Some(previous as u32)
        }
    }

    fn read(&self, ptr: u32, len: u32) -> Result<&[u8], MemoryError> {
        let range = check_range(ptr as u64, len as u64, self.size())?;
        if range.is_empty() {
            return Ok(&[]);
        }
        // Safety: the range is non-null and lies inside the current memory,
        // which never shrinks.
        Ok(unsafe { std::slice::from_raw_parts(range.start as *const u8, range.len()) })
    }

    fn write(&mut self, ptr: u32, bytes: &[u8]) -> Result<(), MemoryError> {
        let range = check_range(ptr as u64, bytes.len() as u64, self.size())?;
        if range.is_empty() {
            return Ok(());
        }
        // Safety: same bounds argument as `read`; callers only write into
        // regions the arena handed out.
        unsafe {
            std::ptr::copy_nonoverlapping(bytes.as_ptr(), range.start as *mut u8, range.len());
        }
        Ok(())
    }
}

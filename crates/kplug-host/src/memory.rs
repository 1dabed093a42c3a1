use anyhow::{anyhow, Context, Result};
use kplug_types::PackedWord;
use crate::wasm_host::HostState;
use wasmtime::{Memory, Store, TypedFunc};

/// Read `len` bytes at `ptr` from Wasm memory.
pub fn read_bytes_from_wasm(memory: &Memory, store: &Store<HostState>, ptr: u32, len: u32) -> Result<Vec<u8>> {
    let start = ptr as usize;
    let data = memory
        .data(store)
        .get(start..start + len as usize)
        .ok_or(anyhow!("Pointer/Length out of bounds: {:#x}+{}", ptr, len))?;

    Ok(data.to_vec())
}

/// Read the buffer a guest entry point returned.
pub fn read_word_from_wasm(memory: &Memory, store: &Store<HostState>, word: PackedWord, max_len: u64) -> Result<Vec<u8>> {
    if word.is_null() {
        return Err(anyhow!("Guest returned an unusable buffer ({})", word));
    }
    if word.len() as u64 > max_len {
        return Err(anyhow!(
            "Guest response of {} bytes exceeds max_output_bytes ({})",
            word.len(),
            max_len
        ));
    }
    read_bytes_from_wasm(memory, store, word.ptr(), word.len())
}

/// Write a byte slice into memory obtained from the guest's `allocate` export.
/// Returns the pointer/length pair that was written.
///
/// If the write fails the buffer is handed back through `dealloc_fn`.
pub fn write_bytes_to_wasm(
    memory: &Memory,
    store: &mut Store<HostState>,
    alloc_fn: &TypedFunc<u32, u32>,
    dealloc_fn: &TypedFunc<(u32, u32), ()>,
    bytes: &[u8],
) -> Result<(u32, u32)> {
    let len = u32::try_from(bytes.len()).context("Input does not fit in a 32-bit length")?;
    let ptr = alloc_fn.call(&mut *store, len)?;
    if ptr == 0 && len > 0 {
        return Err(anyhow!("Guest could not allocate {} bytes", len));
    }

    // 确保即使写入失败也能释放内存
    if let Err(e) = memory.write(&mut *store, ptr as usize, bytes) {
        if let Err(dealloc_err) = dealloc_fn.call(&mut *store, (ptr, len)) {
            tracing::warn!("Failed to deallocate guest input {:#x}+{}: {}", ptr, len, dealloc_err);
        }
        return Err(anyhow!("Failed to write {} bytes at {:#x}: {}", len, ptr, e));
    }

    Ok((ptr, len))
}

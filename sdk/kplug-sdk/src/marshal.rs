//! Buffer marshalling across the host/guest boundary.
//!
//! Inbound buffers arrive as a raw `(ptr, len)` pair written by the host;
//! outbound buffers are carved from the arena and described by a
//! [`PackedWord`]. Ownership of an outbound buffer passes to the host, which
//! may hand it back through `deallocate`.

use crate::arena::AllocError;
use crate::context::GuestContext;
use crate::error::{PluginError, Result};
use crate::memory::{LinearMemory, MemoryError};
use kplug_types::PackedWord;

/// Read-only view over the `len` bytes the host placed at `ptr`.
pub fn decode_input<M: LinearMemory>(memory: &M, ptr: u64, len: u64) -> Result<&[u8]> {
    let out_of_bounds = || {
        PluginError::InputRejected(MemoryError::OutOfBounds {
            ptr,
            len,
            size: memory.size(),
        })
    };
    let ptr32 = u32::try_from(ptr).map_err(|_| out_of_bounds())?;
    let len32 = u32::try_from(len).map_err(|_| out_of_bounds())?;
    memory.read(ptr32, len32).map_err(PluginError::InputRejected)
}

/// Copy `bytes` into a freshly allocated arena region.
///
/// This is the only place response bytes are written into guest memory.
pub fn encode_output<M: LinearMemory>(ctx: &mut GuestContext<M>, bytes: &[u8]) -> std::result::Result<PackedWord, AllocError> {
    let len = u32::try_from(bytes.len()).map_err(|_| AllocError::Overflow { requested: u32::MAX })?;
    let (memory, arena) = ctx.parts_mut();
    let ptr = arena.allocate(memory, len)?;
    memory.write(ptr, bytes)?;
    Ok(PackedWord::new(ptr, len))
}

/// Read back the bytes an outbound word refers to.
pub fn read_output<M: LinearMemory>(memory: &M, word: PackedWord) -> std::result::Result<&[u8], MemoryError> {
    memory.read(word.ptr(), word.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::ArenaConfig;
    use crate::memory::{VecMemory, PAGE_SIZE};

    fn context() -> GuestContext<VecMemory> {
        GuestContext::new(VecMemory::new(1, 64), ArenaConfig::default()).unwrap()
    }

    #[test]
    fn test_decode_then_encode_round_trips() {
        let mut ctx = context();
        let payload = br#"{"name":"World"}"#;
        ctx.memory_mut().write(1024, payload).unwrap();

        let input = decode_input(ctx.memory(), 1024, payload.len() as u64).unwrap().to_vec();
        let word = encode_output(&mut ctx, &input).unwrap();

        assert_eq!(word.len() as usize, payload.len());
        assert_ne!(word.ptr(), 1024);
        assert_eq!(read_output(ctx.memory(), word).unwrap(), payload);
    }

    #[test]
    fn test_decode_rejects_out_of_range() {
        let ctx = context();
        let size = ctx.memory().size() as u64;

        let err = decode_input(ctx.memory(), size - 4, 8).unwrap_err();
        assert!(matches!(err, PluginError::InputRejected(MemoryError::OutOfBounds { .. })));

        let err = decode_input(ctx.memory(), 1 << 40, 1).unwrap_err();
        assert!(matches!(err, PluginError::InputRejected(MemoryError::OutOfBounds { .. })));

        let err = decode_input(ctx.memory(), 16, u64::MAX).unwrap_err();
        assert!(matches!(err, PluginError::InputRejected(_)));

        let err = decode_input(ctx.memory(), 0, 4).unwrap_err();
        assert!(matches!(err, PluginError::InputRejected(MemoryError::NullPointer { .. })));
    }

    #[test]
    fn test_empty_input_is_an_empty_view() {
        let ctx = context();
        assert!(decode_input(ctx.memory(), 0, 0).unwrap().is_empty());
    }

    #[test]
    fn test_encode_outputs_never_overlap() {
        let mut ctx = context();
        let a = encode_output(&mut ctx, b"first").unwrap();
        let b = encode_output(&mut ctx, b"second").unwrap();
        assert!(b.ptr() >= a.ptr() + a.len());
        assert_eq!(read_output(ctx.memory(), a).unwrap(), b"first");
        assert_eq!(read_output(ctx.memory(), b).unwrap(), b"second");
    }

    #[test]
    fn test_encode_fails_cleanly_when_arena_is_full() {
        let mut ctx = GuestContext::new(
            VecMemory::new(1, 2),
            ArenaConfig {
                reserve_pages: 1,
                growable: false,
            },
        )
        .unwrap();
        let cursor = ctx.arena().cursor();

        let err = encode_output(&mut ctx, &vec![0u8; PAGE_SIZE + 1]).unwrap_err();
        assert!(matches!(err, AllocError::Exhausted { .. }));
        assert_eq!(ctx.arena().cursor(), cursor);
    }
}

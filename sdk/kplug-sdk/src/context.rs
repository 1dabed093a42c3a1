//! Per-instance execution context.
//!
//! A guest instance owns exactly one [`GuestContext`]: its linear memory plus
//! the arena carved out of it. Entry points reach it through
//! [`with_instance`], which serializes access behind a mutex.

use crate::arena::{AllocError, Arena, ArenaConfig};
use crate::memory::LinearMemory;
use std::sync::Mutex;

#[derive(Debug)]
pub struct GuestContext<M: LinearMemory> {
    memory: M,
    arena: Arena,
}

impl<M: LinearMemory> GuestContext<M> {
    pub fn new(mut memory: M, config: ArenaConfig) -> Result<Self, AllocError> {
        let arena = Arena::reserve(&mut memory, config)?;
        Ok(Self { memory, arena })
    }

    pub fn allocate(&mut self, size: u32) -> Result<u32, AllocError> {
        self.arena.allocate(&mut self.memory, size)
    }

    /// Advisory; see [`Arena::deallocate`].
    pub fn deallocate(&mut self, ptr: u32, size: u32) {
        if self.arena.deallocate(ptr, size) {
            crate::trace!("deallocate({:#x}, {}) noted, {} bytes released so far", ptr, size, self.arena.released_bytes());
        } else {
            crate::warn!("deallocate({:#x}, {}) does not belong to the arena", ptr, size);
        }
    }

    pub fn memory(&self) -> &M {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut M {
        &mut self.memory
    }

    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    pub(crate) fn parts_mut(&mut self) -> (&mut M, &mut Arena) {
        (&mut self.memory, &mut self.arena)
    }
}

/// Memory backing the process-wide instance.
#[cfg(target_arch = "wasm32")]
pub type InstanceMemory = crate::memory::WasmMemory;
#[cfg(not(target_arch = "wasm32"))]
pub type InstanceMemory = crate::memory::VecMemory;

/// Pages of simulated "program" memory below the arena on native targets.
#[cfg(not(target_arch = "wasm32"))]
const NATIVE_INITIAL_PAGES: u32 = 1;
#[cfg(not(target_arch = "wasm32"))]
const NATIVE_MAX_PAGES: u32 = 1024;

fn instance_memory() -> InstanceMemory {
    #[cfg(target_arch = "wasm32")]
    {
        crate::memory::WasmMemory
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        crate::memory::VecMemory::new(NATIVE_INITIAL_PAGES, NATIVE_MAX_PAGES)
    }
}

static INSTANCE: Mutex<Option<GuestContext<InstanceMemory>>> = Mutex::new(None);

/// Run `f` against this instance's context, creating it on first use.
///
/// Fails only when the arena cannot be reserved; the next call retries.
pub fn with_instance<R>(f: impl FnOnce(&mut GuestContext<InstanceMemory>) -> R) -> Result<R, AllocError> {
    // 单线程 Guest 中锁不会被污染；原生测试中被污染时继续使用内部状态
    let mut guard = INSTANCE.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    let context = match &mut *guard {
        Some(context) => context,
        slot @ None => slot.insert(reserve_instance()?),
    };
    Ok(f(context))
}

fn reserve_instance() -> Result<GuestContext<InstanceMemory>, AllocError> {
    let context = GuestContext::new(instance_memory(), ArenaConfig::default()).map_err(|e| {
        crate::error!("failed to reserve guest arena: {}", e);
        e
    })?;
    crate::debug!(
        "guest arena reserved at {:#x} ({} bytes)",
        context.arena().base(),
        context.arena().capacity()
    );
    Ok(context)
}

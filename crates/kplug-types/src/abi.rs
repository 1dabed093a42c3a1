use std::fmt;

/// Export name of the primary (greeting) handler.
pub const PRIMARY_ENTRY: &str = "handle_k8s";
/// Export name of the status / introspection handler.
pub const STATUS_ENTRY: &str = "handle_status";
/// Export name of the guest allocator.
pub const ALLOCATE_EXPORT: &str = "allocate";
/// Export name of the (advisory) guest deallocator.
pub const DEALLOCATE_EXPORT: &str = "deallocate";
/// Export name of the guest linear memory.
pub const MEMORY_EXPORT: &str = "memory";

/// 出站缓冲区描述符：`(pointer << 32) | length`
///
/// Guest entry points return one of these so that a single `u64` carries the
/// location of the response bytes. `PackedWord::NULL` marks a call that could
/// not produce a usable buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PackedWord(u64);

impl PackedWord {
    pub const NULL: PackedWord = PackedWord(0);

    pub const fn new(ptr: u32, len: u32) -> Self {
        Self(((ptr as u64) << 32) | len as u64)
    }

    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn into_raw(self) -> u64 {
        self.0
    }

    pub const fn ptr(self) -> u32 {
        (self.0 >> 32) as u32
    }

    pub const fn len(self) -> u32 {
        self.0 as u32
    }

    pub const fn is_empty(self) -> bool {
        self.len() == 0
    }

    pub const fn is_null(self) -> bool {
        self.ptr() == 0
    }
}

impl From<PackedWord> for u64 {
    fn from(word: PackedWord) -> Self {
        word.0
    }
}

impl fmt::Display for PackedWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}+{}", self.ptr(), self.len())
    }
}

//! Types shared by the guest SDK, the plugins and the host runner.
//!
//! Nothing in here touches linear memory; it only describes the numeric ABI
//! and the JSON shapes that travel across it.

pub mod abi;
pub mod response;

pub use abi::{PackedWord, ALLOCATE_EXPORT, DEALLOCATE_EXPORT, MEMORY_EXPORT, PRIMARY_ENTRY, STATUS_ENTRY};
pub use response::{Greeting, HealthStatus, Response, StatusReport};

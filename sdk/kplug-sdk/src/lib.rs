//! Guest SDK for kplug Wasm plugins.
//!
//! The host talks to a plugin only through integers: it writes request bytes
//! into guest memory, calls an export with `(ptr, len)` and gets back a
//! [`PackedWord`] locating the response. This crate provides the pieces a
//! plugin needs on its side of that boundary:
//!
//! * [`memory`]: bounds-checked access to linear memory;
//! * [`arena`]: the monotonic allocator response buffers come from;
//! * [`marshal`] and [`payload`]: byte and JSON marshalling;
//! * [`dispatch`]: the decode / respond plumbing shared by entry points;
//! * the `export_*` macros generating the actual FFI exports.
//!
//! ```rust,ignore
//! use kplug_sdk::{export_handler, export_plugin_alloc, Fields, FromPayload, Response, ValidationError};
//!
//! struct Ping { id: String }
//!
//! impl FromPayload for Ping {
//!     fn from_payload(fields: &Fields<'_>) -> Result<Self, ValidationError> {
//!         Ok(Ping { id: fields.required_str("id")?.to_string() })
//!     }
//! }
//!
//! fn pong(ping: Ping) -> Response<serde_json::Value> {
//!     Response::success(serde_json::json!({ "id": ping.id }))
//! }
//!
//! export_plugin_alloc!();
//! export_handler!(handle_ping, Ping, pong);
//! ```

pub mod arena;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod logging;
pub mod macros;
pub mod marshal;
pub mod memory;
pub mod payload;

pub use arena::{AllocError, Arena, ArenaConfig};
pub use context::{with_instance, GuestContext, InstanceMemory};
pub use dispatch::{handle_request, respond, respond_error};
pub use error::{ErrorKind, PluginError, Result, ValidationError};
pub use marshal::{decode_input, encode_output, read_output};
pub use memory::{LinearMemory, MemoryError, VecMemory, PAGE_SIZE};
pub use payload::{Fields, FromPayload};

#[cfg(target_arch = "wasm32")]
pub use memory::WasmMemory;

pub use kplug_types::{Greeting, PackedWord, Response, StatusReport};

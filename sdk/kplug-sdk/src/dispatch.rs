//! Shared plumbing for exported entry points.
//!
//! Every handler follows the same shape: decode the input buffer, build a
//! typed response, encode it into the arena and hand back a packed word.
//! Decode and validation failures become `{"status":"error"}` payloads; the
//! entry point never traps.

use crate::context::GuestContext;
use crate::error::PluginError;
use crate::marshal::{decode_input, encode_output};
use crate::memory::LinearMemory;
use crate::payload::{self, FromPayload};
use kplug_types::{PackedWord, Response};
use serde::Serialize;

/// Decode `(ptr, len)` into `Req`, run `handler` and encode what it returns.
pub fn handle_request<M, Req, T, F>(ctx: &mut GuestContext<M>, ptr: u64, len: u64, handler: F) -> PackedWord
where
    M: LinearMemory,
    Req: FromPayload,
    T: Serialize,
    F: FnOnce(Req) -> Response<T>,
{
    let request = decode_input(ctx.memory(), ptr, len).and_then(payload::decode::<Req>);
    match request {
        Ok(request) => respond(ctx, &handler(request)),
        Err(e) => {
            crate::warn!("rejecting request at {:#x}+{}: {:?}", ptr, len, e);
            respond_error(ctx, &e)
        }
    }
}

/// Encode `payload` into the arena.
///
/// An encode or allocation failure is turned into a structured error
/// response instead of being dropped.
pub fn respond<M, T>(ctx: &mut GuestContext<M>, payload: &T) -> PackedWord
where
    M: LinearMemory,
    T: Serialize + ?Sized,
{
    let bytes = match payload::encode(payload) {
        Ok(bytes) => bytes,
        Err(e) => {
            crate::error!("failed to encode response: {}", e);
            return respond_error(ctx, &e);
        }
    };
    match encode_output(ctx, &bytes) {
        Ok(word) => {
            crate::trace!("response of {} bytes at {}", bytes.len(), word);
            word
        }
        Err(e) => {
            crate::error!("cannot place {} byte response: {}", bytes.len(), e);
            respond_error(ctx, &PluginError::from(e))
        }
    }
}

/// Encode `{"status":"error","error":<err>}`.
///
/// Returns [`PackedWord::NULL`] if even that cannot be placed.
pub fn respond_error<M: LinearMemory>(ctx: &mut GuestContext<M>, err: &PluginError) -> PackedWord {
    let response: Response<()> = Response::error(err.to_string());
    let placed = payload::encode(&response).and_then(|bytes| encode_output(ctx, &bytes).map_err(PluginError::from));
    match placed {
        Ok(word) => word,
        Err(e) => {
            crate::error!("dropping {:?} error response: {}", err.kind(), e);
            PackedWord::NULL
        }
    }
}

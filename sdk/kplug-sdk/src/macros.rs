/// Macro to export the `allocate` and `deallocate` functions.
/// This is REQUIRED for the Host to write data into the Guest's linear memory.
///
/// Both are backed by the instance arena. `allocate` returns `0` when the
/// request cannot be satisfied; `deallocate` is advisory and never makes an
/// address reusable.
#[macro_export]
macro_rules! export_plugin_alloc {
    () => {
        #[no_mangle]
        pub extern "C" fn allocate(size: u32) -> u32 {
            $crate::with_instance(|ctx| ctx.allocate(size))
                .and_then(|result| result)
                .unwrap_or_else(|e| {
                    $crate::error!("allocate({}) failed: {}", size, e);
                    0
                })
        }

        #[no_mangle]
        pub extern "C" fn deallocate(ptr: u32, size: u32) {
            if let Err(e) = $crate::with_instance(|ctx| ctx.deallocate(ptr, size)) {
                $crate::error!("deallocate({:#x}, {}) failed: {}", ptr, size, e);
            }
        }
    };
}

/// Export a `(ptr: u64, len: u64) -> u64` entry point that decodes the input
/// as `$request` and answers with whatever `$handler` returns.
///
/// ```ignore
/// export_handler!(handle_k8s, GreetRequest, greet);
/// ```
#[macro_export]
macro_rules! export_handler {
    ($name:ident, $request:ty, $handler:path) => {
        #[no_mangle]
        pub extern "C" fn $name(ptr: u64, len: u64) -> u64 {
            $crate::with_instance(|ctx| $crate::handle_request::<_, $request, _, _>(ctx, ptr, len, $handler))
                .unwrap_or($crate::PackedWord::NULL)
                .into_raw()
        }
    };
}

/// Export a `() -> u64` entry point returning the payload built by `$builder`.
#[macro_export]
macro_rules! export_static {
    ($name:ident, $builder:path) => {
        #[no_mangle]
        pub extern "C" fn $name() -> u64 {
            $crate::with_instance(|ctx| $crate::respond(ctx, &$builder()))
                .unwrap_or($crate::PackedWord::NULL)
                .into_raw()
        }
    };
}

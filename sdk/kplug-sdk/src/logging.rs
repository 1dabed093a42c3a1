//! Wasm 插件日志功能
//!
//! 提供多级别日志宏。在 wasm32 上通过 Host 导入的 `env.log_*` 函数输出，
//! 与 Host 的 tracing 系统集成；原生构建（测试）直接输出到 `tracing`。

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

// Host 提供的日志函数声明
#[cfg(all(target_arch = "wasm32", feature = "host-log"))]
extern "C" {
    fn log_trace(ptr: *const u8, len: usize);
    fn log_debug(ptr: *const u8, len: usize);
    fn log_info(ptr: *const u8, len: usize);
    fn log_warn(ptr: *const u8, len: usize);
    fn log_error(ptr: *const u8, len: usize);
}

/// Emit one formatted message. Called by the level macros.
#[cfg(all(target_arch = "wasm32", feature = "host-log"))]
pub fn emit(level: Level, args: fmt::Arguments<'_>) {
    let msg = fmt::format(args);
    // Safety: the host only reads `len` bytes starting at `ptr` during the call.
    unsafe {
        match level {
            Level::Trace => log_trace(msg.as_ptr(), msg.len()),
            Level::Debug => log_debug(msg.as_ptr(), msg.len()),
            Level::Info => log_info(msg.as_ptr(), msg.len()),
            Level::Warn => log_warn(msg.as_ptr(), msg.len()),
            Level::Error => log_error(msg.as_ptr(), msg.len()),
        }
    }
}

#[cfg(all(target_arch = "wasm32", not(feature = "host-log")))]
pub fn emit(_level: Level, _args: fmt::Arguments<'_>) {}

#[cfg(not(target_arch = "wasm32"))]
pub fn emit(level: Level, args: fmt::Arguments<'_>) {
    match level {
        Level::Trace => tracing::trace!(target: "kplug::guest", "{}", args),
        Level::Debug => tracing::debug!(target: "kplug::guest", "{}", args),
        Level::Info => tracing::info!(target: "kplug::guest", "{}", args),
        Level::Warn => tracing::warn!(target: "kplug::guest", "{}", args),
        Level::Error => tracing::error!(target: "kplug::guest", "{}", args),
    }
}

/// TRACE 级别日志宏
///
/// 用于非常详细的追踪信息，通常只在开发环境启用
///
/// # 示例
/// ```ignore
/// trace!("allocate({}) -> {:#x}", size, ptr);
/// ```
#[macro_export]
macro_rules! trace {
    ($($arg:tt)*) => {
        $crate::logging::emit($crate::logging::Level::Trace, format_args!($($arg)*))
    };
}

/// DEBUG 级别日志宏
#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => {
        $crate::logging::emit($crate::logging::Level::Debug, format_args!($($arg)*))
    };
}

/// INFO 级别日志宏
///
/// 用于正常的运行时信息，记录重要的业务事件
#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => {
        $crate::logging::emit($crate::logging::Level::Info, format_args!($($arg)*))
    };
}

/// WARN 级别日志宏
///
/// 用于警告信息，表示潜在问题但不影响正常运行
#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {
        $crate::logging::emit($crate::logging::Level::Warn, format_args!($($arg)*))
    };
}

/// ERROR 级别日志宏
#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => {
        $crate::logging::emit($crate::logging::Level::Error, format_args!($($arg)*))
    };
}

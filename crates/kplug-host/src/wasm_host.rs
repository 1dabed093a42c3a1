use crate::config::LimitsConfig;
use anyhow::Result;
use wasmtime::{Caller, Config, Engine, Linker, Module, Store, StoreLimits, StoreLimitsBuilder};

/// Per-store data: which plugin runs in it and how much memory it may use.
pub struct HostState {
    pub plugin_id: String,
    limits: StoreLimits,
}

impl HostState {
    pub fn new(plugin_id: impl Into<String>, limits: &LimitsConfig) -> Self {
        Self {
            plugin_id: plugin_id.into(),
            limits: StoreLimitsBuilder::new()
                .memory_size(limits.max_memory_bytes as usize)
                .instances(1)
                .build(),
        }
    }
}

pub struct WasmHost {
    engine: Engine,
}

impl WasmHost {
    pub fn new() -> Result<Self> {
        let mut config = Config::new();

        // Safety: Optimization level
        config.cranelift_opt_level(wasmtime::OptLevel::Speed);

        let engine = Engine::new(&config)?;
        Ok(Self { engine })
    }

    pub fn load_module(&self, wasm_bytes: &[u8]) -> Result<Module> {
        Module::new(&self.engine, wasm_bytes)
    }

    /// prepare a fresh store for a new instance
    pub fn create_store(&self, plugin_id: &str, limits: &LimitsConfig) -> Store<HostState> {
        let mut store = Store::new(&self.engine, HostState::new(plugin_id, limits));
        store.limiter(|state| &mut state.limits);
        store
    }

    /// Linker with default imports (logging)
    pub fn create_linker(&self) -> Linker<HostState> {
        let mut linker = Linker::new(&self.engine);

        // 注册多级别日志函数
        Self::register_log_functions(&mut linker);

        linker
    }

    /// 注册所有日志级别的导入函数
    fn register_log_functions(linker: &mut Linker<HostState>) {
        // 使用宏减少重复代码
        macro_rules! register_log {
            ($name:literal, $level:expr) => {
                if let Err(e) = linker.func_wrap(
                    "env",
                    $name,
                    move |mut caller: Caller<'_, HostState>, ptr: i32, len: i32| {
                        Self::handle_log(&mut caller, ptr, len, $level);
                    },
                ) {
                    tracing::error!("Failed to register {}: {}", $name, e);
                }
            };
        }

        register_log!("log_trace", tracing::Level::TRACE);
        register_log!("log_debug", tracing::Level::DEBUG);
        register_log!("log_info", tracing::Level::INFO);
        register_log!("log_warn", tracing::Level::WARN);
        register_log!("log_error", tracing::Level::ERROR);
    }

    /// 处理来自 Wasm 插件的日志调用
    fn handle_log(caller: &mut Caller<'_, HostState>, ptr: i32, len: i32, level: tracing::Level) {
        const MAX_LOG_LEN: usize = 4096; // 防止超大日志

        // 1. 获取 Wasm 线性内存
        let memory = match caller.get_export(kplug_types::MEMORY_EXPORT) {
            Some(wasmtime::Extern::Memory(mem)) => mem,
            _ => {
                tracing::error!("Wasm plugin: failed to get memory export");
                return;
            }
        };

        // 2. 限制日志长度
        let len = (len as u32 as usize).min(MAX_LOG_LEN);
        if len == 0 {
            return;
        }

        // 3. 读取内存中的字符串
        let plugin = caller.data().plugin_id.clone();
        let data = memory.data(&*caller);
        let start = ptr as u32 as usize;
        let slice = match data.get(start..start + len) {
            Some(s) => s,
            None => {
                tracing::error!(
                    "Invalid memory range in plugin log: plugin={}, ptr={:#x}, len={}, memory_size={}",
                    plugin,
                    start,
                    len,
                    data.len()
                );
                return;
            }
        };

        // 4. 验证 UTF-8 并输出日志
        match std::str::from_utf8(slice) {
            Ok(msg) => match level {
                tracing::Level::TRACE => tracing::trace!(target: "wasm_plugin", plugin = %plugin, "{}", msg),
                tracing::Level::DEBUG => tracing::debug!(target: "wasm_plugin", plugin = %plugin, "{}", msg),
                tracing::Level::WARN => tracing::warn!(target: "wasm_plugin", plugin = %plugin, "{}", msg),
                tracing::Level::ERROR => tracing::error!(target: "wasm_plugin", plugin = %plugin, "{}", msg),
                _ => tracing::info!(target: "wasm_plugin", plugin = %plugin, "{}", msg),
            },
            Err(e) => {
                tracing::warn!("Invalid UTF-8 in plugin log (plugin={}, len={}): {}", plugin, len, e);
            }
        }
    }
}

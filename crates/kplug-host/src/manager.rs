use crate::config::LimitsConfig;
use crate::memory::{read_word_from_wasm, write_bytes_to_wasm};
use crate::wasm_host::{HostState, WasmHost};
use anyhow::{anyhow, Context, Result};
use kplug_types::{PackedWord, ALLOCATE_EXPORT, DEALLOCATE_EXPORT, MEMORY_EXPORT};
use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;
use wasmtime::{Instance, Memory, Store, TypedFunc};

pub struct PluginManager {
    host: WasmHost,
    limits: LimitsConfig,
    // 每个插件一个实例（一个 Store、一个 arena），调用在写锁下串行执行
    instances: RwLock<HashMap<String, PluginInstance>>,
}

struct PluginInstance {
    store: Store<HostState>,
    instance: Instance,
}

/// Exports every kplug guest must provide.
struct GuestAbi {
    alloc_fn: TypedFunc<u32, u32>,
    dealloc_fn: TypedFunc<(u32, u32), ()>,
    memory: Memory,
}

impl PluginInstance {
    fn abi(&mut self) -> Result<GuestAbi> {
        let alloc_fn = self
            .instance
            .get_typed_func::<u32, u32>(&mut self.store, ALLOCATE_EXPORT)
            .context(format!("Plugin must export '{}' function", ALLOCATE_EXPORT))?;

        let dealloc_fn = self
            .instance
            .get_typed_func::<(u32, u32), ()>(&mut self.store, DEALLOCATE_EXPORT)
            .context(format!("Plugin must export '{}' function", DEALLOCATE_EXPORT))?;

        let memory = self
            .instance
            .get_memory(&mut self.store, MEMORY_EXPORT)
            .context(format!("Plugin must export '{}'", MEMORY_EXPORT))?;

        Ok(GuestAbi {
            alloc_fn,
            dealloc_fn,
            memory,
        })
    }

    /// Read the response the word points at, then hand the buffer back.
    fn collect(&mut self, abi: &GuestAbi, word: PackedWord, max_output: u64) -> Result<Vec<u8>> {
        let output = read_word_from_wasm(&abi.memory, &self.store, word, max_output)?;
        if let Err(e) = abi.dealloc_fn.call(&mut self.store, (word.ptr(), word.len())) {
            tracing::warn!("Failed to deallocate guest response {}: {}", word, e);
        }
        Ok(output)
    }
}

impl PluginManager {
    pub fn new(limits: LimitsConfig) -> Result<Self> {
        Ok(Self {
            host: WasmHost::new()?,
            limits,
            instances: RwLock::new(HashMap::new()),
        })
    }

    pub fn load_plugin(&self, plugin_id: &str, wasm_bytes: &[u8]) -> Result<()> {
        let module = self.host.load_module(wasm_bytes)?;
        let linker = self.host.create_linker();
        let mut store = self.host.create_store(plugin_id, &self.limits);

        let instance = linker
            .instantiate(&mut store, &module)
            .context("Failed to instantiate plugin")?;

        let plugin_instance = PluginInstance { store, instance };

        // 获取写锁，如果锁被污染则返回错误
        let mut instances = self
            .instances
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;
        if instances.insert(plugin_id.to_string(), plugin_instance).is_some() {
            tracing::info!("Replaced plugin instance: {}", plugin_id);
        } else {
            tracing::info!("Loaded plugin: {}", plugin_id);
        }
        Ok(())
    }

    pub fn load_plugin_file<P: AsRef<Path>>(&self, plugin_id: &str, path: P) -> Result<()> {
        let path = path.as_ref();
        let wasm_bytes = std::fs::read(path).context(format!("Failed to read plugin from {:?}", path))?;
        self.load_plugin(plugin_id, &wasm_bytes)
    }

    /// Drop a plugin instance together with its memory.
    pub fn unload_plugin(&self, plugin_id: &str) -> Result<bool> {
        let mut instances = self
            .instances
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;
        Ok(instances.remove(plugin_id).is_some())
    }

    pub fn plugin_ids(&self) -> Result<Vec<String>> {
        let instances = self
            .instances
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;
        let mut ids: Vec<String> = instances.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }

    /// Call a `(ptr: u64, len: u64) -> u64` export with `input` and return
    /// the response bytes.
    pub fn call(&self, plugin_id: &str, function_name: &str, input: &[u8]) -> Result<Vec<u8>> {
        if input.len() as u64 > self.limits.max_input_bytes {
            return Err(anyhow!(
                "Input of {} bytes exceeds max_input_bytes ({})",
                input.len(),
                self.limits.max_input_bytes
            ));
        }

        let mut map = self
            .instances
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;
        let plugin = map
            .get_mut(plugin_id)
            .ok_or_else(|| anyhow!("Plugin not found: {}", plugin_id))?;

        // 1. Get exports
        let abi = plugin.abi()?;
        let target_fn = plugin
            .instance
            .get_typed_func::<(u64, u64), u64>(&mut plugin.store, function_name)
            .context(format!("Plugin must export '{}' function", function_name))?;

        // 2. Write input to Wasm memory
        let (ptr, len) = write_bytes_to_wasm(&abi.memory, &mut plugin.store, &abi.alloc_fn, &abi.dealloc_fn, input)?;

        // 3. Call the function
        let result = target_fn.call(&mut plugin.store, (ptr as u64, len as u64));

        // 4. 释放输入缓冲区（无论函数调用成功与否）
        if let Err(e) = abi.dealloc_fn.call(&mut plugin.store, (ptr, len)) {
            tracing::warn!("Failed to deallocate guest input {:#x}+{}: {}", ptr, len, e);
        }

        let word = PackedWord::from_raw(result.context(format!("Plugin call '{}' trapped", function_name))?);
        tracing::debug!("{}::{} returned {}", plugin_id, function_name, word);

        // 5. 读取输出并交还给 Guest
        plugin.collect(&abi, word, self.limits.max_output_bytes)
    }

    /// Call a `() -> u64` export and return the response bytes.
    pub fn status(&self, plugin_id: &str, function_name: &str) -> Result<Vec<u8>> {
        let mut map = self
            .instances
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;
        let plugin = map
            .get_mut(plugin_id)
            .ok_or_else(|| anyhow!("Plugin not found: {}", plugin_id))?;

        let abi = plugin.abi()?;
        let target_fn = plugin
            .instance
            .get_typed_func::<(), u64>(&mut plugin.store, function_name)
            .context(format!("Plugin must export '{}' function", function_name))?;

        let word = PackedWord::from_raw(
            target_fn
                .call(&mut plugin.store, ())
                .context(format!("Plugin call '{}' trapped", function_name))?,
        );
        plugin.collect(&abi, word, self.limits.max_output_bytes)
    }

    /// [`call`](Self::call) with JSON in and out.
    pub fn call_json(&self, plugin_id: &str, function_name: &str, input: &serde_json::Value) -> Result<serde_json::Value> {
        let output = self.call(plugin_id, function_name, &serde_json::to_vec(input)?)?;
        serde_json::from_slice(&output).context("Plugin returned invalid JSON")
    }
}

use anyhow::{anyhow, Result};
use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;
use std::path::Path;

/// Host 运行配置
#[derive(Debug, Deserialize, Clone, Default)]
pub struct HostConfig {
    #[serde(default)]
    pub plugin: PluginConfig,
    #[serde(default)]
    pub entry: EntryConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PluginConfig {
    #[serde(default = "default_plugin_id")]
    pub id: String,
    /// 插件 .wasm 文件路径
    #[serde(default = "default_plugin_path")]
    pub path: String,
}

/// Export names the runner invokes. These are configuration, not routing:
/// the runner calls exactly the export it is told to.
#[derive(Debug, Deserialize, Clone)]
pub struct EntryConfig {
    #[serde(default = "default_primary_entry")]
    pub primary: String,
    #[serde(default = "default_status_entry")]
    pub status: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LimitsConfig {
    /// Wasm 线性内存上限（字节）
    #[serde(default = "default_max_memory_bytes")]
    pub max_memory_bytes: u64,
    #[serde(default = "default_max_input_bytes")]
    pub max_input_bytes: u64,
    #[serde(default = "default_max_output_bytes")]
    pub max_output_bytes: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

// 默认值函数
fn default_plugin_id() -> String {
    "k8s-get".to_string()
}

fn default_plugin_path() -> String {
    "target/wasm32-unknown-unknown/release/k8s_get.wasm".to_string()
}

fn default_primary_entry() -> String {
    kplug_types::PRIMARY_ENTRY.to_string()
}

fn default_status_entry() -> String {
    kplug_types::STATUS_ENTRY.to_string()
}

fn default_max_memory_bytes() -> u64 {
    64 * 1024 * 1024
}

fn default_max_input_bytes() -> u64 {
    1024 * 1024
}

fn default_max_output_bytes() -> u64 {
    4 * 1024 * 1024
}

fn default_log_level() -> String {
    "info".to_string()
}

// Default trait 实现
impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            id: default_plugin_id(),
            path: default_plugin_path(),
        }
    }
}

impl Default for EntryConfig {
    fn default() -> Self {
        Self {
            primary: default_primary_entry(),
            status: default_status_entry(),
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_memory_bytes: default_max_memory_bytes(),
            max_input_bytes: default_max_input_bytes(),
            max_output_bytes: default_max_output_bytes(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl HostConfig {
    /// 加载配置：TOML 文件（可选）+ `KPLUG_` 环境变量覆盖
    ///
    /// A missing file is not an error; the defaults apply. Nested keys use a
    /// double underscore, e.g. `KPLUG_LIMITS__MAX_INPUT_BYTES=4096`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut builder = Config::builder();

        if path.exists() {
            builder = builder.add_source(File::new(
                path.to_str().ok_or_else(|| anyhow!("Invalid config path"))?,
                FileFormat::Toml,
            ));
        }

        let config = builder
            .add_source(
                Environment::with_prefix("KPLUG")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let host_config: HostConfig = config.try_deserialize()?;
        host_config.validate()?;
        Ok(host_config)
    }

    /// 验证配置
    pub fn validate(&self) -> Result<()> {
        if self.plugin.id.is_empty() {
            return Err(anyhow!("plugin.id must not be empty"));
        }
        if self.entry.primary.is_empty() || self.entry.status.is_empty() {
            return Err(anyhow!("entry names must not be empty"));
        }
        if self.limits.max_memory_bytes == 0 {
            return Err(anyhow!("max_memory_bytes must be greater than 0"));
        }
        if self.limits.max_input_bytes == 0 || self.limits.max_input_bytes > u32::MAX as u64 {
            return Err(anyhow!(
                "max_input_bytes ({}) must be between 1 and {}",
                self.limits.max_input_bytes,
                u32::MAX
            ));
        }
        if self.limits.max_output_bytes == 0 {
            return Err(anyhow!("max_output_bytes must be greater than 0"));
        }
        Ok(())
    }
}

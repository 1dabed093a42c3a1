use kplug_host::{LimitsConfig, PluginManager};
use serde_json::{json, Value};
use std::path::PathBuf;

const STATUS_JSON: &str = r#"{"status":"healthy","plugin":"wat-echo","version":"0.0.1","endpoints":["/echo"]}"#;

/// 手写的 WAT 插件：实现与 kplug guest 相同的 ABI
fn echo_plugin_wat() -> String {
    let escaped = STATUS_JSON.replace('"', "\\\"");
    format!(
        r#"(module
  (import "env" "log_info" (func $log_info (param i32 i32)))
  (import "env" "log_warn" (func $log_warn (param i32 i32)))
  (memory (export "memory") 1)
  (global $next (mut i32) (i32.const 4096))
  (data (i32.const 16) "{escaped}")
  (func (export "allocate") (param $size i32) (result i32)
    (local $ptr i32)
    (local.set $ptr (global.get $next))
    (global.set $next (i32.add (global.get $next) (local.get $size)))
    (local.get $ptr))
  (func (export "deallocate") (param i32 i32))
  (func (export "handle_echo") (param $ptr i64) (param $len i64) (result i64)
    (i64.or (i64.shl (local.get $ptr) (i64.const 32)) (local.get $len)))
  (func (export "handle_status") (result i64)
    (call $log_info (i32.const 16) (i32.const 18))
    (call $log_warn (i32.const -256) (i32.const 100))
    (i64.or (i64.shl (i64.const 16) (i64.const 32)) (i64.const {len})))
  (func (export "handle_null") (param i64 i64) (result i64)
    (i64.const 0))
  (func (export "handle_huge") (param i64 i64) (result i64)
    (i64.or (i64.shl (i64.const 16) (i64.const 32)) (i64.const 4096)))
  (func (export "handle_trap") (param i64 i64) (result i64)
    unreachable)
)"#,
        escaped = escaped,
        len = STATUS_JSON.len()
    )
}

fn echo_manager(limits: LimitsConfig) -> PluginManager {
    let manager = PluginManager::new(limits).unwrap();
    manager
        .load_plugin("echo", echo_plugin_wat().as_bytes())
        .unwrap();
    manager
}

#[test]
fn test_call_round_trips_bytes() {
    let manager = echo_manager(LimitsConfig::default());

    let output = manager.call("echo", "handle_echo", br#"{"name":"World"}"#).unwrap();
    assert_eq!(output, br#"{"name":"World"}"#);

    // 空输入同样合法
    let output = manager.call("echo", "handle_echo", b"").unwrap();
    assert!(output.is_empty());
}

#[test]
fn test_call_json() {
    let manager = echo_manager(LimitsConfig::default());
    let value = manager
        .call_json("echo", "handle_echo", &json!({"name": "World"}))
        .unwrap();
    assert_eq!(value, json!({"name": "World"}));
}

#[test]
fn test_status_reads_static_payload() {
    let manager = echo_manager(LimitsConfig::default());

    let first: Value = serde_json::from_slice(&manager.status("echo", "handle_status").unwrap()).unwrap();
    let second: Value = serde_json::from_slice(&manager.status("echo", "handle_status").unwrap()).unwrap();
    assert_eq!(first, second);
    assert_eq!(first["status"], "healthy");
    assert_eq!(first["endpoints"], json!(["/echo"]));
}

#[test]
fn test_null_word_is_an_error() {
    let manager = echo_manager(LimitsConfig::default());
    let err = manager.call("echo", "handle_null", b"{}").unwrap_err();
    assert!(err.to_string().contains("unusable buffer"));
}

#[test]
fn test_output_limit() {
    let limits = LimitsConfig {
        max_output_bytes: 1024,
        ..LimitsConfig::default()
    };
    let manager = echo_manager(limits);
    let err = manager.call("echo", "handle_huge", b"{}").unwrap_err();
    assert!(err.to_string().contains("max_output_bytes"));
}

#[test]
fn test_trap_is_reported() {
    let manager = echo_manager(LimitsConfig::default());
    let err = manager.call("echo", "handle_trap", b"{}").unwrap_err();
    assert!(err.to_string().contains("trapped"));
}

#[test]
fn test_missing_export() {
    let manager = echo_manager(LimitsConfig::default());
    let err = manager.call("echo", "nonexistent_func", b"{}").unwrap_err();
    assert!(err.to_string().contains("must export"));

    // 签名不匹配同样视为缺少导出
    let err = manager.status("echo", "handle_echo").unwrap_err();
    assert!(err.to_string().contains("must export"));
}

#[test]
fn test_memory_limit_blocks_instantiation() {
    let limits = LimitsConfig {
        max_memory_bytes: 1024,
        ..LimitsConfig::default()
    };
    let manager = PluginManager::new(limits).unwrap();
    assert!(manager.load_plugin("echo", echo_plugin_wat().as_bytes()).is_err());
}

#[test]
fn test_load_and_unload() {
    let manager = echo_manager(LimitsConfig::default());
    manager
        .load_plugin("echo2", echo_plugin_wat().as_bytes())
        .unwrap();
    assert_eq!(manager.plugin_ids().unwrap(), vec!["echo", "echo2"]);

    assert!(manager.unload_plugin("echo").unwrap());
    assert!(!manager.unload_plugin("echo").unwrap());
    assert!(manager.call("echo", "handle_echo", b"{}").is_err());
    assert!(manager.call("echo2", "handle_echo", b"{}").is_ok());
}

/// `allocate` 返回越界地址；`deallocate` 把收到的参数记录在地址 8
const BAD_ALLOC_WAT: &str = r#"(module
  (memory (export "memory") 1)
  (func (export "allocate") (param i32) (result i32)
    (i32.const 0x20000))
  (func (export "deallocate") (param $ptr i32) (param $size i32)
    (i32.store (i32.const 8) (local.get $ptr))
    (i32.store (i32.const 12) (local.get $size)))
  (func (export "last_dealloc") (result i64)
    (i64.or (i64.shl (i64.const 8) (i64.const 32)) (i64.const 8)))
  (func (export "handle_echo") (param i64 i64) (result i64)
    (i64.const 0))
)"#;

#[test]
fn test_failed_input_write_releases_buffer() {
    let manager = PluginManager::new(LimitsConfig::default()).unwrap();
    manager.load_plugin("bad", BAD_ALLOC_WAT.as_bytes()).unwrap();

    let err = manager.call("bad", "handle_echo", b"{}").unwrap_err();
    assert!(err.to_string().contains("Failed to write"));

    let record = manager.status("bad", "last_dealloc").unwrap();
    assert_eq!(&record[0..4], &0x20000u32.to_le_bytes());
    assert_eq!(&record[4..8], &2u32.to_le_bytes());
}

fn k8s_plugin_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../target/wasm32-unknown-unknown/release/k8s_get.wasm")
}

/// 需要先构建：cargo build -p k8s-get --target wasm32-unknown-unknown --release
#[test]
fn test_k8s_plugin_end_to_end() {
    let path = k8s_plugin_path();
    if !path.exists() {
        eprintln!("Skipping test: k8s_get.wasm not found at {:?}", path);
        return;
    }

    let manager = PluginManager::new(LimitsConfig::default()).unwrap();
    manager.load_plugin_file("k8s-get", &path).unwrap();

    let value = manager
        .call_json("k8s-get", "handle_k8s", &json!({"name": "World"}))
        .unwrap();
    assert_eq!(
        value,
        json!({"status": "success", "message": "Hello World!", "name": "World"})
    );

    let value = manager.call_json("k8s-get", "handle_k8s", &json!({})).unwrap();
    assert_eq!(value, json!({"status": "error", "error": "Missing 'name' parameter"}));

    let value = manager.call_json("k8s-get", "handle_k8s", &json!({"name": 5})).unwrap();
    assert_eq!(value, json!({"status": "error", "error": "Name must be a string"}));

    let output = manager.call("k8s-get", "handle_k8s", b"{\"name\":").unwrap();
    let value: Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(value, json!({"status": "error", "error": "Invalid JSON input"}));

    let status: Value = serde_json::from_slice(&manager.status("k8s-get", "handle_status").unwrap()).unwrap();
    assert_eq!(status["status"], "healthy");
    assert_eq!(status["plugin"], "k8s-get");
    assert_eq!(status["endpoints"], json!(["/k8s"]));
}

/// 同一实例上的累计请求量可以超过初始预留的 arena
#[test]
fn test_k8s_plugin_serves_large_requests_repeatedly() {
    let path = k8s_plugin_path();
    if !path.exists() {
        eprintln!("Skipping test: k8s_get.wasm not found at {:?}", path);
        return;
    }

    let manager = PluginManager::new(LimitsConfig::default()).unwrap();
    manager.load_plugin_file("k8s-get", &path).unwrap();

    let name = "k".repeat(100_000);
    for _ in 0..12 {
        let value = manager
            .call_json("k8s-get", "handle_k8s", &json!({ "name": name }))
            .unwrap();
        assert_eq!(value["status"], "success");
        assert_eq!(value["name"].as_str().map(str::len), Some(name.len()));
    }
}

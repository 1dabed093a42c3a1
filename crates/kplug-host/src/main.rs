use anyhow::Result;
use clap::{Parser, Subcommand};
use kplug_host::{HostConfig, PluginManager};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Config file path
    #[arg(short, long, default_value = "kplug.toml")]
    config: String,

    /// Override the plugin .wasm path from the config
    #[arg(short, long)]
    plugin: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Invoke the primary entry point with a JSON request
    Call {
        /// Request payload, e.g. '{"name":"World"}'
        input: String,
    },
    /// Invoke the status entry point
    Status,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let mut config = HostConfig::load(&args.config)?;
    if let Some(path) = args.plugin {
        config.plugin.path = path;
    }

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!("Loading plugin {} from {}", config.plugin.id, config.plugin.path);
    let manager = PluginManager::new(config.limits.clone())?;
    manager.load_plugin_file(&config.plugin.id, &config.plugin.path)?;

    let output = match args.command {
        Command::Call { input } => manager.call(&config.plugin.id, &config.entry.primary, input.as_bytes())?,
        Command::Status => manager.status(&config.plugin.id, &config.entry.status)?,
    };

    // 能解析为 JSON 时格式化输出
    match serde_json::from_slice::<serde_json::Value>(&output) {
        Ok(value) => println!("{}", serde_json::to_string_pretty(&value)?),
        Err(_) => println!("{}", String::from_utf8_lossy(&output)),
    }
    Ok(())
}

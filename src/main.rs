mod config;
mod dashboard;
mod rpc;

use std::{fs, io, path::PathBuf, sync::Arc};

use anyhow::{Context, anyhow};
use clap::{Parser, Subcommand};
use ftail::Ftail;
use log::info;

use config::AppConfig;
use logstash_mcp::{HttpClient, LogstashApi, ToolRegistry};

#[derive(Parser)]
#[command(name = "logstash-mcp", version, about = "MCP server for the Logstash monitoring API")]
struct Cli {
    /// Config file (default: <config dir>/logstash-mcp/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Speak MCP over stdin/stdout (default)
    Serve,
    /// Serve the browser dashboard
    Dashboard {
        /// Listen address, overrides `dashboard_addr`
        #[arg(long)]
        addr: Option<String>,
    },
    /// Print the tool catalog and exit
    Tools,
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = config::load(cli.config.as_deref())?;
    init_logging(&config)?;

    let client = HttpClient::new(config.base_url.clone(), config.timeout())?;
    let mut registry = ToolRegistry::new(config.thresholds.clone());
    if config.allow_reload {
        registry = registry.with_management();
    }

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            print_banner(&config, &registry);
            info!("[main] serving MCP on stdio against {}", config.base_url);
            rpc::serve(io::stdin().lock(), io::stdout().lock(), &registry, &client)
        }
        Command::Dashboard { addr } => {
            let addr = addr.unwrap_or_else(|| config.dashboard_addr.clone());
            // Dropped after `runtime`.
            let api: Arc<dyn LogstashApi> = Arc::new(client);
            let runtime = tokio::runtime::Runtime::new().context("starting tokio runtime")?;
            eprintln!("Logstash MCP dashboard on http://{addr} (Logstash: {})", config.base_url);
            runtime.block_on(dashboard::serve(&addr, dashboard::router(registry, api.clone())))
        }
        Command::Tools => {
            for def in registry.defs() {
                println!("{:<30} {}", def.name, def.description);
            }
            Ok(())
        }
    }
}

fn init_logging(config: &AppConfig) -> anyhow::Result<()> {
    let level = config.level_filter()?;
    fs::create_dir_all(&config.log_dir)
        .with_context(|| format!("creating log dir {}", config.log_dir.display()))?;

    Ftail::new()
        .single_file(&config.log_dir.join("logstash-mcp.log"), true, level)
        .init()
        .map_err(|e| anyhow!("initializing logger: {e:?}"))
}

/// stdout carries JSON-RPC, so the banner goes to stderr.
fn print_banner(config: &AppConfig, registry: &ToolRegistry) {
    eprintln!("Logstash MCP server");
    eprintln!("  Logstash API base: {}", config.base_url);
    eprintln!("  Transport: JSON-RPC 2.0 over stdin/stdout");
    eprintln!("  Tools ({}):", registry.defs().len());
    for name in registry.names() {
        eprintln!("    - {name}");
    }
    eprintln!();
    eprintln!("Start a session with:");
    eprintln!(
        r#"{{"jsonrpc": "2.0", "id": 0, "method": "initialize", "params": {{"protocolVersion": "{}", "capabilities": {{}}, "clientInfo": {{"name": "test-client", "version": "1.0.0"}}}}}}"#,
        rpc::PROTOCOL_VERSION
    );
}

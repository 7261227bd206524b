//! `hdx-mcp`: list, inspect, and invoke HDX tools from the command line.

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};
use hdx_mcp_server::prompts::{get_prompt, list_prompts};
use hdx_mcp_server::{Gateway, ServerConfig};
use serde_json::{Value, json};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "hdx-mcp", version, about = "HDX Humanitarian API tool gateway")]
struct Cli {
    /// Debug-level logging unless RUST_LOG says otherwise.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Print the advertised tool surface as JSON.
    Tools,

    /// Invoke one tool and print its result envelope.
    Call {
        tool: String,

        /// Arguments as a JSON object.
        #[arg(long, default_value = "{}")]
        args: String,

        /// Print the protocol tool result (content, structuredContent, isError) instead.
        #[arg(long)]
        protocol: bool,
    },

    /// List the guidance prompts.
    Prompts,

    /// Print one guidance prompt.
    Prompt { name: String },
}

fn init_tracing(verbose: bool, format: LogFormat) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "hdx_mcp_server={default_level},hdx_openapi_tools={default_level},hdx_http_tools={default_level}"
        )
        .into()
    });

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init(),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_format);

    if let Err(e) = run(cli.command).await {
        eprintln!("fatal: {e:#}");
        std::process::exit(1);
    }
}

async fn run(command: Command) -> anyhow::Result<()> {
    match command {
        Command::Prompts => {
            let listing: Vec<Value> = list_prompts()
                .iter()
                .map(|p| json!({"name": p.name, "description": p.description}))
                .collect();
            println!("{}", serde_json::to_string_pretty(&listing)?);
        }
        Command::Prompt { name } => {
            let prompt = get_prompt(&name).with_context(|| format!("unknown prompt '{name}'"))?;
            println!("{}", prompt.text);
        }
        Command::Tools => {
            let gateway = start().await?;
            println!("{}", serde_json::to_string_pretty(&gateway.list_tools())?);
        }
        Command::Call {
            tool,
            args,
            protocol,
        } => {
            let args: Value =
                serde_json::from_str(&args).context("--args must be a JSON object")?;
            let gateway = start().await?;
            if protocol {
                let result = gateway.call_tool_result(&tool, args).await;
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                let envelope = gateway.call_tool(&tool, args).await;
                println!("{}", serde_json::to_string_pretty(&envelope)?);
            }
        }
    }
    Ok(())
}

async fn start() -> anyhow::Result<Gateway> {
    let config = ServerConfig::from_env().context("invalid configuration")?;
    tracing::info!(base_url = %config.base_url, spec = %config.openapi_url, "starting");
    Gateway::bootstrap(&config)
        .await
        .context("failed to initialise the tool gateway")
}

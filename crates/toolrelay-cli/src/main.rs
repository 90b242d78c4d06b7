mod app;
mod chat;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use toolrelay_core::tools::management_tools;
use toolrelay_core::{ConfigProvider, ProviderSpec, RefreshReport};

use app::{ConfigSources, Relay};

#[derive(Parser)]
#[command(name = "toolrelay", about = "Chat with a model that can use MCP tool providers")]
struct Cli {
    /// Config file (default: user config overlaid with ./.config/toolrelay/config.yaml)
    #[arg(long, global = true, env = "TOOLRELAY_CONFIG")]
    config: Option<PathBuf>,

    /// Use the echoing mock model; no API key needed
    #[arg(long, global = true)]
    mock: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive chat with the configured providers
    Chat {
        /// Conversation thread id
        #[arg(short, long, default_value = "default")]
        thread: String,

        /// Model override (e.g. "openai/gpt-4o")
        #[arg(short, long)]
        model: Option<String>,
    },
    /// Edit the configured tool providers
    Providers {
        #[command(subcommand)]
        action: ProvidersCommand,
    },
    /// Start the providers and print the merged tool catalog
    Tools,
}

#[derive(Subcommand)]
enum ProvidersCommand {
    /// List configured providers
    List,
    /// Add a provider: toolrelay providers add calc npx -- -y @acme/calc-server
    Add {
        name: String,
        command: String,
        /// Arguments passed to the command
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
        /// Extra environment for the provider, KEY=VALUE (repeatable)
        #[arg(short, long = "env", value_parser = parse_env)]
        env: Vec<(String, String)>,
    },
    /// Remove a provider
    Remove { name: String },
}

fn parse_env(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{raw}'")),
    }
}

fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run(cli))
}

async fn run(cli: Cli) -> Result<()> {
    let sources = ConfigSources::discover(cli.config)?;
    tracing::debug!(path = %sources.target().path().display(), "Using config");

    match cli.command {
        Commands::Chat { thread, model } => chat::run_chat(&sources, thread, model, cli.mock).await,
        Commands::Providers { action } => run_providers(&sources, action).await,
        Commands::Tools => run_tools(&sources, cli.mock).await,
    }
}

async fn run_providers(sources: &ConfigSources, action: ProvidersCommand) -> Result<()> {
    match action {
        ProvidersCommand::List => {
            let providers = sources.providers().await;
            if providers.is_empty() {
                println!("No providers configured.");
            }
            for spec in providers {
                println!("{:<16} {} {}", spec.name, spec.command, spec.args.join(" "));
            }
        }
        ProvidersCommand::Add {
            name,
            command,
            args,
            env,
        } => {
            let mut spec = ProviderSpec::new(&name, command).with_args(args);
            for (key, value) in env {
                spec = spec.with_env(key, value);
            }
            let target = sources.target();
            target
                .add_provider(spec)
                .await
                .with_context(|| format!("Failed to add provider '{name}'"))?;
            println!("Provider '{name}' added to {}", target.path().display());
        }
        ProvidersCommand::Remove { name } => {
            let target = sources.target();
            target
                .remove_provider(&name)
                .await
                .with_context(|| format!("Failed to remove provider '{name}'"))?;
            println!("Provider '{name}' removed from {}", target.path().display());
        }
    }
    Ok(())
}

async fn run_tools(sources: &ConfigSources, mock: bool) -> Result<()> {
    let relay = Relay::start(sources, mock).await?;
    let report = relay.catalog.refresh().await;

    for entry in relay.catalog.entries() {
        println!(
            "{:<24} {:<16} {}",
            entry.tool_name, entry.provider_name, entry.descriptor.description
        );
    }
    for tool in management_tools() {
        println!("{:<24} {:<16} {}", tool.name, "(built-in)", tool.description);
    }
    print_report(&report);

    relay.shutdown().await;
    Ok(())
}

fn print_report(report: &RefreshReport) {
    println!("\n{} provider tool(s) routed", report.routed);
    for failure in &report.failures {
        println!("  failed:      {}: {}", failure.provider, failure.error);
    }
    for tool in &report.quarantined {
        println!("  quarantined: {}/{}: {}", tool.provider, tool.tool, tool.reason);
    }
    for collision in &report.collisions {
        println!(
            "  collision:   {} kept by {}, dropped from {}",
            collision.tool, collision.kept, collision.dropped
        );
    }
}

//! CLI entry point for cbt-assistant

use anyhow::Result;
use cbt_assistant_agent::{ChatOrchestrator, OrchestratorSettings};
use cbt_assistant_core::config::{Config, ConfigLoader};
use cbt_assistant_core::logging::init_logging;
use cbt_assistant_core::CbtEvaluation;
use cbt_assistant_manager::{run_server, AppState, Manager, SessionLimits};
use cbt_assistant_providers::{LLMProvider, OllamaClient};
use clap::{Parser, Subcommand};
use console::style;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{broadcast, mpsc};
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "cbt-assistant")]
#[command(about = "A CBT-style reflective chat assistant backed by a local LLM")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration directory
    #[arg(short, long, global = true)]
    config_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API
    Serve {
        /// Override the bind host
        #[arg(long)]
        host: Option<String>,
        /// Override the bind port
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Chat from the terminal
    Chat {
        /// Send one message and exit; omit for an interactive session
        #[arg(short, long)]
        message: Option<String>,
    },
    /// Show the effective configuration
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is normal.
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    let config_loader = match cli.config_dir {
        Some(dir) => ConfigLoader::with_dir(dir),
        None => ConfigLoader::new(),
    };
    let config = config_loader.load()?;
    let _log_guard = init_logging(&config.logging);

    match cli.command {
        Commands::Serve { host, port } => {
            info!("Starting API server");
            run_serve(config, host, port).await?;
        }
        Commands::Chat { message } => {
            info!("Starting terminal chat");
            run_chat(&config, message).await?;
        }
        Commands::Status => {
            run_status(&config_loader, &config);
        }
    }

    Ok(())
}

fn build_provider(config: &Config) -> Arc<dyn LLMProvider> {
    Arc::new(
        OllamaClient::new(
            Some(config.provider.api_base.clone()),
            config.provider.model.clone(),
        )
        .with_temperature(config.provider.temperature),
    )
}

async fn run_serve(mut config: Config, host: Option<String>, port: Option<u16>) -> Result<()> {
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    println!(
        "{}",
        style(format!("Starting {} v{}", config.app.name, config.app.version))
            .bold()
            .cyan()
    );
    println!("Model: {}", config.provider.model);
    println!("Ollama: {}", config.provider.api_base);
    println!("Address: http://{}", config.server.bind_address());

    let (api_tx, api_rx) = mpsc::channel(64);
    let manager = Manager::new(
        api_rx,
        build_provider(&config),
        config.agent.system_prompt.clone(),
        OrchestratorSettings::from_config(&config),
    )
    .with_limits(SessionLimits::from_config(&config.server));
    let manager_handle = tokio::spawn(async move {
        if let Err(e) = manager.run().await {
            error!("Manager loop error: {}", e);
        }
    });

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            println!("\n{}", style("Shutting down...").yellow());
            let _ = shutdown_tx.send(());
        }
    });

    let state = AppState::new(api_tx, config.app.clone());
    run_server(state, &config.server, shutdown_rx).await?;

    manager_handle.abort();
    let _ = manager_handle.await;

    println!("{}", style("Server stopped.").green());
    Ok(())
}

async fn run_chat(config: &Config, message: Option<String>) -> Result<()> {
    let mut orchestrator = ChatOrchestrator::new(
        build_provider(config),
        config.agent.system_prompt.clone(),
        OrchestratorSettings::from_config(config),
    );

    if let Some(message) = message {
        return chat_turn(&mut orchestrator, message).await;
    }

    println!(
        "{}",
        style("Type a message. /reset starts over, /quit exits.").dim()
    );
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        match line {
            "" => continue,
            "/quit" | "/exit" => break,
            "/reset" => {
                orchestrator.reset();
                println!("{}", style("Conversation has been reset").yellow());
            }
            _ => {
                if let Err(e) = chat_turn(&mut orchestrator, line.to_string()).await {
                    println!("{} {}", style("Error:").red().bold(), e);
                }
            }
        }
    }

    Ok(())
}

async fn chat_turn(orchestrator: &mut ChatOrchestrator, message: String) -> Result<()> {
    println!("{}", style("Thinking...").cyan());
    let outcome = orchestrator.send(message).await?;

    println!("\n{}", style("Assistant:").bold());
    println!("{}", outcome.reply);
    println!("{}\n", format_badges(&outcome.evaluation));
    Ok(())
}

fn format_badges(evaluation: &CbtEvaluation) -> String {
    let badges = [
        ("Questions", evaluation.asks_questions),
        ("Thoughts", evaluation.explores_thoughts),
        ("Reflection", evaluation.encourages_reflection),
        ("CBT Techniques", evaluation.uses_cbt_language),
    ];

    badges
        .iter()
        .map(|(label, on)| {
            if *on {
                style(format!("[✓ {}]", label)).green().to_string()
            } else {
                style(format!("[✗ {}]", label)).dim().to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn run_status(loader: &ConfigLoader, config: &Config) {
    println!("{}", style(&config.app.name).bold().cyan());
    println!("{}\n", config.app.description);

    let config_path = loader.config_path();
    let present = if config_path.exists() {
        style("found").green()
    } else {
        style("not found, using defaults").dim()
    };
    println!("Config file: {} ({})", config_path.display(), present);
    println!("Model: {}", config.provider.model);
    println!("Ollama: {}", config.provider.api_base);
    println!("Timeout: {}s", config.provider.timeout_secs);
    println!("Address: http://{}", config.server.bind_address());
    println!("CORS origins: {}", config.server.allowed_origins.join(", "));
    println!(
        "Sessions: up to {}, evicted after {}s idle",
        config.server.max_sessions, config.server.session_idle_secs
    );
    println!(
        "Rollback on failure: {}",
        if config.agent.rollback_on_failure { "yes" } else { "no" }
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_serve_overrides() {
        let cli = Cli::try_parse_from(["cbt-assistant", "serve", "--port", "9000"]).unwrap();
        match cli.command {
            Commands::Serve { host, port } => {
                assert_eq!(host, None);
                assert_eq!(port, Some(9000));
            }
            _ => panic!("expected serve"),
        }
    }

    #[test]
    fn test_parse_chat_with_global_config_dir() {
        let cli = Cli::try_parse_from([
            "cbt-assistant",
            "chat",
            "--message",
            "I feel anxious",
            "--config-dir",
            "/tmp/cbt",
        ])
        .unwrap();
        assert_eq!(cli.config_dir, Some(PathBuf::from("/tmp/cbt")));
        match cli.command {
            Commands::Chat { message } => assert_eq!(message.as_deref(), Some("I feel anxious")),
            _ => panic!("expected chat"),
        }
    }

    #[test]
    fn test_format_badges_lists_every_signal() {
        console::set_colors_enabled(false);
        let badges = format_badges(&CbtEvaluation {
            asks_questions: true,
            ..CbtEvaluation::default()
        });
        assert_eq!(
            badges,
            "[✓ Questions] [✗ Thoughts] [✗ Reflection] [✗ CBT Techniques]"
        );
    }
}

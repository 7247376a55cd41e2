use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::*;
use conclave_common::ConclaveConfig;
use conclave_core::{Network, PromptStore};
use conclave_llm::GenaiService;
use regex::Regex;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use termimad::MadSkin;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Command-line arguments for the Conclave CLI
#[derive(Parser)]
#[command(
    name = "conclave",
    about = "Conclave - a coordinator-led network of collaborating model instances"
)]
pub struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to a TOML configuration file
    #[clap(short, long, global = true)]
    config: Option<PathBuf>,

    /// Path to the prompt file
    #[clap(short, long, global = true)]
    prompts: Option<PathBuf>,

    /// Enable debug mode
    #[clap(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Start interactive mode (default)
    Interactive,
    /// Execute a single query
    Query {
        /// The prompt to send to the network
        #[arg(required = true)]
        prompt: Vec<String>,
    },
    /// List all active instances
    List,
}

/// Replace Markdown links with OSC 8 hyperlinks for supported terminals.
fn add_osc8_hyperlinks(input: &str) -> String {
    match Regex::new(r"\[([^\]]+)\]\(([^)]+)\)") {
        Ok(re) => re
            .replace_all(input, |caps: &regex::Captures| {
                format!("\x1b]8;;{}\x1b\\{}\x1b]8;;\x1b\\", &caps[2], &caps[1])
            })
            .to_string(),
        Err(_) => input.to_string(),
    }
}

fn print_answer(skin: &MadSkin, answer: &str) {
    let linked = add_osc8_hyperlinks(answer);
    let rendered = skin.term_text(&linked);
    println!("{}", rendered);
}

fn print_instances(network: &Network) {
    let listing = network.list_agents();
    match &listing.mother_node {
        Some(mother) => println!(
            "{} {} (ID: {})",
            "Mother Node:".bright_yellow(),
            mother.role.bright_magenta(),
            mother.id.bright_blue()
        ),
        None => println!("{}", "Mother Node: not initialized".red()),
    }

    if listing.instances.is_empty() {
        println!("\n{}", "No active instances.".white());
        return;
    }

    println!("\n{}", "Active Instances:".bright_cyan().bold());
    for (i, instance) in listing.instances.iter().enumerate() {
        println!(
            "{}. {} (ID: {})",
            (i + 1).to_string().bright_yellow(),
            instance.role.bright_green(),
            instance.id.bright_blue()
        );
    }
}

/// Read-eval loop until `exit`, `quit` or end of input
async fn interactive_loop(network: &mut Network) -> Result<()> {
    println!(
        "{}",
        "💬 Conclave initialized. Type 'exit' or 'quit' to stop.".bright_green()
    );
    println!("{}", "Type '/list' to show active instances.".bright_yellow());
    println!();

    let skin = MadSkin::default();

    loop {
        print!("{}", "> ".bright_cyan().bold());
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();

        if input.is_empty() {
            continue;
        }

        match input.to_lowercase().as_str() {
            "quit" | "exit" => {
                println!("{}", "👋 Goodbye!".bright_green());
                break;
            }
            "/list" => {
                print_instances(network);
                println!();
                continue;
            }
            _ => {}
        }

        match network.handle_user_input(input).await {
            Ok(answer) => {
                println!("{}", "Assistant:".bright_green().bold());
                print_answer(&skin, &answer);
            }
            Err(e) => {
                error!("Turn failed: {}", e);
                println!("{}", format!("❌ Error: {}", e).red());
            }
        }

        println!();
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    // Setup tracing; RUST_LOG overrides the flag
    let default_level = if args.debug { "debug" } else { "info" };
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut config = ConclaveConfig::load(args.config.as_deref())?;
    if let Some(path) = args.prompts {
        config.prompts_path = Some(path);
    }
    config.require_api_key()?;

    let prompts = Arc::new(PromptStore::from_path(config.prompts_path.as_deref())?);
    let service = Arc::new(GenaiService::new());

    info!("Starting Conclave CLI");
    info!("Standard model: {}", config.models.standard);
    info!("Deep-reasoning model: {}", config.models.deep_reasoning);

    let mut network = Network::from_config(service, prompts, &config);
    println!("{}", "🚀 Initializing coordinator...".bright_yellow());
    network.initialize().await?;

    let outcome = match args.command.unwrap_or(Command::Interactive) {
        Command::Interactive => interactive_loop(&mut network).await,
        Command::Query { prompt } => match network.handle_user_input(&prompt.join(" ")).await {
            Ok(answer) => {
                print_answer(&MadSkin::default(), &answer);
                Ok(())
            }
            Err(e) => Err(e.into()),
        },
        Command::List => {
            print_instances(&network);
            Ok(())
        }
    };

    info!("Cleaning up resources...");
    network.shutdown();
    outcome
}

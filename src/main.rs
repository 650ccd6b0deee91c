use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fars_chat::answer;
use fars_chat::commands::{self, AskOutcome};
use fars_chat::config::{self, BackendKind, Config};
use fars_chat::tui;
use std::fs::{self, OpenOptions};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "fars-chat")]
#[command(version)]
#[command(about = "Ask questions about FARS accident data", long_about = None)]
struct Cli {
    /// Config file (default: ~/.fars-chat/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Answer service backend
    #[arg(long, global = true, value_enum)]
    backend: Option<BackendKind>,

    /// Endpoint of the HTTP answer service
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// Seconds to wait for an answer before giving up
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,

    /// Text the input starts with
    #[arg(long)]
    draft: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask one question and print the transcript
    Ask {
        question: String,
        /// Print the transcript as JSON
        #[arg(long)]
        json: bool,
    },
    /// Write the default config file
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

impl Cli {
    fn apply_overrides(&self, config: &mut Config) {
        if let Some(backend) = self.backend {
            config.answer.backend = backend;
        }
        if let Some(endpoint) = &self.endpoint {
            config.answer.endpoint = endpoint.clone();
        }
        if let Some(timeout_secs) = self.timeout_secs {
            config.answer.timeout_secs = timeout_secs;
        }
        if let Some(draft) = &self.draft {
            config.ui.initial_draft = Some(draft.clone());
        }
    }
}

/// Log to `~/.fars-chat/fars-chat.log`; the terminal belongs to the UI
fn init_logging() -> Result<()> {
    let home = config::app_home();
    fs::create_dir_all(&home).context("Failed to create .fars-chat directory")?;
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(home.join("fars-chat.log"))
        .context("Failed to open log file")?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging()?;

    let config_path = cli.config.clone().unwrap_or_else(config::default_config_path);

    if let Some(Commands::InitConfig { force }) = &cli.command {
        return commands::init_config(&config_path, *force);
    }

    let mut config = Config::load(&config_path)?;
    cli.apply_overrides(&mut config);

    log::info!("--- Configuration ---");
    log::info!("Config file: {}", config_path.display());
    log::info!("Backend: {}", config.answer.backend);
    if config.answer.backend == BackendKind::Http {
        log::info!("Endpoint: {}", config.answer.endpoint);
    }
    log::info!("Timeout: {}s, retries: {}", config.answer.timeout_secs, config.answer.max_retries);

    let service = answer::from_config(&config.answer).context("Failed to create answer service")?;

    match cli.command {
        Some(Commands::Ask { question, json }) => {
            let (outcome, controller) = commands::ask(&question, &config, service).await?;
            if outcome != AskOutcome::EmptyQuestion {
                if json {
                    println!("{}", commands::transcript_json(&controller)?);
                } else {
                    commands::print_transcript(&controller);
                }
            }
            if outcome != AskOutcome::Answered {
                std::process::exit(outcome.exit_code());
            }
            Ok(())
        }
        Some(Commands::InitConfig { .. }) => Ok(()),
        None => tui::run(config, service).await,
    }
}

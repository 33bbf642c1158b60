use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use pm_optimizer::{
    chat, client, config, interaction_log::InteractionLog, prompts, web_server, AnalysisOption,
    ServiceSettings, Session, TemplateSet,
};

// Define the command-line interface structure using clap
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// JSON file holding the service credentials.
    #[arg(long, global = true, env = "PM_OPTIMIZER_CONFIG")]
    config: Option<PathBuf>,
    /// Append every prompt, response and extracted artifact to this file.
    #[arg(long, global = true, env = "PM_OPTIMIZER_INTERACTION_LOG")]
    interaction_log: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Run an analysis conversation in the terminal.
    Chat {
        #[arg(long, help = "Work order CSV file to upload.")]
        file: PathBuf,
        #[arg(
            long,
            value_parser = clap::value_parser!(i64).range(1..=4),
            help = "Analysis option (1-4); asked interactively when omitted."
        )]
        option: Option<i64>,
        #[arg(long, help = "Use the detailed prompt wording that asks for specific charts.")]
        detailed: bool,
    },
    /// Serve the web form.
    Serve {
        #[arg(long, default_value_t = 9900, help = "Port for the web server.")]
        port: u16,
        #[arg(long, help = "Use the terse prompt wording instead of the detailed one.")]
        standard: bool,
    },
    /// Print the opening prompt for an option without contacting the service.
    Prompt {
        #[arg(
            long,
            allow_negative_numbers = true,
            help = "Analysis option; anything outside 1-4 prints the invalid-input text."
        )]
        option: i64,
        #[arg(long)]
        detailed: bool,
        #[arg(long, help = "Extra text appended to the prompt.")]
        follow_up: Option<String>,
    },
}

fn template_set(detailed: bool) -> TemplateSet {
    if detailed {
        TemplateSet::Detailed
    } else {
        TemplateSet::Standard
    }
}

/// Loads credentials, authenticates and wraps the client in a fresh session.
async fn open_session(
    config_path: &Path,
    interaction_log: Option<&Path>,
    templates: TemplateSet,
) -> Result<Session> {
    let credentials = config::load_credentials(config_path)
        .with_context(|| format!("Error loading configuration from {}", config_path.display()))?;
    let settings = ServiceSettings::from_env();
    let client = client::connect(&credentials, &settings)
        .await
        .context("Error creating chat client")?;

    let mut session = Session::new(Box::new(client), &settings, templates);
    if let Some(path) = interaction_log {
        let log = InteractionLog::open(path)
            .with_context(|| format!("Failed to open interaction log {}", path.display()))?;
        info!(path = %path.display(), "Recording interactions");
        session = session.with_interaction_log(log);
    }
    Ok(session)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (endpoint, proxy and config path overrides)
    dotenvy::dotenv().ok();

    // Reads log level from RUST_LOG (e.g., RUST_LOG=info,pm_optimizer=debug)
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    info!("PM Optimizer starting with command: {:?}", cli.command);

    let config_path = config::config_path(cli.config.as_deref());
    let interaction_log = cli.interaction_log.as_deref();

    match cli.command {
        Commands::Chat {
            file,
            option,
            detailed,
        } => {
            let mut session =
                open_session(&config_path, interaction_log, template_set(detailed)).await?;
            let option = option.and_then(AnalysisOption::from_number);
            let mut input = io::BufReader::new(io::stdin());
            let mut output = io::stdout();
            chat::run_chat(&mut session, option, &file, &mut input, &mut output)
                .await
                .context("Chat session failed")?;
            info!("Chat session finished.");
        }
        Commands::Serve { port, standard } => {
            let session =
                open_session(&config_path, interaction_log, template_set(!standard)).await?;
            info!("Starting web form on port {}...", port);

            tokio::select! {
                res = web_server::start_web_server(port, session) => res?,
                _ = tokio::signal::ctrl_c() => info!("Ctrl-C received, shutting down."),
            }
        }
        Commands::Prompt {
            option,
            detailed,
            follow_up,
        } => {
            println!(
                "{}",
                prompts::build_prompt(template_set(detailed), option, follow_up.as_deref())
            );
        }
    }

    Ok(())
}

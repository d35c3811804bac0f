use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::runtime::Runtime;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use deepscribe::cli::CommandContext;
use deepscribe::cli::commands;

#[derive(Parser)]
#[command(name = "deepscribe")]
#[command(
    version,
    about = "Research a topic on the web and write a reviewed, multi-section article"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Read configuration from this file only
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[arg(long, global = true)]
    verbose: bool,

    #[arg(long, short, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a new session for a topic
    Start {
        #[arg(help = "Topic to research and write about")]
        topic: String,
        #[arg(long, short, help = "Session id (generated when omitted)")]
        session: Option<String>,
        #[arg(long, short, help = "Answer outline review prompts in the terminal")]
        interactive: bool,
    },

    /// Answer a pending outline review
    Resume {
        session: String,
        #[arg(long, conflicts_with = "feedback", help = "Approve the outline")]
        approve: bool,
        #[arg(long, help = "Feedback used to regenerate the outline")]
        feedback: Option<String>,
        #[arg(long, short, help = "Answer further review prompts in the terminal")]
        interactive: bool,
    },

    /// Re-drive a session from its last checkpoint
    Continue {
        session: String,
        #[arg(long, short)]
        interactive: bool,
    },

    /// Show one session, or list all sessions
    Status {
        session: Option<String>,
        #[arg(
            short = 'f',
            long,
            default_value = "text",
            help = "Output format: text, json"
        )]
        format: String,
    },

    /// Discard stored sessions
    Discard {
        #[arg(help = "Session to discard")]
        session: Option<String>,
        #[arg(long, help = "Discard every session that is not completed")]
        incomplete: bool,
        #[arg(long, help = "Also remove the written document")]
        document: bool,
    },

    /// Print the stage graph as a mermaid flowchart
    Graph,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration (merged from all sources)
    Show {
        #[arg(short = 'g', long, help = "Show global config file only")]
        global: bool,
        #[arg(
            short = 'f',
            long,
            default_value = "toml",
            help = "Output format: toml, json"
        )]
        format: String,
    },
    /// Show configuration file paths
    Path,
    /// Initialize configuration
    Init {
        #[arg(long, short, help = "Initialize global config")]
        global: bool,
        #[arg(long, help = "Overwrite existing config")]
        force: bool,
    },
}

/// Set up panic handler for graceful error reporting
fn setup_panic_handler() {
    let default_hook = std::panic::take_hook();

    std::panic::set_hook(Box::new(move |panic_info| {
        let message = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };

        eprintln!("\n\x1b[1;31m━━━ PANIC ━━━\x1b[0m");
        eprintln!("\x1b[31mdeepscribe encountered an unexpected error:\x1b[0m");
        eprintln!("  {}", message);

        if let Some(location) = panic_info.location() {
            eprintln!(
                "\x1b[90mLocation: {}:{}:{}\x1b[0m",
                location.file(),
                location.line(),
                location.column()
            );
        }
        eprintln!("\n\x1b[33mSessions are checkpointed; 'deepscribe continue <session>' picks up where it stopped.\x1b[0m");
        eprintln!();

        // Backtrace when RUST_BACKTRACE=1
        default_hook(panic_info);
    }));
}

fn main() -> ExitCode {
    setup_panic_handler();

    match run_cli() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("\x1b[31mError:\x1b[0m {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Start {
            topic,
            session,
            interactive,
        } => {
            let ctx = CommandContext::load(config_path)?;
            let rt = Runtime::new()?;
            rt.block_on(commands::run::start(&ctx, &topic, session, interactive))?;
        }
        Commands::Resume {
            session,
            approve,
            feedback,
            interactive,
        } => {
            let ctx = CommandContext::load(config_path)?;
            let rt = Runtime::new()?;
            rt.block_on(commands::run::resume(
                &ctx,
                &session,
                approve,
                feedback,
                interactive,
            ))?;
        }
        Commands::Continue {
            session,
            interactive,
        } => {
            let ctx = CommandContext::load(config_path)?;
            let rt = Runtime::new()?;
            rt.block_on(commands::run::continue_run(&ctx, &session, interactive))?;
        }
        Commands::Status { session, format } => {
            let ctx = CommandContext::load(config_path)?;
            commands::status::run(&ctx, session.as_deref(), &format)?;
        }
        Commands::Discard {
            session,
            incomplete,
            document,
        } => {
            let ctx = CommandContext::load(config_path)?;
            match session {
                Some(id) => commands::discard::run(&ctx, &id, document)?,
                None if incomplete => commands::discard::discard_incomplete(&ctx)?,
                None => anyhow::bail!("Pass a session id or --incomplete"),
            }
        }
        Commands::Graph => commands::graph::run()?,
        Commands::Config { action } => match action {
            ConfigAction::Show { global, format } => {
                commands::config::show(config_path, global, &format)?;
            }
            ConfigAction::Path => commands::config::path()?,
            ConfigAction::Init { global, force } => commands::config::init(global, force)?,
        },
    }

    Ok(())
}

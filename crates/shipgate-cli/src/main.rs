mod cmd;
mod config_file;
mod output;

use clap::{Parser, Subcommand};
use cmd::config::ConfigSubcommand;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "shipgate",
    about = "Chat-driven builds and deployments with approval gates for protected environments",
    version,
    propagate_version = true
)]
struct Cli {
    /// Config file (default: nearest shipgate.yaml, else built-in defaults)
    #[arg(long, global = true, env = "SHIPGATE_CONFIG")]
    config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP bot server
    Serve {
        /// Port to listen on (overrides server.port)
        #[arg(long, short = 'p')]
        port: Option<u16>,
    },

    /// Parse a chat message and show the resulting command
    Parse {
        /// Message text, e.g. `deploy myapp 42 qa`
        #[arg(required = true, trailing_var_arg = true)]
        text: Vec<String>,
    },

    /// Run a chat message against the configured systems
    Run {
        /// User the command is attributed to
        #[arg(long, short = 'u', default_value = "cli")]
        user: String,

        /// Message text
        #[arg(required = true, trailing_var_arg = true)]
        text: Vec<String>,
    },

    /// Show recent audit entries for an app
    History {
        app: String,

        /// Maximum number of entries
        #[arg(long, short = 'n', default_value_t = shipgate_core::orchestrator::HISTORY_LIMIT)]
        limit: u32,
    },

    /// Inspect and validate configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Serve { .. } => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .init();

    let config_path = config_file::resolve_config_path(cli.config.as_deref());
    let config_path = config_path.as_deref();

    let result = match cli.command {
        Commands::Serve { port } => cmd::serve::run(config_path, port),
        Commands::Parse { text } => cmd::parse::run(&text.join(" "), cli.json),
        Commands::Run { user, text } => cmd::run::run(config_path, &user, &text.join(" "), cli.json),
        Commands::History { app, limit } => cmd::history::run(config_path, &app, limit, cli.json),
        Commands::Config { subcommand } => cmd::config::run(config_path, subcommand, cli.json),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

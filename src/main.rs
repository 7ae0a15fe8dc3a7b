use clap::{Parser, Subcommand};
use std::path::Path;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use farmgrid::cli::commands::{self, PlayOptions};
use farmgrid::config::game::GameConfig;

#[derive(Parser)]
#[command(name = "farmgrid")]
#[command(about = "A turn-based farming simulation on a grid, with weather, growth rules and undo")]
#[command(version)]
struct Cli {
    /// Path to the configuration file (defaults apply when it does not exist)
    #[arg(short, long, default_value = "farmgrid.toml")]
    config: String,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a scenario interactively
    Play {
        /// Built-in scenario key or path to a scenario JSON file
        #[arg(short, long)]
        scenario: Option<String>,

        /// RNG seed for weather and sowing (overrides the config)
        #[arg(long)]
        seed: Option<u64>,

        /// Start a new game without offering to resume the autosave
        #[arg(long)]
        fresh: bool,
    },

    /// List the built-in scenarios
    Scenarios,

    /// Manage saved games
    Saves {
        #[command(subcommand)]
        action: SaveAction,
    },

    /// Show a summary of a save file
    Inspect {
        /// Path to the save file
        file: String,
    },
}

#[derive(Subcommand)]
enum SaveAction {
    /// List saved games, newest first
    List {
        /// Save directory (defaults to the configured one)
        #[arg(short, long)]
        dir: Option<String>,
    },
}

fn init_logging(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("farmgrid={}", level)));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn main() {
    let cli = Cli::parse();

    let config = match GameConfig::from_file_or_default(Path::new(&cli.config)) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            std::process::exit(1);
        }
    };
    init_logging(&config.log_level, cli.log_json);

    let stdout = std::io::stdout();
    let mut output = stdout.lock();

    let result = match cli.command {
        Commands::Play {
            scenario,
            seed,
            fresh,
        } => {
            let options = PlayOptions {
                scenario,
                seed,
                fresh,
            };
            let stdin = std::io::stdin();
            let mut input = stdin.lock();
            commands::play(&config, &options, &mut input, &mut output)
        }

        Commands::Scenarios => commands::list_scenarios(&mut output),

        Commands::Saves { action } => match action {
            SaveAction::List { dir } => {
                let dir = dir.unwrap_or_else(|| config.save_directory.clone());
                commands::list_saves(Path::new(&dir), &mut output)
            }
        },

        Commands::Inspect { file } => commands::inspect(Path::new(&file), &mut output),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

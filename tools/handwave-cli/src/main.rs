//! Handwave CLI: replay recorded hand-landmark logs through the gesture
//! pipeline and inspect its configuration.
//!
//! Usage:
//!   handwave replay <LOG>             Replay a JSONL frame log
//!   handwave synth <SCENARIO> -o <LOG>  Write a synthetic frame log
//!   handwave config show|validate|init  Inspect or create the config file
//!   handwave mappings                 Print the mapping table and policies

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

mod commands;

#[derive(Parser)]
#[command(
    name = "handwave",
    about = "Hand-gesture desktop control: classify, gate, and route gestures",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a JSONL frame log against a virtual desktop
    Replay {
        /// Path to the frame log
        log: PathBuf,

        /// Print one JSON report per line instead of text
        #[arg(long)]
        json: bool,

        /// Virtual screen size
        #[arg(long, default_value = "1920x1080")]
        screen: String,

        /// Mapping document to use instead of the defaults
        #[arg(long)]
        mappings: Option<PathBuf>,

        /// Pace frames by their timestamps through the async runner
        #[arg(long)]
        realtime: bool,
    },

    /// Write a synthetic frame log for a scenario
    Synth {
        scenario: Scenario,

        /// Output file
        #[arg(short, long)]
        output: PathBuf,

        /// Frames per second
        #[arg(long, default_value = "30")]
        fps: u32,

        /// Which hand performs the gesture
        #[arg(long, default_value = "right")]
        hand: Hand,
    },

    /// Inspect or create the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Print the mapping table and the policy chain
    Mappings {
        /// Mapping document to show instead of the defaults
        #[arg(long)]
        file: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Check a configuration file
    Validate {
        /// File to check (defaults to --config or the user config)
        path: Option<PathBuf>,
    },
    /// Write the default configuration
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum Scenario {
    /// Open palm held still
    OpenPalm,
    /// Pinch, drag to the right, release
    PinchDrag,
    /// Pointing hand sweeping across the view
    Swipe,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum Hand {
    Left,
    Right,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // a broken config is reported by the command itself
    let logging = commands::load_config(cli.config.as_deref())
        .map(|config| config.logging)
        .unwrap_or_default();
    handwave_common::logging::init_logging(&handwave_common::logging::cli_logging(
        &logging,
        cli.verbose,
    ));

    match cli.command {
        Commands::Replay {
            log,
            json,
            screen,
            mappings,
            realtime,
        } => {
            let options = commands::replay::ReplayOptions {
                log,
                json,
                screen,
                mappings,
                config: cli.config,
            };
            if realtime {
                commands::replay::run_realtime(options).await
            } else {
                commands::replay::run(options)
            }
        }
        Commands::Synth {
            scenario,
            output,
            fps,
            hand,
        } => commands::synth::run(scenario, output, fps, hand),
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config::show(cli.config),
            ConfigAction::Validate { path } => commands::config::validate(path.or(cli.config)),
            ConfigAction::Init { force } => commands::config::init(cli.config, force),
        },
        Commands::Mappings { file } => commands::mappings::run(file, cli.config),
    }
}

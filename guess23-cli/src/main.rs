mod commands;
mod config;

use clap::{Parser, Subcommand};
use config::CliConfig;
use guess23_core::{Address, GuessError, Storage};
use guess23_game::GameError;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "guess23")]
#[command(about = "Guess 2/3 of the average stake, closest takes the pool")]
#[command(version)]
struct Cli {
    /// Data directory for the game database
    #[arg(short, long, global = true)]
    data_dir: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Set up a new game
    Init {
        /// Minimum players per round
        #[arg(long)]
        min: u32,
        /// Players that fill and close a round
        #[arg(long)]
        max: u32,
        /// Owner address receiving the fee
        #[arg(long)]
        owner: Address,
        /// Fee numerator
        #[arg(long, default_value_t = 1)]
        fee_num: u128,
        /// Fee denominator
        #[arg(long, default_value_t = 100)]
        fee_den: u128,
        /// Replace an existing game without asking
        #[arg(short, long)]
        force: bool,
    },
    /// Stake into the open round
    Join {
        /// Participant address
        participant: Address,
        /// Stake, in gwei unless --wei is given
        amount: u128,
        /// Read the amount as wei
        #[arg(long)]
        wei: bool,
    },
    /// Show the open round
    Status,
    /// Check whether an address is in the open round
    Played {
        /// Participant address
        participant: Address,
    },
    /// Show the latest winner and recent rounds
    History {
        /// Number of rounds to show
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },
    /// List logged events
    Events {
        /// First event sequence to show
        #[arg(short, long, default_value_t = 0)]
        since: u64,
        /// Print raw JSON records
        #[arg(long)]
        json: bool,
    },
    /// List fee and reward transfers
    Payouts {
        /// Only transfers to this address
        #[arg(short, long)]
        address: Option<Address>,
    },
    /// Total paid out per address
    Balances,
    /// Play full rounds with random participants
    Simulate {
        /// Rounds to complete
        #[arg(short, long)]
        rounds: u32,
        /// RNG seed for a repeatable run
        #[arg(short, long)]
        seed: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = CliConfig::from_args(cli.data_dir, cli.verbose);

    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_filter()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tokio::fs::create_dir_all(&config.data_dir).await?;
    let storage = Storage::new(&config.db_path()).await?;

    let result = match cli.command {
        Commands::Init {
            min,
            max,
            owner,
            fee_num,
            fee_den,
            force,
        } => commands::init_game(&storage, min, max, owner, fee_num, fee_den, force).await,
        Commands::Join {
            participant,
            amount,
            wei,
        } => commands::join_game(&storage, participant, amount, wei).await,
        Commands::Status => commands::show_status(&storage).await,
        Commands::Played { participant } => commands::show_played(&storage, &participant).await,
        Commands::History { limit } => commands::show_history(&storage, limit).await,
        Commands::Events { since, json } => commands::show_events(&storage, since, json).await,
        Commands::Payouts { address } => commands::show_payouts(&storage, address.as_ref()).await,
        Commands::Balances => commands::show_balances(&storage).await,
        Commands::Simulate { rounds, seed } => commands::simulate(&storage, rounds, seed).await,
    };

    if let Err(e) = result {
        for line in error_lines(&e, &config) {
            eprintln!("{}", line);
        }
        std::process::exit(1);
    }

    Ok(())
}

/// User-facing message for a failed command. Domain errors get a hint.
fn error_lines(e: &anyhow::Error, config: &CliConfig) -> Vec<String> {
    let config_error = match e.downcast_ref::<GameError>() {
        Some(GameError::NotInitialized) => {
            return vec![
                format!("Error: No game found in {}", config.data_dir.display()),
                "Use 'guess23 init --min <N> --max <N> --owner <ADDR>' to start one".to_string(),
            ];
        }
        Some(GameError::AlreadyPlayed(participant)) => {
            return vec![
                format!("Error: {} already has a stake in this round", participant),
                "Wait for the round to close and join the next one".to_string(),
            ];
        }
        Some(GameError::InvalidStake) => {
            return vec!["Error: The stake must be greater than zero".to_string()];
        }
        Some(GameError::Core(GuessError::Config(msg))) => Some(msg),
        _ => match e.downcast_ref::<GuessError>() {
            Some(GuessError::Config(msg)) => Some(msg),
            _ => None,
        },
    };

    match config_error {
        Some(msg) => vec![format!("Error: Invalid game configuration: {}", msg)],
        None => vec![format!("Error: {}", e)],
    }
}

//! feedcache CLI
//!
//! Command-line tools for exercising a change-feed cache against an
//! in-memory record store.
//!
//! # Commands
//!
//! - `simulate` - Run a write workload with injected faults and check
//!   that the cache converges
//! - `lookup` - Seed a store, open a cache and read ids from it

mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// feedcache command-line tools.
#[derive(Parser)]
#[command(name = "feedcache")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a random workload and verify the cache converges
    Simulate {
        /// Records seeded before the cache opens
        #[arg(short, long, default_value = "1000")]
        records: usize,

        /// Mutations applied after the cache opens
        #[arg(short, long, default_value = "1000")]
        mutations: usize,

        /// Take the store offline halfway through the workload
        #[arg(long)]
        outage: bool,

        /// Change events retained by the store for resumption
        #[arg(long)]
        history_limit: Option<usize>,

        /// Seconds to wait for the cache to converge
        #[arg(long, default_value = "10")]
        timeout: u64,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Read records through a freshly opened cache
    Lookup {
        /// Records seeded before the cache opens
        #[arg(short, long, default_value = "100")]
        records: usize,

        /// Ids to read
        #[arg(required = true)]
        ids: Vec<i64>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    match cli.command {
        Commands::Simulate {
            records,
            mutations,
            outage,
            history_limit,
            timeout,
            format,
        } => {
            let options = commands::simulate::SimulateOptions {
                records,
                mutations,
                outage,
                history_limit,
                timeout: std::time::Duration::from_secs(timeout),
            };
            runtime.block_on(commands::simulate::run(options, &format))?;
        }
        Commands::Lookup {
            records,
            ids,
            format,
        } => {
            runtime.block_on(commands::lookup::run(records, &ids, &format))?;
        }
        Commands::Version => {
            println!("feedcache CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("feedcache core v{}", feedcache_core::VERSION);
        }
    }

    Ok(())
}

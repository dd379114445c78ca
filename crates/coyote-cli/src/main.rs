mod cmd;
mod output;

use clap::{Parser, Subcommand};
use cmd::config::ConfigSubcommand;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "coyote",
    about = "Remote pulse gateway for the DG-Lab Coyote: run the API or send it a shock",
    version,
    propagate_version = true
)]
struct Cli {
    /// YAML config file (default: built-in defaults)
    #[arg(long, global = true, env = "COYOTE_CONFIG")]
    config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the shock API over the loopback device and serve until Ctrl-C
    Serve {
        /// API port (overrides api.port)
        #[arg(long)]
        port: Option<u16>,
        /// Owner ceiling 0..100 (overrides owner_max_power)
        #[arg(long, env = "OWNER_MAX_POWER")]
        owner_max: Option<u32>,
        /// Fail queued jobs after waiting this many seconds for binding
        #[arg(long, value_name = "SECS")]
        binding_timeout: Option<u64>,
    },

    /// Send one pulse to a running API
    Shock {
        /// Channel: A or B
        channel: String,
        /// Amplitude 0..100
        #[arg(allow_negative_numbers = true)]
        amp: i64,
        /// Frequency 0..200 (larger values are clamped)
        #[arg(allow_negative_numbers = true)]
        freq: Option<i64>,
        /// Number of 100 ms frames, 1..100
        #[arg(allow_negative_numbers = true)]
        copies: Option<i64>,
        /// Base URL of the shock API
        #[arg(long, env = "COYOTE_API", default_value = cmd::shock::DEFAULT_API)]
        api: String,
    },

    /// Inspect the effective configuration
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

    let config_path = cli.config.as_deref();

    let result = match cli.command {
        Commands::Serve {
            port,
            owner_max,
            binding_timeout,
        } => cmd::serve::run(
            config_path,
            cmd::serve::ServeOverrides {
                port,
                owner_max,
                binding_timeout,
            },
        ),
        Commands::Shock {
            channel,
            amp,
            freq,
            copies,
            api,
        } => cmd::shock::run(&api, &channel, amp, freq, copies, cli.json),
        Commands::Config { subcommand } => cmd::config::run(config_path, subcommand, cli.json),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

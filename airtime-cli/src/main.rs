//! AirtimePlus terminal client
//!
//! Buy mobile airtime with a stablecoin from a connected wallet, or mint the
//! community NFT.

mod commands;
mod config;
mod state;

use airtime_core::chain::TxHash;
use clap::{Parser, Subcommand};
use commands::BuyArgs;
use config::{ConfigLoader, Overrides};
use state::AppState;
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;

/// AirtimePlus - pay for airtime with USDC
#[derive(Parser, Debug)]
#[command(name = "airtime")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, global = true, default_value = "./airtime.toml")]
    config: PathBuf,

    /// Override the backend API base URL
    #[arg(long, global = true, env = "AIRTIME_API_BASE")]
    api_base: Option<Url>,

    /// Override the JSON-RPC endpoint used for reads
    #[arg(long, global = true, env = "AIRTIME_RPC_URL")]
    rpc_url: Option<Url>,

    /// Override the JSON-RPC endpoint of the signing wallet
    #[arg(long, global = true, env = "AIRTIME_WALLET_URL")]
    wallet_url: Option<Url>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List supported countries and their exchange rates
    Countries,
    /// List the operators selling airtime in a country
    Operators {
        #[arg(long)]
        country: String,
    },
    /// Convert a local amount to USDC
    Quote {
        #[arg(long)]
        country: String,
        #[arg(long)]
        amount: String,
    },
    /// Pay with USDC and send airtime to a phone number
    Buy {
        #[arg(long)]
        country: String,
        #[arg(long)]
        operator: String,
        #[arg(long)]
        amount: String,
        /// Recipient phone number
        #[arg(long)]
        phone: String,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Report a payment that did not deliver airtime
    Report {
        #[arg(long)]
        tx_hash: TxHash,
        /// USDC amount that was paid
        #[arg(long)]
        amount: f64,
    },
    /// Show the connected wallet's USDC balance
    Balance,
    /// Show what the backend knows about a wallet
    UserInfo {
        /// Defaults to the connected wallet
        #[arg(long)]
        address: Option<String>,
    },
    /// Add the connected wallet to the NFT whitelist
    Whitelist,
    /// Mint the community NFT
    Mint,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    init_tracing(args.log_json);

    let overrides = Overrides {
        api_base: args.api_base,
        rpc_url: args.rpc_url,
        wallet_url: args.wallet_url,
    };
    let config = ConfigLoader::new(&args.config, overrides)
        .load()
        .map_err(|e| {
            tracing::error!("Failed to load configuration: {}", e);
            e
        })?;
    tracing::debug!(
        api = %config.api.base_url,
        rpc = %config.chain.rpc_url,
        wallet = %config.chain.wallet_url,
        "Configuration loaded"
    );

    let state = AppState::new(config)?;

    let result = match args.command {
        Command::Countries => commands::countries(&state).await,
        Command::Operators { country } => commands::operators(&state, &country).await,
        Command::Quote { country, amount } => commands::quote(&state, &country, &amount).await,
        Command::Buy {
            country,
            operator,
            amount,
            phone,
            yes,
        } => {
            let args = BuyArgs {
                country,
                operator,
                amount,
                phone,
                yes,
            };
            commands::buy(&state, args).await
        }
        Command::Report { tx_hash, amount } => commands::report(&state, tx_hash, amount).await,
        Command::Balance => commands::balance(&state).await,
        Command::UserInfo { address } => commands::user_info(&state, address).await,
        Command::Whitelist => commands::whitelist(&state).await,
        Command::Mint => commands::mint(&state).await,
    };

    result.map_err(|e| {
        tracing::error!("{:#}", e);
        e
    })
}

/// Initialize the tracing subscriber with environment-based filtering.
fn init_tracing(json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,reqwest=warn"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

//! Subcommand implementations.

use crate::state::AppState;
use airtime_core::catalog::CatalogState;
use airtime_core::chain::TxHash;
use airtime_core::events::StatusReceiver;
use airtime_core::form::PurchaseForm;
use airtime_core::nft::MintError;
use airtime_core::price::{format_minor_units, format_usd};
use airtime_core::sequencer::{AttemptOutcome, PurchaseSequencer};
use airtime_sdk::objects::FailureReport;
use anyhow::{Context, bail};
use std::io::Write;
use std::sync::Arc;
use time::OffsetDateTime;
use tokio::io::{AsyncBufReadExt, BufReader};

const AIRTIME_SHARE_TEXT: &str = "I just bought airtime using this mini app";
const AIRTIME_LAUNCH_URL: &str =
    "https://farcaster.xyz/~/mini-apps/launch?domain=airtimeplus-miniapp.vercel.app";
const NFT_SHARE_TEXT: &str = "Mint Your Outlast NFT";
const NFT_LAUNCH_URL: &str =
    "https://farcaster.xyz/~/mini-apps/launch?domain=outlast-nft.vercel.app";

/// Arguments of `buy`.
pub struct BuyArgs {
    pub country: String,
    pub operator: String,
    pub amount: String,
    pub phone: String,
    pub yes: bool,
}

async fn ask(question: &str) -> anyhow::Result<bool> {
    print!("{question} [y/N] ");
    std::io::stdout().flush()?;
    let mut line = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await?;
    Ok(matches!(line.trim(), "y" | "Y" | "yes"))
}

async fn load_catalog(state: &AppState) -> anyhow::Result<CatalogState> {
    if let Err(e) = state.catalog.load(state.backend.as_ref()).await {
        let snapshot = state.catalog.snapshot().await;
        if let Some(api_error) = snapshot.api_error() {
            eprintln!("Error: {api_error}");
        }
        return Err(anyhow::Error::new(e).context(snapshot.error().unwrap_or_default()));
    }
    Ok(state.catalog.snapshot().await)
}

pub async fn countries(state: &AppState) -> anyhow::Result<()> {
    let catalog = load_catalog(state).await?;
    for country in catalog.countries() {
        println!(
            "{:<24} {:<4} {:>12} {}",
            country.name,
            country.country_code,
            country.exchange_rate,
            catalog.currency_for(&country.name).unwrap_or("-")
        );
    }
    Ok(())
}

pub async fn operators(state: &AppState, country: &str) -> anyhow::Result<()> {
    let catalog = load_catalog(state).await?;
    if catalog.find_country(country).is_none() {
        bail!("Unknown country: {country}");
    }
    for operator in catalog.operators_for(country) {
        println!(
            "{operator:<24} {}",
            catalog.operator_id(country, operator).unwrap_or("-")
        );
    }
    Ok(())
}

pub async fn quote(state: &AppState, country: &str, amount: &str) -> anyhow::Result<()> {
    let catalog = load_catalog(state).await?;
    let mut form = PurchaseForm::new();
    form.select_country(country);
    form.set_amount(amount);
    let stable = form.stable_amount(&catalog);
    let currency = catalog.currency_for(country).unwrap_or_default();
    println!(
        "{amount} {currency} = {}",
        format_usd(stable).unwrap_or_else(|| "$-.--".to_string())
    );
    Ok(())
}

/// Hand every progress line to `print` until the attempt settles.
///
/// Must start before `confirm`, whose first transition is in flight.
async fn follow_progress(mut status: StatusReceiver, mut print: impl FnMut(&str)) {
    while status.changed().await.is_ok() {
        let current = *status.borrow_and_update();
        if let Some(message) = current.message {
            print(message);
        }
        if !current.state.is_in_flight() {
            break;
        }
    }
}

fn spawn_progress(sequencer: &PurchaseSequencer) -> tokio::task::JoinHandle<()> {
    let status = sequencer.subscribe();
    tokio::spawn(follow_progress(status, |message| println!("  {message}")))
}

pub async fn buy(state: &AppState, args: BuyArgs) -> anyhow::Result<()> {
    let catalog = load_catalog(state).await?;
    let sequencer = Arc::new(state.sequencer());

    sequencer
        .update_form(|form| {
            form.select_country(args.country);
            form.select_operator(args.operator);
            form.set_amount(args.amount);
            form.set_recipient_phone(args.phone);
        })
        .await?;
    let request = sequencer.submit(&catalog).await?;

    println!("{}", request.summary());
    if !args.yes && !ask("Confirm purchase?").await? {
        sequencer.cancel_review().await?;
        println!("Cancelled.");
        return Ok(());
    }

    let progress = spawn_progress(&sequencer);
    let outcome = sequencer.confirm().await;
    if outcome == AttemptOutcome::Ignored {
        progress.abort();
    } else {
        progress.await?;
    }

    match outcome {
        AttemptOutcome::Succeeded { tx_hash, response } => {
            tracing::debug!(%response, "Topup response");
            println!("Airtime sent to {}.", request.recipient_phone);
            println!("Payment transaction: {tx_hash}");
            println!();
            println!("{AIRTIME_SHARE_TEXT}");
            println!("{AIRTIME_LAUNCH_URL}");
            sequencer.dismiss().await?;
            Ok(())
        }
        AttemptOutcome::Failed(failure) => {
            eprintln!("Error: {}", failure.message);
            if let Some(tx_hash) = failure.tx_hash {
                eprintln!("Your payment transaction was {tx_hash}.");
                if !args.yes && ask("Submit a failure report?").await? {
                    match sequencer.report_failure().await {
                        Ok(_) => println!("Failure report submitted successfully"),
                        Err(e) => eprintln!("{e}"),
                    }
                } else {
                    eprintln!(
                        "Run `airtime report --tx-hash {tx_hash} --amount {}` to report it later.",
                        request.stable_amount
                    );
                }
            }
            if sequencer.failure().await.is_some() {
                sequencer.dismiss().await?;
            }
            bail!("purchase failed")
        }
        AttemptOutcome::Ignored => bail!("purchase was not started"),
    }
}

pub async fn report(state: &AppState, tx_hash: TxHash, amount: f64) -> anyhow::Result<()> {
    let wallet = state
        .connect_wallet()
        .await
        .context("a connected wallet is required to report a transaction")?;
    let report = FailureReport {
        transaction_hash: tx_hash.to_string(),
        wallet_address: wallet.to_string(),
        usdc_amount: amount,
        timestamp: OffsetDateTime::now_utc(),
    };
    state
        .backend
        .submit_failure_report(&report)
        .await
        .context("Failed to submit report. Please try again.")?;
    println!("Failure report submitted successfully");
    Ok(())
}

pub async fn balance(state: &AppState) -> anyhow::Result<()> {
    let account = state.connect_wallet().await?;
    let balance = state.orchestrator().balance().await?;
    println!("{account}: {} USDC", format_minor_units(balance));
    Ok(())
}

pub async fn user_info(state: &AppState, address: Option<String>) -> anyhow::Result<()> {
    let address = match address {
        Some(address) if !address.trim().is_empty() => address,
        Some(_) => bail!("Please provide a wallet address"),
        None => state.connect_wallet().await?.to_string(),
    };
    let info = state.backend.user_info(&address).await?;
    println!("{}", serde_json::to_string_pretty(&info)?);
    Ok(())
}

pub async fn whitelist(state: &AppState) -> anyhow::Result<()> {
    state.connect_wallet().await?;
    let tx_hash = state.minter().join_whitelist().await?;
    println!("Address whitelisted in transaction {tx_hash}");
    Ok(())
}

pub async fn mint(state: &AppState) -> anyhow::Result<()> {
    state.connect_wallet().await?;
    let minter = state.minter();
    let token = match minter.mint().await {
        Ok(token) => {
            println!("Successfully minted your NFT!");
            token
        }
        Err(MintError::AlreadyMinted) => match minter.held_token().await? {
            Some(token) => {
                println!("You have already minted an NFT");
                token
            }
            None => bail!(MintError::AlreadyMinted),
        },
        Err(MintError::NotWhitelisted) => {
            bail!("Your wallet is not whitelisted. Run `airtime whitelist` first.")
        }
        Err(e) => return Err(e.into()),
    };
    println!("Token id: {}", token.token_id);
    println!("View on OpenSea: {}", token.opensea_url());
    println!();
    println!("{NFT_SHARE_TEXT}");
    println!("{NFT_LAUNCH_URL}");
    Ok(())
}

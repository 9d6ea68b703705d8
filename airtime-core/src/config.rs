//! Runtime configuration.
//!
//! These types hold the validated configuration. Loading and parsing the
//! config file is handled by the CLI crate.

use alloy_primitives::{Address, address};
use std::time::Duration;
use url::Url;

/// Contract that receives airtime payments.
pub const PAYMENT_RECIPIENT: Address = address!("0xaF108Dd1aC530F1c4BdED13f43E336A9cec92B44");
/// Whitelist contract gating the NFT mint.
pub const WHITELIST_CONTRACT: Address = address!("0x589AB24Cd45cBE5F6Eb4ff93bD87f1c9Fbb0dE27");
/// Access NFT contract.
pub const NFT_CONTRACT: Address = address!("0x18be51d51f7dcC79fE037817b4bfb5E9cE09f784");

/// How long to wait for a transaction receipt before giving up.
pub const RECEIPT_TIMEOUT: Duration = Duration::from_secs(60);

/// Fixed contract addresses the app talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContractAddresses {
    pub payment_recipient: Address,
    pub whitelist: Address,
    pub nft: Address,
}

impl Default for ContractAddresses {
    fn default() -> Self {
        Self {
            payment_recipient: PAYMENT_RECIPIENT,
            whitelist: WHITELIST_CONTRACT,
            nft: NFT_CONTRACT,
        }
    }
}

/// Values the backend requires on a topup that the mini app never collects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholders {
    pub sender_phone: String,
    pub recipient_email: String,
}

impl Default for Placeholders {
    fn default() -> Self {
        Self {
            sender_phone: "08012345678".to_string(),
            recipient_email: "miniapp@aitimeplus.xyz".to_string(),
        }
    }
}

/// Backend API settings.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: Url,
    pub timeout: Duration,
}

/// Chain access settings.
#[derive(Debug, Clone)]
pub struct ChainConfig {
    /// Read-only JSON-RPC provider.
    pub rpc_url: Url,
    /// JSON-RPC endpoint of the signing wallet.
    pub wallet_url: Url,
    pub receipt_timeout: Duration,
    pub poll_interval: Duration,
}

/// Complete runtime configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub chain: ChainConfig,
    pub contracts: ContractAddresses,
    pub placeholders: Placeholders,
}

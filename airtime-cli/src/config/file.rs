//! TOML file configuration structures.
//!
//! These structs directly map to the `airtime.toml` file format. Every
//! section and field is optional; a missing file behaves like an empty one.

use airtime_core::config::{
    ContractAddresses, NFT_CONTRACT, PAYMENT_RECIPIENT, Placeholders, WHITELIST_CONTRACT,
};
use airtime_sdk::client::DEFAULT_API_BASE;
use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

pub const DEFAULT_RPC_URL: &str = "https://mainnet.base.org";
pub const DEFAULT_WALLET_URL: &str = "http://127.0.0.1:1248";

/// Root configuration structure as read from the TOML file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub chain: ChainConfig,
    #[serde(default)]
    pub contracts: ContractsConfig,
    #[serde(default)]
    pub placeholders: PlaceholdersConfig,
}

/// Backend API section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_api_base")]
    pub base_url: String,
    /// Request timeout in seconds.
    #[serde(default = "default_api_timeout")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_api_base(),
            timeout_secs: default_api_timeout(),
        }
    }
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_api_timeout() -> u64 {
    30
}

/// Chain and wallet section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Public JSON-RPC endpoint used for reads and receipts.
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,
    /// JSON-RPC endpoint of the wallet that signs transactions.
    #[serde(default = "default_wallet_url")]
    pub wallet_url: String,
    #[serde(default = "default_receipt_timeout")]
    pub receipt_timeout_secs: u64,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            rpc_url: default_rpc_url(),
            wallet_url: default_wallet_url(),
            receipt_timeout_secs: default_receipt_timeout(),
            poll_interval_secs: default_poll_interval(),
        }
    }
}

fn default_rpc_url() -> String {
    DEFAULT_RPC_URL.to_string()
}

fn default_wallet_url() -> String {
    DEFAULT_WALLET_URL.to_string()
}

fn default_receipt_timeout() -> u64 {
    60
}

fn default_poll_interval() -> u64 {
    2
}

/// Contract addresses section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractsConfig {
    #[serde(default = "default_payment_recipient")]
    pub payment_recipient: Address,
    #[serde(default = "default_whitelist")]
    pub whitelist: Address,
    #[serde(default = "default_nft")]
    pub nft: Address,
}

impl Default for ContractsConfig {
    fn default() -> Self {
        Self {
            payment_recipient: PAYMENT_RECIPIENT,
            whitelist: WHITELIST_CONTRACT,
            nft: NFT_CONTRACT,
        }
    }
}

fn default_payment_recipient() -> Address {
    PAYMENT_RECIPIENT
}

fn default_whitelist() -> Address {
    WHITELIST_CONTRACT
}

fn default_nft() -> Address {
    NFT_CONTRACT
}

impl From<ContractsConfig> for ContractAddresses {
    fn from(c: ContractsConfig) -> Self {
        ContractAddresses {
            payment_recipient: c.payment_recipient,
            whitelist: c.whitelist,
            nft: c.nft,
        }
    }
}

/// Topup fields the terminal never asks for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceholdersConfig {
    #[serde(default = "default_sender_phone")]
    pub sender_phone: String,
    #[serde(default = "default_recipient_email")]
    pub recipient_email: String,
}

impl Default for PlaceholdersConfig {
    fn default() -> Self {
        Self {
            sender_phone: default_sender_phone(),
            recipient_email: default_recipient_email(),
        }
    }
}

fn default_sender_phone() -> String {
    Placeholders::default().sender_phone
}

fn default_recipient_email() -> String {
    Placeholders::default().recipient_email
}

impl From<PlaceholdersConfig> for Placeholders {
    fn from(p: PlaceholdersConfig) -> Self {
        Placeholders {
            sender_phone: p.sender_phone,
            recipient_email: p.recipient_email,
        }
    }
}

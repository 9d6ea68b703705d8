//! Chain and wallet capabilities.
//!
//! The app never signs anything itself. Reads go through a [`ChainReader`]
//! and every state-changing transaction is handed to a [`WalletSession`],
//! which owns the keys. Both are traits so the orchestration above them can
//! be driven by fakes.

pub mod erc20;
pub mod rpc;

pub use alloy_primitives::{Address, B256, Bytes, U256};

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Hash of a broadcast transaction.
pub type TxHash = B256;

/// Terminal outcome of a mined transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReceiptStatus {
    Confirmed,
    Reverted,
}

/// Errors raised while reading from the chain.
#[derive(Debug, Error)]
pub enum ChainError {
    /// The RPC endpoint could not be reached.
    #[error("rpc transport error: {0}")]
    Transport(#[source] alloy_transport::TransportError),

    /// The node answered with a JSON-RPC error object.
    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// A simulated call reverted.
    #[error("execution reverted: {0}")]
    Reverted(String),

    /// The node answered with something that is not what was asked for.
    #[error("malformed rpc response: {0}")]
    Decode(String),

    /// No receipt showed up in time. The transaction may still be mined.
    #[error("timed out after {}s waiting for receipt of {hash}", .timeout.as_secs())]
    ReceiptTimeout { hash: TxHash, timeout: Duration },
}

impl ChainError {
    pub fn is_connectivity(&self) -> bool {
        matches!(self, ChainError::Transport(_))
    }
}

/// Errors raised by the signing wallet.
#[derive(Debug, Error)]
pub enum WalletError {
    #[error("wallet not connected")]
    NotConnected,

    #[error("user rejected the request")]
    UserRejected,

    #[error("wallet connection failed: {0}")]
    ConnectionFailed(String),

    /// The account cannot pay for the transaction (gas or token balance).
    #[error("{0}")]
    InsufficientFunds(String),

    #[error(transparent)]
    Chain(#[from] ChainError),
}

/// Read-only chain access.
#[async_trait]
pub trait ChainReader: Send + Sync {
    /// EIP-155 id of the network the provider is on.
    async fn chain_id(&self) -> Result<u64, ChainError>;

    /// Execute a call against the latest block without broadcasting.
    ///
    /// With `from` set this doubles as a simulation of the transaction the
    /// wallet is about to send.
    async fn call(&self, from: Option<Address>, to: Address, data: Bytes)
    -> Result<Bytes, ChainError>;

    /// Block until the transaction is mined or `timeout` elapses.
    async fn wait_for_receipt(
        &self,
        hash: TxHash,
        timeout: Duration,
    ) -> Result<ReceiptStatus, ChainError>;
}

/// A connected wallet able to sign and broadcast transactions.
#[async_trait]
pub trait WalletSession: Send + Sync {
    /// The account currently exposed by the wallet, if any.
    async fn account(&self) -> Result<Option<Address>, WalletError>;

    /// Ask the wallet to expose an account.
    async fn connect(&self) -> Result<Address, WalletError>;

    /// Sign and broadcast a contract call, returning its hash.
    async fn send_transaction(
        &self,
        from: Address,
        to: Address,
        data: Bytes,
    ) -> Result<TxHash, WalletError>;
}

//! JSON-RPC transports.
//!
//! [`RpcProvider`] is the read-only side (any public node works).
//! [`RpcWallet`] talks to a wallet that exposes the EIP-1193 methods over
//! HTTP, such as a desktop wallet's local RPC bridge, and leaves signing to it.
//! Both sit on an alloy [`RootProvider`]; this module only maps its errors
//! onto [`ChainError`] and [`WalletError`].

use super::{
    Address, Bytes, ChainError, ChainReader, ReceiptStatus, TxHash, WalletError, WalletSession,
};
use alloy_json_rpc::{ErrorPayload, RpcError};
use alloy_network::ReceiptResponse;
use alloy_provider::{
    PendingTransactionBuilder, PendingTransactionError, Provider, RootProvider, WatchTxError,
};
use alloy_rpc_client::RpcClient;
use alloy_rpc_types_eth::{TransactionInput, TransactionRequest};
use alloy_transport::TransportError;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// EIP-1193: the user rejected the request.
const USER_REJECTED: i64 = 4001;
/// EIP-1193: the account has not been authorized.
const UNAUTHORIZED: i64 = 4100;
/// EIP-1193: the wallet is disconnected from all chains.
const DISCONNECTED: i64 = 4900;
/// geth-style revert during `eth_call`.
const EXECUTION_REVERTED: i64 = 3;

const NO_PARAMS: [(); 0] = [];

/// Default delay between receipt polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

fn http_provider(url: Url, poll_interval: Duration) -> RootProvider {
    RootProvider::new(RpcClient::new_http(url).with_poll_interval(poll_interval))
}

fn call_request(from: Option<Address>, to: Address, data: Bytes) -> TransactionRequest {
    let request = TransactionRequest::default()
        .to(to)
        .input(TransactionInput::new(data));
    match from {
        Some(from) => request.from(from),
        None => request,
    }
}

fn payload_error(payload: &ErrorPayload) -> ChainError {
    let message = payload.message.as_ref();
    if payload.code == EXECUTION_REVERTED || message.starts_with("execution reverted") {
        let reason = message
            .strip_prefix("execution reverted")
            .map(|r| r.trim_start_matches(':').trim())
            .filter(|r| !r.is_empty())
            .unwrap_or("no reason given");
        return ChainError::Reverted(reason.to_string());
    }
    ChainError::Rpc {
        code: payload.code,
        message: message.to_string(),
    }
}

fn chain_error(error: TransportError) -> ChainError {
    match error {
        RpcError::ErrorResp(payload) => payload_error(&payload),
        RpcError::NullResp => ChainError::Decode("empty result".to_string()),
        transport @ RpcError::Transport(_) => ChainError::Transport(transport),
        other => ChainError::Decode(other.to_string()),
    }
}

fn wallet_error(error: TransportError) -> WalletError {
    match error {
        RpcError::ErrorResp(payload) => match payload.code {
            USER_REJECTED => WalletError::UserRejected,
            UNAUTHORIZED => WalletError::NotConnected,
            DISCONNECTED => WalletError::ConnectionFailed(payload.message.to_string()),
            // Nodes only signal this through the message text.
            _ if payload.message.to_lowercase().contains("insufficient funds") => {
                WalletError::InsufficientFunds(payload.message.to_string())
            }
            _ => WalletError::Chain(payload_error(&payload)),
        },
        RpcError::Transport(kind) => WalletError::ConnectionFailed(kind.to_string()),
        other => WalletError::Chain(chain_error(other)),
    }
}

/// Read-only JSON-RPC provider.
#[derive(Clone)]
pub struct RpcProvider {
    provider: RootProvider,
}

impl RpcProvider {
    pub fn new(url: Url, poll_interval: Duration) -> Self {
        Self {
            provider: http_provider(url, poll_interval),
        }
    }
}

#[async_trait]
impl ChainReader for RpcProvider {
    async fn chain_id(&self) -> Result<u64, ChainError> {
        self.provider.get_chain_id().await.map_err(chain_error)
    }

    async fn call(
        &self,
        from: Option<Address>,
        to: Address,
        data: Bytes,
    ) -> Result<Bytes, ChainError> {
        self.provider
            .call(call_request(from, to, data))
            .await
            .map_err(chain_error)
    }

    async fn wait_for_receipt(
        &self,
        hash: TxHash,
        timeout: Duration,
    ) -> Result<ReceiptStatus, ChainError> {
        let receipt = PendingTransactionBuilder::new(self.provider.clone(), hash)
            .with_timeout(Some(timeout))
            .get_receipt()
            .await
            .map_err(|e| match e {
                PendingTransactionError::TxWatcher(WatchTxError::Timeout) => {
                    warn!(tx_hash = %hash, timeout_secs = timeout.as_secs(), "Receipt wait timed out");
                    ChainError::ReceiptTimeout { hash, timeout }
                }
                PendingTransactionError::TransportError(e) => chain_error(e),
                other => ChainError::Decode(other.to_string()),
            })?;
        if ReceiptResponse::status(&receipt) {
            Ok(ReceiptStatus::Confirmed)
        } else {
            Ok(ReceiptStatus::Reverted)
        }
    }
}

/// Wallet reached over its JSON-RPC bridge.
#[derive(Clone)]
pub struct RpcWallet {
    provider: RootProvider,
}

impl RpcWallet {
    pub fn new(url: Url) -> Self {
        Self {
            provider: http_provider(url, DEFAULT_POLL_INTERVAL),
        }
    }
}

#[async_trait]
impl WalletSession for RpcWallet {
    async fn account(&self) -> Result<Option<Address>, WalletError> {
        let accounts = self.provider.get_accounts().await.map_err(wallet_error)?;
        Ok(accounts.into_iter().next())
    }

    async fn connect(&self) -> Result<Address, WalletError> {
        let accounts: Vec<Address> = self
            .provider
            .raw_request("eth_requestAccounts".into(), NO_PARAMS)
            .await
            .map_err(wallet_error)?;
        accounts.into_iter().next().ok_or(WalletError::NotConnected)
    }

    async fn send_transaction(
        &self,
        from: Address,
        to: Address,
        data: Bytes,
    ) -> Result<TxHash, WalletError> {
        let pending = self
            .provider
            .send_transaction(call_request(Some(from), to, data))
            .await
            .map_err(wallet_error)?;
        let hash = *pending.tx_hash();
        debug!(tx_hash = %hash, "Wallet broadcast transaction");
        Ok(hash)
    }
}

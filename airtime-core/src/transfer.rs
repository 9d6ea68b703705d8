//! Stablecoin payment: allowance check, optional approve, transfer.
//!
//! Every step waits for the previous one to be mined. A transfer is never
//! broadcast before its approval is confirmed.

use crate::chain::erc20::{self, IERC20, calldata};
use crate::chain::{
    Address, Bytes, ChainError, ChainReader, ReceiptStatus, TxHash, U256, WalletError,
    WalletSession,
};
use crate::events::{self, PurchaseState, PurchaseStatus, StatusSender};
use airtime_sdk::objects::{Network, Stablecoin};
use alloy_sol_types::SolCall;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("wallet not connected")]
    WalletNotConnected,

    #[error("unsupported network: chain id {0}")]
    UnsupportedNetwork(u64),

    #[error("approval transaction {0} reverted")]
    ApprovalReverted(TxHash),

    #[error("transfer transaction {0} reverted")]
    TransferReverted(TxHash),

    #[error(transparent)]
    Wallet(#[from] WalletError),

    #[error(transparent)]
    Chain(#[from] ChainError),

    /// The transfer was broadcast but its receipt could not be obtained.
    #[error("transfer {tx_hash} not confirmed: {source}")]
    Unconfirmed {
        tx_hash: TxHash,
        #[source]
        source: ChainError,
    },
}

impl TransferError {
    /// Hash of a transfer that left the wallet, if the failure happened after
    /// it was broadcast.
    pub fn tx_hash(&self) -> Option<TxHash> {
        match self {
            TransferError::TransferReverted(hash) => Some(*hash),
            TransferError::Unconfirmed { tx_hash, .. } => Some(*tx_hash),
            _ => None,
        }
    }
}

/// Payment token contract on `chain_id`.
pub fn payment_token_address(chain_id: u64) -> Option<Address> {
    let network = Network::from_chain_id(chain_id)?;
    Stablecoin::Usdc.contract_address(network).parse().ok()
}

pub struct TokenTransferOrchestrator {
    wallet: Arc<dyn WalletSession>,
    reader: Arc<dyn ChainReader>,
    recipient: Address,
    receipt_timeout: Duration,
    status: Option<StatusSender>,
}

impl TokenTransferOrchestrator {
    pub fn new(
        wallet: Arc<dyn WalletSession>,
        reader: Arc<dyn ChainReader>,
        recipient: Address,
        receipt_timeout: Duration,
    ) -> Self {
        Self {
            wallet,
            reader,
            recipient,
            receipt_timeout,
            status: None,
        }
    }

    /// Publish approve/transfer progress on `status`.
    pub fn with_status(mut self, status: StatusSender) -> Self {
        self.status = Some(status);
        self
    }

    fn publish(&self, state: PurchaseState, message: &'static str) {
        if let Some(status) = &self.status {
            status.send_replace(PurchaseStatus::new(state, message));
        }
    }

    async fn sender(&self) -> Result<Address, TransferError> {
        self.wallet
            .account()
            .await?
            .ok_or(TransferError::WalletNotConnected)
    }

    async fn token(&self) -> Result<Address, TransferError> {
        let chain_id = self.reader.chain_id().await?;
        payment_token_address(chain_id).ok_or(TransferError::UnsupportedNetwork(chain_id))
    }

    /// Simulate then broadcast a token call.
    async fn submit<C: SolCall>(
        &self,
        from: Address,
        token: Address,
        call: &C,
    ) -> Result<TxHash, TransferError> {
        let data: Bytes = calldata(call);
        self.reader.call(Some(from), token, data.clone()).await?;
        let hash = self.wallet.send_transaction(from, token, data).await?;
        debug!(tx_hash = %hash, method = C::SIGNATURE, "Transaction broadcast");
        Ok(hash)
    }

    /// Pay `amount` minor units of the payment token to the recipient.
    #[instrument(skip_all, fields(amount = %amount), err)]
    pub async fn transfer(&self, amount: U256) -> Result<TxHash, TransferError> {
        let from = self.sender().await?;
        let token = self.token().await?;
        let spender = self.recipient;

        let allowance = erc20::allowance(self.reader.as_ref(), token, from, spender).await?;
        if allowance < amount {
            debug!(%allowance, "Allowance too low, approving");
            self.publish(PurchaseState::PayingApprove, events::APPROVING);
            let approve = self
                .submit(from, token, &IERC20::approveCall { spender, amount })
                .await?;
            self.publish(PurchaseState::PayingApprove, events::WAITING_FOR_APPROVAL);
            match self
                .reader
                .wait_for_receipt(approve, self.receipt_timeout)
                .await?
            {
                ReceiptStatus::Confirmed => info!(tx_hash = %approve, "Approval confirmed"),
                ReceiptStatus::Reverted => {
                    warn!(tx_hash = %approve, "Approval reverted");
                    return Err(TransferError::ApprovalReverted(approve));
                }
            }
        }

        self.publish(PurchaseState::PayingTransfer, events::TRANSFERRING);
        let transfer = self
            .submit(
                from,
                token,
                &IERC20::transferCall {
                    recipient: spender,
                    amount,
                },
            )
            .await?;
        self.publish(PurchaseState::PayingTransfer, events::WAITING_FOR_TRANSFER);
        let outcome = self
            .reader
            .wait_for_receipt(transfer, self.receipt_timeout)
            .await
            .map_err(|source| TransferError::Unconfirmed {
                tx_hash: transfer,
                source,
            })?;
        match outcome {
            ReceiptStatus::Confirmed => {
                info!(tx_hash = %transfer, "Transfer confirmed");
                Ok(transfer)
            }
            ReceiptStatus::Reverted => {
                warn!(tx_hash = %transfer, "Transfer reverted");
                Err(TransferError::TransferReverted(transfer))
            }
        }
    }

    /// Payment token balance of the connected account, in minor units.
    pub async fn balance(&self) -> Result<U256, TransferError> {
        let owner = self.sender().await?;
        let token = self.token().await?;
        Ok(erc20::balance_of(self.reader.as_ref(), token, owner).await?)
    }
}

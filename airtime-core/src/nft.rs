//! Community NFT: whitelist membership and minting.
//!
//! Minting is gated by a separate whitelist contract and limited to one
//! token per address. Both checks are done client side before anything is
//! sent to the wallet.

use crate::chain::erc20::{IAccessNft, IWhitelist, calldata, read};
use crate::chain::{
    Address, ChainError, ChainReader, ReceiptStatus, TxHash, U256, WalletError, WalletSession,
};
use crate::config::ContractAddresses;
use alloy_sol_types::SolCall;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Error)]
pub enum MintError {
    #[error("Please connect your wallet first")]
    NotConnected,

    #[error("Your address is not whitelisted")]
    NotWhitelisted,

    #[error("You have already minted an NFT")]
    AlreadyMinted,

    #[error("Address is already whitelisted")]
    AlreadyWhitelisted,

    #[error("transaction {0} reverted")]
    Reverted(TxHash),

    #[error(transparent)]
    Wallet(#[from] WalletError),

    #[error(transparent)]
    Chain(#[from] ChainError),
}

/// What the connected account may do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MintEligibility {
    pub account: Address,
    pub whitelisted: bool,
    pub has_minted: bool,
}

impl MintEligibility {
    pub fn can_mint(&self) -> bool {
        self.whitelisted && !self.has_minted
    }
}

/// A token held by the connected account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MintedToken {
    pub contract: Address,
    pub token_id: U256,
    /// Set when the token was minted in this session.
    pub tx_hash: Option<TxHash>,
}

impl MintedToken {
    pub fn opensea_url(&self) -> String {
        format!(
            "https://opensea.io/assets/base/{}/{}",
            self.contract, self.token_id
        )
    }
}

impl fmt::Display for MintedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "token #{} ({})", self.token_id, self.opensea_url())
    }
}

pub struct NftMinter {
    wallet: Arc<dyn WalletSession>,
    reader: Arc<dyn ChainReader>,
    whitelist: Address,
    nft: Address,
    receipt_timeout: Duration,
}

impl NftMinter {
    pub fn new(
        wallet: Arc<dyn WalletSession>,
        reader: Arc<dyn ChainReader>,
        contracts: &ContractAddresses,
        receipt_timeout: Duration,
    ) -> Self {
        Self {
            wallet,
            reader,
            whitelist: contracts.whitelist,
            nft: contracts.nft,
            receipt_timeout,
        }
    }

    async fn account(&self) -> Result<Address, MintError> {
        self.wallet.account().await?.ok_or(MintError::NotConnected)
    }

    pub async fn eligibility(&self) -> Result<MintEligibility, MintError> {
        let account = self.account().await?;
        let whitelisted = read(
            self.reader.as_ref(),
            self.whitelist,
            IWhitelist::whitelistedAddressesCall { account },
        )
        .await?;
        let balance = read(
            self.reader.as_ref(),
            self.nft,
            IAccessNft::balanceOfCall { owner: account },
        )
        .await?;
        Ok(MintEligibility {
            account,
            whitelisted,
            has_minted: balance > U256::ZERO,
        })
    }

    /// First token owned by `owner`.
    pub async fn token_of(&self, owner: Address) -> Result<MintedToken, MintError> {
        let token_id = read(
            self.reader.as_ref(),
            self.nft,
            IAccessNft::tokenOfOwnerByIndexCall {
                owner,
                index: U256::ZERO,
            },
        )
        .await?;
        Ok(MintedToken {
            contract: self.nft,
            token_id,
            tx_hash: None,
        })
    }

    /// The connected account's token, if it holds one.
    pub async fn held_token(&self) -> Result<Option<MintedToken>, MintError> {
        let eligibility = self.eligibility().await?;
        if !eligibility.has_minted {
            return Ok(None);
        }
        self.token_of(eligibility.account).await.map(Some)
    }

    async fn send_and_confirm<C: SolCall>(
        &self,
        from: Address,
        to: Address,
        call: &C,
    ) -> Result<TxHash, MintError> {
        let data = calldata(call);
        self.reader.call(Some(from), to, data.clone()).await?;
        let hash = self.wallet.send_transaction(from, to, data).await?;
        debug!(tx_hash = %hash, method = C::SIGNATURE, "Transaction broadcast");
        match self.reader.wait_for_receipt(hash, self.receipt_timeout).await? {
            ReceiptStatus::Confirmed => Ok(hash),
            ReceiptStatus::Reverted => {
                warn!(tx_hash = %hash, method = C::SIGNATURE, "Transaction reverted");
                Err(MintError::Reverted(hash))
            }
        }
    }

    #[instrument(skip_all, err)]
    pub async fn mint(&self) -> Result<MintedToken, MintError> {
        let eligibility = self.eligibility().await?;
        if !eligibility.whitelisted {
            return Err(MintError::NotWhitelisted);
        }
        if eligibility.has_minted {
            return Err(MintError::AlreadyMinted);
        }
        let hash = self
            .send_and_confirm(eligibility.account, self.nft, &IAccessNft::mintCall {})
            .await?;
        let token = self.token_of(eligibility.account).await?;
        info!(tx_hash = %hash, token_id = %token.token_id, "NFT minted");
        Ok(MintedToken {
            tx_hash: Some(hash),
            ..token
        })
    }

    #[instrument(skip_all, err)]
    pub async fn join_whitelist(&self) -> Result<TxHash, MintError> {
        let eligibility = self.eligibility().await?;
        if eligibility.whitelisted {
            return Err(MintError::AlreadyWhitelisted);
        }
        let hash = self
            .send_and_confirm(
                eligibility.account,
                self.whitelist,
                &IWhitelist::addAddressToWhitelistCall {},
            )
            .await?;
        info!(tx_hash = %hash, account = %eligibility.account, "Address whitelisted");
        Ok(hash)
    }
}

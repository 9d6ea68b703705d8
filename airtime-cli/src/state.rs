//! Components shared by every subcommand.

use airtime_core::catalog::CatalogRepository;
use airtime_core::chain::rpc::{RpcProvider, RpcWallet};
use airtime_core::chain::{Address, WalletError, WalletSession};
use airtime_core::config::AppConfig;
use airtime_core::nft::NftMinter;
use airtime_core::sequencer::PurchaseSequencer;
use airtime_core::transfer::TokenTransferOrchestrator;
use airtime_sdk::client::BackendClient;
use std::sync::Arc;

pub struct AppState {
    pub config: AppConfig,
    pub backend: Arc<BackendClient>,
    pub provider: Arc<RpcProvider>,
    pub wallet: Arc<RpcWallet>,
    pub catalog: CatalogRepository,
}

impl AppState {
    pub fn new(config: AppConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(config.api.timeout)
            .build()?;
        let backend = BackendClient::new(config.api.base_url.clone()).with_http_client(http);
        let provider = RpcProvider::new(config.chain.rpc_url.clone(), config.chain.poll_interval);
        let wallet = RpcWallet::new(config.chain.wallet_url.clone());
        Ok(Self {
            config,
            backend: Arc::new(backend),
            provider: Arc::new(provider),
            wallet: Arc::new(wallet),
            catalog: CatalogRepository::new(),
        })
    }

    pub fn sequencer(&self) -> PurchaseSequencer {
        PurchaseSequencer::new(
            self.wallet.clone(),
            self.provider.clone(),
            self.backend.clone(),
            self.config.contracts.payment_recipient,
            self.config.chain.receipt_timeout,
            self.config.placeholders.clone(),
        )
    }

    pub fn orchestrator(&self) -> TokenTransferOrchestrator {
        TokenTransferOrchestrator::new(
            self.wallet.clone(),
            self.provider.clone(),
            self.config.contracts.payment_recipient,
            self.config.chain.receipt_timeout,
        )
    }

    pub fn minter(&self) -> NftMinter {
        NftMinter::new(
            self.wallet.clone(),
            self.provider.clone(),
            &self.config.contracts,
            self.config.chain.receipt_timeout,
        )
    }

    /// The wallet's account, asking it to connect first if needed.
    pub async fn connect_wallet(&self) -> Result<Address, WalletError> {
        match self.wallet.account().await? {
            Some(account) => Ok(account),
            None => {
                tracing::info!("Wallet not connected, requesting accounts");
                self.wallet.connect().await
            }
        }
    }
}

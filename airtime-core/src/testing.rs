//! In-memory fakes for the chain, wallet and backend capabilities.
//!
//! Every fake writes to a shared [`Trace`] so tests can assert on the exact
//! order of side effects across components.

#![allow(clippy::unwrap_used)]

use crate::catalog::CatalogSource;
use crate::chain::erc20::{IAccessNft, IERC20, IWhitelist};
use crate::chain::{
    Address, Bytes, ChainError, ChainReader, ReceiptStatus, TxHash, U256, WalletError,
    WalletSession,
};
use crate::sequencer::BackendApi;
use airtime_sdk::client::ClientError;
use airtime_sdk::objects::{AirtimeService, Country, FailureReport, Services, TopupRequest};
use alloy_sol_types::{SolCall, SolValue};
use async_trait::async_trait;
use reqwest::StatusCode;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

pub const OWNER: Address = Address::repeat_byte(0xaa);
pub const RECIPIENT: Address = Address::repeat_byte(0xbb);
pub const WHITELIST: Address = Address::repeat_byte(0xcc);
pub const NFT: Address = Address::repeat_byte(0xdd);

/// Observable side effect.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Connect,
    Simulate { selector: [u8; 4] },
    Send { to: Address, selector: [u8; 4], hash: TxHash },
    WaitReceipt(TxHash),
    Topup(TopupRequest),
    Report(FailureReport),
    FetchCatalog,
}

#[derive(Debug, Clone, Default)]
pub struct Trace(Arc<Mutex<Vec<Call>>>);

impl Trace {
    pub fn push(&self, call: Call) {
        self.0.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.0.lock().unwrap().clone()
    }

    pub fn sends(&self) -> Vec<[u8; 4]> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Send { selector, .. } => Some(selector),
                _ => None,
            })
            .collect()
    }

    pub fn topups(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Topup(_)))
            .count()
    }
}

/// Deterministic hash of the n-th transaction a [`FakeWallet`] sends.
pub fn tx_hash(n: u8) -> TxHash {
    TxHash::with_last_byte(n)
}

pub struct FakeChain {
    pub trace: Trace,
    pub chain_id: u64,
    pub allowance: Mutex<U256>,
    pub balance: U256,
    pub whitelisted: Mutex<bool>,
    pub nft_balance: Mutex<U256>,
    pub token_id: U256,
    pub reverted: Mutex<HashSet<TxHash>>,
    pub stalled: Mutex<HashSet<TxHash>>,
    pub simulation_revert: Mutex<Option<String>>,
}

impl FakeChain {
    pub fn new(trace: Trace) -> Self {
        Self {
            trace,
            chain_id: 8453,
            allowance: Mutex::new(U256::ZERO),
            balance: U256::from(100_000_000u64),
            whitelisted: Mutex::new(false),
            nft_balance: Mutex::new(U256::ZERO),
            token_id: U256::from(42u64),
            reverted: Mutex::new(HashSet::new()),
            stalled: Mutex::new(HashSet::new()),
            simulation_revert: Mutex::new(None),
        }
    }

    pub fn with_chain_id(mut self, chain_id: u64) -> Self {
        self.chain_id = chain_id;
        self
    }

    pub fn with_allowance(self, allowance: u64) -> Self {
        *self.allowance.lock().unwrap() = U256::from(allowance);
        self
    }

    pub fn revert(&self, hash: TxHash) {
        self.reverted.lock().unwrap().insert(hash);
    }

    pub fn stall(&self, hash: TxHash) {
        self.stalled.lock().unwrap().insert(hash);
    }
}

#[async_trait]
impl ChainReader for FakeChain {
    async fn chain_id(&self) -> Result<u64, ChainError> {
        Ok(self.chain_id)
    }

    async fn call(
        &self,
        from: Option<Address>,
        to: Address,
        data: Bytes,
    ) -> Result<Bytes, ChainError> {
        let selector: [u8; 4] = data[..4].try_into().unwrap();
        if from.is_some() {
            self.trace.push(Call::Simulate { selector });
            if let Some(reason) = self.simulation_revert.lock().unwrap().clone() {
                return Err(ChainError::Reverted(reason));
            }
            return Ok(true.abi_encode().into());
        }
        let encoded = match selector {
            IERC20::allowanceCall::SELECTOR => self.allowance.lock().unwrap().abi_encode(),
            IERC20::balanceOfCall::SELECTOR if to == NFT => {
                self.nft_balance.lock().unwrap().abi_encode()
            }
            IERC20::balanceOfCall::SELECTOR => self.balance.abi_encode(),
            IWhitelist::whitelistedAddressesCall::SELECTOR => {
                self.whitelisted.lock().unwrap().abi_encode()
            }
            IAccessNft::tokenOfOwnerByIndexCall::SELECTOR => self.token_id.abi_encode(),
            _ => return Err(ChainError::Reverted("unknown selector".to_string())),
        };
        Ok(encoded.into())
    }

    async fn wait_for_receipt(
        &self,
        hash: TxHash,
        timeout: Duration,
    ) -> Result<ReceiptStatus, ChainError> {
        self.trace.push(Call::WaitReceipt(hash));
        if self.stalled.lock().unwrap().contains(&hash) {
            return Err(ChainError::ReceiptTimeout { hash, timeout });
        }
        if self.reverted.lock().unwrap().contains(&hash) {
            return Ok(ReceiptStatus::Reverted);
        }
        Ok(ReceiptStatus::Confirmed)
    }
}

pub struct FakeWallet {
    pub trace: Trace,
    pub account: Mutex<Option<Address>>,
    pub connectable: bool,
    pub reject_sends: bool,
    pub sent: Mutex<u8>,
    /// When set, every send blocks until notified.
    pub gate: Option<Arc<Notify>>,
    /// Applied to the chain when the wallet sends a state-changing call.
    pub chain: Option<Arc<FakeChain>>,
}

impl FakeWallet {
    pub fn connected(trace: Trace) -> Self {
        Self {
            trace,
            account: Mutex::new(Some(OWNER)),
            connectable: true,
            reject_sends: false,
            sent: Mutex::new(0),
            gate: None,
            chain: None,
        }
    }

    pub fn disconnected(trace: Trace, connectable: bool) -> Self {
        let wallet = Self::connected(trace);
        *wallet.account.lock().unwrap() = None;
        Self {
            connectable,
            ..wallet
        }
    }

    pub fn applying_to(mut self, chain: Arc<FakeChain>) -> Self {
        self.chain = Some(chain);
        self
    }
}

#[async_trait]
impl WalletSession for FakeWallet {
    async fn account(&self) -> Result<Option<Address>, WalletError> {
        Ok(*self.account.lock().unwrap())
    }

    async fn connect(&self) -> Result<Address, WalletError> {
        self.trace.push(Call::Connect);
        if !self.connectable {
            return Err(WalletError::ConnectionFailed(
                "no wallet listening".to_string(),
            ));
        }
        *self.account.lock().unwrap() = Some(OWNER);
        Ok(OWNER)
    }

    async fn send_transaction(
        &self,
        _from: Address,
        to: Address,
        data: Bytes,
    ) -> Result<TxHash, WalletError> {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if self.reject_sends {
            return Err(WalletError::UserRejected);
        }
        let selector: [u8; 4] = data[..4].try_into().unwrap();
        let hash = {
            let mut sent = self.sent.lock().unwrap();
            *sent += 1;
            tx_hash(*sent)
        };
        if let Some(chain) = &self.chain {
            match selector {
                IERC20::approveCall::SELECTOR => {
                    let call = IERC20::approveCall::abi_decode(&data).unwrap();
                    *chain.allowance.lock().unwrap() = call.amount;
                }
                IAccessNft::mintCall::SELECTOR => {
                    *chain.nft_balance.lock().unwrap() = U256::from(1u64);
                }
                IWhitelist::addAddressToWhitelistCall::SELECTOR => {
                    *chain.whitelisted.lock().unwrap() = true;
                }
                _ => {}
            }
        }
        self.trace.push(Call::Send { to, selector, hash });
        Ok(hash)
    }
}

pub struct FakeBackend {
    pub trace: Trace,
    pub topup_status: Mutex<Option<StatusCode>>,
    pub report_status: Mutex<Option<StatusCode>>,
    pub catalog_status: Option<StatusCode>,
}

impl FakeBackend {
    pub fn new(trace: Trace) -> Self {
        Self {
            trace,
            topup_status: Mutex::new(None),
            report_status: Mutex::new(None),
            catalog_status: None,
        }
    }

    fn failure(status: StatusCode, error: &str) -> ClientError {
        ClientError::Api {
            status,
            error: Some(error.to_string()).filter(|e| !e.is_empty()),
            body: format!(r#"{{"error":"{error}"}}"#),
        }
    }
}

#[async_trait]
impl BackendApi for FakeBackend {
    async fn send_topup(&self, request: &TopupRequest) -> Result<serde_json::Value, ClientError> {
        self.trace.push(Call::Topup(request.clone()));
        match *self.topup_status.lock().unwrap() {
            Some(status) => Err(Self::failure(status, "Operator unavailable")),
            None => Ok(serde_json::json!({ "status": "SUCCESSFUL" })),
        }
    }

    async fn submit_failure_report(&self, report: &FailureReport) -> Result<(), ClientError> {
        self.trace.push(Call::Report(report.clone()));
        match *self.report_status.lock().unwrap() {
            Some(status) => Err(Self::failure(status, "")),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl CatalogSource for FakeBackend {
    async fn fetch_countries(&self) -> Result<Vec<Country>, ClientError> {
        self.trace.push(Call::FetchCatalog);
        match self.catalog_status {
            Some(status) => Err(Self::failure(status, "")),
            None => Ok(sample_countries()),
        }
    }
}

fn service(operator: &str, id: &str, amount: f64, currency: &str, rate: f64) -> AirtimeService {
    AirtimeService {
        network_operator: operator.to_string(),
        operator_id: id.to_string(),
        amount,
        currency: currency.into(),
        usdc_value: amount / rate,
    }
}

pub fn sample_countries() -> Vec<Country> {
    vec![
        Country {
            name: "Nigeria".to_string(),
            country_code: "NG".into(),
            exchange_rate: 500.0,
            services: Services {
                airtime: vec![
                    service("MTN", "341", 1000.0, "NGN", 500.0),
                    service("MTN", "341", 2000.0, "NGN", 500.0),
                    service("Airtel", "342", 500.0, "NGN", 500.0),
                    service("Glo", "344", 500.0, "NGN", 500.0),
                ],
            },
        },
        Country {
            name: "Ghana".to_string(),
            country_code: "GH".into(),
            exchange_rate: 15.0,
            services: Services {
                airtime: vec![service("Vodafone", "643", 10.0, "GHS", 15.0)],
            },
        },
        Country {
            name: "Atlantis".to_string(),
            country_code: "AT".into(),
            exchange_rate: 0.0,
            services: Services {
                airtime: vec![service("Poseidon", "999", 10.0, "ATL", 1.0)],
            },
        },
    ]
}

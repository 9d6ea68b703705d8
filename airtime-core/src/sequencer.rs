//! Purchase sequencer.
//!
//! Drives one purchase attempt at a time: review, wallet connection,
//! payment, then the topup request. A topup is only ever requested for a
//! transfer whose receipt came back confirmed. Failures land in
//! [`PurchaseState::Failed`] with a message picked from a typed
//! [`FailureKind`], and keep the transfer hash around so the user can file a
//! failure report.

use crate::catalog::CatalogState;
use crate::chain::{Address, ChainError, ChainReader, TxHash, WalletError, WalletSession};
use crate::config::Placeholders;
use crate::events::{
    self, PurchaseState, PurchaseStatus, StatusReceiver, StatusSender, status_channel,
};
use crate::form::{PurchaseForm, PurchaseRequest, ValidationError};
use crate::transfer::{TokenTransferOrchestrator, TransferError};
use airtime_sdk::client::{BackendClient, ClientError};
use airtime_sdk::objects::{FailureReport, TopupRequest};
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use thiserror::Error;
use time::OffsetDateTime;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

pub const REJECTED_MESSAGE: &str = "Transaction was rejected. Please try again.";
pub const NETWORK_MESSAGE: &str =
    "Network error. Please check your connection and ensure you're on the correct network.";
pub const WALLET_REQUIRED_MESSAGE: &str =
    "Wallet connection required. Please connect your wallet and try again.";
pub const API_FALLBACK_MESSAGE: &str = "Network response was not ok";
pub const GENERIC_MESSAGE: &str = "Transaction unsuccessful. Please try again.";

/// Fulfillment and reconciliation endpoints of the backend.
#[async_trait]
pub trait BackendApi: Send + Sync {
    async fn send_topup(&self, request: &TopupRequest) -> Result<serde_json::Value, ClientError>;

    async fn submit_failure_report(&self, report: &FailureReport) -> Result<(), ClientError>;
}

#[async_trait]
impl BackendApi for BackendClient {
    async fn send_topup(&self, request: &TopupRequest) -> Result<serde_json::Value, ClientError> {
        BackendClient::send_topup(self, request).await
    }

    async fn submit_failure_report(&self, report: &FailureReport) -> Result<(), ClientError> {
        BackendClient::submit_failure_report(self, report).await
    }
}

/// Category of a failed attempt, used to pick the message shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    UserRejected,
    InsufficientFunds,
    /// Connectivity problem or wrong network.
    Network,
    WalletUnavailable,
    Reverted,
    /// The backend refused the topup.
    Api,
    Other,
}

impl FailureKind {
    fn of_chain(error: &ChainError) -> Self {
        match error {
            e if e.is_connectivity() => FailureKind::Network,
            ChainError::Reverted(_) => FailureKind::Reverted,
            _ => FailureKind::Other,
        }
    }

    fn of_wallet(error: &WalletError) -> Self {
        match error {
            WalletError::UserRejected => FailureKind::UserRejected,
            WalletError::NotConnected | WalletError::ConnectionFailed(_) => {
                FailureKind::WalletUnavailable
            }
            WalletError::InsufficientFunds(_) => FailureKind::InsufficientFunds,
            WalletError::Chain(e) => Self::of_chain(e),
        }
    }

    fn of_transfer(error: &TransferError) -> Self {
        match error {
            TransferError::WalletNotConnected => FailureKind::WalletUnavailable,
            TransferError::UnsupportedNetwork(_) => FailureKind::Network,
            TransferError::ApprovalReverted(_) | TransferError::TransferReverted(_) => {
                FailureKind::Reverted
            }
            TransferError::Wallet(e) => Self::of_wallet(e),
            TransferError::Chain(e) | TransferError::Unconfirmed { source: e, .. } => {
                Self::of_chain(e)
            }
        }
    }

    fn of_api(error: &ClientError) -> Self {
        if error.is_connectivity() {
            FailureKind::Network
        } else {
            FailureKind::Api
        }
    }

    /// User-facing message for this kind, given the underlying error text.
    pub fn message(self, raw: &str) -> String {
        match self {
            FailureKind::UserRejected => REJECTED_MESSAGE.to_string(),
            FailureKind::Network => NETWORK_MESSAGE.to_string(),
            FailureKind::WalletUnavailable => WALLET_REQUIRED_MESSAGE.to_string(),
            _ if raw.trim().is_empty() => GENERIC_MESSAGE.to_string(),
            _ => raw.to_string(),
        }
    }
}

/// Why the last attempt failed.
#[derive(Debug, Clone, PartialEq)]
pub struct PurchaseFailure {
    pub kind: FailureKind,
    pub message: String,
    /// Transfer hash obtained before the failure, kept for reporting.
    pub tx_hash: Option<TxHash>,
}

impl PurchaseFailure {
    fn new(kind: FailureKind, raw: &str, tx_hash: Option<TxHash>) -> Self {
        Self {
            kind,
            message: kind.message(raw),
            tx_hash,
        }
    }

    fn from_wallet(error: &WalletError) -> Self {
        Self::new(FailureKind::of_wallet(error), &error.to_string(), None)
    }

    fn from_transfer(error: &TransferError) -> Self {
        Self::new(
            FailureKind::of_transfer(error),
            &error.to_string(),
            error.tx_hash(),
        )
    }

    fn from_topup(error: &ClientError, tx_hash: TxHash) -> Self {
        let raw = error.server_message().unwrap_or(API_FALLBACK_MESSAGE);
        Self::new(FailureKind::of_api(error), raw, Some(tx_hash))
    }
}

/// Result of [`PurchaseSequencer::confirm`].
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptOutcome {
    Succeeded {
        tx_hash: TxHash,
        response: serde_json::Value,
    },
    Failed(PurchaseFailure),
    /// Another attempt was running, or there was nothing to confirm.
    Ignored,
}

#[derive(Debug, Error)]
pub enum SequencerError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("a purchase is already in progress")]
    Busy,

    #[error("cannot {action} while {state}")]
    InvalidState {
        action: &'static str,
        state: PurchaseState,
    },

    #[error("no transaction to report")]
    NothingToReport,

    #[error("Failed to submit report. Please try again.")]
    Report(#[source] ClientError),
}

#[derive(Debug, Default)]
struct Session {
    form: PurchaseForm,
    request: Option<PurchaseRequest>,
    failure: Option<PurchaseFailure>,
    /// Account that paid during the last attempt.
    account: Option<Address>,
}

/// Clears the submitting flag when an attempt ends, however it ends.
struct SubmittingGuard<'a>(&'a AtomicBool);

impl Drop for SubmittingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct PurchaseSequencer {
    wallet: Arc<dyn WalletSession>,
    orchestrator: TokenTransferOrchestrator,
    backend: Arc<dyn BackendApi>,
    placeholders: Placeholders,
    status: StatusSender,
    is_submitting: AtomicBool,
    session: Mutex<Session>,
}

impl PurchaseSequencer {
    pub fn new(
        wallet: Arc<dyn WalletSession>,
        reader: Arc<dyn ChainReader>,
        backend: Arc<dyn BackendApi>,
        recipient: Address,
        receipt_timeout: Duration,
        placeholders: Placeholders,
    ) -> Self {
        let (status, _) = status_channel();
        let orchestrator =
            TokenTransferOrchestrator::new(wallet.clone(), reader, recipient, receipt_timeout)
                .with_status(status.clone());
        Self {
            wallet,
            orchestrator,
            backend,
            placeholders,
            status,
            is_submitting: AtomicBool::new(false),
            session: Mutex::new(Session::default()),
        }
    }

    pub fn subscribe(&self) -> StatusReceiver {
        self.status.subscribe()
    }

    pub fn state(&self) -> PurchaseState {
        self.status.borrow().state
    }

    pub fn is_submitting(&self) -> bool {
        self.is_submitting.load(Ordering::Acquire)
    }

    fn set(&self, status: PurchaseStatus) {
        debug!(state = %status.state, message = status.message, "Purchase status");
        self.status.send_replace(status);
    }

    fn ensure_state(
        &self,
        action: &'static str,
        allowed: &[PurchaseState],
    ) -> Result<(), SequencerError> {
        let state = self.state();
        if self.is_submitting() || state.is_in_flight() {
            return Err(SequencerError::Busy);
        }
        if allowed.contains(&state) {
            Ok(())
        } else {
            Err(SequencerError::InvalidState { action, state })
        }
    }

    /// Lock the session for a user action.
    ///
    /// An attempt may have started while waiting for the lock, so the state
    /// is checked again once it is held.
    async fn lock_session(
        &self,
        action: &'static str,
        allowed: &[PurchaseState],
    ) -> Result<MutexGuard<'_, Session>, SequencerError> {
        self.ensure_state(action, allowed)?;
        let session = self.session.lock().await;
        self.ensure_state(action, allowed)?;
        Ok(session)
    }

    /// Edit the form. Editing during review drops the reviewed request.
    pub async fn update_form<R>(
        &self,
        edit: impl FnOnce(&mut PurchaseForm) -> R,
    ) -> Result<R, SequencerError> {
        let mut session = self
            .lock_session("edit the form", &[PurchaseState::Idle, PurchaseState::FormFilled])
            .await?;
        let result = edit(&mut session.form);
        if session.request.take().is_some() {
            self.set(PurchaseStatus::settled(PurchaseState::Idle));
        }
        Ok(result)
    }

    pub async fn form(&self) -> PurchaseForm {
        self.session.lock().await.form.clone()
    }

    /// Validate the form and move to review.
    ///
    /// A validation error leaves the state untouched.
    pub async fn submit(&self, catalog: &CatalogState) -> Result<PurchaseRequest, SequencerError> {
        let mut session = self
            .lock_session("submit", &[PurchaseState::Idle, PurchaseState::FormFilled])
            .await?;
        let request = session.form.validate(catalog)?;
        session.request = Some(request.clone());
        self.set(PurchaseStatus::settled(PurchaseState::FormFilled));
        Ok(request)
    }

    /// Back out of review without paying.
    pub async fn cancel_review(&self) -> Result<(), SequencerError> {
        let mut session = self
            .lock_session("cancel", &[PurchaseState::FormFilled])
            .await?;
        session.request = None;
        self.set(PurchaseStatus::settled(PurchaseState::Idle));
        Ok(())
    }

    /// Pay for the reviewed request and request the topup.
    ///
    /// Returns [`AttemptOutcome::Ignored`] without touching the wallet, the
    /// chain or the backend if an attempt is already running or nothing is
    /// under review.
    pub async fn confirm(&self) -> AttemptOutcome {
        if self
            .is_submitting
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Purchase already in progress, ignoring confirmation");
            return AttemptOutcome::Ignored;
        }
        let _guard = SubmittingGuard(&self.is_submitting);

        if self.state() != PurchaseState::FormFilled {
            return AttemptOutcome::Ignored;
        }
        let Some(request) = self.session.lock().await.request.clone() else {
            return AttemptOutcome::Ignored;
        };

        let span = info_span!("purchase", attempt = %Uuid::new_v4(), operator_id = %request.operator_id);
        self.attempt(request).instrument(span).await
    }

    async fn attempt(&self, request: PurchaseRequest) -> AttemptOutcome {
        self.set(PurchaseStatus::new(
            PurchaseState::Confirming,
            events::PROCESSING_PAYMENT,
        ));

        let account = match self.connect().await {
            Ok(account) => account,
            Err(e) => {
                warn!(error = %e, "Wallet unavailable");
                return self.fail(PurchaseFailure::from_wallet(&e)).await;
            }
        };
        self.session.lock().await.account = Some(account);

        let tx_hash = match self.orchestrator.transfer(request.amount_minor).await {
            Ok(hash) => hash,
            Err(e) => {
                error!(error = %e, "Payment failed");
                return self.fail(PurchaseFailure::from_transfer(&e)).await;
            }
        };

        self.set(PurchaseStatus::new(
            PurchaseState::Fulfilling,
            events::SENDING_TOPUP,
        ));
        let topup = request.topup_request(tx_hash, &self.placeholders);
        match self.backend.send_topup(&topup).await {
            Ok(response) => {
                info!(tx_hash = %tx_hash, "Airtime topup accepted");
                let mut session = self.session.lock().await;
                session.form.reset();
                session.request = None;
                session.failure = None;
                self.set(PurchaseStatus::settled(PurchaseState::Succeeded));
                AttemptOutcome::Succeeded { tx_hash, response }
            }
            Err(e) => {
                error!(error = %e, tx_hash = %tx_hash, "Topup request failed after payment");
                self.fail(PurchaseFailure::from_topup(&e, tx_hash)).await
            }
        }
    }

    /// Use the wallet's current account, asking it to connect if it has none.
    async fn connect(&self) -> Result<Address, WalletError> {
        match self.wallet.account().await {
            Ok(Some(account)) => return Ok(account),
            Ok(None) => debug!("Wallet not connected, attempting to connect"),
            Err(e) => debug!(error = %e, "Wallet account lookup failed, attempting to connect"),
        }
        self.wallet.connect().await
    }

    async fn fail(&self, failure: PurchaseFailure) -> AttemptOutcome {
        self.session.lock().await.failure = Some(failure.clone());
        self.set(PurchaseStatus::settled(PurchaseState::Failed));
        AttemptOutcome::Failed(failure)
    }

    pub async fn failure(&self) -> Option<PurchaseFailure> {
        self.session.lock().await.failure.clone()
    }

    /// Close the result of the last attempt and go back to an empty form
    /// (after success) or the untouched form (after failure).
    pub async fn dismiss(&self) -> Result<(), SequencerError> {
        let mut session = self
            .lock_session("dismiss", &[PurchaseState::Failed, PurchaseState::Succeeded])
            .await?;
        if let Some(tx_hash) = session.failure.as_ref().and_then(|f| f.tx_hash) {
            warn!(tx_hash = %tx_hash, "Dismissed failure without reporting the payment");
        }
        session.failure = None;
        session.request = None;
        self.set(PurchaseStatus::settled(PurchaseState::Idle));
        Ok(())
    }

    /// File a failure report for the retained transfer hash.
    ///
    /// On success the hash is cleared and the sequencer goes back to idle.
    /// On failure everything is kept so the user can try again.
    pub async fn report_failure(&self) -> Result<FailureReport, SequencerError> {
        let mut session = self
            .lock_session("report", &[PurchaseState::Failed])
            .await?;
        let tx_hash = session
            .failure
            .as_ref()
            .and_then(|f| f.tx_hash)
            .ok_or(SequencerError::NothingToReport)?;
        let wallet = session.account.ok_or(SequencerError::NothingToReport)?;
        let usdc_amount = session.request.as_ref().map_or(0.0, |r| r.stable_amount);

        let report = FailureReport {
            transaction_hash: tx_hash.to_string(),
            wallet_address: wallet.to_string(),
            usdc_amount,
            timestamp: OffsetDateTime::now_utc(),
        };
        self.backend
            .submit_failure_report(&report)
            .await
            .map_err(|e| {
                error!(error = %e, tx_hash = %tx_hash, "Failure report rejected");
                SequencerError::Report(e)
            })?;

        info!(tx_hash = %tx_hash, "Failure report submitted");
        session.failure = None;
        session.request = None;
        self.set(PurchaseStatus::settled(PurchaseState::Idle));
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::erc20::IERC20;
    use crate::testing::{
        Call, FakeBackend, FakeChain, FakeWallet, OWNER, RECIPIENT, Trace, sample_countries,
        tx_hash,
    };
    use alloy_sol_types::SolCall;
    use reqwest::StatusCode;
    use tokio::sync::Notify;

    struct Harness {
        trace: Trace,
        chain: Arc<FakeChain>,
        backend: Arc<FakeBackend>,
        sequencer: Arc<PurchaseSequencer>,
    }

    fn harness(chain: FakeChain, wallet: FakeWallet) -> Harness {
        let trace = chain.trace.clone();
        let chain = Arc::new(chain);
        let backend = Arc::new(FakeBackend::new(trace.clone()));
        let sequencer = Arc::new(PurchaseSequencer::new(
            Arc::new(wallet),
            chain.clone(),
            backend.clone(),
            RECIPIENT,
            Duration::from_secs(60),
            Placeholders::default(),
        ));
        Harness {
            trace,
            chain,
            backend,
            sequencer,
        }
    }

    fn funded() -> Harness {
        let trace = Trace::default();
        harness(
            FakeChain::new(trace.clone()).with_allowance(2_000_000),
            FakeWallet::connected(trace),
        )
    }

    async fn review(sequencer: &PurchaseSequencer) {
        sequencer
            .update_form(|form| {
                form.select_country("Nigeria");
                form.select_operator("MTN");
                form.set_amount("1000");
                form.set_recipient_phone("+2348030000000");
            })
            .await
            .unwrap();
        sequencer
            .submit(&CatalogState::loaded(sample_countries()))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_confirmed_transfer_then_topup() {
        let h = funded();
        review(&h.sequencer).await;
        assert_eq!(h.sequencer.state(), PurchaseState::FormFilled);

        let outcome = h.sequencer.confirm().await;

        assert!(matches!(outcome, AttemptOutcome::Succeeded { tx_hash: hash, .. } if hash == tx_hash(1)));
        let calls = h.trace.calls();
        assert_eq!(calls.len(), 4);
        assert_eq!(calls[2], Call::WaitReceipt(tx_hash(1)));
        let Call::Topup(topup) = &calls[3] else {
            unreachable!("expected topup, got {:?}", calls[3]);
        };
        assert_eq!(topup.operator_id, "341");
        assert_eq!(topup.currency, "NGN");
        assert_eq!(topup.tx_hash, tx_hash(1).to_string());

        assert_eq!(h.sequencer.state(), PurchaseState::Succeeded);
        assert_eq!(*h.sequencer.subscribe().borrow(), PurchaseStatus::settled(PurchaseState::Succeeded));
        assert_eq!(h.sequencer.form().await, PurchaseForm::default());
        assert!(!h.sequencer.is_submitting());

        h.sequencer.dismiss().await.unwrap();
        assert_eq!(h.sequencer.state(), PurchaseState::Idle);
    }

    #[tokio::test]
    async fn test_reverted_transfer_never_requests_topup() {
        let h = funded();
        h.chain.revert(tx_hash(1));
        review(&h.sequencer).await;

        let outcome = h.sequencer.confirm().await;

        let AttemptOutcome::Failed(failure) = outcome else {
            unreachable!("expected failure, got {outcome:?}");
        };
        assert_eq!(failure.kind, FailureKind::Reverted);
        assert_eq!(failure.tx_hash, Some(tx_hash(1)));
        assert_eq!(h.trace.topups(), 0);
        assert_eq!(h.sequencer.state(), PurchaseState::Failed);
        assert_eq!(h.sequencer.failure().await, Some(failure));
        assert!(h.sequencer.subscribe().borrow().message.is_none());
    }

    #[tokio::test]
    async fn test_rejected_approval_has_no_hash() {
        let trace = Trace::default();
        let wallet = FakeWallet {
            reject_sends: true,
            ..FakeWallet::connected(trace.clone())
        };
        let h = harness(FakeChain::new(trace), wallet);
        review(&h.sequencer).await;

        let AttemptOutcome::Failed(failure) = h.sequencer.confirm().await else {
            unreachable!("expected failure");
        };
        assert_eq!(failure.kind, FailureKind::UserRejected);
        assert_eq!(failure.message, REJECTED_MESSAGE);
        assert_eq!(failure.tx_hash, None);
        assert!(matches!(
            h.sequencer.report_failure().await,
            Err(SequencerError::NothingToReport)
        ));
    }

    #[tokio::test]
    async fn test_topup_rejection_keeps_hash() {
        let h = funded();
        *h.backend.topup_status.lock().unwrap() = Some(StatusCode::BAD_REQUEST);
        review(&h.sequencer).await;

        let AttemptOutcome::Failed(failure) = h.sequencer.confirm().await else {
            unreachable!("expected failure");
        };
        assert_eq!(failure.kind, FailureKind::Api);
        assert_eq!(failure.message, "Operator unavailable");
        assert_eq!(failure.tx_hash, Some(tx_hash(1)));
        assert_eq!(h.trace.topups(), 1);
        // The form is only reset on success.
        assert_eq!(h.sequencer.form().await.amount(), "1000");
    }

    #[tokio::test]
    async fn test_report_clears_retained_hash() {
        let h = funded();
        h.chain.revert(tx_hash(1));
        review(&h.sequencer).await;
        h.sequencer.confirm().await;

        let report = h.sequencer.report_failure().await.unwrap();

        assert_eq!(report.transaction_hash, tx_hash(1).to_string());
        assert_eq!(report.wallet_address, OWNER.to_string());
        assert_eq!(report.usdc_amount, 2.0);
        assert!(matches!(h.trace.calls().last(), Some(Call::Report(r)) if *r == report));
        assert_eq!(h.sequencer.state(), PurchaseState::Idle);
        assert_eq!(h.sequencer.failure().await, None);
    }

    #[tokio::test]
    async fn test_failed_report_can_be_retried() {
        let h = funded();
        h.chain.revert(tx_hash(1));
        *h.backend.report_status.lock().unwrap() = Some(StatusCode::INTERNAL_SERVER_ERROR);
        review(&h.sequencer).await;
        h.sequencer.confirm().await;

        assert!(matches!(
            h.sequencer.report_failure().await,
            Err(SequencerError::Report(_))
        ));
        assert_eq!(h.sequencer.state(), PurchaseState::Failed);
        assert_eq!(
            h.sequencer.failure().await.and_then(|f| f.tx_hash),
            Some(tx_hash(1))
        );

        *h.backend.report_status.lock().unwrap() = None;
        h.sequencer.report_failure().await.unwrap();
        assert_eq!(h.sequencer.state(), PurchaseState::Idle);
    }

    #[tokio::test]
    async fn test_dismiss_failure() {
        let h = funded();
        h.chain.revert(tx_hash(1));
        review(&h.sequencer).await;
        h.sequencer.confirm().await;

        h.sequencer.dismiss().await.unwrap();
        assert_eq!(h.sequencer.state(), PurchaseState::Idle);
        assert_eq!(h.sequencer.failure().await, None);
        assert!(h.sequencer.confirm().await == AttemptOutcome::Ignored);
    }

    #[tokio::test]
    async fn test_second_confirmation_is_ignored() {
        let trace = Trace::default();
        let gate = Arc::new(Notify::new());
        let wallet = FakeWallet {
            gate: Some(gate.clone()),
            ..FakeWallet::connected(trace.clone())
        };
        let h = harness(
            FakeChain::new(trace.clone()).with_allowance(2_000_000),
            wallet,
        );
        review(&h.sequencer).await;

        let first = tokio::spawn({
            let sequencer = h.sequencer.clone();
            async move { sequencer.confirm().await }
        });
        while h.trace.calls().is_empty() {
            tokio::task::yield_now().await;
        }
        assert!(h.sequencer.is_submitting());
        assert_eq!(h.sequencer.state(), PurchaseState::PayingTransfer);

        let before = h.trace.calls();
        assert_eq!(h.sequencer.confirm().await, AttemptOutcome::Ignored);
        assert!(matches!(
            h.sequencer.submit(&CatalogState::loaded(sample_countries())).await,
            Err(SequencerError::Busy)
        ));
        assert_eq!(h.trace.calls(), before);

        gate.notify_one();
        let outcome = first.await.unwrap();
        assert!(matches!(outcome, AttemptOutcome::Succeeded { .. }));
        assert_eq!(h.trace.sends(), vec![IERC20::transferCall::SELECTOR]);
        assert_eq!(h.trace.topups(), 1);
        assert!(!h.sequencer.is_submitting());
    }

    #[tokio::test]
    async fn test_validation_error_keeps_state() {
        let h = funded();
        h.sequencer
            .update_form(|form| form.select_country("Nigeria"))
            .await
            .unwrap();

        let err = h
            .sequencer
            .submit(&CatalogState::loaded(sample_countries()))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            SequencerError::Validation(ValidationError::MissingOperator)
        ));
        assert_eq!(h.sequencer.state(), PurchaseState::Idle);
        assert_eq!(h.sequencer.confirm().await, AttemptOutcome::Ignored);
        assert!(h.trace.calls().is_empty());
    }

    #[tokio::test]
    async fn test_editing_during_review_returns_to_idle() {
        let h = funded();
        review(&h.sequencer).await;
        h.sequencer
            .update_form(|form| form.set_amount("2000"))
            .await
            .unwrap();
        assert_eq!(h.sequencer.state(), PurchaseState::Idle);

        review(&h.sequencer).await;
        h.sequencer.cancel_review().await.unwrap();
        assert_eq!(h.sequencer.state(), PurchaseState::Idle);
        assert_eq!(h.sequencer.confirm().await, AttemptOutcome::Ignored);
    }

    #[tokio::test]
    async fn test_auto_connects_wallet() {
        let trace = Trace::default();
        let h = harness(
            FakeChain::new(trace.clone()).with_allowance(2_000_000),
            FakeWallet::disconnected(trace, true),
        );
        review(&h.sequencer).await;

        let outcome = h.sequencer.confirm().await;

        assert!(matches!(outcome, AttemptOutcome::Succeeded { .. }));
        assert_eq!(h.trace.calls()[0], Call::Connect);
    }

    #[tokio::test]
    async fn test_connect_failure_requires_wallet() {
        let trace = Trace::default();
        let h = harness(
            FakeChain::new(trace.clone()),
            FakeWallet::disconnected(trace, false),
        );
        review(&h.sequencer).await;

        let AttemptOutcome::Failed(failure) = h.sequencer.confirm().await else {
            unreachable!("expected failure");
        };
        assert_eq!(failure.kind, FailureKind::WalletUnavailable);
        assert_eq!(failure.message, WALLET_REQUIRED_MESSAGE);
        assert_eq!(h.trace.calls(), vec![Call::Connect]);
    }

    #[tokio::test]
    async fn test_wrong_network_message() {
        let trace = Trace::default();
        let h = harness(
            FakeChain::new(trace.clone()).with_chain_id(137),
            FakeWallet::connected(trace),
        );
        review(&h.sequencer).await;

        let AttemptOutcome::Failed(failure) = h.sequencer.confirm().await else {
            unreachable!("expected failure");
        };
        assert_eq!(failure.kind, FailureKind::Network);
        assert_eq!(failure.message, NETWORK_MESSAGE);
    }

    #[test]
    fn test_failure_messages() {
        assert_eq!(
            FailureKind::InsufficientFunds.message("insufficient funds for gas"),
            "insufficient funds for gas"
        );
        assert_eq!(FailureKind::Other.message(""), GENERIC_MESSAGE);
        assert_eq!(FailureKind::UserRejected.message("whatever"), REJECTED_MESSAGE);
        let failure = PurchaseFailure::from_wallet(&WalletError::InsufficientFunds(
            "insufficient funds for transfer".to_string(),
        ));
        assert_eq!(failure.kind, FailureKind::InsufficientFunds);
        assert_eq!(failure.message, "insufficient funds for transfer");
    }

    #[test]
    fn test_topup_fallback_message() {
        let error = ClientError::Api {
            status: StatusCode::BAD_GATEWAY,
            error: None,
            body: "<html>".to_string(),
        };
        let failure = PurchaseFailure::from_topup(&error, tx_hash(9));
        assert_eq!(failure.message, API_FALLBACK_MESSAGE);
        assert_eq!(failure.tx_hash, Some(tx_hash(9)));
    }

    #[tokio::test]
    async fn test_reverted_approval_never_requests_topup() {
        let trace = Trace::default();
        let h = harness(FakeChain::new(trace.clone()), FakeWallet::connected(trace));
        h.chain.revert(tx_hash(1));
        review(&h.sequencer).await;

        let AttemptOutcome::Failed(failure) = h.sequencer.confirm().await else {
            unreachable!("expected failure");
        };
        assert_eq!(failure.kind, FailureKind::Reverted);
        // Only the transfer hash is ever kept for reporting.
        assert_eq!(failure.tx_hash, None);
        assert_eq!(h.trace.sends(), vec![IERC20::approveCall::SELECTOR]);
        assert_eq!(h.trace.topups(), 0);
        assert_eq!(h.sequencer.state(), PurchaseState::Failed);
    }

    #[tokio::test]
    async fn test_unconfirmed_transfer_never_requests_topup() {
        let h = funded();
        h.chain.stall(tx_hash(1));
        review(&h.sequencer).await;

        let AttemptOutcome::Failed(failure) = h.sequencer.confirm().await else {
            unreachable!("expected failure");
        };
        assert_eq!(failure.tx_hash, Some(tx_hash(1)));
        assert_eq!(h.trace.calls().last(), Some(&Call::WaitReceipt(tx_hash(1))));
        assert_eq!(h.trace.topups(), 0);
        assert_eq!(h.sequencer.state(), PurchaseState::Failed);
    }

    #[tokio::test]
    async fn test_edit_waiting_on_session_sees_started_attempt() {
        let h = funded();
        review(&h.sequencer).await;

        let session = h.sequencer.session.lock().await;
        let edit = tokio::spawn({
            let sequencer = h.sequencer.clone();
            async move { sequencer.update_form(|form| form.set_amount("5")).await }
        });
        tokio::task::yield_now().await;
        h.sequencer.is_submitting.store(true, Ordering::Release);
        drop(session);

        assert!(matches!(edit.await.unwrap(), Err(SequencerError::Busy)));
        h.sequencer.is_submitting.store(false, Ordering::Release);
        assert_eq!(h.sequencer.state(), PurchaseState::FormFilled);
        assert_eq!(h.sequencer.form().await.amount(), "1000");
        assert!(matches!(
            h.sequencer.confirm().await,
            AttemptOutcome::Succeeded { .. }
        ));
    }
}

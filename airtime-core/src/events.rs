//! Purchase status broadcasting.
//!
//! The sequencer and the transfer orchestrator publish where an attempt is
//! on a `watch` channel so a front end can render progress without polling.
//! Only the latest status matters, so nothing is queued.

use tokio::sync::watch;

/// States of a purchase attempt.
///
/// Happy path: `Idle → FormFilled → Confirming → PayingApprove →
/// PayingTransfer → Fulfilling → Succeeded`. `PayingApprove` is skipped when
/// the allowance already covers the amount. Any state may end in `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PurchaseState {
    #[default]
    Idle,
    /// Form validated, summary shown, waiting for the user to confirm.
    FormFilled,
    /// Confirmed; connecting the wallet before paying.
    Confirming,
    PayingApprove,
    PayingTransfer,
    /// Payment confirmed on-chain, topup request in flight.
    Fulfilling,
    Succeeded,
    Failed,
}

impl PurchaseState {
    /// True while an attempt is running and a new one must not start.
    pub fn is_in_flight(self) -> bool {
        matches!(
            self,
            PurchaseState::Confirming
                | PurchaseState::PayingApprove
                | PurchaseState::PayingTransfer
                | PurchaseState::Fulfilling
        )
    }
}

impl std::fmt::Display for PurchaseState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PurchaseState::Idle => "idle",
            PurchaseState::FormFilled => "form_filled",
            PurchaseState::Confirming => "confirming",
            PurchaseState::PayingApprove => "paying_approve",
            PurchaseState::PayingTransfer => "paying_transfer",
            PurchaseState::Fulfilling => "fulfilling",
            PurchaseState::Succeeded => "succeeded",
            PurchaseState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Snapshot published on every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PurchaseStatus {
    pub state: PurchaseState,
    /// Human-readable progress line, cleared when the attempt ends.
    pub message: Option<&'static str>,
}

impl PurchaseStatus {
    pub const fn new(state: PurchaseState, message: &'static str) -> Self {
        Self {
            state,
            message: Some(message),
        }
    }

    pub const fn settled(state: PurchaseState) -> Self {
        Self {
            state,
            message: None,
        }
    }
}

/// Sender handle for purchase status updates.
pub type StatusSender = watch::Sender<PurchaseStatus>;
/// Receiver handle for purchase status updates.
pub type StatusReceiver = watch::Receiver<PurchaseStatus>;

/// Create a new status channel starting at `Idle`.
pub fn status_channel() -> (StatusSender, StatusReceiver) {
    watch::channel(PurchaseStatus::default())
}

pub const PROCESSING_PAYMENT: &str = "Processing payment...";
pub const APPROVING: &str = "Approving USDC spend...";
pub const WAITING_FOR_APPROVAL: &str = "Waiting for approval confirmation...";
pub const TRANSFERRING: &str = "Transferring USDC...";
pub const WAITING_FOR_TRANSFER: &str = "Waiting for transfer confirmation...";
pub const SENDING_TOPUP: &str = "Sending airtime topup request...";

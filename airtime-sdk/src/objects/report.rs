use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Request body for `POST /submit-failure-report`.
///
/// Filed by the user when a payment left the wallet (or may have) but no
/// airtime was delivered, so the backend can reconcile it by hand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureReport {
    pub transaction_hash: String,
    pub wallet_address: String,
    pub usdc_amount: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

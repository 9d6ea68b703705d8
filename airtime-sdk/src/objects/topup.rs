use compact_str::CompactString;
use serde::{Deserialize, Serialize};

/// Request body for `POST /send-topup`.
///
/// Sent only after the stablecoin transfer backing it has been confirmed
/// on-chain; `tx_hash` is the proof of payment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopupRequest {
    pub operator_id: String,
    /// Local currency amount entered by the user.
    pub amount: f64,
    pub currency: CompactString,
    pub recipient_phone: String,
    pub sender_phone: String,
    pub recipient_email: String,
    #[serde(rename = "tx_hash")]
    pub tx_hash: String,
    pub country_code: CompactString,
}

pub mod blockchains;
pub mod catalog;
pub mod report;
pub mod topup;

pub use blockchains::{Network, Stablecoin};
pub use catalog::{AirtimeService, Country, Services, ServicesData};
pub use report::FailureReport;
pub use topup::TopupRequest;

use serde::{Deserialize, Serialize};

/// Error body returned by the backend alongside a non-2xx status.
///
/// Every field is optional because the backend is not consistent about it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub error: Option<String>,
}

impl ApiErrorBody {
    /// Extract the `error` field from a raw response body, if it has one.
    pub fn from_body(body: &str) -> Option<String> {
        serde_json::from_str::<ApiErrorBody>(body)
            .ok()
            .and_then(|b| b.error)
            .filter(|e| !e.is_empty())
    }
}

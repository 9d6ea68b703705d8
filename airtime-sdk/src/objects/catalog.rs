//! Catalog types returned by `GET /services-data`.

use compact_str::CompactString;
use serde::{Deserialize, Serialize};

/// A single airtime product offered by a mobile network operator.
///
/// Several services may share the same `network_operator`; they differ by
/// nominal amount.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirtimeService {
    /// Operator display name.
    pub network_operator: String,
    /// Opaque backend key for the operator's airtime product.
    pub operator_id: String,
    /// Nominal amount in local currency.
    pub amount: f64,
    /// ISO currency code of `amount`.
    pub currency: CompactString,
    /// Precomputed stablecoin value of `amount`.
    pub usdc_value: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Services {
    #[serde(default)]
    pub airtime: Vec<AirtimeService>,
}

/// A country and its airtime catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Country {
    /// Display name, unique within a catalog.
    pub name: String,
    pub country_code: CompactString,
    /// Local currency units per one stablecoin unit.
    pub exchange_rate: f64,
    #[serde(default)]
    pub services: Services,
}

/// Response body of `GET /services-data`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServicesData {
    pub countries: Vec<Country>,
}

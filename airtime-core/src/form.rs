//! Purchase form state and validation.

use crate::catalog::CatalogState;
use crate::chain::{TxHash, U256};
use crate::config::Placeholders;
use crate::price::{format_usd, parse_amount, to_minor_units, to_stable_amount};
use airtime_sdk::objects::TopupRequest;
use compact_str::CompactString;
use std::fmt;
use thiserror::Error;

/// Why a form cannot be submitted. The message is shown to the user as is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please select a country.")]
    MissingCountry,
    #[error("Please select an operator.")]
    MissingOperator,
    #[error("Please enter a valid amount.")]
    InvalidAmount,
    #[error("Please enter recipient phone number.")]
    MissingRecipientPhone,
    #[error("Unknown country: {0}")]
    UnknownCountry(String),
    #[error("{operator} does not sell airtime in {country}")]
    UnknownOperator { country: String, operator: String },
}

/// What the user has typed or picked so far.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PurchaseForm {
    country: Option<String>,
    operator: Option<String>,
    amount: String,
    recipient_phone: String,
}

impl PurchaseForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pick a country. The operator and amount belong to the previous
    /// country, so both are cleared.
    pub fn select_country(&mut self, name: impl Into<String>) {
        self.country = Some(name.into());
        self.operator = None;
        self.amount.clear();
    }

    pub fn select_operator(&mut self, name: impl Into<String>) {
        self.operator = Some(name.into());
    }

    pub fn set_amount(&mut self, amount: impl Into<String>) {
        self.amount = amount.into();
    }

    pub fn set_recipient_phone(&mut self, phone: impl Into<String>) {
        self.recipient_phone = phone.into();
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn country(&self) -> Option<&str> {
        self.country.as_deref()
    }

    pub fn operator(&self) -> Option<&str> {
        self.operator.as_deref()
    }

    pub fn amount(&self) -> &str {
        &self.amount
    }

    pub fn recipient_phone(&self) -> &str {
        &self.recipient_phone
    }

    /// Live stablecoin value of the typed amount, `0` until it makes sense.
    pub fn stable_amount(&self, catalog: &CatalogState) -> f64 {
        let rate = self
            .country()
            .and_then(|c| catalog.find_country(c))
            .map_or(0.0, |c| c.exchange_rate);
        to_stable_amount(parse_amount(&self.amount), rate)
    }

    /// Check every field and resolve it against the catalog.
    pub fn validate(&self, catalog: &CatalogState) -> Result<PurchaseRequest, ValidationError> {
        let country_name = self
            .country()
            .filter(|c| !c.is_empty())
            .ok_or(ValidationError::MissingCountry)?;
        let operator = self
            .operator()
            .filter(|o| !o.is_empty())
            .ok_or(ValidationError::MissingOperator)?;
        let local_amount = parse_amount(&self.amount);
        if !local_amount.is_finite() || local_amount <= 0.0 {
            return Err(ValidationError::InvalidAmount);
        }
        let recipient_phone = self.recipient_phone.trim();
        if recipient_phone.is_empty() {
            return Err(ValidationError::MissingRecipientPhone);
        }

        let country = catalog
            .find_country(country_name)
            .ok_or_else(|| ValidationError::UnknownCountry(country_name.to_string()))?;
        let operator_id = catalog
            .operator_id(country_name, operator)
            .ok_or_else(|| ValidationError::UnknownOperator {
                country: country_name.to_string(),
                operator: operator.to_string(),
            })?;
        let currency = catalog.currency_for(country_name).unwrap_or_default();

        let stable_amount = to_stable_amount(local_amount, country.exchange_rate);
        let amount_minor = to_minor_units(stable_amount).ok_or(ValidationError::InvalidAmount)?;

        Ok(PurchaseRequest {
            country: country.name.clone(),
            country_code: country.country_code.clone(),
            operator: operator.to_string(),
            operator_id: operator_id.to_string(),
            currency: currency.into(),
            local_amount,
            stable_amount,
            amount_minor,
            recipient_phone: recipient_phone.to_string(),
        })
    }
}

/// A validated purchase, alive from submit until success or dismissal.
#[derive(Debug, Clone, PartialEq)]
pub struct PurchaseRequest {
    pub country: String,
    pub country_code: CompactString,
    pub operator: String,
    pub operator_id: String,
    pub currency: CompactString,
    pub local_amount: f64,
    pub stable_amount: f64,
    /// `stable_amount` rounded to the token's minor unit.
    pub amount_minor: U256,
    pub recipient_phone: String,
}

impl PurchaseRequest {
    /// Body of the topup request backed by the confirmed transfer `tx_hash`.
    pub fn topup_request(&self, tx_hash: TxHash, placeholders: &Placeholders) -> TopupRequest {
        TopupRequest {
            operator_id: self.operator_id.clone(),
            amount: self.local_amount,
            currency: self.currency.clone(),
            recipient_phone: self.recipient_phone.clone(),
            sender_phone: placeholders.sender_phone.clone(),
            recipient_email: placeholders.recipient_email.clone(),
            tx_hash: tx_hash.to_string(),
            country_code: self.country_code.clone(),
        }
    }

    pub fn summary(&self) -> PurchaseSummary<'_> {
        PurchaseSummary(self)
    }
}

/// Review screen shown before the user confirms.
pub struct PurchaseSummary<'a>(&'a PurchaseRequest);

impl fmt::Display for PurchaseSummary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let request = self.0;
        writeln!(f, "Country:   {}", request.country)?;
        writeln!(f, "Operator:  {}", request.operator)?;
        writeln!(f, "Amount:    {} {}", request.local_amount, request.currency)?;
        writeln!(
            f,
            "USDC:      {}",
            format_usd(request.stable_amount).unwrap_or_else(|| "-".to_string())
        )?;
        write!(f, "Recipient: {}", request.recipient_phone)
    }
}

//! Backend API client (mini app → AirtimePlus API).
//!
//! Every call is a single request/response round trip. Nothing is retried
//! here; recovery is always left to the user.

use reqwest::Client;
use reqwest::header::ACCEPT;
use url::Url;

use super::ClientError;
use crate::objects::{ApiErrorBody, Country, FailureReport, ServicesData, TopupRequest};

/// Production API root.
pub const DEFAULT_API_BASE: &str = "https://airtimeplus-api.vercel.app";

/// Typed HTTP client for the AirtimePlus backend.
#[derive(Debug, Clone)]
pub struct BackendClient {
    http: Client,
    base_url: Url,
}

impl BackendClient {
    /// Create a new `BackendClient`.
    ///
    /// `base_url` may carry a path prefix; endpoints are resolved below it.
    pub fn new(mut base_url: Url) -> Self {
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Self {
            http: Client::new(),
            base_url,
        }
    }

    /// Replace the default `reqwest::Client` with a custom one (e.g. to
    /// configure timeouts or a proxy).
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        Ok(self.base_url.join(path)?)
    }

    /// `GET /services-data` – the country, operator and exchange-rate catalog.
    ///
    /// Fails unless the body carries a `countries` array.
    #[tracing::instrument(skip_all, err, name = "API:services-data")]
    pub async fn services_data(&self) -> Result<Vec<Country>, ClientError> {
        let resp = self
            .http
            .get(self.endpoint("services-data")?)
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        let data: ServicesData = parse_response(resp).await?;
        tracing::debug!(countries = data.countries.len(), "Catalog fetched");
        Ok(data.countries)
    }

    /// `GET /user-info/{address}` – opaque per-wallet profile, passed through.
    #[tracing::instrument(skip(self), err, name = "API:user-info")]
    pub async fn user_info(&self, address: &str) -> Result<serde_json::Value, ClientError> {
        let path = format!("user-info/{}", urlencoding::encode(address));
        let resp = self
            .http
            .get(self.endpoint(&path)?)
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        parse_response(resp).await
    }

    /// `POST /send-topup` – request airtime delivery for a confirmed payment.
    #[tracing::instrument(skip_all, err, name = "API:send-topup", fields(tx_hash = %request.tx_hash))]
    pub async fn send_topup(
        &self,
        request: &TopupRequest,
    ) -> Result<serde_json::Value, ClientError> {
        let resp = self
            .http
            .post(self.endpoint("send-topup")?)
            .header(ACCEPT, "application/json")
            .json(request)
            .send()
            .await?;

        parse_response(resp).await
    }

    /// `POST /submit-failure-report` – only the status code matters.
    #[tracing::instrument(skip_all, err, name = "API:submit-failure-report", fields(tx_hash = %report.transaction_hash))]
    pub async fn submit_failure_report(&self, report: &FailureReport) -> Result<(), ClientError> {
        let resp = self
            .http
            .post(self.endpoint("submit-failure-report")?)
            .json(report)
            .send()
            .await?;

        check_status(resp).await.map(drop)
    }
}

async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, ClientError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(ClientError::Api {
        status,
        error: ApiErrorBody::from_body(&body),
        body,
    })
}

async fn parse_response<T: serde::de::DeserializeOwned>(
    resp: reqwest::Response,
) -> Result<T, ClientError> {
    let resp = check_status(resp).await?;
    let status = resp.status();
    let bytes = resp.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|source| ClientError::Decode { status, source })
}

//! Country and operator catalog.
//!
//! The catalog is fetched once per session and only read afterwards.
//! [`CatalogRepository`] holds it behind a lock and bumps a version counter
//! whenever it is replaced, so a front end can redraw when loading finishes.

use airtime_sdk::client::{BackendClient, ClientError};
use airtime_sdk::objects::Country;
use async_trait::async_trait;
use itertools::Itertools;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{RwLock, RwLockReadGuard, watch};
use tracing::{error, info};

pub const LOAD_FAILED: &str = "Failed to load countries. Please try again later.";
pub const SERVER_UNREACHABLE: &str =
    "Failed to connect to the server. Please check if the server is running.";

/// Where the catalog comes from.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn fetch_countries(&self) -> Result<Vec<Country>, ClientError>;
}

#[async_trait]
impl CatalogSource for BackendClient {
    async fn fetch_countries(&self) -> Result<Vec<Country>, ClientError> {
        self.services_data().await
    }
}

/// Snapshot of the catalog as the front end sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogState {
    countries: Vec<Country>,
    loading: bool,
    error: Option<&'static str>,
    api_error: Option<&'static str>,
}

impl Default for CatalogState {
    fn default() -> Self {
        Self {
            countries: Vec::new(),
            loading: true,
            error: None,
            api_error: None,
        }
    }
}

impl CatalogState {
    /// A loaded catalog, mostly useful for front ends that fetch on their own.
    pub fn loaded(countries: Vec<Country>) -> Self {
        Self {
            countries,
            loading: false,
            error: None,
            api_error: None,
        }
    }

    pub fn countries(&self) -> &[Country] {
        &self.countries
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// User-facing message set when the last load failed.
    pub fn error(&self) -> Option<&'static str> {
        self.error
    }

    /// Secondary message pointing at the backend.
    pub fn api_error(&self) -> Option<&'static str> {
        self.api_error
    }

    /// Whether the country and operator selectors can be used.
    pub fn is_selectable(&self) -> bool {
        !self.loading && !self.countries.is_empty()
    }

    pub fn find_country(&self, name: &str) -> Option<&Country> {
        self.countries.iter().find(|c| c.name == name)
    }

    /// Operator names offered in `country`, first occurrence order kept.
    pub fn operators_for(&self, country: &str) -> Vec<&str> {
        self.find_country(country)
            .map(|c| {
                c.services
                    .airtime
                    .iter()
                    .map(|s| s.network_operator.as_str())
                    .unique()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Backend key of the first service sold under `operator`.
    pub fn operator_id(&self, country: &str, operator: &str) -> Option<&str> {
        self.find_country(country)?
            .services
            .airtime
            .iter()
            .find(|s| s.network_operator == operator)
            .map(|s| s.operator_id.as_str())
    }

    /// Local currency, as reported by the country's first airtime service.
    pub fn currency_for(&self, country: &str) -> Option<&str> {
        self.find_country(country)?
            .services
            .airtime
            .first()
            .map(|s| s.currency.as_str())
    }
}

/// Shared, versioned catalog with change notification.
#[derive(Clone)]
pub struct CatalogRepository {
    inner: Arc<CatalogRepositoryInner>,
}

struct CatalogRepositoryInner {
    state: RwLock<CatalogState>,
    version: AtomicU64,
    version_tx: watch::Sender<u64>,
}

/// Receives a notification every time the catalog state changes.
pub struct CatalogWatcher {
    version_rx: watch::Receiver<u64>,
}

impl Default for CatalogRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl CatalogRepository {
    /// Create an empty repository in the loading state.
    pub fn new() -> Self {
        let (version_tx, _) = watch::channel(0u64);
        Self {
            inner: Arc::new(CatalogRepositoryInner {
                state: RwLock::new(CatalogState::default()),
                version: AtomicU64::new(0),
                version_tx,
            }),
        }
    }

    async fn update<F: FnOnce(&mut CatalogState)>(&self, f: F) {
        let mut guard = self.inner.state.write().await;
        f(&mut guard);
        let version = self.inner.version.fetch_add(1, Ordering::Relaxed) + 1;
        drop(guard);
        let _ = self.inner.version_tx.send(version);
    }

    /// Fetch the catalog from `source` and replace the current one.
    ///
    /// On failure the previous countries are left as they were and the error
    /// messages are set. Returns the number of countries loaded.
    pub async fn load(&self, source: &dyn CatalogSource) -> Result<usize, ClientError> {
        self.update(|state| {
            state.loading = true;
            state.error = None;
            state.api_error = None;
        })
        .await;

        match source.fetch_countries().await {
            Ok(countries) => {
                let count = countries.len();
                info!(countries = count, "Catalog loaded");
                self.update(|state| {
                    state.countries = countries;
                    state.loading = false;
                })
                .await;
                Ok(count)
            }
            Err(e) => {
                error!(error = %e, "Failed to load catalog");
                self.update(|state| {
                    state.loading = false;
                    state.error = Some(LOAD_FAILED);
                    state.api_error = Some(SERVER_UNREACHABLE);
                })
                .await;
                Err(e)
            }
        }
    }

    pub async fn read(&self) -> RwLockReadGuard<'_, CatalogState> {
        self.inner.state.read().await
    }

    /// Clone the current state.
    pub async fn snapshot(&self) -> CatalogState {
        self.inner.state.read().await.clone()
    }

    pub fn subscribe(&self) -> CatalogWatcher {
        CatalogWatcher {
            version_rx: self.inner.version_tx.subscribe(),
        }
    }
}

impl CatalogWatcher {
    /// Wait for the next change. Errors once the repository is dropped.
    pub async fn changed(&mut self) -> Result<(), watch::error::RecvError> {
        self.version_rx.changed().await
    }
}

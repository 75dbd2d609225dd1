//! Async wrapper around [`BoosterSdk`] for use in async runtimes (Tokio, etc.).
//!
//! Catalog downloads and booster-service calls are blocking; this wrapper
//! runs them on [`tokio::task::spawn_blocking`] so the event loop stays free.
//! The reveal machine itself is synchronous and is driven directly by the
//! caller with the results returned here.
//!
//! # Example
//!
//! ```no_run
//! use booster_sdk::{AsyncBoosterSdk, OpenBoosterRequest};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let sdk = AsyncBoosterSdk::builder().build().await.unwrap();
//!     let catalog = sdk.catalog().await.unwrap();
//!
//!     let service = sdk.simulated_service(3).await.unwrap();
//!     let mut reveal = booster_sdk::RevealMachine::new(catalog);
//!     let request = OpenBoosterRequest::for_booster("op01");
//!     let token = reveal.request_open(&request).unwrap();
//!     let outcome = sdk.open_booster(service.clone(), request).await;
//!     reveal.receive_result(token, outcome).unwrap();
//! }
//! ```

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::booster::PackDraw;
use crate::catalog::Catalog;
use crate::config::DrawRules;
use crate::error::{BoosterError, Result};
use crate::models::{BoosterOpenResult, OpenBoosterRequest};
use crate::service::{BoosterService, SimulatedBoosterService};
use crate::BoosterSdk;

// ---------------------------------------------------------------------------
// AsyncBoosterSdkBuilder
// ---------------------------------------------------------------------------

/// Builder for configuring and constructing an [`AsyncBoosterSdk`] instance.
pub struct AsyncBoosterSdkBuilder {
    api_base: Option<String>,
    cache_dir: Option<PathBuf>,
    offline: bool,
    timeout: Duration,
    rules: DrawRules,
    catalog: Option<Catalog>,
}

impl Default for AsyncBoosterSdkBuilder {
    fn default() -> Self {
        Self {
            api_base: None,
            cache_dir: None,
            offline: false,
            timeout: Duration::from_secs(30),
            rules: DrawRules::default(),
            catalog: None,
        }
    }
}

impl AsyncBoosterSdkBuilder {
    pub fn api_base(mut self, url: impl Into<String>) -> Self {
        self.api_base = Some(url.into());
        self
    }

    pub fn cache_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.cache_dir = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn offline(mut self, offline: bool) -> Self {
        self.offline = offline;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn rules(mut self, rules: DrawRules) -> Self {
        self.rules = rules;
        self
    }

    pub fn catalog(mut self, catalog: Catalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Build the async SDK on the blocking thread pool.
    pub async fn build(self) -> Result<AsyncBoosterSdk> {
        tokio::task::spawn_blocking(move || {
            let mut builder = BoosterSdk::builder()
                .offline(self.offline)
                .timeout(self.timeout)
                .rules(self.rules);
            if let Some(url) = self.api_base {
                builder = builder.api_base(url);
            }
            if let Some(dir) = self.cache_dir {
                builder = builder.cache_dir(dir);
            }
            if let Some(catalog) = self.catalog {
                builder = builder.catalog(catalog);
            }
            let sdk = builder.build()?;
            Ok(AsyncBoosterSdk {
                inner: Arc::new(Mutex::new(sdk)),
            })
        })
        .await
        .map_err(|e| BoosterError::InvalidArgument(format!("Task join error: {e}")))?
    }
}

// ---------------------------------------------------------------------------
// AsyncBoosterSdk
// ---------------------------------------------------------------------------

/// Async wrapper around [`BoosterSdk`].
///
/// The SDK is kept behind a [`Mutex`] because its catalog repository uses
/// `RefCell` internally.
pub struct AsyncBoosterSdk {
    inner: Arc<Mutex<BoosterSdk>>,
}

impl AsyncBoosterSdk {
    pub fn builder() -> AsyncBoosterSdkBuilder {
        AsyncBoosterSdkBuilder::default()
    }

    /// Run a sync SDK operation on the blocking thread pool.
    pub async fn run<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&BoosterSdk) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let sdk = self.inner.clone();
        tokio::task::spawn_blocking(move || {
            let guard = sdk
                .lock()
                .map_err(|_| BoosterError::InvalidArgument("SDK lock poisoned".into()))?;
            f(&guard)
        })
        .await
        .map_err(|e| BoosterError::InvalidArgument(format!("Task join error: {e}")))?
    }

    /// Load the catalog asynchronously.
    pub async fn catalog(&self) -> Result<Arc<Catalog>> {
        self.run(|s| s.catalog()).await
    }

    /// Draw one pack of `booster_id` locally.
    pub async fn open_pack(&self, booster_id: impl Into<String>) -> Result<PackDraw> {
        let booster_id = booster_id.into();
        self.run(move |s| s.resolver()?.open_pack(&booster_id)).await
    }

    /// Perform a booster-service call on the blocking pool.
    pub async fn open_booster(
        &self,
        service: Arc<dyn BoosterService>,
        request: OpenBoosterRequest,
    ) -> Result<BoosterOpenResult> {
        tokio::task::spawn_blocking(move || service.open(&request))
            .await
            .map_err(|e| BoosterError::InvalidArgument(format!("Task join error: {e}")))?
    }

    /// Build a [`SimulatedBoosterService`] with `available` openings.
    ///
    /// Keep the returned handle and pass clones of it to
    /// [`open_booster`](Self::open_booster); the allowance and owned set live
    /// in the service.
    pub async fn simulated_service(&self, available: i64) -> Result<Arc<SimulatedBoosterService>> {
        self.run(move |s| s.simulated_service(available).map(Arc::new))
            .await
    }

    /// Check for a newer catalog version and drop the cached catalog if stale.
    pub async fn refresh(&self) -> Result<bool> {
        let sdk = self.inner.clone();
        tokio::task::spawn_blocking(move || {
            let mut guard = sdk
                .lock()
                .map_err(|_| BoosterError::InvalidArgument("SDK lock poisoned".into()))?;
            guard.refresh()
        })
        .await
        .map_err(|e| BoosterError::InvalidArgument(format!("Task join error: {e}")))?
    }
}

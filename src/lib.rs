//! Booster SDK for Rust.
//!
//! Core of a trading-card client's booster flow: a rarity resolver that draws
//! packs from a probability table, a catalog repository backed by a local
//! file cache, and a reveal state machine that exposes an opened pack one
//! card at a time.
//!
//! # Quick start
//!
//! ```no_run
//! use booster_sdk::{BoosterSdk, OpenBoosterRequest};
//!
//! let sdk = BoosterSdk::builder()
//!     .api_base("https://cards.example.com/api")
//!     .build()
//!     .unwrap();
//!
//! // Draw a pack locally
//! let pack = sdk.resolver().unwrap().open_pack("op01").unwrap();
//!
//! // Open through the booster service and reveal it card by card
//! let service = sdk.http_service().unwrap();
//! let mut reveal = sdk.reveal_machine().unwrap();
//! reveal.open_with(&service, &OpenBoosterRequest::for_booster("op01")).unwrap();
//! while let Ok(event) = reveal.reveal_next() {
//!     println!("{} ({})", event.card_id, event.rarity);
//! }
//! ```

#[cfg(feature = "async")]
pub mod async_client;
pub mod booster;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod error;
pub mod models;
pub mod service;
pub mod stats;

#[cfg(feature = "async")]
pub use async_client::AsyncBoosterSdk;
pub use booster::{
    Delivery, PackDraw, RarityResolver, RequestToken, RevealEvent, RevealMachine, RevealObserver,
    RevealPhase, RevealSession,
};
pub use cache::CacheManager;
pub use catalog::{Catalog, CatalogRepository};
pub use config::DrawRules;
pub use error::{BoosterError, Result};
pub use models::{
    BoosterOpenResult, BoosterPackDefinition, CardDefinition, OpenBoosterRequest, Rarity,
    RarityTable, UserCardEntry,
};
pub use service::{BoosterService, HttpBoosterService, SimulatedBoosterService};

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

// ---------------------------------------------------------------------------
// BoosterSdkBuilder
// ---------------------------------------------------------------------------

/// Builder for configuring and constructing a [`BoosterSdk`] instance.
///
/// Use [`BoosterSdk::builder()`] to obtain a builder, chain configuration
/// methods, and call [`build()`](BoosterSdkBuilder::build) to create the SDK.
pub struct BoosterSdkBuilder {
    api_base: String,
    cache_dir: Option<PathBuf>,
    offline: bool,
    timeout: Duration,
    rules: DrawRules,
    auth_token: Option<String>,
    catalog: Option<Catalog>,
}

impl Default for BoosterSdkBuilder {
    fn default() -> Self {
        Self {
            api_base: config::DEFAULT_API_BASE.to_string(),
            cache_dir: None,
            offline: false,
            timeout: Duration::from_secs(30),
            rules: DrawRules::default(),
            auth_token: None,
            catalog: None,
        }
    }
}

impl BoosterSdkBuilder {
    /// Base URL of the REST API serving the catalog and booster endpoints.
    pub fn api_base(mut self, url: impl Into<String>) -> Self {
        self.api_base = url.into();
        self
    }

    /// Set a custom cache directory.
    ///
    /// If not set, the platform cache directory is used
    /// (e.g. `~/.cache/booster-sdk` on Linux).
    pub fn cache_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.cache_dir = Some(path.as_ref().to_path_buf());
        self
    }

    /// When offline the SDK never downloads and only uses cached files.
    /// Defaults to `false`.
    pub fn offline(mut self, offline: bool) -> Self {
        self.offline = offline;
        self
    }

    /// HTTP request timeout. Defaults to 30 seconds.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn rules(mut self, rules: DrawRules) -> Self {
        self.rules = rules;
        self
    }

    /// Bearer token sent by [`BoosterSdk::http_service`].
    pub fn auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    /// Use an in-memory catalog instead of loading one through the cache.
    pub fn catalog(mut self, catalog: Catalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Build the SDK.
    ///
    /// Validates the draw rules and prepares the cache directory; the catalog
    /// itself is loaded lazily on first use.
    pub fn build(self) -> Result<BoosterSdk> {
        self.rules.table.validate()?;

        let repository = match self.catalog {
            Some(catalog) => CatalogRepository::from_catalog(catalog),
            None => {
                let cache = CacheManager::new(
                    self.cache_dir,
                    self.api_base.clone(),
                    self.offline,
                    self.timeout,
                )?;
                CatalogRepository::new(cache)
            }
        };

        Ok(BoosterSdk {
            repository,
            rules: self.rules,
            api_base: self.api_base,
            timeout: self.timeout,
            auth_token: self.auth_token,
        })
    }
}

// ---------------------------------------------------------------------------
// BoosterSdk
// ---------------------------------------------------------------------------

/// The main entry point for the booster SDK.
///
/// Owns the [`CatalogRepository`] and the [`DrawRules`], and hands out
/// resolvers, reveal machines and service clients bound to them.
pub struct BoosterSdk {
    repository: CatalogRepository,
    rules: DrawRules,
    api_base: String,
    timeout: Duration,
    auth_token: Option<String>,
}

impl BoosterSdk {
    /// Create a new builder for configuring the SDK.
    pub fn builder() -> BoosterSdkBuilder {
        BoosterSdkBuilder::default()
    }

    /// Load the catalog on first call and return a shared handle to it.
    pub fn catalog(&self) -> Result<Arc<Catalog>> {
        self.repository.load()
    }

    pub fn repository(&self) -> &CatalogRepository {
        &self.repository
    }

    pub fn rules(&self) -> &DrawRules {
        &self.rules
    }

    /// Access the rarity resolver for the loaded catalog.
    pub fn resolver(&self) -> Result<RarityResolver<'_>> {
        let catalog = self.repository.load_ref()?;
        Ok(RarityResolver::new(catalog, &self.rules))
    }

    /// A fresh reveal machine expecting packs of the configured size.
    pub fn reveal_machine(&self) -> Result<RevealMachine> {
        Ok(RevealMachine::new(self.catalog()?).pack_size(self.rules.pack_size))
    }

    /// Client for the REST booster-open endpoint.
    pub fn http_service(&self) -> Result<HttpBoosterService> {
        let service = HttpBoosterService::new(self.api_base.clone(), self.timeout)?;
        Ok(match &self.auth_token {
            Some(token) => service.with_auth_token(token.clone()),
            None => service,
        })
    }

    /// Local booster service with `available` openings, using the SDK's rules.
    pub fn simulated_service(&self, available: i64) -> Result<SimulatedBoosterService> {
        Ok(SimulatedBoosterService::new(
            self.catalog()?,
            self.rules.clone(),
            available,
        ))
    }

    /// Collection completion against the loaded catalog.
    pub fn completion(
        &self,
        entries: &[UserCardEntry],
        booster_id: Option<&str>,
    ) -> Result<stats::CollectionCompletion> {
        let catalog = self.repository.load_ref()?;
        Ok(stats::collection_completion(catalog, entries, booster_id))
    }

    /// Check for a newer catalog version and drop the cached catalog if stale.
    pub fn refresh(&mut self) -> Result<bool> {
        self.repository.refresh()
    }
}

// ---------------------------------------------------------------------------
// Display
// ---------------------------------------------------------------------------

impl fmt::Display for BoosterSdk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cache = self.repository.cache();
        match cache {
            Some(cache) => write!(
                f,
                "BoosterSdk(api_base={}, cache_dir={}, catalog_loaded={}, offline={})",
                self.api_base,
                cache.cache_dir.display(),
                self.repository.is_loaded(),
                cache.offline
            ),
            None => write!(
                f,
                "BoosterSdk(api_base={}, in_memory_catalog=true)",
                self.api_base
            ),
        }
    }
}

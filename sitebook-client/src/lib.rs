//! Sitebook Client
//!
//! Site-scoped access to the construction-site backend: a shared HTTP client
//! that stamps every request with the bearer token and the selected site,
//! one service per resource, cached reads ([`queries`]), and writes that
//! invalidate what they change ([`mutations`]).
//!
//! [`SiteClient`] wires these together around one process-wide
//! [`QueryCache`] and one [`SiteContext`].

pub mod checkout;
pub mod config;
pub mod envelope;
pub mod error;
pub mod http;
pub mod mutations;
pub mod notifications;
pub mod persistence;
pub mod queries;
pub mod services;
pub mod telemetry;

use sitebook_cache::{CacheStats, QueryCache};
use sitebook_core::{MemorySelectionStore, SelectionStore, SiteContext, SiteSelection, SiteSubscription};
use std::sync::Arc;
use tokio::task::JoinHandle;

pub use checkout::{CheckoutError, CheckoutFlow, CheckoutGateway, CheckoutOptions, Prefill};
pub use config::{ClientConfig, ConfigError};
pub use error::{ClientError, ClientResult, ErrorKind, ServiceError, ServiceResult};
pub use http::{HttpClient, TokenSource};
pub use mutations::{Mutation, MutationOutcome, Mutations};
pub use notifications::{LogNotifier, Notification, NotificationCenter, NotificationLevel, Notifier};
pub use persistence::FileSelectionStore;
pub use queries::{Queries, Query};
pub use services::Services;

/// Everything a dashboard needs, sharing one cache and one site context.
#[derive(Clone)]
pub struct SiteClient {
    config: ClientConfig,
    site: SiteContext,
    services: Services,
    cache: QueryCache<ServiceError>,
    notifications: NotificationCenter,
    queries: Queries,
    mutations: Mutations,
}

impl SiteClient {
    /// Build from config, restoring the persisted site selection.
    pub fn new(config: ClientConfig) -> ClientResult<Self> {
        config.validate()?;
        let store: Arc<dyn SelectionStore> = match &config.selection_path {
            Some(path) => Arc::new(FileSelectionStore::new(path.clone())),
            None => Arc::new(MemorySelectionStore::new()),
        };
        let site = SiteContext::new(store)?;
        Self::with_site_context(config, site)
    }

    /// Build around an existing site context.
    pub fn with_site_context(config: ClientConfig, site: SiteContext) -> ClientResult<Self> {
        let http = HttpClient::new(&config, site.clone())?;
        let services = Services::new(http);
        let cache = QueryCache::new();
        let notifications = NotificationCenter::default();
        let notifier: Arc<dyn Notifier> = Arc::new(notifications.clone());
        let queries = Queries::new(services.clone(), cache.clone(), config.retry, Arc::clone(&notifier));
        let mutations = Mutations::new(services.clone(), cache.clone(), notifier);
        tracing::debug!(
            base_url = %config.base_url(),
            selection = %site.current(),
            "Site client ready"
        );
        Ok(Self {
            config,
            site,
            services,
            cache,
            notifications,
            queries,
            mutations,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn queries(&self) -> &Queries {
        &self.queries
    }

    pub fn mutations(&self) -> &Mutations {
        &self.mutations
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    pub fn notifications(&self) -> &NotificationCenter {
        &self.notifications
    }

    pub fn cache(&self) -> &QueryCache<ServiceError> {
        &self.cache
    }

    pub fn site(&self) -> &SiteContext {
        &self.site
    }

    pub fn current_site(&self) -> SiteSelection {
        self.site.current()
    }

    pub fn subscribe_site(&self) -> SiteSubscription {
        self.site.subscribe()
    }

    /// Persist and broadcast a new selection. Cached responses were scoped by
    /// the previous site, so all of them go stale on a change.
    pub fn select_site(&self, selection: SiteSelection) -> ClientResult<bool> {
        let changed = self.site.select(selection)?;
        if changed {
            self.cache.invalidate_all();
        }
        Ok(changed)
    }

    /// Pick up a selection written by another process.
    pub fn reload_site(&self) -> ClientResult<bool> {
        let changed = self.site.reload()?;
        if changed {
            self.cache.invalidate_all();
        }
        Ok(changed)
    }

    pub fn checkout(&self, gateway: Arc<dyn CheckoutGateway>, merchant_name: impl Into<String>) -> CheckoutFlow {
        CheckoutFlow::new(gateway, self.mutations.clone(), merchant_name)
    }

    /// Start periodic eviction of unused cache entries.
    pub fn spawn_collector(&self) -> JoinHandle<()> {
        self.cache.spawn_collector(self.config.collect_interval())
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}

impl std::fmt::Debug for SiteClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SiteClient")
            .field("base_url", &self.config.base_url())
            .field("site", &self.site)
            .finish()
    }
}

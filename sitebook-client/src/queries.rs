//! Cached reads.
//!
//! A [`Query`] describes one read: its cache key, freshness policy, whether
//! its preconditions hold, and how to fetch it. [`Queries`] runs descriptors
//! against the shared cache. A disabled query never reaches the network.

use async_trait::async_trait;
use sitebook_cache::{CachePolicy, QueryCache, QueryKey, QueryState, RetryPolicy};
use sitebook_core::{
    CashLog, DashboardSummary, DetailedLogFilters, DetailedLogReport, Expense, LedgerFilters,
    MaterialCost, Member, Owner, OwnerLog, OwnerPaymentLog, RazorpaySettings, RecordId,
    SupervisorFlow, SupervisorFlowFilters, UserSubscription, WeeklyPayoutFilters,
    WeeklyPayoutReport,
};
use std::sync::Arc;

use crate::error::{ServiceError, ServiceResult};
use crate::notifications::{Notification, NotificationAction, Notifier};
use crate::services::Services;

/// Resource names, the first segment of every cache key.
pub mod keys {
    pub const DASHBOARD: &str = "dashboard";
    pub const MEMBERS: &str = "members";
    pub const CASH_LOGS: &str = "cashLogs";
    pub const EXPENSES: &str = "expenses";
    pub const MATERIAL_COSTS: &str = "materialCosts";
    pub const DETAILED_LOGS: &str = "detailed-logs";
    pub const WEEKLY_PAYOUTS: &str = "weekly-payouts";
    pub const SUPERVISOR_FLOW: &str = "supervisor-flow";
    pub const OWNERS: &str = "owners";
    pub const OWNER_LOGS: &str = "owner-logs";
    pub const OWNER_PAYMENT_LOGS: &str = "owner-payment-logs";
    pub const RAZORPAY_SETTINGS: &str = "razorpay-settings";
    pub const USER_SUBSCRIPTIONS: &str = "user-subscriptions";
}

/// One cached read.
#[async_trait]
pub trait Query: Send + Sync + 'static {
    type Output: Clone + Send + Sync + 'static;

    fn key(&self) -> QueryKey;

    fn policy(&self) -> CachePolicy;

    /// False while a required parameter is missing.
    fn enabled(&self) -> bool {
        true
    }

    async fn fetch(&self, services: &Services) -> ServiceResult<Self::Output>;
}

/// Runs queries against the shared cache.
#[derive(Clone)]
pub struct Queries {
    services: Services,
    cache: QueryCache<ServiceError>,
    retry: RetryPolicy,
    notifier: Arc<dyn Notifier>,
}

impl Queries {
    pub fn new(
        services: Services,
        cache: QueryCache<ServiceError>,
        retry: RetryPolicy,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            services,
            cache,
            retry,
            notifier,
        }
    }

    /// Serve from cache when fresh, otherwise fetch (sharing any in-flight
    /// request for the same key).
    pub async fn run<Q: Query + Clone>(&self, query: &Q) -> QueryState<Q::Output, ServiceError> {
        self.execute(query, false).await
    }

    /// Fetch regardless of freshness.
    pub async fn refetch<Q: Query + Clone>(&self, query: &Q) -> QueryState<Q::Output, ServiceError> {
        self.execute(query, true).await
    }

    /// What the cache holds for the query right now, without fetching.
    pub fn state<Q: Query>(&self, query: &Q) -> QueryState<Q::Output, ServiceError> {
        self.cache.state(&query.key())
    }

    async fn execute<Q: Query + Clone>(
        &self,
        query: &Q,
        force: bool,
    ) -> QueryState<Q::Output, ServiceError> {
        let key = query.key();
        if !query.enabled() {
            tracing::trace!(key = %key, "Query disabled; not fetching");
            return QueryState::idle(self.cache.peek(&key));
        }

        let shared = Arc::new(query.clone());
        let services = self.services.clone();
        let fetcher = move || {
            let query = Arc::clone(&shared);
            let services = services.clone();
            async move { query.fetch(&services).await }
        };

        let result = if force {
            self.cache.refetch(&key, query.policy(), self.retry, fetcher).await
        } else {
            self.cache.fetch(&key, query.policy(), self.retry, fetcher).await
        };

        match result {
            Ok(read) => QueryState::success(read),
            Err(err) => {
                self.notifier
                    .notify(Notification::error(err.message.clone()).with_action(NotificationAction::Retry));
                QueryState::failed(err, self.cache.peek(&key))
            }
        }
    }
}

// ============================================================================
// DESCRIPTORS
// ============================================================================

#[derive(Debug, Clone, Copy, Default)]
pub struct DashboardQuery;

#[async_trait]
impl Query for DashboardQuery {
    type Output = DashboardSummary;

    fn key(&self) -> QueryKey {
        QueryKey::new(keys::DASHBOARD)
    }

    fn policy(&self) -> CachePolicy {
        CachePolicy::REALTIME
    }

    async fn fetch(&self, services: &Services) -> ServiceResult<DashboardSummary> {
        services.dashboard.summary().await
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MembersQuery;

#[async_trait]
impl Query for MembersQuery {
    type Output = Vec<Member>;

    fn key(&self) -> QueryKey {
        QueryKey::new(keys::MEMBERS)
    }

    fn policy(&self) -> CachePolicy {
        CachePolicy::REFERENCE
    }

    async fn fetch(&self, services: &Services) -> ServiceResult<Vec<Member>> {
        services.members.list().await
    }
}

#[derive(Debug, Clone, Default)]
pub struct CashLogsQuery {
    pub filters: LedgerFilters,
}

#[async_trait]
impl Query for CashLogsQuery {
    type Output = Vec<CashLog>;

    fn key(&self) -> QueryKey {
        QueryKey::new(keys::CASH_LOGS).with_params(&self.filters.normalized())
    }

    fn policy(&self) -> CachePolicy {
        CachePolicy::REALTIME
    }

    async fn fetch(&self, services: &Services) -> ServiceResult<Vec<CashLog>> {
        services.cash_logs.list(&self.filters).await
    }
}

#[derive(Debug, Clone, Default)]
pub struct ExpensesQuery {
    pub filters: LedgerFilters,
}

#[async_trait]
impl Query for ExpensesQuery {
    type Output = Vec<Expense>;

    fn key(&self) -> QueryKey {
        QueryKey::new(keys::EXPENSES).with_params(&self.filters.normalized())
    }

    fn policy(&self) -> CachePolicy {
        CachePolicy::REALTIME
    }

    async fn fetch(&self, services: &Services) -> ServiceResult<Vec<Expense>> {
        services.expenses.list(&self.filters).await
    }
}

#[derive(Debug, Clone, Default)]
pub struct MaterialCostsQuery {
    pub filters: LedgerFilters,
}

#[async_trait]
impl Query for MaterialCostsQuery {
    type Output = Vec<MaterialCost>;

    fn key(&self) -> QueryKey {
        QueryKey::new(keys::MATERIAL_COSTS).with_params(&self.filters.normalized())
    }

    fn policy(&self) -> CachePolicy {
        CachePolicy::REALTIME
    }

    async fn fetch(&self, services: &Services) -> ServiceResult<Vec<MaterialCost>> {
        services.material_costs.list(&self.filters).await
    }
}

/// Enabled only once business, site, and both dates are set.
#[derive(Debug, Clone, Default)]
pub struct DetailedLogsQuery {
    pub filters: DetailedLogFilters,
}

#[async_trait]
impl Query for DetailedLogsQuery {
    type Output = DetailedLogReport;

    fn key(&self) -> QueryKey {
        QueryKey::new(keys::DETAILED_LOGS).with_params(&self.filters.normalized())
    }

    fn policy(&self) -> CachePolicy {
        CachePolicy::REALTIME
    }

    fn enabled(&self) -> bool {
        self.filters.is_complete()
    }

    async fn fetch(&self, services: &Services) -> ServiceResult<DetailedLogReport> {
        services.detailed_logs.report(&self.filters).await
    }
}

/// Enabled only once business and both dates are set.
#[derive(Debug, Clone, Default)]
pub struct WeeklyPayoutsQuery {
    pub filters: WeeklyPayoutFilters,
}

#[async_trait]
impl Query for WeeklyPayoutsQuery {
    type Output = WeeklyPayoutReport;

    fn key(&self) -> QueryKey {
        QueryKey::new(keys::WEEKLY_PAYOUTS).with_params(&self.filters.normalized())
    }

    fn policy(&self) -> CachePolicy {
        CachePolicy::REALTIME
    }

    fn enabled(&self) -> bool {
        self.filters.is_complete()
    }

    async fn fetch(&self, services: &Services) -> ServiceResult<WeeklyPayoutReport> {
        services.weekly_payouts.report(&self.filters).await
    }
}

#[derive(Debug, Clone, Default)]
pub struct SupervisorFlowQuery {
    pub filters: SupervisorFlowFilters,
}

#[async_trait]
impl Query for SupervisorFlowQuery {
    type Output = Vec<SupervisorFlow>;

    fn key(&self) -> QueryKey {
        QueryKey::new(keys::SUPERVISOR_FLOW).with_params(&self.filters.normalized())
    }

    fn policy(&self) -> CachePolicy {
        CachePolicy::REALTIME
    }

    fn enabled(&self) -> bool {
        self.filters.is_complete()
    }

    async fn fetch(&self, services: &Services) -> ServiceResult<Vec<SupervisorFlow>> {
        services.supervisor_flow.flow(&self.filters).await
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct OwnersQuery;

#[async_trait]
impl Query for OwnersQuery {
    type Output = Vec<Owner>;

    fn key(&self) -> QueryKey {
        QueryKey::new(keys::OWNERS)
    }

    fn policy(&self) -> CachePolicy {
        CachePolicy::REFERENCE
    }

    async fn fetch(&self, services: &Services) -> ServiceResult<Vec<Owner>> {
        services.owners.list().await
    }
}

/// Keyed per owner so one owner's writes never refetch another's logs.
#[derive(Debug, Clone, Copy)]
pub struct OwnerLogsQuery {
    pub owner_id: RecordId,
}

impl OwnerLogsQuery {
    pub fn key_for(owner_id: RecordId) -> QueryKey {
        QueryKey::new(keys::OWNER_LOGS).with(owner_id)
    }
}

#[async_trait]
impl Query for OwnerLogsQuery {
    type Output = Vec<OwnerLog>;

    fn key(&self) -> QueryKey {
        Self::key_for(self.owner_id)
    }

    fn policy(&self) -> CachePolicy {
        CachePolicy::REALTIME
    }

    fn enabled(&self) -> bool {
        self.owner_id > 0
    }

    async fn fetch(&self, services: &Services) -> ServiceResult<Vec<OwnerLog>> {
        services.owner_logs.list(self.owner_id).await
    }
}

#[derive(Debug, Clone, Copy)]
pub struct OwnerPaymentLogsQuery {
    pub owner_id: RecordId,
}

impl OwnerPaymentLogsQuery {
    pub fn key_for(owner_id: RecordId) -> QueryKey {
        QueryKey::new(keys::OWNER_PAYMENT_LOGS).with(owner_id)
    }
}

#[async_trait]
impl Query for OwnerPaymentLogsQuery {
    type Output = Vec<OwnerPaymentLog>;

    fn key(&self) -> QueryKey {
        Self::key_for(self.owner_id)
    }

    fn policy(&self) -> CachePolicy {
        CachePolicy::REALTIME
    }

    fn enabled(&self) -> bool {
        self.owner_id > 0
    }

    async fn fetch(&self, services: &Services) -> ServiceResult<Vec<OwnerPaymentLog>> {
        services.owner_payment_logs.list(self.owner_id).await
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RazorpaySettingsQuery;

#[async_trait]
impl Query for RazorpaySettingsQuery {
    type Output = RazorpaySettings;

    fn key(&self) -> QueryKey {
        QueryKey::new(keys::RAZORPAY_SETTINGS)
    }

    fn policy(&self) -> CachePolicy {
        CachePolicy::REFERENCE
    }

    async fn fetch(&self, services: &Services) -> ServiceResult<RazorpaySettings> {
        services.razorpay.settings().await
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SubscriptionsQuery;

#[async_trait]
impl Query for SubscriptionsQuery {
    type Output = Vec<UserSubscription>;

    fn key(&self) -> QueryKey {
        QueryKey::new(keys::USER_SUBSCRIPTIONS)
    }

    fn policy(&self) -> CachePolicy {
        CachePolicy::REFERENCE
    }

    async fn fetch(&self, services: &Services) -> ServiceResult<Vec<UserSubscription>> {
        services.razorpay.subscriptions().await
    }
}

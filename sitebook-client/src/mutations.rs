//! Writes and the cache keys they invalidate.
//!
//! A [`Mutation`] runs exactly once; writes are never retried. On success the
//! keys it declares are marked stale and a success notification is raised
//! with the backend's message, or the mutation's default one. On failure an
//! error notification is raised and the cache is left untouched.

use async_trait::async_trait;
use sitebook_cache::{QueryCache, QueryKey};
use sitebook_core::{
    CashLog, LaborEntry, MasonAdvance, MaterialCost, NewCashLog, NewLaborEntry, NewMasonAdvance,
    NewMaterialCost, NewOwner, Owner, OwnerLog, OwnerLogInput, OwnerPaymentLog,
    OwnerPaymentLogInput, PaymentVerification, PlanSetting, RazorpaySettings, RecordId,
    UserSubscription,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::envelope::Ack;
use crate::error::{ServiceError, ServiceResult};
use crate::notifications::{Notification, Notifier};
use crate::queries::{keys, OwnerLogsQuery, OwnerPaymentLogsQuery};
use crate::services::Services;

/// One write.
#[async_trait]
pub trait Mutation: Send + Sync {
    /// Record the backend may echo back.
    type Data: Send;

    async fn execute(&self, services: &Services) -> ServiceResult<Ack<Self::Data>>;

    /// Key prefixes whose cached data this write can change.
    fn invalidates(&self) -> Vec<QueryKey>;

    /// Shown when the backend sends no message of its own.
    fn default_message(&self) -> &'static str;

    fn success_message(&self, ack: &Ack<Self::Data>) -> String {
        ack.backend_message()
            .unwrap_or(self.default_message())
            .to_string()
    }
}

/// Result of a successful write.
#[derive(Debug, Clone)]
pub struct MutationOutcome<T> {
    pub data: Option<T>,
    pub message: String,
    /// Prefixes the mutation declared.
    pub invalidated: Vec<QueryKey>,
    /// Cached keys that were actually marked stale.
    pub stale: Vec<QueryKey>,
}

/// Runs mutations against the services and the shared cache.
#[derive(Clone)]
pub struct Mutations {
    services: Services,
    cache: QueryCache<ServiceError>,
    notifier: Arc<dyn Notifier>,
    pending: Arc<AtomicUsize>,
}

struct PendingGuard(Arc<AtomicUsize>);

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Mutations {
    pub fn new(services: Services, cache: QueryCache<ServiceError>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            services,
            cache,
            notifier,
            pending: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// True while any write is in flight.
    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::SeqCst) > 0
    }

    pub async fn run<M: Mutation>(&self, mutation: &M) -> ServiceResult<MutationOutcome<M::Data>> {
        self.pending.fetch_add(1, Ordering::SeqCst);
        let _guard = PendingGuard(Arc::clone(&self.pending));

        match mutation.execute(&self.services).await {
            Ok(ack) => {
                let message = mutation.success_message(&ack);
                let invalidated = mutation.invalidates();
                let stale: Vec<QueryKey> = invalidated
                    .iter()
                    .flat_map(|prefix| self.cache.invalidate(prefix))
                    .collect();
                tracing::info!(
                    mutation = std::any::type_name::<M>(),
                    stale = stale.len(),
                    "Mutation succeeded"
                );
                self.notifier.notify(Notification::success(message.clone()));
                Ok(MutationOutcome {
                    data: ack.data,
                    message,
                    invalidated,
                    stale,
                })
            }
            Err(err) => {
                tracing::warn!(
                    mutation = std::any::type_name::<M>(),
                    error = %err,
                    "Mutation failed"
                );
                self.notifier.notify(Notification::error(err.message.clone()));
                Err(err)
            }
        }
    }
}

// ============================================================================
// DESCRIPTORS
// ============================================================================

/// Creating a cash log refreshes both ledgers it shows up in.
#[derive(Debug, Clone)]
pub struct CreateCashLog(pub NewCashLog);

#[async_trait]
impl Mutation for CreateCashLog {
    type Data = CashLog;

    async fn execute(&self, services: &Services) -> ServiceResult<Ack<CashLog>> {
        services.cash_logs.create(&self.0).await
    }

    fn invalidates(&self) -> Vec<QueryKey> {
        vec![QueryKey::new(keys::EXPENSES), QueryKey::new(keys::CASH_LOGS)]
    }

    fn default_message(&self) -> &'static str {
        "Cash log added"
    }
}

#[derive(Debug, Clone)]
pub struct CreateMaterialCost(pub NewMaterialCost);

#[async_trait]
impl Mutation for CreateMaterialCost {
    type Data = MaterialCost;

    async fn execute(&self, services: &Services) -> ServiceResult<Ack<MaterialCost>> {
        services.material_costs.create(&self.0).await
    }

    fn invalidates(&self) -> Vec<QueryKey> {
        vec![QueryKey::new(keys::MATERIAL_COSTS), QueryKey::new(keys::EXPENSES)]
    }

    fn default_message(&self) -> &'static str {
        "Material cost added"
    }
}

#[derive(Debug, Clone)]
pub struct CreateLaborEntry(pub NewLaborEntry);

#[async_trait]
impl Mutation for CreateLaborEntry {
    type Data = LaborEntry;

    async fn execute(&self, services: &Services) -> ServiceResult<Ack<LaborEntry>> {
        services.labor.create_labor_entry(&self.0).await
    }

    fn invalidates(&self) -> Vec<QueryKey> {
        vec![
            QueryKey::new(keys::DETAILED_LOGS),
            QueryKey::new(keys::WEEKLY_PAYOUTS),
        ]
    }

    fn default_message(&self) -> &'static str {
        "Labor entry added"
    }
}

#[derive(Debug, Clone)]
pub struct CreateMasonAdvance(pub NewMasonAdvance);

#[async_trait]
impl Mutation for CreateMasonAdvance {
    type Data = MasonAdvance;

    async fn execute(&self, services: &Services) -> ServiceResult<Ack<MasonAdvance>> {
        services.weekly_payouts.create_mason_advance(&self.0).await
    }

    fn invalidates(&self) -> Vec<QueryKey> {
        vec![
            QueryKey::new(keys::WEEKLY_PAYOUTS),
            QueryKey::new(keys::SUPERVISOR_FLOW),
        ]
    }

    fn default_message(&self) -> &'static str {
        "Advance recorded"
    }
}

#[derive(Debug, Clone)]
pub struct CreateOwner(pub NewOwner);

#[async_trait]
impl Mutation for CreateOwner {
    type Data = Owner;

    async fn execute(&self, services: &Services) -> ServiceResult<Ack<Owner>> {
        services.owners.create(&self.0).await
    }

    fn invalidates(&self) -> Vec<QueryKey> {
        vec![QueryKey::new(keys::OWNERS)]
    }

    fn default_message(&self) -> &'static str {
        "Owner added"
    }
}

// Owner-scoped writes invalidate only that owner's key.

#[derive(Debug, Clone)]
pub struct CreateOwnerLog {
    pub owner_id: RecordId,
    pub input: OwnerLogInput,
}

#[async_trait]
impl Mutation for CreateOwnerLog {
    type Data = OwnerLog;

    async fn execute(&self, services: &Services) -> ServiceResult<Ack<OwnerLog>> {
        services.owner_logs.create(self.owner_id, &self.input).await
    }

    fn invalidates(&self) -> Vec<QueryKey> {
        vec![OwnerLogsQuery::key_for(self.owner_id)]
    }

    fn default_message(&self) -> &'static str {
        "Owner log added"
    }
}

#[derive(Debug, Clone)]
pub struct UpdateOwnerLog {
    pub owner_id: RecordId,
    pub log_id: RecordId,
    pub input: OwnerLogInput,
}

#[async_trait]
impl Mutation for UpdateOwnerLog {
    type Data = OwnerLog;

    async fn execute(&self, services: &Services) -> ServiceResult<Ack<OwnerLog>> {
        services.owner_logs.update(self.log_id, &self.input).await
    }

    fn invalidates(&self) -> Vec<QueryKey> {
        vec![OwnerLogsQuery::key_for(self.owner_id)]
    }

    fn default_message(&self) -> &'static str {
        "Owner log updated"
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DeleteOwnerLog {
    pub owner_id: RecordId,
    pub log_id: RecordId,
}

#[async_trait]
impl Mutation for DeleteOwnerLog {
    type Data = ();

    async fn execute(&self, services: &Services) -> ServiceResult<Ack<()>> {
        let reply = services.owner_logs.delete(self.log_id).await?;
        Ok(Ack {
            message: reply.message,
            data: None,
        })
    }

    fn invalidates(&self) -> Vec<QueryKey> {
        vec![OwnerLogsQuery::key_for(self.owner_id)]
    }

    fn default_message(&self) -> &'static str {
        "Owner log deleted"
    }
}

#[derive(Debug, Clone)]
pub struct CreateOwnerPaymentLog {
    pub owner_id: RecordId,
    pub input: OwnerPaymentLogInput,
}

#[async_trait]
impl Mutation for CreateOwnerPaymentLog {
    type Data = OwnerPaymentLog;

    async fn execute(&self, services: &Services) -> ServiceResult<Ack<OwnerPaymentLog>> {
        services
            .owner_payment_logs
            .create(self.owner_id, &self.input)
            .await
    }

    fn invalidates(&self) -> Vec<QueryKey> {
        vec![OwnerPaymentLogsQuery::key_for(self.owner_id)]
    }

    fn default_message(&self) -> &'static str {
        "Payment log added"
    }
}

#[derive(Debug, Clone)]
pub struct UpdateOwnerPaymentLog {
    pub owner_id: RecordId,
    pub log_id: RecordId,
    pub input: OwnerPaymentLogInput,
}

#[async_trait]
impl Mutation for UpdateOwnerPaymentLog {
    type Data = OwnerPaymentLog;

    async fn execute(&self, services: &Services) -> ServiceResult<Ack<OwnerPaymentLog>> {
        services
            .owner_payment_logs
            .update(self.log_id, &self.input)
            .await
    }

    fn invalidates(&self) -> Vec<QueryKey> {
        vec![OwnerPaymentLogsQuery::key_for(self.owner_id)]
    }

    fn default_message(&self) -> &'static str {
        "Payment log updated"
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DeleteOwnerPaymentLog {
    pub owner_id: RecordId,
    pub log_id: RecordId,
}

#[async_trait]
impl Mutation for DeleteOwnerPaymentLog {
    type Data = ();

    async fn execute(&self, services: &Services) -> ServiceResult<Ack<()>> {
        let reply = services.owner_payment_logs.delete(self.log_id).await?;
        Ok(Ack {
            message: reply.message,
            data: None,
        })
    }

    fn invalidates(&self) -> Vec<QueryKey> {
        vec![OwnerPaymentLogsQuery::key_for(self.owner_id)]
    }

    fn default_message(&self) -> &'static str {
        "Payment log deleted"
    }
}

#[derive(Debug, Clone)]
pub struct UpdateRazorpaySettings(pub RazorpaySettings);

#[async_trait]
impl Mutation for UpdateRazorpaySettings {
    type Data = RazorpaySettings;

    async fn execute(&self, services: &Services) -> ServiceResult<Ack<RazorpaySettings>> {
        services.razorpay.update_settings(&self.0).await
    }

    fn invalidates(&self) -> Vec<QueryKey> {
        vec![QueryKey::new(keys::RAZORPAY_SETTINGS)]
    }

    fn default_message(&self) -> &'static str {
        "Razorpay settings saved"
    }
}

#[derive(Debug, Clone)]
pub struct UpdatePlanSettings(pub Vec<PlanSetting>);

#[async_trait]
impl Mutation for UpdatePlanSettings {
    type Data = Vec<PlanSetting>;

    async fn execute(&self, services: &Services) -> ServiceResult<Ack<Vec<PlanSetting>>> {
        services.razorpay.update_plan_settings(&self.0).await
    }

    fn invalidates(&self) -> Vec<QueryKey> {
        vec![QueryKey::new(keys::RAZORPAY_SETTINGS)]
    }

    fn default_message(&self) -> &'static str {
        "Plan settings saved"
    }
}

#[derive(Debug, Clone)]
pub struct VerifyPayment(pub PaymentVerification);

#[async_trait]
impl Mutation for VerifyPayment {
    type Data = UserSubscription;

    async fn execute(&self, services: &Services) -> ServiceResult<Ack<UserSubscription>> {
        services.razorpay.verify_payment(&self.0).await
    }

    fn invalidates(&self) -> Vec<QueryKey> {
        vec![QueryKey::new(keys::USER_SUBSCRIPTIONS)]
    }

    fn default_message(&self) -> &'static str {
        "Payment verified"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cash_log_invalidates_both_ledgers() {
        let keys: Vec<String> = CreateCashLog(NewCashLog::default())
            .invalidates()
            .iter()
            .map(|k| k.encoded().to_string())
            .collect();
        assert_eq!(keys, vec![r#"["expenses"]"#, r#"["cashLogs"]"#]);
    }

    #[test]
    fn test_owner_scoped_invalidation() {
        let update = DeleteOwnerPaymentLog { owner_id: 7, log_id: 99 };
        let keys = update.invalidates();
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].encoded(), r#"["owner-payment-logs",7]"#);
        assert!(!OwnerPaymentLogsQuery::key_for(8).starts_with(&keys[0]));
    }

    #[test]
    fn test_success_message_prefers_backend() {
        let mutation = CreateOwner(NewOwner {
            site_id: "1".into(),
            name: "A".into(),
            phone: None,
            share: None,
        });
        let with_message: Ack<Owner> = Ack {
            message: Some("Owner created".into()),
            data: None,
        };
        let blank: Ack<Owner> = Ack {
            message: Some("".into()),
            data: None,
        };
        assert_eq!(mutation.success_message(&with_message), "Owner created");
        assert_eq!(mutation.success_message(&blank), "Owner added");
    }
}

//! Razorpay checkout: open the third-party gateway, then verify the payment
//! with the backend.

use async_trait::async_trait;
use serde::Serialize;
use sitebook_core::{MoneyError, PaymentVerification, PlanSetting, RazorpaySettings, UserSubscription};
use std::sync::Arc;

use crate::error::ServiceError;
use crate::mutations::{MutationOutcome, Mutations, VerifyPayment};

/// Contact details the gateway pre-fills.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Prefill {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact: Option<String>,
}

/// Options handed to the gateway. `amount` is in minor units (paise).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckoutOptions {
    pub key: String,
    pub amount: i64,
    pub currency: String,
    pub name: String,
    pub description: String,
    pub order_id: String,
    pub prefill: Prefill,
}

impl CheckoutOptions {
    /// Options for buying `plan`. The plan's currency wins over the account
    /// default.
    pub fn for_plan(
        settings: &RazorpaySettings,
        plan: &PlanSetting,
        merchant_name: &str,
        order_id: impl Into<String>,
        prefill: Prefill,
    ) -> Result<Self, MoneyError> {
        let currency = if plan.currency.trim().is_empty() {
            settings.currency.clone().unwrap_or_else(|| "INR".to_string())
        } else {
            plan.currency.clone()
        };
        Ok(Self {
            key: settings.razorpay_key_id.clone(),
            amount: plan.amount.to_minor_units()?,
            currency,
            name: merchant_name.to_string(),
            description: plan
                .description
                .clone()
                .unwrap_or_else(|| format!("{} plan", plan.name)),
            order_id: order_id.into(),
            prefill,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CheckoutError {
    #[error("Payment was cancelled")]
    Dismissed,
    #[error("Payment failed: {0}")]
    Gateway(String),
    #[error("Invalid plan amount: {0}")]
    InvalidAmount(#[from] MoneyError),
    #[error(transparent)]
    Verification(#[from] ServiceError),
}

/// The third-party checkout. Resolves once the user completes or abandons
/// the payment.
#[async_trait]
pub trait CheckoutGateway: Send + Sync {
    async fn open(&self, options: CheckoutOptions) -> Result<PaymentVerification, CheckoutError>;
}

pub struct CheckoutFlow {
    gateway: Arc<dyn CheckoutGateway>,
    mutations: Mutations,
    merchant_name: String,
}

impl CheckoutFlow {
    pub fn new(gateway: Arc<dyn CheckoutGateway>, mutations: Mutations, merchant_name: impl Into<String>) -> Self {
        Self {
            gateway,
            mutations,
            merchant_name: merchant_name.into(),
        }
    }

    /// Open checkout for `plan`, then verify the completed payment.
    pub async fn pay(
        &self,
        settings: &RazorpaySettings,
        plan: &PlanSetting,
        order_id: &str,
        prefill: Prefill,
    ) -> Result<MutationOutcome<UserSubscription>, CheckoutError> {
        let options = CheckoutOptions::for_plan(settings, plan, &self.merchant_name, order_id, prefill)?;
        tracing::info!(
            plan = %plan.name,
            amount = options.amount,
            currency = %options.currency,
            order_id = %options.order_id,
            "Opening checkout"
        );
        let payment = match self.gateway.open(options).await {
            Ok(payment) => payment,
            Err(err) => {
                tracing::info!(error = %err, "Checkout did not complete");
                return Err(err);
            }
        };
        Ok(self.mutations.run(&VerifyPayment(payment)).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sitebook_core::Money;

    fn plan(amount: &str) -> PlanSetting {
        PlanSetting {
            name: "Pro".to_string(),
            amount: Money::parse(amount).unwrap(),
            currency: "INR".to_string(),
            duration_days: 30,
            description: None,
        }
    }

    fn settings() -> RazorpaySettings {
        RazorpaySettings {
            razorpay_key_id: "rzp_test_123".to_string(),
            razorpay_key_secret: None,
            currency: Some("INR".to_string()),
            plans: Vec::new(),
        }
    }

    #[test]
    fn test_amount_in_minor_units() {
        let options =
            CheckoutOptions::for_plan(&settings(), &plan("499.50"), "Sitebook", "order_1", Prefill::default()).unwrap();
        assert_eq!(options.amount, 49_950);
        assert_eq!(options.key, "rzp_test_123");
        assert_eq!(options.description, "Pro plan");
    }

    #[test]
    fn test_blank_plan_currency_falls_back_to_account() {
        let mut plan = plan("10");
        plan.currency = String::new();
        let mut settings = settings();
        settings.currency = Some("USD".to_string());
        let options = CheckoutOptions::for_plan(&settings, &plan, "S", "o", Prefill::default()).unwrap();
        assert_eq!(options.currency, "USD");
        assert_eq!(options.amount, 1_000);
    }
}

//! Razorpay settings, plans, subscriptions, and payment verification.

use serde::Serialize;
use sitebook_core::{PaymentVerification, PlanSetting, RazorpaySettings, UserSubscription, ValidationError};

use crate::envelope::{Ack, MessageEnvelope};
use crate::error::ServiceResult;
use crate::http::HttpClient;

#[derive(Serialize)]
struct PlanSettingsBody<'a> {
    plans: &'a [PlanSetting],
}

#[derive(Clone)]
pub struct RazorpayService {
    http: HttpClient,
}

impl RazorpayService {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    pub async fn settings(&self) -> ServiceResult<RazorpaySettings> {
        let envelope: MessageEnvelope<RazorpaySettings> =
            self.http.get_json::<_, ()>("/settings", None).await?;
        Ok(envelope.into_data())
    }

    pub async fn update_settings(
        &self,
        settings: &RazorpaySettings,
    ) -> ServiceResult<Ack<RazorpaySettings>> {
        if settings.razorpay_key_id.trim().is_empty() {
            return Err(ValidationError::missing(&["razorpay_key_id"]).into());
        }
        self.http.post_json("/settings", settings).await
    }

    pub async fn update_plan_settings(
        &self,
        plans: &[PlanSetting],
    ) -> ServiceResult<Ack<Vec<PlanSetting>>> {
        if let Some(plan) = plans.iter().find(|p| p.name.trim().is_empty()) {
            return Err(ValidationError::InvalidValue {
                field: "plans.name".to_string(),
                reason: format!("plan priced {} has no name", plan.amount),
            }
            .into());
        }
        self.http
            .post_json("/plan-settings", &PlanSettingsBody { plans })
            .await
    }

    pub async fn subscriptions(&self) -> ServiceResult<Vec<UserSubscription>> {
        let envelope: MessageEnvelope<Vec<UserSubscription>> =
            self.http.get_json::<_, ()>("/user-subscriptions", None).await?;
        Ok(envelope.into_data())
    }

    /// `POST /package/verify-payment` as multipart form fields.
    pub async fn verify_payment(
        &self,
        payment: &PaymentVerification,
    ) -> ServiceResult<Ack<UserSubscription>> {
        let fields = [
            ("razorpay_payment_id", &payment.razorpay_payment_id),
            ("razorpay_order_id", &payment.razorpay_order_id),
            ("razorpay_signature", &payment.razorpay_signature),
        ];
        let missing: Vec<&str> = fields
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| *name)
            .collect();
        if !missing.is_empty() {
            return Err(ValidationError::missing(&missing).into());
        }
        let form = fields
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();
        self.http.post_multipart("/package/verify-payment", form).await
    }
}

//! Owners and their per-owner logs.

use sitebook_core::{
    NewOwner, Owner, OwnerLog, OwnerLogInput, OwnerPaymentLog, OwnerPaymentLogInput, RecordId,
    ValidationError,
};

use crate::envelope::{Ack, MessageEnvelope, MessageOnly};
use crate::error::ServiceResult;
use crate::http::HttpClient;

fn require_id(field: &str, id: RecordId) -> ServiceResult<()> {
    if id > 0 {
        Ok(())
    } else {
        Err(ValidationError::InvalidValue {
            field: field.to_string(),
            reason: format!("must be a positive id, got {}", id),
        }
        .into())
    }
}

#[derive(Clone)]
pub struct OwnerService {
    http: HttpClient,
}

impl OwnerService {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    pub async fn list(&self) -> ServiceResult<Vec<Owner>> {
        let envelope: MessageEnvelope<Vec<Owner>> =
            self.http.get_json::<_, ()>("/owners", None).await?;
        Ok(envelope.into_data())
    }

    pub async fn create(&self, input: &NewOwner) -> ServiceResult<Ack<Owner>> {
        let mut missing = Vec::new();
        if input.site_id.trim().is_empty() {
            missing.push("site_id");
        }
        if input.name.trim().is_empty() {
            missing.push("name");
        }
        if !missing.is_empty() {
            return Err(ValidationError::missing(&missing).into());
        }
        self.http.post_json("/owners", input).await
    }
}

#[derive(Clone)]
pub struct OwnerLogService {
    http: HttpClient,
}

impl OwnerLogService {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    pub async fn list(&self, owner_id: RecordId) -> ServiceResult<Vec<OwnerLog>> {
        require_id("owner_id", owner_id)?;
        let path = format!("/owners/{}/logs", owner_id);
        let envelope: MessageEnvelope<Vec<OwnerLog>> =
            self.http.get_json::<_, ()>(&path, None).await?;
        Ok(envelope.into_data())
    }

    pub async fn create(
        &self,
        owner_id: RecordId,
        input: &OwnerLogInput,
    ) -> ServiceResult<Ack<OwnerLog>> {
        require_id("owner_id", owner_id)?;
        let path = format!("/owners/{}/logs", owner_id);
        self.http.post_json(&path, input).await
    }

    pub async fn update(&self, log_id: RecordId, input: &OwnerLogInput) -> ServiceResult<Ack<OwnerLog>> {
        require_id("log_id", log_id)?;
        let path = format!("/owner-logs/{}", log_id);
        self.http.put_json(&path, input).await
    }

    pub async fn delete(&self, log_id: RecordId) -> ServiceResult<MessageOnly> {
        require_id("log_id", log_id)?;
        let path = format!("/owner-logs/{}", log_id);
        self.http.delete(&path).await
    }
}

#[derive(Clone)]
pub struct OwnerPaymentLogService {
    http: HttpClient,
}

impl OwnerPaymentLogService {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    pub async fn list(&self, owner_id: RecordId) -> ServiceResult<Vec<OwnerPaymentLog>> {
        require_id("owner_id", owner_id)?;
        let path = format!("/owners/{}/payment-logs", owner_id);
        let envelope: MessageEnvelope<Vec<OwnerPaymentLog>> =
            self.http.get_json::<_, ()>(&path, None).await?;
        Ok(envelope.into_data())
    }

    pub async fn create(
        &self,
        owner_id: RecordId,
        input: &OwnerPaymentLogInput,
    ) -> ServiceResult<Ack<OwnerPaymentLog>> {
        require_id("owner_id", owner_id)?;
        let path = format!("/owners/{}/payment-logs", owner_id);
        self.http.post_json(&path, input).await
    }

    pub async fn update(
        &self,
        log_id: RecordId,
        input: &OwnerPaymentLogInput,
    ) -> ServiceResult<Ack<OwnerPaymentLog>> {
        require_id("log_id", log_id)?;
        let path = format!("/owner-payment-logs/{}", log_id);
        self.http.put_json(&path, input).await
    }

    pub async fn delete(&self, log_id: RecordId) -> ServiceResult<MessageOnly> {
        require_id("log_id", log_id)?;
        let path = format!("/owner-payment-logs/{}", log_id);
        self.http.delete(&path).await
    }
}

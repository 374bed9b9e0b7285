//! Cash logs, expenses, and material costs.

use sitebook_core::{
    CashLog, Expense, LedgerFilters, MaterialCost, Money, NewCashLog, NewMaterialCost,
    ValidationError,
};

use crate::envelope::{Ack, MessageEnvelope};
use crate::error::ServiceResult;
use crate::http::HttpClient;

#[derive(Clone)]
pub struct CashLogService {
    http: HttpClient,
}

impl CashLogService {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    pub async fn list(&self, filters: &LedgerFilters) -> ServiceResult<Vec<CashLog>> {
        let envelope: MessageEnvelope<Vec<CashLog>> = self
            .http
            .get_json("/cash-logs", Some(&filters.normalized()))
            .await?;
        Ok(envelope.into_data())
    }

    /// `POST /cash-logs`. All four fields are required and the amount must
    /// be a decimal; otherwise nothing is sent.
    pub async fn create(&self, input: &NewCashLog) -> ServiceResult<Ack<CashLog>> {
        let missing = input.missing_required();
        if !missing.is_empty() {
            return Err(ValidationError::missing(&missing).into());
        }
        if let Err(err) = Money::parse(input.amount.trim()) {
            return Err(ValidationError::InvalidValue {
                field: "amount".to_string(),
                reason: err.to_string(),
            }
            .into());
        }
        self.http.post_json("/cash-logs", input).await
    }
}

#[derive(Clone)]
pub struct ExpenseService {
    http: HttpClient,
}

impl ExpenseService {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    pub async fn list(&self, filters: &LedgerFilters) -> ServiceResult<Vec<Expense>> {
        let envelope: MessageEnvelope<Vec<Expense>> = self
            .http
            .get_json("/expenses", Some(&filters.normalized()))
            .await?;
        Ok(envelope.into_data())
    }
}

#[derive(Clone)]
pub struct MaterialCostService {
    http: HttpClient,
}

impl MaterialCostService {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    pub async fn list(&self, filters: &LedgerFilters) -> ServiceResult<Vec<MaterialCost>> {
        let envelope: MessageEnvelope<Vec<MaterialCost>> = self
            .http
            .get_json("/material-costs", Some(&filters.normalized()))
            .await?;
        Ok(envelope.into_data())
    }

    pub async fn create(&self, input: &NewMaterialCost) -> ServiceResult<Ack<MaterialCost>> {
        let mut missing = Vec::new();
        if input.site_id.trim().is_empty() {
            missing.push("site_id");
        }
        if input.material.trim().is_empty() {
            missing.push("material");
        }
        if !missing.is_empty() {
            return Err(ValidationError::missing(&missing).into());
        }
        self.http.post_json("/material-costs", input).await
    }
}

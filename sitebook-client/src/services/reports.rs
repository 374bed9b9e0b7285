//! Report reads and the writes that feed them.

use sitebook_core::{
    DetailedLogFilters, DetailedLogReport, LaborEntry, MasonAdvance, NewLaborEntry,
    NewMasonAdvance, SupervisorFlow, SupervisorFlowFilters, ValidationError, WeeklyPayoutFilters,
    WeeklyPayoutReport,
};

use crate::envelope::{Ack, MessageEnvelope};
use crate::error::ServiceResult;
use crate::http::HttpClient;

fn require(missing: Vec<&'static str>) -> ServiceResult<()> {
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::missing(&missing).into())
    }
}

#[derive(Clone)]
pub struct DetailedLogService {
    http: HttpClient,
}

impl DetailedLogService {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    /// `GET /reports/detailed-logs`. Refuses to run without business, site,
    /// and a full date range.
    pub async fn report(&self, filters: &DetailedLogFilters) -> ServiceResult<DetailedLogReport> {
        require(filters.missing_required())?;
        let envelope: MessageEnvelope<DetailedLogReport> = self
            .http
            .get_json("/reports/detailed-logs", Some(&filters.normalized()))
            .await?;
        Ok(envelope.into_data())
    }
}

#[derive(Clone)]
pub struct LaborService {
    http: HttpClient,
}

impl LaborService {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    pub async fn create_labor_entry(&self, input: &NewLaborEntry) -> ServiceResult<Ack<LaborEntry>> {
        let mut missing = Vec::new();
        if input.site_id.trim().is_empty() {
            missing.push("site_id");
        }
        if input.worker_name.trim().is_empty() {
            missing.push("worker_name");
        }
        require(missing)?;
        self.http.post_json("/labor-entries", input).await
    }
}

#[derive(Clone)]
pub struct WeeklyPayoutService {
    http: HttpClient,
}

impl WeeklyPayoutService {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    /// `GET /reports/weekly-payouts`. Site and supervisor are optional.
    pub async fn report(&self, filters: &WeeklyPayoutFilters) -> ServiceResult<WeeklyPayoutReport> {
        require(filters.missing_required())?;
        let envelope: MessageEnvelope<WeeklyPayoutReport> = self
            .http
            .get_json("/reports/weekly-payouts", Some(&filters.normalized()))
            .await?;
        Ok(envelope.into_data())
    }

    pub async fn create_mason_advance(
        &self,
        input: &NewMasonAdvance,
    ) -> ServiceResult<Ack<MasonAdvance>> {
        let mut missing = Vec::new();
        if input.site_id.trim().is_empty() {
            missing.push("site_id");
        }
        if input.mason_id.trim().is_empty() {
            missing.push("mason_id");
        }
        require(missing)?;
        self.http.post_json("/mason-advances", input).await
    }
}

#[derive(Clone)]
pub struct SupervisorFlowService {
    http: HttpClient,
}

impl SupervisorFlowService {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    pub async fn flow(&self, filters: &SupervisorFlowFilters) -> ServiceResult<Vec<SupervisorFlow>> {
        require(filters.missing_required())?;
        let envelope: MessageEnvelope<Vec<SupervisorFlow>> = self
            .http
            .get_json("/reports/supervisor-flow", Some(&filters.normalized()))
            .await?;
        Ok(envelope.into_data())
    }
}

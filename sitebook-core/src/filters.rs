//! Filter sets for report and list reads.
//!
//! Filters serialize straight into the query string and into the cache key, so
//! absent fields are skipped rather than sent as `null`. A blank string counts
//! as absent.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Filters for `GET /reports/detailed-logs`.
///
/// business id, site id, and the full date range are required.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DetailedLogFilters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub business_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supervisor_id: Option<String>,
}

impl DetailedLogFilters {
    pub fn missing_required(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if !present(&self.business_id) {
            missing.push("business_id");
        }
        if !present(&self.site_id) {
            missing.push("site_id");
        }
        if self.start_date.is_none() {
            missing.push("start_date");
        }
        if self.end_date.is_none() {
            missing.push("end_date");
        }
        missing
    }

    pub fn is_complete(&self) -> bool {
        self.missing_required().is_empty()
    }

    /// Drop blank strings so `Some("")` and `None` key the same cache entry.
    pub fn normalized(&self) -> Self {
        Self {
            business_id: non_blank(&self.business_id),
            site_id: non_blank(&self.site_id),
            start_date: self.start_date,
            end_date: self.end_date,
            supervisor_id: non_blank(&self.supervisor_id),
        }
    }
}

/// Filters for `GET /reports/weekly-payouts`.
///
/// business id and the full date range are required; site and supervisor narrow.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WeeklyPayoutFilters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub business_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supervisor_id: Option<String>,
}

impl WeeklyPayoutFilters {
    pub fn missing_required(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if !present(&self.business_id) {
            missing.push("business_id");
        }
        if self.start_date.is_none() {
            missing.push("start_date");
        }
        if self.end_date.is_none() {
            missing.push("end_date");
        }
        missing
    }

    pub fn is_complete(&self) -> bool {
        self.missing_required().is_empty()
    }

    pub fn normalized(&self) -> Self {
        Self {
            business_id: non_blank(&self.business_id),
            start_date: self.start_date,
            end_date: self.end_date,
            site_id: non_blank(&self.site_id),
            supervisor_id: non_blank(&self.supervisor_id),
        }
    }
}

/// Filters for `GET /reports/supervisor-flow`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SupervisorFlowFilters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub business_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
}

impl SupervisorFlowFilters {
    pub fn missing_required(&self) -> Vec<&'static str> {
        if present(&self.business_id) {
            Vec::new()
        } else {
            vec!["business_id"]
        }
    }

    pub fn is_complete(&self) -> bool {
        self.missing_required().is_empty()
    }

    pub fn normalized(&self) -> Self {
        Self {
            business_id: non_blank(&self.business_id),
            site_id: non_blank(&self.site_id),
            start_date: self.start_date,
            end_date: self.end_date,
        }
    }
}

/// Optional narrowing for cash log, material cost, and expense listings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LedgerFilters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
}

impl LedgerFilters {
    /// Drop blank strings so `Some("")` and `None` key the same cache entry.
    pub fn normalized(&self) -> Self {
        Self {
            site_id: non_blank(&self.site_id),
            user_id: non_blank(&self.user_id),
            start_date: self.start_date,
            end_date: self.end_date,
        }
    }
}

fn present(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value.clone().filter(|v| !v.trim().is_empty())
}

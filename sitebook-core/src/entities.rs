//! Records mirrored from the backend.
//!
//! These are plain data: fetched, displayed, and posted back. Nothing here is
//! derived or validated client-side beyond typing.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::{RecordId, Timestamp};

// ============================================================================
// SITES AND MEMBERS
// ============================================================================

/// A construction project/location. Fetched, never computed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Site {
    pub id: RecordId,
    pub business_id: RecordId,
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub budget: Option<Money>,
    #[serde(default)]
    pub spent: Option<Money>,
    /// Completion percentage as reported by the backend.
    #[serde(default)]
    pub progress: Option<f64>,
}

/// A user attached to the business (supervisor, mason, accountant).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: RecordId,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub site_id: Option<RecordId>,
}

// ============================================================================
// LEDGER: CASH, MATERIAL, EXPENSES
// ============================================================================

/// Cash handed to a member on a site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashLog {
    pub id: RecordId,
    pub site_id: RecordId,
    pub user_id: RecordId,
    pub date: NaiveDate,
    pub amount: Money,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub created_at: Option<Timestamp>,
}

/// Body of `POST /cash-logs`. Every field is required by the backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCashLog {
    pub user_id: String,
    pub site_id: String,
    pub date: String,
    pub amount: String,
}

impl NewCashLog {
    pub fn missing_required(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        for (name, value) in [
            ("user_id", &self.user_id),
            ("site_id", &self.site_id),
            ("date", &self.date),
            ("amount", &self.amount),
        ] {
            if value.trim().is_empty() {
                missing.push(name);
            }
        }
        missing
    }
}

/// Material purchased for a site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialCost {
    pub id: RecordId,
    pub site_id: RecordId,
    pub material: String,
    #[serde(default)]
    pub quantity: Option<String>,
    #[serde(default)]
    pub unit: Option<String>,
    pub amount: Money,
    pub date: NaiveDate,
    #[serde(default)]
    pub vendor: Option<String>,
}

/// Body of `POST /material-costs`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMaterialCost {
    pub site_id: String,
    pub material: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    pub amount: Money,
    pub date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,
}

/// One row of the combined expense listing (cash, material, labor).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expense {
    pub id: RecordId,
    pub site_id: RecordId,
    pub category: String,
    pub amount: Money,
    pub date: NaiveDate,
    #[serde(default)]
    pub description: Option<String>,
}

// ============================================================================
// LABOR
// ============================================================================

/// Daily labor attendance/wage entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaborEntry {
    pub id: RecordId,
    pub site_id: RecordId,
    #[serde(default)]
    pub supervisor_id: Option<RecordId>,
    pub worker_name: String,
    #[serde(default)]
    pub category: Option<String>,
    pub date: NaiveDate,
    pub wage: Money,
    #[serde(default)]
    pub hours: Option<String>,
}

/// Body of `POST /labor-entries`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLaborEntry {
    pub site_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supervisor_id: Option<String>,
    pub worker_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub date: NaiveDate,
    pub wage: Money,
}

/// Advance paid to a mason ahead of the weekly payout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MasonAdvance {
    pub id: RecordId,
    pub site_id: RecordId,
    pub mason_id: RecordId,
    pub date: NaiveDate,
    pub amount: Money,
    #[serde(default)]
    pub note: Option<String>,
}

/// Body of `POST /mason-advances`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMasonAdvance {
    pub site_id: String,
    pub mason_id: String,
    pub date: NaiveDate,
    pub amount: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

// ============================================================================
// OWNERS
// ============================================================================

/// A site owner / investor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    pub id: RecordId,
    pub site_id: RecordId,
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub share: Option<Money>,
}

/// Body of `POST /owners`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOwner {
    pub site_id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub share: Option<Money>,
}

/// Funds an owner put into a site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerLog {
    pub id: RecordId,
    pub owner_id: RecordId,
    pub site_id: RecordId,
    pub date: NaiveDate,
    pub amount: Money,
    #[serde(default)]
    pub note: Option<String>,
}

/// Body for creating or updating an owner log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerLogInput {
    pub date: NaiveDate,
    pub amount: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Payment made back to an owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerPaymentLog {
    pub id: RecordId,
    pub owner_id: RecordId,
    pub site_id: RecordId,
    pub date: NaiveDate,
    pub amount: Money,
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub reference: Option<String>,
}

/// Body for creating or updating an owner payment log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerPaymentLogInput {
    pub date: NaiveDate,
    pub amount: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

// ============================================================================
// REPORTS
// ============================================================================

/// Headline numbers for the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSummary {
    #[serde(default)]
    pub sites: Vec<Site>,
    pub total_budget: Money,
    pub total_spent: Money,
    #[serde(default)]
    pub cash_in_hand: Option<Money>,
    #[serde(default)]
    pub active_workers: Option<u32>,
    #[serde(default)]
    pub recent_expenses: Vec<Expense>,
}

/// Every ledger movement for a site over a date range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailedLogReport {
    #[serde(default)]
    pub cash_logs: Vec<CashLog>,
    #[serde(default)]
    pub material_costs: Vec<MaterialCost>,
    #[serde(default)]
    pub labor_entries: Vec<LaborEntry>,
    pub total: Money,
}

/// One worker's line in a weekly payout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyPayoutLine {
    pub mason_id: RecordId,
    pub mason_name: String,
    pub gross: Money,
    pub advances: Money,
    pub net: Money,
}

/// Labor payouts for a week, net of advances.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyPayoutReport {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub lines: Vec<WeeklyPayoutLine>,
    #[serde(default)]
    pub advances: Vec<MasonAdvance>,
    pub total: Money,
}

/// Cash received vs. spent per supervisor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupervisorFlow {
    pub supervisor_id: RecordId,
    pub supervisor_name: String,
    pub received: Money,
    pub spent: Money,
    pub balance: Money,
}

// ============================================================================
// BILLING
// ============================================================================

/// Razorpay settings as exposed to the admin dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RazorpaySettings {
    pub razorpay_key_id: String,
    /// Only ever sent on update; the backend masks it on read.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub razorpay_key_secret: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub plans: Vec<PlanSetting>,
}

/// A subscription plan offered to businesses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanSetting {
    pub name: String,
    pub amount: Money,
    pub currency: String,
    pub duration_days: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A business's subscription record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSubscription {
    pub id: RecordId,
    pub user_id: RecordId,
    pub plan_name: String,
    pub amount: Money,
    pub status: String,
    #[serde(default)]
    pub starts_at: Option<Timestamp>,
    #[serde(default)]
    pub ends_at: Option<Timestamp>,
}

/// Fields returned by the checkout gateway and forwarded for verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentVerification {
    pub razorpay_payment_id: String,
    pub razorpay_order_id: String,
    pub razorpay_signature: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_cash_log_reports_blank_fields() {
        let log = NewCashLog {
            user_id: "1".to_string(),
            site_id: " ".to_string(),
            date: "2025-01-01".to_string(),
            amount: String::new(),
        };
        assert_eq!(log.missing_required(), vec!["site_id", "amount"]);
    }

    #[test]
    fn test_cash_log_decodes_string_amount() {
        let json = r#"{"id":3,"site_id":2,"user_id":1,"date":"2025-01-01","amount":"500.00"}"#;
        let log: CashLog = serde_json::from_str(json).unwrap();
        assert_eq!(log.amount.as_str(), "500.00");
        assert!(log.note.is_none());
    }

    #[test]
    fn test_site_missing_name_is_rejected() {
        let json = r#"{"id":1,"business_id":1}"#;
        assert!(serde_json::from_str::<Site>(json).is_err());
    }
}

//! Sitebook Test Utilities
//!
//! Shared test infrastructure for the Sitebook workspace:
//! - Proptest generators for selections, money, and filter sets
//! - JSON fixtures shaped like real backend responses
//! - [`FakeBackend`], an in-process HTTP server that records requests

pub mod backend;

pub use backend::{CannedResponse, FakeBackend, RecordedRequest};

pub use sitebook_core::{
    DetailedLogFilters, LedgerFilters, Money, NewCashLog, SiteSelection, SupervisorFlowFilters,
    WeeklyPayoutFilters,
};

use chrono::NaiveDate;

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for Sitebook domain values.

    use super::*;
    use proptest::prelude::*;

    /// A numeric site id, as the backend issues them.
    pub fn arb_site_id() -> impl Strategy<Value = String> {
        "[1-9][0-9]{0,6}"
    }

    pub fn arb_site_selection() -> impl Strategy<Value = SiteSelection> {
        prop_oneof![
            1 => Just(SiteSelection::All),
            4 => arb_site_id().prop_map(SiteSelection::site),
        ]
    }

    /// Decimal amounts with up to two fractional digits.
    pub fn arb_money() -> impl Strategy<Value = Money> {
        (0i64..10_000_000, proptest::option::of(0u8..100)).prop_map(|(whole, cents)| {
            let text = match cents {
                Some(c) => format!("{}.{:02}", whole, c),
                None => whole.to_string(),
            };
            Money::parse(text).unwrap_or_else(|_| Money::zero())
        })
    }

    /// Dates within 2020..2030.
    pub fn arb_date() -> impl Strategy<Value = NaiveDate> {
        (0i64..3650).prop_map(|offset| {
            let epoch = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or_default();
            epoch + chrono::Duration::days(offset)
        })
    }

    /// An ordered `(start, end)` range of at most ninety days.
    pub fn arb_date_range() -> impl Strategy<Value = (NaiveDate, NaiveDate)> {
        (arb_date(), 0i64..90).prop_map(|(start, len)| (start, start + chrono::Duration::days(len)))
    }

    /// A cash log with every required field filled.
    pub fn arb_new_cash_log() -> impl Strategy<Value = NewCashLog> {
        (arb_site_id(), arb_site_id(), arb_date(), arb_money()).prop_map(|(user, site, date, amount)| {
            NewCashLog {
                user_id: user,
                site_id: site,
                date: date.to_string(),
                amount: amount.as_str().to_string(),
            }
        })
    }

    pub fn arb_detailed_log_filters() -> impl Strategy<Value = DetailedLogFilters> {
        (
            arb_site_id(),
            arb_site_id(),
            arb_date_range(),
            proptest::option::of(arb_site_id()),
        )
            .prop_map(|(business, site, (start, end), supervisor)| DetailedLogFilters {
                business_id: Some(business),
                site_id: Some(site),
                start_date: Some(start),
                end_date: Some(end),
                supervisor_id: supervisor,
            })
    }

    pub fn arb_weekly_payout_filters() -> impl Strategy<Value = WeeklyPayoutFilters> {
        (
            arb_site_id(),
            arb_date_range(),
            proptest::option::of(arb_site_id()),
            proptest::option::of(arb_site_id()),
        )
            .prop_map(|(business, (start, end), site, supervisor)| WeeklyPayoutFilters {
                business_id: Some(business),
                start_date: Some(start),
                end_date: Some(end),
                site_id: site,
                supervisor_id: supervisor,
            })
    }

    fn arb_optional_text() -> impl Strategy<Value = Option<String>> {
        proptest::option::of(prop_oneof![Just(String::new()), arb_site_id()])
    }

    /// Ledger filters where any field may be absent or blank.
    pub fn arb_ledger_filters() -> impl Strategy<Value = LedgerFilters> {
        (
            arb_optional_text(),
            arb_optional_text(),
            proptest::option::of(arb_date()),
            proptest::option::of(arb_date()),
        )
            .prop_map(|(site, user, start, end)| LedgerFilters {
                site_id: site,
                user_id: user,
                start_date: start,
                end_date: end,
            })
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

pub mod fixtures {
    //! Backend payloads and inputs for common scenarios.

    use super::*;
    use serde_json::{json, Value};

    pub fn date(value: &str) -> NaiveDate {
        value.parse().unwrap_or_default()
    }

    pub fn site_json(id: i64, name: &str) -> Value {
        json!({
            "id": id,
            "business_id": 1,
            "name": name,
            "address": "Plot 14, Ring Road",
            "currency": "INR",
            "budget": "2500000.00",
            "spent": "812500.50",
            "progress": 32.5
        })
    }

    /// `GET /dashboard` body in its `{status, data}` envelope.
    pub fn dashboard_response() -> Value {
        json!({
            "status": true,
            "data": {
                "sites": [site_json(2, "Riverside Villas"), site_json(3, "Hill View")],
                "total_budget": "5000000.00",
                "total_spent": "1625001.00",
                "cash_in_hand": "42000.00",
                "active_workers": 37,
                "recent_expenses": [{
                    "id": 90,
                    "site_id": 2,
                    "category": "material",
                    "amount": "18000.00",
                    "date": "2025-01-03",
                    "description": "Cement, 40 bags"
                }]
            }
        })
    }

    pub fn member_json(id: i64, name: &str) -> Value {
        json!({
            "id": id,
            "name": name,
            "email": format!("{}@example.com", name.to_lowercase()),
            "phone": "9800000000",
            "role": "supervisor",
            "site_id": 2
        })
    }

    /// `GET /member` body in its `{message, data}` envelope.
    pub fn members_response() -> Value {
        json!({
            "message": "Members fetched",
            "data": [member_json(1, "Asha"), member_json(2, "Ravi")]
        })
    }

    pub fn cash_log_json(id: i64, site_id: i64, amount: &str) -> Value {
        json!({
            "id": id,
            "site_id": site_id,
            "user_id": 1,
            "date": "2025-01-01",
            "amount": amount,
            "note": null
        })
    }

    pub fn cash_logs_response() -> Value {
        json!({
            "message": "Cash logs fetched",
            "data": [cash_log_json(1, 2, "500.00"), cash_log_json(2, 2, "1200.00")]
        })
    }

    pub fn expenses_response() -> Value {
        json!({
            "message": "Expenses fetched",
            "data": [{
                "id": 90,
                "site_id": 2,
                "category": "material",
                "amount": "18000.00",
                "date": "2025-01-03"
            }]
        })
    }

    pub fn owners_response() -> Value {
        json!({
            "message": "Owners fetched",
            "data": [
                { "id": 7, "site_id": 2, "name": "Meera", "share": "60" },
                { "id": 8, "site_id": 2, "name": "Karan", "share": "40" }
            ]
        })
    }

    pub fn owner_logs_response(owner_id: i64) -> Value {
        json!({
            "message": "Owner logs fetched",
            "data": [{
                "id": 100 + owner_id,
                "owner_id": owner_id,
                "site_id": 2,
                "date": "2025-01-05",
                "amount": "250000.00",
                "note": "Second tranche"
            }]
        })
    }

    pub fn plan_json(name: &str, amount: &str) -> Value {
        json!({
            "name": name,
            "amount": amount,
            "currency": "INR",
            "duration_days": 30
        })
    }

    pub fn razorpay_settings_response() -> Value {
        json!({
            "message": "Settings fetched",
            "data": {
                "razorpay_key_id": "rzp_test_123",
                "currency": "INR",
                "plans": [plan_json("Basic", "199"), plan_json("Pro", "499.50")]
            }
        })
    }

    pub fn subscription_json(id: i64, plan: &str) -> Value {
        json!({
            "id": id,
            "user_id": 1,
            "plan_name": plan,
            "amount": "499.50",
            "status": "active",
            "starts_at": "2025-01-01T00:00:00Z",
            "ends_at": "2025-01-31T00:00:00Z"
        })
    }

    /// A write acknowledged with a message and no record.
    pub fn ack(message: &str) -> Value {
        json!({ "message": message })
    }

    pub fn sample_new_cash_log() -> NewCashLog {
        NewCashLog {
            user_id: "1".to_string(),
            site_id: "2".to_string(),
            date: "2025-01-01".to_string(),
            amount: "500".to_string(),
        }
    }

    pub fn complete_detailed_log_filters() -> DetailedLogFilters {
        DetailedLogFilters {
            business_id: Some("9".to_string()),
            site_id: Some("2".to_string()),
            start_date: Some(date("2025-01-01")),
            end_date: Some(date("2025-01-31")),
            supervisor_id: None,
        }
    }

    pub fn complete_weekly_payout_filters() -> WeeklyPayoutFilters {
        WeeklyPayoutFilters {
            business_id: Some("9".to_string()),
            start_date: Some(date("2025-01-06")),
            end_date: Some(date("2025-01-12")),
            site_id: Some("2".to_string()),
            supervisor_id: None,
        }
    }

    pub fn complete_supervisor_flow_filters() -> SupervisorFlowFilters {
        SupervisorFlowFilters {
            business_id: Some("9".to_string()),
            ..Default::default()
        }
    }

    pub fn detailed_log_response() -> Value {
        json!({
            "message": "Report ready",
            "data": {
                "cash_logs": [cash_log_json(1, 2, "500.00")],
                "material_costs": [],
                "labor_entries": [],
                "total": "500.00"
            }
        })
    }
}

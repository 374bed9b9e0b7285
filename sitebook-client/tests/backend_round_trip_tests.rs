//! End-to-end tests against an in-process fake backend.

use async_trait::async_trait;
use serde_json::json;
use sitebook_cache::{RetryPolicy, QueryKey};
use sitebook_client::mutations::{CreateCashLog, DeleteOwnerLog, VerifyPayment};
use sitebook_client::notifications::{NotificationAction, NotificationLevel};
use sitebook_client::queries::{
    keys, CashLogsQuery, DashboardQuery, DetailedLogsQuery, ExpensesQuery, MembersQuery,
    OwnerLogsQuery, RazorpaySettingsQuery,
};
use sitebook_client::{
    CheckoutError, CheckoutGateway, CheckoutOptions, ClientConfig, ErrorKind, Prefill, Query,
    SiteClient,
};
use sitebook_core::{DetailedLogFilters, PaymentVerification, SiteContext, SiteSelection};
use sitebook_test_utils::fixtures::*;
use sitebook_test_utils::{CannedResponse, FakeBackend};
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_retries: 3,
        base_delay: Duration::from_millis(5),
        max_delay: Duration::from_millis(20),
    }
}

fn client_for(backend: &FakeBackend, selection: SiteSelection) -> SiteClient {
    let config = ClientConfig::new(backend.url())
        .with_token("test-token")
        .with_retry(fast_retry());
    SiteClient::with_site_context(config, SiteContext::in_memory(selection)).unwrap()
}

#[tokio::test]
async fn test_requests_carry_token_and_all_sites_header() {
    let backend = FakeBackend::start().await.unwrap();
    backend.respond("GET", "/dashboard", CannedResponse::ok(dashboard_response()));
    let client = client_for(&backend, SiteSelection::All);

    let state = client.queries().run(&DashboardQuery).await;
    assert!(state.is_success());
    assert_eq!(state.data.unwrap().sites.len(), 2);

    let requests = backend.requests_to("GET", "/dashboard");
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].header("authorization"), Some("Bearer test-token"));
    assert_eq!(requests[0].header("site_id"), Some("0"));
    assert_eq!(requests[0].header("content-type"), Some("application/json"));
}

#[tokio::test]
async fn test_site_switch_changes_header_and_invalidates_cache() {
    let backend = FakeBackend::start().await.unwrap();
    backend.respond("GET", "/member", CannedResponse::ok(members_response()));
    let client = client_for(&backend, SiteSelection::All);

    client.queries().run(&MembersQuery).await;
    assert!(!client.cache().is_stale(&MembersQuery.key()));

    assert!(client.select_site(SiteSelection::site("12")).unwrap());
    assert!(client.cache().is_stale(&MembersQuery.key()));

    client.queries().run(&MembersQuery).await;
    let requests = backend.requests_to("GET", "/member");
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].header("site_id"), Some("0"));
    assert_eq!(requests[1].header("site_id"), Some("12"));

    // Re-selecting the same site is not a change.
    assert!(!client.select_site(SiteSelection::site("12")).unwrap());
    assert!(!client.cache().is_stale(&MembersQuery.key()));
}

#[tokio::test]
async fn test_missing_token_still_dispatches_and_surfaces_backend_message() {
    let backend = FakeBackend::start().await.unwrap();
    backend.respond(
        "GET",
        "/dashboard",
        CannedResponse::json(401, json!({ "message": "Unauthenticated." })),
    );
    let config = ClientConfig::new(backend.url()).with_retry(RetryPolicy::none());
    let client =
        SiteClient::with_site_context(config, SiteContext::in_memory(SiteSelection::All)).unwrap();

    let state = client.queries().run(&DashboardQuery).await;
    let err = state.error.unwrap();
    assert_eq!(err.kind, ErrorKind::HttpStatus { status: 401 });
    assert_eq!(err.message, "Unauthenticated.");
    assert!(err.is_unauthorized());

    let requests = backend.requests_to("GET", "/dashboard");
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].header("authorization"), None);

    let note = client.notifications().latest().unwrap();
    assert_eq!(note.level, NotificationLevel::Error);
    assert_eq!(note.action, Some(NotificationAction::Retry));
}

#[tokio::test]
async fn test_error_without_message_uses_status_text() {
    let backend = FakeBackend::start().await.unwrap();
    backend.respond("GET", "/member", CannedResponse::bytes(500, "oops"));
    let config = ClientConfig::new(backend.url()).with_retry(RetryPolicy::none());
    let client =
        SiteClient::with_site_context(config, SiteContext::in_memory(SiteSelection::All)).unwrap();

    let err = client.queries().run(&MembersQuery).await.error.unwrap();
    assert_eq!(err.message, "Request failed with status code 500");
}

#[tokio::test]
async fn test_create_cash_log_invalidates_ledgers() {
    let backend = FakeBackend::start().await.unwrap();
    backend.respond("GET", "/cash-logs", CannedResponse::ok(cash_logs_response()));
    backend.respond("GET", "/expenses", CannedResponse::ok(expenses_response()));
    backend.respond("GET", "/member", CannedResponse::ok(members_response()));
    backend.respond("POST", "/cash-logs", CannedResponse::ok(ack("ok")));
    let client = client_for(&backend, SiteSelection::site("2"));

    client.queries().run(&CashLogsQuery::default()).await;
    client.queries().run(&ExpensesQuery::default()).await;
    client.queries().run(&MembersQuery).await;

    let outcome = client
        .mutations()
        .run(&CreateCashLog(sample_new_cash_log()))
        .await
        .unwrap();
    assert_eq!(outcome.message, "ok");
    assert!(outcome.data.is_none());
    assert_eq!(outcome.stale.len(), 2);

    assert!(client.cache().is_stale(&CashLogsQuery::default().key()));
    assert!(client.cache().is_stale(&ExpensesQuery::default().key()));
    assert!(!client.cache().is_stale(&MembersQuery.key()));

    let note = client.notifications().latest().unwrap();
    assert_eq!(note.level, NotificationLevel::Success);
    assert!(note.message.contains("ok"));

    let posted = backend.requests_to("POST", "/cash-logs");
    assert_eq!(posted.len(), 1);
    assert_eq!(
        posted[0].json().unwrap(),
        json!({ "user_id": "1", "site_id": "2", "date": "2025-01-01", "amount": "500" })
    );
    assert_eq!(posted[0].header("site_id"), Some("2"));
}

#[tokio::test]
async fn test_invalid_cash_log_never_reaches_backend() {
    let backend = FakeBackend::start().await.unwrap();
    let client = client_for(&backend, SiteSelection::All);

    let mut input = sample_new_cash_log();
    input.amount = String::new();
    let err = client.mutations().run(&CreateCashLog(input)).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);
    assert!(err.message.contains("amount"));
    assert_eq!(backend.request_count("POST", "/cash-logs"), 0);
}

#[tokio::test]
async fn test_incomplete_report_filters_make_no_request() {
    let backend = FakeBackend::start().await.unwrap();
    let client = client_for(&backend, SiteSelection::All);

    let query = DetailedLogsQuery {
        filters: DetailedLogFilters {
            business_id: Some("9".to_string()),
            ..Default::default()
        },
    };
    let state = client.queries().run(&query).await;
    assert!(state.is_idle());
    assert!(state.data.is_none());
    assert!(backend.requests().is_empty());
}

#[tokio::test]
async fn test_identical_report_reads_share_one_request() {
    let backend = FakeBackend::start().await.unwrap();
    backend.respond(
        "GET",
        "/reports/detailed-logs",
        CannedResponse::ok(detailed_log_response()).with_delay(Duration::from_millis(100)),
    );
    let client = client_for(&backend, SiteSelection::site("2"));

    let first = DetailedLogsQuery {
        filters: complete_detailed_log_filters(),
    };
    let second = first.clone();
    let (a, b) = tokio::join!(client.queries().run(&first), client.queries().run(&second));
    assert!(a.is_success());
    assert!(b.is_success());
    assert_eq!(a.data, b.data);

    let requests = backend.requests_to("GET", "/reports/detailed-logs");
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].query_param("business_id").as_deref(), Some("9"));
    assert_eq!(requests[0].query_param("start_date").as_deref(), Some("2025-01-01"));
    assert_eq!(requests[0].query_param("supervisor_id"), None);

    // Fresh data is served from cache.
    client.queries().run(&first).await;
    assert_eq!(backend.request_count("GET", "/reports/detailed-logs"), 1);
}

#[tokio::test]
async fn test_owner_write_invalidates_only_that_owner() {
    let backend = FakeBackend::start().await.unwrap();
    backend.respond("GET", "/owners/7/logs", CannedResponse::ok(owner_logs_response(7)));
    backend.respond("GET", "/owners/8/logs", CannedResponse::ok(owner_logs_response(8)));
    backend.respond("DELETE", "/owner-logs/107", CannedResponse::ok(ack("Deleted")));
    let client = client_for(&backend, SiteSelection::All);

    let seven = OwnerLogsQuery { owner_id: 7 };
    let eight = OwnerLogsQuery { owner_id: 8 };
    client.queries().run(&seven).await;
    client.queries().run(&eight).await;

    let outcome = client
        .mutations()
        .run(&DeleteOwnerLog {
            owner_id: 7,
            log_id: 107,
        })
        .await
        .unwrap();
    assert_eq!(outcome.message, "Deleted");
    assert_eq!(outcome.stale, vec![OwnerLogsQuery::key_for(7)]);

    assert!(client.cache().is_stale(&seven.key()));
    assert!(!client.cache().is_stale(&eight.key()));
}

#[tokio::test]
async fn test_disabled_owner_query_without_id() {
    let backend = FakeBackend::start().await.unwrap();
    let client = client_for(&backend, SiteSelection::All);

    let state = client.queries().run(&OwnerLogsQuery { owner_id: 0 }).await;
    assert!(state.is_idle());
    assert!(backend.requests().is_empty());
}

#[tokio::test]
async fn test_reads_retry_transient_failures() {
    let backend = FakeBackend::start().await.unwrap();
    backend.respond("GET", "/member", CannedResponse::ok(members_response()));
    backend.respond_once("GET", "/member", CannedResponse::json(503, json!({})));
    backend.respond_once("GET", "/member", CannedResponse::json(503, json!({})));
    let client = client_for(&backend, SiteSelection::All);

    let state = client.queries().run(&MembersQuery).await;
    assert!(state.is_success());
    assert_eq!(backend.request_count("GET", "/member"), 3);
}

#[tokio::test]
async fn test_reads_give_up_after_three_retries() {
    let backend = FakeBackend::start().await.unwrap();
    backend.respond("GET", "/member", CannedResponse::json(503, json!({ "error": "Down" })));
    let client = client_for(&backend, SiteSelection::All);

    let state = client.queries().run(&MembersQuery).await;
    assert!(state.is_error());
    assert_eq!(state.error.unwrap().message, "Down");
    assert_eq!(backend.request_count("GET", "/member"), 4);
}

#[tokio::test]
async fn test_writes_are_never_retried() {
    let backend = FakeBackend::start().await.unwrap();
    backend.respond(
        "POST",
        "/cash-logs",
        CannedResponse::json(503, json!({ "message": "Try later" })),
    );
    let client = client_for(&backend, SiteSelection::All);

    let err = client
        .mutations()
        .run(&CreateCashLog(sample_new_cash_log()))
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(503));
    assert_eq!(backend.request_count("POST", "/cash-logs"), 1);
    assert!(!client.mutations().is_pending());

    let note = client.notifications().latest().unwrap();
    assert_eq!(note.level, NotificationLevel::Error);
    assert_eq!(note.message, "Try later");
}

#[tokio::test]
async fn test_verify_payment_is_multipart() {
    let backend = FakeBackend::start().await.unwrap();
    backend.respond(
        "POST",
        "/package/verify-payment",
        CannedResponse::ok(json!({
            "message": "Payment verified successfully",
            "data": subscription_json(4, "Pro")
        })),
    );
    let client = client_for(&backend, SiteSelection::All);

    let payment = PaymentVerification {
        razorpay_payment_id: "pay_1".to_string(),
        razorpay_order_id: "order_1".to_string(),
        razorpay_signature: "sig_1".to_string(),
    };
    let outcome = client.mutations().run(&VerifyPayment(payment)).await.unwrap();
    assert_eq!(outcome.data.unwrap().plan_name, "Pro");
    assert_eq!(outcome.invalidated, vec![QueryKey::new(keys::USER_SUBSCRIPTIONS)]);

    let request = &backend.requests_to("POST", "/package/verify-payment")[0];
    let content_type = request.header("content-type").unwrap();
    assert!(content_type.starts_with("multipart/form-data"));
    let body = request.body_text();
    assert!(body.contains("name=\"razorpay_payment_id\""));
    assert!(body.contains("pay_1"));
    assert!(body.contains("sig_1"));
}

#[tokio::test]
async fn test_database_export_uses_disposition_filename() {
    let backend = FakeBackend::start().await.unwrap();
    backend.respond(
        "GET",
        "/database/export",
        CannedResponse::bytes(200, "CREATE TABLE sites;")
            .with_header("content-disposition", "attachment; filename=\"backup.sql\""),
    );
    let client = client_for(&backend, SiteSelection::All);

    let export = client.services().export.database().await.unwrap();
    assert_eq!(export.filename, "backup.sql");
    assert_eq!(export.bytes, b"CREATE TABLE sites;".to_vec());
}

#[tokio::test]
async fn test_unexpected_shape_is_reported() {
    let backend = FakeBackend::start().await.unwrap();
    backend.respond("GET", "/member", CannedResponse::ok(json!({ "data": "nope" })));
    let config = ClientConfig::new(backend.url()).with_retry(RetryPolicy::none());
    let client =
        SiteClient::with_site_context(config, SiteContext::in_memory(SiteSelection::All)).unwrap();

    let err = client.queries().run(&MembersQuery).await.error.unwrap();
    assert_eq!(err.kind, ErrorKind::UnexpectedShape);
}

#[tokio::test]
async fn test_site_switch_during_read_refetches_for_new_site() {
    let backend = FakeBackend::start().await.unwrap();
    backend.respond("GET", "/member", CannedResponse::ok(members_response()));
    backend.respond_once(
        "GET",
        "/member",
        CannedResponse::ok(json!({ "message": "Members fetched", "data": [member_json(1, "Asha")] }))
            .with_delay(Duration::from_millis(300)),
    );
    let client = client_for(&backend, SiteSelection::All);

    let in_flight = {
        let client = client.clone();
        tokio::spawn(async move { client.queries().run(&MembersQuery).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(backend.request_count("GET", "/member"), 1);

    assert!(client.select_site(SiteSelection::site("12")).unwrap());
    let state = client.queries().refetch(&MembersQuery).await;
    assert!(!state.is_stale);
    assert_eq!(state.data.unwrap().len(), 2);

    let requests = backend.requests_to("GET", "/member");
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].header("site_id"), Some("0"));
    assert_eq!(requests[1].header("site_id"), Some("12"));

    // The all-sites answer arrives last but does not replace site 12's.
    assert_eq!(in_flight.await.unwrap().data.unwrap().len(), 1);
    let cached = client.queries().run(&MembersQuery).await;
    assert_eq!(cached.data.unwrap().len(), 2);
    assert!(!cached.is_stale);
    assert_eq!(backend.request_count("GET", "/member"), 2);
}

#[tokio::test]
async fn test_write_during_read_is_reflected_by_next_read() {
    let backend = FakeBackend::start().await.unwrap();
    backend.respond("GET", "/cash-logs", CannedResponse::ok(cash_logs_response()));
    backend.respond_once(
        "GET",
        "/cash-logs",
        CannedResponse::ok(json!({ "message": "Cash logs fetched", "data": [cash_log_json(1, 2, "500.00")] }))
            .with_delay(Duration::from_millis(200)),
    );
    backend.respond("POST", "/cash-logs", CannedResponse::ok(ack("ok")));
    let client = client_for(&backend, SiteSelection::site("2"));

    let in_flight = {
        let client = client.clone();
        tokio::spawn(async move { client.queries().run(&CashLogsQuery::default()).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    client
        .mutations()
        .run(&CreateCashLog(sample_new_cash_log()))
        .await
        .unwrap();
    let state = client.queries().run(&CashLogsQuery::default()).await;
    assert_eq!(state.data.unwrap().len(), 2);
    assert_eq!(backend.request_count("GET", "/cash-logs"), 2);

    in_flight.await.unwrap();
    let cached = client.queries().run(&CashLogsQuery::default()).await;
    assert_eq!(cached.data.unwrap().len(), 2);
    assert_eq!(backend.request_count("GET", "/cash-logs"), 2);
}

#[tokio::test]
async fn test_blank_report_filter_is_not_sent() {
    let backend = FakeBackend::start().await.unwrap();
    backend.respond(
        "GET",
        "/reports/detailed-logs",
        CannedResponse::ok(detailed_log_response()),
    );
    let client = client_for(&backend, SiteSelection::site("2"));

    let mut filters = complete_detailed_log_filters();
    filters.supervisor_id = Some(String::new());
    let blank = DetailedLogsQuery { filters };
    assert!(client.queries().run(&blank).await.is_success());

    let requests = backend.requests_to("GET", "/reports/detailed-logs");
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].query_param("supervisor_id"), None);

    // Absent and blank share one cache entry.
    let absent = DetailedLogsQuery {
        filters: complete_detailed_log_filters(),
    };
    assert!(client.queries().run(&absent).await.is_success());
    assert_eq!(backend.request_count("GET", "/reports/detailed-logs"), 1);
}

#[tokio::test]
async fn test_reads_time_out_as_transport_errors() {
    let backend = FakeBackend::start().await.unwrap();
    backend.respond(
        "GET",
        "/member",
        CannedResponse::ok(members_response()).with_delay(Duration::from_millis(500)),
    );
    let mut config = ClientConfig::new(backend.url()).with_retry(fast_retry());
    config.request_timeout_ms = 50;
    let client =
        SiteClient::with_site_context(config, SiteContext::in_memory(SiteSelection::All)).unwrap();

    let err = client.queries().run(&MembersQuery).await.error.unwrap();
    assert_eq!(err.kind, ErrorKind::Transport);
    assert_eq!(err.message, "Request timed out");
    assert_eq!(backend.request_count("GET", "/member"), 4);
}

struct RecordingGateway {
    opened: Mutex<Vec<CheckoutOptions>>,
    result: Result<PaymentVerification, CheckoutError>,
}

impl RecordingGateway {
    fn new(result: Result<PaymentVerification, CheckoutError>) -> Arc<Self> {
        Arc::new(Self {
            opened: Mutex::new(Vec::new()),
            result,
        })
    }

    fn opened(&self) -> Vec<CheckoutOptions> {
        self.opened.lock().unwrap().clone()
    }
}

#[async_trait]
impl CheckoutGateway for RecordingGateway {
    async fn open(&self, options: CheckoutOptions) -> Result<PaymentVerification, CheckoutError> {
        self.opened.lock().unwrap().push(options);
        self.result.clone()
    }
}

fn completed_payment(order_id: &str) -> PaymentVerification {
    PaymentVerification {
        razorpay_payment_id: "pay_9".to_string(),
        razorpay_order_id: order_id.to_string(),
        razorpay_signature: "sig_9".to_string(),
    }
}

#[tokio::test]
async fn test_checkout_opens_gateway_then_verifies_payment() {
    let backend = FakeBackend::start().await.unwrap();
    backend.respond("GET", "/settings", CannedResponse::ok(razorpay_settings_response()));
    backend.respond(
        "POST",
        "/package/verify-payment",
        CannedResponse::ok(json!({
            "message": "Payment verified successfully",
            "data": subscription_json(4, "Pro")
        })),
    );
    let client = client_for(&backend, SiteSelection::All);

    let settings = client.queries().run(&RazorpaySettingsQuery).await.data.unwrap();
    let plan = settings.plans.iter().find(|p| p.name == "Pro").unwrap().clone();
    let gateway = RecordingGateway::new(Ok(completed_payment("order_9")));
    let prefill = Prefill {
        name: Some("Asha".to_string()),
        email: Some("asha@example.com".to_string()),
        contact: None,
    };

    let outcome = client
        .checkout(gateway.clone(), "Sitebook")
        .pay(&settings, &plan, "order_9", prefill.clone())
        .await
        .unwrap();
    assert_eq!(outcome.data.unwrap().plan_name, "Pro");
    assert_eq!(outcome.invalidated, vec![QueryKey::new(keys::USER_SUBSCRIPTIONS)]);

    let opened = gateway.opened();
    assert_eq!(opened.len(), 1);
    assert_eq!(opened[0].key, "rzp_test_123");
    assert_eq!(opened[0].amount, 49_950);
    assert_eq!(opened[0].currency, "INR");
    assert_eq!(opened[0].name, "Sitebook");
    assert_eq!(opened[0].order_id, "order_9");
    assert_eq!(opened[0].prefill, prefill);

    let verified = backend.requests_to("POST", "/package/verify-payment");
    assert_eq!(verified.len(), 1);
    assert!(verified[0]
        .header("content-type")
        .is_some_and(|value| value.starts_with("multipart/form-data")));
    let body = verified[0].body_text();
    assert!(body.contains("order_9"));
    assert!(body.contains("sig_9"));
}

#[tokio::test]
async fn test_dismissed_checkout_skips_verification() {
    let backend = FakeBackend::start().await.unwrap();
    backend.respond("GET", "/settings", CannedResponse::ok(razorpay_settings_response()));
    let client = client_for(&backend, SiteSelection::All);

    let settings = client.queries().run(&RazorpaySettingsQuery).await.data.unwrap();
    let plan = settings.plans[0].clone();
    let gateway = RecordingGateway::new(Err(CheckoutError::Dismissed));

    let err = client
        .checkout(gateway.clone(), "Sitebook")
        .pay(&settings, &plan, "order_1", Prefill::default())
        .await
        .unwrap_err();
    assert_eq!(err, CheckoutError::Dismissed);
    assert_eq!(gateway.opened().len(), 1);
    assert_eq!(gateway.opened()[0].amount, 19_900);
    assert_eq!(backend.request_count("POST", "/package/verify-payment"), 0);
}

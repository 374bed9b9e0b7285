//! One service per backend resource.
//!
//! A service validates required parameters, builds one request, and decodes
//! the resource's envelope. Services never retry; that is the cache's job.

mod dashboard;
mod export;
mod ledger;
mod members;
mod owners;
mod razorpay;
mod reports;

pub use dashboard::DashboardService;
pub use export::{DatabaseExport, ExportService};
pub use ledger::{CashLogService, ExpenseService, MaterialCostService};
pub use members::MemberService;
pub use owners::{OwnerLogService, OwnerPaymentLogService, OwnerService};
pub use razorpay::RazorpayService;
pub use reports::{DetailedLogService, LaborService, SupervisorFlowService, WeeklyPayoutService};

use crate::http::HttpClient;

/// Every service, sharing one [`HttpClient`].
#[derive(Clone)]
pub struct Services {
    pub dashboard: DashboardService,
    pub members: MemberService,
    pub cash_logs: CashLogService,
    pub expenses: ExpenseService,
    pub material_costs: MaterialCostService,
    pub detailed_logs: DetailedLogService,
    pub labor: LaborService,
    pub weekly_payouts: WeeklyPayoutService,
    pub supervisor_flow: SupervisorFlowService,
    pub owners: OwnerService,
    pub owner_logs: OwnerLogService,
    pub owner_payment_logs: OwnerPaymentLogService,
    pub razorpay: RazorpayService,
    pub export: ExportService,
}

impl Services {
    pub fn new(http: HttpClient) -> Self {
        Self {
            dashboard: DashboardService::new(http.clone()),
            members: MemberService::new(http.clone()),
            cash_logs: CashLogService::new(http.clone()),
            expenses: ExpenseService::new(http.clone()),
            material_costs: MaterialCostService::new(http.clone()),
            detailed_logs: DetailedLogService::new(http.clone()),
            labor: LaborService::new(http.clone()),
            weekly_payouts: WeeklyPayoutService::new(http.clone()),
            supervisor_flow: SupervisorFlowService::new(http.clone()),
            owners: OwnerService::new(http.clone()),
            owner_logs: OwnerLogService::new(http.clone()),
            owner_payment_logs: OwnerPaymentLogService::new(http.clone()),
            razorpay: RazorpayService::new(http.clone()),
            export: ExportService::new(http),
        }
    }
}

use sitebook_core::DashboardSummary;

use crate::envelope::StatusEnvelope;
use crate::error::ServiceResult;
use crate::http::HttpClient;

#[derive(Clone)]
pub struct DashboardService {
    http: HttpClient,
}

impl DashboardService {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    /// `GET /dashboard`, answered as `{status, data}`.
    pub async fn summary(&self) -> ServiceResult<DashboardSummary> {
        let envelope: StatusEnvelope<DashboardSummary> =
            self.http.get_json::<_, ()>("/dashboard", None).await?;
        envelope.into_data()
    }
}

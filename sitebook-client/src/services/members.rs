use sitebook_core::Member;

use crate::envelope::MessageEnvelope;
use crate::error::ServiceResult;
use crate::http::HttpClient;

#[derive(Clone)]
pub struct MemberService {
    http: HttpClient,
}

impl MemberService {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    /// `GET /member`, answered as `{message, data}`.
    pub async fn list(&self) -> ServiceResult<Vec<Member>> {
        let envelope: MessageEnvelope<Vec<Member>> =
            self.http.get_json::<_, ()>("/member", None).await?;
        Ok(envelope.into_data())
    }
}

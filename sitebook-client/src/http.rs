//! Shared HTTP client.
//!
//! Every request gets its headers computed at dispatch time: JSON content
//! type, the bearer token if one is available right now, and the `site_id`
//! scoping header read from the live [`SiteContext`]. Nothing is cached on the
//! client, so a site switch affects exactly the requests issued after it.

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_DISPOSITION, CONTENT_TYPE};
use reqwest::multipart::Form;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use sitebook_core::SiteContext;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::ClientConfig;
use crate::envelope;
use crate::error::{ServiceError, ServiceResult};

/// Name of the per-request scoping header.
pub const SITE_HEADER: &str = "site_id";

// ============================================================================
// TOKENS
// ============================================================================

/// Supplies the bearer token for a request about to be sent.
pub trait TokenSource: Send + Sync {
    /// `None` means send the request unauthenticated.
    fn token(&self) -> Option<String>;
}

/// A token fixed at startup.
#[derive(Clone)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl TokenSource for StaticToken {
    fn token(&self) -> Option<String> {
        Some(self.0.clone()).filter(|t| !t.trim().is_empty())
    }
}

/// A token read from disk on every request, so a login elsewhere takes
/// effect without a restart.
#[derive(Debug, Clone)]
pub struct FileToken {
    path: PathBuf,
}

impl FileToken {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl TokenSource for FileToken {
    fn token(&self) -> Option<String> {
        match crate::persistence::read_token(&self.path) {
            Ok(token) => token,
            Err(err) => {
                tracing::warn!(path = %self.path.display(), error = %err, "Failed to read token file");
                None
            }
        }
    }
}

/// Never authenticates.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoToken;

impl TokenSource for NoToken {
    fn token(&self) -> Option<String> {
        None
    }
}

// ============================================================================
// REQUESTS
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    Json(Value),
    /// Text fields sent as `multipart/form-data`.
    Multipart(Vec<(String, String)>),
}

/// One request, described before any headers are attached.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: RequestBody,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: RequestBody::Empty,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Flatten a serializable filter object into query pairs. Nulls are skipped.
    pub fn query<Q: Serialize + ?Sized>(mut self, params: &Q) -> ServiceResult<Self> {
        let value = serde_json::to_value(params).map_err(|e| {
            ServiceError::validation(format!("Query parameters could not be encoded: {}", e))
        })?;
        match value {
            Value::Object(map) => {
                for (name, value) in map {
                    if let Some(text) = query_text(&value) {
                        self.query.push((name, text));
                    }
                }
                Ok(self)
            }
            Value::Null => Ok(self),
            other => Err(ServiceError::validation(format!(
                "Query parameters must be an object, got {}",
                other
            ))),
        }
    }

    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> ServiceResult<Self> {
        let value = serde_json::to_value(body).map_err(|e| {
            ServiceError::validation(format!("Request body could not be encoded: {}", e))
        })?;
        self.body = RequestBody::Json(value);
        Ok(self)
    }

    pub fn multipart(mut self, fields: Vec<(String, String)>) -> Self {
        self.body = RequestBody::Multipart(fields);
        self
    }
}

fn query_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// A successful response, fully read.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub content_disposition: Option<String>,
    pub body: Vec<u8>,
}

// ============================================================================
// CLIENT
// ============================================================================

#[derive(Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    base_url: String,
    tokens: Arc<dyn TokenSource>,
    site: SiteContext,
    dev_mode: bool,
}

impl HttpClient {
    pub fn new(config: &ClientConfig, site: SiteContext) -> ServiceResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url().to_string(),
            tokens: config.token_source(),
            site,
            dev_mode: config.dev_mode,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn site(&self) -> &SiteContext {
        &self.site
    }

    /// Headers for a request dispatched now.
    pub fn headers_for(&self, body: &RequestBody) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if !matches!(body, RequestBody::Multipart(_)) {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }
        if let Some(token) = self.tokens.token() {
            match HeaderValue::from_str(&format!("Bearer {}", token)) {
                Ok(value) => {
                    headers.insert(AUTHORIZATION, value);
                }
                Err(_) => tracing::warn!("Bearer token contains invalid header characters; sending unauthenticated"),
            }
        }
        let scope = self.site.scope_header();
        match HeaderValue::from_str(&scope) {
            Ok(value) => {
                headers.insert(SITE_HEADER, value);
            }
            Err(_) => tracing::warn!(site_id = %scope, "Site id is not a valid header value"),
        }
        headers
    }

    /// Send one request. Non-2xx answers become [`ServiceError`]s carrying the
    /// backend's message.
    pub async fn send(&self, call: ApiRequest) -> ServiceResult<HttpResponse> {
        let url = format!("{}{}", self.base_url, call.path);
        let headers = self.headers_for(&call.body);
        let site_id = headers
            .get(SITE_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        let mut request = self
            .client
            .request(call.method.clone(), url)
            .headers(headers);
        if !call.query.is_empty() {
            request = request.query(&call.query);
        }
        request = match call.body {
            RequestBody::Empty => request,
            RequestBody::Json(value) => request.json(&value),
            RequestBody::Multipart(fields) => {
                let form = fields
                    .into_iter()
                    .fold(Form::new(), |form, (name, value)| form.text(name, value));
                request.multipart(form)
            }
        };

        let response = match request.send().await {
            Ok(response) => response,
            Err(err) => {
                let err = ServiceError::from(err);
                if self.dev_mode {
                    tracing::debug!(
                        method = %call.method,
                        path = %call.path,
                        site_id = %site_id,
                        error = %err,
                        "Request failed"
                    );
                }
                return Err(err);
            }
        };

        let status = response.status().as_u16();
        let content_disposition = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await?.to_vec();

        if self.dev_mode {
            tracing::debug!(
                method = %call.method,
                path = %call.path,
                site_id = %site_id,
                status,
                "Request completed"
            );
        }

        if !(200..300).contains(&status) {
            return Err(ServiceError::http_status(
                status,
                envelope::error_message(status, &body),
            ));
        }

        Ok(HttpResponse {
            status,
            content_disposition,
            body,
        })
    }

    pub async fn get_json<T, Q>(&self, path: &str, params: Option<&Q>) -> ServiceResult<T>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let mut call = ApiRequest::get(path);
        if let Some(params) = params {
            call = call.query(params)?;
        }
        let response = self.send(call).await?;
        envelope::decode(&response.body)
    }

    pub async fn post_json<T, B>(&self, path: &str, body: &B) -> ServiceResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let response = self.send(ApiRequest::post(path).json(body)?).await?;
        envelope::decode(&response.body)
    }

    pub async fn put_json<T, B>(&self, path: &str, body: &B) -> ServiceResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let response = self.send(ApiRequest::put(path).json(body)?).await?;
        envelope::decode(&response.body)
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> ServiceResult<T> {
        let response = self.send(ApiRequest::delete(path)).await?;
        envelope::decode(&response.body)
    }

    pub async fn post_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        fields: Vec<(String, String)>,
    ) -> ServiceResult<T> {
        let response = self.send(ApiRequest::post(path).multipart(fields)).await?;
        envelope::decode(&response.body)
    }

    /// Raw body, for downloads.
    pub async fn get_bytes(&self, path: &str) -> ServiceResult<HttpResponse> {
        self.send(ApiRequest::get(path)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use sitebook_core::{DetailedLogFilters, SiteSelection};

    fn client(site: SiteSelection, token: Option<&str>) -> HttpClient {
        let mut config = ClientConfig::new("http://127.0.0.1:9");
        config.auth.token = token.map(str::to_string);
        HttpClient::new(&config, SiteContext::in_memory(site)).unwrap()
    }

    #[test]
    fn test_headers_for_all_sites() {
        let headers = client(SiteSelection::All, Some("tok")).headers_for(&RequestBody::Empty);
        assert_eq!(headers.get(SITE_HEADER).unwrap(), "0");
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer tok");
        assert_eq!(headers.get(CONTENT_TYPE).unwrap(), "application/json");
    }

    #[test]
    fn test_headers_without_token_omit_authorization() {
        let headers = client(SiteSelection::site("17"), None).headers_for(&RequestBody::Empty);
        assert_eq!(headers.get(SITE_HEADER).unwrap(), "17");
        assert!(headers.get(AUTHORIZATION).is_none());
    }

    #[test]
    fn test_site_header_follows_live_selection() {
        let http = client(SiteSelection::All, None);
        assert_eq!(http.headers_for(&RequestBody::Empty).get(SITE_HEADER).unwrap(), "0");
        http.site().select(SiteSelection::site("5")).unwrap();
        assert_eq!(http.headers_for(&RequestBody::Empty).get(SITE_HEADER).unwrap(), "5");
    }

    #[test]
    fn test_multipart_lets_reqwest_set_content_type() {
        let headers = client(SiteSelection::All, None)
            .headers_for(&RequestBody::Multipart(vec![("a".into(), "b".into())]));
        assert!(headers.get(CONTENT_TYPE).is_none());
    }

    #[test]
    fn test_query_skips_absent_filters() {
        let filters = DetailedLogFilters {
            business_id: Some("3".into()),
            site_id: Some("4".into()),
            start_date: NaiveDate::from_ymd_opt(2025, 1, 1),
            end_date: NaiveDate::from_ymd_opt(2025, 1, 31),
            supervisor_id: None,
        };
        let call = ApiRequest::get("/reports/detailed-logs").query(&filters).unwrap();
        assert!(call.query.contains(&("start_date".to_string(), "2025-01-01".to_string())));
        assert!(!call.query.iter().any(|(k, _)| k == "supervisor_id"));
        assert_eq!(call.query.len(), 4);
    }

    #[test]
    fn test_query_rejects_non_objects() {
        assert!(ApiRequest::get("/x").query(&[1, 2]).is_err());
    }
}

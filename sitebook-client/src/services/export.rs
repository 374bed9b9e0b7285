use chrono::Utc;

use crate::error::ServiceResult;
use crate::http::HttpClient;

/// A downloaded database dump.
#[derive(Debug, Clone)]
pub struct DatabaseExport {
    pub filename: String,
    pub bytes: Vec<u8>,
}

#[derive(Clone)]
pub struct ExportService {
    http: HttpClient,
}

impl ExportService {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    /// `GET /database/export`. The filename comes from `Content-Disposition`
    /// when the backend sends one.
    pub async fn database(&self) -> ServiceResult<DatabaseExport> {
        let response = self.http.get_bytes("/database/export").await?;
        let filename = response
            .content_disposition
            .as_deref()
            .and_then(filename_from_disposition)
            .unwrap_or_else(default_filename);
        tracing::info!(filename = %filename, bytes = response.body.len(), "Database export downloaded");
        Ok(DatabaseExport {
            filename,
            bytes: response.body,
        })
    }
}

fn default_filename() -> String {
    format!("sitebook-export-{}.sql", Utc::now().format("%Y-%m-%d"))
}

fn filename_from_disposition(header: &str) -> Option<String> {
    header
        .split(';')
        .map(str::trim)
        .find_map(|part| part.strip_prefix("filename="))
        .map(|name| name.trim_matches('"').to_string())
        .filter(|name| !name.is_empty() && !name.contains('/') && !name.contains('\\'))
}

// src/source.rs
use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info};
use url::Url;

use crate::models::{Absence, AnalysisPeriod, Employee, PublicHoliday, Snapshot, Task};

const EMPLOYEES_ENDPOINT: &str = "employees";
const TASKS_ENDPOINT: &str = "tasks";
const HOLIDAYS_ENDPOINT: &str = "public-holidays";
const ABSENCES_ENDPOINT: &str = "absences";

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("HTTP request failed")]
    Request(#[from] reqwest::Error),

    #[error("JSON processing error")]
    Json(#[from] serde_json::Error),

    #[error("File I/O error: {context}")]
    Io {
        #[source]
        source: std::io::Error,
        context: String,
    },

    #[error("URL parsing error")]
    UrlParse(#[from] url::ParseError),

    #[error("Backend error: Status={status}, Message='{message}'")]
    Backend { status: StatusCode, message: String },
}

/// Supplies the records one analysis runs over.
#[async_trait]
pub trait RecordSource: Send + Sync {
    async fn load_snapshot(&self, period: &AnalysisPeriod) -> Result<Snapshot, SourceError>;

    /// Short label for logs and the status endpoint.
    fn describe(&self) -> String;
}

// --- File Source ---

/// A JSON snapshot on disk. The whole file is returned; the engine filters by period.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

pub fn parse_snapshot(json: &str) -> Result<Snapshot, SourceError> {
    Ok(serde_json::from_str(json)?)
}

#[async_trait]
impl RecordSource for FileSource {
    async fn load_snapshot(&self, _period: &AnalysisPeriod) -> Result<Snapshot, SourceError> {
        let contents = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| SourceError::Io {
                source,
                context: format!("reading snapshot {}", self.path.display()),
            })?;
        let snapshot = parse_snapshot(&contents)?;
        info!(
            "Loaded snapshot from {}: {} employees, {} tasks, {} holidays, {} absences",
            self.path.display(),
            snapshot.employees.len(),
            snapshot.tasks.len(),
            snapshot.holidays.len(),
            snapshot.absences.len()
        );
        Ok(snapshot)
    }

    fn describe(&self) -> String {
        format!("file:{}", self.path.display())
    }
}

// --- REST Source ---

/// The dashboard's REST backend. Collections are plain JSON arrays.
#[derive(Debug, Clone)]
pub struct RestSource {
    http_client: Client,
    base_url: Url,
    token: Option<String>,
}

impl RestSource {
    pub fn new(
        base_url: &str,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, SourceError> {
        // Without a trailing slash `Url::join` would replace the last path segment.
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{}/", base_url)
        };
        let base_url = Url::parse(&normalized)?;
        let http_client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http_client,
            base_url,
            token,
        })
    }

    pub fn endpoint_url(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
    ) -> Result<Url, SourceError> {
        let mut url = self.base_url.join(endpoint.trim_start_matches('/'))?;
        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(key, value)| (*key, value.as_str())));
        }
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
        context_msg: &str,
    ) -> Result<T, SourceError> {
        let url = self.endpoint_url(endpoint, query)?;
        debug!("Sending request for '{}' to URL: {}", context_msg, url);

        let mut request = self
            .http_client
            .get(url.clone())
            .header(ACCEPT, "application/json");
        if let Some(token) = &self.token {
            request = request.header(AUTHORIZATION, format!("Bearer {}", token));
        }

        let response = request.send().await.map_err(|e| {
            error!(
                "HTTP execution failed for '{}' (URL: {}): {}",
                context_msg, url, e
            );
            SourceError::Request(e)
        })?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|e| format!("Failed to read error body: {}", e));
            error!(
                "Backend Error Response: Status={}, Body='{}' for URL: {}",
                status, message, url
            );
            return Err(SourceError::Backend { status, message });
        }

        let bytes = response.bytes().await?;
        let data = serde_json::from_slice::<T>(&bytes).map_err(|e| {
            error!(
                "JSON deserialization failed for '{}' (URL: {}): {}",
                context_msg, url, e
            );
            SourceError::Json(e)
        })?;
        Ok(data)
    }
}

fn period_query(period: &AnalysisPeriod) -> Vec<(&'static str, String)> {
    vec![
        ("from", period.start.format("%Y-%m-%d").to_string()),
        ("to", period.end.format("%Y-%m-%d").to_string()),
    ]
}

#[async_trait]
impl RecordSource for RestSource {
    async fn load_snapshot(&self, period: &AnalysisPeriod) -> Result<Snapshot, SourceError> {
        let range = period_query(period);
        let (employees, tasks, holidays, absences) = tokio::try_join!(
            self.get_json::<Vec<Employee>>(EMPLOYEES_ENDPOINT, &[], "Get Employees"),
            self.get_json::<Vec<Task>>(TASKS_ENDPOINT, &range, "Get Tasks"),
            self.get_json::<Vec<PublicHoliday>>(HOLIDAYS_ENDPOINT, &[], "Get Public Holidays"),
            self.get_json::<Vec<Absence>>(ABSENCES_ENDPOINT, &range, "Get Absences"),
        )?;
        info!(
            "Loaded snapshot from {} for {}..{}: {} employees, {} tasks, {} holidays, {} absences",
            self.base_url,
            period.start,
            period.end,
            employees.len(),
            tasks.len(),
            holidays.len(),
            absences.len()
        );
        Ok(Snapshot {
            employees,
            tasks,
            holidays,
            absences,
        })
    }

    fn describe(&self) -> String {
        format!("rest:{}", self.base_url)
    }
}

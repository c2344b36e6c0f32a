//! Sync-server collaborator.
//!
//! Bearer-authenticated JSON over HTTP. Analysis results go through the
//! [`SyncSink`] trait so the orchestrator can forward them without knowing
//! about HTTP; full record pushes and pulls are only used by the CLI.

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};

use crate::analytics::summary::LocalAnalysis;
use crate::config::SyncConfig;
use crate::error::{Error, Result};
use crate::store::RecordStore;
use crate::types::{AttendanceHistory, Roster, StudentStatistic};

/// Wire format version sent in every payload's metadata.
pub const SYNC_VERSION: &str = "1.0";

/// Receives analysis results after they have been returned to the caller.
pub trait SyncSink: Send + Sync + 'static {
    fn send(&self, payload: SyncPayload) -> impl Future<Output = Result<SyncReceipt>> + Send;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncMetadata {
    pub send_time: DateTime<Utc>,
    pub data_type: String,
    pub version: String,
}

/// One analysis result as forwarded to the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncPayload {
    pub metadata: SyncMetadata,
    pub analysis_result: Option<String>,
    pub student_stats: Vec<StudentStatistic>,
    pub local_analysis: LocalAnalysis,
}

impl SyncPayload {
    pub fn new(
        analysis_result: Option<String>,
        student_stats: Vec<StudentStatistic>,
        local_analysis: LocalAnalysis,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            metadata: SyncMetadata {
                send_time: now,
                data_type: "attendance_analysis".to_string(),
                version: SYNC_VERSION.to_string(),
            },
            analysis_result,
            student_stats,
            local_analysis,
        }
    }
}

/// Outcome of a successful send.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncReceipt {
    pub success: bool,
    pub message: String,
    /// Whatever the server answered with
    pub server_response: serde_json::Value,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FullSyncMetadata {
    sync_time: DateTime<Utc>,
    data_type: &'static str,
    version: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FullSyncRequest<'a> {
    metadata: FullSyncMetadata,
    student_data: &'a Roster,
    attendance_history: &'a AttendanceHistory,
    local_analysis: &'a LocalAnalysis,
}

/// Outcome of a full record push.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushReceipt {
    pub sync_id: Option<String>,
    pub synced_at: DateTime<Utc>,
}

/// Records as returned by `GET /data`.
#[derive(Debug, Deserialize)]
struct ServerRecords {
    #[serde(alias = "studentData")]
    students: Option<Roster>,
    #[serde(alias = "attendanceHistory")]
    attendance: Option<AttendanceHistory>,
}

/// Answer of `GET /status`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerStatus {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub version: Option<String>,
}

impl ServerStatus {
    pub fn is_ok(&self) -> bool {
        matches!(self.status.as_str(), "ok" | "online")
    }
}

/// HTTP client for the sync server.
pub struct SyncClient {
    http: reqwest::Client,
    server_url: String,
}

impl SyncClient {
    /// Create a client; needs a server URL and a usable key.
    pub fn new(config: &SyncConfig) -> Result<Self> {
        let server_url = config
            .server_url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .ok_or_else(|| Error::Config("sync.server_url is required".to_string()))?
            .trim_end_matches('/')
            .to_string();
        if !config.has_valid_server_key() {
            return Err(Error::Config(
                "sync.api_key is missing or too short".to_string(),
            ));
        }
        let api_key = config.api_key.as_deref().unwrap_or_default().trim();

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", api_key))
                .map_err(|e| Error::Config(format!("invalid sync.api_key: {}", e)))?,
        );

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .map_err(|e| Error::Sync(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { http, server_url })
    }

    /// Check server reachability.
    pub async fn check_status(&self) -> Result<ServerStatus> {
        let url = format!("{}/status", self.server_url);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Sync(format!("request failed: {}", e)))?;
        let body = success_body(response).await?;
        serde_json::from_str(&body)
            .map_err(|e| Error::Sync(format!("failed to parse status: {}", e)))
    }

    /// Upload the whole roster and history with a fresh local analysis.
    pub async fn push_records(
        &self,
        store: &RecordStore,
        local_analysis: &LocalAnalysis,
        now: DateTime<Utc>,
    ) -> Result<PushReceipt> {
        let request = FullSyncRequest {
            metadata: FullSyncMetadata {
                sync_time: now,
                data_type: "attendance_full_sync",
                version: SYNC_VERSION,
            },
            student_data: &store.students,
            attendance_history: &store.attendance,
            local_analysis,
        };

        let url = format!("{}/sync", self.server_url);
        let response = self
            .http
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Sync(format!("request failed: {}", e)))?;
        let body = success_body(response).await?;
        let json: serde_json::Value = serde_json::from_str(&body)
            .map_err(|e| Error::Sync(format!("failed to parse response: {}", e)))?;

        let sync_id = json
            .get("syncId")
            .and_then(|v| v.as_str())
            .map(ToString::to_string);
        tracing::info!(sync_id = ?sync_id, "Pushed records to sync server");

        Ok(PushReceipt {
            sync_id,
            synced_at: now,
        })
    }

    /// Download records, optionally a specific pushed snapshot.
    pub async fn fetch_records(&self, sync_id: Option<&str>) -> Result<RecordStore> {
        let url = match sync_id {
            Some(id) => format!("{}/data?syncId={}", self.server_url, urlencoding::encode(id)),
            None => format!("{}/data", self.server_url),
        };

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Sync(format!("request failed: {}", e)))?;
        let body = success_body(response).await?;
        let records: ServerRecords = serde_json::from_str(&body)
            .map_err(|e| Error::Sync(format!("failed to parse records: {}", e)))?;

        match (records.students, records.attendance) {
            (Some(students), Some(attendance)) => {
                tracing::info!(
                    classes = students.len(),
                    dates = attendance.len(),
                    "Fetched records from sync server"
                );
                Ok(RecordStore {
                    students,
                    attendance,
                })
            }
            _ => Err(Error::Sync(
                "server response is missing students or attendance".to_string(),
            )),
        }
    }

    async fn send_payload(&self, payload: SyncPayload) -> Result<SyncReceipt> {
        let response = self
            .http
            .post(&self.server_url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| Error::Sync(format!("request failed: {}", e)))?;
        let body = success_body(response).await?;
        let server_response = serde_json::from_str(&body).unwrap_or(serde_json::Value::Null);

        Ok(SyncReceipt {
            success: true,
            message: "analysis sent to sync server".to_string(),
            server_response,
        })
    }
}

impl SyncSink for SyncClient {
    fn send(&self, payload: SyncPayload) -> impl Future<Output = Result<SyncReceipt>> + Send {
        self.send_payload(payload)
    }
}

async fn success_body(response: reqwest::Response) -> Result<String> {
    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| Error::Sync(format!("failed to read response: {}", e)))?;
    if !status.is_success() {
        return Err(Error::Sync(format!("API error ({}): {}", status, text)));
    }
    Ok(text)
}

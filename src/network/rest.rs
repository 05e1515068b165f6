//! REST client for the cloud backend

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde_json::{json, Map, Value};
use tracing::{debug, info};

use super::{AlertSink, MetricsUploader, UploadRecord};
use crate::config::CloudConfig;
use crate::detection::Alert;
use crate::error::NetworkError;

/// Client for the PostgREST-style backend (`/rest/v1/<table>`)
pub struct RestClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    user_id: String,
}

impl RestClient {
    pub fn new(base_url: &str, config: &CloudConfig) -> Result<Self, NetworkError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_s.max(1)))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            user_id: config.user_id.clone(),
        })
    }

    fn endpoint(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Ok(key) = HeaderValue::from_str(&self.api_key) {
            headers.insert("apikey", key);
        }
        if let Ok(bearer) = HeaderValue::from_str(&format!("Bearer {}", self.api_key)) {
            headers.insert(AUTHORIZATION, bearer);
        }
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert("Prefer", HeaderValue::from_static("return=minimal"));
        headers
    }

    /// Alert row: the alert without its monotonic timestamp, plus owner and
    /// wall-clock creation time
    pub fn alert_row(&self, alert: &Alert, created_at: DateTime<Utc>) -> Result<Value, NetworkError> {
        let mut row = serde_json::to_value(alert)?;
        if let Value::Object(ref mut fields) = row {
            fields.remove("timestamp");
            fields.insert("user_id".to_string(), json!(self.user_id));
            fields.insert("created_at".to_string(), json!(created_at.to_rfc3339()));
        }
        Ok(row)
    }

    /// Gait rows carry the metrics as a JSON string column
    pub fn gait_rows(&self, batch: &[UploadRecord]) -> Result<Vec<Value>, NetworkError> {
        batch
            .iter()
            .map(|record| {
                let mut metrics: Map<String, Value> = match serde_json::to_value(&record.metrics)? {
                    Value::Object(fields) => fields,
                    _ => Map::new(),
                };
                metrics.remove("timestamp");

                Ok(json!({
                    "user_id": self.user_id,
                    "created_at": record.recorded_at.to_rfc3339(),
                    "metrics": serde_json::to_string(&metrics)?,
                }))
            })
            .collect()
    }

    async fn post(&self, table: &str, body: &Value) -> Result<(), NetworkError> {
        let url = self.endpoint(table);
        let response = self.http.post(&url).headers(self.headers()).json(body).send().await?;

        let status = response.status();
        if !matches!(status.as_u16(), 200 | 201) {
            let body = response.text().await.unwrap_or_default();
            return Err(NetworkError::Status {
                endpoint: url,
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }

    /// Fetch the wearer's remote configuration row, or an empty object
    pub async fn fetch_user_config(&self) -> Result<Value, NetworkError> {
        let url = self.endpoint("user_config");
        let response = self
            .http
            .get(&url)
            .headers(self.headers())
            .query(&[("user_id", format!("eq.{}", self.user_id)), ("select", "*".to_string())])
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() != 200 {
            let body = response.text().await.unwrap_or_default();
            return Err(NetworkError::Status {
                endpoint: url,
                status: status.as_u16(),
                body,
            });
        }

        let rows: Vec<Value> = response.json().await?;
        Ok(rows.into_iter().next().unwrap_or_else(|| json!({})))
    }
}

#[async_trait]
impl AlertSink for RestClient {
    fn name(&self) -> &str {
        "rest"
    }

    async fn deliver(&self, alert: &Alert) -> Result<(), NetworkError> {
        let row = self.alert_row(alert, Utc::now())?;
        self.post("alerts", &row).await?;
        info!("Successfully sent alert: {}", alert.alert_type);
        Ok(())
    }
}

#[async_trait]
impl MetricsUploader for RestClient {
    async fn upload(&self, batch: &[UploadRecord]) -> Result<(), NetworkError> {
        if batch.is_empty() {
            return Ok(());
        }
        let rows = self.gait_rows(batch)?;
        self.post("gait_data", &Value::Array(rows)).await?;
        debug!("Uploaded {} gait records", batch.len());
        Ok(())
    }
}

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

/// Header the probe sets to the raw state name.
pub const STATE_HEADER: &str = "x-health-state";

/// One probe answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeReport {
    pub status: StatusCode,
    /// State name from the `x-health-state` header, when present.
    pub state: Option<String>,
    pub body: String,
}

impl ProbeReport {
    /// What an orchestrator would conclude from this answer.
    pub fn is_healthy(&self) -> bool {
        self.status.is_success()
    }
}

/// Monitor snapshot as served by the details endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Details {
    pub state: String,
    pub uncaught_exceptions: u64,
    pub unhandled_rejections: u64,
    pub event_loop_lag_ms: f64,
    pub escalation_limit_secs: f64,
    pub escalation_armed_secs: Option<f64>,
    pub uptime_secs: f64,
    pub grace_remaining_secs: f64,
}

pub struct ProbeClient {
    client: Client,
    base_url: String,
}

impl ProbeClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Hit the probe path. Any HTTP answer, including 5xx, is a report.
    pub async fn probe(&self, path: &str) -> Result<ProbeReport, reqwest::Error> {
        let resp = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await?;

        let status = resp.status();
        let state = resp
            .headers()
            .get(STATE_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = resp.text().await?;

        Ok(ProbeReport {
            status,
            state,
            body,
        })
    }

    /// Fetch the JSON snapshot from the details path.
    pub async fn details(&self, path: &str) -> Result<Details, Box<dyn std::error::Error>> {
        let resp = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;

        if !status.is_success() {
            return Err(format!("Probe returned error status {}: {}", status, text).into());
        }

        Ok(serde_json::from_str::<Details>(&text)?)
    }
}

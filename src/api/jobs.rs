use std::sync::Arc;
use tracing::debug;

use super::policy::{Operation, recover};
use crate::error::{ApiError, ApiResult};
use crate::fallback::{OfflineState, filter_jobs};
use crate::models::Job;
use crate::transport::Transport;

pub struct JobsApi {
    transport: Arc<Transport>,
    offline: Arc<OfflineState>,
}

impl JobsApi {
    pub fn new(transport: Arc<Transport>, offline: Arc<OfflineState>) -> Self {
        Self { transport, offline }
    }

    /// Search listings. An empty query lists everything.
    pub async fn search(&self, query: &str) -> ApiResult<Vec<Job>> {
        let path = format!("/jobs/?q={}", urlencoding::encode(query));
        let result = self
            .transport
            .get_json::<serde_json::Value>(&path)
            .await
            .and_then(jobs_from_value);

        if let Ok(jobs) = &result {
            self.offline.remember_jobs(jobs);
        }
        recover(Operation::JobsSearch, result, |_| Ok(filter_jobs(self.offline.all_jobs(), query)))
    }

    pub async fn get(&self, id: &str) -> ApiResult<Job> {
        let result = self
            .transport
            .get_json::<Job>(&format!("/jobs/{}/", urlencoding::encode(id)))
            .await;

        if let Ok(job) = &result {
            self.offline.remember_jobs(std::slice::from_ref(job));
        }
        recover(Operation::JobsGet, result, |_| {
            self.offline
                .find_job(id)
                .ok_or_else(|| ApiError::not_found("Job not found"))
        })
    }
}

// Anything other than an array means "no results"
fn jobs_from_value(value: serde_json::Value) -> ApiResult<Vec<Job>> {
    if !value.is_array() {
        debug!("job search returned a non-array body");
        return Ok(Vec::new());
    }
    serde_json::from_value(value)
        .map_err(|e| ApiError::new(200, format!("failed to decode response: {}", e)))
}

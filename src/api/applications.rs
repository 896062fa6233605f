use reqwest::Method;
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

use super::policy::{Operation, recover};
use crate::error::{ApiError, ApiResult};
use crate::fallback::OfflineState;
use crate::models::{Application, Job, Stage, today};
use crate::transport::Transport;

pub struct ApplicationsApi {
    transport: Arc<Transport>,
    offline: Arc<OfflineState>,
}

// The backend keys jobs by integer; send one when the id allows it
fn job_id_value(job_id: &str) -> serde_json::Value {
    match job_id.parse::<i64>() {
        Ok(n) => json!(n),
        Err(_) => json!(job_id),
    }
}

impl ApplicationsApi {
    pub fn new(transport: Arc<Transport>, offline: Arc<OfflineState>) -> Self {
        Self { transport, offline }
    }

    /// The backend's list, with no fallback applied.
    pub async fn fetch_remote(&self) -> ApiResult<Vec<Application>> {
        let apps = self
            .transport
            .get_json::<Vec<Application>>("/applications/")
            .await?;
        let jobs: Vec<Job> = apps.iter().filter_map(|app| app.job.clone()).collect();
        self.offline.remember_jobs(&jobs);
        Ok(apps)
    }

    pub async fn list(&self) -> ApiResult<Vec<Application>> {
        let result = self.fetch_remote().await;
        self.or_offline_list(result)
    }

    /// Degrade a failed list read to the offline records.
    pub fn or_offline_list(&self, result: ApiResult<Vec<Application>>) -> ApiResult<Vec<Application>> {
        recover(Operation::ApplicationsList, result, |_| {
            Ok(self.offline.applications())
        })
    }

    /// The list a write decision can trust. Only an unreachable backend
    /// degrades to the offline records, since the write that follows lands
    /// there too; any other failure propagates.
    pub fn or_offline_when_unreachable(
        &self,
        result: ApiResult<Vec<Application>>,
    ) -> ApiResult<Vec<Application>> {
        match result {
            Err(err) if err.is_network() => {
                debug!("backend unreachable; deciding against offline applications");
                Ok(self.offline.applications())
            }
            other => other,
        }
    }

    /// Create an application for `job_id`. `date_applied` is stamped only
    /// when the record starts out as `applied`.
    pub async fn create(&self, job_id: &str, stage: Stage) -> ApiResult<Application> {
        let date_applied = (stage == Stage::Applied).then(today);
        let body = json!({
            "job_id": job_id_value(job_id),
            "stage": stage,
            "date_applied": date_applied,
        });
        let result = self
            .transport
            .send_json(Method::POST, "/applications/", Some(&body))
            .await;

        recover(Operation::ApplicationsCreate, result, |_| {
            let job = self
                .offline
                .find_job(job_id)
                .ok_or_else(|| ApiError::not_found("Job not found"))?;
            Ok(self.offline.create_application(job, stage))
        })
    }

    pub async fn update_status(&self, id: &str, stage: Stage) -> ApiResult<Application> {
        let path = format!("/applications/{}/", urlencoding::encode(id));
        let body = json!({ "stage": stage });
        let result = self
            .transport
            .send_json(Method::PATCH, &path, Some(&body))
            .await;

        recover(Operation::ApplicationsUpdateStatus, result, |_| {
            self.offline
                .transition(id, stage)
                .ok_or_else(|| ApiError::not_found("Application not found"))
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::context::tests::test_context;
    use crate::models::Stage;
    use crate::transport::tests::unreachable_base_url;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_list_normalizes_backend_records() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/applications/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "id": 5,
                "job": { "id": 2, "title": "Frontend Engineer", "company": "StartupXYZ" },
                "stage": "interview",
                "date_applied": "2024-01-20",
                "created_at": "2024-01-18T10:00:00Z"
            }])))
            .mount(&server)
            .await;

        let t = test_context(&format!("{}/api", server.uri()), "/applications");
        let apps = t.ctx.applications.list().await.unwrap();

        assert_eq!(apps.len(), 1);
        assert_eq!(apps[0].id, "5");
        assert_eq!(apps[0].job_id, "2");
        assert_eq!(apps[0].stage, Stage::Interview);
        assert_eq!(apps[0].updated_at, "2024-01-18T10:00:00Z");
    }

    #[tokio::test]
    async fn test_create_sends_integer_job_id_and_no_date_for_drafts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/applications/"))
            .and(body_json(json!({ "job_id": 3, "stage": "draft", "date_applied": null })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "id": 12,
                "job_id": 3,
                "stage": "draft",
                "date_applied": null,
                "created_at": "2024-03-01T09:00:00Z"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let t = test_context(&format!("{}/api", server.uri()), "/jobs");
        let app = t.ctx.applications.create("3", Stage::Draft).await.unwrap();
        assert_eq!(app.id, "12");
        assert_eq!(app.date_applied, None);
    }

    #[tokio::test]
    async fn test_update_status_patches_stage() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/api/applications/12/"))
            .and(body_json(json!({ "stage": "offer" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 12,
                "job_id": 3,
                "stage": "offer",
                "date_applied": "2024-03-02"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let t = test_context(&format!("{}/api", server.uri()), "/applications");
        let app = t.ctx.applications.update_status("12", Stage::Offer).await.unwrap();
        assert_eq!(app.stage, Stage::Offer);
    }

    #[tokio::test]
    async fn test_offline_create_list_and_transition() {
        let t = test_context(&unreachable_base_url(), "/jobs");
        let apps = &t.ctx.applications;

        let created = apps.create("1", Stage::Applied).await.unwrap();
        assert!(created.id.starts_with("app-"));
        assert_eq!(created.job.as_ref().unwrap().company, "Tech Corp");
        assert!(created.date_applied.is_some());

        let listed = apps.list().await.unwrap();
        assert_eq!(listed, vec![created.clone()]);

        let moved = apps.update_status(&created.id, Stage::Interview).await.unwrap();
        assert_eq!(moved.stage, Stage::Interview);
        assert_eq!(moved.date_applied, created.date_applied);
    }

    #[tokio::test]
    async fn test_server_error_degrades_list_but_not_write_decisions() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/applications/"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let t = test_context(&format!("{}/api", server.uri()), "/applications");
        let apps = &t.ctx.applications;
        assert!(apps.list().await.unwrap().is_empty());

        let err = apps
            .or_offline_when_unreachable(apps.fetch_remote().await)
            .unwrap_err();
        assert_eq!(err.status, 500);
    }

    #[tokio::test]
    async fn test_offline_unknown_job_or_application_is_not_found() {
        let t = test_context(&unreachable_base_url(), "/jobs");
        assert_eq!(t.ctx.applications.create("999", Stage::Draft).await.unwrap_err().status, 404);
        assert_eq!(
            t.ctx.applications.update_status("missing", Stage::Applied).await.unwrap_err().status,
            404
        );
    }
}

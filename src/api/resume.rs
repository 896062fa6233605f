//! Resume generation and editing. Every operation here is user-initiated,
//! so failures always reach the caller.

use reqwest::Method;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use super::policy::{Operation, surface};
use crate::downloads::{DownloadHost, save_blob};
use crate::error::{ApiError, ApiResult};
use crate::models::{AtsResult, Resume, ResumePatch};
use crate::transport::Transport;

pub struct ResumeApi {
    transport: Arc<Transport>,
    downloads: Arc<dyn DownloadHost>,
}

impl ResumeApi {
    pub fn new(transport: Arc<Transport>, downloads: Arc<dyn DownloadHost>) -> Self {
        Self {
            transport,
            downloads,
        }
    }

    fn path(application_id: &str, suffix: &str) -> String {
        format!(
            "/applications/{}/resume/{}",
            urlencoding::encode(application_id),
            suffix
        )
    }

    pub async fn get(&self, application_id: &str) -> ApiResult<Resume> {
        let result = self.transport.get_json(&Self::path(application_id, "")).await;
        surface(Operation::ResumeGet, result)
    }

    /// Ask the backend to (re)generate the resume from the profile and the
    /// job description.
    pub async fn build(&self, application_id: &str) -> ApiResult<Resume> {
        let result = self
            .transport
            .send_json::<(), _>(Method::POST, &Self::path(application_id, "build/"), None)
            .await;
        surface(Operation::ResumeBuild, result)
    }

    pub async fn update(&self, application_id: &str, patch: &ResumePatch) -> ApiResult<Resume> {
        let result = self
            .transport
            .send_json(Method::PATCH, &Self::path(application_id, ""), Some(patch))
            .await;
        surface(Operation::ResumeUpdate, result)
    }

    pub async fn ats_scan(&self, application_id: &str) -> ApiResult<AtsResult> {
        let result = self
            .transport
            .send_json::<(), _>(Method::POST, &Self::path(application_id, "ats-scan/"), None)
            .await;
        surface(Operation::ResumeAtsScan, result)
    }

    pub async fn download_latex(&self, application_id: &str) -> ApiResult<PathBuf> {
        self.download(
            Operation::ResumeDownloadLatex,
            application_id,
            "latex/",
            &format!("resume-{}.tex", application_id),
        )
        .await
    }

    pub async fn download_pdf(&self, application_id: &str) -> ApiResult<PathBuf> {
        self.download(
            Operation::ResumeDownloadPdf,
            application_id,
            "pdf/",
            &format!("resume-{}.pdf", application_id),
        )
        .await
    }

    async fn download(
        &self,
        operation: Operation,
        application_id: &str,
        suffix: &str,
        filename: &str,
    ) -> ApiResult<PathBuf> {
        let result = self.transport.get_blob(&Self::path(application_id, suffix)).await;
        let blob = surface(operation, result)?;

        let saved = save_blob(self.downloads.as_ref(), blob, filename)
            .map_err(|e| ApiError::local("failed to save download", e))?;
        info!(path = %saved.display(), "Saved {}", filename);
        Ok(saved)
    }
}

#[cfg(test)]
mod tests {
    use crate::context::tests::test_context;
    use crate::models::ResumePatch;
    use crate::transport::tests::unreachable_base_url;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_get_and_build_hit_application_routes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/applications/4/resume/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 1,
                "application_id": 4,
                "header": { "name": "Ada" },
                "summary": "Systems programmer",
                "techStack": ["Rust"]
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/applications/4/resume/build/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 1,
                "applicationId": "4",
                "header": "Ada Lovelace"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let t = test_context(&format!("{}/api", server.uri()), "/builder/4");

        let resume = t.ctx.resume.get("4").await.unwrap();
        assert_eq!(resume.application_id, "4");
        assert_eq!(resume.header, r#"{"name":"Ada"}"#);
        assert_eq!(resume.tech_stack, vec!["Rust"]);

        let built = t.ctx.resume.build("4").await.unwrap();
        assert_eq!(built.header, "Ada Lovelace");
    }

    #[tokio::test]
    async fn test_update_sends_only_changed_sections() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/api/applications/4/resume/"))
            .and(body_json(json!({ "summary": "Shorter" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 1,
                "applicationId": 4,
                "summary": "Shorter"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let t = test_context(&format!("{}/api", server.uri()), "/builder/4");
        let patch = ResumePatch {
            summary: Some("Shorter".to_string()),
            ..ResumePatch::default()
        };
        let resume = t.ctx.resume.update("4", &patch).await.unwrap();
        assert_eq!(resume.summary.as_deref(), Some("Shorter"));
    }

    #[tokio::test]
    async fn test_ats_scan_failure_propagates() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/applications/4/resume/ats-scan/"))
            .respond_with(
                ResponseTemplate::new(502).set_body_json(json!({ "error": "scanner unavailable" })),
            )
            .mount(&server)
            .await;

        let t = test_context(&format!("{}/api", server.uri()), "/builder/4");
        let err = t.ctx.resume.ats_scan("4").await.unwrap_err();
        assert_eq!(err.status, 502);
        assert_eq!(err.message, "scanner unavailable");

        let offline = test_context(&unreachable_base_url(), "/builder/4");
        assert!(offline.ctx.resume.ats_scan("4").await.unwrap_err().is_network());
    }

    #[tokio::test]
    async fn test_ats_scan_reads_score_and_keywords() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/applications/4/resume/ats-scan/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "score": 82,
                "missingKeywords": ["Kubernetes"],
                "matched_keywords": ["Rust"],
                "suggestions": ["Quantify impact"]
            })))
            .mount(&server)
            .await;

        let t = test_context(&format!("{}/api", server.uri()), "/builder/4");
        let result = t.ctx.resume.ats_scan("4").await.unwrap();
        assert_eq!(result.score, 82.0);
        assert_eq!(result.missing_keywords, vec!["Kubernetes"]);
        assert_eq!(result.improvements, vec!["Quantify impact"]);
    }

    #[tokio::test]
    async fn test_repeated_downloads_leave_no_live_object_urls() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/applications/4/resume/pdf/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("Content-Type", "application/pdf")
                    .set_body_bytes(b"%PDF-1.7".to_vec()),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/applications/4/resume/latex/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("Content-Type", "application/x-tex")
                    .set_body_bytes(b"\\documentclass{article}".to_vec()),
            )
            .mount(&server)
            .await;

        let t = test_context(&format!("{}/api", server.uri()), "/builder/4");
        for _ in 0..3 {
            let pdf = t.ctx.resume.download_pdf("4").await.unwrap();
            assert_eq!(pdf.file_name().unwrap(), "resume-4.pdf");
            assert_eq!(std::fs::read(&pdf).unwrap(), b"%PDF-1.7");

            let tex = t.ctx.resume.download_latex("4").await.unwrap();
            assert_eq!(tex.file_name().unwrap(), "resume-4.tex");
        }
        assert_eq!(t.downloads.live_object_urls(), 0);
    }

    #[tokio::test]
    async fn test_failed_download_creates_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/applications/4/resume/pdf/"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "detail": "Resume not found" })))
            .mount(&server)
            .await;

        let t = test_context(&format!("{}/api", server.uri()), "/builder/4");
        let err = t.ctx.resume.download_pdf("4").await.unwrap_err();
        assert_eq!(err.message, "Resume not found");
        assert_eq!(t.downloads.live_object_urls(), 0);
        assert!(!t.downloads.dir().exists());
    }
}

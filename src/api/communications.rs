use reqwest::Method;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use super::policy::{Operation, recover};
use crate::cache::{APPLICATIONS_KEY, QueryCache};
use crate::error::ApiResult;
use crate::fallback::{OfflineState, provisional_id};
use crate::models::{Application, ApplicationResponse, NewResponse, now_timestamp};
use crate::session::SessionStore;
use crate::transport::Transport;

/// Employer responses logged against an application, and drafted replies.
pub struct CommunicationsApi {
    transport: Arc<Transport>,
    offline: Arc<OfflineState>,
    cache: Arc<QueryCache>,
    session: Arc<SessionStore>,
}

#[derive(Deserialize)]
struct GeneratedReply {
    reply: String,
}

impl CommunicationsApi {
    pub fn new(
        transport: Arc<Transport>,
        offline: Arc<OfflineState>,
        cache: Arc<QueryCache>,
        session: Arc<SessionStore>,
    ) -> Self {
        Self {
            transport,
            offline,
            cache,
            session,
        }
    }

    fn path(application_id: &str, suffix: &str) -> String {
        format!(
            "/applications/{}/responses/{}",
            urlencoding::encode(application_id),
            suffix
        )
    }

    pub async fn list(&self, application_id: &str) -> ApiResult<Vec<ApplicationResponse>> {
        let result = self.transport.get_json(&Self::path(application_id, "")).await;
        recover(Operation::ResponsesList, result, |_| Ok(Vec::new()))
    }

    pub async fn add(&self, application_id: &str, response: &NewResponse) -> ApiResult<ApplicationResponse> {
        let result = self
            .transport
            .send_json(Method::POST, &Self::path(application_id, ""), Some(response))
            .await;
        recover(Operation::ResponsesAdd, result, |_| {
            Ok(ApplicationResponse {
                id: provisional_id("resp"),
                application_id: application_id.to_string(),
                response_type: response.response_type,
                received_at: now_timestamp(),
                summary: response.summary.clone(),
                details: response.details.clone(),
                contact: response.contact.clone(),
            })
        })
    }

    /// Draft a reply to the latest employer message. `context` is free text
    /// from the user to steer the draft.
    pub async fn generate_reply(&self, application_id: &str, context: Option<&str>) -> ApiResult<String> {
        let body = json!({ "context": context });
        let result = self
            .transport
            .send_json::<_, GeneratedReply>(
                Method::POST,
                &Self::path(application_id, "generate-reply"),
                Some(&body),
            )
            .await
            .map(|generated| generated.reply);
        recover(Operation::GenerateReply, result, |_| {
            Ok(self.template_reply(application_id))
        })
    }

    fn find_application(&self, application_id: &str) -> Option<Application> {
        self.cache
            .get::<Vec<Application>>(APPLICATIONS_KEY)
            .unwrap_or_default()
            .into_iter()
            .chain(self.offline.applications())
            .find(|app| app.id == application_id)
    }

    fn template_reply(&self, application_id: &str) -> String {
        let job = self.find_application(application_id).and_then(|app| {
            app.job.or_else(|| self.offline.find_job(&app.job_id))
        });
        let (title, company) = match &job {
            Some(job) => (job.title.as_str(), job.company.as_str()),
            None => ("the position", "your team"),
        };
        let signature = match self.session.user() {
            Some(user) if !user.name.is_empty() => format!("Best regards,\n{}", user.name),
            _ => "Best regards".to_string(),
        };

        format!(
            "Dear Hiring Manager,\n\n\
             Thank you for your message regarding the {title} role at {company}. \
             I remain very interested in the opportunity and would be glad to \
             provide any further information you need.\n\n\
             I look forward to hearing from you.\n\n\
             {signature}"
        )
    }
}

//! What each domain operation does when the backend call fails.
//!
//! `policy_for` is the single table deciding between surfacing the error and
//! degrading to local data; the API modules only supply the fallback value.

use tracing::warn;

use crate::error::{ApiError, ApiResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Login,
    Signup,
    GoogleAuth,
    ProfileGet,
    ProfileSave,
    JobsSearch,
    JobsGet,
    ApplicationsList,
    ApplicationsCreate,
    ApplicationsUpdateStatus,
    ResumeGet,
    ResumeBuild,
    ResumeUpdate,
    ResumeAtsScan,
    ResumeDownloadLatex,
    ResumeDownloadPdf,
    ResponsesList,
    ResponsesAdd,
    GenerateReply,
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Login => "auth.login",
            Operation::Signup => "auth.signup",
            Operation::GoogleAuth => "auth.google",
            Operation::ProfileGet => "profile.get",
            Operation::ProfileSave => "profile.save",
            Operation::JobsSearch => "jobs.search",
            Operation::JobsGet => "jobs.get",
            Operation::ApplicationsList => "applications.list",
            Operation::ApplicationsCreate => "applications.create",
            Operation::ApplicationsUpdateStatus => "applications.update_status",
            Operation::ResumeGet => "resume.get",
            Operation::ResumeBuild => "resume.build",
            Operation::ResumeUpdate => "resume.update",
            Operation::ResumeAtsScan => "resume.ats_scan",
            Operation::ResumeDownloadLatex => "resume.download_latex",
            Operation::ResumeDownloadPdf => "resume.download_pdf",
            Operation::ResponsesList => "communications.list",
            Operation::ResponsesAdd => "communications.add",
            Operation::GenerateReply => "communications.generate_reply",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    /// Hand the rejection to the caller.
    Propagate,
    /// Fall back only when the backend was unreachable; HTTP errors propagate.
    FallbackOffline,
    /// Fall back to the durable local copy.
    FallbackToCache,
    /// Fall back to the static dataset / locally synthesized records.
    FallbackToStatic,
}

pub fn policy_for(operation: Operation) -> Policy {
    match operation {
        Operation::Login | Operation::Signup | Operation::GoogleAuth => Policy::FallbackOffline,

        Operation::ProfileGet | Operation::ProfileSave => Policy::FallbackToCache,

        Operation::JobsSearch
        | Operation::JobsGet
        | Operation::ApplicationsList
        | Operation::ApplicationsCreate
        | Operation::ApplicationsUpdateStatus
        | Operation::ResponsesList
        | Operation::ResponsesAdd
        | Operation::GenerateReply => Policy::FallbackToStatic,

        // User-initiated resume actions must fail visibly
        Operation::ResumeGet
        | Operation::ResumeBuild
        | Operation::ResumeUpdate
        | Operation::ResumeAtsScan
        | Operation::ResumeDownloadLatex
        | Operation::ResumeDownloadPdf => Policy::Propagate,
    }
}

/// Apply `operation`'s policy to a backend result.
pub fn recover<T, F>(operation: Operation, result: ApiResult<T>, fallback: F) -> ApiResult<T>
where
    F: FnOnce(&ApiError) -> ApiResult<T>,
{
    let err = match result {
        Ok(value) => return Ok(value),
        Err(err) => err,
    };

    match policy_for(operation) {
        Policy::Propagate => Err(err),
        Policy::FallbackOffline if !err.is_network() => Err(err),
        policy => {
            warn!(
                operation = operation.name(),
                ?policy,
                status = err.status,
                error = %err.message,
                "backend call failed; using fallback"
            );
            fallback(&err)
        }
    }
}

/// Apply `operation`'s policy with nothing to fall back to.
pub fn surface<T>(operation: Operation, result: ApiResult<T>) -> ApiResult<T> {
    recover(operation, result, |err| Err(err.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resume_actions_propagate() {
        for op in [
            Operation::ResumeGet,
            Operation::ResumeBuild,
            Operation::ResumeUpdate,
            Operation::ResumeAtsScan,
            Operation::ResumeDownloadLatex,
            Operation::ResumeDownloadPdf,
        ] {
            assert_eq!(policy_for(op), Policy::Propagate, "{}", op.name());
        }
    }

    #[test]
    fn test_propagate_never_calls_fallback() {
        let result: ApiResult<u32> = recover(Operation::ResumeAtsScan, Err(ApiError::network()), |_| {
            panic!("fallback must not run")
        });
        assert_eq!(result.unwrap_err(), ApiError::network());
    }

    #[test]
    fn test_static_fallback_recovers_any_failure() {
        let result = recover(Operation::JobsSearch, Err(ApiError::from_status(503)), |_| Ok(7));
        assert_eq!(result.unwrap(), 7);
    }

    #[test]
    fn test_offline_fallback_only_for_network_failures() {
        let offline = recover(Operation::Login, Err(ApiError::network()), |_| Ok("offline"));
        assert_eq!(offline.unwrap(), "offline");

        let rejected = recover(Operation::Login, Err(ApiError::new(400, "Invalid credentials")), |_| {
            Ok("offline")
        });
        assert_eq!(rejected.unwrap_err().message, "Invalid credentials");
    }

    #[test]
    fn test_offline_fallback_skips_local_failures() {
        let err = ApiError::local("invalid request", "builder error");
        let result = recover(Operation::GoogleAuth, Err(err.clone()), |_| Ok("offline"));
        assert_eq!(result.unwrap_err(), err);
    }

    #[test]
    fn test_success_passes_through() {
        let result: ApiResult<&str> = recover(Operation::ResumeBuild, Ok("built"), |_| Ok("mock"));
        assert_eq!(result.unwrap(), "built");
    }
}

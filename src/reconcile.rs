//! Turning "apply to this job" and "build a resume for this job" into the
//! right create-or-update call against the current application list.
//!
//! The list is always re-read before deciding, so a draft created from the
//! resume builder is promoted rather than duplicated. Duplicate suppression
//! is best-effort: two clients racing can still both create.

use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use crate::api::ApplicationsApi;
use crate::cache::{APPLICATIONS_KEY, QueryCache};
use crate::error::{ApiError, ApiResult};
use crate::models::{Application, Stage};
use crate::navigation::Navigator;

#[derive(Debug, Clone, PartialEq)]
pub enum ApplyOutcome {
    /// No live application existed; a new `applied` one was created.
    Created(Application),
    /// An existing draft was promoted to `applied`.
    Submitted(Application),
    AlreadyApplied(Application),
    /// The application is past `applied` (interview, offer, rejection).
    AlreadyProgressed(Application),
    /// Another apply for the same job is still running in this process.
    InFlight,
}

impl ApplyOutcome {
    pub fn application(&self) -> Option<&Application> {
        match self {
            ApplyOutcome::Created(app)
            | ApplyOutcome::Submitted(app)
            | ApplyOutcome::AlreadyApplied(app)
            | ApplyOutcome::AlreadyProgressed(app) => Some(app),
            ApplyOutcome::InFlight => None,
        }
    }

    /// Whether the call changed anything on the backend.
    pub fn is_write(&self) -> bool {
        matches!(self, ApplyOutcome::Created(_) | ApplyOutcome::Submitted(_))
    }
}

impl fmt::Display for ApplyOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApplyOutcome::Created(_) | ApplyOutcome::Submitted(_) => {
                write!(f, "Application submitted successfully")
            }
            ApplyOutcome::AlreadyApplied(_) => write!(f, "You have already applied for this job"),
            ApplyOutcome::AlreadyProgressed(app) => {
                write!(f, "This application is already at the {} stage", app.stage)
            }
            ApplyOutcome::InFlight => write!(f, "An application for this job is already being submitted"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuilderTarget {
    pub application_id: String,
    pub route: String,
    /// True when a draft had to be created first.
    pub created: bool,
}

pub fn builder_route(application_id: &str) -> String {
    format!("/builder/{}", application_id)
}

pub struct Reconciler {
    applications: Arc<ApplicationsApi>,
    cache: Arc<QueryCache>,
    navigator: Arc<dyn Navigator>,
    in_flight: Mutex<HashSet<String>>,
}

// Releases the job's in-flight slot however the call exits
struct InFlightGuard<'a> {
    slots: &'a Mutex<HashSet<String>>,
    job_id: String,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(slots: &'a Mutex<HashSet<String>>, job_id: &str) -> Option<Self> {
        let inserted = slots
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(job_id.to_string());
        inserted.then(|| Self {
            slots,
            job_id: job_id.to_string(),
        })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.slots
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(&self.job_id);
    }
}

impl Reconciler {
    pub fn new(
        applications: Arc<ApplicationsApi>,
        cache: Arc<QueryCache>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            applications,
            cache,
            navigator,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// Current list through the query cache, skipping any cached copy.
    /// Retries happen below the fallback, and an offline list is never
    /// cached or used to decide a write against a reachable backend.
    async fn fresh_applications(&self) -> ApiResult<Vec<Application>> {
        let result = self
            .cache
            .refetch(APPLICATIONS_KEY, move || self.applications.fetch_remote())
            .await;
        self.applications.or_offline_when_unreachable(result)
    }

    /// Applications through the query cache; a fresh entry is reused.
    pub async fn applications(&self) -> ApiResult<Vec<Application>> {
        let result = self
            .cache
            .fetch(APPLICATIONS_KEY, move || self.applications.fetch_remote())
            .await;
        self.applications.or_offline_list(result)
    }

    pub async fn apply(&self, job_id: &str) -> ApiResult<ApplyOutcome> {
        let Some(_guard) = InFlightGuard::acquire(&self.in_flight, job_id) else {
            debug!(job_id, "apply already in flight");
            return Ok(ApplyOutcome::InFlight);
        };

        let apps = self.fresh_applications().await?;
        // Withdrawn records don't block a new application
        let live = apps
            .into_iter()
            .find(|app| app.job_id == job_id && app.stage.is_live());

        let outcome = match live {
            None => ApplyOutcome::Created(self.applications.create(job_id, Stage::Applied).await?),
            Some(app) if app.stage == Stage::Draft => ApplyOutcome::Submitted(
                self.applications.update_status(&app.id, Stage::Applied).await?,
            ),
            Some(app) if app.stage == Stage::Applied => ApplyOutcome::AlreadyApplied(app),
            Some(app) => ApplyOutcome::AlreadyProgressed(app),
        };

        if outcome.is_write() {
            self.cache.invalidate(APPLICATIONS_KEY);
            info!(job_id, "Applied");
        }
        Ok(outcome)
    }

    /// Find or create the application that owns the resume for `job_id`,
    /// then open the builder on it. Shares `apply`'s per-job slot, so an
    /// overlapping build or apply for the same job is refused.
    pub async fn build_resume(&self, job_id: &str) -> ApiResult<BuilderTarget> {
        let Some(_guard) = InFlightGuard::acquire(&self.in_flight, job_id) else {
            debug!(job_id, "build already in flight");
            return Err(ApiError::in_flight("A request for this job is already in progress"));
        };

        let apps = self.fresh_applications().await?;

        let (application, created) = match apps.into_iter().find(|app| app.job_id == job_id) {
            Some(app) => (app, false),
            None => {
                let app = self.applications.create(job_id, Stage::Draft).await?;
                self.cache.invalidate(APPLICATIONS_KEY);
                (app, true)
            }
        };

        let route = builder_route(&application.id);
        self.navigator.navigate(&route);
        Ok(BuilderTarget {
            application_id: application.id,
            route,
            created,
        })
    }

    /// Move an application to `stage` and drop the cached list.
    pub async fn set_stage(&self, application_id: &str, stage: Stage) -> ApiResult<Application> {
        let app = self.applications.update_status(application_id, stage).await?;
        self.cache.invalidate(APPLICATIONS_KEY);
        Ok(app)
    }
}

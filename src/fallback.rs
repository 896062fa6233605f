//! Degraded-mode data: a fixed job dataset and the records created while
//! the backend was unreachable.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Mutex, MutexGuard};

use crate::models::{Application, Job, Stage, User, now_timestamp, today};

pub fn mock_user() -> User {
    User {
        id: "1".to_string(),
        name: "John Doe".to_string(),
        email: "john.doe@example.com".to_string(),
        avatar: None,
    }
}

#[allow(clippy::too_many_arguments)]
fn job(
    id: &str,
    title: &str,
    company: &str,
    location: &str,
    description: &str,
    tags: &[&str],
    salary: &str,
    posted_date: &str,
) -> Job {
    Job {
        id: id.to_string(),
        title: title.to_string(),
        company: company.to_string(),
        location: location.to_string(),
        description: description.to_string(),
        tags: tags.iter().map(|t| t.to_string()).collect(),
        salary: Some(salary.to_string()),
        posted_date: posted_date.to_string(),
    }
}

pub fn mock_jobs() -> Vec<Job> {
    vec![
        job(
            "1",
            "Senior Full Stack Developer",
            "Tech Corp",
            "San Francisco, CA",
            "We are looking for an experienced full stack developer to join our team. You will work on building scalable web applications using React, TypeScript, and Django.",
            &["React", "TypeScript", "Django", "PostgreSQL"],
            "$120,000 - $150,000",
            "2024-01-15",
        ),
        job(
            "2",
            "Frontend Engineer",
            "StartupXYZ",
            "Remote",
            "Join our growing team as a Frontend Engineer. You will be responsible for building beautiful, responsive user interfaces with React and TypeScript.",
            &["React", "TypeScript", "TailwindCSS"],
            "$100,000 - $130,000",
            "2024-01-10",
        ),
        job(
            "3",
            "Backend Developer",
            "DataSystems Inc",
            "New York, NY",
            "We need a skilled backend developer to work on our API infrastructure and data processing systems.",
            &["Python", "Django", "PostgreSQL", "AWS"],
            "$110,000 - $140,000",
            "2024-01-12",
        ),
        job(
            "4",
            "Full Stack Engineer",
            "CloudTech Solutions",
            "Austin, TX",
            "Looking for a full stack engineer to build our next generation cloud platform.",
            &["React", "Node.js", "AWS", "MongoDB"],
            "$115,000 - $145,000",
            "2024-01-14",
        ),
        job(
            "5",
            "React Developer",
            "WebDev Agency",
            "Seattle, WA",
            "Join our team of talented developers building cutting-edge web applications for clients.",
            &["React", "TypeScript", "GraphQL"],
            "$95,000 - $125,000",
            "2024-01-08",
        ),
    ]
}

/// Case-insensitive substring match on title, company and description.
/// An empty query matches everything.
pub fn filter_jobs(jobs: Vec<Job>, query: &str) -> Vec<Job> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return jobs;
    }
    jobs.into_iter()
        .filter(|job| {
            job.title.to_lowercase().contains(&needle)
                || job.company.to_lowercase().contains(&needle)
                || job.description.to_lowercase().contains(&needle)
        })
        .collect()
}

static LAST_PROVISIONAL: AtomicI64 = AtomicI64::new(0);

/// Provisional local id, e.g. `app-1718000000000`. Millisecond based but
/// strictly increasing within the process.
pub fn provisional_id(prefix: &str) -> String {
    let now = chrono::Utc::now().timestamp_millis();
    let previous = LAST_PROVISIONAL
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| Some(now.max(last + 1)))
        .unwrap_or(now);
    format!("{}-{}", prefix, now.max(previous + 1))
}

/// Records the client had to invent while offline, plus every job it has
/// seen from the backend so offline creates can still resolve them.
#[derive(Default)]
pub struct OfflineState {
    applications: Mutex<Vec<Application>>,
    known_jobs: Mutex<HashMap<String, Job>>,
}

impl OfflineState {
    pub fn new() -> Self {
        Self::default()
    }

    fn apps(&self) -> MutexGuard<'_, Vec<Application>> {
        self.applications.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn jobs(&self) -> MutexGuard<'_, HashMap<String, Job>> {
        self.known_jobs.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn remember_jobs(&self, jobs: &[Job]) {
        let mut known = self.jobs();
        for job in jobs {
            known.insert(job.id.clone(), job.clone());
        }
    }

    /// Look a job up among backend jobs seen so far, then the static set.
    pub fn find_job(&self, id: &str) -> Option<Job> {
        if let Some(job) = self.jobs().get(id) {
            return Some(job.clone());
        }
        mock_jobs().into_iter().find(|job| job.id == id)
    }

    /// Every job seen from the backend, falling back to the static set.
    pub fn all_jobs(&self) -> Vec<Job> {
        let mut jobs = mock_jobs();
        for (id, job) in self.jobs().iter() {
            if !jobs.iter().any(|j| &j.id == id) {
                jobs.push(job.clone());
            }
        }
        jobs
    }

    pub fn applications(&self) -> Vec<Application> {
        self.apps().clone()
    }

    pub fn create_application(&self, job: Job, stage: Stage) -> Application {
        let now = now_timestamp();
        let app = Application {
            id: provisional_id("app"),
            job_id: job.id.clone(),
            job: Some(job),
            date_applied: (stage == Stage::Applied).then(today),
            stage,
            created_at: now.clone(),
            updated_at: now,
        };
        self.apps().push(app.clone());
        app
    }

    /// Apply a stage change to the local record with `id`, if there is one.
    pub fn transition(&self, id: &str, stage: Stage) -> Option<Application> {
        let mut apps = self.apps();
        let app = apps.iter_mut().find(|a| a.id == id)?;
        app.transition(stage);
        Some(app.clone())
    }
}

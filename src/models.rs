use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

// Backend ids arrive as integers or strings; the client keeps them as strings.
fn de_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.as_ref().map(id_from_value).unwrap_or_default())
}

fn id_from_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

// Free text that the backend occasionally sends as a structured object.
fn de_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => s,
        Some(serde_json::Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    })
}

pub fn today() -> String {
    chrono::Local::now().format("%Y-%m-%d").to_string()
}

pub fn now_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(deserialize_with = "de_id", default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

// --- Profile ---

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Profile {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    pub education: Vec<Education>,
    pub experience: Vec<Experience>,
    pub projects: Vec<Project>,
    pub tech_stack: Vec<String>,
    pub frameworks: Vec<String>,
    pub libraries: Vec<String>,
    pub programming_languages: Vec<String>,
    pub links: Vec<Link>,
}

impl Profile {
    /// The shell handed out when neither backend nor cache has a profile.
    pub fn empty() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Education {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    pub school: String,
    pub degree: String,
    pub field: String,
    pub start_date: String,
    pub end_date: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Experience {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    pub company: String,
    pub position: String,
    pub start_date: String,
    pub end_date: String,
    pub description: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Project {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    pub name: String,
    pub description: String,
    pub technologies: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Link {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    pub label: String,
    pub url: String,
}

// --- Jobs ---

/// Canonical job listing. Deserializes from every shape the backend has
/// been seen to send (see `RawJob`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "RawJob")]
pub struct Job {
    pub id: String,
    pub title: String,
    pub company: String,
    pub location: String,
    pub description: String,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub salary: Option<String>,
    pub posted_date: String,
}

#[derive(Debug, Deserialize)]
struct RawJob {
    #[serde(deserialize_with = "de_id", default)]
    id: String,
    title: Option<String>,
    company: Option<String>,
    location: Option<String>,
    description: Option<String>,
    tags: Option<Vec<String>>,
    tech_stack: Option<Vec<String>>,
    salary: Option<String>,
    salary_min: Option<i64>,
    salary_max: Option<i64>,
    #[serde(rename = "postedDate", alias = "posted_date")]
    posted_date: Option<String>,
    date: Option<String>,
}

impl From<RawJob> for Job {
    fn from(raw: RawJob) -> Self {
        let tags = match raw.tags {
            Some(tags) if !tags.is_empty() => tags,
            _ => raw.tech_stack.unwrap_or_default(),
        };
        let salary = raw
            .salary
            .filter(|s| !s.trim().is_empty())
            .or_else(|| format_salary(raw.salary_min, raw.salary_max));

        Job {
            id: raw.id,
            title: raw.title.unwrap_or_default(),
            company: raw.company.unwrap_or_default(),
            location: raw.location.unwrap_or_default(),
            description: raw.description.unwrap_or_default(),
            tags,
            salary,
            posted_date: raw.posted_date.or(raw.date).unwrap_or_default(),
        }
    }
}

fn format_salary(min: Option<i64>, max: Option<i64>) -> Option<String> {
    match (min, max) {
        (Some(min), Some(max)) => Some(format!("${} - ${}", thousands(min), thousands(max))),
        (Some(min), None) => Some(format!("${}+", thousands(min))),
        (None, Some(max)) => Some(format!("Up to ${}", thousands(max))),
        (None, None) => None,
    }
}

fn thousands(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    if n < 0 { format!("-{}", out) } else { out }
}

// --- Applications ---

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    #[default]
    Draft,
    Applied,
    Interview,
    Offer,
    Rejection,
    Withdrawn,
}

impl Stage {
    pub const ALL: [Stage; 6] = [
        Stage::Draft,
        Stage::Applied,
        Stage::Interview,
        Stage::Offer,
        Stage::Rejection,
        Stage::Withdrawn,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Draft => "draft",
            Stage::Applied => "applied",
            Stage::Interview => "interview",
            Stage::Offer => "offer",
            Stage::Rejection => "rejection",
            Stage::Withdrawn => "withdrawn",
        }
    }

    /// Withdrawn applications no longer count towards the one-per-job rule.
    pub fn is_live(&self) -> bool {
        *self != Stage::Withdrawn
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "draft" => Ok(Stage::Draft),
            "applied" => Ok(Stage::Applied),
            "interview" => Ok(Stage::Interview),
            "offer" => Ok(Stage::Offer),
            "rejection" | "rejected" => Ok(Stage::Rejection),
            "withdrawn" | "archived" => Ok(Stage::Withdrawn),
            other => Err(format!(
                "unknown stage '{}' (expected one of: draft, applied, interview, offer, rejection, withdrawn)",
                other
            )),
        }
    }
}

impl<'de> Deserialize<'de> for Stage {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawApplication")]
pub struct Application {
    pub id: String,
    pub job_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job: Option<Job>,
    pub date_applied: Option<String>, // YYYY-MM-DD, set on first entry into `applied`
    pub stage: Stage,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Deserialize)]
struct RawApplication {
    #[serde(deserialize_with = "de_id", default)]
    id: String,
    job_id: Option<serde_json::Value>,
    job: Option<Job>,
    date_applied: Option<String>,
    #[serde(default)]
    stage: Stage,
    created_at: Option<String>,
    updated_at: Option<String>,
}

impl From<RawApplication> for Application {
    fn from(raw: RawApplication) -> Self {
        let job_id = raw
            .job_id
            .as_ref()
            .map(id_from_value)
            .filter(|id| !id.is_empty())
            .or_else(|| raw.job.as_ref().map(|job| job.id.clone()))
            .unwrap_or_default();
        let created_at = raw.created_at.unwrap_or_default();

        Application {
            id: raw.id,
            job_id,
            job: raw.job,
            date_applied: raw.date_applied.filter(|d| !d.is_empty()),
            stage: raw.stage,
            updated_at: raw.updated_at.unwrap_or_else(|| created_at.clone()),
            created_at,
        }
    }
}

impl Application {
    /// Move to `stage`, stamping `date_applied` the first time the
    /// application enters `applied` and never afterwards.
    pub fn transition(&mut self, stage: Stage) {
        self.stage = stage;
        if stage == Stage::Applied && self.date_applied.is_none() {
            self.date_applied = Some(today());
        }
        self.updated_at = now_timestamp();
    }
}

// --- Resumes ---

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Resume {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    #[serde(deserialize_with = "de_id", alias = "application_id")]
    pub application_id: String,
    #[serde(deserialize_with = "de_text")]
    pub header: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub education: Vec<Education>,
    pub experience: Vec<Experience>,
    pub projects: Vec<Project>,
    pub tech_stack: Vec<String>,
    pub frameworks: Vec<String>,
    pub libraries: Vec<String>,
    pub programming_languages: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
}

/// Partial resume edit; only the populated sections are sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub education: Option<Vec<Education>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub experience: Option<Vec<Experience>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub projects: Option<Vec<Project>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tech_stack: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AtsResult {
    pub score: f64,
    #[serde(alias = "missingKeywords")]
    pub missing_keywords: Vec<String>,
    #[serde(alias = "matchedKeywords")]
    pub matched_keywords: Vec<String>,
    pub strengths: Vec<String>,
    #[serde(alias = "suggestions")]
    pub improvements: Vec<String>,
}

// --- Communications ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    Email,
    Call,
    Interview,
    Offer,
    Rejection,
    Note,
}

impl ResponseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseType::Email => "email",
            ResponseType::Call => "call",
            ResponseType::Interview => "interview",
            ResponseType::Offer => "offer",
            ResponseType::Rejection => "rejection",
            ResponseType::Note => "note",
        }
    }
}

impl FromStr for ResponseType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "email" => Ok(ResponseType::Email),
            "call" => Ok(ResponseType::Call),
            "interview" => Ok(ResponseType::Interview),
            "offer" => Ok(ResponseType::Offer),
            "rejection" => Ok(ResponseType::Rejection),
            "note" => Ok(ResponseType::Note),
            other => Err(format!("unknown response type '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationResponse {
    #[serde(deserialize_with = "de_id", default)]
    pub id: String,
    #[serde(deserialize_with = "de_id", default, alias = "applicationId", alias = "application")]
    pub application_id: String,
    #[serde(alias = "responseType")]
    pub response_type: ResponseType,
    #[serde(default, alias = "receivedAt")]
    pub received_at: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<String>,
}

/// Payload for logging a new response against an application.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewResponse {
    pub response_type: ResponseType,
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact: Option<String>,
}

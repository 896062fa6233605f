pub mod applications;
pub mod auth;
pub mod communications;
pub mod jobs;
pub mod policy;
pub mod profile;
pub mod resume;

pub use applications::ApplicationsApi;
pub use auth::AuthApi;
pub use communications::CommunicationsApi;
pub use jobs::JobsApi;
pub use policy::{Operation, Policy, policy_for};
pub use profile::ProfileApi;
pub use resume::ResumeApi;

use reqwest::Method;
use std::sync::Arc;
use tracing::{debug, warn};

use super::policy::{Operation, recover};
use crate::error::ApiResult;
use crate::models::Profile;
use crate::session::SessionStore;
use crate::store::{LocalStore, PROFILE_KEY};
use crate::transport::Transport;

/// The signed-in user's profile, backed by a local copy for offline use.
pub struct ProfileApi {
    transport: Arc<Transport>,
    store: Arc<LocalStore>,
    session: Arc<SessionStore>,
}

impl ProfileApi {
    pub fn new(transport: Arc<Transport>, store: Arc<LocalStore>, session: Arc<SessionStore>) -> Self {
        Self {
            transport,
            store,
            session,
        }
    }

    /// Backend profile, else the cached copy if it belongs to the current
    /// user, else an empty profile.
    pub async fn get(&self) -> ApiResult<Profile> {
        let result = self.transport.get_json("/profile/").await;
        recover(Operation::ProfileGet, result, |_| Ok(self.cached_profile()))
    }

    /// Save to the backend. The local copy is written either way.
    pub async fn save(&self, profile: &Profile) -> ApiResult<Profile> {
        let result = self
            .transport
            .send_json(Method::PUT, "/profile/", Some(profile))
            .await;
        let saved = recover(Operation::ProfileSave, result, |_| Ok(profile.clone()))?;
        if let Err(e) = self.store.set_json(PROFILE_KEY, &saved) {
            warn!(error = %e, "failed to cache profile locally");
        }
        Ok(saved)
    }

    fn cached_profile(&self) -> Profile {
        let cached = match self.store.get_json::<Profile>(PROFILE_KEY) {
            Ok(cached) => cached,
            Err(e) => {
                warn!(error = %e, "failed to read cached profile");
                None
            }
        };
        let (Some(profile), Some(user)) = (cached, self.session.user()) else {
            return Profile::empty();
        };

        if profile.email == user.email {
            return profile;
        }

        // Left behind by a different account
        debug!(cached = %profile.email, current = %user.email, "discarding foreign profile cache");
        if let Err(e) = self.store.remove(PROFILE_KEY) {
            warn!(error = %e, "failed to remove stale profile cache");
        }
        Profile::empty()
    }
}

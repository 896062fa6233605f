//! Process-wide authentication state.
//!
//! `SessionStore` is built once at startup from durable storage and shared
//! through `Arc`. It never talks to the network; the transport reads the
//! token from it and tears it down on 401.

use anyhow::Result;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::info;

use crate::models::User;
use crate::store::{AUTH_TOKEN_KEY, AUTH_USER_KEY, LocalStore, PROFILE_KEY};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    pub user: Option<User>,
    pub token: Option<String>,
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some() && self.token.is_some()
    }
}

/// Anything holding data that belongs to the signed-in user and must be
/// dropped when the session ends.
pub trait SessionScoped: Send + Sync {
    fn clear_session_data(&self);
}

pub struct SessionStore {
    store: Arc<LocalStore>,
    state: RwLock<Session>,
}

impl SessionStore {
    /// Rebuild the session from durable storage. A token without a user (or
    /// the reverse) is treated as signed out.
    pub fn hydrate(store: Arc<LocalStore>) -> Result<Self> {
        let token = store.get(AUTH_TOKEN_KEY)?;
        let user = store.get_json::<User>(AUTH_USER_KEY)?;

        let state = match (user, token) {
            (Some(user), Some(token)) => Session {
                user: Some(user),
                token: Some(token),
            },
            _ => Session::default(),
        };

        Ok(Self {
            store,
            state: RwLock::new(state),
        })
    }

    fn read(&self) -> RwLockReadGuard<'_, Session> {
        self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Session> {
        self.state.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn snapshot(&self) -> Session {
        self.read().clone()
    }

    pub fn token(&self) -> Option<String> {
        self.read().token.clone()
    }

    pub fn user(&self) -> Option<User> {
        self.read().user.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.read().is_authenticated()
    }

    pub fn set_auth(&self, user: User, token: String) -> Result<()> {
        let user_json = serde_json::to_string(&user)?;

        // Writer lock spans the durable write so readers never see a half pair
        let mut state = self.write();
        self.store
            .set_many(&[(AUTH_TOKEN_KEY, token.clone()), (AUTH_USER_KEY, user_json)])?;
        info!(user = %user.email, "session established");
        *state = Session {
            user: Some(user),
            token: Some(token),
        };
        Ok(())
    }

    /// Clear the session and the cached profile. The in-memory state is
    /// reset even if the durable delete fails.
    pub fn logout(&self) -> Result<()> {
        let mut state = self.write();
        let removed = self
            .store
            .remove_many(&[AUTH_TOKEN_KEY, AUTH_USER_KEY, PROFILE_KEY]);
        *state = Session::default();
        info!("session cleared");
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(email: &str) -> User {
        User {
            id: "1".to_string(),
            name: "Test User".to_string(),
            email: email.to_string(),
            avatar: None,
        }
    }

    #[test]
    fn test_starts_signed_out_on_empty_store() {
        let store = Arc::new(LocalStore::open_in_memory().unwrap());
        let session = SessionStore::hydrate(store).unwrap();
        assert!(!session.is_authenticated());
        assert_eq!(session.snapshot(), Session::default());
    }

    #[test]
    fn test_set_auth_then_logout() {
        let store = Arc::new(LocalStore::open_in_memory().unwrap());
        let session = SessionStore::hydrate(store.clone()).unwrap();

        session.set_auth(user("a@x.com"), "tok-1".to_string()).unwrap();
        let snap = session.snapshot();
        assert!(snap.is_authenticated());
        assert_eq!(snap.token.as_deref(), Some("tok-1"));
        assert_eq!(snap.user.unwrap().email, "a@x.com");

        store.set(PROFILE_KEY, "{}").unwrap();
        session.logout().unwrap();

        assert!(!session.is_authenticated());
        assert_eq!(session.token(), None);
        assert_eq!(session.user(), None);
        assert_eq!(store.get(AUTH_TOKEN_KEY).unwrap(), None);
        assert_eq!(store.get(AUTH_USER_KEY).unwrap(), None);
        assert_eq!(store.get(PROFILE_KEY).unwrap(), None);
    }

    #[test]
    fn test_hydrates_from_previous_run() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = Arc::new(LocalStore::open(dir.path()).unwrap());
            let session = SessionStore::hydrate(store).unwrap();
            session.set_auth(user("b@x.com"), "tok-2".to_string()).unwrap();
        }
        let store = Arc::new(LocalStore::open(dir.path()).unwrap());
        let session = SessionStore::hydrate(store).unwrap();
        assert!(session.is_authenticated());
        assert_eq!(session.token().as_deref(), Some("tok-2"));
    }

    #[test]
    fn test_token_without_user_is_signed_out() {
        let store = Arc::new(LocalStore::open_in_memory().unwrap());
        store.set(AUTH_TOKEN_KEY, "orphan").unwrap();
        let session = SessionStore::hydrate(store).unwrap();
        assert!(!session.is_authenticated());
        assert_eq!(session.token(), None);
    }

    #[test]
    fn test_concurrent_readers_never_see_half_session() {
        let store = Arc::new(LocalStore::open_in_memory().unwrap());
        let session = Arc::new(SessionStore::hydrate(store).unwrap());

        let writer = {
            let session = session.clone();
            std::thread::spawn(move || {
                for i in 0..50 {
                    session.set_auth(user("c@x.com"), format!("tok-{}", i)).unwrap();
                    session.logout().unwrap();
                }
            })
        };

        for _ in 0..500 {
            let snap = session.snapshot();
            assert_eq!(snap.user.is_some(), snap.token.is_some());
        }
        writer.join().unwrap();
    }
}

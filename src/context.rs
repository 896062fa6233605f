//! Wiring of the shared stores, transport and domain APIs.

use anyhow::Result;
use std::sync::Arc;
use tracing::debug;

use crate::api::{ApplicationsApi, AuthApi, CommunicationsApi, JobsApi, ProfileApi, ResumeApi};
use crate::cache::QueryCache;
use crate::config::Config;
use crate::downloads::{DirectoryDownloads, DownloadHost};
use crate::fallback::OfflineState;
use crate::navigation::{Navigator, RouteState};
use crate::reconcile::Reconciler;
use crate::session::SessionStore;
use crate::store::LocalStore;
use crate::theme::{Theme, ThemeStore};
use crate::transport::Transport;

pub struct AppContext {
    pub config: Config,
    pub store: Arc<LocalStore>,
    pub session: Arc<SessionStore>,
    pub theme: ThemeStore,
    pub cache: Arc<QueryCache>,
    pub navigator: Arc<dyn Navigator>,
    pub transport: Arc<Transport>,
    pub auth: AuthApi,
    pub profile: ProfileApi,
    pub jobs: JobsApi,
    pub applications: Arc<ApplicationsApi>,
    pub resume: ResumeApi,
    pub communications: CommunicationsApi,
    pub reconciler: Reconciler,
}

impl AppContext {
    /// Open the on-disk store under `config.data_dir` and save downloads
    /// into `config.downloads_dir`.
    pub fn from_config(config: Config) -> Result<Self> {
        let store = Arc::new(LocalStore::open(&config.data_dir)?);
        let downloads = Arc::new(DirectoryDownloads::new(config.downloads_dir.clone()));
        Self::new(config, store, Arc::new(RouteState::default()), downloads)
    }

    pub fn new(
        config: Config,
        store: Arc<LocalStore>,
        navigator: Arc<dyn Navigator>,
        downloads: Arc<dyn DownloadHost>,
    ) -> Result<Self> {
        let session = Arc::new(SessionStore::hydrate(store.clone())?);
        let theme = ThemeStore::hydrate(store.clone(), Theme::Light)?;
        let cache = Arc::new(QueryCache::new(config.query_stale, config.query_retry));
        let offline = Arc::new(OfflineState::new());

        let transport = Arc::new(Transport::new(
            &config.api_base_url,
            session.clone(),
            navigator.clone(),
        ));
        transport.register_session_scoped(cache.clone());

        let applications = Arc::new(ApplicationsApi::new(transport.clone(), offline.clone()));
        let reconciler = Reconciler::new(applications.clone(), cache.clone(), navigator.clone());

        debug!(
            base_url = transport.base_url(),
            signed_in = session.is_authenticated(),
            "client context ready"
        );

        Ok(Self {
            auth: AuthApi::new(transport.clone(), session.clone(), cache.clone()),
            profile: ProfileApi::new(transport.clone(), store.clone(), session.clone()),
            jobs: JobsApi::new(transport.clone(), offline.clone()),
            resume: ResumeApi::new(transport.clone(), downloads),
            communications: CommunicationsApi::new(
                transport.clone(),
                offline,
                cache.clone(),
                session.clone(),
            ),
            applications,
            reconciler,
            config,
            store,
            session,
            theme,
            cache,
            navigator,
            transport,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::time::Duration;

    pub(crate) struct TestContext {
        pub ctx: AppContext,
        pub routes: Arc<RouteState>,
        pub downloads: Arc<DirectoryDownloads>,
        pub _dir: tempfile::TempDir,
    }

    pub(crate) fn test_config(base_url: &str, dir: &std::path::Path) -> Config {
        Config {
            api_base_url: base_url.to_string(),
            data_dir: dir.join("data"),
            downloads_dir: dir.join("downloads"),
            query_stale: Duration::from_secs(30),
            query_retry: 0,
            log_level: "warn".to_string(),
        }
    }

    /// A context on an in-memory store, currently showing `location`.
    pub(crate) fn test_context(base_url: &str, location: &str) -> TestContext {
        test_context_with(base_url, location, |_| {})
    }

    pub(crate) fn test_context_with(
        base_url: &str,
        location: &str,
        configure: impl FnOnce(&mut Config),
    ) -> TestContext {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config(base_url, dir.path());
        configure(&mut config);
        let routes = Arc::new(RouteState::new(location));
        let downloads = Arc::new(DirectoryDownloads::new(config.downloads_dir.clone()));
        let store = Arc::new(LocalStore::open_in_memory().unwrap());
        let ctx = AppContext::new(config, store, routes.clone(), downloads.clone()).unwrap();
        TestContext {
            ctx,
            routes,
            downloads,
            _dir: dir,
        }
    }

    #[test]
    fn test_from_config_persists_session_across_contexts() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config("http://localhost:1/api", dir.path());

        let first = AppContext::from_config(config.clone()).unwrap();
        assert!(!first.session.is_authenticated());
        first
            .session
            .set_auth(crate::transport::tests::test_user("a@example.com"), "tok".to_string())
            .unwrap();
        drop(first);

        let second = AppContext::from_config(config).unwrap();
        assert_eq!(second.session.token().as_deref(), Some("tok"));
    }
}

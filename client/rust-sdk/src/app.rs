use std::sync::Arc;

use futures::join;

use crate::api::ApiClient;
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::storage::{FileSnapshotStorage, SnapshotStorage};
use crate::stores::{
    AuthStore, BlogStore, CourseStore, FamilyStore, LeaderboardStore, PremiumStore, QuizStore,
};

/// One application instance: the shared transport, the snapshot cache and
/// every store, wired once. There are no globals; embedders construct an
/// `App` and hand out clones of the store handles.
pub struct App {
    pub config: ClientConfig,
    pub auth: Arc<AuthStore>,
    pub courses: Arc<CourseStore>,
    pub family: Arc<FamilyStore>,
    pub quiz: Arc<QuizStore>,
    pub blog: Arc<BlogStore>,
    pub leaderboard: Arc<LeaderboardStore>,
    pub premium: Arc<PremiumStore>,
}

impl App {
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let storage = Arc::new(FileSnapshotStorage::new(config.cache_dir.clone()));
        Self::with_storage(config, storage)
    }

    /// Wiring with a caller-supplied snapshot store. Tests use the in-memory
    /// one to keep the filesystem out of the picture.
    pub fn with_storage(
        config: ClientConfig,
        storage: Arc<dyn SnapshotStorage>,
    ) -> Result<Self, ClientError> {
        let api = Arc::new(ApiClient::new(&config.api_base_url)?);
        let auth = Arc::new(AuthStore::new(api.clone(), storage));
        let courses = Arc::new(CourseStore::new(api.clone(), auth.clone()));
        let family = Arc::new(FamilyStore::new(api.clone(), auth.clone()));
        let quiz = Arc::new(QuizStore::new(api.clone(), auth.clone()));
        let blog = Arc::new(BlogStore::new(api.clone(), auth.clone()));
        let leaderboard = Arc::new(LeaderboardStore::new(api.clone(), auth.clone()));
        let premium = Arc::new(PremiumStore::new(api, auth.clone()));

        Ok(App {
            config,
            auth,
            courses,
            family,
            quiz,
            blog,
            leaderboard,
            premium,
        })
    }

    /// Startup: settle the session first because every other store keys off
    /// it, then pull courses and family concurrently. Refresh failures are
    /// logged and tolerated so an offline start still yields a usable
    /// instance running on cached state.
    pub async fn bootstrap(&self) {
        self.auth.bootstrap().await;

        let (courses, family) = join!(self.courses.refresh(), self.family.refresh());
        if let Err(e) = courses {
            tracing::warn!("Course refresh failed during startup: {}", e);
        }
        if let Err(e) = family {
            tracing::warn!("Family refresh failed during startup: {}", e);
        }
    }
}

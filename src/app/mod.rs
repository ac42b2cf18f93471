pub mod render;
pub mod report;

use crate::config::AppConfig;
use crate::core::live_view::{LiveTally, LiveView};
use crate::core::submission::{FormState, SubmissionPipeline};
use crate::domain::model::{CollectionPath, DateWindow, Session};
use crate::domain::ports::{AuthProvider, NominationStore};
use crate::utils::error::{BoardError, Result};
use render::SuccessView;
use std::sync::Arc;

/// Everything the board needs from configuration, passed in explicitly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardSettings {
    pub window: DateWindow,
    pub collection: CollectionPath,
    pub admin_contact: String,
}

impl From<&AppConfig> for BoardSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            window: config.window(),
            collection: config.collection(),
            admin_contact: config.admin_contact().to_string(),
        }
    }
}

/// An authenticated client: the registration form plus the live board.
pub struct NominationApp<B>
where
    B: AuthProvider + NominationStore + 'static,
{
    backend: Arc<B>,
    settings: BoardSettings,
    pipeline: SubmissionPipeline<B>,
}

impl<B> NominationApp<B>
where
    B: AuthProvider + NominationStore + 'static,
{
    /// Signs in anonymously. Failure here is fatal to the whole app.
    pub async fn start(backend: Arc<B>, settings: BoardSettings) -> Result<Self> {
        let session = backend
            .authenticate_anonymously()
            .await
            .map_err(|e| match e {
                BoardError::AuthError { .. } => e,
                other => BoardError::auth(other.to_string()),
            })
            .inspect_err(|e| tracing::error!("❌ Anonymous authentication failed: {}", e))?;

        tracing::info!(
            "🚀 Session ready for {} ({} days open)",
            settings.collection,
            settings.window.len()
        );

        let pipeline = SubmissionPipeline::new(
            backend.clone(),
            settings.collection.clone(),
            settings.window,
            session,
        );

        Ok(Self {
            backend,
            settings,
            pipeline,
        })
    }

    pub fn session(&self) -> &Session {
        self.pipeline.session()
    }

    pub fn settings(&self) -> &BoardSettings {
        &self.settings
    }

    pub async fn submit(&self, state: FormState) -> FormState {
        self.pipeline.submit(state).await
    }

    pub fn success_view(&self) -> SuccessView {
        SuccessView::new(self.settings.admin_contact.clone())
    }

    pub fn mount_live_view(&self) -> LiveView {
        LiveView::mount(
            self.backend.clone(),
            self.settings.collection.clone(),
            self.settings.window,
        )
    }

    /// Mounts a live view just long enough to receive the first push.
    pub async fn current_tally(&self) -> LiveTally {
        let mut view = self.mount_live_view();
        let tally = view.changed().await.unwrap_or_else(|| view.current());
        view.teardown();
        tally
    }
}

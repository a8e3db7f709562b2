use crate::session::Session;
use crate::store::SessionStore;
use lectern_core::{LecternResult, SessionId};
use std::sync::Arc;
use tracing::debug;

/// Owns the session store on behalf of the orchestrator and applies the
/// history window.
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    max_history: usize,
}

impl SessionManager {
    /// `max_history` counts exchanges; each exchange is two messages.
    pub fn new(store: Arc<dyn SessionStore>, max_history: usize) -> Self {
        Self { store, max_history }
    }

    pub async fn create_session(&self) -> LecternResult<SessionId> {
        let session = Session::new();
        self.store.create(&session).await?;
        debug!(session_id = %session.id, "Created session");
        Ok(session.id)
    }

    /// Formatted prior turns, or `None` for an unknown or empty session.
    pub async fn conversation_history(&self, id: &SessionId) -> LecternResult<Option<String>> {
        Ok(self
            .store
            .get(id)
            .await?
            .and_then(|session| session.format_history()))
    }

    pub async fn add_exchange(
        &self,
        id: &SessionId,
        user: impl Into<String>,
        assistant: impl Into<String>,
    ) -> LecternResult<()> {
        self.store
            .add_exchange(id, user.into(), assistant.into(), Some(self.max_history * 2))
            .await
    }

    pub async fn session(&self, id: &SessionId) -> LecternResult<Option<Session>> {
        self.store.get(id).await
    }

    pub async fn clear_session(&self, id: &SessionId) -> LecternResult<()> {
        if let Some(mut session) = self.store.get(id).await? {
            session.messages.clear();
            self.store.update(&session).await?;
        }
        Ok(())
    }
}

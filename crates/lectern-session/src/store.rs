use crate::session::Session;
use async_trait::async_trait;
use lectern_core::{LecternResult, SessionId};
use std::collections::HashMap;
use tokio::sync::RwLock;

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create(&self, session: &Session) -> LecternResult<()>;
    async fn get(&self, id: &SessionId) -> LecternResult<Option<Session>>;
    async fn update(&self, session: &Session) -> LecternResult<()>;

    /// Append one exchange in one step, creating the session when unknown.
    /// When `keep_last` is set the session is trimmed to that many messages.
    async fn add_exchange(
        &self,
        id: &SessionId,
        user: String,
        assistant: String,
        keep_last: Option<usize>,
    ) -> LecternResult<()>;
}

/// Sessions held in process memory; they live as long as the server does.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<SessionId, Session>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn create(&self, session: &Session) -> LecternResult<()> {
        self.sessions
            .write()
            .await
            .insert(session.id.clone(), session.clone());
        Ok(())
    }

    async fn get(&self, id: &SessionId) -> LecternResult<Option<Session>> {
        Ok(self.sessions.read().await.get(id).cloned())
    }

    async fn update(&self, session: &Session) -> LecternResult<()> {
        self.create(session).await
    }

    async fn add_exchange(
        &self,
        id: &SessionId,
        user: String,
        assistant: String,
        keep_last: Option<usize>,
    ) -> LecternResult<()> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .entry(id.clone())
            .or_insert_with(|| Session::with_id(id.clone()));
        session.add_exchange(user, assistant);
        if let Some(limit) = keep_last {
            session.trim_to(limit);
        }
        Ok(())
    }
}

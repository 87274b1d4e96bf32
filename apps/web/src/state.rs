use std::sync::Arc;

use regassist_core::Agent;

use crate::session::SessionStore;

/// State shared across all handlers: one assistant, many conversations.
pub struct AppState<C> {
    pub agent: Arc<Agent<C>>,
    pub sessions: SessionStore,
}

impl<C> AppState<C> {
    pub fn new(agent: Agent<C>) -> Self {
        Self {
            agent: Arc::new(agent),
            sessions: SessionStore::new(),
        }
    }
}

// Derived Clone would require `C: Clone`.
impl<C> Clone for AppState<C> {
    fn clone(&self) -> Self {
        Self {
            agent: Arc::clone(&self.agent),
            sessions: self.sessions.clone(),
        }
    }
}

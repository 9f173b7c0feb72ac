//! Open page sessions and the activation-time claim.

use hashbrown::HashMap;
use tracing::debug;
use url::Url;

use plaza_core::types::{SessionId, WorkerId};

/// An open page, controlled by a worker instance or not yet.
#[derive(Debug, Clone)]
pub struct PageSession {
    pub id: SessionId,
    pub url: Url,
    /// Worker instance currently serving this page, if any.
    pub controller: Option<WorkerId>,
}

impl PageSession {
    pub fn new(url: Url) -> Self {
        Self {
            id: SessionId::new(),
            url,
            controller: None,
        }
    }

    pub fn is_controlled(&self) -> bool {
        self.controller.is_some()
    }
}

/// Registry of open page sessions.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<SessionId, PageSession>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a newly opened page. Returns its id.
    pub fn open(&mut self, url: Url) -> SessionId {
        let session = PageSession::new(url);
        let id = session.id;
        self.sessions.insert(id, session);
        id
    }

    /// Stop tracking a page.
    pub fn close(&mut self, id: SessionId) -> Option<PageSession> {
        self.sessions.remove(&id)
    }

    pub fn get(&self, id: SessionId) -> Option<&PageSession> {
        self.sessions.get(&id)
    }

    /// Take control of every open session, without requiring a reload.
    ///
    /// Returns how many sessions changed controller.
    pub fn claim(&mut self, worker: WorkerId) -> usize {
        let mut claimed = 0;
        for session in self.sessions.values_mut() {
            if session.controller != Some(worker) {
                session.controller = Some(worker);
                claimed += 1;
            }
        }
        debug!(worker = worker.0, claimed, "Claimed open sessions");
        claimed
    }

    /// Sessions currently controlled by the given worker.
    pub fn controlled_by(&self, worker: WorkerId) -> usize {
        self.sessions
            .values()
            .filter(|s| s.controller == Some(worker))
            .count()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

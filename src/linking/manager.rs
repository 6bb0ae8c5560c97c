//! Live code-entry sessions for professionals.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::store::ClientDirectory;

use super::protocol::LinkingSession;

struct Slot {
    session: Arc<LinkingSession>,
    touched: DateTime<Utc>,
}

pub struct LinkingManager {
    directory: Arc<dyn ClientDirectory>,
    handoff_delay: Duration,
    sessions: RwLock<HashMap<Uuid, Slot>>,
}

impl LinkingManager {
    pub fn new(directory: Arc<dyn ClientDirectory>, handoff_delay: Duration) -> Self {
        Self {
            directory,
            handoff_delay,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Open a new session with an empty code entry.
    pub async fn open(&self) -> (Uuid, Arc<LinkingSession>) {
        let id = Uuid::new_v4();
        let session = Arc::new(LinkingSession::new(
            Arc::clone(&self.directory),
            self.handoff_delay,
        ));
        self.sessions.write().await.insert(
            id,
            Slot {
                session: Arc::clone(&session),
                touched: Utc::now(),
            },
        );
        info!(session_id = %id, "Linking session opened");
        (id, session)
    }

    /// Look up a session and mark it as used.
    pub async fn get(&self, id: Uuid) -> Option<Arc<LinkingSession>> {
        let mut sessions = self.sessions.write().await;
        let slot = sessions.get_mut(&id)?;
        slot.touched = Utc::now();
        Some(Arc::clone(&slot.session))
    }

    /// Close a session. An in-flight verify keeps running; its result is
    /// simply never read.
    pub async fn close(&self, id: Uuid) -> bool {
        let removed = self.sessions.write().await.remove(&id).is_some();
        if removed {
            info!(session_id = %id, "Linking session closed");
        }
        removed
    }

    /// Drop sessions nobody has used for `ttl`. Returns how many were dropped.
    pub async fn expire_idle(&self, ttl: Duration) -> usize {
        let Ok(ttl) = chrono::Duration::from_std(ttl) else {
            return 0;
        };
        match Utc::now().checked_sub_signed(ttl) {
            Some(cutoff) => self.expire_untouched_since(cutoff).await,
            None => 0,
        }
    }

    async fn expire_untouched_since(&self, cutoff: DateTime<Utc>) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|id, slot| {
            let keep = slot.touched > cutoff;
            if !keep {
                debug!(session_id = %id, "Linking session expired");
            }
            keep
        });
        let expired = before - sessions.len();
        if expired > 0 {
            info!(count = expired, "Expired idle linking sessions");
        }
        expired
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

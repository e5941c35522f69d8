//! Follow someone else's live location session

use vigil_core::effects::{DocumentChange, DocumentStoreEffects, DocumentSubscription};
use vigil_core::{Coordinate, LiveSessionId, Result, VigilError};

use crate::records::{LiveLocationRecord, LIVE_LOCATIONS};

/// A change observed on a followed session
#[derive(Debug, Clone, PartialEq)]
pub enum LiveLocationUpdate {
    /// The sharer's position was written
    Moved {
        /// Latest coordinate
        coordinate: Coordinate,
        /// When it was written, ms since epoch
        updated_at: u64,
        /// When the session ends, ms since epoch
        expires_at: u64,
    },
    /// The session was stopped or expired
    Ended,
}

/// Real-time view of one `liveLocations` record
#[derive(Debug)]
pub struct LiveLocationViewer {
    session: LiveSessionId,
    subscription: DocumentSubscription,
    ended: bool,
}

impl LiveLocationViewer {
    /// Subscribe to session `id`. `NotFound` when it is not running.
    pub async fn follow<S>(store: &S, id: LiveSessionId) -> Result<Self>
    where
        S: DocumentStoreEffects + ?Sized,
    {
        let key = id.to_string();
        if store.get(LIVE_LOCATIONS, &key).await?.is_none() {
            return Err(VigilError::not_found(format!("live location session {id}")));
        }
        let subscription = store.subscribe(LIVE_LOCATIONS, &key).await?;
        tracing::debug!(session = %id, "following live location");
        Ok(Self {
            session: id,
            subscription,
            ended: false,
        })
    }

    /// Session being followed
    pub fn session(&self) -> LiveSessionId {
        self.session
    }

    /// Next update; `None` after `Ended` or unsubscribe
    pub async fn next(&mut self) -> Option<LiveLocationUpdate> {
        if self.ended {
            return None;
        }
        loop {
            match self.subscription.next().await? {
                DocumentChange::Upserted(document) => {
                    match LiveLocationRecord::from_document(&document) {
                        Ok(record) => {
                            return Some(LiveLocationUpdate::Moved {
                                coordinate: record.coordinate(),
                                updated_at: record.updated_at,
                                expires_at: record.expires_at,
                            })
                        }
                        Err(err) => {
                            tracing::warn!(session = %self.session, error = %err, "skipping malformed live location record");
                        }
                    }
                }
                DocumentChange::Removed => {
                    self.ended = true;
                    self.subscription.unsubscribe();
                    return Some(LiveLocationUpdate::Ended);
                }
            }
        }
    }

    /// Stop following. Safe to call repeatedly.
    pub fn unsubscribe(&self) -> bool {
        self.subscription.unsubscribe()
    }
}

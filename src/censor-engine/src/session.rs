//! Session dialogue state machine
//!
//! ```text
//! (none)          --begin-->   AwaitingPhoto
//! AwaitingPhoto   --photo-->   AwaitingPhrase
//! AwaitingPhrase  --photo-->   AwaitingPhrase   (replaces the pending image)
//! AwaitingPhrase  --phrase-->  Done             (OCR, redaction, reply)
//! any live state  --cancel-->  Done
//! any live state  --idle-->    Done             (see `Dialogue::expire_idle`)
//! ```
//!
//! Every other combination is ignored and leaves the session untouched. A
//! session reaching `Done` is removed from the store and its pending image is
//! deleted, whether processing succeeded, found nothing or failed.

use crate::error::{Result, SessionError};
use crate::redactor::{decode_image, RedactionResult, Redactor};
use crate::store::{Session, SessionId, SessionState, SessionStore};
use crate::workspace::Workspace;
use censor_ocr::Detector;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Externally visible phase of a user's dialogue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    AwaitingPhoto,
    AwaitingPhrase,
    /// Terminal; also reported when the user has no session at all
    Done,
}

/// Events delivered by the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Explicit request to start a redaction
    Begin { username: Option<String> },
    /// Uploaded photo, already stored at this path; the file is handed over
    Photo(PathBuf),
    /// Plain text message
    Text(String),
    Cancel,
}

/// Result of applying one event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    AwaitingPhoto,
    AwaitingPhrase { replaced: bool },
    /// Redacted image written here; the transport deletes it once sent
    Redacted { output: PathBuf },
    /// Nothing matched; everything OCR read, in detection order
    NoMatch { detections: Vec<String> },
    Cancelled,
    Ignored,
}

/// Drives every user's dialogue.
///
/// Events for one user are applied one at a time in arrival order. OCR and
/// redaction run on the blocking pool while holding only that user's lock, so
/// other users are never held up. A cancel sent during processing waits for
/// the lock and then finds the session already finished.
pub struct Dialogue {
    store: Arc<dyn SessionStore>,
    detector: Arc<dyn Detector>,
    redactor: Redactor,
    workspace: Workspace,
    locks: Mutex<HashMap<SessionId, Arc<tokio::sync::Mutex<()>>>>,
}

impl Dialogue {
    pub fn new(
        store: Arc<dyn SessionStore>,
        detector: Arc<dyn Detector>,
        redactor: Redactor,
        workspace: Workspace,
    ) -> Self {
        Self {
            store,
            detector,
            redactor,
            workspace,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn phase(&self, id: SessionId) -> Phase {
        match self.store.get(id).map(|s| s.state) {
            None => Phase::Done,
            Some(SessionState::AwaitingPhoto) => Phase::AwaitingPhoto,
            Some(SessionState::AwaitingPhrase { .. }) => Phase::AwaitingPhrase,
        }
    }

    pub async fn handle(&self, id: SessionId, event: Event) -> Result<Outcome> {
        self.handle_with_progress(id, event, || {}).await
    }

    /// Apply `event`, calling `on_processing` right before OCR starts
    pub async fn handle_with_progress<F>(
        &self,
        id: SessionId,
        event: Event,
        on_processing: F,
    ) -> Result<Outcome>
    where
        F: FnOnce(),
    {
        let lock = self.user_lock(id);
        let result = {
            let _guard = lock.lock().await;
            self.apply(id, event, on_processing).await
        };
        self.release_lock(id, lock);
        result
    }

    async fn apply<F: FnOnce()>(&self, id: SessionId, event: Event, on_processing: F) -> Result<Outcome> {
        let session = self.store.get(id);

        match (session, event) {
            (None, Event::Begin { username }) => {
                info!(user = %id, "session started, awaiting photo");
                self.store.put(Session::new(id, username));
                Ok(Outcome::AwaitingPhoto)
            }

            (Some(mut session), Event::Photo(path)) => {
                let replaced = match session.state {
                    SessionState::AwaitingPhoto => false,
                    SessionState::AwaitingPhrase { pending_image } => {
                        self.discard(&pending_image);
                        true
                    }
                };
                info!(user = %id, replaced, "photo stored at {:?}, awaiting phrase", path);
                session.state = SessionState::AwaitingPhrase { pending_image: path };
                session.touch();
                self.store.put(session);
                Ok(Outcome::AwaitingPhrase { replaced })
            }

            (None, Event::Photo(path)) => {
                debug!(user = %id, "photo outside a session, dropping {:?}", path);
                self.discard(&path);
                Ok(Outcome::Ignored)
            }

            (Some(session), Event::Text(phrase)) => {
                let SessionState::AwaitingPhrase { pending_image } = session.state else {
                    debug!(user = %id, "text while awaiting photo, ignoring");
                    return Ok(Outcome::Ignored);
                };

                if phrase.trim().is_empty() {
                    debug!(user = %id, "empty phrase, keeping session open");
                    return Err(SessionError::EmptyPhrase);
                }

                self.store.remove(id);
                on_processing();

                let result = self
                    .process(id, session.username, pending_image.clone(), phrase)
                    .await;
                self.discard(&pending_image);

                match &result {
                    Ok(Outcome::Redacted { output }) => {
                        info!(user = %id, "session done, redacted image at {:?}", output)
                    }
                    Ok(Outcome::NoMatch { detections }) => {
                        info!(user = %id, found = detections.len(), "session done, no match")
                    }
                    Ok(_) => {}
                    Err(e) => warn!(user = %id, "session failed: {}", e),
                }
                result
            }

            (Some(session), Event::Cancel) => {
                info!(user = %id, "session cancelled");
                self.store.remove(id);
                if let Some(path) = session.pending_image() {
                    self.discard(path);
                }
                Ok(Outcome::Cancelled)
            }

            (session, event) => {
                debug!(
                    user = %id,
                    active = session.is_some(),
                    "ignoring {:?}",
                    event
                );
                Ok(Outcome::Ignored)
            }
        }
    }

    /// End every session idle for longer than `max_idle`, returning their ids.
    ///
    /// Each session is re-checked under its user's lock, so one that moved on
    /// (or finished) while the sweep waited is left alone.
    pub async fn expire_idle(&self, max_idle: Duration) -> Vec<SessionId> {
        let Some(cutoff) = Instant::now().checked_sub(max_idle) else {
            return Vec::new();
        };

        let mut expired = Vec::new();
        for id in self.store.idle_since(cutoff) {
            let lock = self.user_lock(id);
            let removed = {
                let _guard = lock.lock().await;
                match self.store.get(id) {
                    Some(session) if session.updated_at <= cutoff => {
                        self.store.remove(id);
                        if let Some(path) = session.pending_image() {
                            self.discard(path);
                        }
                        true
                    }
                    _ => false,
                }
            };
            self.release_lock(id, lock);

            if removed {
                info!(user = %id, "session timed out");
                expired.push(id);
            }
        }
        expired
    }

    /// Decode, detect, redact and persist on the blocking pool
    async fn process(
        &self,
        id: SessionId,
        username: Option<String>,
        image_path: PathBuf,
        phrase: String,
    ) -> Result<Outcome> {
        let detector = Arc::clone(&self.detector);
        let redactor = self.redactor;
        let workspace = self.workspace.clone();

        let job = move || -> Result<Outcome> {
            let image = decode_image(&image_path)?;
            let detections = detector.detect(&image)?;
            debug!(user = %id, "detected {} text regions", detections.len());

            match redactor.redact(&image, &detections, &phrase) {
                RedactionResult::Redacted(redacted) => {
                    let output = workspace.save_processed(id, username.as_deref(), &redacted)?;
                    Ok(Outcome::Redacted { output })
                }
                RedactionResult::NoMatch(detections) => Ok(Outcome::NoMatch { detections }),
            }
        };

        tokio::task::spawn_blocking(job)
            .await
            .map_err(|e| SessionError::Worker(e.to_string()))?
    }

    fn discard(&self, path: &Path) {
        if let Err(e) = self.workspace.discard(path) {
            warn!("failed to remove {:?}: {}", path, e);
        }
    }

    fn user_lock(&self, id: SessionId) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(id).or_default())
    }

    fn release_lock(&self, id: SessionId, lock: Arc<tokio::sync::Mutex<()>>) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        // Only the map and this caller hold it: nobody is queued behind us
        if Arc::strong_count(&lock) == 2 {
            locks.remove(&id);
        }
    }
}

//! censor-engine - redaction engine for Censor
//!
//! Runs each user's short dialogue (photo, then phrase), matches OCR
//! detections against the phrase and paints over the matches. When nothing
//! matches, the engine answers with everything it could read instead.

mod error;
pub mod matching;
pub mod redactor;
pub mod replies;
pub mod session;
pub mod store;
pub mod workspace;

pub use error::{Result, SessionError};
pub use matching::{fold, matches};
pub use redactor::{decode_image, RedactionResult, Redactor, FILL_COLOR};
pub use replies::Reply;
pub use session::{Dialogue, Event, Outcome, Phase};
pub use store::{MemoryStore, Session, SessionId, SessionState, SessionStore};
pub use workspace::Workspace;

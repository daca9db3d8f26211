//! Update handlers translating Telegram messages into dialogue events

use crate::error::{BotError, HandlerResult};
use crate::state::BotState;
use censor_engine::replies::{self, Reply};
use censor_engine::{Event, Phase, SessionId};
use std::future::Future;
use std::path::Path;
use teloxide::net::Download;
use teloxide::prelude::*;
use teloxide::types::{InputFile, User};
use teloxide::utils::command::BotCommands;
use tokio::io::AsyncWriteExt;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "These commands are supported:")]
pub enum Command {
    #[command(description = "show the greeting.")]
    Start,
    #[command(description = "show this help.")]
    Help,
    #[command(description = "censor text on a photo.")]
    Censor,
    #[command(description = "stop current censoring.")]
    Cancel,
}

/// Plain text that is not a bot command
pub fn is_phrase(msg: &Message) -> bool {
    msg.text().is_some_and(is_phrase_text)
}

fn is_phrase_text(text: &str) -> bool {
    !text.starts_with('/')
}

/// Photos are only worth downloading while a session is live
fn accepts_photo(state: &BotState, id: SessionId) -> bool {
    state.dialogue.phase(id) != Phase::Done
}

pub async fn command(bot: Bot, msg: Message, cmd: Command, state: BotState) -> HandlerResult {
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };
    debug!(user = %user.id, "command {:?}", cmd);

    match cmd {
        Command::Start => {
            bot.send_message(msg.chat.id, replies::GREETING).await?;
        }
        Command::Help => {
            bot.send_message(msg.chat.id, Command::descriptions().to_string())
                .await?;
        }
        Command::Censor => {
            let event = Event::Begin {
                username: user.username.clone(),
            };
            dispatch(&bot, &msg, user, &state, event).await?;
        }
        Command::Cancel => {
            info!("user {} canceled the conversation", user.first_name);
            dispatch(&bot, &msg, user, &state, Event::Cancel).await?;
        }
    }

    Ok(())
}

pub async fn photo(bot: Bot, msg: Message, state: BotState) -> HandlerResult {
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };
    // Telegram lists sizes ascending; keep the largest
    let Some(photo) = msg.photo().and_then(|sizes| sizes.last()) else {
        return Ok(());
    };

    let id = session_id(user);
    if !accepts_photo(&state, id) {
        debug!(user = %id, "photo outside a session, not downloading");
        return Ok(());
    }

    let workspace = state.dialogue.workspace();
    let path = workspace.new_original(id, user.username.as_deref())?;

    if let Err(e) = download(&bot, &photo.file.id, &path).await {
        error!(user = %id, "failed to download photo: {}", e);
        if let Err(e) = workspace.discard(&path) {
            warn!("failed to remove partial download {:?}: {}", path, e);
        }
        bot.send_message(msg.chat.id, replies::DOWNLOAD_FAILED).await?;
        return Ok(());
    }

    info!(user = %id, "photo from {:?} saved to {:?}", user.username, path);
    dispatch(&bot, &msg, user, &state, Event::Photo(path)).await
}

pub async fn text(bot: Bot, msg: Message, state: BotState) -> HandlerResult {
    let (Some(user), Some(text)) = (msg.from.as_ref(), msg.text()) else {
        return Ok(());
    };

    dispatch(&bot, &msg, user, &state, Event::Text(text.to_string())).await
}

fn session_id(user: &User) -> SessionId {
    SessionId(user.id.0)
}

/// Run one event through the dialogue and deliver whatever it answers
async fn dispatch(
    bot: &Bot,
    msg: &Message,
    user: &User,
    state: &BotState,
    event: Event,
) -> HandlerResult {
    let chat = msg.chat.id;
    let id = session_id(user);

    let notice_bot = bot.clone();
    let animation = state.wait_animation.clone();
    let (on_processing, notice) = wait_notice(async move {
        if let Err(e) = send_wait_notice(&notice_bot, chat, animation).await {
            warn!("failed to send wait notice: {}", e);
        }
    });

    let result = state
        .dialogue
        .handle_with_progress(id, event, on_processing)
        .await;
    notice.settle().await;

    match result {
        Ok(outcome) => deliver(bot, chat, state, outcome.replies()).await,
        Err(e) => {
            if e.is_fatal() {
                error!(user = %id, "request failed: {}", e);
            }
            bot.send_message(chat, e.user_message()).await?;
            Ok(())
        }
    }
}

/// Defers `notice` until processing starts.
///
/// The returned closure spawns it; `PendingNotice::settle` then waits for it
/// so the result never overtakes the notice.
fn wait_notice<N>(notice: N) -> (impl FnOnce(), PendingNotice)
where
    N: Future<Output = ()> + Send + 'static,
{
    let (tx, rx) = oneshot::channel();
    let start = move || {
        let _ = tx.send(tokio::spawn(notice));
    };
    (start, PendingNotice(rx))
}

struct PendingNotice(oneshot::Receiver<JoinHandle<()>>);

impl PendingNotice {
    /// Wait for the notice if processing started one, else return at once
    async fn settle(mut self) {
        if let Ok(task) = self.0.try_recv() {
            if let Err(e) = task.await {
                warn!("wait notice task failed: {}", e);
            }
        }
    }
}

async fn deliver(bot: &Bot, chat: ChatId, state: &BotState, replies: Vec<Reply>) -> HandlerResult {
    for reply in replies {
        match reply {
            Reply::Text(text) => {
                bot.send_message(chat, text).await?;
            }
            Reply::Document(path) => {
                let sent = bot.send_document(chat, InputFile::file(&path)).await;
                // The processed file is transient whether or not the upload worked
                if let Err(e) = state.dialogue.workspace().discard(&path) {
                    warn!("failed to remove {:?}: {}", path, e);
                }
                sent?;
            }
        }
    }
    Ok(())
}

async fn send_wait_notice(
    bot: &Bot,
    chat: ChatId,
    animation: Option<reqwest::Url>,
) -> Result<(), BotError> {
    bot.send_message(chat, replies::PLEASE_WAIT).await?;
    if let Some(url) = animation {
        bot.send_animation(chat, InputFile::url(url)).await?;
    }
    Ok(())
}

async fn download(bot: &Bot, file_id: &str, path: &Path) -> Result<(), BotError> {
    let file = bot.get_file(file_id).await?;
    let mut dst = tokio::fs::File::create(path).await?;
    bot.download_file(&file.path, &mut dst).await?;
    dst.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use censor_engine::{Dialogue, MemoryStore, Redactor, Workspace};
    use censor_ocr::{Detector, OcrError, TextDetection};
    use image::{Rgb, RgbImage};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;

    const USER: SessionId = SessionId(42);

    /// OCR that always fails, so processing ends right after it starts
    struct FailingDetector;

    impl Detector for FailingDetector {
        fn detect(&self, _image: &RgbImage) -> censor_ocr::Result<Vec<TextDetection>> {
            Err(OcrError::ServiceError {
                status: 503,
                message: "unavailable".to_string(),
            })
        }
    }

    fn state(dir: &TempDir) -> BotState {
        let dialogue = Dialogue::new(
            Arc::new(MemoryStore::new()),
            Arc::new(FailingDetector),
            Redactor::default(),
            Workspace::new(dir.path()),
        );
        BotState::new(Arc::new(dialogue), None)
    }

    #[test]
    fn test_phrase_text() {
        assert!(is_phrase_text("say hello"));
        assert!(is_phrase_text("  /not at start"));
        assert!(is_phrase_text(""));
        assert!(!is_phrase_text("/censor"));
        assert!(!is_phrase_text("/unknown command"));
    }

    #[tokio::test]
    async fn test_photo_accepted_only_in_live_session() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(&dir);
        assert!(!accepts_photo(&state, USER));

        state
            .dialogue
            .handle(USER, Event::Begin { username: None })
            .await
            .unwrap();
        assert!(accepts_photo(&state, USER));

        state.dialogue.handle(USER, Event::Cancel).await.unwrap();
        assert!(!accepts_photo(&state, USER));
    }

    #[tokio::test]
    async fn test_failure_reply_waits_for_notice() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(&dir);
        state
            .dialogue
            .handle(USER, Event::Begin { username: None })
            .await
            .unwrap();
        let photo = state.dialogue.workspace().new_original(USER, None).unwrap();
        RgbImage::from_pixel(20, 20, Rgb([255, 255, 255]))
            .save_with_format(&photo, image::ImageFormat::Png)
            .unwrap();
        state.dialogue.handle(USER, Event::Photo(photo)).await.unwrap();

        let sent = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&sent);
        let (on_processing, notice) = wait_notice(async move {
            // Slower than the failing OCR
            tokio::time::sleep(Duration::from_millis(100)).await;
            flag.store(true, Ordering::SeqCst);
        });

        let result = state
            .dialogue
            .handle_with_progress(USER, Event::Text("hello".into()), on_processing)
            .await;
        assert!(result.is_err());

        notice.settle().await;
        assert!(sent.load(Ordering::SeqCst), "notice must be out before the error reply");
    }

    #[tokio::test]
    async fn test_no_notice_without_processing() {
        let sent = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&sent);
        let (on_processing, notice) = wait_notice(async move {
            flag.store(true, Ordering::SeqCst);
        });
        drop(on_processing);

        tokio::time::timeout(Duration::from_secs(1), notice.settle())
            .await
            .unwrap();
        assert!(!sent.load(Ordering::SeqCst));
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse("/censor", "censor_bot").unwrap(), Command::Censor);
        assert_eq!(Command::parse("/cancel", "censor_bot").unwrap(), Command::Cancel);
        assert_eq!(Command::parse("/start", "censor_bot").unwrap(), Command::Start);
        assert_eq!(
            Command::parse("/censor@censor_bot", "censor_bot").unwrap(),
            Command::Censor
        );
        assert!(Command::parse("/unknown", "censor_bot").is_err());
        assert!(Command::parse("hello", "censor_bot").is_err());
    }

    #[test]
    fn test_help_lists_commands() {
        let help = Command::descriptions().to_string();
        for name in ["/start", "/help", "/censor", "/cancel"] {
            assert!(help.contains(name), "missing {} in {}", name, help);
        }
    }
}

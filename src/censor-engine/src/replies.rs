//! User-visible texts for dialogue outcomes and errors

use crate::error::SessionError;
use crate::session::Outcome;
use std::path::PathBuf;

pub const GREETING: &str = "Hi! I'm Censor Bot. I will censor words on the provided photo.\n\
                            Send /censor to proceed.";

pub const PHOTO_PROMPT: &str = "Please send me an image to censor.\n\
                                Send /cancel to stop current censoring.";

pub const PHRASE_PROMPT: &str = "Now, please send me text that needs to be censored on the image.";

pub const PHOTO_REPLACED: &str = "Got it, I'll use this photo instead.\n\
                                  Now, please send me text that needs to be censored on the image.";

pub const PLEASE_WAIT: &str = "Thank you for using this bot.\n\
                               Images are processed on a CPU, so this may take a moment.\n\
                               I'll be right back with the results!";

pub const GOODBYE: &str = "Bye! I hope we can talk again some day.";

pub const NOT_FOUND: &str = "Sorry, your text wasn't found on the image.";

pub const EMPTY_PHRASE: &str = "The text to censor is empty. Please send the words you want hidden.";

pub const DOWNLOAD_FAILED: &str = "Sorry, I couldn't download this photo. Please send it again.";

pub const TIMED_OUT: &str = "I stopped waiting, so this censoring was cancelled.\n\
                             Send /censor to start again.";

pub const FAILED: &str = "Sorry, I couldn't process this image. Send /censor to try again.";

/// Telegram rejects messages longer than 4096 characters
const MAX_MESSAGE_CHARS: usize = 4000;

/// Outbound payload for the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Text(String),
    Document(PathBuf),
}

impl Outcome {
    pub fn replies(&self) -> Vec<Reply> {
        match self {
            Outcome::AwaitingPhoto => vec![Reply::Text(PHOTO_PROMPT.to_string())],
            Outcome::AwaitingPhrase { replaced: false } => {
                vec![Reply::Text(PHRASE_PROMPT.to_string())]
            }
            Outcome::AwaitingPhrase { replaced: true } => {
                vec![Reply::Text(PHOTO_REPLACED.to_string())]
            }
            Outcome::Redacted { output } => vec![Reply::Document(output.clone())],
            Outcome::NoMatch { detections } => vec![Reply::Text(inventory(detections))],
            Outcome::Cancelled => vec![Reply::Text(GOODBYE.to_string())],
            Outcome::Ignored => Vec::new(),
        }
    }
}

impl SessionError {
    pub fn user_message(&self) -> &'static str {
        match self {
            SessionError::EmptyPhrase => EMPTY_PHRASE,
            _ => FAILED,
        }
    }
}

/// "Not found" notice followed by everything that was read from the image
pub fn inventory(detections: &[String]) -> String {
    let lines: Vec<&str> = detections
        .iter()
        .map(|d| d.trim())
        .filter(|d| !d.is_empty())
        .collect();

    if lines.is_empty() {
        return format!("{}\nI couldn't read any text on this image.", NOT_FOUND);
    }

    let mut message = format!("{}\nHere is what I could read:", NOT_FOUND);
    for line in lines {
        let entry = format!("\n• {}", line);
        if message.chars().count() + entry.chars().count() > MAX_MESSAGE_CHARS {
            message.push_str("\n…");
            break;
        }
        message.push_str(&entry);
    }
    message.push_str("\nSend /censor to try again with the exact wording.");
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inventory_lists_detections_in_order() {
        let text = inventory(&["foo".to_string(), "  ".to_string(), "Привет".to_string()]);
        assert!(text.starts_with(NOT_FOUND));
        let foo = text.find("• foo").unwrap();
        let privet = text.find("• Привет").unwrap();
        assert!(foo < privet);
        assert_eq!(text.matches('•').count(), 2);
    }

    #[test]
    fn test_inventory_without_text() {
        let text = inventory(&[]);
        assert!(text.contains("couldn't read any text"));
    }

    #[test]
    fn test_inventory_truncated() {
        let many: Vec<String> = (0..2000).map(|i| format!("word{}", i)).collect();
        let text = inventory(&many);
        assert!(text.chars().count() <= 4096);
        assert!(text.contains("\n…"));
    }

    #[test]
    fn test_outcome_replies() {
        assert!(Outcome::Ignored.replies().is_empty());
        assert_eq!(
            Outcome::Redacted { output: PathBuf::from("out.jpg") }.replies(),
            vec![Reply::Document(PathBuf::from("out.jpg"))]
        );
        assert_eq!(
            Outcome::Cancelled.replies(),
            vec![Reply::Text(GOODBYE.to_string())]
        );
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(SessionError::EmptyPhrase.user_message(), EMPTY_PHRASE);
        assert_eq!(SessionError::InvalidImage("x".into()).user_message(), FAILED);
        assert_eq!(SessionError::Worker("boom".into()).user_message(), FAILED);
    }
}

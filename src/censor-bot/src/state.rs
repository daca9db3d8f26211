//! Shared bot state

use censor_engine::Dialogue;
use reqwest::Url;
use std::sync::Arc;
use std::time::Duration;

/// State injected into every handler
#[derive(Clone)]
pub struct BotState {
    pub dialogue: Arc<Dialogue>,

    /// Optional animation sent along with the "please wait" notice
    pub wait_animation: Option<Url>,

    /// Unfinished sessions idle this long are dropped
    pub session_timeout: Option<Duration>,
}

impl BotState {
    pub fn new(dialogue: Arc<Dialogue>, wait_animation: Option<Url>) -> Self {
        Self {
            dialogue,
            wait_animation,
            session_timeout: None,
        }
    }

    pub fn with_session_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.session_timeout = timeout;
        self
    }
}

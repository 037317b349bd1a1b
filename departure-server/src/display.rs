//! Display payloads for LaMetric-style devices.
//!
//! A payload is a list of frames the device cycles through. Successful
//! lookups become one frame per token; failures become a single frame with
//! the failure text.

use std::collections::HashMap;

use serde::Serialize;

use crate::domain::{DepartureError, TransportMode};

/// What the device is sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayPayload {
    pub frames: Vec<Frame>,
}

/// One screen of text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Frame {
    pub index: usize,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

/// Turns lookup results into device payloads.
pub trait DisplayFormatter: Send + Sync {
    /// Payload for a successful lookup.
    fn create_response(&self, tokens: &[String], mode: TransportMode) -> DisplayPayload;

    /// Payload for a failed lookup.
    fn create_error(&self, error: &DepartureError, mode: TransportMode) -> DisplayPayload;
}

/// Plain frames, optionally decorated with an icon per transport mode.
#[derive(Debug, Clone, Default)]
pub struct FramesFormatter {
    icons: HashMap<TransportMode, String>,
}

impl FramesFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Show `icon` on every frame for `mode`.
    pub fn with_icon(mut self, mode: TransportMode, icon: impl Into<String>) -> Self {
        self.icons.insert(mode, icon.into());
        self
    }

    fn frames<'a>(
        &self,
        texts: impl IntoIterator<Item = &'a str>,
        mode: TransportMode,
    ) -> DisplayPayload {
        let icon = self.icons.get(&mode);
        let frames = texts
            .into_iter()
            .enumerate()
            .map(|(index, text)| Frame {
                index,
                text: text.to_string(),
                icon: icon.cloned(),
            })
            .collect();
        DisplayPayload { frames }
    }
}

impl DisplayFormatter for FramesFormatter {
    fn create_response(&self, tokens: &[String], mode: TransportMode) -> DisplayPayload {
        self.frames(tokens.iter().map(String::as_str), mode)
    }

    fn create_error(&self, error: &DepartureError, mode: TransportMode) -> DisplayPayload {
        self.frames([error.to_string().as_str()], mode)
    }
}

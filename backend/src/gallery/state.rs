//! View state rendered by the gallery page

use image_storage::StoredImage;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Shown when a non-image file is selected
pub const IMAGES_ONLY_MESSAGE: &str = "Only image files can be uploaded.";
/// Shown after an acknowledged upload
pub const UPLOAD_COMPLETE_MESSAGE: &str = "Upload complete!";
/// Shown after a successful delete
pub const IMAGE_DELETED_MESSAGE: &str = "Image deleted.";

/// How the status banner presents the current message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum MessageLevel {
    /// The message reports a success
    Success,
    /// The message reports a failure
    Error,
}

impl MessageLevel {
    /// Classifies a message by its wording, `None` for an empty message
    #[must_use]
    pub fn classify(message: &str) -> Option<Self> {
        if message.is_empty() {
            return None;
        }
        let lower = message.to_lowercase();
        if lower.contains("failed") || lower.contains("error") || message == IMAGES_ONLY_MESSAGE {
            Some(Self::Error)
        } else {
            Some(Self::Success)
        }
    }
}

/// Everything the gallery page needs to render
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ViewState {
    /// Images from the latest successful listing
    pub images: Vec<StoredImage>,
    /// An upload is in flight
    pub uploading: bool,
    /// Progress of the upload in flight, `0..=100`
    pub upload_progress: u8,
    /// Accepted uploads that have not finished yet, including the one in
    /// flight
    pub pending_uploads: u32,
    /// Last status message, empty when there is none
    pub message: String,
    /// Presentation of `message`
    pub message_level: Option<MessageLevel>,
    /// A listing is in flight
    pub loading: bool,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            images: Vec::new(),
            uploading: false,
            upload_progress: 0,
            pending_uploads: 0,
            message: String::new(),
            message_level: None,
            loading: true,
        }
    }
}

impl ViewState {
    /// Replaces the status message
    pub fn set_message(&mut self, message: impl Into<String>) {
        self.message = message.into();
        self.message_level = MessageLevel::classify(&self.message);
    }

    /// Clears the status message
    pub fn clear_message(&mut self) {
        self.set_message(String::new());
    }
}

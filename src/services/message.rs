//! Channel-agnostic message model shared by announcements, reminder
//! responses and command responses. Rendering to the Slack wire shape lives in
//! [`crate::services::slack`].

/// Attachment colour for launch announcements.
pub const ANNOUNCEMENT_COLOR: &str = "#005883";
/// Attachment colour for the grant-access prompt.
pub const PROMPT_COLOR: &str = "#800000";
pub const VERIFICATION_ERROR_TEXT: &str = "API Verification error";

/// Attachment colour for command usage errors.
pub const ERROR_COLOR: &str = "#a94442";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageAction {
    /// Button posted back to the interactive endpoint with `value`.
    Callback {
        name: String,
        text: String,
        value: String,
    },
    /// Button that opens a URL.
    Link {
        text: String,
        fallback: Option<String>,
        url: String,
    },
}

/// A block of actions plus optional title/text, rendered as one attachment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionBlock {
    pub callback_id: Option<String>,
    pub title: Option<String>,
    pub text: Option<String>,
    pub fallback: Option<String>,
    pub color: Option<String>,
    pub actions: Vec<MessageAction>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnnouncementMessage {
    pub text: String,
    pub attachment: Option<ActionBlock>,
    /// Image URLs appended after the text.
    pub images: Vec<String>,
    /// Only visible to the user who triggered the response.
    pub ephemeral: bool,
    /// `Some(false)` keeps the message the user acted on.
    pub replace_original: Option<bool>,
}

/// Messages sent back in answer to a command or action.
pub type ResponseMessage = AnnouncementMessage;

impl AnnouncementMessage {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    /// The empty acknowledgement.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn ephemeral(mut self) -> Self {
        self.ephemeral = true;
        self
    }

    pub fn keep_original(mut self) -> Self {
        self.replace_original = Some(false);
        self
    }

    pub fn with_attachment(mut self, attachment: ActionBlock) -> Self {
        self.attachment = Some(attachment);
        self
    }

    pub fn actions(&self) -> &[MessageAction] {
        self.attachment
            .as_ref()
            .map(|a| a.actions.as_slice())
            .unwrap_or(&[])
    }

    /// Ephemeral error shown only to the acting user.
    pub fn failure(text: impl Into<String>) -> Self {
        Self::text(text).ephemeral().keep_original()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
            && self.attachment.is_none()
            && self.images.is_empty()
            && !self.ephemeral
            && self.replace_original.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builders_compose() {
        let msg = AnnouncementMessage::text("hi").ephemeral().keep_original();
        assert!(msg.ephemeral);
        assert_eq!(msg.replace_original, Some(false));
        assert!(msg.actions().is_empty());
        assert!(!msg.is_empty());
        assert!(AnnouncementMessage::empty().is_empty());
    }
}

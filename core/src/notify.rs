//! User-facing presentation collaborator.

use tracing::info;

use crate::envelope::ErrorBody;

/// Turns envelope errors into display text and surfaces server notices.
pub trait Notifier: Send + Sync {
    fn format_error(&self, error: &ErrorBody) -> String {
        default_error_message(error)
    }

    /// Show a server `Message` to the user.
    fn notify(&self, message: &str);
}

/// `"<Message> (<Code>)"`, or `"Error <Code>"` when the server sent no text.
pub fn default_error_message(error: &ErrorBody) -> String {
    if error.message.is_empty() {
        format!("Error {}", error.code)
    } else {
        format!("{} ({})", error.message, error.code)
    }
}

/// Reports notices through `tracing`. Used when the host has no UI to hook in.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, message: &str) {
        info!(notice = message, "server notice");
    }
}

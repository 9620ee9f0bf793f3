//! Error types shared by the backend clients and the dispatcher.

use thiserror::Error;

/// The fixed reply used whenever the text-generation credential is missing.
pub const NOT_CONFIGURED_MESSAGE: &str = "OpenAI API key is not configured, Sir.";

/// Failures talking to one of the assistant's backend endpoints.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum BackendError {
    /// An upstream credential is missing. The message is user-facing.
    #[error("{0}")]
    NotConfigured(String),
    /// The endpoint answered with a non-2xx status.
    #[error("backend returned {status}: {message}")]
    Status { status: u16, message: String },
    /// The request never produced a response.
    #[error("transport error: {0}")]
    Transport(String),
    /// A response arrived but could not be understood.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            BackendError::InvalidResponse(err.to_string())
        } else {
            BackendError::Transport(err.to_string())
        }
    }
}

/// Outcome of a failed dispatch.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DispatchError {
    /// The request was superseded by newer input. Never shown to the user.
    #[error("request was cancelled")]
    Cancelled,
    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl DispatchError {
    /// Text appended to the transcript when a dispatch fails.
    ///
    /// Returns `None` for cancellations, which are discarded silently.
    pub fn transcript_text(&self) -> Option<String> {
        match self {
            DispatchError::Cancelled => None,
            DispatchError::Backend(BackendError::NotConfigured(message)) => Some(message.clone()),
            DispatchError::Backend(err) => Some(format!(
                "I apologize, Sir. I encountered an error processing your request: {}. Please try again with a different approach.",
                err
            )),
        }
    }

    /// Shorter text spoken aloud for the same failure.
    pub fn spoken_text(&self) -> Option<String> {
        match self {
            DispatchError::Cancelled => None,
            DispatchError::Backend(BackendError::NotConfigured(message)) => Some(message.clone()),
            DispatchError::Backend(_) => Some(
                "I apologize, Sir. I encountered a technical error. Please try again.".to_string(),
            ),
        }
    }
}

//! Interruption Controller
//!
//! Holds the two request slots of a session: the request currently being
//! processed and, at most, one paused request. All transitions go through
//! [`Controller::reduce`], which returns the side effects the runtime must
//! perform. The controller itself never performs I/O.
//!
//! Transitions:
//!
//! - IDLE → PROCESSING on a new command.
//! - PROCESSING → IDLE on completion or failure.
//! - PROCESSING → PAUSED + PROCESSING when new input arrives mid-request.
//! - PAUSED → PROCESSING on `resume`/`continue`.
//! - PAUSED → IDLE on `cancel`/`stop`.

use crate::{
    classifier::{self, ControlIntent},
    dispatcher::Reply,
    error::DispatchError,
    transcript::Message,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[cfg(feature = "openapi")]
use utoipa::ToSchema;

pub const NOTHING_TO_RESUME: &str = "There is no paused process to resume, Sir.";
pub const PAUSED_CANCELLED: &str = "Paused process cancelled, Sir.";
pub const PAUSE_SPOKEN: &str = "Process paused, Sir. How may I assist you?";
pub const RESUME_SPOKEN: &str = "Resuming the paused process, Sir.";
pub const RESUME_OFFER_SPOKEN: &str =
    "Sir, would you like me to resume the paused process? Type \"resume\" to continue.";

/// A command whose processing was interrupted and kept for later.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct PausedRequest {
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = Uuid))]
    pub id: Uuid,
    pub command: String,
    pub timestamp: DateTime<Utc>,
}

/// The request currently being processed.
#[derive(Debug, Clone)]
pub struct InFlightRequest {
    pub id: Uuid,
    pub command: String,
    pub token: CancellationToken,
    /// Set when this request interrupted another; on completion the user is
    /// offered to resume the paused one.
    pub offer_resume: bool,
}

/// Inputs accepted by the reducer.
#[derive(Debug)]
pub enum Input {
    /// Raw text from the user.
    Submit(String),
    /// Explicit request to resume the paused command.
    Resume,
    /// Explicit request to discard the paused command.
    DismissPaused,
    /// A dispatch finished, successfully or not.
    Completed {
        request_id: Uuid,
        outcome: Result<Reply, DispatchError>,
    },
}

/// Side effects requested by a transition, to be executed in order.
///
/// Cancelling an in-flight request is not an effect: the controller owns
/// the token and cancels it during the transition, so a late completion is
/// already recognizable as stale when it arrives.
#[derive(Debug)]
pub enum Effect {
    CancelSpeech,
    Dispatch {
        request_id: Uuid,
        command: String,
        token: CancellationToken,
    },
    Append(Message),
    Speak(String),
}

/// Snapshot of both slots, suitable for showing in a UI.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct Status {
    pub processing: bool,
    pub paused: Option<PausedRequest>,
}

#[derive(Debug, Default)]
pub struct Controller {
    in_flight: Option<InFlightRequest>,
    paused: Option<PausedRequest>,
}

impl Controller {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_processing(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn in_flight(&self) -> Option<&InFlightRequest> {
        self.in_flight.as_ref()
    }

    pub fn paused(&self) -> Option<&PausedRequest> {
        self.paused.as_ref()
    }

    pub fn status(&self) -> Status {
        Status {
            processing: self.is_processing(),
            paused: self.paused.clone(),
        }
    }

    /// Applies one input and returns the effects to run.
    pub fn reduce(&mut self, input: Input) -> Vec<Effect> {
        match input {
            Input::Submit(text) => self.submit(text),
            Input::Resume => {
                let mut effects = vec![Effect::CancelSpeech];
                self.resume(&mut effects);
                effects
            }
            Input::DismissPaused => {
                let mut effects = Vec::new();
                self.dismiss(&mut effects);
                effects
            }
            Input::Completed {
                request_id,
                outcome,
            } => self.complete(request_id, outcome),
        }
    }

    fn submit(&mut self, text: String) -> Vec<Effect> {
        let command = text.trim();
        if command.is_empty() {
            return Vec::new();
        }

        // New input always silences the narrator, whatever happens next.
        let mut effects = vec![Effect::CancelSpeech];

        match classifier::control_intent(command) {
            Some(ControlIntent::Resume) => {
                self.resume(&mut effects);
                return effects;
            }
            Some(ControlIntent::Cancel) if self.paused.is_some() => {
                self.dismiss(&mut effects);
                return effects;
            }
            _ => {}
        }

        let offer_resume = self.interrupt(&mut effects);
        self.start(command.to_string(), offer_resume, &mut effects);
        effects
    }

    /// Pauses the in-flight request, if any. Returns whether one was paused.
    fn interrupt(&mut self, effects: &mut Vec<Effect>) -> bool {
        let Some(current) = self.in_flight.take() else {
            return false;
        };
        current.token.cancel();

        if let Some(previous) = &self.paused {
            warn!(
                dropped = %previous.command,
                "Second interruption while paused; replacing the older paused request"
            );
        }
        info!(command = %current.command, "Pausing in-flight request");

        effects.push(Effect::Append(Message::assistant(format!(
            "Process paused, Sir. I've temporarily halted the current task: \"{}\". How may I assist you now?",
            current.command
        ))));
        effects.push(Effect::Speak(PAUSE_SPOKEN.to_string()));

        self.paused = Some(PausedRequest {
            id: current.id,
            command: current.command,
            timestamp: Utc::now(),
        });
        true
    }

    fn start(&mut self, command: String, offer_resume: bool, effects: &mut Vec<Effect>) {
        let request = InFlightRequest {
            id: Uuid::new_v4(),
            command,
            token: CancellationToken::new(),
            offer_resume,
        };
        debug!(request_id = %request.id, "Starting request");

        effects.push(Effect::Append(Message::user(request.command.clone())));
        effects.push(Effect::Dispatch {
            request_id: request.id,
            command: request.command.clone(),
            token: request.token.clone(),
        });
        self.in_flight = Some(request);
    }

    fn resume(&mut self, effects: &mut Vec<Effect>) {
        let Some(paused) = self.paused.take() else {
            effects.push(Effect::Append(Message::assistant(NOTHING_TO_RESUME)));
            effects.push(Effect::Speak(NOTHING_TO_RESUME.to_string()));
            return;
        };
        info!(command = %paused.command, "Resuming paused request");

        // Resuming mid-request swaps the slots: the running request is paused.
        let offer_resume = self.interrupt(effects);

        effects.push(Effect::Append(Message::assistant(format!(
            "Resuming the paused process, Sir: \"{}\"",
            paused.command
        ))));
        effects.push(Effect::Speak(RESUME_SPOKEN.to_string()));
        self.start(paused.command, offer_resume, effects);
    }

    fn dismiss(&mut self, effects: &mut Vec<Effect>) {
        if let Some(paused) = self.paused.take() {
            info!(command = %paused.command, "Discarding paused request");
            effects.push(Effect::Append(Message::assistant(PAUSED_CANCELLED)));
            effects.push(Effect::Speak(PAUSED_CANCELLED.to_string()));
        }
    }

    fn complete(&mut self, request_id: Uuid, outcome: Result<Reply, DispatchError>) -> Vec<Effect> {
        let is_current = self
            .in_flight
            .as_ref()
            .is_some_and(|r| r.id == request_id && !r.token.is_cancelled());
        if !is_current {
            debug!(%request_id, "Discarding completion of a superseded request");
            return Vec::new();
        }
        let Some(request) = self.in_flight.take() else {
            return Vec::new();
        };

        let mut effects = Vec::new();
        match outcome {
            Ok(reply) => {
                effects.push(Effect::Append(Message::assistant_with(
                    reply.text.clone(),
                    reply.attachments,
                )));
                effects.push(Effect::Speak(reply.text));
            }
            Err(DispatchError::Cancelled) => {
                // The token was not cancelled by us, but the dispatch says so.
                debug!(%request_id, "Request reported cancellation");
                return effects;
            }
            Err(err) => {
                warn!(error = %err, "Request failed");
                if let Some(text) = err.transcript_text() {
                    effects.push(Effect::Append(Message::assistant(text)));
                }
                if let Some(spoken) = err.spoken_text() {
                    effects.push(Effect::Speak(spoken));
                }
            }
        }

        if request.offer_resume {
            if let Some(paused) = &self.paused {
                effects.push(Effect::Append(Message::assistant(format!(
                    "Sir, I've completed your request. Would you like me to resume the paused process: \"{}\"? Type \"resume\" or \"continue\" to proceed.",
                    paused.command
                ))));
                effects.push(Effect::Speak(RESUME_OFFER_SPOKEN.to_string()));
            }
        }
        effects
    }
}

//! Assistant runtime
//!
//! Wires the [`Controller`] to the outside world: it runs dispatches on
//! tokio, feeds their completions back into the reducer, keeps the
//! transcript, and drives the narrator. Front ends observe the session
//! through [`AssistantEvent`]s.

use crate::{
    controller::{Controller, Effect, Input, Status},
    dispatcher::{Dispatcher, Reply},
    error::DispatchError,
    narrator::Narrator,
    transcript::{Message, Transcript},
    wire::UserLocation,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};
use uuid::Uuid;

/// What a front end needs to render the session.
#[derive(Debug, Clone, PartialEq)]
pub enum AssistantEvent {
    Message(Message),
    Status(Status),
}

#[derive(Debug)]
struct Completion {
    request_id: Uuid,
    outcome: Result<Reply, DispatchError>,
}

pub struct Assistant {
    controller: Controller,
    transcript: Transcript,
    narrator: Narrator,
    dispatcher: Arc<Dispatcher>,
    location: Option<UserLocation>,
    completion_tx: mpsc::UnboundedSender<Completion>,
    completion_rx: mpsc::UnboundedReceiver<Completion>,
    events: mpsc::UnboundedSender<AssistantEvent>,
}

impl Assistant {
    pub fn new(
        dispatcher: Arc<Dispatcher>,
        narrator: Narrator,
        events: mpsc::UnboundedSender<AssistantEvent>,
    ) -> Self {
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();
        Self {
            controller: Controller::new(),
            transcript: Transcript::new(),
            narrator,
            dispatcher,
            location: None,
            completion_tx,
            completion_rx,
            events,
        }
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn status(&self) -> Status {
        self.controller.status()
    }

    pub fn is_speaking(&self) -> bool {
        self.narrator.is_speaking()
    }

    /// Location forwarded to weather lookups for subsequent requests.
    pub fn set_location(&mut self, location: Option<UserLocation>) {
        self.location = location;
    }

    pub async fn submit(&mut self, text: &str) {
        self.handle(Input::Submit(text.to_string())).await;
    }

    /// Waits for the next dispatch to finish and returns it as an input.
    ///
    /// Pending forever while nothing is in flight, so it can sit in a
    /// `select!` next to the front end's own input source.
    pub async fn next_completion(&mut self) -> Input {
        match self.completion_rx.recv().await {
            Some(Completion {
                request_id,
                outcome,
            }) => Input::Completed {
                request_id,
                outcome,
            },
            // We hold a sender ourselves, so the channel never closes.
            None => std::future::pending().await,
        }
    }

    /// Feeds one input through the controller and performs its effects.
    pub async fn handle(&mut self, input: Input) {
        let effects = self.controller.reduce(input);
        if effects.is_empty() {
            return;
        }

        // Several announcements in one transition are read as one utterance,
        // otherwise each would cut off the one before it.
        let mut utterance: Vec<String> = Vec::new();
        for effect in effects {
            match effect {
                Effect::CancelSpeech => self.narrator.cancel().await,
                Effect::Append(message) => {
                    self.transcript.push(message.clone());
                    let _ = self.events.send(AssistantEvent::Message(message));
                }
                Effect::Speak(text) => utterance.push(text),
                Effect::Dispatch {
                    request_id,
                    command,
                    token,
                } => {
                    let dispatcher = self.dispatcher.clone();
                    let location = self.location.clone();
                    let completions = self.completion_tx.clone();
                    debug!(%request_id, "Spawning dispatch");
                    tokio::spawn(async move {
                        let outcome = tokio::select! {
                            _ = token.cancelled() => Err(DispatchError::Cancelled),
                            result = dispatcher.dispatch(&command, location) => result,
                        };
                        if completions
                            .send(Completion {
                                request_id,
                                outcome,
                            })
                            .is_err()
                        {
                            info!(%request_id, "Assistant gone before dispatch finished");
                        }
                    });
                }
            }
        }

        if !utterance.is_empty() {
            self.narrator.speak(&utterance.join(" ")).await;
        }
        let _ = self.events.send(AssistantEvent::Status(self.controller.status()));
    }
}

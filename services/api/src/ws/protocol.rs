//! Defines the WebSocket message protocol between the browser client and the API server.

use jarvis_core::{
    controller::{PausedRequest, Status},
    narrator::VoiceProfile,
    transcript,
    wire::UserLocation,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Messages sent from the client (browser) to the server.
#[derive(Deserialize, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Typed or transcribed user input.
    Submit { text: String },
    /// The "resume" button on the paused-process panel.
    ResumePaused,
    /// The "dismiss" button on the paused-process panel.
    DismissPaused,
    /// The browser's geolocation, used for "weather outside" questions.
    SetLocation {
        latitude: f64,
        longitude: f64,
        #[serde(default)]
        city: Option<String>,
        #[serde(default)]
        country: Option<String>,
    },
    /// The browser finished reading the `speak` message with this `id` aloud.
    SpeechFinished { id: Uuid },
}

impl ClientMessage {
    /// The location carried by a `set_location` message.
    pub fn location(&self) -> Option<UserLocation> {
        match self {
            ClientMessage::SetLocation {
                latitude,
                longitude,
                city,
                country,
            } => Some(UserLocation {
                latitude: *latitude,
                longitude: *longitude,
                city: city.clone(),
                country: country.clone(),
            }),
            _ => None,
        }
    }
}

/// Messages sent from the server to the client (browser).
#[derive(Serialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Sent once when the connection is ready.
    Initialized { session_id: Uuid },
    /// A new transcript entry.
    Message { message: transcript::Message },
    /// The current request slots.
    Status {
        processing: bool,
        paused: Option<PausedRequest>,
    },
    /// Read `text` aloud; answer with `speech_finished` and the same `id` when done.
    Speak {
        id: Uuid,
        text: String,
        voice: VoiceProfile,
    },
    /// Stop any speech in progress.
    StopSpeaking,
    /// Reports a protocol error to the client.
    Error { message: String },
}

impl From<Status> for ServerMessage {
    fn from(status: Status) -> Self {
        ServerMessage::Status {
            processing: status.processing,
            paused: status.paused,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_client_messages_parse() {
        let submit: ClientMessage =
            serde_json::from_value(json!({"type": "submit", "text": "hello"})).unwrap();
        assert_eq!(
            submit,
            ClientMessage::Submit {
                text: "hello".into()
            }
        );

        let resume: ClientMessage =
            serde_json::from_value(json!({"type": "resume_paused"})).unwrap();
        assert_eq!(resume, ClientMessage::ResumePaused);

        let id = Uuid::new_v4();
        let finished: ClientMessage =
            serde_json::from_value(json!({"type": "speech_finished", "id": id})).unwrap();
        assert_eq!(finished, ClientMessage::SpeechFinished { id });

        let location: ClientMessage = serde_json::from_value(
            json!({"type": "set_location", "latitude": 40.7, "longitude": -74.0, "city": "New York"}),
        )
        .unwrap();
        let location = location.location().unwrap();
        assert_eq!(location.city.as_deref(), Some("New York"));
        assert_eq!(location.country, None);
    }

    #[test]
    fn test_unknown_client_message_is_rejected() {
        assert!(serde_json::from_value::<ClientMessage>(json!({"type": "init"})).is_err());
        // Finishes must name the utterance they end.
        assert!(
            serde_json::from_value::<ClientMessage>(json!({"type": "speech_finished"})).is_err()
        );
    }

    #[test]
    fn test_server_messages_are_tagged() {
        let status: ServerMessage = Status {
            processing: true,
            paused: None,
        }
        .into();
        assert_eq!(
            serde_json::to_value(&status).unwrap(),
            json!({"type": "status", "processing": true, "paused": null})
        );

        let speak = ServerMessage::Speak {
            id: Uuid::nil(),
            text: "Good evening, Sir.".into(),
            voice: VoiceProfile::default(),
        };
        let value = serde_json::to_value(&speak).unwrap();
        assert_eq!(value["type"], "speak");
        assert_eq!(value["id"], Uuid::nil().to_string());
        assert_eq!(value["voice"]["language"], "en-GB");

        assert_eq!(
            serde_json::to_value(ServerMessage::StopSpeaking).unwrap(),
            json!({"type": "stop_speaking"})
        );
    }
}

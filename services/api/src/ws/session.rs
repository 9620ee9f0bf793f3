//! Manages the WebSocket connection lifecycle for an assistant session.
//!
//! Each connection runs its own [`Assistant`] against the in-process
//! services. Speech is synthesized in the browser: the narrator's
//! utterances go out as `speak` messages and complete when the client
//! answers with a `speech_finished` carrying the same id.

use super::protocol::{ClientMessage, ServerMessage};
use crate::state::AppState;
use anyhow::Result;
use async_trait::async_trait;
use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures_util::{
    SinkExt, StreamExt,
    stream::{SplitSink, SplitStream},
};
use jarvis_core::{
    assistant::{Assistant, AssistantEvent},
    controller::Input,
    dispatcher::Dispatcher,
    narrator::{Narrator, SpeechSynthesizer, VoiceProfile},
};
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc, watch};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

type SocketSink = Arc<Mutex<SplitSink<WebSocket, Message>>>;

/// Axum handler to upgrade an HTTP connection to a WebSocket.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// Speech played by the connected browser.
struct BrowserSpeech {
    socket_tx: SocketSink,
    /// Id of the most recent utterance the browser reported as finished.
    finished: watch::Sender<Option<Uuid>>,
}

impl BrowserSpeech {
    fn new(socket_tx: SocketSink) -> Self {
        Self {
            socket_tx,
            finished: watch::channel(None).0,
        }
    }

    fn mark_finished(&self, id: Uuid) {
        self.finished.send_replace(Some(id));
    }
}

#[async_trait]
impl SpeechSynthesizer for BrowserSpeech {
    async fn speak(&self, text: &str, voice: &VoiceProfile) -> Result<()> {
        let id = Uuid::new_v4();
        // Subscribe before sending so a fast `speech_finished` is not missed.
        let mut finished = self.finished.subscribe();

        send_msg(
            &mut *self.socket_tx.lock().await,
            ServerMessage::Speak {
                id,
                text: text.to_string(),
                voice: voice.clone(),
            },
        )
        .await?;
        // Finishes for earlier, cancelled utterances do not end this one.
        finished.wait_for(|done| *done == Some(id)).await?;
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        send_msg(&mut *self.socket_tx.lock().await, ServerMessage::StopSpeaking).await
    }
}

/// Main handler for an individual WebSocket connection.
#[instrument(name = "ws_session", skip_all, fields(session_id))]
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let session_id = Uuid::new_v4();
    tracing::Span::current().record("session_id", session_id.to_string());
    info!(
        provider = ?state.config.provider,
        model = %state.config.chat_model,
        "New WebSocket connection."
    );

    let (socket_tx, socket_rx) = socket.split();
    let socket_tx: SocketSink = Arc::new(Mutex::new(socket_tx));

    if send_msg(
        &mut *socket_tx.lock().await,
        ServerMessage::Initialized { session_id },
    )
    .await
    .is_err()
    {
        error!("Failed to send Initialized message to client.");
        return;
    }

    if let Err(e) = run_session(state, socket_tx, socket_rx).await {
        error!(error = ?e, "Assistant session terminated with error.");
    }
    info!("Assistant session finished.");
}

/// The main event loop for an active WebSocket session.
///
/// Multiplexes client messages, finished dispatches and assistant events
/// until the client goes away.
async fn run_session(
    state: Arc<AppState>,
    socket_tx: SocketSink,
    mut socket_rx: SplitStream<WebSocket>,
) -> Result<()> {
    let speech = Arc::new(BrowserSpeech::new(socket_tx.clone()));
    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let dispatcher = Arc::new(Dispatcher::new(state.services.clone()));
    let mut assistant = Assistant::new(dispatcher, Narrator::new(speech.clone()), events_tx);

    send_msg(&mut *socket_tx.lock().await, assistant.status().into()).await?;

    loop {
        tokio::select! {
            msg_result = socket_rx.next() => {
                let ws_msg = match msg_result {
                    Some(Ok(ws_msg)) => ws_msg,
                    Some(Err(e)) => {
                        error!("Error receiving from client WebSocket: {:?}", e);
                        break;
                    }
                    None => break,
                };
                match ws_msg {
                    Message::Text(text) => match serde_json::from_str::<ClientMessage>(&text) {
                        Ok(msg) => handle_client_message(&mut assistant, &speech, msg).await,
                        Err(e) => {
                            warn!(error = %e, "Ignoring malformed client message.");
                            send_msg(
                                &mut *socket_tx.lock().await,
                                ServerMessage::Error { message: format!("Invalid message: {}", e) },
                            )
                            .await?;
                        }
                    },
                    Message::Close(_) => {
                        info!("Client sent close frame. Shutting down session.");
                        break;
                    }
                    Message::Binary(_) => warn!("Ignoring binary message."),
                    Message::Ping(_) | Message::Pong(_) => {}
                }
            },
            input = assistant.next_completion() => assistant.handle(input).await,
            Some(event) = events_rx.recv() => {
                let msg = match event {
                    AssistantEvent::Message(message) => ServerMessage::Message { message },
                    AssistantEvent::Status(status) => status.into(),
                };
                send_msg(&mut *socket_tx.lock().await, msg).await?;
            },
        }
    }

    info!(
        messages = assistant.transcript().len(),
        "WebSocket connection closed."
    );
    Ok(())
}

async fn handle_client_message(
    assistant: &mut Assistant,
    speech: &BrowserSpeech,
    msg: ClientMessage,
) {
    debug!(?msg, "Client message");
    match msg {
        ClientMessage::Submit { text } => assistant.submit(&text).await,
        ClientMessage::ResumePaused => assistant.handle(Input::Resume).await,
        ClientMessage::DismissPaused => assistant.handle(Input::DismissPaused).await,
        ClientMessage::SetLocation { .. } => {
            let location = msg.location();
            info!(?location, "Client location updated");
            assistant.set_location(location);
        }
        ClientMessage::SpeechFinished { id } => speech.mark_finished(id),
    }
}

/// A helper function to serialize and send a `ServerMessage` to the client.
pub(crate) async fn send_msg(
    socket_tx: &mut SplitSink<WebSocket, Message>,
    msg: ServerMessage,
) -> Result<()> {
    let serialized = serde_json::to_string(&msg)?;
    socket_tx.send(Message::Text(serialized.into())).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::{
        router::create_router,
        services::tests::{EchoGenerator, services, test_config},
        state::AppState,
        upstream::stub,
    };
    use futures_util::{SinkExt, StreamExt};
    use jarvis_core::controller::{PAUSE_SPOKEN, PAUSED_CANCELLED, RESUME_SPOKEN};
    use serde_json::{Value, json};
    use std::{sync::Arc, time::Duration};
    use tokio::net::TcpStream;
    use tokio_tungstenite::{
        MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message as Frame,
    };
    use uuid::Uuid;

    type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

    /// Opens a session against a server whose chat never finishes stories.
    async fn connect() -> Client {
        let app = create_router(Arc::new(AppState {
            services: Arc::new(services(Some(Arc::new(EchoGenerator)))),
            config: Arc::new(test_config()),
        }));
        let base = stub::serve(app).await;
        let url = format!("{}/ws", base.replacen("http", "ws", 1));
        let (client, _) = connect_async(url).await.unwrap();
        client
    }

    async fn send(client: &mut Client, msg: Value) {
        client.send(Frame::Text(msg.to_string())).await.unwrap();
    }

    fn find<'a>(frames: &'a [Value], kind: &str) -> Option<&'a Value> {
        frames.iter().find(|f| f["type"] == kind)
    }

    fn kinds(frames: &[Value]) -> Vec<&str> {
        frames.iter().filter_map(|f| f["type"].as_str()).collect()
    }

    /// Reads server frames until `done` holds for everything read so far.
    async fn read_until(client: &mut Client, done: impl Fn(&[Value]) -> bool) -> Vec<Value> {
        let mut frames = Vec::new();
        while !done(&frames) {
            let frame = tokio::time::timeout(Duration::from_secs(5), client.next())
                .await
                .expect("server went quiet")
                .expect("connection closed")
                .unwrap();
            if let Frame::Text(text) = frame {
                frames.push(serde_json::from_str(&text).unwrap());
            }
        }
        frames
    }

    fn status_and_speak(frames: &[Value]) -> bool {
        find(frames, "status").is_some() && find(frames, "speak").is_some()
    }

    #[tokio::test]
    async fn test_session_greets_with_status() {
        let mut client = connect().await;
        let frames = read_until(&mut client, |f| find(f, "status").is_some()).await;
        assert_eq!(kinds(&frames), vec!["initialized", "status"]);
        assert_eq!(frames[1]["processing"], false);
        assert!(frames[1]["paused"].is_null());
    }

    #[tokio::test]
    async fn test_malformed_message_is_reported() {
        let mut client = connect().await;
        read_until(&mut client, |f| find(f, "status").is_some()).await;

        send(&mut client, json!({"type": "launch_missiles"})).await;
        let frames = read_until(&mut client, |f| find(f, "error").is_some()).await;
        let error = find(&frames, "error").unwrap();
        assert!(error["message"].as_str().unwrap().starts_with("Invalid message"));
    }

    #[tokio::test]
    async fn test_interrupt_resume_and_dismiss() {
        let mut client = connect().await;
        read_until(&mut client, |f| find(f, "status").is_some()).await;

        send(&mut client, json!({"type": "submit", "text": "tell me a story"})).await;
        let frames = read_until(&mut client, |f| find(f, "status").is_some()).await;
        let status = find(&frames, "status").unwrap();
        assert_eq!(status["processing"], true);
        assert!(status["paused"].is_null());
        assert_eq!(find(&frames, "message").unwrap()["message"]["role"], "user");

        // A second command while the first is running pauses the first.
        send(&mut client, json!({"type": "submit", "text": "tell me another story"})).await;
        let frames = read_until(&mut client, status_and_speak).await;
        let status = find(&frames, "status").unwrap();
        assert_eq!(status["processing"], true);
        assert_eq!(status["paused"]["command"], "tell me a story");
        let pause = find(&frames, "speak").unwrap();
        assert_eq!(pause["text"], PAUSE_SPOKEN);
        assert_eq!(pause["voice"]["language"], "en-GB");

        // A finish for some other utterance leaves the announcement playing,
        // so resuming has to silence it first.
        send(
            &mut client,
            json!({"type": "speech_finished", "id": Uuid::new_v4()}),
        )
        .await;
        send(&mut client, json!({"type": "resume_paused"})).await;
        let frames = read_until(&mut client, status_and_speak).await;
        let kinds = kinds(&frames);
        let stop = kinds.iter().position(|k| *k == "stop_speaking");
        let speak = kinds.iter().position(|k| *k == "speak");
        assert!(stop.is_some(), "expected stop_speaking in {:?}", kinds);
        assert!(stop < speak);
        let resumed = find(&frames, "speak").unwrap();
        assert!(resumed["text"].as_str().unwrap().ends_with(RESUME_SPOKEN));
        let status = find(&frames, "status").unwrap();
        assert_eq!(status["processing"], true);
        assert_eq!(status["paused"]["command"], "tell me another story");

        send(
            &mut client,
            json!({"type": "speech_finished", "id": resumed["id"]}),
        )
        .await;
        send(&mut client, json!({"type": "dismiss_paused"})).await;
        let frames = read_until(&mut client, status_and_speak).await;
        assert_eq!(find(&frames, "speak").unwrap()["text"], PAUSED_CANCELLED);
        let status = find(&frames, "status").unwrap();
        assert_eq!(status["processing"], true);
        assert!(status["paused"].is_null());
    }
}

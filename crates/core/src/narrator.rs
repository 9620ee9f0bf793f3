//! Speech Narration
//!
//! The narrator reads replies aloud through a [`SpeechSynthesizer`]. Only one
//! utterance plays at a time: starting a new one, or calling
//! [`Narrator::cancel`], stops the current one instead of queueing.

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicU64, Ordering},
};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Fixed voice settings for every utterance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VoiceProfile {
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
    /// BCP-47 tag of the preferred voice; engines fall back to their default.
    pub language: String,
}

impl Default for VoiceProfile {
    fn default() -> Self {
        Self {
            rate: 0.85,
            pitch: 0.9,
            volume: 0.8,
            language: "en-GB".to_string(),
        }
    }
}

/// An engine that can speak text.
///
/// `speak` should resolve once playback has finished. Dropping the future
/// must be safe; `stop` is called afterwards so the engine can silence any
/// audio it has already handed off.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn speak(&self, text: &str, voice: &VoiceProfile) -> Result<()>;

    async fn stop(&self) -> Result<()> {
        Ok(())
    }
}

struct Playback {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

pub struct Narrator {
    synth: Arc<dyn SpeechSynthesizer>,
    voice: VoiceProfile,
    speaking: Arc<AtomicBool>,
    generation: Arc<AtomicU64>,
    current: Option<Playback>,
}

impl Narrator {
    pub fn new(synth: Arc<dyn SpeechSynthesizer>) -> Self {
        Self::with_voice(synth, VoiceProfile::default())
    }

    pub fn with_voice(synth: Arc<dyn SpeechSynthesizer>, voice: VoiceProfile) -> Self {
        Self {
            synth,
            voice,
            speaking: Arc::new(AtomicBool::new(false)),
            generation: Arc::new(AtomicU64::new(0)),
            current: None,
        }
    }

    pub fn voice(&self) -> &VoiceProfile {
        &self.voice
    }

    pub fn is_speaking(&self) -> bool {
        self.speaking.load(Ordering::SeqCst)
    }

    /// Starts speaking `text`, interrupting anything already playing.
    pub async fn speak(&mut self, text: &str) {
        if text.trim().is_empty() {
            return;
        }
        self.cancel().await;

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let token = CancellationToken::new();
        self.speaking.store(true, Ordering::SeqCst);

        let synth = self.synth.clone();
        let voice = self.voice.clone();
        let speaking = self.speaking.clone();
        let current_generation = self.generation.clone();
        let child = token.clone();
        let text = text.to_string();

        let handle = tokio::spawn(async move {
            tokio::select! {
                _ = child.cancelled() => debug!("Utterance cancelled"),
                result = synth.speak(&text, &voice) => {
                    if let Err(e) = result {
                        warn!(error = ?e, "Speech synthesis failed");
                    }
                }
            }
            // A newer utterance owns the flag once it has started.
            if current_generation.load(Ordering::SeqCst) == generation {
                speaking.store(false, Ordering::SeqCst);
            }
        });

        self.current = Some(Playback { token, handle });
    }

    /// Stops the current utterance, if any.
    pub async fn cancel(&mut self) {
        let Some(playback) = self.current.take() else {
            return;
        };
        if playback.handle.is_finished() {
            return;
        }
        playback.token.cancel();
        let _ = playback.handle.await;
        self.speaking.store(false, Ordering::SeqCst);
        if let Err(e) = self.synth.stop().await {
            warn!(error = ?e, "Failed to stop speech synthesizer");
        }
    }
}

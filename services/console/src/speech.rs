//! Speech engines for the terminal.

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use jarvis_core::narrator::{SpeechSynthesizer, VoiceProfile};
use tokio::process::Command;
use tracing::debug;

/// Speaks by running an external program with the text as its last argument,
/// e.g. `say` on macOS or `espeak` on Linux.
///
/// The child is killed when the utterance is interrupted.
pub struct CommandSpeech {
    program: String,
    args: Vec<String>,
}

impl CommandSpeech {
    /// Parses a whitespace-separated command line such as `espeak -v en-gb`.
    pub fn parse(command_line: &str) -> Option<Self> {
        let mut parts = command_line.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self {
            program,
            args: parts.collect(),
        })
    }
}

#[async_trait]
impl SpeechSynthesizer for CommandSpeech {
    async fn speak(&self, text: &str, _voice: &VoiceProfile) -> Result<()> {
        debug!(program = %self.program, chars = text.len(), "Speaking");
        let status = Command::new(&self.program)
            .args(&self.args)
            .arg(text)
            .kill_on_drop(true)
            .status()
            .await
            .with_context(|| format!("Failed to run '{}'", self.program))?;
        if !status.success() {
            bail!("'{}' exited with {}", self.program, status);
        }
        Ok(())
    }
}

/// Used when no speech command is configured.
pub struct SilentSpeech;

#[async_trait]
impl SpeechSynthesizer for SilentSpeech {
    async fn speak(&self, _text: &str, _voice: &VoiceProfile) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_command_line() {
        let speech = CommandSpeech::parse("espeak -v en-gb").unwrap();
        assert_eq!(speech.program, "espeak");
        assert_eq!(speech.args, vec!["-v", "en-gb"]);

        assert!(CommandSpeech::parse("   ").is_none());
    }

    #[tokio::test]
    async fn test_failing_command_is_an_error() {
        let speech = CommandSpeech::parse("jarvis-no-such-speech-program").unwrap();
        assert!(
            speech
                .speak("hello", &VoiceProfile::default())
                .await
                .is_err()
        );
    }
}

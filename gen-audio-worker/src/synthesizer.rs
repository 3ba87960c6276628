//! Synthesis (§4.5): one segment's prosody markup in, one PCM WAV file
//! out. The `TtsBackend` trait is the same seam the teacher draws in
//! `tts::mod::TtsBackend` (an `async_trait` over the concrete engine) —
//! kept here because the choice of TTS model is explicitly out of scope
//! (§1). The default backend shells out to an external synthesis command,
//! the same "prefer a bootstrapped binary, fall back to PATH" idiom the
//! teacher applies to `ffmpeg` in `audio::assembler`, since the concrete
//! model is itself an external collaborator rather than something this
//! crate embeds.

use std::path::Path;
use std::process::Command;

use async_trait::async_trait;
use gen_audio_core::error::StageError;

#[async_trait]
pub trait TtsBackend: Send + Sync {
    /// Synthesize one segment's markup to a WAV file at the model's
    /// native sample rate. Implementations that do not understand
    /// prosody markup should strip tags and synthesize the plain text
    /// (§4.5: "markup is best-effort").
    async fn synthesize(&self, markup: &str, output_wav_path: &Path) -> Result<(), StageError>;
}

/// Invokes an external command once per segment, matching the
/// per-book-single-threaded constraint (§4.5) by construction: the
/// orchestrating worker task holds exactly one `CommandLineTtsBackend`
/// for the lifetime of one book's segment queue.
pub struct CommandLineTtsBackend {
    command: String,
}

impl CommandLineTtsBackend {
    pub fn new() -> Self {
        let command = std::env::var("TTS_COMMAND").unwrap_or_else(|_| "tts-synth".to_string());
        Self { command }
    }
}

impl Default for CommandLineTtsBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TtsBackend for CommandLineTtsBackend {
    async fn synthesize(&self, markup: &str, output_wav_path: &Path) -> Result<(), StageError> {
        if let Some(parent) = output_wav_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StageError::Store(anyhow::anyhow!("failed to create wav dir: {e}")))?;
        }

        let command = self.command.clone();
        let markup = markup.to_string();
        let output_path = output_wav_path.to_path_buf();

        tokio::task::spawn_blocking(move || run_synthesis(&command, &markup, &output_path))
            .await
            .map_err(|e| StageError::Store(anyhow::anyhow!("synthesis task panicked: {e}")))?
    }
}

fn run_synthesis(command: &str, markup: &str, output_path: &Path) -> Result<(), StageError> {
    use std::io::Write;

    let mut child = Command::new(command)
        .arg("--out")
        .arg(output_path)
        .stdin(std::process::Stdio::piped())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::piped())
        .spawn()
        .map_err(|e| StageError::ExternalTool(format!("failed to spawn {command}: {e}")))?;

    if let Some(stdin) = child.stdin.as_mut() {
        stdin
            .write_all(markup.as_bytes())
            .map_err(|e| StageError::ExternalTool(format!("failed to write markup to {command}: {e}")))?;
    }

    let output = child
        .wait_with_output()
        .map_err(|e| StageError::ExternalTool(format!("failed waiting on {command}: {e}")))?;

    if !output.status.success() {
        return Err(StageError::ExternalTool(format!(
            "{command} exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr)
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_tts_synth_command() {
        unsafe {
            std::env::remove_var("TTS_COMMAND");
        }
        let backend = CommandLineTtsBackend::new();
        assert_eq!(backend.command, "tts-synth");
    }

    #[test]
    fn honors_tts_command_override() {
        unsafe {
            std::env::set_var("TTS_COMMAND", "my-tts");
        }
        let backend = CommandLineTtsBackend::new();
        assert_eq!(backend.command, "my-tts");
        unsafe {
            std::env::remove_var("TTS_COMMAND");
        }
    }
}

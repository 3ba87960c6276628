//! Transcoding (§4.6): slice each segment's WAV file into fixed
//! 3.14-second Opus-in-Ogg chunks (remainder in the last chunk of the
//! book), numbered with a `global_seq` contiguous across the whole book
//! (§9), via `ffmpeg`/`ffprobe` subprocess calls — the same
//! `std::process::Command` invocation the teacher uses in
//! `audio::assembler::{ffmpeg_command, ffprobe_command}`, retargeted from
//! "concatenate to m4b" to "slice to fixed-duration Opus segments".

use std::path::{Path, PathBuf};
use std::process::Command;

use gen_audio_core::error::StageError;

pub struct TranscodedChunk {
    pub global_seq: u32,
    pub duration_ms: u64,
    pub byte_size: u64,
    pub storage_path: PathBuf,
}

pub async fn transcode_book(
    wav_dir: &Path,
    ogg_dir: &Path,
    segment_seconds: f64,
    bitrate_kbps: u32,
) -> Result<Vec<TranscodedChunk>, StageError> {
    let mut wav_files = list_wav_files(wav_dir).await?;
    wav_files.sort();

    if wav_files.is_empty() {
        return Err(StageError::MissingInput(format!("no wav segments found in {}", wav_dir.display())));
    }

    tokio::fs::create_dir_all(ogg_dir)
        .await
        .map_err(|e| StageError::Store(anyhow::anyhow!("failed to create ogg dir: {e}")))?;

    let mut chunks = Vec::new();
    let mut global_seq = 0u32;

    for wav_path in wav_files {
        let duration_secs = probe_duration_secs(&wav_path).await?;
        let mut offset = 0.0;
        while offset < duration_secs {
            let remaining = duration_secs - offset;
            let this_duration = remaining.min(segment_seconds);
            let out_path = ogg_dir.join(format!("{global_seq}.ogg"));

            encode_opus_segment(&wav_path, offset, this_duration, bitrate_kbps, &out_path).await?;

            let byte_size = tokio::fs::metadata(&out_path)
                .await
                .map(|m| m.len())
                .map_err(|e| StageError::Store(anyhow::anyhow!("failed to stat {}: {e}", out_path.display())))?;

            chunks.push(TranscodedChunk {
                global_seq,
                duration_ms: (this_duration * 1000.0) as u64,
                byte_size,
                storage_path: out_path,
            });

            global_seq += 1;
            offset += segment_seconds;
        }
    }

    Ok(chunks)
}

async fn list_wav_files(dir: &Path) -> Result<Vec<PathBuf>, StageError> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| StageError::MissingInput(format!("{}: {e}", dir.display())))?;
    let mut files = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| StageError::Store(anyhow::anyhow!("failed to read dir entry: {e}")))?
    {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) == Some("wav") {
            files.push(path);
        }
    }
    Ok(files)
}

async fn probe_duration_secs(wav_path: &Path) -> Result<f64, StageError> {
    let wav_path = wav_path.to_path_buf();
    tokio::task::spawn_blocking(move || {
        let output = Command::new("ffprobe")
            .args(["-v", "error", "-show_entries", "format=duration", "-of", "default=noprint_wrappers=1:nokey=1"])
            .arg(&wav_path)
            .output()
            .map_err(|e| StageError::ExternalTool(format!("failed to spawn ffprobe: {e}")))?;
        if !output.status.success() {
            return Err(StageError::ExternalTool(format!(
                "ffprobe exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr)
            )));
        }
        String::from_utf8_lossy(&output.stdout)
            .trim()
            .parse::<f64>()
            .map_err(|e| StageError::ExternalTool(format!("could not parse ffprobe duration: {e}")))
    })
    .await
    .map_err(|e| StageError::Store(anyhow::anyhow!("ffprobe task panicked: {e}")))?
}

async fn encode_opus_segment(
    wav_path: &Path,
    offset_secs: f64,
    duration_secs: f64,
    bitrate_kbps: u32,
    out_path: &Path,
) -> Result<(), StageError> {
    let wav_path = wav_path.to_path_buf();
    let out_path = out_path.to_path_buf();
    tokio::task::spawn_blocking(move || {
        let output = Command::new("ffmpeg")
            .args(["-y", "-ss", &offset_secs.to_string(), "-t", &duration_secs.to_string()])
            .arg("-i")
            .arg(&wav_path)
            .args([
                "-c:a",
                "libopus",
                "-b:a",
                &format!("{bitrate_kbps}k"),
                "-application",
                "voip",
                "-frame_duration",
                "20",
                "-compression_level",
                "10",
            ])
            .arg(&out_path)
            .output()
            .map_err(|e| StageError::ExternalTool(format!("failed to spawn ffmpeg: {e}")))?;
        if !output.status.success() {
            return Err(StageError::ExternalTool(format!(
                "ffmpeg exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr)
            )));
        }
        Ok(())
    })
    .await
    .map_err(|e| StageError::Store(anyhow::anyhow!("ffmpeg task panicked: {e}")))?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn errors_when_wav_dir_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let ogg_dir = dir.path().join("ogg");
        let result = transcode_book(dir.path(), &ogg_dir, 3.14, 32).await;
        assert!(matches!(result, Err(StageError::MissingInput(_))));
    }
}

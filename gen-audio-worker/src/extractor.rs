//! Text extraction (§4.3): txt (encoding-detected), epub (content
//! documents), pdf (text layer + OCR fallback). The epub path is a direct
//! generalization of the teacher's `epub.rs` — parse with the `epub`
//! crate, strip markup with `html2text`, then the same HTML-entity/
//! whitespace cleanup — retargeted from "one `Chapter` per TTS job" to
//! "one concatenated text artifact per book".

use std::path::Path;
use std::process::Command;

use encoding_rs::Encoding;
use gen_audio_core::error::StageError;

/// HTML entities the teacher's `epub.rs::clean_text` decodes by hand
/// rather than pulling in a full entity-decoding crate.
const HTML_ENTITIES: &[(&str, &str)] = &[
    ("&nbsp;", " "),
    ("&amp;", "&"),
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&quot;", "\""),
    ("&#39;", "'"),
    ("&mdash;", "--"),
    ("&ndash;", "-"),
    ("&hellip;", "..."),
    ("&rsquo;", "'"),
    ("&lsquo;", "'"),
    ("&rdquo;", "\""),
    ("&ldquo;", "\""),
];

fn decode_entities(text: &str) -> String {
    let mut result = text.to_string();
    for (entity, replacement) in HTML_ENTITIES {
        result = result.replace(entity, replacement);
    }
    result
}

pub async fn extract(source_path: &Path, source_format: &str) -> Result<String, StageError> {
    match source_format {
        "txt" => extract_txt(source_path).await,
        "epub" => extract_epub(source_path).await,
        "pdf" => extract_pdf(source_path).await,
        other => Err(StageError::UnsupportedFormat(other.to_string())),
    }
}

async fn extract_txt(path: &Path) -> Result<String, StageError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| StageError::MissingInput(format!("{}: {e}", path.display())))?;

    if let Some(text) = decode_with_bom(&bytes) {
        return Ok(text);
    }

    let mut detector = chardetng::EncodingDetector::new();
    detector.feed(&bytes, true);
    let encoding = detector.guess(None, true);
    let (text, _, _) = encoding.decode(&bytes);
    Ok(text.into_owned())
}

fn decode_with_bom(bytes: &[u8]) -> Option<String> {
    let (encoding, bom_len) = Encoding::for_bom(bytes)?;
    let (text, _, _) = encoding.decode(&bytes[bom_len..]);
    Some(text.into_owned())
}

async fn extract_epub(path: &Path) -> Result<String, StageError> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || extract_epub_blocking(&path))
        .await
        .map_err(|e| StageError::Store(anyhow::anyhow!("epub extraction task panicked: {e}")))?
}

fn extract_epub_blocking(path: &Path) -> Result<String, StageError> {
    let mut doc = epub::doc::EpubDoc::new(path)
        .map_err(|e| StageError::MissingInput(format!("failed to open epub: {e}")))?;

    let mut sections = Vec::new();
    let spine = doc.spine.clone();
    for spine_item in &spine {
        if let Some((content_bytes, _mime)) = doc.get_resource(&spine_item.idref) {
            let html = String::from_utf8_lossy(&content_bytes).to_string();
            let text = html2text::from_read(html.as_bytes(), 1000);
            let cleaned = decode_entities(&text);
            if !cleaned.trim().is_empty() {
                sections.push(cleaned);
            }
        }
    }

    if sections.is_empty() {
        return Err(StageError::MissingInput("epub had no readable content documents".to_string()));
    }
    Ok(sections.join("\n\n"))
}

async fn extract_pdf(path: &Path) -> Result<String, StageError> {
    let path = path.to_path_buf();
    let text_layer = tokio::task::spawn_blocking({
        let path = path.clone();
        move || pdf_extract::extract_text(&path)
    })
    .await
    .map_err(|e| StageError::Store(anyhow::anyhow!("pdf extraction task panicked: {e}")))?;

    match text_layer {
        Ok(text) if !text.trim().is_empty() => Ok(text),
        _ => extract_pdf_via_ocr(&path).await,
    }
}

/// OCR is an external collaborator (§1): this shells out to `tesseract`
/// the same way the teacher shells out to `ffmpeg`/`ffprobe` in
/// `audio/assembler.rs`, preferring a binary already on `PATH`.
async fn extract_pdf_via_ocr(path: &Path) -> Result<String, StageError> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || run_ocr(&path))
        .await
        .map_err(|e| StageError::Store(anyhow::anyhow!("ocr task panicked: {e}")))?
}

fn run_ocr(path: &Path) -> Result<String, StageError> {
    let output = Command::new("tesseract")
        .arg(path)
        .arg("stdout")
        .arg("pdf")
        .output()
        .map_err(|e| StageError::ExternalTool(format!("failed to spawn tesseract: {e}")))?;

    if !output.status.success() {
        return Err(StageError::ExternalTool(format!(
            "tesseract exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr)
        )));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_common_html_entities() {
        let decoded = decode_entities("Tom &amp; Jerry&rsquo;s &ldquo;Adventure&rdquo;&hellip;");
        assert_eq!(decoded, "Tom & Jerry's \"Adventure\"...");
    }
}

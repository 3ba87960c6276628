//! Prosody markup (§4.4): each packed segment's sentences are wrapped as
//! `<speak><s>...</s><break time="0.3s"/>...</speak>`, an SSML-like
//! envelope the synthesizer's markup-aware backend consumes and falls
//! back to plain text for when unsupported.

const SENTENCE_BREAK: &str = r#"<break time="0.3s"/>"#;

pub fn wrap_segment(sentences: &[String]) -> String {
    let mut body = String::new();
    for (i, sentence) in sentences.iter().enumerate() {
        if i > 0 {
            body.push_str(SENTENCE_BREAK);
        }
        body.push_str("<s>");
        body.push_str(&escape(sentence));
        body.push_str("</s>");
    }
    format!("<speak>{body}</speak>")
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_single_sentence() {
        let markup = wrap_segment(&["Hello world.".to_string()]);
        assert_eq!(markup, "<speak><s>Hello world.</s></speak>");
    }

    #[test]
    fn inserts_break_between_sentences() {
        let markup = wrap_segment(&["One.".to_string(), "Two.".to_string()]);
        assert_eq!(markup, "<speak><s>One.</s><break time=\"0.3s\"/><s>Two.</s></speak>");
    }

    #[test]
    fn escapes_angle_brackets_and_ampersands() {
        let markup = wrap_segment(&["Tom & Jerry <fight>".to_string()]);
        assert!(markup.contains("Tom &amp; Jerry &lt;fight&gt;"));
    }
}

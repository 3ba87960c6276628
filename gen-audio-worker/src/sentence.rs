//! Sentence-boundary detection, generalizing the teacher's
//! `text::seams::split_into_sentences`: prefer the `seams` crate's
//! narrative-aware splitting (dialog/attribution-friendly) when the
//! `seams` binary is on `PATH`, falling back to a punctuation +
//! capitalization heuristic with an abbreviation denylist.

use std::io::Write;
use std::process::{Command, Stdio};

pub fn split_into_sentences(text: &str) -> Vec<String> {
    split_sentences_seams(text).unwrap_or_else(|| split_sentences_regex(text))
}

fn split_sentences_seams(text: &str) -> Option<Vec<String>> {
    if !is_seams_available() {
        return None;
    }
    let mut child = Command::new("seams")
        .arg("--debug-stdin")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .ok()?;

    if let Some(stdin) = child.stdin.as_mut() {
        stdin.write_all(text.as_bytes()).ok()?;
    }
    child.stdin.take();

    let output = child.wait_with_output().ok()?;
    if !output.status.success() {
        return None;
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let sentences: Vec<String> = stdout
        .lines()
        .filter_map(|line| {
            let parts: Vec<&str> = line.split('\t').collect();
            let sentence = parts.get(1)?.trim();
            (!sentence.is_empty()).then(|| sentence.to_string())
        })
        .collect();

    (!sentences.is_empty()).then_some(sentences)
}

fn is_seams_available() -> bool {
    Command::new("seams")
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

const ABBREVIATIONS: &[&str] = &[
    "mr", "mrs", "ms", "dr", "prof", "sr", "jr", "st", "vs", "etc", "inc", "ltd", "co", "corp",
    "jan", "feb", "mar", "apr", "jun", "jul", "aug", "sep", "oct", "nov", "dec", "mon", "tue",
    "wed", "thu", "fri", "sat", "sun", "ave", "blvd", "rd", "dept", "govt", "approx", "est",
    "no", "vol", "rev", "ed", "gen", "col", "lt", "capt", "sgt", "pvt", "fig", "pp", "cf", "ie",
    "eg", "al", "ph",
];

fn split_sentences_regex(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut i = 0;

    while i < len {
        let c = chars[i];
        current.push(c);

        if (c == '.' || c == '!' || c == '?') && is_sentence_end(&chars, i) {
            let sentence = current.trim().to_string();
            if !sentence.is_empty() {
                sentences.push(sentence);
            }
            current = String::new();
            i += 1;
            while i < len && chars[i].is_whitespace() {
                i += 1;
            }
            continue;
        }
        i += 1;
    }

    let tail = current.trim().to_string();
    if !tail.is_empty() {
        sentences.push(tail);
    }
    sentences
}

fn is_sentence_end(chars: &[char], i: usize) -> bool {
    let c = chars[i];
    if c != '.' && c != '!' && c != '?' {
        return false;
    }
    let len = chars.len();
    let mut j = i + 1;
    while j < len && matches!(chars[j], '"' | '\'' | ')' | ']') {
        j += 1;
    }
    if j >= len {
        return true;
    }
    if !chars[j].is_whitespace() {
        return false;
    }
    while j < len && chars[j].is_whitespace() {
        j += 1;
    }
    if j >= len {
        return true;
    }
    let next = chars[j];
    if next.is_uppercase() || matches!(next, '"' | '\'' | '(' | '[') {
        if c == '.' && is_likely_abbreviation(chars, i) {
            return false;
        }
        return true;
    }
    false
}

fn is_likely_abbreviation(chars: &[char], i: usize) -> bool {
    let mut j = i;
    while j > 0 && chars[j - 1].is_alphabetic() {
        j -= 1;
    }
    if j == i {
        return false;
    }
    let word: String = chars[j..i].iter().collect();
    ABBREVIATIONS.contains(&word.to_lowercase().as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_basic_sentences() {
        let sentences = split_sentences_regex("Hello world. How are you? I'm fine!");
        assert_eq!(sentences, vec!["Hello world.", "How are you?", "I'm fine!"]);
    }

    #[test]
    fn keeps_abbreviations_together() {
        let sentences = split_sentences_regex("Dr. Smith went to see Mr. Jones. They talked.");
        assert_eq!(sentences, vec!["Dr. Smith went to see Mr. Jones.", "They talked."]);
    }

    #[test]
    fn single_sentence_with_no_terminal_punctuation() {
        let sentences = split_sentences_regex("no ending punctuation here");
        assert_eq!(sentences, vec!["no ending punctuation here"]);
    }
}

//! Greedy sentence packing to a single character budget (§4.4),
//! generalizing the teacher's `text::chunker::chunk_text` greedy-pack
//! cascade but returning the sentences making up each packed segment
//! (rather than one joined string) so the caller can wrap each sentence
//! in `<s>` markup. A sentence exceeding the budget on its own is kept
//! whole as a single-sentence segment rather than split, so sentence
//! boundaries inside a TTS segment are never broken.
pub fn pack_sentences(sentences: Vec<String>, budget: usize) -> Vec<Vec<String>> {
    let mut segments: Vec<Vec<String>> = Vec::new();
    let mut current: Vec<String> = Vec::new();
    let mut current_len = 0usize;

    for sentence in sentences {
        if sentence.len() > budget {
            if !current.is_empty() {
                segments.push(std::mem::take(&mut current));
                current_len = 0;
            }
            segments.push(vec![sentence]);
            continue;
        }

        if current_len + sentence.len() + 1 <= budget || current.is_empty() {
            current_len += sentence.len() + 1;
            current.push(sentence);
        } else {
            segments.push(std::mem::take(&mut current));
            current_len = sentence.len() + 1;
            current.push(sentence);
        }
    }

    if !current.is_empty() {
        segments.push(current);
    }

    segments
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packs_short_sentences_into_one_segment() {
        let sentences = vec!["One.".to_string(), "Two.".to_string(), "Three.".to_string()];
        let segments = pack_sentences(sentences, 800);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].len(), 3);
    }

    #[test]
    fn starts_new_segment_once_budget_exceeded() {
        let a = "a".repeat(500);
        let b = "b".repeat(500);
        let segments = pack_sentences(vec![a.clone(), b.clone()], 800);
        assert_eq!(segments.len(), 2);
    }

    #[test]
    fn never_emits_a_segment_over_budget_for_normal_sentences() {
        let sentences: Vec<String> = (0..20).map(|i| format!("Sentence number {i} in the text.")).collect();
        let segments = pack_sentences(sentences, 800);
        for segment in &segments {
            let total: usize = segment.iter().map(|s| s.len() + 1).sum();
            assert!(total <= 800 + 50, "segment exceeded budget: {total}");
        }
    }

    #[test]
    fn keeps_an_oversized_sentence_whole() {
        let long = format!("word {}", "x".repeat(2000));
        let segments = pack_sentences(vec![long.clone()], 800);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].len(), 1);
        assert_eq!(segments[0][0], long);
    }

    #[test]
    fn oversized_sentence_gets_its_own_segment_without_disturbing_neighbors() {
        let before = "Short lead-in.".to_string();
        let long = format!("word {}", "x".repeat(2000));
        let after = "Short follow-up.".to_string();
        let segments = pack_sentences(vec![before.clone(), long.clone(), after.clone()], 800);
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0], vec![before]);
        assert_eq!(segments[1], vec![long]);
        assert_eq!(segments[2], vec![after]);
    }
}

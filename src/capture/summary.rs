/// Number of sentences kept as key points.
pub const MAX_KEY_POINTS: usize = 4;

/// Returned when the transcript contains no sentence at all.
pub const NO_SENTENCES_MESSAGE: &str =
    "Could not pick out any key points from the conversation. Please write a summary by hand.";

const SENTENCE_TERMINATORS: &[char] = &['。', '.', '!', '?', '！', '？'];

/// Extractive summary: the first few sentences as a numbered list.
///
/// An empty transcript has no summary at all.
pub fn summarize(transcript: &str) -> Option<String> {
    if transcript.is_empty() {
        return None;
    }

    let points: Vec<String> = transcript
        .split(SENTENCE_TERMINATORS)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .take(MAX_KEY_POINTS)
        .enumerate()
        .map(|(i, s)| format!("{}. {}", i + 1, s))
        .collect();

    if points.is_empty() {
        return Some(NO_SENTENCES_MESSAGE.to_string());
    }
    Some(points.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keeps_first_four() {
        let summary = summarize("One. Two! Three? Four. Five.").unwrap();
        assert_eq!(summary, "1. One\n2. Two\n3. Three\n4. Four");
    }

    #[test]
    fn test_japanese_terminators() {
        let summary = summarize("今日は寒い。毛布が欲しい！ 明日も来る？").unwrap();
        assert_eq!(summary, "1. 今日は寒い\n2. 毛布が欲しい\n3. 明日も来る");
    }

    #[test]
    fn test_trailing_text_without_terminator() {
        assert_eq!(summarize("no punctuation here").unwrap(), "1. no punctuation here");
    }

    #[test]
    fn test_nothing_to_summarize() {
        assert_eq!(summarize(""), None);
        assert_eq!(summarize(" . !? ").unwrap(), NO_SENTENCES_MESSAGE);
    }
}

//! Stop-keyword detection for semantic barge-in during TTS playback.

const STOP_KEYWORDS: &[&str] = &["stop", "pause", "shut up", "cancel", "quiet", "enough", "wait"];

/// True if the lowercased transcript contains any stop keyword as a substring.
pub fn contains_stop_keyword(text: &str) -> bool {
    let lower = text.to_lowercase();
    STOP_KEYWORDS.iter().any(|kw| lower.contains(kw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_stop() {
        assert!(contains_stop_keyword("please STOP talking"));
    }

    #[test]
    fn test_detects_shut_up() {
        assert!(contains_stop_keyword("just shut up now"));
    }

    #[test]
    fn test_ignores_unrelated_speech() {
        assert!(!contains_stop_keyword("tell me more about that"));
    }

    #[test]
    fn test_empty_text() {
        assert!(!contains_stop_keyword(""));
    }
}

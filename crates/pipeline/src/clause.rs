//! Clause-level splitting of streamed LLM text.
//!
//! Finds the earliest clause boundary (`.`, `!`, `?`, or `,` followed by
//! whitespace) in a buffer and slices off the prefix up to and including the
//! boundary. Used to submit speakable fragments to TTS well before the LLM
//! finishes a full sentence.

/// Scans `buffer` for the first clause boundary and, if found, removes and
/// returns the prefix (including the punctuation and the triggering
/// whitespace). Returns `None` if no boundary is present yet.
pub fn split_clause(buffer: &mut String) -> Option<String> {
    let bytes = buffer.as_bytes();
    let mut boundary_end = None;

    for (i, &b) in bytes.iter().enumerate() {
        if matches!(b, b'.' | b'!' | b'?' | b',') {
            if let Some(&next) = bytes.get(i + 1) {
                if next.is_ascii_whitespace() {
                    boundary_end = Some(i + 2);
                    break;
                }
            }
        }
    }

    let end = boundary_end?;
    let clause = buffer[..end].to_string();
    buffer.drain(..end);
    Some(clause)
}

/// A clause qualifies for synthesis once it contains more than this many
/// whitespace-separated tokens; shorter fragments ("Yes,") are held back.
pub fn token_count(text: &str) -> usize {
    text.split_whitespace().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_splits_on_period() {
        let mut buffer = "Hello there. More text".to_string();
        let clause = split_clause(&mut buffer).unwrap();
        assert_eq!(clause, "Hello there. ");
        assert_eq!(buffer, "More text");
    }

    #[test]
    fn test_splits_on_comma() {
        let mut buffer = "Well, actually".to_string();
        let clause = split_clause(&mut buffer).unwrap();
        assert_eq!(clause, "Well, ");
    }

    #[test]
    fn test_no_boundary_returns_none() {
        let mut buffer = "no boundary here".to_string();
        assert!(split_clause(&mut buffer).is_none());
    }

    #[test]
    fn test_finds_earliest_boundary() {
        let mut buffer = "One, two. three".to_string();
        let clause = split_clause(&mut buffer).unwrap();
        assert_eq!(clause, "One, ");
    }

    #[test]
    fn test_token_count() {
        assert_eq!(token_count("Yes,"), 1);
        assert_eq!(token_count("Yes, that is correct,"), 4);
    }

    #[test]
    fn test_punctuation_at_end_of_buffer_is_not_a_boundary_yet() {
        let mut buffer = "Hello there.".to_string();
        assert!(split_clause(&mut buffer).is_none());
    }
}

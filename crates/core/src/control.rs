//! Control-frame schema exchanged over the text side of the framed channel.
//!
//! Every control frame is a UTF-8 JSON object discriminated by `type`. The
//! direction each variant travels is documented on the variant itself; the
//! (de)serializer does not enforce direction, callers do.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlFrame {
    /// C→S: announce stream format.
    Hello { sample_rate: u32, channels: u8 },
    /// C→S: user-initiated barge-in.
    Interrupt,
    /// C→S: informational, client-local wake-word crossing.
    WakeWordDetected,
    /// C→S: inject text bypassing STT.
    TestQuestion { text: String },
    /// S→C: final STT result for one utterance.
    Transcription { text: String },
    /// S→C: next LLM chunk.
    PartialLlmResponse { text: String },
    /// S→C: full assistant response (terminal; elided on interrupt).
    LlmResponse { text: String },
    /// S→C: begin synthesized audio.
    TtsStart,
    /// S→C: end synthesized audio; client should flush any residual buffer.
    TtsStop,
    /// S→C: force immediate playback stop (server-side keyword barge-in).
    PlaybackStop,
}

impl ControlFrame {
    pub fn type_name(&self) -> &'static str {
        match self {
            ControlFrame::Hello { .. } => "hello",
            ControlFrame::Interrupt => "interrupt",
            ControlFrame::WakeWordDetected => "wake_word_detected",
            ControlFrame::TestQuestion { .. } => "test_question",
            ControlFrame::Transcription { .. } => "transcription",
            ControlFrame::PartialLlmResponse { .. } => "partial_llm_response",
            ControlFrame::LlmResponse { .. } => "llm_response",
            ControlFrame::TtsStart => "tts_start",
            ControlFrame::TtsStop => "tts_stop",
            ControlFrame::PlaybackStop => "playback_stop",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hello_round_trips() {
        let frame = ControlFrame::Hello {
            sample_rate: 16000,
            channels: 1,
        };
        let json = serde_json::to_string(&frame).unwrap();
        assert_eq!(json, r#"{"type":"hello","sample_rate":16000,"channels":1}"#);
        let decoded: ControlFrame = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, frame);
    }

    #[test]
    fn test_unit_variant_has_no_extra_fields() {
        let json = serde_json::to_string(&ControlFrame::TtsStop).unwrap();
        assert_eq!(json, r#"{"type":"tts_stop"}"#);
    }

    #[test]
    fn test_type_name() {
        assert_eq!(ControlFrame::Interrupt.type_name(), "interrupt");
        assert_eq!(
            ControlFrame::Transcription { text: "hi".into() }.type_name(),
            "transcription"
        );
    }
}

use bytes::Bytes;
use voice_agent_core::ControlFrame;

/// One item on the egress queue: either a structured control event
/// (serialized to a text frame) or a binary audio payload.
#[derive(Debug, Clone)]
pub enum EgressItem {
    Control(ControlFrame),
    Binary(Bytes),
}

impl EgressItem {
    pub fn control(frame: ControlFrame) -> Self {
        Self::Control(frame)
    }

    pub fn binary(bytes: impl Into<Bytes>) -> Self {
        Self::Binary(bytes.into())
    }

    pub fn is_binary(&self) -> bool {
        matches!(self, Self::Binary(_))
    }
}

//! The WebSocket connection to the voice agent server: binary frames carry
//! PCM audio in both directions, text frames carry `ControlFrame` JSON.

use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use voice_agent_core::ControlFrame;

use crate::error::{ClientError, Result};

pub enum Inbound {
    Control(ControlFrame),
    Audio(Vec<u8>),
}

pub struct Connection {
    outbound: mpsc::UnboundedSender<Message>,
}

impl Connection {
    pub async fn connect(url: &str) -> Result<(Self, mpsc::UnboundedReceiver<Inbound>)> {
        let (ws, _response) = connect_async(url)
            .await
            .map_err(|e| ClientError::Connect(e.to_string()))?;

        let (mut sink, mut stream) = ws.split();
        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel::<Inbound>();

        tokio::spawn(async move {
            while let Some(message) = outbound_rx.recv().await {
                if sink.send(message).await.is_err() {
                    break;
                }
            }
        });

        tokio::spawn(async move {
            while let Some(message) = stream.next().await {
                match message {
                    Ok(Message::Binary(data)) => {
                        if inbound_tx.send(Inbound::Audio(data)).is_err() {
                            break;
                        }
                    },
                    Ok(Message::Text(text)) => match serde_json::from_str::<ControlFrame>(&text) {
                        Ok(frame) => {
                            if inbound_tx.send(Inbound::Control(frame)).is_err() {
                                break;
                            }
                        },
                        Err(e) => tracing::warn!(error = %e, "failed to decode control frame"),
                    },
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {},
                    Err(e) => {
                        tracing::warn!(error = %e, "websocket read error");
                        break;
                    },
                }
            }
        });

        Ok((Self { outbound: outbound_tx }, inbound_rx))
    }

    pub fn send_audio(&self, pcm: Vec<u8>) -> Result<()> {
        self.outbound.send(Message::Binary(pcm)).map_err(|_| ClientError::Closed)
    }

    pub fn send_control(&self, frame: ControlFrame) -> Result<()> {
        let json = serde_json::to_string(&frame)?;
        self.outbound.send(Message::Text(json)).map_err(|_| ClientError::Closed)
    }
}

//! Per-connection task supervisor: three cooperating tasks bound to one
//! WebSocket, torn down together when any one of them exits.
//!
//! - `recv_task` reads frames off the socket: binary audio goes on the
//!   ingress queue (drop-oldest), text frames decode as `ControlFrame` and
//!   are dispatched inline (`hello` updates the declared sample rate,
//!   `interrupt`/`test_question` reach straight into the pipeline).
//! - `process_task` drains the ingress queue through the utterance
//!   segmenter and feeds completed utterances to the pipeline.
//! - `send_task` drains the egress queue and writes it back to the socket,
//!   control frames as JSON text, audio as binary.
//!
//! Any task's exit cancels the other two via a shared `CancellationToken`-
//! like `Notify`, so a half-open socket or a pipeline panic tears the whole
//! connection down instead of leaking tasks.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use axum::extract::ws::{Message as WsMessage, WebSocket};
use futures::{SinkExt, StreamExt};
use tokio::sync::Notify;

use voice_agent_core::{AudioFrame, Channels, ControlFrame, SampleRate};
use voice_agent_segmenter::{EnergyVad, EnergyVadConfig, UtteranceSegmenter};
use voice_agent_transport::{egress_channel, EgressItem, IngressQueue};

use crate::state::AppState;

fn sample_rate_from_hz(hz: u32) -> SampleRate {
    match hz {
        8000 => SampleRate::Hz8000,
        22050 => SampleRate::Hz22050,
        24000 => SampleRate::Hz24000,
        44100 => SampleRate::Hz44100,
        48000 => SampleRate::Hz48000,
        _ => SampleRate::Hz16000,
    }
}

pub async fn handle_connection(socket: WebSocket, state: AppState, session_id: String) {
    let (mut ws_sink, mut ws_stream) = socket.split();

    let ingress: IngressQueue<Vec<u8>> = IngressQueue::new(state.settings.server.ingress_queue_bound);
    let (egress_tx, mut egress_rx) = egress_channel(state.settings.server.egress_queue_bound);

    let pipeline_config = voice_agent_pipeline::PipelineConfig {
        system_preamble: state.settings.llm.system_preamble.clone(),
        max_turn_pairs: state.settings.llm.max_turn_pairs,
        clause_min_tokens: state.settings.tts.clause_min_tokens,
        barge_in_buffer_capacity: state.settings.server.barge_in_buffer_bound,
        input_sample_rate: sample_rate_from_hz(state.settings.audio.input_sample_rate),
        output_channels: Channels::Mono,
    };

    let pipeline = Arc::new(voice_agent_pipeline::VoicePipeline::new(
        session_id.clone(),
        state.stt.clone(),
        state.llm.clone(),
        state.tts.clone(),
        egress_tx.clone(),
        pipeline_config,
    ));

    let vad = Arc::new(EnergyVad::new(EnergyVadConfig::default()));
    let segmenter = Arc::new(tokio::sync::Mutex::new(UtteranceSegmenter::new(
        vad,
        state.settings.segmenter.clone(),
        state.settings.audio.input_sample_rate,
    )));

    let shutdown = Arc::new(Notify::new());
    let declared_sample_rate = Arc::new(AtomicU32::new(state.settings.audio.input_sample_rate));

    let recv_task = {
        let ingress = ingress.clone();
        let pipeline = pipeline.clone();
        let shutdown = shutdown.clone();
        let declared_sample_rate = declared_sample_rate.clone();
        let session_id = session_id.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.notified() => break,
                    frame = ws_stream.next() => {
                        let Some(frame) = frame else { break };
                        match frame {
                            Ok(WsMessage::Binary(data)) => ingress.push(data),
                            Ok(WsMessage::Text(text)) => {
                                match serde_json::from_str::<ControlFrame>(&text) {
                                    Ok(ControlFrame::Hello { sample_rate, .. }) => {
                                        declared_sample_rate.store(sample_rate, Ordering::Release);
                                    },
                                    Ok(ControlFrame::Interrupt) => {
                                        let _ = pipeline.interrupt(voice_agent_pipeline::InterruptReason::Client).await;
                                    },
                                    Ok(ControlFrame::TestQuestion { text }) => {
                                        let pipeline = pipeline.clone();
                                        tokio::spawn(async move {
                                            let _ = pipeline.handle_text(&text).await;
                                        });
                                    },
                                    Ok(ControlFrame::WakeWordDetected) => {
                                        tracing::debug!(session = %session_id, "client wake-word crossing");
                                    },
                                    Ok(_) => {},
                                    Err(e) => tracing::warn!(session = %session_id, error = %e, "failed to decode control frame"),
                                }
                            },
                            Ok(WsMessage::Close(_)) => break,
                            Ok(_) => {},
                            Err(e) => {
                                tracing::warn!(session = %session_id, error = %e, "websocket read error");
                                break;
                            },
                        }
                    }
                }
            }
            shutdown.notify_waiters();
        })
    };

    let process_task = {
        let ingress = ingress.clone();
        let pipeline = pipeline.clone();
        let segmenter = segmenter.clone();
        let shutdown = shutdown.clone();
        let declared_sample_rate = declared_sample_rate.clone();

        tokio::spawn(async move {
            loop {
                let chunk = tokio::select! {
                    _ = shutdown.notified() => break,
                    chunk = ingress.pop() => chunk,
                };

                let rate = sample_rate_from_hz(declared_sample_rate.load(Ordering::Acquire));
                let samples = AudioFrame::from_f32le(&chunk, rate, Channels::Mono, 0).samples;
                let samples: Vec<f32> = samples.iter().copied().collect();

                let utterance = {
                    let mut segmenter = segmenter.lock().await;
                    match segmenter.push(&samples, pipeline.is_tts_active()).await {
                        Ok(result) => result,
                        Err(e) => {
                            tracing::warn!(error = %e, "segmenter error");
                            None
                        },
                    }
                };

                if let Some(utterance) = utterance {
                    let pipeline = pipeline.clone();
                    tokio::spawn(async move {
                        if let Err(e) = pipeline.process_utterance(utterance).await {
                            tracing::warn!(error = %e, "pipeline round failed");
                        }
                    });
                }
            }
            shutdown.notify_waiters();
        })
    };

    let send_task = {
        let shutdown = shutdown.clone();

        tokio::spawn(async move {
            loop {
                let item = tokio::select! {
                    _ = shutdown.notified() => break,
                    item = egress_rx.recv() => item,
                };

                let Some(item) = item else { break };

                let sent = match item {
                    EgressItem::Control(frame) => match serde_json::to_string(&frame) {
                        Ok(json) => ws_sink.send(WsMessage::Text(json)).await,
                        Err(e) => {
                            tracing::warn!(error = %e, "failed to encode control frame");
                            continue;
                        },
                    },
                    EgressItem::Binary(bytes) => ws_sink.send(WsMessage::Binary(bytes.to_vec())).await,
                };

                if sent.is_err() {
                    break;
                }
            }
            let _ = ws_sink.close().await;
            shutdown.notify_waiters();
        })
    };

    let _ = tokio::join!(recv_task, process_task, send_task);
    tracing::info!(session = %session_id, "connection closed");
}

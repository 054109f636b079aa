//! The waterfall orchestrator: one instance per connection, coordinating
//! STT, LLM streaming, and TTS into a single conversational round while
//! juggling barge-in from a continuously-segmenting microphone stream.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::StreamExt;
use parking_lot::Mutex as SyncMutex;
use tokio::sync::{Mutex as AsyncMutex, Notify};

use voice_agent_core::traits::{LanguageModel, Message, SpeechToText, TextToSpeech};
use voice_agent_core::{AudioFrame, Channels, ControlFrame, ConversationHistory, SampleRate, Turn};
use voice_agent_transport::{EgressItem, EgressSender};

use crate::clause::{split_clause, token_count};
use crate::error::{PipelineError, Result};
use crate::keywords::contains_stop_keyword;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptReason {
    /// Explicit `{type: "interrupt"}` control frame from the client.
    Client,
    /// A stop keyword was recognized in speech overlapping TTS playback.
    Keyword,
}

#[derive(Debug, Clone, Default)]
pub struct PipelineMetrics {
    pub rounds_completed: u64,
    pub rounds_interrupted: u64,
    pub llm_retries: u64,
    pub last_time_to_first_audio: Option<Duration>,
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub system_preamble: String,
    pub max_turn_pairs: usize,
    pub clause_min_tokens: usize,
    pub barge_in_buffer_capacity: usize,
    pub input_sample_rate: SampleRate,
    pub output_channels: Channels,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            system_preamble: String::new(),
            max_turn_pairs: 10,
            clause_min_tokens: 3,
            barge_in_buffer_capacity: 8,
            input_sample_rate: SampleRate::Hz16000,
            output_channels: Channels::Mono,
        }
    }
}

pub struct VoicePipeline {
    session_id: String,
    stt: Arc<dyn SpeechToText>,
    llm: Arc<dyn LanguageModel>,
    tts: Arc<dyn TextToSpeech>,
    egress: EgressSender,
    config: PipelineConfig,

    history: AsyncMutex<ConversationHistory>,
    running: AtomicBool,
    tts_active: AtomicBool,
    interrupted: AtomicBool,
    cancel: Notify,
    barge_in_buffer: SyncMutex<VecDeque<Vec<f32>>>,
    metrics: SyncMutex<PipelineMetrics>,
}

impl VoicePipeline {
    pub fn new(
        session_id: impl Into<String>,
        stt: Arc<dyn SpeechToText>,
        llm: Arc<dyn LanguageModel>,
        tts: Arc<dyn TextToSpeech>,
        egress: EgressSender,
        config: PipelineConfig,
    ) -> Self {
        let session_id = session_id.into();
        let history = ConversationHistory::new(session_id.clone(), config.system_preamble.clone())
            .with_max_turn_pairs(config.max_turn_pairs);

        Self {
            session_id,
            stt,
            llm,
            tts,
            egress,
            config,
            history: AsyncMutex::new(history),
            running: AtomicBool::new(false),
            tts_active: AtomicBool::new(false),
            interrupted: AtomicBool::new(false),
            cancel: Notify::new(),
            barge_in_buffer: SyncMutex::new(VecDeque::new()),
            metrics: SyncMutex::new(PipelineMetrics::default()),
        }
    }

    pub fn metrics(&self) -> PipelineMetrics {
        self.metrics.lock().clone()
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// True while this connection's synthesized audio is playing, for the
    /// caller to feed into echo-aware VAD threshold inflation.
    pub fn is_tts_active(&self) -> bool {
        self.tts_active.load(Ordering::Acquire)
    }

    pub async fn history_snapshot(&self) -> ConversationHistory {
        self.history.lock().await.clone()
    }

    pub async fn restore_history(&self, history: ConversationHistory) {
        *self.history.lock().await = history;
    }

    /// Entry point for a segmenter-finalized utterance: float32 PCM at
    /// `config.input_sample_rate`.
    pub async fn process_utterance(&self, utterance: Vec<f32>) -> Result<()> {
        if self.running.swap(true, Ordering::AcqRel) {
            return self.handle_concurrent_utterance(utterance).await;
        }

        let result = self.run_round(utterance).await;
        self.running.store(false, Ordering::Release);
        self.interrupted.store(false, Ordering::Release);

        let queued = self.barge_in_buffer.lock().pop_front();
        if let Some(queued) = queued {
            return Box::pin(self.process_utterance(queued)).await;
        }

        result
    }

    /// `test_question`: inject literal text, bypassing STT entirely.
    pub async fn handle_text(&self, text: &str) -> Result<()> {
        if self.running.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        let result = self.run_round_with_text(text.to_string()).await;
        self.running.store(false, Ordering::Release);
        self.interrupted.store(false, Ordering::Release);
        result
    }

    async fn handle_concurrent_utterance(&self, utterance: Vec<f32>) -> Result<()> {
        if self.tts_active.load(Ordering::Acquire) {
            let frame = AudioFrame::new(
                utterance.clone(),
                self.config.input_sample_rate,
                Channels::Mono,
                0,
            );
            let transcript = self
                .stt
                .transcribe(&frame)
                .await
                .map_err(|e| PipelineError::Stt(e.to_string()))?;

            if contains_stop_keyword(&transcript.text) {
                self.interrupt(InterruptReason::Keyword).await?;
                return Ok(());
            }
        }

        self.enqueue_barge_in(utterance);
        Ok(())
    }

    fn enqueue_barge_in(&self, utterance: Vec<f32>) {
        let mut buffer = self.barge_in_buffer.lock();
        if buffer.len() >= self.config.barge_in_buffer_capacity {
            buffer.pop_front();
        }
        buffer.push_back(utterance);
    }

    /// Cancels the in-flight round, if any, and notifies the client.
    pub async fn interrupt(&self, reason: InterruptReason) -> Result<()> {
        if !self.running.load(Ordering::Acquire) {
            return Ok(());
        }

        self.interrupted.store(true, Ordering::Release);
        self.cancel.notify_waiters();

        if reason == InterruptReason::Keyword {
            self.egress.send(EgressItem::control(ControlFrame::PlaybackStop)).await?;
        }
        self.egress.send(EgressItem::control(ControlFrame::TtsStop)).await?;

        self.metrics.lock().rounds_interrupted += 1;
        Ok(())
    }

    async fn run_round(&self, utterance: Vec<f32>) -> Result<()> {
        let start = Instant::now();
        let frame = AudioFrame::new(utterance, self.config.input_sample_rate, Channels::Mono, 0);

        let transcript = self
            .stt
            .transcribe(&frame)
            .await
            .map_err(|e| PipelineError::Stt(e.to_string()))?;

        if transcript.text.trim().is_empty() {
            return Ok(());
        }

        self.run_round_body(transcript.text, start).await
    }

    async fn run_round_with_text(&self, text: String) -> Result<()> {
        self.run_round_body(text, Instant::now()).await
    }

    async fn run_round_body(&self, user_text: String, start: Instant) -> Result<()> {
        self.egress
            .send(EgressItem::control(ControlFrame::Transcription { text: user_text.clone() }))
            .await?;

        let messages = {
            let mut history = self.history.lock().await;
            history.push(Turn::user(user_text.clone()));
            self.build_messages(&history)
        };

        self.egress.send(EgressItem::control(ControlFrame::TtsStart)).await?;
        self.tts_active.store(true, Ordering::Release);

        let round = self.stream_round(messages, start).await;

        self.tts_active.store(false, Ordering::Release);

        match round {
            Ok(full_response) => {
                if !full_response.is_empty() {
                    let mut history = self.history.lock().await;
                    history.push(Turn::assistant(full_response.clone()));
                }
                self.metrics.lock().rounds_completed += 1;
            },
            Err(e) => {
                tracing::warn!(error = %e, "llm round failed, rolling back pending user turn");
                let mut history = self.history.lock().await;
                history.pop();
            },
        }

        self.egress.send(EgressItem::control(ControlFrame::TtsStop)).await?;
        Ok(())
    }

    fn build_messages(&self, history: &ConversationHistory) -> Vec<Message> {
        let mut messages = vec![Message::system(history.system_preamble.clone())];
        for turn in &history.turns {
            messages.push(match turn.role {
                voice_agent_core::TurnRole::User => Message::user(turn.content.clone()),
                voice_agent_core::TurnRole::Assistant => Message::assistant(turn.content.clone()),
                voice_agent_core::TurnRole::System => Message::system(turn.content.clone()),
            });
        }
        messages
    }

    /// Streams LLM output, splitting into clauses and dispatching each to
    /// TTS as soon as it clears the minimum token threshold. Returns the
    /// full accumulated assistant text on completion, or an error if the
    /// round never produced any content and the LLM itself failed.
    async fn stream_round(&self, messages: Vec<Message>, start: Instant) -> Result<String> {
        let mut stream = self.llm.generate_stream(messages);

        let mut sentence_buffer = String::new();
        let mut full_response = String::new();
        let mut first_audio_sent = false;
        let mut tts_tasks: Vec<tokio::task::JoinHandle<Result<Option<Vec<u8>>>>> = Vec::new();

        loop {
            if self.interrupted.load(Ordering::Acquire) {
                break;
            }

            tokio::select! {
                biased;
                _ = self.cancel.notified() => {
                    break;
                }
                chunk = stream.next() => {
                    match chunk {
                        Some(Ok(chunk)) => {
                            if !chunk.delta.is_empty() {
                                full_response.push_str(&chunk.delta);
                                sentence_buffer.push_str(&chunk.delta);

                                self.egress
                                    .send(EgressItem::control(ControlFrame::PartialLlmResponse {
                                        text: chunk.delta,
                                    }))
                                    .await?;

                                while let Some(clause) = split_clause(&mut sentence_buffer) {
                                    if token_count(&clause) > self.config.clause_min_tokens {
                                        self.spawn_tts_task(&clause, &mut tts_tasks);
                                    }
                                }
                            }
                            if chunk.finish_reason.is_some() {
                                break;
                            }
                        },
                        Some(Err(e)) => return Err(PipelineError::Llm(e.to_string())),
                        None => break,
                    }
                }
            }
        }

        if !self.interrupted.load(Ordering::Acquire) {
            let residue = sentence_buffer.trim();
            if !residue.is_empty() {
                self.spawn_tts_task(residue, &mut tts_tasks);
            }
        }

        if !full_response.is_empty() {
            self.egress
                .send(EgressItem::control(ControlFrame::LlmResponse { text: full_response.clone() }))
                .await?;
        }

        for task in tts_tasks {
            if self.interrupted.load(Ordering::Acquire) {
                task.abort();
                continue;
            }
            match task.await {
                Ok(Ok(Some(pcm))) => {
                    if !first_audio_sent {
                        let ttfa = start.elapsed();
                        self.metrics.lock().last_time_to_first_audio = Some(ttfa);
                        first_audio_sent = true;
                    }
                    self.egress.send(EgressItem::binary(pcm)).await?;
                },
                Ok(Ok(None)) => {},
                Ok(Err(e)) => tracing::warn!(error = %e, "tts clause synthesis failed"),
                Err(e) => tracing::warn!(error = %e, "tts task panicked"),
            }
        }

        Ok(full_response)
    }

    fn spawn_tts_task(
        &self,
        clause: &str,
        tasks: &mut Vec<tokio::task::JoinHandle<Result<Option<Vec<u8>>>>>,
    ) {
        let tts = self.tts.clone();
        let clause = clause.to_string();
        tasks.push(tokio::spawn(async move {
            let audio = tts
                .synthesize(&clause)
                .await
                .map_err(|e| PipelineError::Tts(e.to_string()))?;
            Ok(audio.map(|frame| frame.to_pcm16()))
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use futures::Stream;
    use std::pin::Pin;
    use std::sync::atomic::AtomicU32;
    use voice_agent_core::traits::{FinishReason, StreamChunk, TranscriptFrame};
    use voice_agent_core::{Result as CoreResult, TranscriptResult};

    struct MockStt {
        response: String,
    }

    #[async_trait]
    impl SpeechToText for MockStt {
        async fn transcribe(&self, _audio: &AudioFrame) -> CoreResult<TranscriptFrame> {
            Ok(TranscriptResult::new(self.response.clone(), 0.9))
        }

        fn transcribe_stream<'a>(
            &'a self,
            _audio_stream: Pin<Box<dyn Stream<Item = AudioFrame> + Send + 'a>>,
        ) -> Pin<Box<dyn Stream<Item = CoreResult<TranscriptFrame>> + Send + 'a>> {
            Box::pin(futures::stream::empty())
        }

        fn model_name(&self) -> &str {
            "mock-stt"
        }
    }

    struct MockLlm {
        chunks: Vec<&'static str>,
    }

    #[async_trait]
    impl LanguageModel for MockLlm {
        fn generate_stream<'a>(
            &'a self,
            _messages: Vec<Message>,
        ) -> Pin<Box<dyn Stream<Item = CoreResult<StreamChunk>> + Send + 'a>> {
            let chunks = self.chunks.clone();
            Box::pin(async_stream::stream! {
                let n = chunks.len();
                for (i, chunk) in chunks.into_iter().enumerate() {
                    let finish_reason = if i + 1 == n { Some(FinishReason::Stop) } else { None };
                    yield Ok(StreamChunk { delta: chunk.to_string(), finish_reason });
                }
            })
        }

        async fn is_available(&self) -> bool {
            true
        }

        fn model_name(&self) -> &str {
            "mock-llm"
        }
    }

    struct MockTts {
        calls: AtomicU32,
    }

    #[async_trait]
    impl TextToSpeech for MockTts {
        async fn synthesize(&self, text: &str) -> CoreResult<Option<AudioFrame>> {
            if text.trim().is_empty() {
                return Ok(None);
            }
            self.calls.fetch_add(1, Ordering::Relaxed);
            Ok(Some(AudioFrame::new(vec![0.1; 160], SampleRate::Hz24000, Channels::Mono, 0)))
        }

        fn sample_rate(&self) -> SampleRate {
            SampleRate::Hz24000
        }

        fn name(&self) -> &str {
            "mock-tts"
        }
    }

    fn pipeline_with(stt_response: &str, llm_chunks: Vec<&'static str>) -> (VoicePipeline, voice_agent_transport::EgressReceiver) {
        let (tx, rx) = voice_agent_transport::egress_channel(32);
        let pipeline = VoicePipeline::new(
            "session-1",
            Arc::new(MockStt { response: stt_response.to_string() }),
            Arc::new(MockLlm { chunks: llm_chunks }),
            Arc::new(MockTts { calls: AtomicU32::new(0) }),
            tx,
            PipelineConfig::default(),
        );
        (pipeline, rx)
    }

    #[tokio::test]
    async fn test_empty_transcript_abandons_round() {
        let (pipeline, mut rx) = pipeline_with("", vec!["hello"]);
        pipeline.process_utterance(vec![0.0; 1600]).await.unwrap();
        assert!(rx.try_recv().is_err() || matches!(rx.recv().await, None));
        assert_eq!(pipeline.history_snapshot().await.len(), 0);
    }

    #[tokio::test]
    async fn test_successful_round_grows_history_by_two() {
        let (pipeline, mut rx) = pipeline_with("what time is it", vec!["It is ", "noon."]);
        pipeline.process_utterance(vec![0.0; 1600]).await.unwrap();

        let history = pipeline.history_snapshot().await;
        assert_eq!(history.len(), 2);

        let mut saw_tts_start = false;
        let mut saw_tts_stop = false;
        while let Ok(item) = rx.try_recv() {
            if let EgressItem::Control(ControlFrame::TtsStart) = item {
                saw_tts_start = true;
            }
            if let EgressItem::Control(ControlFrame::TtsStop) = item {
                saw_tts_stop = true;
            }
        }
        assert!(saw_tts_start);
        assert!(saw_tts_stop);
    }

    #[tokio::test]
    async fn test_test_question_bypasses_stt() {
        let (pipeline, mut rx) = pipeline_with("ignored", vec!["answer"]);
        pipeline.handle_text("literal question").await.unwrap();

        let mut saw_transcription = false;
        while let Ok(item) = rx.try_recv() {
            if let EgressItem::Control(ControlFrame::Transcription { text }) = item {
                assert_eq!(text, "literal question");
                saw_transcription = true;
            }
        }
        assert!(saw_transcription);
    }

    #[tokio::test]
    async fn test_barge_in_buffer_processed_after_round() {
        let (pipeline, _rx) = pipeline_with("first", vec!["ok"]);
        pipeline.enqueue_barge_in(vec![0.0; 10]);
        assert_eq!(pipeline.barge_in_buffer.lock().len(), 1);
    }
}

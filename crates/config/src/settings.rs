//! Application settings, layered from defaults, an optional TOML file, and
//! environment variables.

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Runtime environment: selects log format and validation strictness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeEnvironment {
    #[default]
    Development,
    Staging,
    Production,
}

impl RuntimeEnvironment {
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    pub fn is_strict(&self) -> bool {
        matches!(self, Self::Production | Self::Staging)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub environment: RuntimeEnvironment,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub segmenter: SegmenterConfig,
    #[serde(default)]
    pub stt: SttConfig,
    #[serde(default)]
    pub tts: TtsConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub llm_supervisor: LlmSupervisorConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
    /// Optional cloud-fallback API keys; unused by the core pipeline, kept
    /// for forward compatibility with a cloud STT/LLM/TTS boundary.
    #[serde(default)]
    pub cloud_fallback: CloudFallbackConfig,
}

impl Settings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "server.port".to_string(),
                message: "port cannot be 0".to_string(),
            });
        }
        if self.server.ingress_queue_bound == 0 || self.server.egress_queue_bound == 0 {
            return Err(ConfigError::InvalidValue {
                field: "server.{ingress,egress}_queue_bound".to_string(),
                message: "queue bounds must be at least 1".to_string(),
            });
        }
        if self.segmenter.min_utterance_seconds >= self.segmenter.max_utterance_seconds {
            return Err(ConfigError::InvalidValue {
                field: "segmenter.{min,max}_utterance_seconds".to_string(),
                message: "min_utterance_seconds must be less than max_utterance_seconds"
                    .to_string(),
            });
        }
        if !(0.0..=1.0).contains(&self.segmenter.threshold) {
            return Err(ConfigError::InvalidValue {
                field: "segmenter.threshold".to_string(),
                message: format!("must be in [0.0, 1.0], got {}", self.segmenter.threshold),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_ws_path")]
    pub ws_path: String,
    /// Bound of the per-connection audio ingress queue (§4.2: ~200 frames).
    #[serde(default = "default_ingress_queue_bound")]
    pub ingress_queue_bound: usize,
    /// Bound of the per-connection egress queue (~200 items).
    #[serde(default = "default_egress_queue_bound")]
    pub egress_queue_bound: usize,
    /// Bound of the per-connection barge-in buffer.
    #[serde(default = "default_barge_in_buffer_bound")]
    pub barge_in_buffer_bound: usize,
    /// Heartbeat interval in seconds.
    #[serde(default = "default_heartbeat_interval_secs")]
    pub heartbeat_interval_secs: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_ws_path() -> String {
    "/ws/audio".to_string()
}
fn default_ingress_queue_bound() -> usize {
    200
}
fn default_egress_queue_bound() -> usize {
    200
}
fn default_barge_in_buffer_bound() -> usize {
    8
}
fn default_heartbeat_interval_secs() -> u64 {
    30
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            ws_path: default_ws_path(),
            ingress_queue_bound: default_ingress_queue_bound(),
            egress_queue_bound: default_egress_queue_bound(),
            barge_in_buffer_bound: default_barge_in_buffer_bound(),
            heartbeat_interval_secs: default_heartbeat_interval_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Client→server sample rate (Hz).
    #[serde(default = "default_input_sample_rate")]
    pub input_sample_rate: u32,
    /// Server→client sample rate (Hz); 24000 for the neural synth, 22050 for
    /// the subprocess synth.
    #[serde(default = "default_output_sample_rate")]
    pub output_sample_rate: u32,
    /// Client→server frame size in samples (320 = 20ms at 16kHz).
    #[serde(default = "default_frame_samples")]
    pub frame_samples: usize,
}

fn default_input_sample_rate() -> u32 {
    16000
}
fn default_output_sample_rate() -> u32 {
    24000
}
fn default_frame_samples() -> usize {
    320
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            input_sample_rate: default_input_sample_rate(),
            output_sample_rate: default_output_sample_rate(),
            frame_samples: default_frame_samples(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmenterConfig {
    /// Path to the neural VAD model (ONNX). Empty ⇒ energy-threshold fallback.
    #[serde(default)]
    pub vad_model_path: String,
    #[serde(default = "default_vad_threshold")]
    pub threshold: f32,
    #[serde(default = "default_tts_active_multiplier")]
    pub tts_active_multiplier: f32,
    #[serde(default = "default_max_threshold")]
    pub max_threshold: f32,
    #[serde(default = "default_pre_roll_ms")]
    pub pre_roll_ms: u32,
    #[serde(default = "default_silence_ms")]
    pub silence_frames_required_ms: u32,
    #[serde(default = "default_min_utterance_seconds")]
    pub min_utterance_seconds: f32,
    #[serde(default = "default_max_utterance_seconds")]
    pub max_utterance_seconds: f32,
}

fn default_vad_threshold() -> f32 {
    0.5
}
fn default_tts_active_multiplier() -> f32 {
    1.5
}
fn default_max_threshold() -> f32 {
    0.9
}
fn default_pre_roll_ms() -> u32 {
    500
}
fn default_silence_ms() -> u32 {
    320
}
fn default_min_utterance_seconds() -> f32 {
    0.5
}
fn default_max_utterance_seconds() -> f32 {
    12.0
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            vad_model_path: String::new(),
            threshold: default_vad_threshold(),
            tts_active_multiplier: default_tts_active_multiplier(),
            max_threshold: default_max_threshold(),
            pre_roll_ms: default_pre_roll_ms(),
            silence_frames_required_ms: default_silence_ms(),
            min_utterance_seconds: default_min_utterance_seconds(),
            max_utterance_seconds: default_max_utterance_seconds(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SttConfig {
    /// Path to the subprocess transcription executable (e.g. a whisper.cpp
    /// build). Empty disables the subprocess backend.
    #[serde(default)]
    pub executable_path: String,
    #[serde(default)]
    pub model_path: String,
    #[serde(default = "default_stt_device")]
    pub device: String,
    #[serde(default = "default_stt_compute_type")]
    pub compute_type: String,
    #[serde(default = "default_beam_size")]
    pub beam_size: u32,
    #[serde(default = "default_stt_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_stt_timeout_secs() -> u64 {
    30
}

fn default_stt_device() -> String {
    "cpu".to_string()
}
fn default_stt_compute_type() -> String {
    "int8".to_string()
}
fn default_beam_size() -> u32 {
    5
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            executable_path: String::new(),
            model_path: String::new(),
            device: default_stt_device(),
            compute_type: default_stt_compute_type(),
            beam_size: default_beam_size(),
            timeout_secs: default_stt_timeout_secs(),
        }
    }
}

/// TTS provider selection, mirroring the two concrete adapter variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TtsProvider {
    #[default]
    Piper,
    Kokoro,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TtsConfig {
    #[serde(default)]
    pub provider: TtsProvider,
    /// Path to the subprocess synth executable (piper). Empty when
    /// `provider = kokoro`, which runs in-process instead.
    #[serde(default)]
    pub executable_path: String,
    /// Path to the voice/model file (piper .onnx voice, kokoro weights).
    #[serde(default)]
    pub model_path: String,
    #[serde(default = "default_voice")]
    pub voice: String,
    #[serde(default = "default_speed")]
    pub speed: f32,
    /// Minimum whitespace-separated tokens a clause must contain to be
    /// submitted to TTS before the next boundary.
    #[serde(default = "default_clause_min_tokens")]
    pub clause_min_tokens: usize,
    /// Maximum synthesis attempts for the subprocess backend (original call
    /// plus retries).
    #[serde(default = "default_tts_max_retries")]
    pub max_retries: u32,
}

fn default_voice() -> String {
    "default".to_string()
}
fn default_speed() -> f32 {
    1.0
}
fn default_clause_min_tokens() -> usize {
    3
}
fn default_tts_max_retries() -> u32 {
    2
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            provider: TtsProvider::default(),
            executable_path: String::new(),
            model_path: String::new(),
            voice: default_voice(),
            speed: default_speed(),
            clause_min_tokens: default_clause_min_tokens(),
            max_retries: default_tts_max_retries(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_llm_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_system_preamble")]
    pub system_preamble: String,
    #[serde(default = "default_max_turn_pairs")]
    pub max_turn_pairs: usize,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: f32,
    /// Directory for persisted session history, keyed by session id.
    #[serde(default = "default_session_dir")]
    pub session_dir: String,
}

fn default_llm_endpoint() -> String {
    "http://127.0.0.1:8081/v1/chat/completions".to_string()
}
fn default_system_preamble() -> String {
    "You are a helpful voice assistant. Keep responses concise and conversational; \
     avoid markdown formatting since your output is read aloud."
        .to_string()
}
fn default_max_turn_pairs() -> usize {
    10
}
fn default_request_timeout_secs() -> u64 {
    60
}
fn default_max_retries() -> u32 {
    3
}
fn default_retry_delay_secs() -> f32 {
    1.0
}
fn default_session_dir() -> String {
    "sessions".to_string()
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: default_llm_endpoint(),
            system_preamble: default_system_preamble(),
            max_turn_pairs: default_max_turn_pairs(),
            request_timeout_secs: default_request_timeout_secs(),
            max_retries: default_max_retries(),
            retry_delay_secs: default_retry_delay_secs(),
            session_dir: default_session_dir(),
        }
    }
}

/// Parameters for the managed local LLM subprocess (§4.9).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSupervisorConfig {
    #[serde(default)]
    pub executable_path: String,
    #[serde(default)]
    pub model_path: String,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_llm_port")]
    pub port: u16,
    #[serde(default = "default_gpu_layers")]
    pub gpu_layers: u32,
    #[serde(default = "default_context_size")]
    pub context_size: u32,
    #[serde(default = "default_threads")]
    pub threads: u32,
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,
    #[serde(default)]
    pub use_mlock: bool,
    #[serde(default)]
    pub no_mmap: bool,
    #[serde(default = "default_health_check_timeout_secs")]
    pub health_check_timeout_secs: u64,
    #[serde(default = "default_max_restarts")]
    pub max_restarts: u32,
    #[serde(default = "default_restart_window_secs")]
    pub restart_window_secs: u64,
}

fn default_llm_port() -> u16 {
    8081
}
fn default_gpu_layers() -> u32 {
    0
}
fn default_context_size() -> u32 {
    4096
}
fn default_threads() -> u32 {
    4
}
fn default_batch_size() -> u32 {
    512
}
fn default_health_check_timeout_secs() -> u64 {
    5
}
fn default_max_restarts() -> u32 {
    5
}
fn default_restart_window_secs() -> u64 {
    300
}

impl Default for LlmSupervisorConfig {
    fn default() -> Self {
        Self {
            executable_path: String::new(),
            model_path: String::new(),
            host: default_host(),
            port: default_llm_port(),
            gpu_layers: default_gpu_layers(),
            context_size: default_context_size(),
            threads: default_threads(),
            batch_size: default_batch_size(),
            use_mlock: false,
            no_mmap: false,
            health_check_timeout_secs: default_health_check_timeout_secs(),
            max_restarts: default_max_restarts(),
            restart_window_secs: default_restart_window_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_json: bool,
    /// Emit a debug log line at most once per this many frames/events
    /// inside hot per-frame loops.
    #[serde(default = "default_log_rate_limit")]
    pub log_rate_limit_frames: u64,
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,
}

fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_rate_limit() -> u64 {
    50
}
fn default_true() -> bool {
    true
}
fn default_metrics_port() -> u16 {
    9090
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_json: false,
            log_rate_limit_frames: default_log_rate_limit(),
            metrics_enabled: default_true(),
            metrics_port: default_metrics_port(),
        }
    }
}

/// Boundary-only: the cloud-fallback path is not implemented (§9 design
/// notes); these fields exist so the config surface matches §6 without any
/// code path consuming them.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CloudFallbackConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub stt_api_key: Option<String>,
    #[serde(default)]
    pub llm_api_key: Option<String>,
    #[serde(default)]
    pub tts_api_key: Option<String>,
}

/// Load settings, highest priority first: environment variables
/// (`VOICE_AGENT__SECTION__FIELD`), `config/{env}.toml`, `config/default.toml`,
/// then hardcoded defaults.
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    builder = builder.add_source(File::with_name("config/default").required(false));
    if let Some(env_name) = env {
        builder =
            builder.add_source(File::with_name(&format!("config/{}", env_name)).required(false));
    }
    builder = builder.add_source(
        Environment::with_prefix("VOICE_AGENT")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;
    let settings: Settings = config.try_deserialize()?;
    settings.validate()?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_port() {
        let mut settings = Settings::default();
        settings.server.port = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_inverted_utterance_bounds() {
        let mut settings = Settings::default();
        settings.segmenter.min_utterance_seconds = 12.0;
        settings.segmenter.max_utterance_seconds = 0.5;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_production_environment_is_strict() {
        assert!(RuntimeEnvironment::Production.is_strict());
        assert!(!RuntimeEnvironment::Development.is_strict());
    }
}

//! Shared application state, constructed once at startup and cloned into
//! every connection's task set.

use std::sync::Arc;

use voice_agent_config::Settings;
use voice_agent_core::traits::{LanguageModel, SpeechToText, TextToSpeech};
use voice_agent_llm::LlmClient;
use voice_agent_llm_supervisor::LlmSupervisor;
use voice_agent_stt::SubprocessStt;
use voice_agent_tts::create_tts;

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub stt: Arc<dyn SpeechToText>,
    pub llm: Arc<dyn LanguageModel>,
    pub tts: Arc<dyn TextToSpeech>,
    pub llm_supervisor: Arc<LlmSupervisor>,
}

impl AppState {
    pub fn new(settings: Settings) -> anyhow::Result<Self> {
        let stt: Arc<dyn SpeechToText> = Arc::new(SubprocessStt::new(settings.stt.clone()));
        let llm: Arc<dyn LanguageModel> = Arc::new(LlmClient::new(settings.llm.clone())?);
        let tts: Arc<dyn TextToSpeech> = create_tts(&settings.tts)?;
        let llm_supervisor = Arc::new(LlmSupervisor::new(settings.llm_supervisor.clone())?);

        Ok(Self {
            settings: Arc::new(settings),
            stt,
            llm,
            tts,
            llm_supervisor,
        })
    }
}

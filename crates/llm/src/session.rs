//! JSON persistence for conversation history, keyed by session id.
//!
//! Optional: the pipeline orchestrator calls this to survive a reconnect
//! within the same session. A missing file is not an error — it means
//! there is no prior history to resume.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use voice_agent_core::ConversationHistory;

use crate::error::Result;

#[derive(Debug, Serialize, Deserialize)]
struct SessionEnvelope {
    session_id: String,
    history: ConversationHistory,
    saved_at: DateTime<Utc>,
}

fn session_path(dir: &str, session_id: &str) -> PathBuf {
    Path::new(dir).join(format!("{}.json", session_id))
}

pub async fn save_session(dir: &str, session_id: &str, history: &ConversationHistory) -> Result<()> {
    tokio::fs::create_dir_all(dir).await?;

    let envelope = SessionEnvelope {
        session_id: session_id.to_string(),
        history: history.clone(),
        saved_at: Utc::now(),
    };
    let json = serde_json::to_vec_pretty(&envelope)?;
    tokio::fs::write(session_path(dir, session_id), json).await?;
    Ok(())
}

pub async fn load_session(dir: &str, session_id: &str) -> Result<Option<ConversationHistory>> {
    let path = session_path(dir, session_id);
    match tokio::fs::read(&path).await {
        Ok(bytes) => {
            let envelope: SessionEnvelope = serde_json::from_slice(&bytes)?;
            Ok(Some(envelope.history))
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use voice_agent_core::ConversationHistory;

    #[tokio::test]
    async fn test_load_missing_session_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_session(dir.path().to_str().unwrap(), "nonexistent").await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_save_then_load_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let mut history = ConversationHistory::new("session-1", "you are a helpful assistant");
        history.push(voice_agent_core::Turn::user("hello"));
        history.push(voice_agent_core::Turn::assistant("hi there"));

        save_session(dir.path().to_str().unwrap(), "session-1", &history)
            .await
            .unwrap();

        let loaded = load_session(dir.path().to_str().unwrap(), "session-1")
            .await
            .unwrap()
            .expect("session should exist");
        assert_eq!(loaded.len(), 2);
    }
}

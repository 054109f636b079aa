//! Subprocess lifecycle for the local llama.cpp-compatible LLM server.
//!
//! One instance is shared across all connections: the process is started
//! once at startup, health-checked on an interval, and restarted with a
//! capped, time-windowed retry budget if it dies or stops responding.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tokio::sync::Mutex;

use voice_agent_config::LlmSupervisorConfig;

use crate::error::{Result, SupervisorError};

/// llama.cpp split-model naming convention is `<name>-NNNNN-of-MMMMM.gguf`.
/// Returns the full set of expected part paths if `model_path` matches it.
fn split_model_parts(model_path: &Path) -> Option<Vec<PathBuf>> {
    let file_name = model_path.file_name()?.to_str()?;
    let ext = model_path.extension()?.to_str()?;
    let stem = file_name.strip_suffix(&format!(".{ext}"))?;

    let of_idx = stem.find("-of-")?;
    let total_str = &stem[of_idx + 4..];
    let total: usize = total_str.parse().ok()?;
    let before = &stem[..of_idx];
    let dash_idx = before.rfind('-')?;
    let part_str = &before[dash_idx + 1..];
    let part_width = part_str.len();
    let total_width = total_str.len();
    let prefix = &before[..dash_idx];

    let parent = model_path.parent().unwrap_or_else(|| Path::new(""));
    Some(
        (1..=total)
            .map(|i| {
                parent.join(format!(
                    "{prefix}-{i:0part_width$}-of-{total:0total_width$}.{ext}"
                ))
            })
            .collect(),
    )
}

/// Continuously drains a child's stdout/stderr pipe into the tracing log so
/// the OS pipe buffer never fills and blocks the subprocess.
async fn drain_pipe(pipe: impl tokio::io::AsyncRead + Unpin, level: tracing::Level) {
    use tokio::io::{AsyncBufReadExt, BufReader};

    let mut lines = BufReader::new(pipe).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => match level {
                tracing::Level::WARN => tracing::warn!(target: "llm_server", "{line}"),
                _ => tracing::debug!(target: "llm_server", "{line}"),
            },
            _ => break,
        }
    }
}

/// Classifies a failed process's captured stderr into a specific cause so
/// operators don't have to go digging through logs for a missing file.
fn classify_immediate_exit(stderr: &str) -> SupervisorError {
    let lower = stderr.to_lowercase();
    if lower.contains("split") || lower.contains("part") {
        SupervisorError::ImmediateExitSplitFileMissing(stderr.trim().to_string())
    } else if lower.contains("failed to load model")
        || lower.contains("no such file")
        || lower.contains("cannot find")
    {
        SupervisorError::ImmediateExitFileMissing(stderr.trim().to_string())
    } else {
        let trimmed = stderr.trim();
        let snippet = if trimmed.len() > 500 { &trimmed[..500] } else { trimmed };
        SupervisorError::ImmediateExit(snippet.to_string())
    }
}

struct ProcessState {
    child: Option<Child>,
    restart_count: u32,
    last_restart: Option<Instant>,
}

pub struct LlmSupervisor {
    config: LlmSupervisorConfig,
    http: reqwest::Client,
    state: Mutex<ProcessState>,
}

const RESTART_WINDOW_RESET_MARGIN: u32 = 0;

impl LlmSupervisor {
    pub fn new(config: LlmSupervisorConfig) -> Result<Self> {
        Self::validate_installation(&config)?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.health_check_timeout_secs))
            .build()
            .expect("reqwest client build should not fail with only a timeout set");

        Ok(Self {
            config,
            http,
            state: Mutex::new(ProcessState {
                child: None,
                restart_count: 0,
                last_restart: None,
            }),
        })
    }

    fn validate_installation(config: &LlmSupervisorConfig) -> Result<()> {
        if !Path::new(&config.executable_path).exists() {
            return Err(SupervisorError::ExecutableNotFound(
                config.executable_path.clone(),
            ));
        }
        if !Path::new(&config.model_path).exists() {
            return Err(SupervisorError::ModelNotFound(config.model_path.clone()));
        }

        if let Some(parts) = split_model_parts(Path::new(&config.model_path)) {
            for part in &parts {
                if !part.exists() {
                    tracing::warn!(part = %part.display(), "split model part missing");
                }
            }
        }

        Ok(())
    }

    fn build_command(&self) -> Command {
        let mut command = Command::new(&self.config.executable_path);
        command
            .arg("-m")
            .arg(&self.config.model_path)
            .arg("-ngl")
            .arg(self.config.gpu_layers.to_string())
            .arg("-c")
            .arg(self.config.context_size.to_string())
            .arg("--threads")
            .arg(self.config.threads.to_string())
            .arg("--batch-size")
            .arg(self.config.batch_size.to_string())
            .arg("--host")
            .arg(&self.config.host)
            .arg("--port")
            .arg(self.config.port.to_string());

        if self.config.use_mlock {
            command.arg("--mlock");
        }
        if self.config.no_mmap {
            command.arg("--no-mmap");
        }

        command.stdout(Stdio::piped()).stderr(Stdio::piped());

        command
    }

    /// Spawns the process and waits 2s to catch immediate-exit failures
    /// (bad flags, missing shared libraries).
    pub async fn start(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.child.is_some() {
            tracing::warn!("llm server already running");
            return Ok(());
        }

        let model_name = Path::new(&self.config.model_path)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        tracing::info!(model = %model_name, port = self.config.port, gpu_layers = self.config.gpu_layers, "starting llm server");

        let mut child = self.build_command().spawn()?;

        tokio::time::sleep(Duration::from_secs(2)).await;

        if let Some(status) = child.try_wait()? {
            let mut stderr = String::new();
            if let Some(mut pipe) = child.stderr.take() {
                let _ = pipe.read_to_string(&mut stderr).await;
            }
            let err = classify_immediate_exit(&stderr);
            tracing::error!(%status, stderr = %stderr, "llm server exited immediately");
            return Err(err);
        }

        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(drain_pipe(stdout, tracing::Level::DEBUG));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(drain_pipe(stderr, tracing::Level::WARN));
        }

        tracing::info!(pid = child.id(), "llm server process started");
        state.child = Some(child);
        Ok(())
    }

    pub async fn stop(&self) {
        let mut state = self.state.lock().await;
        let Some(mut child) = state.child.take() else {
            return;
        };

        tracing::info!(pid = child.id(), "stopping llm server");
        if let Err(e) = child.start_kill() {
            tracing::warn!(error = %e, "failed to signal llm server process");
        }
        if let Err(e) = child.wait().await {
            tracing::warn!(error = %e, "error waiting for llm server to exit");
        }
    }

    pub async fn is_running(&self) -> bool {
        let mut state = self.state.lock().await;
        match state.child.as_mut() {
            Some(child) => matches!(child.try_wait(), Ok(None)),
            None => false,
        }
    }

    pub async fn health_check(&self) -> bool {
        if !self.is_running().await {
            return false;
        }

        let url = format!("http://{}:{}/health", self.config.host, self.config.port);
        match self.http.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    /// Restarts the process, resetting the restart budget if the last
    /// restart fell outside the configured window.
    pub async fn restart(&self) -> Result<bool> {
        let now = Instant::now();
        {
            let mut state = self.state.lock().await;
            let window = Duration::from_secs(self.config.restart_window_secs);
            if state
                .last_restart
                .map(|t| now.duration_since(t) > window)
                .unwrap_or(true)
            {
                state.restart_count = RESTART_WINDOW_RESET_MARGIN;
            }

            if state.restart_count >= self.config.max_restarts {
                tracing::error!(
                    max_restarts = self.config.max_restarts,
                    "max restart attempts reached, not restarting llm server"
                );
                return Err(SupervisorError::MaxRestartsReached(self.config.max_restarts));
            }

            tracing::warn!(
                attempt = state.restart_count + 1,
                max_attempts = self.config.max_restarts,
                "restarting llm server"
            );
        }

        self.stop().await;
        tokio::time::sleep(Duration::from_secs(2)).await;
        self.start().await?;

        let mut state = self.state.lock().await;
        state.restart_count += 1;
        state.last_restart = Some(now);
        Ok(true)
    }

    /// Ensures the server is healthy, restarting it if necessary.
    pub async fn ensure_running(&self) -> bool {
        if self.health_check().await {
            return true;
        }

        if !self.is_running().await {
            tracing::warn!("llm server not running, attempting restart");
            if self.restart().await.unwrap_or(false) {
                return self.health_check().await;
            }
        }

        false
    }

    /// Background task: polls health on an interval and auto-restarts.
    pub async fn monitor_loop(&self, check_interval: Duration) {
        tracing::info!(interval_secs = check_interval.as_secs(), "llm health monitor started");

        loop {
            tokio::time::sleep(check_interval).await;

            if !self.health_check().await {
                tracing::warn!("llm health check failed");
                self.ensure_running().await;
            } else {
                tracing::debug!("llm health check passed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_validate_installation_fails_for_missing_executable() {
        let config = LlmSupervisorConfig {
            executable_path: "/nonexistent/llama-server".to_string(),
            model_path: "/nonexistent/model.gguf".to_string(),
            ..LlmSupervisorConfig::default()
        };
        let result = LlmSupervisor::new(config);
        assert!(matches!(result, Err(SupervisorError::ExecutableNotFound(_))));
    }

    #[test]
    fn test_split_model_parts_detects_convention() {
        let path = Path::new("/models/llama-00002-of-00005.gguf");
        let parts = split_model_parts(path).unwrap();
        assert_eq!(parts.len(), 5);
        assert_eq!(parts[0], PathBuf::from("/models/llama-00001-of-00005.gguf"));
        assert_eq!(parts[4], PathBuf::from("/models/llama-00005-of-00005.gguf"));
    }

    #[test]
    fn test_split_model_parts_none_for_single_file() {
        let path = Path::new("/models/llama.gguf");
        assert!(split_model_parts(path).is_none());
    }

    #[test]
    fn test_classify_immediate_exit_file_missing() {
        let err = classify_immediate_exit("error: failed to load model 'foo.gguf'");
        assert!(matches!(err, SupervisorError::ImmediateExitFileMissing(_)));
    }

    #[test]
    fn test_classify_immediate_exit_split_missing() {
        let err = classify_immediate_exit("error loading split 2 of 5: no such file");
        assert!(matches!(err, SupervisorError::ImmediateExitSplitFileMissing(_)));
    }

    #[test]
    fn test_classify_immediate_exit_generic_fallback() {
        let err = classify_immediate_exit("segmentation fault");
        assert!(matches!(err, SupervisorError::ImmediateExit(_)));
    }

    #[tokio::test]
    async fn test_is_running_false_before_start() {
        let dir = tempfile::tempdir().unwrap();
        let exe = dir.path().join("llama-server");
        let model = dir.path().join("model.gguf");
        std::fs::write(&exe, b"").unwrap();
        std::fs::write(&model, b"").unwrap();

        let config = LlmSupervisorConfig {
            executable_path: exe.to_string_lossy().into_owned(),
            model_path: model.to_string_lossy().into_owned(),
            ..LlmSupervisorConfig::default()
        };
        let supervisor = LlmSupervisor::new(config).unwrap();
        assert!(!supervisor.is_running().await);
    }
}

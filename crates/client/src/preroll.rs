//! Pre-roll accumulation at capture startup: the first `preroll_duration`
//! of audio is held back and only then flushed downstream in one piece, so
//! microphone warm-up never clips the first spoken syllable.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

pub struct PrerollBuffer {
    target_samples: usize,
    sample_rate: u32,
    buffer: Mutex<Vec<f32>>,
    flushed: std::sync::atomic::AtomicBool,
}

impl PrerollBuffer {
    pub fn new(duration: Duration, sample_rate: u32) -> Self {
        let target_samples = (duration.as_secs_f32() * sample_rate as f32) as usize;
        Self {
            target_samples,
            sample_rate,
            buffer: Mutex::new(Vec::with_capacity(target_samples)),
            flushed: std::sync::atomic::AtomicBool::new(false),
        }
    }

    /// Push one frame; returns the accumulated pre-roll once the target
    /// duration has been reached (only once; subsequent pushes return None).
    pub async fn push(&self, frame: &[f32]) -> Option<Vec<f32>> {
        if self.flushed.load(std::sync::atomic::Ordering::Acquire) {
            return None;
        }
        let mut buffer = self.buffer.lock().await;
        buffer.extend_from_slice(frame);
        if buffer.len() >= self.target_samples {
            self.flushed.store(true, std::sync::atomic::Ordering::Release);
            Some(std::mem::take(&mut *buffer))
        } else {
            None
        }
    }

    pub fn is_flushed(&self) -> bool {
        self.flushed.load(std::sync::atomic::Ordering::Acquire)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Blocks until the pre-roll flushes or `timeout` elapses. Returns
    /// `true` on a clean flush, `false` on timeout (callers should proceed
    /// regardless per the spec's best-effort pre-roll contract).
    pub async fn wait_for_preroll(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while !self.is_flushed() {
            if Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_flushes_once_target_reached() {
        let preroll = PrerollBuffer::new(Duration::from_millis(100), 16_000);
        let frame = vec![0.0f32; 800];
        assert!(preroll.push(&frame).await.is_none());
        let flushed = preroll.push(&frame).await;
        assert!(flushed.is_some());
        assert_eq!(flushed.unwrap().len(), 1600);
    }

    #[tokio::test]
    async fn test_wait_for_preroll_times_out_and_proceeds() {
        let preroll = PrerollBuffer::new(Duration::from_secs(10), 16_000);
        let ok = preroll.wait_for_preroll(Duration::from_millis(20)).await;
        assert!(!ok);
    }
}

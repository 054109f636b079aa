//! Shared `rubato`-based resampling for both capture (mic -> target rate)
//! and playback (synth rate -> device's native output rate).

use rubato::{FftFixedIn, Resampler as _};

pub fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if samples.is_empty() || from_rate == to_rate {
        return samples.to_vec();
    }

    let chunk_size = samples.len().min(1024).max(1);
    let Ok(mut resampler) = FftFixedIn::<f32>::new(from_rate as usize, to_rate as usize, chunk_size, 2, 1) else {
        return samples.to_vec();
    };

    let mut output = Vec::new();
    let mut pos = 0;
    while pos + chunk_size <= samples.len() {
        let chunk = &samples[pos..pos + chunk_size];
        if let Ok(result) = resampler.process(&[chunk], None) {
            if let Some(channel) = result.first() {
                output.extend_from_slice(channel);
            }
        }
        pos += chunk_size;
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resample_noop_when_rates_match() {
        let samples = vec![0.1, 0.2, 0.3];
        assert_eq!(resample(&samples, 16_000, 16_000), samples);
    }

    #[test]
    fn test_resample_changes_length_for_differing_rates() {
        let samples = vec![0.0_f32; 2048];
        let output = resample(&samples, 24_000, 16_000);
        assert!(!output.is_empty());
        assert!(output.len() < samples.len());
    }
}

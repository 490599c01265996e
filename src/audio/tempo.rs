use super::features::SampleBuffer;
use super::spectrum::{FrameParams, Spectrogram};

const MIN_BPM: f32 = 30.0;
const MAX_BPM: f32 = 300.0;
/// Prior centre and width (octaves) for tempo candidates
const PRIOR_BPM: f32 = 120.0;
const PRIOR_OCTAVES: f32 = 1.0;
/// Longest lag examined, in seconds
const MAX_LAG_SECS: f32 = 8.0;

/// Global tempo in BPM, or 0.0 when the onset envelope is flat.
///
/// Only the single best-scoring period is reported; polyrhythmic or
/// ambiguous material still yields one value.
#[allow(dead_code)]
pub fn compute_tempo(buffer: &SampleBuffer, params: FrameParams) -> f32 {
    tempo_from_spectrogram(&Spectrogram::compute(buffer, params))
}

pub fn tempo_from_spectrogram(spec: &Spectrogram) -> f32 {
    estimate_tempo(&onset_strength(spec), spec.frame_rate())
}

/// Mean positive change in log-magnitude between consecutive frames.
pub fn onset_strength(spec: &Spectrogram) -> Vec<f32> {
    let log_frames: Vec<Vec<f32>> = spec
        .frames
        .iter()
        .map(|mags| mags.iter().map(|m| m.ln_1p()).collect())
        .collect();

    let mut envelope = Vec::with_capacity(log_frames.len());
    if let Some(first) = log_frames.first() {
        envelope.push(0.0);
        let mut prev = first;
        for cur in &log_frames[1..] {
            let flux: f32 = cur
                .iter()
                .zip(prev.iter())
                .map(|(c, p)| (c - p).max(0.0))
                .sum();
            envelope.push(flux / cur.len() as f32);
            prev = cur;
        }
    }
    envelope
}

/// Autocorrelation tempo with a log-normal prior around 120 BPM.
pub fn estimate_tempo(envelope: &[f32], frame_rate: f32) -> f32 {
    if !envelope.iter().any(|&v| v > 0.0) {
        return 0.0;
    }

    let min_lag = ((frame_rate * 60.0 / MAX_BPM).ceil() as usize).max(1);
    let max_lag = ((frame_rate * 60.0 / MIN_BPM).floor() as usize)
        .min((frame_rate * MAX_LAG_SECS) as usize)
        .min(envelope.len().saturating_sub(1));
    if min_lag > max_lag {
        log::debug!("Onset envelope too short for tempo ({} frames)", envelope.len());
        return 0.0;
    }

    let energy = autocorrelation(envelope, 0);
    let mut best: Option<(usize, f32)> = None;
    for lag in min_lag..=max_lag {
        let bpm = 60.0 * frame_rate / lag as f32;
        let strength = (1e6 * autocorrelation(envelope, lag) / energy).ln_1p();
        let prior = -0.5 * ((bpm / PRIOR_BPM).log2() / PRIOR_OCTAVES).powi(2);
        let score = strength + prior;
        if best.map_or(true, |(_, s)| score > s) {
            best = Some((lag, score));
        }
    }

    best.map_or(0.0, |(lag, _)| 60.0 * frame_rate / lag as f32)
}

fn autocorrelation(envelope: &[f32], lag: usize) -> f32 {
    envelope
        .iter()
        .zip(envelope[lag..].iter())
        .map(|(a, b)| a * b)
        .sum()
}

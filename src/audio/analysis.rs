use super::chroma::detect_key;
use super::features::{FeatureRecord, SampleBuffer};
use super::spectrum::{centered_frames, FrameParams, Spectrogram};
use super::tempo::tempo_from_spectrogram;

/// Frames quieter than this many dB below the loudest frame are clamped.
const TOP_DB: f32 = 80.0;

/// Run all six extractors over one decoded file.
///
/// Frame RMS and the magnitude spectrogram are computed once and shared;
/// key detection streams its own longer-window STFT.
pub fn analyze(song: String, buffer: &SampleBuffer, params: FrameParams) -> FeatureRecord {
    let rms = frame_rms(buffer, params);
    let spec = Spectrogram::compute(buffer, params);

    let record = FeatureRecord {
        song,
        key: detect_key(buffer, params),
        rmse: mean(&rms),
        dynamic_range: dynamic_range_from_rms(&rms),
        spectral_centroid: centroid_from_spectrogram(&spec),
        spectral_bandwidth: bandwidth_from_spectrogram(&spec),
        tempo: tempo_from_spectrogram(&spec),
    };

    log::debug!(
        "{}: key={}, rmse={:.4}, dr={:.2}dB, centroid={:.1}Hz, bandwidth={:.1}Hz, tempo={:.1} BPM",
        record.song,
        record.key,
        record.rmse,
        record.dynamic_range,
        record.spectral_centroid,
        record.spectral_bandwidth,
        record.tempo
    );

    record
}

pub fn frame_rms(buffer: &SampleBuffer, params: FrameParams) -> Vec<f32> {
    centered_frames(&buffer.samples, params)
        .map(|frame| (frame.iter().map(|s| s * s).sum::<f32>() / frame.len() as f32).sqrt())
        .collect()
}

/// Mean of frame RMS values; 0.0 for an empty buffer.
#[allow(dead_code)]
pub fn compute_rmse(buffer: &SampleBuffer, params: FrameParams) -> f32 {
    mean(&frame_rms(buffer, params))
}

/// Spread between the 90th and 10th percentile of frame loudness in dB.
///
/// Zero-amplitude frames map to -inf and are dropped; when nothing is left the
/// range is 0.0.
#[allow(dead_code)]
pub fn dynamic_range(buffer: &SampleBuffer, params: FrameParams) -> f32 {
    dynamic_range_from_rms(&frame_rms(buffer, params))
}

fn dynamic_range_from_rms(rms: &[f32]) -> f32 {
    let mut db: Vec<f32> = rms
        .iter()
        .map(|r| 20.0 * r.log10())
        .filter(|v| v.is_finite())
        .collect();

    if db.is_empty() {
        return 0.0;
    }

    let loudest = db.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    for v in db.iter_mut() {
        *v = v.max(loudest - TOP_DB);
    }
    db.sort_by(f32::total_cmp);

    percentile(&db, 90.0) - percentile(&db, 10.0)
}

/// Mean over frames of the magnitude-weighted mean frequency.
#[allow(dead_code)]
pub fn compute_spectral_centroid(buffer: &SampleBuffer, params: FrameParams) -> f32 {
    centroid_from_spectrogram(&Spectrogram::compute(buffer, params))
}

pub fn centroid_from_spectrogram(spec: &Spectrogram) -> f32 {
    let centroids: Vec<f32> = spec
        .frames
        .iter()
        .map(|mags| frame_centroid(spec, mags).unwrap_or(0.0))
        .collect();
    mean(&centroids)
}

/// Mean over frames of the magnitude-weighted standard deviation around the
/// frame centroid.
#[allow(dead_code)]
pub fn compute_spectral_bandwidth(buffer: &SampleBuffer, params: FrameParams) -> f32 {
    bandwidth_from_spectrogram(&Spectrogram::compute(buffer, params))
}

pub fn bandwidth_from_spectrogram(spec: &Spectrogram) -> f32 {
    let bandwidths: Vec<f32> = spec
        .frames
        .iter()
        .map(|mags| {
            let Some(centroid) = frame_centroid(spec, mags) else {
                return 0.0;
            };
            let total: f32 = mags.iter().sum();
            let spread: f32 = mags
                .iter()
                .enumerate()
                .map(|(k, &m)| {
                    let d = spec.bin_frequency(k) - centroid;
                    m * d * d
                })
                .sum();
            (spread / total).sqrt()
        })
        .collect();
    mean(&bandwidths)
}

/// `None` for frames with no spectral energy
fn frame_centroid(spec: &Spectrogram, mags: &[f32]) -> Option<f32> {
    let total: f32 = mags.iter().sum();
    if total <= 1e-10 {
        return None;
    }
    let weighted: f32 = mags
        .iter()
        .enumerate()
        .map(|(k, &m)| spec.bin_frequency(k) * m)
        .sum();
    Some(weighted / total)
}

fn mean(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f32>() / values.len() as f32
}

/// Linear interpolation between closest ranks; `sorted` must be ascending
/// and non-empty.
fn percentile(sorted: &[f32], p: f32) -> f32 {
    let rank = p / 100.0 * (sorted.len() - 1) as f32;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f32)
}

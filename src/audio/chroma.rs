//! Chroma energy normalized statistics (CENS) and pitch-class detection.
//!
//! CENS flattens timbre differences by quantising each frame's relative
//! pitch-class energy and smoothing it over roughly two seconds, so the
//! time-averaged profile reflects which pitch class dominates harmonically.
//!
//! The chroma pass runs its own long-window STFT on the shared hop so bass
//! notes resolve: at 2048 points and 22050 Hz bins are 10.8 Hz apart, wider
//! than a semitone below ~180 Hz.

use super::features::{PitchClass, SampleBuffer};
use super::spectrum::{centered_frames, FrameParams, Stft};

/// C1
const MIN_PITCH_HZ: f32 = 32.70;
/// Target bin spacing of the chroma STFT
const CHROMA_BIN_HZ: f32 = 2.7;
/// Width of one semitone relative to its lower note
const SEMITONE_STEP: f32 = 0.059_463_1;
const A4_HZ: f32 = 440.0;
/// MIDI note number of A4
const A4_MIDI: f32 = 69.0;

const QUANT_STEPS: [f32; 4] = [0.4, 0.2, 0.1, 0.05];
const QUANT_WEIGHT: f32 = 0.25;
const SMOOTH_LEN: usize = 41;

/// Dominant pitch class of the whole buffer.
///
/// Ties go to the lowest index, so silence reports `C`.
pub fn detect_key(buffer: &SampleBuffer, params: FrameParams) -> PitchClass {
    let profile = mean_profile(&chroma_cens(buffer, params));
    PitchClass::from_index(argmax(&profile))
}

/// One 12-bin CENS vector per hop.
pub fn chroma_cens(buffer: &SampleBuffer, params: FrameParams) -> Vec<[f32; 12]> {
    let chroma_params = FrameParams {
        frame_size: chroma_frame_size(buffer.sample_rate, params.frame_size),
        hop_size: params.hop_size,
    };
    let bin_hz = buffer.sample_rate as f32 / chroma_params.frame_size as f32;
    // Bins spaced wider than a semitone cannot tell neighbouring classes apart
    let min_hz = MIN_PITCH_HZ.max(bin_hz / SEMITONE_STEP);
    let pitch_of_bin: Vec<Option<usize>> = (0..chroma_params.frame_size / 2 + 1)
        .map(|k| pitch_class_of(k as f32 * bin_hz, min_hz))
        .collect();

    let stft = Stft::new(chroma_params.frame_size);
    let quantised: Vec<[f32; 12]> = centered_frames(&buffer.samples, chroma_params)
        .map(|frame| {
            let mut chroma = [0.0f32; 12];
            for (mag, pitch) in stft.magnitudes(&frame).iter().zip(pitch_of_bin.iter()) {
                if let Some(pc) = pitch {
                    chroma[*pc] += mag * mag;
                }
            }
            quantise(chroma)
        })
        .collect();

    log::debug!(
        "Chroma: {} frames at {} points, pitch bins from {:.1} Hz",
        quantised.len(),
        chroma_params.frame_size,
        min_hz
    );

    smooth(&quantised)
}

/// Power of two giving at most ~`CHROMA_BIN_HZ` spacing, never shorter than
/// the shared frame.
fn chroma_frame_size(sample_rate: u32, frame_size: usize) -> usize {
    ((sample_rate as f32 / CHROMA_BIN_HZ) as usize)
        .next_power_of_two()
        .max(frame_size)
}

/// Nearest equal-tempered pitch class, `None` below `min_hz`.
fn pitch_class_of(freq: f32, min_hz: f32) -> Option<usize> {
    if freq < min_hz {
        return None;
    }
    let midi = A4_MIDI + 12.0 * (freq / A4_HZ).log2();
    Some((midi.round() as i64).rem_euclid(12) as usize)
}

/// L1-normalise then map each share onto 0, 0.25, .., 1.0.
fn quantise(chroma: [f32; 12]) -> [f32; 12] {
    let total: f32 = chroma.iter().sum();
    if total <= 1e-10 {
        return [0.0; 12];
    }
    chroma.map(|energy| {
        let share = energy / total;
        QUANT_STEPS
            .iter()
            .filter(|&&step| share > step)
            .count() as f32
            * QUANT_WEIGHT
    })
}

/// Hann-weighted moving average over time, then per-frame L2 normalisation.
fn smooth(frames: &[[f32; 12]]) -> Vec<[f32; 12]> {
    let window: Vec<f32> = (1..=SMOOTH_LEN)
        .map(|i| {
            0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / (SMOOTH_LEN + 1) as f32).cos())
        })
        .collect();
    let window_sum: f32 = window.iter().sum();
    let half = SMOOTH_LEN / 2;

    (0..frames.len())
        .map(|t| {
            let mut out = [0.0f32; 12];
            for (j, w) in window.iter().enumerate() {
                let Some(src) = (t + j).checked_sub(half) else {
                    continue;
                };
                let Some(frame) = frames.get(src) else {
                    break;
                };
                for (o, v) in out.iter_mut().zip(frame.iter()) {
                    *o += w / window_sum * v;
                }
            }
            let norm = out.iter().map(|v| v * v).sum::<f32>().sqrt();
            if norm > 1e-10 {
                for o in out.iter_mut() {
                    *o /= norm;
                }
            }
            out
        })
        .collect()
}

fn mean_profile(frames: &[[f32; 12]]) -> [f32; 12] {
    let mut profile = [0.0f32; 12];
    if frames.is_empty() {
        return profile;
    }
    for frame in frames {
        for (p, v) in profile.iter_mut().zip(frame.iter()) {
            *p += v;
        }
    }
    profile.map(|p| p / frames.len() as f32)
}

/// First index of the maximum.
fn argmax(values: &[f32]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate() {
        if v > values[best] {
            best = i;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: u32 = 22050;

    fn tone(freqs: &[f32], seconds: f32) -> SampleBuffer {
        let n = (SR as f32 * seconds) as usize;
        SampleBuffer {
            samples: (0..n)
                .map(|i| {
                    freqs
                        .iter()
                        .map(|f| (2.0 * std::f32::consts::PI * f * i as f32 / SR as f32).sin())
                        .sum::<f32>()
                        / freqs.len() as f32
                })
                .collect(),
            sample_rate: SR,
        }
    }

    #[test]
    fn a440_is_a() {
        assert_eq!(detect_key(&tone(&[440.0], 1.0), FrameParams::default()), PitchClass::A);
    }

    #[test]
    fn middle_c_is_c() {
        assert_eq!(detect_key(&tone(&[261.63], 1.0), FrameParams::default()), PitchClass::C);
    }

    #[test]
    fn every_note_from_c2_to_b4_maps_to_its_class() {
        let params = FrameParams::default();
        let wrong: Vec<String> = (36..72)
            .filter_map(|midi| {
                let freq = A4_HZ * 2f32.powf((midi as f32 - A4_MIDI) / 12.0);
                let want = PitchClass::from_index(midi % 12);
                let got = detect_key(&tone(&[freq], 1.0), params);
                (got != want)
                    .then(|| format!("midi {} ({:.1} Hz): want {}, got {}", midi, freq, want, got))
            })
            .collect();
        assert!(wrong.is_empty(), "{:?}", wrong);
    }

    #[test]
    fn chroma_frame_resolves_semitones_in_the_bass() {
        assert_eq!(chroma_frame_size(22050, 2048), 8192);
        assert_eq!(chroma_frame_size(44100, 2048), 16384);
        assert_eq!(chroma_frame_size(8000, 4096), 4096);
    }

    #[test]
    fn chroma_keeps_one_frame_per_hop() {
        let buffer = tone(&[220.0], 1.0);
        let params = FrameParams::default();
        assert_eq!(
            chroma_cens(&buffer, params).len(),
            params.frame_count(buffer.samples.len())
        );
    }

    #[test]
    fn octaves_fold_together() {
        // E2 + E3 + E4
        let buffer = tone(&[82.41, 164.81, 329.63], 1.5);
        assert_eq!(detect_key(&buffer, FrameParams::default()), PitchClass::E);
    }

    #[test]
    fn deterministic_for_identical_input() {
        let buffer = tone(&[392.0, 493.88], 1.0);
        let params = FrameParams::default();
        assert_eq!(detect_key(&buffer, params), detect_key(&buffer, params));
    }

    #[test]
    fn silence_falls_back_to_first_class() {
        let buffer = SampleBuffer {
            samples: vec![0.0; 8192],
            sample_rate: SR,
        };
        assert_eq!(detect_key(&buffer, FrameParams::default()), PitchClass::C);
    }

    #[test]
    fn pitch_class_mapping() {
        assert_eq!(pitch_class_of(440.0, MIN_PITCH_HZ), Some(9));
        assert_eq!(pitch_class_of(880.0, MIN_PITCH_HZ), Some(9));
        assert_eq!(pitch_class_of(261.63, MIN_PITCH_HZ), Some(0));
        assert_eq!(pitch_class_of(82.41, MIN_PITCH_HZ), Some(4));
        assert_eq!(pitch_class_of(10.0, MIN_PITCH_HZ), None);
        assert_eq!(pitch_class_of(40.0, 45.3), None);
    }

    #[test]
    fn quantise_buckets_shares() {
        let mut chroma = [0.0f32; 12];
        chroma[0] = 0.5;
        chroma[4] = 0.3;
        chroma[7] = 0.15;
        chroma[9] = 0.05;
        let q = quantise(chroma);
        assert_eq!(q[0], 1.0);
        assert_eq!(q[4], 0.75);
        assert_eq!(q[7], 0.5);
        assert_eq!(q[9], 0.0);
    }

    #[test]
    fn argmax_prefers_first_tie() {
        assert_eq!(argmax(&[0.1, 0.5, 0.5, 0.2]), 1);
        assert_eq!(argmax(&[0.0; 12]), 0);
    }
}

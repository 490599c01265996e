use std::sync::Arc;

use rustfft::{num_complex::Complex, Fft, FftPlanner};

use super::features::SampleBuffer;

pub const DEFAULT_FRAME_SIZE: usize = 2048;
pub const DEFAULT_HOP_SIZE: usize = 512;

/// Frame geometry shared by every frame-based feature in a batch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameParams {
    pub frame_size: usize,
    pub hop_size: usize,
}

impl Default for FrameParams {
    fn default() -> Self {
        Self {
            frame_size: DEFAULT_FRAME_SIZE,
            hop_size: DEFAULT_HOP_SIZE,
        }
    }
}

impl FrameParams {
    /// Frames produced for `len` samples with centered, zero-padded framing.
    pub fn frame_count(&self, len: usize) -> usize {
        if len == 0 {
            0
        } else {
            1 + len / self.hop_size
        }
    }
}

/// Centered frames: frame `i` covers `[i*hop - frame/2, i*hop + frame/2)`,
/// samples outside the buffer read as zero.
pub fn centered_frames<'a>(
    samples: &'a [f32],
    params: FrameParams,
) -> impl Iterator<Item = Vec<f32>> + 'a {
    let half = params.frame_size / 2;
    (0..params.frame_count(samples.len())).map(move |i| {
        let mut frame = vec![0.0f32; params.frame_size];
        let start = (i * params.hop_size) as isize - half as isize;
        for (j, slot) in frame.iter_mut().enumerate() {
            let idx = start + j as isize;
            if idx >= 0 && (idx as usize) < samples.len() {
                *slot = samples[idx as usize];
            }
        }
        frame
    })
}

/// Hann-windowed forward FFT for one frame size, planned once.
pub struct Stft {
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
}

impl Stft {
    pub fn new(frame_size: usize) -> Self {
        let mut planner = FftPlanner::<f32>::new();
        Self {
            fft: planner.plan_fft_forward(frame_size),
            window: hann_window(frame_size),
        }
    }

    /// `frame_size / 2 + 1` magnitudes; `frame` must be `frame_size` long.
    pub fn magnitudes(&self, frame: &[f32]) -> Vec<f32> {
        let mut spectrum: Vec<Complex<f32>> = frame
            .iter()
            .zip(self.window.iter())
            .map(|(&s, &w)| Complex::new(s * w, 0.0))
            .collect();
        self.fft.process(&mut spectrum);
        spectrum[..self.window.len() / 2 + 1]
            .iter()
            .map(|c| c.norm())
            .collect()
    }
}

/// Magnitude spectrogram, one row of `frame_size / 2 + 1` bins per frame.
pub struct Spectrogram {
    pub frames: Vec<Vec<f32>>,
    pub sample_rate: u32,
    pub frame_size: usize,
    pub hop_size: usize,
}

impl Spectrogram {
    pub fn compute(buffer: &SampleBuffer, params: FrameParams) -> Self {
        let stft = Stft::new(params.frame_size);
        let frames: Vec<Vec<f32>> = centered_frames(&buffer.samples, params)
            .map(|frame| stft.magnitudes(&frame))
            .collect();

        log::debug!(
            "Spectrogram: {} frames x {} bins ({} Hz)",
            frames.len(),
            params.frame_size / 2 + 1,
            buffer.sample_rate
        );

        Self {
            frames,
            sample_rate: buffer.sample_rate,
            frame_size: params.frame_size,
            hop_size: params.hop_size,
        }
    }

    /// Centre frequency of bin `k` in Hz
    pub fn bin_frequency(&self, k: usize) -> f32 {
        k as f32 * self.sample_rate as f32 / self.frame_size as f32
    }

    /// Frames per second of the spectrogram time axis
    pub fn frame_rate(&self) -> f32 {
        self.sample_rate as f32 / self.hop_size as f32
    }
}

/// Periodic Hann window (the DFT-even variant used for spectral analysis)
pub fn hann_window(size: usize) -> Vec<f32> {
    (0..size)
        .map(|i| 0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / size as f32).cos()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_count_matches_centered_padding() {
        let params = FrameParams::default();
        assert_eq!(params.frame_count(0), 0);
        assert_eq!(params.frame_count(1), 1);
        assert_eq!(params.frame_count(22050), 44);
    }

    #[test]
    fn first_frame_is_half_padding() {
        let samples = vec![1.0f32; 4096];
        let params = FrameParams {
            frame_size: 8,
            hop_size: 4,
        };
        let first = centered_frames(&samples, params).next().unwrap();
        assert_eq!(first, vec![0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn sine_peaks_at_its_bin() {
        let sr = 22050u32;
        let buffer = SampleBuffer {
            samples: (0..sr as usize)
                .map(|i| (2.0 * std::f32::consts::PI * 1000.0 * i as f32 / sr as f32).sin())
                .collect(),
            sample_rate: sr,
        };
        let spec = Spectrogram::compute(&buffer, FrameParams::default());
        let mid = &spec.frames[spec.frames.len() / 2];
        let peak = mid
            .iter()
            .enumerate()
            .fold((0, 0.0f32), |best, (k, &m)| if m > best.1 { (k, m) } else { best })
            .0;
        assert!((spec.bin_frequency(peak) - 1000.0).abs() < spec.bin_frequency(1));
    }

    #[test]
    fn stft_matches_spectrogram_rows() {
        let buffer = SampleBuffer {
            samples: (0..4096).map(|i| ((i % 50) as f32 / 25.0) - 1.0).collect(),
            sample_rate: 22050,
        };
        let params = FrameParams::default();
        let spec = Spectrogram::compute(&buffer, params);
        let stft = Stft::new(params.frame_size);
        let frame = centered_frames(&buffer.samples, params).nth(3).unwrap();
        let mags = stft.magnitudes(&frame);
        assert_eq!(mags.len(), params.frame_size / 2 + 1);
        assert_eq!(mags, spec.frames[3]);
    }

    #[test]
    fn hann_is_zero_at_start() {
        let w = hann_window(16);
        assert_eq!(w[0], 0.0);
        assert!((w[8] - 1.0).abs() < 1e-6);
    }
}

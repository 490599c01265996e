use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};

use crate::error::ResampleError;

const CHUNK_SIZE: usize = 1024;

/// Mono sinc resampling. Output length is trimmed to `len * target / source`.
pub fn resample(
    samples: &[f32],
    source_rate: u32,
    target_rate: u32,
) -> Result<Vec<f32>, ResampleError> {
    if source_rate == target_rate {
        return Ok(samples.to_vec());
    }
    if source_rate == 0 || target_rate == 0 {
        return Err(ResampleError::InvalidRate {
            from: source_rate,
            to: target_rate,
        });
    }

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let ratio = target_rate as f64 / source_rate as f64;
    let mut resampler = SincFixedIn::<f32>::new(ratio, 2.0, params, CHUNK_SIZE, 1)?;

    let mut output = Vec::with_capacity((samples.len() as f64 * ratio * 1.1) as usize);
    let mut chunk = vec![0.0f32; CHUNK_SIZE];

    for block in samples.chunks(CHUNK_SIZE) {
        chunk[..block.len()].copy_from_slice(block);
        chunk[block.len()..].fill(0.0);

        let resampled = resampler.process(&[&chunk[..]], None)?;
        if let Some(channel) = resampled.first() {
            output.extend_from_slice(channel);
        }
    }

    output.truncate((samples.len() as f64 * ratio) as usize);
    Ok(output)
}

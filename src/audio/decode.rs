use std::path::Path;

use symphonia::core::audio::SampleBuffer as InterleavedBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use super::features::SampleBuffer;
use super::resample::resample;
use crate::error::DecodeError;

/// Decode `path` to mono at `target_rate` Hz.
pub fn decode_audio(path: &Path, target_rate: u32) -> Result<SampleBuffer, DecodeError> {
    let file = std::fs::File::open(path).map_err(|source| DecodeError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|source| DecodeError::Probe {
            path: path.to_path_buf(),
            source,
        })?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| DecodeError::NoTrack {
            path: path.to_path_buf(),
        })?;

    let track_id = track.id;
    let channels = track.codec_params.channels.map_or(1, |c| c.count()).max(1);
    let native_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| DecodeError::UnknownSampleRate {
            path: path.to_path_buf(),
        })?;

    let codec_err = |source: SymphoniaError| DecodeError::Codec {
        path: path.to_path_buf(),
        source,
    };

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(codec_err)?;

    let mut mono: Vec<f32> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(ref e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(e) => return Err(codec_err(e)),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(SymphoniaError::DecodeError(msg)) => {
                log::debug!("{}: skipping bad packet ({})", path.display(), msg);
                continue;
            }
            Err(e) => return Err(codec_err(e)),
        };

        let spec = *decoded.spec();
        let mut interleaved = InterleavedBuffer::<f32>::new(decoded.frames() as u64, spec);
        interleaved.copy_interleaved_ref(decoded);

        downmix_into(&mut mono, interleaved.samples(), channels);
    }

    if mono.is_empty() {
        return Err(DecodeError::Empty {
            path: path.to_path_buf(),
        });
    }

    let samples = if native_rate == target_rate {
        mono
    } else {
        resample(&mono, native_rate, target_rate).map_err(|source| DecodeError::Resample {
            path: path.to_path_buf(),
            from: native_rate,
            to: target_rate,
            source,
        })?
    };

    let buffer = SampleBuffer {
        samples,
        sample_rate: target_rate,
    };

    log::info!(
        "Decoded {}: {} samples, {}Hz -> {}Hz, {:.1}s",
        path.display(),
        buffer.samples.len(),
        native_rate,
        target_rate,
        buffer.duration()
    );

    Ok(buffer)
}

/// Average interleaved frames into `out`.
fn downmix_into(out: &mut Vec<f32>, interleaved: &[f32], channels: usize) {
    if channels == 1 {
        out.extend_from_slice(interleaved);
        return;
    }
    out.extend(
        interleaved
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32),
    );
}

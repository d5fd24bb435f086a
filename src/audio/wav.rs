//! WAV encoding and decoding.
//!
//! Decoding accepts any 16-bit PCM WAV, downmixing stereo to mono. Encoding
//! always produces the canonical track format (mono, 16-bit, 22.05kHz) and
//! publishes the file atomically.

use crate::defaults::{BITS_PER_SAMPLE, CHANNELS, SAMPLE_RATE};
use crate::error::{Result, VoxtimerError};
use crate::tts::synthesizer::Clip;
use std::fs::File;
use std::io::{BufReader, BufWriter, Cursor, Read};
use std::path::{Path, PathBuf};

/// Format of every rendered track.
pub fn track_spec() -> hound::WavSpec {
    hound::WavSpec {
        channels: CHANNELS,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: BITS_PER_SAMPLE,
        sample_format: hound::SampleFormat::Int,
    }
}

/// Decode WAV data into a mono clip at its native sample rate.
pub fn decode_clip(bytes: &[u8]) -> Result<Clip> {
    read_mono(Cursor::new(bytes)).map(|(samples, rate)| Clip::new(samples, rate))
}

fn read_mono<R: Read>(reader: R) -> Result<(Vec<i16>, u32)> {
    let mut wav_reader = hound::WavReader::new(reader).map_err(|e| VoxtimerError::Wav {
        message: format!("Failed to parse WAV data: {}", e),
    })?;

    let spec = wav_reader.spec();
    if spec.sample_format != hound::SampleFormat::Int || spec.bits_per_sample != 16 {
        return Err(VoxtimerError::Wav {
            message: format!(
                "Unsupported WAV format: {}-bit {:?}, expected 16-bit PCM",
                spec.bits_per_sample, spec.sample_format
            ),
        });
    }

    let raw_samples: Vec<i16> = wav_reader
        .samples::<i16>()
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| VoxtimerError::Wav {
            message: format!("Failed to read WAV samples: {}", e),
        })?;

    let samples = match spec.channels {
        1 => raw_samples,
        0 => {
            return Err(VoxtimerError::Wav {
                message: "WAV data declares zero channels".to_string(),
            });
        }
        channels => raw_samples
            .chunks_exact(usize::from(channels))
            .map(|frame| {
                let sum: i32 = frame.iter().map(|&s| i32::from(s)).sum();
                (sum / i32::from(channels)) as i16
            })
            .collect(),
    };

    Ok((samples, spec.sample_rate))
}

/// Read a rendered track back, returning its format and samples.
pub fn read_track(path: &Path) -> Result<(hound::WavSpec, Vec<i16>)> {
    let mut reader = hound::WavReader::new(BufReader::new(File::open(path)?))?;
    let spec = reader.spec();
    let samples = reader
        .samples::<i16>()
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok((spec, samples))
}

/// Write `samples` as a track at `path`.
///
/// The data goes to a temporary file next to `path` which is renamed into
/// place only after the WAV header is finalized and synced, so readers
/// never see a partial file. On error the temporary file is removed.
/// Returns the absolute path of the published file.
pub fn write_track(path: &Path, samples: &[i16]) -> Result<PathBuf> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::Builder::new()
        .prefix(".voxtimer-")
        .suffix(".wav.tmp")
        .tempfile_in(dir)?;

    {
        let mut writer = hound::WavWriter::new(BufWriter::new(tmp.as_file_mut()), track_spec())?;
        let mut sample_writer = writer.get_i16_writer(samples.len() as u32);
        for &sample in samples {
            sample_writer.write_sample(sample);
        }
        sample_writer.flush()?;
        writer.finalize()?;
    }
    tmp.as_file().sync_all()?;

    tmp.persist(path).map_err(|e| VoxtimerError::Io(e.error))?;
    Ok(std::fs::canonicalize(path)?)
}

/// Simple linear interpolation resampling.
pub fn resample(samples: &[i16], from_rate: u32, to_rate: u32) -> Vec<i16> {
    if from_rate == to_rate || from_rate == 0 || to_rate == 0 {
        return samples.to_vec();
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let output_len = (samples.len() as f64 / ratio).ceil() as usize;

    (0..output_len)
        .map(|i| {
            let source_pos = i as f64 * ratio;
            let source_idx = source_pos.floor() as usize;
            let fraction = source_pos - source_idx as f64;

            if source_idx + 1 >= samples.len() {
                samples[source_idx.min(samples.len() - 1)]
            } else {
                let left = samples[source_idx] as f64;
                let right = samples[source_idx + 1] as f64;
                (left + (right - left) * fraction) as i16
            }
        })
        .collect()
}

//! Waveform assembly and WAV output.

use std::path::Path;

use tracing::{info, warn};

use crate::error::{Error, Result};

/// Synthesised speech for one requested text.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioResult {
    /// Mono samples, nominally in `[-1, 1]`.
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    /// Predicted speech length in seconds (includes inserted silence).
    pub duration: f32,
}

impl AudioResult {
    /// Write the samples as a 16-bit PCM mono WAV file.
    ///
    /// 16-bit PCM rather than float: several mobile players accept an
    /// IEEE-float header but play silence.
    pub fn write_wav(&self, path: &Path) -> Result<()> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let io = |e: hound::Error| match e {
            hound::Error::IoError(e) => Error::Io(e),
            other => Error::Io(std::io::Error::other(other)),
        };

        let mut writer = hound::WavWriter::create(path, spec).map_err(io)?;
        for &s in &self.samples {
            let s16 = (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
            writer.write_sample(s16).map_err(io)?;
        }
        writer.finalize().map_err(io)?;

        info!(
            path = %path.display(),
            samples = self.samples.len(),
            seconds = self.samples.len() as f32 / self.sample_rate as f32,
            "wrote WAV"
        );
        Ok(())
    }
}

/// Samples covered by `seconds` at `sample_rate`, rounded.
pub fn samples_for(seconds: f32, sample_rate: u32) -> usize {
    (seconds.max(0.0) * sample_rate as f32).round() as usize
}

/// The first `round(duration * sample_rate)` samples of `wav`, clipped to
/// the buffer.
pub fn trim_to_duration(wav: &[f32], duration: f32, sample_rate: u32) -> &[f32] {
    let wanted = samples_for(duration, sample_rate);
    if wanted > wav.len() {
        warn!(wanted, available = wav.len(), "vocoder output shorter than predicted duration");
    }
    &wav[..wanted.min(wav.len())]
}

/// Join per-chunk waveforms with `silence_seconds` of zeros between them.
///
/// `chunks` pairs each waveform with its predicted duration; each waveform
/// is trimmed to that duration first. The result's duration is the sum of
/// chunk durations plus the inserted silence.
pub fn concat_with_silence(chunks: &[(Vec<f32>, f32)], silence_seconds: f32, sample_rate: u32) -> AudioResult {
    let gap = samples_for(silence_seconds, sample_rate);
    let mut samples = Vec::new();
    let mut duration = 0.0;

    for (i, (wav, d)) in chunks.iter().enumerate() {
        if i > 0 {
            samples.resize(samples.len() + gap, 0.0);
            duration += silence_seconds;
        }
        samples.extend_from_slice(trim_to_duration(wav, *d, sample_rate));
        duration += d;
    }

    AudioResult { samples, sample_rate, duration }
}

/// Split a batched vocoder buffer into one result per item.
///
/// The buffer holds `durations.len()` equal-capacity segments; item `i` is
/// the head of segment `i`, trimmed to its own duration.
pub fn slice_batch(wav: &[f32], durations: &[f32], sample_rate: u32) -> Vec<AudioResult> {
    let batch = durations.len();
    if batch == 0 {
        return Vec::new();
    }
    let capacity = wav.len() / batch;

    durations
        .iter()
        .enumerate()
        .map(|(i, &d)| {
            let segment = &wav[i * capacity..(i + 1) * capacity];
            AudioResult {
                samples: trim_to_duration(segment, d, sample_rate).to_vec(),
                sample_rate,
                duration: d,
            }
        })
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trim_rounds_and_clips() {
        let wav = vec![0.5; 100];
        assert_eq!(trim_to_duration(&wav, 0.0125, 1000).len(), 13);
        assert_eq!(trim_to_duration(&wav, 10.0, 1000).len(), 100);
        assert!(trim_to_duration(&wav, -1.0, 1000).is_empty());
    }

    #[test]
    fn test_three_chunks_with_silence() {
        let sr = 24_000;
        let chunks = vec![
            (vec![1.0; 30_000], 1.0),
            (vec![1.0; 30_000], 0.5),
            (vec![1.0; 30_000], 0.25),
        ];
        let out = concat_with_silence(&chunks, 0.3, sr);

        let gap = 7_200;
        assert_eq!(out.samples.len(), 24_000 + gap + 12_000 + gap + 6_000);
        assert!(out.samples[24_000..24_000 + gap].iter().all(|&s| s == 0.0));
        let second_gap = 24_000 + gap + 12_000;
        assert!(out.samples[second_gap..second_gap + gap].iter().all(|&s| s == 0.0));
        assert!(out.samples[..24_000].iter().all(|&s| s == 1.0));
        assert!((out.duration - (1.75 + 0.6)).abs() < 1e-5);
    }

    #[test]
    fn test_single_chunk_has_no_silence() {
        let out = concat_with_silence(&[(vec![0.1; 50], 0.04)], 0.3, 1000);
        assert_eq!(out.samples.len(), 40);
        assert!((out.duration - 0.04).abs() < 1e-6);
    }

    #[test]
    fn test_slice_batch() {
        // Two items, capacity 50 each.
        let mut wav = vec![1.0; 50];
        wav.extend(vec![2.0; 50]);
        let out = slice_batch(&wav, &[0.02, 0.08], 1000);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].samples, vec![1.0; 20]);
        assert_eq!(out[1].samples, vec![2.0; 50]);
        assert_eq!(out[1].duration, 0.08);
    }

    #[test]
    fn test_write_wav_clamps() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.wav");
        let audio = AudioResult { samples: vec![0.0, 0.5, 2.0, -2.0], sample_rate: 16_000, duration: 0.00025 };
        audio.write_wav(&path).unwrap();

        let mut reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().sample_rate, 16_000);
        assert_eq!(reader.spec().bits_per_sample, 16);
        let samples: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(samples, vec![0, 16_383, i16::MAX, -i16::MAX]);
    }

    #[test]
    fn test_write_wav_bad_path_is_io_error() {
        let audio = AudioResult { samples: vec![0.0], sample_rate: 16_000, duration: 0.0 };
        let err = audio.write_wav(Path::new("/nonexistent/dir/out.wav")).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}

//! Initial noisy latent for the denoising loop.
//!
//! The latent time axis is the waveform length divided by the frame size
//! (`base_chunk_size * chunk_compress_factor`), rounded up. The batch is
//! sized by the longest predicted duration; shorter items are zeroed past
//! their own length through the latent mask.

use std::f64::consts::PI;

use rand::Rng;

use crate::{config::ModelConfig, tensor::Tensor, tokenize::length_to_mask};

/// Noise tensor and its validity mask.
#[derive(Debug, Clone, PartialEq)]
pub struct Latent {
    /// `[batch, latent_channels, latent_len]`.
    pub noise: Tensor<f32>,
    /// `[batch, 1, latent_len]`.
    pub mask: Tensor<f32>,
}

impl Latent {
    pub fn latent_len(&self) -> usize {
        self.mask.shape[2]
    }
}

/// One standard-normal draw via Box–Muller.
///
/// `u1` is taken from `(0, 1]` so the logarithm is always finite.
pub fn standard_normal<R: Rng>(rng: &mut R) -> f32 {
    let u1 = 1.0 - rng.random::<f64>();
    let u2 = rng.random::<f64>();
    ((-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()) as f32
}

/// Waveform samples covered by `duration` seconds (negative clamps to 0).
pub fn wav_len(duration: f32, sample_rate: u32) -> usize {
    (duration.max(0.0) * sample_rate as f32) as usize
}

/// Latent frames needed for each duration.
pub fn latent_lengths(durations: &[f32], config: &ModelConfig) -> Vec<usize> {
    let chunk_size = config.chunk_size();
    durations
        .iter()
        .map(|&d| wav_len(d, config.sample_rate()).div_ceil(chunk_size))
        .collect()
}

/// Sample a masked Gaussian latent sized from predicted `durations`.
pub fn sample_noisy_latent<R: Rng>(
    durations: &[f32],
    config: &ModelConfig,
    rng: &mut R,
) -> Latent {
    let batch = durations.len();
    let channels = config.latent_channels();
    let max_duration = durations.iter().copied().fold(0.0f32, f32::max);
    let latent_len = wav_len(max_duration, config.sample_rate()).div_ceil(config.chunk_size());

    let mut noise = Tensor::<f32>::zeros(vec![batch, channels, latent_len]);
    for v in noise.data.iter_mut() {
        *v = standard_normal(rng);
    }

    let mask = length_to_mask(&latent_lengths(durations, config), Some(latent_len));
    for b in 0..batch {
        let mask_row = &mask.data[b * latent_len..(b + 1) * latent_len];
        for c in 0..channels {
            let start = (b * channels + c) * latent_len;
            for (v, &m) in noise.data[start..start + latent_len].iter_mut().zip(mask_row) {
                *v *= m;
            }
        }
    }

    Latent { noise, mask }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

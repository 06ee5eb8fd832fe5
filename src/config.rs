//! Pipeline constants (`tts.json`) and per-request synthesis options.

use std::path::Path;

use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// File names expected inside a model directory.
pub const CONFIG_FILE: &str = "tts.json";
pub const UNICODE_INDEXER_FILE: &str = "unicode_indexer.json";
pub const DURATION_PREDICTOR_FILE: &str = "duration_predictor.onnx";
pub const TEXT_ENCODER_FILE: &str = "text_encoder.onnx";
pub const VECTOR_ESTIMATOR_FILE: &str = "vector_estimator.onnx";
pub const VOCODER_FILE: &str = "vocoder.onnx";

// ─────────────────────────────────────────────────────────────────────────────
// tts.json schema
// ─────────────────────────────────────────────────────────────────────────────

/// Deserialised `tts.json`. Read-only once the pipeline is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub ae: AutoencoderConfig,
    pub ttl: LatentConfig,
}

/// Autoencoder (vocoder side) constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutoencoderConfig {
    /// Output sample rate in Hz.
    pub sample_rate: u32,
    /// Waveform samples per latent frame before compression.
    pub base_chunk_size: usize,
}

/// Text-to-latent constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatentConfig {
    /// How many base chunks are folded into one latent frame.
    pub chunk_compress_factor: usize,
    /// Channels per base chunk; the latent has `latent_dim * chunk_compress_factor`.
    pub latent_dim: usize,
}

impl ModelConfig {
    pub fn sample_rate(&self) -> u32 {
        self.ae.sample_rate
    }

    /// Waveform samples covered by one latent frame.
    pub fn chunk_size(&self) -> usize {
        self.ae.base_chunk_size * self.ttl.chunk_compress_factor
    }

    /// Channel count of the latent tensor.
    pub fn latent_channels(&self) -> usize {
        self.ttl.latent_dim * self.ttl.chunk_compress_factor
    }

    fn validate(&self) -> anyhow::Result<()> {
        let fields = [
            ("ae.sample_rate", self.ae.sample_rate as usize),
            ("ae.base_chunk_size", self.ae.base_chunk_size),
            ("ttl.chunk_compress_factor", self.ttl.chunk_compress_factor),
            ("ttl.latent_dim", self.ttl.latent_dim),
        ];
        match fields.iter().find(|(_, v)| *v == 0) {
            Some((name, _)) => Err(anyhow!("{name} must be positive")),
            None => Ok(()),
        }
    }

    /// Parse and validate a `tts.json` document.
    pub fn from_json_slice(bytes: &[u8]) -> anyhow::Result<Self> {
        let config: ModelConfig =
            serde_json::from_slice(bytes).context("Failed to parse tts.json")?;
        config.validate()?;
        Ok(config)
    }
}

/// Load `tts.json` from `path`.
pub fn load_model_config(path: &Path) -> Result<ModelConfig> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Cannot read config: {}", path.display()))
        .map_err(|e| Error::config(path, e))?;
    ModelConfig::from_json_slice(&bytes).map_err(|e| Error::config(path, e))
}

// ─────────────────────────────────────────────────────────────────────────────
// Execution provider
// ─────────────────────────────────────────────────────────────────────────────

/// Where the ONNX sessions execute.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Acceleration {
    #[default]
    Cpu,
    /// Not wired up; requesting it fails with [`Error::UnsupportedAcceleration`].
    Gpu,
}

// ─────────────────────────────────────────────────────────────────────────────
// Synthesis options
// ─────────────────────────────────────────────────────────────────────────────

/// Per-request knobs.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisOptions {
    /// Denoising iterations.
    pub steps: usize,
    /// Speech rate; predicted durations are divided by this.
    pub speed: f32,
    /// Silence inserted between chunks in sequential synthesis.
    pub silence_seconds: f32,
    /// Maximum characters per text chunk.
    pub max_chunk_len: usize,
    /// Reseeds the instance's noise generator before the request when set.
    pub seed: Option<u64>,
}

impl Default for SynthesisOptions {
    fn default() -> Self {
        Self {
            steps: 5,
            speed: 1.05,
            silence_seconds: 0.3,
            max_chunk_len: 300,
            seed: None,
        }
    }
}

impl SynthesisOptions {
    pub fn with_steps(mut self, steps: usize) -> Self {
        self.steps = steps;
        self
    }

    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = speed;
        self
    }

    pub fn with_silence(mut self, seconds: f32) -> Self {
        self.silence_seconds = seconds;
        self
    }

    pub fn with_max_chunk_len(mut self, max_len: usize) -> Self {
        self.max_chunk_len = max_len;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.steps == 0 {
            return Err(Error::InvalidOptions("steps must be at least 1".into()));
        }
        if !(self.speed.is_finite() && self.speed > 0.0) {
            return Err(Error::InvalidOptions(format!("speed must be positive, got {}", self.speed)));
        }
        if !(self.silence_seconds.is_finite() && self.silence_seconds >= 0.0) {
            return Err(Error::InvalidOptions(format!(
                "silence must be non-negative, got {}",
                self.silence_seconds
            )));
        }
        if self.max_chunk_len == 0 {
            return Err(Error::InvalidOptions("max_chunk_len must be at least 1".into()));
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

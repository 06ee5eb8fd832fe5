//! The synthesis pipeline: four model calls plus the tensor plumbing
//! between them.
//!
//! | Model                | Inputs                                                        | Output            |
//! |----------------------|---------------------------------------------------------------|-------------------|
//! | `duration_predictor` | `text_ids` i64 `[B, L]`, `style_dp`, `text_mask` `[B, 1, L]`   | seconds `[B]`     |
//! | `text_encoder`       | `text_ids`, `style_ttl`, `text_mask`                          | text embedding    |
//! | `vector_estimator`   | `noisy_latent`, `text_emb`, `style_ttl`, `latent_mask`, `text_mask`, `current_step` `[B]`, `total_step` `[B]` | next latent |
//! | `vocoder`            | `latent`                                                      | waveform          |
//!
//! The text embedding is computed once and reused by every denoising step;
//! each estimator output replaces the latent wholesale.

use std::path::Path;

use anyhow::anyhow;
use parking_lot::Mutex;
use rand::{rngs::StdRng, SeedableRng};
use tracing::{debug, info};

use crate::{
    audio::{concat_with_silence, slice_batch, AudioResult},
    chunk::chunk_normalized,
    config::{self, load_model_config, Acceleration, ModelConfig, SynthesisOptions},
    error::{Error, Result},
    latent::sample_noisy_latent,
    normalize::normalize,
    session::{ModelInput, ModelSession, ModelSessions, OrtSession},
    style::{load_voice_styles, VoiceStyle},
    tensor::Tensor,
    tokenize::TextProcessor,
};

const DURATION_PREDICTOR: &str = "duration_predictor";
const TEXT_ENCODER: &str = "text_encoder";
const VECTOR_ESTIMATOR: &str = "vector_estimator";
const VOCODER: &str = "vocoder";

/// Everything that must not be touched by two requests at once.
struct Engine<S> {
    sessions: ModelSessions<S>,
    rng: StdRng,
}

/// In-memory copies of a model directory (bundled app assets).
#[derive(Debug, Clone, Copy)]
pub struct ModelAssets<'a> {
    pub config: &'a [u8],
    pub unicode_indexer: &'a [u8],
    pub duration_predictor: &'a [u8],
    pub text_encoder: &'a [u8],
    pub vector_estimator: &'a [u8],
    pub vocoder: &'a [u8],
}

// ─────────────────────────────────────────────────────────────────────────────
// Synthesizer
// ─────────────────────────────────────────────────────────────────────────────

/// The main TTS handle.
///
/// Owns the four model sessions and the noise generator behind one lock, so
/// concurrent requests on one instance run one after another.
pub struct Synthesizer<S: ModelSession = OrtSession> {
    config: ModelConfig,
    processor: TextProcessor,
    engine: Mutex<Engine<S>>,
}

impl Synthesizer<OrtSession> {
    /// Load `tts.json`, `unicode_indexer.json` and the four ONNX models from
    /// `dir`.
    pub fn load(dir: &Path, acceleration: Acceleration) -> Result<Self> {
        info!(dir = %dir.display(), ?acceleration, "loading models");

        let config = load_model_config(&dir.join(config::CONFIG_FILE))?;
        let processor = TextProcessor::from_file(&dir.join(config::UNICODE_INDEXER_FILE))?;
        let sessions = ModelSessions {
            duration_predictor: OrtSession::from_file(&dir.join(config::DURATION_PREDICTOR_FILE), acceleration)?,
            text_encoder: OrtSession::from_file(&dir.join(config::TEXT_ENCODER_FILE), acceleration)?,
            vector_estimator: OrtSession::from_file(&dir.join(config::VECTOR_ESTIMATOR_FILE), acceleration)?,
            vocoder: OrtSession::from_file(&dir.join(config::VOCODER_FILE), acceleration)?,
        };

        info!(sample_rate = config.sample_rate(), vocab = processor.vocab_len(), "models loaded");
        Ok(Self::from_parts(config, processor, sessions))
    }

    /// Build from in-memory model files.
    pub fn load_from_memory(assets: &ModelAssets<'_>, acceleration: Acceleration) -> Result<Self> {
        let config = ModelConfig::from_json_slice(assets.config)
            .map_err(|e| Error::config(config::CONFIG_FILE, e))?;
        let processor = TextProcessor::from_json_slice(assets.unicode_indexer)
            .map_err(|e| Error::config(config::UNICODE_INDEXER_FILE, e))?;
        let sessions = ModelSessions {
            duration_predictor: OrtSession::from_memory(DURATION_PREDICTOR, assets.duration_predictor, acceleration)?,
            text_encoder: OrtSession::from_memory(TEXT_ENCODER, assets.text_encoder, acceleration)?,
            vector_estimator: OrtSession::from_memory(VECTOR_ESTIMATOR, assets.vector_estimator, acceleration)?,
            vocoder: OrtSession::from_memory(VOCODER, assets.vocoder, acceleration)?,
        };
        Ok(Self::from_parts(config, processor, sessions))
    }
}

impl<S: ModelSession> Synthesizer<S> {
    /// Assemble a pipeline from already-built parts. The noise generator is
    /// seeded from the OS; pass [`SynthesisOptions::seed`] for reproducible
    /// output.
    pub fn from_parts(config: ModelConfig, processor: TextProcessor, sessions: ModelSessions<S>) -> Self {
        Self {
            config,
            processor,
            engine: Mutex::new(Engine { sessions, rng: StdRng::from_os_rng() }),
        }
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate()
    }

    /// Run the four models once over a batch.
    ///
    /// Returns the flat vocoder waveform and the predicted duration (seconds,
    /// already divided by `speed`) of every text.
    pub fn infer<T: AsRef<str>>(
        &self,
        texts: &[T],
        style: &VoiceStyle,
        steps: usize,
        speed: f32,
    ) -> Result<(Vec<f32>, Vec<f32>)> {
        SynthesisOptions::default().with_steps(steps).with_speed(speed).validate()?;
        let normalized = normalize_all(texts);
        let mut engine = self.engine.lock();
        self.run_models(&mut engine, &normalized, style, steps, speed)
    }

    /// Synthesise one text of any length with one voice.
    ///
    /// The text is normalised and chunked paragraph by paragraph, then every
    /// chunk is run on its own; results are joined with
    /// `options.silence_seconds` of silence.
    pub fn synthesize(&self, text: &str, style: &VoiceStyle, options: &SynthesisOptions) -> Result<AudioResult> {
        options.validate()?;
        if style.batch_size() != 1 {
            return Err(Error::InputMismatch { texts: 1, voices: style.batch_size() });
        }

        let chunks = chunk_normalized(text, options.max_chunk_len);
        info!(chunks = chunks.len(), steps = options.steps, speed = options.speed, "synthesizing");

        let mut engine = self.engine.lock();
        if let Some(seed) = options.seed {
            engine.rng = StdRng::seed_from_u64(seed);
        }

        let mut pieces = Vec::with_capacity(chunks.len());
        for (i, chunk) in chunks.iter().enumerate() {
            debug!(chunk = i, chars = chunk.chars().count(), "synthesizing chunk");
            let (wav, durations) =
                self.run_models(&mut engine, std::slice::from_ref(chunk), style, options.steps, options.speed)?;
            pieces.push((wav, durations[0]));
        }
        drop(engine);

        let audio = concat_with_silence(&pieces, options.silence_seconds, self.sample_rate());
        info!(duration = audio.duration, samples = audio.samples.len(), "synthesis done");
        Ok(audio)
    }

    /// Synthesise one short text per voice-style file in a single batch.
    ///
    /// Fails with [`Error::InputMismatch`] before reading any file when the
    /// counts differ. Texts are not chunked.
    pub fn synthesize_batch<T, P>(
        &self,
        texts: &[T],
        voice_paths: &[P],
        options: &SynthesisOptions,
    ) -> Result<Vec<AudioResult>>
    where
        T: AsRef<str>,
        P: AsRef<Path>,
    {
        if texts.len() != voice_paths.len() {
            return Err(Error::InputMismatch { texts: texts.len(), voices: voice_paths.len() });
        }
        options.validate()?;
        let style = load_voice_styles(voice_paths)?;
        self.synthesize_batch_with_style(texts, &style, options)
    }

    /// Batch synthesis with an already-loaded (stacked) style.
    pub fn synthesize_batch_with_style<T: AsRef<str>>(
        &self,
        texts: &[T],
        style: &VoiceStyle,
        options: &SynthesisOptions,
    ) -> Result<Vec<AudioResult>> {
        if texts.len() != style.batch_size() {
            return Err(Error::InputMismatch { texts: texts.len(), voices: style.batch_size() });
        }
        options.validate()?;

        let mut engine = self.engine.lock();
        if let Some(seed) = options.seed {
            engine.rng = StdRng::seed_from_u64(seed);
        }
        let normalized = normalize_all(texts);
        let (wav, durations) = self.run_models(&mut engine, &normalized, style, options.steps, options.speed)?;
        drop(engine);

        info!(batch = texts.len(), ?durations, "batch synthesis done");
        Ok(slice_batch(&wav, &durations, self.sample_rate()))
    }

    // ── Pipeline ──────────────────────────────────────────────────────────────

    /// `texts` must already be normalised.
    fn run_models(
        &self,
        engine: &mut Engine<S>,
        texts: &[String],
        style: &VoiceStyle,
        steps: usize,
        speed: f32,
    ) -> Result<(Vec<f32>, Vec<f32>)> {
        if style.batch_size() != texts.len() {
            return Err(Error::InputMismatch { texts: texts.len(), voices: style.batch_size() });
        }

        let encoded = self.processor.process(texts);
        let batch = encoded.batch_size();
        let text_ids = encoded.ids_tensor();
        let text_mask = encoded.mask;
        let Engine { sessions, rng } = engine;

        // ── Durations ────────────────────────────────────────────────────────
        let predicted = sessions
            .duration_predictor
            .run(vec![
                ("text_ids", text_ids.clone().into()),
                ("style_dp", style.dp.clone().into()),
                ("text_mask", text_mask.clone().into()),
            ])
            .map_err(|e| Error::model(DURATION_PREDICTOR, e))?;
        if predicted.len() != batch {
            return Err(Error::model(
                DURATION_PREDICTOR,
                anyhow!("expected {batch} durations, got shape {:?}", predicted.shape),
            ));
        }
        let durations: Vec<f32> = predicted.data.iter().map(|d| d / speed).collect();
        debug!(?durations, "predicted durations");

        // ── Text embedding ───────────────────────────────────────────────────
        let text_emb = sessions
            .text_encoder
            .run(vec![
                ("text_ids", text_ids.into()),
                ("style_ttl", style.ttl.clone().into()),
                ("text_mask", text_mask.clone().into()),
            ])
            .map_err(|e| Error::model(TEXT_ENCODER, e))?;

        // ── Denoising ────────────────────────────────────────────────────────
        let latent = sample_noisy_latent(&durations, &self.config, rng);
        let latent_mask = latent.mask;
        let mut xt = latent.noise;
        let total_step = Tensor { shape: vec![batch], data: vec![steps as f32; batch] };

        for step in 0..steps {
            debug!(step, total = steps, "denoising step");
            let current_step = Tensor { shape: vec![batch], data: vec![step as f32; batch] };
            let next = sessions
                .vector_estimator
                .run(vec![
                    ("noisy_latent", xt.clone().into()),
                    ("text_emb", text_emb.clone().into()),
                    ("style_ttl", style.ttl.clone().into()),
                    ("latent_mask", latent_mask.clone().into()),
                    ("text_mask", text_mask.clone().into()),
                    ("current_step", current_step.into()),
                    ("total_step", total_step.clone().into()),
                ])
                .map_err(|e| Error::model(VECTOR_ESTIMATOR, e))?;
            if next.shape != xt.shape {
                return Err(Error::model(
                    VECTOR_ESTIMATOR,
                    anyhow!("latent shape changed from {:?} to {:?} at step {step}", xt.shape, next.shape),
                ));
            }
            xt = next;
        }

        // ── Waveform ─────────────────────────────────────────────────────────
        let wav = sessions
            .vocoder
            .run(vec![("latent", ModelInput::F32(xt))])
            .map_err(|e| Error::model(VOCODER, e))?;

        Ok((wav.data, durations))
    }
}

fn normalize_all<T: AsRef<str>>(texts: &[T]) -> Vec<String> {
    texts.iter().map(|t| normalize(t.as_ref())).collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

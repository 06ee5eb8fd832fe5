//! Async front end: background model loading and non-blocking requests.
//!
//! Loading four ONNX sessions takes seconds, so [`AsyncSynthesizer::spawn_load`]
//! returns at once and builds the pipeline on tokio's blocking pool. Every
//! request first waits for the load to finish, then runs the (blocking)
//! pipeline on `spawn_blocking`. Requests still go through the
//! [`Synthesizer`] lock one at a time.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::anyhow;
use tokio::sync::watch;
use tracing::{error, info};

use crate::{
    audio::AudioResult,
    config::{Acceleration, SynthesisOptions},
    error::{Error, Result},
    model::Synthesizer,
    session::{ModelSession, OrtSession},
    style::VoiceStyle,
};

enum LoadState<S: ModelSession> {
    Loading,
    Ready(Arc<Synthesizer<S>>),
    Failed(String),
}

/// Cloneable async handle to a [`Synthesizer`] that may still be loading.
pub struct AsyncSynthesizer<S: ModelSession + 'static = OrtSession> {
    source: PathBuf,
    state: watch::Receiver<LoadState<S>>,
}

impl<S: ModelSession + 'static> Clone for AsyncSynthesizer<S> {
    fn clone(&self) -> Self {
        Self { source: self.source.clone(), state: self.state.clone() }
    }
}

impl AsyncSynthesizer<OrtSession> {
    /// Start loading the models in `dir` and return immediately.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn_load(dir: impl Into<PathBuf>, acceleration: Acceleration) -> Self {
        let dir = dir.into();
        let load_dir = dir.clone();
        Self::spawn_with(dir, move || Synthesizer::load(&load_dir, acceleration))
    }
}

impl<S: ModelSession + 'static> AsyncSynthesizer<S> {
    /// Run `loader` on the blocking pool; `source` names it in errors.
    pub fn spawn_with<F>(source: impl Into<PathBuf>, loader: F) -> Self
    where
        F: FnOnce() -> Result<Synthesizer<S>> + Send + 'static,
    {
        let source = source.into();
        let (tx, rx) = watch::channel(LoadState::Loading);
        let name = source.display().to_string();

        tokio::task::spawn_blocking(move || {
            let state = match loader() {
                Ok(synth) => {
                    info!(source = %name, "synthesizer ready");
                    LoadState::Ready(Arc::new(synth))
                }
                Err(e) => {
                    error!(source = %name, error = %e, "synthesizer failed to load");
                    LoadState::Failed(format!("{e:#}"))
                }
            };
            // No receivers left means every handle was dropped; nothing to do.
            let _ = tx.send(state);
        });

        Self { source, state: rx }
    }

    /// `true` once loading has finished successfully.
    pub fn is_ready(&self) -> bool {
        matches!(*self.state.borrow(), LoadState::Ready(_))
    }

    /// Wait for loading to finish and return the pipeline.
    pub async fn ready(&self) -> Result<Arc<Synthesizer<S>>> {
        let mut state = self.state.clone();
        let loaded = state
            .wait_for(|s| !matches!(s, LoadState::Loading))
            .await
            .map_err(|_| self.load_error("loader task ended without a result".into()))?;
        match &*loaded {
            LoadState::Ready(synth) => Ok(Arc::clone(synth)),
            LoadState::Failed(msg) => Err(self.load_error(msg.clone())),
            LoadState::Loading => Err(self.load_error("still loading".into())),
        }
    }

    fn load_error(&self, msg: String) -> Error {
        Error::config(self.source.as_path(), anyhow!(msg))
    }

    pub async fn synthesize(
        &self,
        text: String,
        style: VoiceStyle,
        options: SynthesisOptions,
    ) -> Result<AudioResult> {
        let synth = self.ready().await?;
        blocking(move || synth.synthesize(&text, &style, &options)).await
    }

    pub async fn synthesize_batch(
        &self,
        texts: Vec<String>,
        voice_paths: Vec<PathBuf>,
        options: SynthesisOptions,
    ) -> Result<Vec<AudioResult>> {
        let synth = self.ready().await?;
        blocking(move || synth.synthesize_batch(&texts, &voice_paths, &options)).await
    }

    /// Where the models are loaded from.
    pub fn source(&self) -> &Path {
        &self.source
    }
}

async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Error::model("synthesis task", e))?
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::{AutoencoderConfig, LatentConfig, ModelConfig},
        session::{ModelInput, ModelSessions},
        tensor::Tensor,
        tokenize::TextProcessor,
    };

    struct Flat;

    impl ModelSession for Flat {
        fn run(&mut self, inputs: Vec<(&'static str, ModelInput)>) -> anyhow::Result<Tensor<f32>> {
            let (name, first) = &inputs[0];
            let batch = first.shape()[0];
            match (*name, first) {
                ("noisy_latent", ModelInput::F32(t)) => Ok(t.clone()),
                ("latent", _) => Tensor::new(vec![batch, 40], vec![0.1; batch * 40]),
                _ => Tensor::new(vec![batch], vec![0.2; batch]),
            }
        }
    }

    fn build() -> Result<Synthesizer<Flat>> {
        let config = ModelConfig {
            ae: AutoencoderConfig { sample_rate: 100, base_chunk_size: 2 },
            ttl: LatentConfig { chunk_compress_factor: 2, latent_dim: 1 },
        };
        let sessions =
            ModelSessions { duration_predictor: Flat, text_encoder: Flat, vector_estimator: Flat, vocoder: Flat };
        Ok(Synthesizer::from_parts(config, TextProcessor::new((0..128).collect()), sessions))
    }

    fn style() -> VoiceStyle {
        VoiceStyle { ttl: Tensor::zeros(vec![1, 1, 2]), dp: Tensor::zeros(vec![1, 1, 2]) }
    }

    #[tokio::test]
    async fn test_requests_wait_for_load() {
        let handle = AsyncSynthesizer::spawn_with("fake", || {
            std::thread::sleep(std::time::Duration::from_millis(50));
            build()
        });
        let audio = handle
            .synthesize("Hello.".into(), style(), SynthesisOptions::default().with_speed(1.0))
            .await
            .unwrap();
        assert!(handle.is_ready());
        assert_eq!(audio.samples.len(), 20);
    }

    #[tokio::test]
    async fn test_load_failure_is_reported_to_every_request() {
        let handle: AsyncSynthesizer<Flat> = AsyncSynthesizer::spawn_with("broken", || {
            Err(Error::InvalidOptions("no models".into()))
        });
        for _ in 0..2 {
            let err = handle.ready().await.err().unwrap();
            assert!(matches!(err, Error::ConfigLoad { .. }));
            assert!(format!("{:#}", anyhow::Error::new(err)).contains("no models"));
        }
        assert!(!handle.is_ready());
    }

    #[tokio::test]
    async fn test_batch_mismatch_passes_through() {
        let handle = AsyncSynthesizer::spawn_with("fake", build);
        let err = handle
            .synthesize_batch(vec!["a".into(), "b".into()], vec![], SynthesisOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InputMismatch { texts: 2, voices: 0 }));
    }
}

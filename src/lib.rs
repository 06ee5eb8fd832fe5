//! # flowtts
//!
//! ONNX inference pipeline for flow-matching text-to-speech models of the
//! Supertonic family: a duration predictor, a text encoder, a latent vector
//! estimator run for a few denoising steps, and a vocoder.
//!
//! ## Quick start
//!
//! ```no_run
//! use flowtts::{download, load_voice_styles, SynthesisOptions};
//!
//! // Download the models from HuggingFace (cached after first run)
//! let tts = download::load_from_hub("Supertone/supertonic").unwrap();
//! let voice = download::fetch_voice("Supertone/supertonic", "M1").unwrap();
//! let style = load_voice_styles(&[voice]).unwrap();
//!
//! let audio = tts
//!     .synthesize("Hello from Rust!", &style, &SynthesisOptions::default())
//!     .unwrap();
//! audio.write_wav(std::path::Path::new("output.wav")).unwrap();
//! ```
//!
//! Several short texts, one voice each, run as a single batch:
//!
//! ```no_run
//! use flowtts::{Acceleration, SynthesisOptions, Synthesizer};
//!
//! let tts = Synthesizer::load("assets/onnx".as_ref(), Acceleration::Cpu).unwrap();
//! let results = tts
//!     .synthesize_batch(
//!         &["Good morning.", "Good night."],
//!         &["assets/voice_styles/F1.json", "assets/voice_styles/M1.json"],
//!         &SynthesisOptions::default(),
//!     )
//!     .unwrap();
//! ```
//!
//! ## Pipeline
//! 1. **Normalisation**: Unicode folding, emoji/diacritic removal, symbol
//!    cleanup, terminal punctuation.
//! 2. **Chunking**: long texts split at paragraph, sentence, clause and
//!    word boundaries into ≤ 300-char chunks.
//! 3. **Tokenisation**: characters mapped through `unicode_indexer.json`,
//!    right-padded, with a `[batch, 1, len]` mask.
//! 4. **Durations**: predicted per text, divided by the speed factor.
//! 5. **Denoising**: a masked Gaussian latent refined by `steps` calls to
//!    the vector estimator.
//! 6. **Vocoding**: latent → waveform, trimmed to the predicted duration.
//! 7. **Assembly**: chunks joined with silence; batches sliced per item.
//!
//! The model calls go through the [`ModelSession`] trait; [`OrtSession`] is
//! the ONNX Runtime implementation and tests plug in scripted fakes.

// Model download from HuggingFace Hub is desktop-only: mobile apps bundle
// the models and use Synthesizer::load_from_memory().
#[cfg(not(any(target_os = "ios", target_os = "android")))]
pub mod download;

#[cfg(feature = "async")]
pub mod runtime;

pub mod audio;
pub mod chunk;
pub mod config;
pub mod error;
pub mod latent;
pub mod model;
pub mod normalize;
pub mod session;
pub mod style;
pub mod tensor;
pub mod tokenize;

// ─── Re-exports for convenience ─────────────────────────────────────────────

pub use audio::AudioResult;
pub use config::{Acceleration, ModelConfig, SynthesisOptions};
pub use error::{Error, Result};
pub use model::{ModelAssets, Synthesizer};
pub use normalize::normalize;
pub use session::{ModelInput, ModelSession, ModelSessions, OrtSession};
pub use style::{load_voice_styles, VoiceStyle};
pub use tensor::Tensor;
pub use tokenize::TextProcessor;

#[cfg(feature = "async")]
pub use runtime::AsyncSynthesizer;

//! HuggingFace Hub downloader.
//!
//! The published repositories keep the model files under `onnx/` and the
//! voice styles under `voice_styles/`. Files land in the Hub cache
//! (`~/.cache/huggingface/hub` by default) and are reused on later runs.

use std::path::{Path, PathBuf};

use anyhow::Context;
use hf_hub::api::sync::Api;
use tracing::info;

use crate::{
    config::{self, Acceleration},
    error::{Error, Result},
    model::Synthesizer,
};

/// Repository used when none is given.
pub const DEFAULT_REPO: &str = "Supertone/supertonic";

const ONNX_DIR: &str = "onnx";
const VOICE_STYLES_DIR: &str = "voice_styles";

/// Every file [`Synthesizer::load`] reads.
const MODEL_FILES: &[&str] = &[
    config::CONFIG_FILE,
    config::UNICODE_INDEXER_FILE,
    config::DURATION_PREDICTOR_FILE,
    config::TEXT_ENCODER_FILE,
    config::VECTOR_ESTIMATOR_FILE,
    config::VOCODER_FILE,
];

/// Download a single file from a HuggingFace repository.
fn hf_download(api: &Api, repo_id: &str, filename: &str) -> Result<PathBuf> {
    let repo = api.model(repo_id.to_string());
    repo.get(filename)
        .with_context(|| format!("Failed to download '{filename}' from '{repo_id}'"))
        .map_err(|e| Error::config(filename, e))
}

fn api() -> Result<Api> {
    Api::new()
        .context("Failed to initialise HuggingFace Hub client")
        .map_err(|e| Error::config("<huggingface>", e))
}

/// Expand a bare repository name (`"supertonic"`) to `"Supertone/supertonic"`.
fn qualify(repo_id: &str) -> String {
    if repo_id.contains('/') {
        repo_id.to_string()
    } else {
        let owner = DEFAULT_REPO.split('/').next().unwrap_or_default();
        format!("{owner}/{repo_id}")
    }
}

/// Download the model files of `repo_id` and return the local directory
/// that holds them, ready for [`Synthesizer::load`].
pub fn fetch_model_dir(repo_id: &str) -> Result<PathBuf> {
    let repo_id = qualify(repo_id);
    let api = api()?;

    let mut dir = None;
    for file in MODEL_FILES {
        info!(repo = %repo_id, file, "downloading");
        let path = hf_download(&api, &repo_id, &format!("{ONNX_DIR}/{file}"))?;
        dir = path.parent().map(Path::to_path_buf);
    }
    dir.ok_or_else(|| Error::config(repo_id, anyhow::anyhow!("download returned no directory")))
}

/// Download the voice style `name` (with or without `.json`) and return its
/// local path.
pub fn fetch_voice(repo_id: &str, name: &str) -> Result<PathBuf> {
    let repo_id = qualify(repo_id);
    let file = if name.ends_with(".json") { name.to_string() } else { format!("{name}.json") };
    info!(repo = %repo_id, voice = %file, "downloading voice style");
    hf_download(&api()?, &repo_id, &format!("{VOICE_STYLES_DIR}/{file}"))
}

/// Download (or reuse the cached) model and load it on the CPU.
pub fn load_from_hub(repo_id: &str) -> Result<Synthesizer> {
    let dir = fetch_model_dir(repo_id)?;
    Synthesizer::load(&dir, Acceleration::Cpu)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

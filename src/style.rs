//! Voice style loader.
//!
//! A voice is one JSON document holding two 3-D tensors:
//!
//! | Component   | Consumed by               | Shape          |
//! |-------------|---------------------------|----------------|
//! | `style_ttl` | text encoder, estimator   | `[1, d1, d2]`  |
//! | `style_dp`  | duration predictor        | `[1, d1, d2]`  |
//!
//! ```json
//! { "style_ttl": { "data": [[[0.1, …], …]], "dims": [1, 50, 256], "type": "float32" },
//!   "style_dp":  { "data": [[[…]]],         "dims": [1, 8, 16],   "type": "float32" } }
//! ```
//!
//! Several voices are stacked along the batch axis in caller order; slot `i`
//! of the result belongs to text `i` of the batch.

use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::{
    error::{Error, Result},
    tensor::Tensor,
};

// ─────────────────────────────────────────────────────────────────────────────
// JSON schema
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct StyleFile {
    style_ttl: StyleComponent,
    style_dp: StyleComponent,
}

#[derive(Debug, Deserialize)]
struct StyleComponent {
    data: Vec<Vec<Vec<f32>>>,
    dims: Vec<usize>,
    #[serde(rename = "type")]
    #[allow(dead_code)]
    dtype: String,
}

impl StyleComponent {
    /// `(d1, d2)` of a `[1, d1, d2]` component.
    fn inner_dims(&self, name: &str) -> Result<(usize, usize)> {
        match self.dims.as_slice() {
            [_, d1, d2] => Ok((*d1, *d2)),
            dims => Err(Error::StyleFormat(format!(
                "{name} must have 3 dims, got {dims:?}"
            ))),
        }
    }

    /// Row-major flattening of the nested data, checked against `d1 * d2`.
    fn flatten(&self, name: &str, d1: usize, d2: usize) -> Result<Vec<f32>> {
        let flat: Vec<f32> = self.data.iter().flatten().flatten().copied().collect();
        if flat.len() != d1 * d2 {
            return Err(Error::StyleFormat(format!(
                "{name} holds {} values, dims [1, {d1}, {d2}] need {}",
                flat.len(),
                d1 * d2
            )));
        }
        Ok(flat)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// VoiceStyle
// ─────────────────────────────────────────────────────────────────────────────

/// Batched style tensors, `[batch, d1, d2]` each.
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceStyle {
    pub ttl: Tensor<f32>,
    pub dp: Tensor<f32>,
}

impl VoiceStyle {
    /// Number of voices stacked in this style.
    pub fn batch_size(&self) -> usize {
        self.ttl.batch()
    }

    /// Parse a single voice from JSON bytes (bundled assets, mobile).
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self> {
        let file: StyleFile = serde_json::from_slice(bytes)
            .map_err(|e| Error::StyleFormat(format!("malformed JSON: {e}")))?;
        let mut builder = StyleBatch::new(&file)?;
        builder.push(&file)?;
        Ok(builder.finish())
    }

    /// Stack already-loaded styles along the batch axis, in order.
    pub fn stack(styles: &[VoiceStyle]) -> Result<Self> {
        let first = styles
            .first()
            .ok_or_else(|| Error::StyleFormat("no voice styles to stack".into()))?;

        if let Some((i, _)) = styles.iter().enumerate().find(|(_, s)| s.ttl.rank() != 3 || s.dp.rank() != 3) {
            return Err(Error::StyleFormat(format!(
                "style {i} must hold rank-3 ttl and dp tensors, got {:?} / {:?}",
                styles[i].ttl.shape, styles[i].dp.shape,
            )));
        }

        let mut ttl = Tensor { shape: first.ttl.shape.clone(), data: Vec::new() };
        let mut dp = Tensor { shape: first.dp.shape.clone(), data: Vec::new() };
        for (i, style) in styles.iter().enumerate() {
            if style.ttl.shape[1..] != first.ttl.shape[1..] || style.dp.shape[1..] != first.dp.shape[1..] {
                return Err(Error::StyleFormat(format!(
                    "style {i} has ttl {:?} / dp {:?}, expected ttl {:?} / dp {:?}",
                    &style.ttl.shape[1..],
                    &style.dp.shape[1..],
                    &first.ttl.shape[1..],
                    &first.dp.shape[1..],
                )));
            }
            ttl.data.extend_from_slice(&style.ttl.data);
            dp.data.extend_from_slice(&style.dp.data);
        }
        ttl.shape[0] = styles.iter().map(VoiceStyle::batch_size).sum();
        dp.shape[0] = ttl.shape[0];
        Ok(Self { ttl, dp })
    }
}

/// Accumulates voices into pre-sized batch buffers.
struct StyleBatch {
    ttl_dims: (usize, usize),
    dp_dims: (usize, usize),
    ttl: Vec<f32>,
    dp: Vec<f32>,
    count: usize,
}

impl StyleBatch {
    /// Take the reference dims from `first`.
    fn new(first: &StyleFile) -> Result<Self> {
        Ok(Self {
            ttl_dims: first.style_ttl.inner_dims("style_ttl")?,
            dp_dims: first.style_dp.inner_dims("style_dp")?,
            ttl: Vec::new(),
            dp: Vec::new(),
            count: 0,
        })
    }

    fn with_capacity(first: &StyleFile, voices: usize) -> Result<Self> {
        let mut batch = Self::new(first)?;
        batch.ttl.reserve(voices * batch.ttl_dims.0 * batch.ttl_dims.1);
        batch.dp.reserve(voices * batch.dp_dims.0 * batch.dp_dims.1);
        Ok(batch)
    }

    /// Append one voice at offset `count * d1 * d2` of each component.
    fn push(&mut self, file: &StyleFile) -> Result<()> {
        let ttl_dims = file.style_ttl.inner_dims("style_ttl")?;
        let dp_dims = file.style_dp.inner_dims("style_dp")?;
        if ttl_dims != self.ttl_dims || dp_dims != self.dp_dims {
            return Err(Error::StyleFormat(format!(
                "voice {} has ttl {ttl_dims:?} / dp {dp_dims:?}, expected ttl {:?} / dp {:?}",
                self.count, self.ttl_dims, self.dp_dims
            )));
        }
        let (t1, t2) = ttl_dims;
        let (d1, d2) = dp_dims;
        self.ttl.extend(file.style_ttl.flatten("style_ttl", t1, t2)?);
        self.dp.extend(file.style_dp.flatten("style_dp", d1, d2)?);
        self.count += 1;
        Ok(())
    }

    fn finish(self) -> VoiceStyle {
        let (t1, t2) = self.ttl_dims;
        let (d1, d2) = self.dp_dims;
        VoiceStyle {
            ttl: Tensor { shape: vec![self.count, t1, t2], data: self.ttl },
            dp: Tensor { shape: vec![self.count, d1, d2], data: self.dp },
        }
    }
}

fn read_style_file(path: &Path) -> Result<StyleFile> {
    let bytes = std::fs::read(path).map_err(|e| {
        Error::StyleFormat(format!("cannot read {}: {e}", path.display()))
    })?;
    serde_json::from_slice(&bytes)
        .map_err(|e| Error::StyleFormat(format!("malformed JSON in {}: {e}", path.display())))
}

/// Load and batch the voice styles at `paths`, in order.
///
/// Every file must agree with the first one on `d1`/`d2` of both components.
pub fn load_voice_styles<P: AsRef<Path>>(paths: &[P]) -> Result<VoiceStyle> {
    let Some(first_path) = paths.first() else {
        return Err(Error::StyleFormat("no voice style files given".into()));
    };

    let first = read_style_file(first_path.as_ref())?;
    let mut batch = StyleBatch::with_capacity(&first, paths.len())?;
    batch.push(&first)?;
    for path in &paths[1..] {
        let file = read_style_file(path.as_ref())?;
        batch.push(&file).map_err(|e| match e {
            Error::StyleFormat(msg) => {
                Error::StyleFormat(format!("{}: {msg}", path.as_ref().display()))
            }
            other => other,
        })?;
    }

    let style = batch.finish();
    debug!(
        voices = style.batch_size(),
        ttl = ?style.ttl.shape,
        dp = ?style.dp.shape,
        "loaded voice styles"
    );
    Ok(style)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

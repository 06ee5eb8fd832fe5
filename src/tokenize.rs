//! Unicode-scalar tokeniser.
//!
//! The model ships a flat lookup table (`unicode_indexer.json`) indexed by
//! Unicode scalar value. Each character of a normalised text maps to
//! `table[scalar]`; scalars past the end of the table map to [`UNKNOWN_ID`]
//! and are passed to the model unchanged.
//!
//! Batches are right-padded with [`PAD_ID`] and carry a `[batch, 1, max_len]`
//! float mask marking the real positions.

use std::path::Path;

use anyhow::Context;

use crate::{
    error::{Error, Result},
    tensor::Tensor,
};

/// Id used to right-pad shorter rows of a batch.
pub const PAD_ID: i64 = 0;

/// Id for scalars outside the indexer table.
pub const UNKNOWN_ID: i64 = -1;

/// Padded id matrix plus validity mask for one batch of texts.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedBatch {
    /// One row per text, each `max_len` long.
    pub ids: Vec<Vec<i64>>,
    /// Unpadded length of each row.
    pub lengths: Vec<usize>,
    /// `[batch, 1, max_len]`; 1.0 for real tokens, 0.0 for padding.
    pub mask: Tensor<f32>,
}

impl EncodedBatch {
    pub fn batch_size(&self) -> usize {
        self.ids.len()
    }

    /// Padded row length.
    pub fn max_len(&self) -> usize {
        self.ids.first().map_or(0, Vec::len)
    }

    /// Ids as a `[batch, max_len]` tensor.
    pub fn ids_tensor(&self) -> Tensor<i64> {
        Tensor {
            shape: vec![self.batch_size(), self.max_len()],
            data: self.ids.iter().flatten().copied().collect(),
        }
    }
}

/// Build a `[batch, 1, max_len]` mask with ones below each length.
///
/// `max_len` defaults to the longest entry; lengths past it are clipped.
pub fn length_to_mask(lengths: &[usize], max_len: Option<usize>) -> Tensor<f32> {
    let max_len = max_len.unwrap_or_else(|| lengths.iter().copied().max().unwrap_or(0));
    let mut mask = Tensor::zeros(vec![lengths.len(), 1, max_len]);
    for (i, &len) in lengths.iter().enumerate() {
        let row = i * max_len;
        mask.data[row..row + len.min(max_len)].fill(1.0);
    }
    mask
}

/// Maps normalised text to model token ids.
#[derive(Debug, Clone)]
pub struct TextProcessor {
    indexer: Vec<i64>,
}

impl TextProcessor {
    pub fn new(indexer: Vec<i64>) -> Self {
        Self { indexer }
    }

    /// Parse an indexer from the JSON bytes of `unicode_indexer.json`.
    pub fn from_json_slice(bytes: &[u8]) -> anyhow::Result<Self> {
        let indexer: Vec<i64> =
            serde_json::from_slice(bytes).context("Failed to parse unicode indexer")?;
        Ok(Self::new(indexer))
    }

    /// Load `unicode_indexer.json` from disk.
    pub fn from_file(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Cannot read unicode indexer: {}", path.display()))
            .map_err(|e| Error::config(path, e))?;
        Self::from_json_slice(&bytes).map_err(|e| Error::config(path, e))
    }

    /// Size of the lookup table.
    pub fn vocab_len(&self) -> usize {
        self.indexer.len()
    }

    /// Token id for one character.
    pub fn char_to_id(&self, c: char) -> i64 {
        self.indexer.get(c as usize).copied().unwrap_or(UNKNOWN_ID)
    }

    /// Encode one text without padding.
    pub fn encode(&self, text: &str) -> Vec<i64> {
        text.chars().map(|c| self.char_to_id(c)).collect()
    }

    /// Encode a batch, right-padding every row to the longest one.
    pub fn process<S: AsRef<str>>(&self, texts: &[S]) -> EncodedBatch {
        let rows: Vec<Vec<i64>> = texts.iter().map(|t| self.encode(t.as_ref())).collect();
        let lengths: Vec<usize> = rows.iter().map(Vec::len).collect();
        let max_len = lengths.iter().copied().max().unwrap_or(0);

        let ids = rows
            .into_iter()
            .map(|mut row| {
                row.resize(max_len, PAD_ID);
                row
            })
            .collect();

        EncodedBatch { ids, mask: length_to_mask(&lengths, Some(max_len)), lengths }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

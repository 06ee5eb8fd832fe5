//! Model sessions: the seam between the pipeline and the neural executor.
//!
//! The pipeline only needs "run these named inputs, give me the output
//! tensor". [`ModelSession`] captures that; [`OrtSession`] implements it on
//! ONNX Runtime. Sessions are `Send` but are never called concurrently: the
//! [`Synthesizer`](crate::Synthesizer) owns them behind one lock.

use std::{borrow::Cow, path::Path};

use anyhow::{anyhow, Context, Result};
use ort::session::{builder::GraphOptimizationLevel, Session, SessionInputValue, SessionInputs};

use crate::{
    config::Acceleration,
    error::{self, Error},
    tensor::Tensor,
};

/// A named model input.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelInput {
    F32(Tensor<f32>),
    I64(Tensor<i64>),
}

impl From<Tensor<f32>> for ModelInput {
    fn from(t: Tensor<f32>) -> Self {
        ModelInput::F32(t)
    }
}

impl From<Tensor<i64>> for ModelInput {
    fn from(t: Tensor<i64>) -> Self {
        ModelInput::I64(t)
    }
}

impl ModelInput {
    pub fn shape(&self) -> &[usize] {
        match self {
            ModelInput::F32(t) => &t.shape,
            ModelInput::I64(t) => &t.shape,
        }
    }
}

/// One loaded model.
///
/// Implementations return the model's first output as an `f32` tensor.
pub trait ModelSession: Send {
    fn run(&mut self, inputs: Vec<(&'static str, ModelInput)>) -> Result<Tensor<f32>>;
}

impl<S: ModelSession + ?Sized> ModelSession for Box<S> {
    fn run(&mut self, inputs: Vec<(&'static str, ModelInput)>) -> Result<Tensor<f32>> {
        (**self).run(inputs)
    }
}

/// The four models of the pipeline.
pub struct ModelSessions<S> {
    pub duration_predictor: S,
    pub text_encoder: S,
    pub vector_estimator: S,
    pub vocoder: S,
}

// ─────────────────────────────────────────────────────────────────────────────
// ONNX Runtime implementation
// ─────────────────────────────────────────────────────────────────────────────

/// A model running on ONNX Runtime.
pub struct OrtSession {
    session: Session,
}

fn session_builder(acceleration: Acceleration) -> error::Result<ort::session::builder::SessionBuilder> {
    if acceleration != Acceleration::Cpu {
        return Err(Error::UnsupportedAcceleration(acceleration));
    }
    let setup = |e: String| Error::config("<onnxruntime>", anyhow!(e));
    Session::builder()
        .map_err(|e| setup(format!("Failed to create ORT session builder: {e}")))?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(|e| setup(format!("Failed to set optimization level: {e}")))
}

impl OrtSession {
    /// Load an ONNX model from disk.
    pub fn from_file(path: &Path, acceleration: Acceleration) -> error::Result<Self> {
        let session = session_builder(acceleration)?
            .commit_from_file(path)
            .with_context(|| format!("Cannot load ONNX model: {}", path.display()))
            .map_err(|e| Error::config(path, e))?;
        Ok(Self { session })
    }

    /// Load an ONNX model from an in-memory buffer (bundled assets).
    pub fn from_memory(name: &str, bytes: &[u8], acceleration: Acceleration) -> error::Result<Self> {
        let session = session_builder(acceleration)?
            .commit_from_memory(bytes)
            .with_context(|| format!("Cannot load ONNX model '{name}' from memory"))
            .map_err(|e| Error::config(name, e))?;
        Ok(Self { session })
    }
}

fn to_ort_value(name: &str, input: ModelInput) -> Result<SessionInputValue<'static>> {
    let value = match input {
        ModelInput::F32(t) => ort::value::Tensor::<f32>::from_array((t.shape, t.data))
            .with_context(|| format!("Failed to build {name} tensor"))?
            .into_dyn(),
        ModelInput::I64(t) => ort::value::Tensor::<i64>::from_array((t.shape, t.data))
            .with_context(|| format!("Failed to build {name} tensor"))?
            .into_dyn(),
    };
    Ok(SessionInputValue::Owned(value))
}

impl ModelSession for OrtSession {
    fn run(&mut self, inputs: Vec<(&'static str, ModelInput)>) -> Result<Tensor<f32>> {
        let mut values: Vec<(Cow<'_, str>, SessionInputValue<'_>)> = Vec::with_capacity(inputs.len());
        for (name, input) in inputs {
            values.push((Cow::Borrowed(name), to_ort_value(name, input)?));
        }

        let outputs = self
            .session
            .run(SessionInputs::from(values))
            .context("ONNX inference failed")?;

        // Output 0 is the result for every model in the pipeline.
        let (shape, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .context("Failed to extract output tensor")?;
        let shape: Vec<usize> = shape.iter().map(|&d| d as usize).collect();
        Tensor::new(shape, data.to_vec())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gpu_is_unsupported() {
        let err = OrtSession::from_file(Path::new("model.onnx"), Acceleration::Gpu).err().unwrap();
        assert!(matches!(err, Error::UnsupportedAcceleration(Acceleration::Gpu)));
    }

    #[test]
    fn test_input_conversions() {
        let ids: ModelInput = Tensor::new(vec![1, 3], vec![1i64, 2, 3]).unwrap().into();
        let mask: ModelInput = Tensor::new(vec![1, 1, 3], vec![1.0f32; 3]).unwrap().into();
        assert!(matches!(ids, ModelInput::I64(_)));
        assert!(matches!(mask, ModelInput::F32(_)));
        assert_eq!(mask.shape(), &[1, 1, 3]);
    }
}

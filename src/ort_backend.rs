//! ONNX Runtime inference engine wrapper.

use std::path::PathBuf;

use anyhow::{Context, Result};
use ndarray::{Array, IxDyn};
use ort::session::Session;
use ort::value::Tensor;
use regex::Regex;

#[cfg(any(feature = "cuda", feature = "tensorrt"))]
use ort::execution_providers as ep;

/// Execution provider selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrtEP {
    CPU,
    CUDA(i32),
    Trt(i32),
}

pub struct OrtConfig {
    pub model: PathBuf,
    pub ep: OrtEP,
}

/// Wraps an ort session together with the model's I/O names and the
/// class-name table read from the ONNX metadata.
pub struct OrtBackend {
    session: Session,
    ep: OrtEP,
    input_name: String,
    output_name: String,
    names: Option<Vec<String>>,
}

impl OrtBackend {
    pub fn build(config: OrtConfig) -> Result<Self> {
        let builder = Session::builder().context("failed to create ORT session builder")?;

        let builder = match config.ep {
            OrtEP::CPU => builder,
            #[cfg(feature = "cuda")]
            OrtEP::CUDA(device_id) => builder
                .with_execution_providers([ep::CUDAExecutionProvider::default()
                    .with_device_id(device_id)
                    .build()])
                .context("failed to register the CUDA execution provider")?,
            #[cfg(feature = "tensorrt")]
            OrtEP::Trt(device_id) => builder
                .with_execution_providers([ep::TensorRTExecutionProvider::default()
                    .with_device_id(device_id)
                    .build()])
                .context("failed to register the TensorRT execution provider")?,
            #[cfg(not(feature = "cuda"))]
            OrtEP::CUDA(_) => {
                anyhow::bail!("built without the `cuda` feature, cannot use --cuda")
            }
            #[cfg(not(feature = "tensorrt"))]
            OrtEP::Trt(_) => {
                anyhow::bail!("built without the `tensorrt` feature, cannot use --trt")
            }
        };

        let session = builder
            .commit_from_file(&config.model)
            .with_context(|| format!("failed to load ONNX model: {}", config.model.display()))?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .context("model has no inputs")?;
        let output_name = session
            .outputs
            .first()
            .map(|o| o.name.clone())
            .context("model has no outputs")?;

        let names = Self::fetch_names(&session);

        Ok(Self {
            session,
            ep: config.ep,
            input_name,
            output_name,
            names,
        })
    }

    /// Class names from the exporter metadata, e.g. `{0: 'person', 1: 'bicycle', ...}`.
    fn fetch_names(session: &Session) -> Option<Vec<String>> {
        let metadata = session.metadata().ok()?;
        let raw = metadata.custom("names").ok()??;
        let re = Regex::new(r#"['"]([^'"]+)['"]"#).ok()?;
        let names: Vec<String> = re
            .captures_iter(&raw)
            .map(|cap| cap[1].to_string())
            .collect();
        if names.is_empty() {
            None
        } else {
            Some(names)
        }
    }

    /// Run one NCHW f32 tensor through the model, return the first output.
    pub fn run(&mut self, xs: Array<f32, IxDyn>) -> Result<Array<f32, IxDyn>> {
        let shape: Vec<usize> = xs.shape().to_vec();
        let (data, _) = xs.into_raw_vec_and_offset();
        let tensor = Tensor::from_array((shape, data.into_boxed_slice()))
            .context("failed to create input tensor")?
            .into_dyn();

        let outputs = self
            .session
            .run(ort::inputs![self.input_name.as_str() => tensor])
            .context("inference failed")?;

        let (out_shape, out_data) = outputs[self.output_name.as_str()]
            .try_extract_tensor::<f32>()
            .context("failed to extract output tensor")?;

        let dims: Vec<usize> = out_shape.iter().map(|&d| d as usize).collect();
        Array::from_shape_vec(IxDyn(&dims), out_data.to_vec())
            .context("output tensor has inconsistent shape")
    }

    pub fn ep(&self) -> OrtEP {
        self.ep
    }

    pub fn names(&self) -> Option<&Vec<String>> {
        self.names.as_ref()
    }

    pub fn input_name(&self) -> &str {
        &self.input_name
    }

    pub fn output_name(&self) -> &str {
        &self.output_name
    }
}

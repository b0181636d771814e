//! Options for building the ONNX Runtime segmenter.

use anyhow::{bail, Result};
use crate::common::{InferenceDevice, ModelConfig};

#[derive(Debug, Clone)]
pub struct ConfigOrt {
    pub onnx_path: String,
    pub ort_lib_path: String,
    pub device: InferenceDevice,
    /// Side of the square model input.
    pub model_size: u32,
    pub num_dry_run: usize,

    pub conf: f32,
    pub iou: f32,
}

impl Default for ConfigOrt {
    fn default() -> Self {
        Self {
            onnx_path: String::new(),
            ort_lib_path: String::new(),
            device: InferenceDevice::CPU,
            model_size: 640,
            num_dry_run: 1,

            conf: 0.25,
            iou: 0.45,
        }
    }
}

impl ConfigOrt {
    pub fn new() -> Self {
        Default::default()
    }

    /// Runtime options derived from the model section of the settings.
    pub fn from_model_config(config: &ModelConfig) -> Result<Self> {
        Ok(Self::new()
            .with_model(&config.weights_path)?
            .with_ort_lib_path(&config.ort_lib_path)?
            .with_device(config.inference_device)
            .with_model_size(config.input_size)?
            .with_conf(config.conf_threshold)
            .with_iou(config.iou_threshold))
    }

    pub fn with_model(mut self, onnx_path: &str) -> Result<Self> {
        if onnx_path.is_empty() {
            bail!("Model path is empty");
        }
        self.onnx_path = onnx_path.to_string();
        Ok(self)
    }

    pub fn with_ort_lib_path(mut self, ort_lib_path: &str) -> Result<Self> {
        self.ort_lib_path = ort_lib_path.to_string();
        Ok(self)
    }

    pub fn with_device(mut self, device_type: InferenceDevice) -> Self {
        self.device = device_type;
        self
    }

    /// YOLO strides require a multiple of 32.
    pub fn with_model_size(mut self, n: u32) -> Result<Self> {
        if n == 0 || n % 32 != 0 {
            bail!("Model input size must be a positive multiple of 32, got {}", n);
        }
        self.model_size = n;
        Ok(self)
    }

    pub fn with_conf(mut self, x: f32) -> Self {
        self.conf = x;
        self
    }

    pub fn with_iou(mut self, x: f32) -> Self {
        self.iou = x;
        self
    }
}

use crate::common::inference_device::InferenceDevice;

#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub weights_path: String,
    pub ort_lib_path: String,
    pub inference_device: InferenceDevice,
    /// Square side of the model input, in pixels.
    pub input_size: u32,
    pub conf_threshold: f32,
    pub iou_threshold: f32,
    /// Fail requests when the forward pass fails instead of answering with no detections.
    pub strict_inference: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            weights_path: "models/best.onnx".to_string(),
            ort_lib_path: "libonnxruntime.so".to_string(),
            inference_device: InferenceDevice::CPU,
            input_size: 640,
            conf_threshold: 0.25,
            iou_threshold: 0.45,
            strict_inference: false,
        }
    }
}

impl ModelConfig {
    pub fn new(weights_path: String, ort_lib_path: String,
               inference_device: InferenceDevice, input_size: u32,
               conf_threshold: f32, iou_threshold: f32) -> Self {
        Self {
            weights_path,
            ort_lib_path,
            inference_device,
            input_size,
            conf_threshold,
            iou_threshold,
            ..Default::default()
        }
    }

    pub fn with_strict_inference(mut self, strict: bool) -> Self {
        self.strict_inference = strict;
        self
    }
}

impl std::fmt::Display for ModelConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Weights File Path: {}\n\
        OnnxRuntime Lib Path: {}\n\
        Inference Device: {}\n\
        Model Input Resolution: {}x{}\n\
        Detection Threshold: {}\n\
        IoU Threshold: {}",
               self.weights_path, self.ort_lib_path, self.inference_device,
               self.input_size, self.input_size, self.conf_threshold, self.iou_threshold)
    }
}

use std::path::PathBuf;
use clap::Parser;
use crate::common::{InferenceDevice, ModelConfig};

/// Service configuration. Every flag can also be set through the environment.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Dental pathology detection service", long_about = None)]
pub struct Settings {
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    #[arg(long, env = "PORT", default_value_t = 8000)]
    pub port: u16,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(long, env = "DEBUG", default_value_t = false, action = clap::ArgAction::Set,
          value_parser = clap::builder::FalseyValueParser::new())]
    pub debug: bool,

    /// Comma separated list of allowed origins
    #[arg(
        long,
        env = "CORS_ORIGINS",
        default_value = "http://localhost:3000,http://localhost:3001,http://127.0.0.1:3000"
    )]
    pub cors_origins: String,

    /// ONNX export of the segmentation model
    #[arg(long, env = "MODEL_PATH", default_value = "models/best.onnx", value_name = "FILE")]
    pub model_path: String,

    /// ONNX Runtime shared library, loaded at startup
    #[arg(long, env = "ORT_LIB_PATH", default_value = "libonnxruntime.so", value_name = "FILE")]
    pub ort_lib_path: String,

    /// `cpu`, `cuda` or `cuda:<device id>`
    #[arg(long, env = "INFERENCE_DEVICE", default_value = "cpu")]
    pub inference_device: InferenceDevice,

    #[arg(long, env = "MODEL_INPUT_SIZE", default_value_t = 640)]
    pub model_input_size: u32,

    #[arg(long = "conf-threshold", env = "MODEL_CONF_THRESHOLD", default_value_t = 0.25)]
    pub conf_threshold: f32,

    #[arg(long = "iou-threshold", env = "MODEL_IOU_THRESHOLD", default_value_t = 0.45)]
    pub iou_threshold: f32,

    /// Scratch directory for uploads being analyzed
    #[arg(long, env = "UPLOAD_DIR", default_value = "uploads", value_name = "DIR")]
    pub upload_dir: PathBuf,

    /// Upload limit in bytes
    #[arg(long, env = "MAX_FILE_SIZE", default_value_t = 52_428_800)]
    pub max_file_size: u64,

    /// Answer 500 instead of an empty prediction list when the model fails
    #[arg(long, env = "STRICT_INFERENCE", default_value_t = false, action = clap::ArgAction::Set,
          value_parser = clap::builder::FalseyValueParser::new())]
    pub strict_inference: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self::parse_from(["dent-detect-server"])
    }
}

impl Settings {
    pub fn cors_origins(&self) -> Vec<String> {
        self.cors_origins
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn model_config(&self) -> ModelConfig {
        ModelConfig::new(
            self.model_path.clone(),
            self.ort_lib_path.clone(),
            self.inference_device,
            self.model_input_size,
            self.conf_threshold,
            self.iou_threshold,
        )
        .with_strict_inference(self.strict_inference)
    }

    /// Upload limit in megabytes, as shown in error messages.
    pub fn max_file_size_mb(&self) -> f64 {
        self.max_file_size as f64 / 1024.0 / 1024.0
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

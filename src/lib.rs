mod utils;
pub mod common;
pub mod data;
pub mod dataset;
pub mod detection_processing;
pub mod detection_runners;
pub mod error;
pub mod server;
pub mod settings;

pub use crate::common::{DentBox, DentDetection, ModelConfig, PathologyClass};
pub use crate::detection_processing::mask_to_polygon;
pub use crate::detection_runners::{MockDetector, OrtSegmenter, Predictor};
pub use crate::error::InferenceError;
pub use crate::settings::Settings;

mod config_ort;

pub use config_ort::ConfigOrt;

pub use crate::detection_runners::ort_detector::input_wrapper::{Xs, X};

pub(crate) const CROSS_MARK: &str = "❌";

use std::path::Path;
use crate::common::{DentDetection, ModelConfig};
use crate::data::ConfigOrt;
use crate::detection_runners::inference_process::InferenceProcess;
use crate::detection_runners::{MockDetector, OrtSegmenter};
use crate::error::InferenceError;

/// A loaded segmentation model that reads an image from disk.
pub trait Segment: std::fmt::Debug + Send + Sync {
    fn segment(&self, image_path: &Path, conf: f32, iou: f32) -> Result<Vec<DentDetection>, InferenceError>;
}

impl Segment for OrtSegmenter {
    fn segment(&self, image_path: &Path, conf: f32, iou: f32) -> Result<Vec<DentDetection>, InferenceError> {
        self.predict(image_path, conf, iou)
    }
}

/// The model behind `/api/analyze`, chosen once at startup.
#[derive(Debug)]
pub enum Predictor {
    Onnx {
        segmenter: Box<dyn Segment>,
        conf_threshold: f32,
        iou_threshold: f32,
        strict: bool,
    },
    Mock(MockDetector),
}

impl Predictor {
    /// Loads the ONNX model, falling back to the mock when the weights are missing or
    /// fail to load.
    pub fn load(config: &ModelConfig) -> Self {
        if !Path::new(&config.weights_path).exists() {
            log::warn!("Model not found at {}. Using mock predictions.", config.weights_path);
            return Self::mock();
        }

        let segmenter = ConfigOrt::from_model_config(config).and_then(OrtSegmenter::new);
        match segmenter {
            Ok(segmenter) => {
                log::info!("Model loaded successfully from {}", config.weights_path);
                Self::Onnx {
                    segmenter: Box::new(segmenter),
                    conf_threshold: config.conf_threshold,
                    iou_threshold: config.iou_threshold,
                    strict: config.strict_inference,
                }
            }
            Err(err) => {
                log::warn!("Error loading model: {:#}. Using mock predictions.", err);
                Self::mock()
            }
        }
    }

    pub fn mock() -> Self {
        Self::Mock(MockDetector::new())
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Onnx { .. } => "onnx",
            Self::Mock(_) => "mock",
        }
    }

    /// Detections for the image stored at `image_path`.
    ///
    /// A failed forward pass yields an empty list unless strict inference is enabled.
    pub fn predict(&self, image_path: &Path) -> Result<Vec<DentDetection>, InferenceError> {
        match self {
            Self::Mock(mock) => Ok(mock.predict()),
            Self::Onnx { segmenter, conf_threshold, iou_threshold, strict } => {
                match segmenter.segment(image_path, *conf_threshold, *iou_threshold) {
                    Ok(detections) => {
                        detections.iter().for_each(DentDetection::log_detection);
                        Ok(detections)
                    }
                    Err(err) if !*strict => {
                        log::error!("Inference failed for {}: {}", image_path.display(), err);
                        Ok(Vec::new())
                    }
                    Err(err) => Err(err),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_weights_fall_back_to_mock() {
        let config = ModelConfig {
            weights_path: "does/not/exist.onnx".to_string(),
            ..Default::default()
        };
        let predictor = Predictor::load(&config);
        assert_eq!(predictor.kind(), "mock");

        let detections = predictor.predict(Path::new("ignored.png")).unwrap();
        assert!((1..=5).contains(&detections.len()));
    }

    #[derive(Debug)]
    struct Broken;

    impl Segment for Broken {
        fn segment(&self, _: &Path, _: f32, _: f32) -> Result<Vec<DentDetection>, InferenceError> {
            Err(InferenceError::OutputShape("no outputs".to_string()))
        }
    }

    fn broken(strict: bool) -> Predictor {
        Predictor::Onnx { segmenter: Box::new(Broken), conf_threshold: 0.25, iou_threshold: 0.45, strict }
    }

    #[test]
    fn failures_are_swallowed_unless_strict() {
        assert!(broken(false).predict(Path::new("x.png")).unwrap().is_empty());
        assert!(matches!(
            broken(true).predict(Path::new("x.png")),
            Err(InferenceError::OutputShape(_))
        ));
    }
}

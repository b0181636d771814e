pub mod inference_process;
pub mod mock_detector;
pub mod ort_detector;
pub mod predictor;

pub use mock_detector::MockDetector;
pub use ort_detector::*;
pub use predictor::{Predictor, Segment};

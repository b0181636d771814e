use serde::{Deserialize, Serialize};
use crate::common::{DentBox, PathologyClass};
use crate::utils::round_to;

/// Decimal places kept for confidences in responses.
const CONFIDENCE_PRECISION: i32 = 6;

/// One pathology instance found in an image.
///
/// Polygon and box coordinates are normalized by the original image size, so they stay
/// valid whatever resolution the client renders at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DentDetection {
    pub class_id: u8,
    pub class_name: String,
    pub confidence: f32,
    /// Flat `[x0, y0, x1, y1, ...]` outline.
    pub polygon: Vec<f32>,
    pub bbox: DentBox,
}

impl DentDetection {
    pub fn new(class: PathologyClass, confidence: f32, polygon: Vec<f32>, bbox: DentBox) -> Self {
        Self {
            class_id: class.id(),
            class_name: class.name().to_string(),
            confidence: round_to(confidence, CONFIDENCE_PRECISION),
            polygon,
            bbox,
        }
    }

    /// Builds a detection whose box is derived from its polygon.
    pub fn from_polygon(class: PathologyClass, confidence: f32, polygon: Vec<f32>) -> Self {
        let bbox = DentBox::from_polygon(&polygon);
        Self::new(class, confidence, polygon, bbox)
    }

    pub fn vertex_count(&self) -> usize {
        self.polygon.len() / 2
    }

    pub fn log_detection(&self) {
        log::debug!(
            "Detection: Class: {} ({}), BBox: {:?}, Vertices: {}, Confidence: {:.2}",
            self.class_name, self.class_id, self.bbox, self.vertex_count(), self.confidence
        );
    }
}

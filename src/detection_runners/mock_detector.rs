//! Synthetic detections for running the service without trained weights.

use std::f32::consts::TAU;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use crate::common::{DentDetection, PathologyClass, NUM_CLASSES};
use crate::utils::round_to;

pub const MIN_DETECTIONS: usize = 1;
pub const MAX_DETECTIONS: usize = 5;
pub const MIN_VERTICES: usize = 8;
pub const MAX_VERTICES: usize = 16;
/// Every generated coordinate lies in `[COORD_MIN, COORD_MAX]`.
pub const COORD_MIN: f32 = 0.1;
pub const COORD_MAX: f32 = 0.9;

#[derive(Debug)]
pub struct MockDetector {
    rng: Mutex<StdRng>,
}

impl Default for MockDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDetector {
    pub fn new() -> Self {
        Self { rng: Mutex::new(StdRng::from_entropy()) }
    }

    /// Deterministic output for a given seed.
    pub fn with_seed(seed: u64) -> Self {
        Self { rng: Mutex::new(StdRng::seed_from_u64(seed)) }
    }

    pub fn predict(&self) -> Vec<DentDetection> {
        let mut rng = self.rng.lock();
        let count = rng.gen_range(MIN_DETECTIONS..=MAX_DETECTIONS);

        let detections: Vec<DentDetection> = (0..count)
            .map(|_| {
                let class = PathologyClass::ALL[rng.gen_range(0..NUM_CLASSES)];
                let confidence = rng.gen_range(0.5..=0.95);
                let polygon = random_outline(&mut *rng);
                DentDetection::from_polygon(class, confidence, polygon)
            })
            .collect();

        log::debug!("Generated {} mock detections", detections.len());
        detections
    }
}

/// A jittered ellipse, vertices in angle order so the outline never self-intersects.
fn random_outline<R: Rng>(rng: &mut R) -> Vec<f32> {
    let n = rng.gen_range(MIN_VERTICES..=MAX_VERTICES);
    let cx = rng.gen_range(0.3..0.7);
    let cy = rng.gen_range(0.3..0.7);
    let rx = rng.gen_range(0.05..0.2);
    let ry = rng.gen_range(0.05..0.2);
    let step = TAU / n as f32;

    let mut polygon = Vec::with_capacity(n * 2);
    for i in 0..n {
        let angle = i as f32 * step + rng.gen_range(-0.3..0.3) * step;
        let radius = rng.gen_range(0.7..=1.0);
        let x = (cx + rx * radius * angle.cos()).clamp(COORD_MIN, COORD_MAX);
        let y = (cy + ry * radius * angle.sin()).clamp(COORD_MIN, COORD_MAX);
        polygon.push(round_to(x, 6));
        polygon.push(round_to(y, 6));
    }
    polygon
}

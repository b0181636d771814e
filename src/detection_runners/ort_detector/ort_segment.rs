use std::path::Path;
use anyhow::Result;
use image::RgbImage;
use ndarray::{s, Array2, ArrayView2, ArrayView3, Axis, Ix2, Ix3};
use rayon::prelude::*;
use regex::Regex;

use crate::common::{DentBox, DentDetection, PathologyClass, NUM_CLASSES};
use crate::data::{ConfigOrt, Xs};
use crate::detection_processing::{box_to_polygon, mask_to_polygon};
use crate::detection_runners::image_ops::{self, Letterbox};
use crate::detection_runners::inference_process::InferenceProcess;
use crate::detection_runners::nms::{nms, Nms};
use crate::detection_runners::ort_detector::OrtEngine;
use crate::error::InferenceError;

/// Upper bound on detections kept per image after suppression.
pub const MAX_DETECTIONS: usize = 300;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub conf: f32,
    pub iou: f32,
}

/// YOLOv8/11 instance segmentation (or plain detection) on ONNX Runtime.
#[derive(Debug)]
pub struct OrtSegmenter {
    engine: OrtEngine,
    nc: usize,
    size: u32,
    thresholds: Thresholds,
}

impl InferenceProcess for OrtSegmenter {
    type Input = RgbImage;
    type Meta = Letterbox;
    type Thresholds = Thresholds;
    type Output = Vec<DentDetection>;

    fn new(options: ConfigOrt) -> Result<Self> {
        let engine = OrtEngine::new(&options)?;

        // Class count follows the model metadata when it carries names
        let nc = match Self::fetch_names(&engine) {
            Some(names) => {
                Self::check_names(&names);
                names.len()
            }
            None => {
                log::warn!("Model metadata has no class names, assuming {} classes", NUM_CLASSES);
                NUM_CLASSES
            }
        };

        let segmenter = Self {
            engine,
            nc,
            size: options.model_size,
            thresholds: Thresholds { conf: options.conf, iou: options.iou },
        };

        for _ in 0..options.num_dry_run {
            let blank = RgbImage::new(segmenter.size, segmenter.size);
            segmenter.run(blank, &segmenter.thresholds)?;
        }

        log::info!(
            "Segmenter ready | Input: {}x{} | Classes: {} | Outputs: {:?}",
            segmenter.size,
            segmenter.size,
            segmenter.nc,
            segmenter.engine.out_names(),
        );

        Ok(segmenter)
    }

    fn preprocess(&self, x: Self::Input) -> Result<(Xs, Letterbox)> {
        let (x, letterbox) = image_ops::preprocess(x, self.size)?;
        Ok((vec![x], letterbox))
    }

    fn inference(&self, xs: Xs) -> Result<Xs> {
        self.engine.engine_run(xs)
    }

    fn postprocess(&self, xs: Xs, letterbox: &Letterbox, thresh: &Thresholds) -> Result<Vec<DentDetection>> {
        let mut preds = None;
        let mut protos = None;
        for x in xs.iter() {
            match x.unbatched_shape().len() {
                2 => preds = Some(x.view().into_shape_with_order(x.unbatched_shape())?.into_dimensionality::<Ix2>()?),
                3 => protos = Some(x.view().into_shape_with_order(x.unbatched_shape())?.into_dimensionality::<Ix3>()?),
                _ => {}
            }
        }
        let Some(preds) = preds else {
            return Err(InferenceError::OutputShape(format!(
                "no prediction tensor among outputs {:?}",
                xs.iter().map(|x| x.shape().to_vec()).collect::<Vec<_>>()
            ))
            .into());
        };

        decode_output(preds, protos, self.nc, letterbox, thresh)
    }
}

impl OrtSegmenter {
    /// Runs the model on the image at `image_path`.
    ///
    /// Instances that cannot be shaped into a detection are logged and skipped; only a
    /// failure of the call as a whole is returned as an error.
    pub fn predict(&self, image_path: &Path, conf: f32, iou: f32) -> Result<Vec<DentDetection>, InferenceError> {
        let image = image::open(image_path)
            .map_err(|source| InferenceError::ImageLoad {
                path: image_path.display().to_string(),
                source,
            })?
            .into_rgb8();
        self.predict_image(image, conf, iou)
    }

    pub fn predict_image(&self, image: RgbImage, conf: f32, iou: f32) -> Result<Vec<DentDetection>, InferenceError> {
        self.forward(image, &Thresholds { conf, iou })
            .map_err(|err| match err.downcast::<InferenceError>() {
                Ok(err) => err,
                Err(err) => InferenceError::Runtime(err),
            })
    }

    fn fetch_names(engine: &OrtEngine) -> Option<Vec<String>> {
        // String format: `{0: 'Abrasion', 1: 'Filling', 2: 'Crown', 3: 'Caries Class 1', ...}`
        engine.try_fetch("names").and_then(|names| parse_names(&names))
    }

    /// Detections always carry the fixed class table; a model trained on something else
    /// still runs but its labels will be wrong.
    fn check_names(names: &[String]) {
        let expected: Vec<&str> = PathologyClass::ALL.iter().map(|c| c.name()).collect();
        if names.len() != expected.len() || names.iter().zip(&expected).any(|(a, b)| a != b) {
            log::warn!("Model class names {:?} differ from the pathology table {:?}", names, expected);
        }
    }
}

pub(crate) fn parse_names(raw: &str) -> Option<Vec<String>> {
    let re = Regex::new(r#"(['"])([-()\w '"]+)(['"])"#).ok()?;
    let mut names_ = vec![];
    for (_, [_, name, _]) in re.captures_iter(raw).map(|x| x.extract()) {
        names_.push(name.to_string());
    }
    if names_.is_empty() { None } else { Some(names_) }
}

/// One anchor that passed the confidence filter, in model-input pixels.
#[derive(Debug, Clone)]
struct Candidate {
    bbox: DentBox,
    confidence: f32,
    class_id: usize,
    coeffs: Vec<f32>,
}

impl Nms for Candidate {
    fn iou(&self, other: &Self) -> f32 {
        self.bbox.iou(&other.bbox)
    }

    fn confidence(&self) -> f32 {
        self.confidence
    }

    fn class_id(&self) -> usize {
        self.class_id
    }
}

/// Turns raw YOLO head output into detections for the original image.
///
/// # Arguments
///
/// * `preds` - `[4 + nc + nm, anchors]` (or its transpose): `cx, cy, w, h`, class scores,
///   mask coefficients.
/// * `protos` - `[nm, mh, mw]` prototype masks; `None` for detect-only models.
/// * `nc` - Number of class score rows.
/// * `letterbox` - How the original image was placed in the model input.
pub(crate) fn decode_output(
    preds: ArrayView2<f32>,
    protos: Option<ArrayView3<f32>>,
    nc: usize,
    letterbox: &Letterbox,
    thresh: &Thresholds,
) -> Result<Vec<DentDetection>> {
    let nm = protos.map(|p| p.len_of(Axis(0))).unwrap_or(0);
    let channels = 4 + nc + nm;
    let preds = if preds.nrows() == channels {
        preds
    } else if preds.ncols() == channels {
        preds.reversed_axes()
    } else {
        return Err(InferenceError::OutputShape(format!(
            "prediction shape {:?} does not match 4 box + {} class + {} mask rows",
            preds.shape(),
            nc,
            nm
        ))
        .into());
    };

    let mut candidates: Vec<Candidate> = preds
        .axis_iter(Axis(1))
        .filter_map(|anchor| {
            let (class_id, &confidence) = anchor
                .slice(s![4..4 + nc])
                .into_iter()
                .enumerate()
                .max_by(|a, b| a.1.total_cmp(b.1))?;
            if confidence <= thresh.conf {
                return None;
            }
            Some(Candidate {
                bbox: DentBox::from_cxcy_wh(anchor[0], anchor[1], anchor[2], anchor[3]),
                confidence,
                class_id,
                coeffs: anchor.slice(s![4 + nc..]).to_vec(),
            })
        })
        .collect();

    nms(&mut candidates, thresh.iou);
    candidates.truncate(MAX_DETECTIONS);

    let orig_shape = (letterbox.height_src, letterbox.width_src);
    let (width, height) = (letterbox.width_src as f32, letterbox.height_src as f32);

    let detections = candidates
        .into_par_iter()
        .filter_map(|candidate| {
            let Some(class) = PathologyClass::from_id(candidate.class_id) else {
                log::warn!("Skipping detection with unknown class id {}", candidate.class_id);
                return None;
            };

            let [x1, y1, x2, y2] = candidate.bbox.xyxy();
            let scale = letterbox.scale;
            let pixel_box = DentBox::from_x1y1_x2y2(x1 / scale, y1 / scale, x2 / scale, y2 / scale)
                .clamp(width, height);

            match protos {
                Some(protos) => {
                    let mask = instance_mask(protos, &candidate, letterbox);
                    let polygon = match mask_to_polygon(mask.view(), orig_shape) {
                        Ok(polygon) => polygon,
                        Err(err) => {
                            log::warn!("Skipping {} instance: {:#}", class, err);
                            return None;
                        }
                    };
                    if polygon.is_empty() {
                        log::debug!("Skipping {} instance without a usable outline", class);
                        return None;
                    }
                    Some(DentDetection::from_polygon(class, candidate.confidence, polygon))
                }
                None => {
                    let xyxy = pixel_box.xyxy();
                    Some(DentDetection::new(
                        class,
                        candidate.confidence,
                        box_to_polygon(xyxy, orig_shape),
                        DentBox::from_xyxy(xyxy, orig_shape),
                    ))
                }
            }
        })
        .collect::<Vec<_>>();

    Ok(detections)
}

/// `sigmoid(coeffs . protos)` over the part of the prototype grid that covers the image,
/// zeroed outside the candidate's box.
fn instance_mask(protos: ArrayView3<f32>, candidate: &Candidate, letterbox: &Letterbox) -> Array2<f32> {
    let (_, mh, mw) = protos.dim();
    let size = letterbox.size_dst as f32;
    let (sx, sy) = (mw as f32 / size, mh as f32 / size);

    let crop_w = ((letterbox.new_w as f32 * sx).round() as usize).clamp(1, mw);
    let crop_h = ((letterbox.new_h as f32 * sy).round() as usize).clamp(1, mh);

    let mut mask = Array2::<f32>::zeros((crop_h, crop_w));
    for (k, &c) in candidate.coeffs.iter().enumerate() {
        mask.scaled_add(c, &protos.index_axis(Axis(0), k).slice(s![..crop_h, ..crop_w]));
    }

    let [x1, y1, x2, y2] = candidate.bbox.xyxy();
    let (x1, x2) = (x1 * sx, x2 * sx);
    let (y1, y2) = (y1 * sy, y2 * sy);
    for ((r, c), v) in mask.indexed_iter_mut() {
        let (r, c) = (r as f32, c as f32);
        *v = if c >= x1 && c < x2 && r >= y1 && r < y2 {
            1. / (1. + (-*v).exp())
        } else {
            0.
        };
    }

    mask
}

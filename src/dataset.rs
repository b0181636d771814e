//! Checks a YOLO segmentation dataset (images plus polygon label files) before training.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use anyhow::{bail, Context, Result};
use rayon::prelude::*;
use crate::common::NUM_CLASSES;

pub const IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "bmp"];

/// Class id followed by at least three `x y` pairs.
const MIN_LABEL_TOKENS: usize = 7;
const MIN_POLYGON_POINTS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetIssue {
    pub file: String,
    /// 1-based line in the label file, when the issue is about one object.
    pub line: Option<usize>,
    pub message: String,
}

impl DatasetIssue {
    fn file(file: impl Into<String>, message: impl Into<String>) -> Self {
        Self { file: file.into(), line: None, message: message.into() }
    }

    fn line(file: impl Into<String>, line: usize, message: impl Into<String>) -> Self {
        Self { file: file.into(), line: Some(line), message: message.into() }
    }
}

impl fmt::Display for DatasetIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "{}: Line {} - {}", self.file, line, self.message),
            None => write!(f, "{}: {}", self.file, self.message),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DatasetReport {
    pub total_images: usize,
    pub valid_images: usize,
    pub total_objects: usize,
    pub issues: Vec<DatasetIssue>,
}

impl DatasetReport {
    pub fn objects_per_image(&self) -> f64 {
        if self.valid_images == 0 {
            0.0
        } else {
            self.total_objects as f64 / self.valid_images as f64
        }
    }

    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Outcome for one image and its label file.
struct ImageCheck {
    objects: usize,
    issues: Vec<DatasetIssue>,
}

/// Validates every image in `images_dir` against its `<stem>.txt` in `labels_dir`.
///
/// Fails only when the dataset cannot be inspected at all (missing directories, no
/// images); everything else is collected into the report.
pub fn validate_dataset(images_dir: &Path, labels_dir: &Path) -> Result<DatasetReport> {
    if !images_dir.is_dir() {
        bail!("Images directory not found: {}", images_dir.display());
    }
    if !labels_dir.is_dir() {
        bail!("Labels directory not found: {}", labels_dir.display());
    }

    let images = find_images(images_dir)?;
    if images.is_empty() {
        bail!(
            "No images found in {} (supported formats: {})",
            images_dir.display(),
            IMAGE_EXTENSIONS.join(", ")
        );
    }
    log::info!("Found {} images in {}", images.len(), images_dir.display());

    let checks: Vec<ImageCheck> = images
        .par_iter()
        .map(|image| check_image(image, labels_dir))
        .collect();

    let mut report = DatasetReport { total_images: images.len(), ..Default::default() };
    for check in checks {
        if check.issues.is_empty() {
            report.valid_images += 1;
            report.total_objects += check.objects;
        }
        report.issues.extend(check.issues);
    }

    Ok(report)
}

fn find_images(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut images = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("Cannot list {}", dir.display()))? {
        let path = entry?.path();
        let is_image = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| IMAGE_EXTENSIONS.contains(&e.to_lowercase().as_str()))
            .unwrap_or(false);
        if is_image && path.is_file() {
            images.push(path);
        }
    }
    images.sort();
    Ok(images)
}

fn check_image(image_path: &Path, labels_dir: &Path) -> ImageCheck {
    let name = file_name(image_path);
    let stem = image_path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
    let label_path = labels_dir.join(format!("{}.txt", stem));

    let fail = |issue: DatasetIssue| ImageCheck { objects: 0, issues: vec![issue] };

    if !label_path.is_file() {
        return fail(DatasetIssue::file(file_name(&label_path), "Missing label"));
    }

    match image::open(image_path) {
        Ok(image) if image.width() == 0 || image.height() == 0 => {
            return fail(DatasetIssue::file(&name, "Zero-size image"))
        }
        Ok(_) => {}
        Err(err) => return fail(DatasetIssue::file(&name, format!("Invalid/corrupted image: {}", err))),
    }

    let labels = match fs::read_to_string(&label_path) {
        Ok(labels) => labels,
        Err(err) => return fail(DatasetIssue::file(&name, format!("Error reading label file: {}", err))),
    };

    let mut check = ImageCheck { objects: 0, issues: Vec::new() };
    for (i, line) in labels.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match check_label_line(line) {
            Ok(()) => check.objects += 1,
            Err(message) => check.issues.push(DatasetIssue::line(&name, i + 1, message)),
        }
    }
    check
}

/// `class x1 y1 x2 y2 ...` with the class in the pathology table and every coordinate in `[0, 1]`.
pub fn check_label_line(line: &str) -> Result<(), String> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() < MIN_LABEL_TOKENS {
        return Err("Too few coordinates (need at least 3 points)".to_string());
    }

    let class_id: i64 = parts[0]
        .parse()
        .map_err(|e| format!("Invalid number format: {} ({:?})", e, parts[0]))?;
    if class_id < 0 || class_id >= NUM_CLASSES as i64 {
        return Err(format!("Invalid class_id {} (must be 0-{})", class_id, NUM_CLASSES - 1));
    }

    let coords = parts[1..]
        .iter()
        .map(|c| c.parse::<f64>().map_err(|e| format!("Invalid number format: {} ({:?})", e, c)))
        .collect::<Result<Vec<f64>, String>>()?;
    if coords.len() % 2 != 0 {
        return Err("Odd number of coordinates".to_string());
    }
    if coords.iter().any(|c| !(0.0..=1.0).contains(c)) {
        return Err("Coordinates out of range [0, 1]".to_string());
    }

    let points = coords.len() / 2;
    if points < MIN_POLYGON_POINTS {
        return Err(format!("Polygon needs at least 3 points, got {}", points));
    }

    Ok(())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

extern crate dent_detect;

use std::fs;
use std::path::Path;
use tempfile::TempDir;
use dent_detect::dataset::{check_label_line, validate_dataset};

const GOOD_LINE: &str = "3 0.1 0.1 0.4 0.1 0.4 0.5";

fn write_image(path: &Path) {
    image::RgbImage::from_pixel(16, 16, image::Rgb([200, 180, 160])).save(path).unwrap();
}

fn dataset() -> (TempDir, std::path::PathBuf, std::path::PathBuf) {
    let root = TempDir::new().unwrap();
    let images = root.path().join("images");
    let labels = root.path().join("labels");
    fs::create_dir_all(&images).unwrap();
    fs::create_dir_all(&labels).unwrap();
    (root, images, labels)
}

#[test]
fn label_line_rules() {
    assert!(check_label_line(GOOD_LINE).is_ok());
    assert!(check_label_line("8 0 0 1 0 1 1 0 1").is_ok());

    let err = |line: &str| check_label_line(line).unwrap_err();
    assert!(err("0 0.1 0.1 0.2 0.2").contains("Too few coordinates"));
    assert!(err("9 0.1 0.1 0.4 0.1 0.4 0.5").contains("Invalid class_id 9"));
    assert!(err("-1 0.1 0.1 0.4 0.1 0.4 0.5").contains("Invalid class_id -1"));
    assert!(err("x 0.1 0.1 0.4 0.1 0.4 0.5").contains("Invalid number format"));
    assert!(err("1 0.1 0.1 0.4 0.1 0.4 abc").contains("Invalid number format"));
    assert!(err("1 0.1 0.1 0.4 0.1 0.4 0.5 0.6").contains("Odd number of coordinates"));
    assert!(err("1 0.1 0.1 1.4 0.1 0.4 0.5").contains("out of range"));
}

#[test]
fn valid_dataset_reports_objects() {
    let (_root, images, labels) = dataset();
    write_image(&images.join("a.png"));
    write_image(&images.join("b.JPG"));
    fs::write(labels.join("a.txt"), format!("{}\n\n{}\n", GOOD_LINE, GOOD_LINE)).unwrap();
    fs::write(labels.join("b.txt"), format!("{}\n", GOOD_LINE)).unwrap();
    fs::write(images.join("readme.md"), "not an image").unwrap();

    let report = validate_dataset(&images, &labels).unwrap();
    assert!(report.is_valid(), "{:?}", report.issues);
    assert_eq!(report.total_images, 2);
    assert_eq!(report.valid_images, 2);
    assert_eq!(report.total_objects, 3);
    assert_eq!(report.objects_per_image(), 1.5);
}

#[test]
fn problems_are_collected_per_file() {
    let (_root, images, labels) = dataset();
    write_image(&images.join("good.png"));
    write_image(&images.join("unlabelled.png"));
    write_image(&images.join("bad_label.png"));
    fs::write(images.join("corrupt.jpg"), b"not really a jpeg").unwrap();

    fs::write(labels.join("good.txt"), GOOD_LINE).unwrap();
    fs::write(labels.join("corrupt.txt"), GOOD_LINE).unwrap();
    fs::write(labels.join("bad_label.txt"), format!("{}\n12 0.1 0.1 0.4 0.1 0.4 0.5\n", GOOD_LINE)).unwrap();

    let report = validate_dataset(&images, &labels).unwrap();
    assert!(!report.is_valid());
    assert_eq!(report.total_images, 4);
    assert_eq!(report.valid_images, 1);
    assert_eq!(report.total_objects, 1);
    assert_eq!(report.issues.len(), 3);

    let messages: Vec<String> = report.issues.iter().map(|i| i.to_string()).collect();
    assert!(messages.iter().any(|m| m == "unlabelled.txt: Missing label"), "{:?}", messages);
    assert!(messages.iter().any(|m| m.starts_with("corrupt.jpg: Invalid/corrupted image")), "{:?}", messages);
    assert!(messages.iter().any(|m| m.starts_with("bad_label.png: Line 2 - Invalid class_id 12")), "{:?}", messages);
}

#[test]
fn missing_directories_and_empty_datasets_fail() {
    let (root, images, labels) = dataset();
    assert!(validate_dataset(&root.path().join("nope"), &labels).is_err());
    assert!(validate_dataset(&images, &root.path().join("nope")).is_err());

    let err = validate_dataset(&images, &labels).unwrap_err();
    assert!(err.to_string().contains("No images found"), "{}", err);
}

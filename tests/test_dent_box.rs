extern crate dent_detect;

use dent_detect::common::{DentBox, DentDetection, PathologyClass, NUM_CLASSES};

#[test]
fn bbox_from_pixel_corners() {
    // 200 wide, 100 high
    let bbox = DentBox::from_xyxy([20., 10., 120., 60.], (100, 200));
    assert_eq!(bbox, DentBox::new(0.1, 0.1, 0.5, 0.5));
}

#[test]
fn bbox_from_polygon_is_min_max() {
    let polygon = [0.3, 0.2, 0.8, 0.25, 0.6, 0.9, 0.15, 0.5];
    let bbox = DentBox::from_polygon(&polygon);

    let xs: Vec<f32> = polygon.iter().step_by(2).copied().collect();
    let ys: Vec<f32> = polygon.iter().skip(1).step_by(2).copied().collect();
    let min = |v: &[f32]| v.iter().copied().fold(f32::MAX, f32::min);
    let max = |v: &[f32]| v.iter().copied().fold(f32::MIN, f32::max);

    assert_eq!(bbox.x, min(&xs));
    assert_eq!(bbox.y, min(&ys));
    assert_eq!(bbox.w, max(&xs) - min(&xs));
    assert_eq!(bbox.h, max(&ys) - min(&ys));
}

#[test]
fn bbox_from_two_vertices() {
    let bbox = DentBox::from_polygon(&[0.2, 0.4, 0.6, 0.5]);
    for (got, want) in bbox.xyxy().iter().zip([0.2, 0.4, 0.6, 0.5]) {
        assert!((got - want).abs() < 1e-6, "{:?}", bbox);
    }
}

#[test]
fn short_polygons_fall_back() {
    assert_eq!(DentBox::from_polygon(&[]), DentBox::FALLBACK);
    assert_eq!(DentBox::from_polygon(&[0.5, 0.5]), DentBox::FALLBACK);
    assert_eq!(DentBox::FALLBACK, DentBox::new(0.1, 0.1, 0.2, 0.2));
}

#[test]
fn iou_of_boxes() {
    let a = DentBox::new(0., 0., 10., 10.);
    let b = DentBox::new(5., 0., 10., 10.);
    assert!((a.iou(&b) - 50. / 150.).abs() < 1e-6);
    assert_eq!(a.iou(&DentBox::new(20., 20., 5., 5.)), 0.0);
    assert_eq!(DentBox::default().iou(&DentBox::default()), 0.0);
}

#[test]
fn class_table_is_fixed() {
    let expected = [
        "Abrasion",
        "Filling",
        "Crown",
        "Caries Class 1",
        "Caries Class 2",
        "Caries Class 3",
        "Caries Class 4",
        "Caries Class 5",
        "Caries Class 6",
    ];
    assert_eq!(NUM_CLASSES, expected.len());
    for (id, name) in expected.iter().enumerate() {
        let class = PathologyClass::from_id(id).unwrap();
        assert_eq!(class.id() as usize, id);
        assert_eq!(class.name(), *name);
    }
    assert!(PathologyClass::from_id(NUM_CLASSES).is_none());

    let table = serde_json::to_value(PathologyClass::table()).unwrap();
    assert_eq!(table["0"], "Abrasion");
    assert_eq!(table["8"], "Caries Class 6");
}

#[test]
fn detection_serializes_with_rounded_confidence() {
    let det = DentDetection::from_polygon(
        PathologyClass::CariesClass2,
        0.123_456_78,
        vec![0.1, 0.1, 0.4, 0.1, 0.4, 0.3],
    );
    assert_eq!(det.class_id, 4);
    assert_eq!(det.class_name, "Caries Class 2");
    assert_eq!(det.confidence, 0.123457);
    assert_eq!(det.vertex_count(), 3);

    let json = serde_json::to_value(&det).unwrap();
    for key in ["class_id", "class_name", "confidence", "polygon", "bbox"] {
        assert!(json.get(key).is_some(), "missing {}", key);
    }
    for key in ["x", "y", "w", "h"] {
        assert!(json["bbox"].get(key).is_some(), "missing bbox.{}", key);
    }
}

//! Load -> detect -> export on ImageJ hyperstacks written to disk

use std::path::{Path, PathBuf};
use std::process::Command;

use spotfinder::{
    load_image, AxisKind, DetectionConfig, ImageData, ResultsTable, Spot, SpotDetector,
};
use test_helpers::{
    gaussian_blob_volume, imagej_description, output_path, volume_pages, write_imagej_stack,
    write_imagej_time_series, write_tiff_pages, Blob, VolumeShape,
};

const SHAPE: VolumeShape = VolumeShape {
    x: 32,
    y: 28,
    channels: 2,
    z: 7,
};

fn blobs() -> Vec<Blob> {
    vec![
        Blob {
            channel: 0,
            center: (10.0, 9.0, 3.0),
            amplitude: 2000.0,
            sigma: 1.2,
        },
        Blob {
            channel: 1,
            center: (21.0, 17.0, 3.0),
            amplitude: 2000.0,
            sigma: 1.2,
        },
        Blob {
            channel: 1,
            center: (8.0, 20.0, 4.0),
            amplitude: 2000.0,
            sigma: 1.2,
        },
    ]
}

fn write_stack(dir: &Path) -> PathBuf {
    write_stack_with_shape(dir, SHAPE)
}

fn write_stack_with_shape(dir: &Path, shape: VolumeShape) -> PathBuf {
    let path = dir.join("hyperstack.tif");
    let volume = gaussian_blob_volume(shape, &blobs(), 100.0);
    write_imagej_stack(&path, &volume).expect("write stack");
    path
}

#[test]
fn test_hyperstack_axes_and_shape() {
    let dir = tempfile::tempdir().unwrap();
    let shape = VolumeShape {
        x: 12,
        y: 10,
        channels: 2,
        z: 3,
    };
    let path = write_stack_with_shape(dir.path(), shape);

    let image = load_image(&path).unwrap();
    assert_eq!(image.pixel_type(), "uint16");
    assert_eq!(
        image.axes(),
        &[AxisKind::X, AxisKind::Y, AxisKind::Channel, AxisKind::Z]
    );
    assert_eq!(image.shape(), &[12, 10, 2, 3]);
    assert_eq!(image.channel_axis(), Some(2));

    let ImageData::U16(volume) = &image else {
        panic!("expected 16-bit samples, got {}", image.pixel_type());
    };
    let expected = gaussian_blob_volume(shape, &blobs(), 100.0);
    assert_eq!(volume.data(), &expected);
}

#[test]
fn test_page_count_mismatch_loads_as_z_stack() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mislabelled.tif");
    let shape = VolumeShape {
        x: 12,
        y: 10,
        channels: 2,
        z: 2,
    };
    let volume = gaussian_blob_volume(shape, &blobs(), 100.0);
    let pages = volume_pages(&volume);

    // Metadata claims 2 x 3 = 6 images, the file holds 4 pages
    let description = imagej_description(2, 3, 1);
    write_tiff_pages(&path, 12, 10, &pages, Some(&description)).unwrap();

    let image = load_image(&path).unwrap();
    assert_eq!(
        image.axes(),
        &[AxisKind::X, AxisKind::Y, AxisKind::Channel, AxisKind::Z]
    );
    assert_eq!(image.shape(), &[12, 10, 1, 4]);

    let ImageData::U16(loaded) = &image else {
        panic!("expected 16-bit samples, got {}", image.pixel_type());
    };
    for (p, page) in pages.iter().enumerate() {
        assert_eq!(loaded.data()[[7, 4, 0, p]], page[4 * 12 + 7]);
    }
}

#[test]
fn test_frames_become_time_axis() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("series.tif");
    let shape = VolumeShape {
        x: 24,
        y: 20,
        channels: 2,
        z: 5,
    };
    // The fourth coordinate is the frame here
    let blob = Blob {
        channel: 0,
        center: (10.0, 9.0, 2.0),
        amplitude: 2000.0,
        sigma: 1.2,
    };
    let volume = gaussian_blob_volume(shape, &[blob], 100.0);
    write_imagej_time_series(&path, &volume).unwrap();

    let image = load_image(&path).unwrap();
    assert_eq!(
        image.axes(),
        &[AxisKind::X, AxisKind::Y, AxisKind::Channel, AxisKind::Time]
    );
    assert_eq!(image.shape(), &[24, 20, 2, 5]);

    let detector = SpotDetector::new(DetectionConfig {
        threshold: 50.0,
        ..Default::default()
    })
    .unwrap();
    let mut table = ResultsTable::new();
    detector.detect_image(&image, &[0, 1], false, &mut table).unwrap();

    // Time takes part in the scan but has no column; Z is absent
    assert_eq!(
        table.spots(),
        &[Spot {
            channel: 0,
            x: 10,
            y: 9,
            z: 0
        }]
    );
}

#[test]
fn test_detect_all_channels_to_csv() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_stack(dir.path());
    let image = load_image(&path).unwrap();

    let detector = SpotDetector::new(DetectionConfig {
        threshold: 50.0,
        ..Default::default()
    })
    .unwrap();

    let mut table = ResultsTable::new();
    let found = detector.detect_image(&image, &[0, 1], false, &mut table).unwrap();
    assert_eq!(found, 3);
    assert_eq!(table.count_for_channel(0), 1);
    assert_eq!(table.count_for_channel(1), 2);

    // Channel 0 rows come before channel 1 rows
    let channels: Vec<usize> = table.iter().map(|s| s.channel).collect();
    assert_eq!(channels, vec![0, 1, 1]);

    let first = table.spots()[0];
    assert_eq!((first.x, first.y, first.z), (10, 9, 3));

    let csv_path = output_path("pipeline_spots.csv");
    let mut buffer = Vec::new();
    table.write_csv(&mut buffer).unwrap();
    std::fs::write(&csv_path, &buffer).unwrap();

    let text = std::fs::read_to_string(&csv_path).unwrap();
    let mut lines = text.lines();
    assert_eq!(lines.next(), Some("Channel,X,Y,Z"));
    assert_eq!(lines.next(), Some("0,10,9,3"));
    assert_eq!(lines.count(), 2);
}

#[test]
fn test_parallel_matches_sequential() {
    let dir = tempfile::tempdir().unwrap();
    let image = load_image(write_stack(dir.path())).unwrap();
    let detector = SpotDetector::new(DetectionConfig {
        threshold: 5.0,
        ..Default::default()
    })
    .unwrap();

    let mut sequential = ResultsTable::new();
    detector
        .detect_image(&image, &[1, 0], false, &mut sequential)
        .unwrap();
    let mut parallel = ResultsTable::new();
    detector
        .detect_image(&image, &[1, 0], true, &mut parallel)
        .unwrap();

    assert!(!sequential.is_empty());
    assert_eq!(sequential, parallel);
}

#[test]
fn test_cli_detect_writes_table() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_stack(dir.path());
    let output = dir.path().join("spots.csv");

    let status = Command::new(env!("CARGO_BIN_EXE_spot_detect"))
        .arg("detect")
        .arg(&input)
        .args(["--threshold", "50", "-o"])
        .arg(&output)
        .status()
        .expect("run spot_detect");
    assert!(status.success());

    let text = std::fs::read_to_string(&output).unwrap();
    assert!(text.starts_with("Channel,X,Y,Z\n"));
    assert_eq!(text.lines().count(), 4);
}

#[test]
fn test_cli_rejects_negative_channel() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_stack(dir.path());

    let result = Command::new(env!("CARGO_BIN_EXE_spot_detect"))
        .arg("detect")
        .arg(&input)
        .args(["--channels", "-1"])
        .output()
        .expect("run spot_detect");
    assert!(!result.status.success());

    let stderr = String::from_utf8_lossy(&result.stderr);
    assert!(stderr.contains("channel"), "stderr: {stderr}");
}

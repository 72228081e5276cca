//! Shared fixtures for spot detection tests.
//!
//! Provides synthetic image volumes with known spot positions, seeded noise,
//! ImageJ-style TIFF stack writers for loader tests, and a per-workspace
//! `test_output/` directory for artifacts worth inspecting after a run.
//!
//! Volumes use the loader layout `[X, Y, Channel, Z]` and are returned as plain
//! `ndarray` arrays so this crate does not depend on the crate under test.
//!
//! # Usage Examples
//!
//! ```rust
//! use test_helpers::{gaussian_blob_volume, Blob, VolumeShape};
//!
//! let shape = VolumeShape { x: 32, y: 32, channels: 2, z: 12 };
//! let blob = Blob { channel: 1, center: (16.0, 10.0, 6.0), amplitude: 800.0, sigma: 1.2 };
//! let volume = gaussian_blob_volume(shape, &[blob], 100.0);
//!
//! assert_eq!(volume.shape(), &[32, 32, 2, 12]);
//! assert!(volume[[16, 10, 1, 6]] > volume[[16, 10, 0, 6]]);
//! ```

use ndarray::{ArrayD, IxDyn};
use once_cell::sync::Lazy;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use std::env;
use std::fs::File;
use std::path::{Path, PathBuf};
use tiff::encoder::{colortype, TiffEncoder};
use tiff::tags::Tag;

/// Errors raised by fixture setup.
#[derive(thiserror::Error, Debug)]
pub enum TestHelperError {
    #[error("Failed to find project root: {0}")]
    ProjectRootNotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TIFF encoding failed: {0}")]
    Tiff(#[from] tiff::TiffError),
}

/// Extents of a synthetic `[X, Y, Channel, Z]` volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VolumeShape {
    pub x: usize,
    pub y: usize,
    pub channels: usize,
    pub z: usize,
}

impl VolumeShape {
    fn dims(&self) -> IxDyn {
        IxDyn(&[self.x, self.y, self.channels, self.z])
    }
}

/// An isotropic 3D Gaussian spot in one channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Blob {
    pub channel: usize,
    /// Centre as (x, y, z) in samples
    pub center: (f64, f64, f64),
    /// Peak height above background
    pub amplitude: f64,
    pub sigma: f64,
}

impl Blob {
    fn value_at(&self, x: usize, y: usize, z: usize) -> f64 {
        let dx = x as f64 - self.center.0;
        let dy = y as f64 - self.center.1;
        let dz = z as f64 - self.center.2;
        let r2 = dx * dx + dy * dy + dz * dz;
        self.amplitude * (-r2 / (2.0 * self.sigma * self.sigma)).exp()
    }
}

/// Float volume of Gaussian blobs on a flat background.
pub fn gaussian_blob_field(shape: VolumeShape, blobs: &[Blob], background: f64) -> ArrayD<f64> {
    ArrayD::from_shape_fn(shape.dims(), |idx| {
        let (x, y, c, z) = (idx[0], idx[1], idx[2], idx[3]);
        background
            + blobs
                .iter()
                .filter(|b| b.channel == c)
                .map(|b| b.value_at(x, y, z))
                .sum::<f64>()
    })
}

/// Gaussian blobs on a flat background, rounded to 16-bit samples.
pub fn gaussian_blob_volume(shape: VolumeShape, blobs: &[Blob], background: f64) -> ArrayD<u16> {
    to_u16(&gaussian_blob_field(shape, blobs, background))
}

/// Volume with every sample equal to `value`.
pub fn constant_volume(shape: VolumeShape, value: u16) -> ArrayD<u16> {
    ArrayD::from_elem(shape.dims(), value)
}

/// Add seeded Gaussian noise in place.
pub fn add_gaussian_noise(field: &mut ArrayD<f64>, std_dev: f64, seed: u64) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let noise = Normal::new(0.0, std_dev).expect("std_dev must be finite and >= 0");
    field.iter_mut().for_each(|v| *v += noise.sample(&mut rng));
}

/// Round and clamp a float field to 16-bit samples.
pub fn to_u16(field: &ArrayD<f64>) -> ArrayD<u16> {
    field.mapv(|v| v.round().clamp(0.0, 65535.0) as u16)
}

/// Split a 16-bit `[X, Y, Channel, Plane]` volume into row-major pages,
/// channel fastest, as ImageJ orders them.
pub fn volume_pages(volume: &ArrayD<u16>) -> Vec<Vec<u16>> {
    let shape = volume.shape();
    let (width, height, channels, planes) = (shape[0], shape[1], shape[2], shape[3]);

    let mut pages = Vec::with_capacity(channels * planes);
    for p in 0..planes {
        for c in 0..channels {
            let mut page = Vec::with_capacity(width * height);
            for y in 0..height {
                for x in 0..width {
                    page.push(volume[[x, y, c, p]]);
                }
            }
            pages.push(page);
        }
    }
    pages
}

/// Write 16-bit grayscale pages to a multi-page TIFF.
///
/// `description` goes into the `ImageDescription` tag of the first page and is
/// written verbatim, so it may disagree with the pages on purpose.
pub fn write_tiff_pages(
    path: &Path,
    width: usize,
    height: usize,
    pages: &[Vec<u16>],
    description: Option<&str>,
) -> Result<(), TestHelperError> {
    let mut encoder = TiffEncoder::new(File::create(path)?)?;
    for (index, page) in pages.iter().enumerate() {
        let mut image = encoder.new_image::<colortype::Gray16>(width as u32, height as u32)?;
        if let (0, Some(text)) = (index, description) {
            image.encoder().write_tag(Tag::ImageDescription, text)?;
        }
        image.write_data(page)?;
    }
    Ok(())
}

/// ImageJ `ImageDescription` for a hyperstack of the given layout.
pub fn imagej_description(channels: usize, slices: usize, frames: usize) -> String {
    format!(
        "ImageJ=1.54f\nimages={}\nchannels={channels}\nslices={slices}\nframes={frames}\nhyperstack=true\n",
        channels * slices * frames
    )
}

/// Write a 16-bit `[X, Y, Channel, Z]` volume as an ImageJ hyperstack TIFF.
///
/// Pages are written channel-fastest, then slice, with an ImageJ
/// `ImageDescription` on the first page.
pub fn write_imagej_stack(path: &Path, volume: &ArrayD<u16>) -> Result<(), TestHelperError> {
    let shape = volume.shape();
    let description = imagej_description(shape[2], shape[3], 1);
    write_tiff_pages(
        path,
        shape[0],
        shape[1],
        &volume_pages(volume),
        Some(&description),
    )
}

/// Write a 16-bit `[X, Y, Channel, Time]` volume as an ImageJ time series.
pub fn write_imagej_time_series(
    path: &Path,
    volume: &ArrayD<u16>,
) -> Result<(), TestHelperError> {
    let shape = volume.shape();
    let description = imagej_description(shape[2], 1, shape[3]);
    write_tiff_pages(
        path,
        shape[0],
        shape[1],
        &volume_pages(volume),
        Some(&description),
    )
}

/// Locate the workspace root by walking up to the `Cargo.toml` with `[workspace]`.
pub fn find_project_root() -> Result<PathBuf, TestHelperError> {
    let mut current_dir = env::current_dir().map_err(|e| {
        TestHelperError::ProjectRootNotFound(format!("Failed to get current directory: {}", e))
    })?;

    loop {
        let cargo_toml = current_dir.join("Cargo.toml");
        if cargo_toml.exists() && std::fs::read_to_string(&cargo_toml)?.contains("[workspace]") {
            return Ok(current_dir);
        }
        if !current_dir.pop() {
            break;
        }
    }

    Err(TestHelperError::ProjectRootNotFound(
        "Workspace root not found".to_string(),
    ))
}

static PROJECT_ROOT: Lazy<PathBuf> =
    Lazy::new(|| find_project_root().expect("Failed to find project root directory"));

/// `<workspace>/test_output/`, created on first use.
pub fn get_output_dir() -> PathBuf {
    let output_dir = PROJECT_ROOT.join("test_output");
    if !output_dir.exists() {
        std::fs::create_dir_all(&output_dir).expect("Failed to create output directory");
    }
    output_dir
}

/// Path of an artifact inside the test output directory.
pub fn output_path<P: AsRef<Path>>(path: P) -> PathBuf {
    get_output_dir().join(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blob_peaks_at_center() {
        let shape = VolumeShape {
            x: 20,
            y: 20,
            channels: 1,
            z: 10,
        };
        let blob = Blob {
            channel: 0,
            center: (7.0, 12.0, 5.0),
            amplitude: 1000.0,
            sigma: 1.5,
        };
        let vol = gaussian_blob_volume(shape, &[blob], 50.0);

        assert_eq!(vol[[7, 12, 0, 5]], 1050);
        assert_eq!(vol[[0, 0, 0, 0]], 50);
        assert!(vol[[8, 12, 0, 5]] < vol[[7, 12, 0, 5]]);
    }

    #[test]
    fn test_noise_is_seeded() {
        let shape = VolumeShape {
            x: 4,
            y: 4,
            channels: 1,
            z: 2,
        };
        let mut a = gaussian_blob_field(shape, &[], 10.0);
        let mut b = a.clone();
        add_gaussian_noise(&mut a, 2.0, 7);
        add_gaussian_noise(&mut b, 2.0, 7);
        assert_eq!(a, b);
        assert!(a.iter().any(|&v| v != 10.0));
    }

    #[test]
    fn test_pages_are_channel_fastest() {
        let shape = VolumeShape {
            x: 2,
            y: 2,
            channels: 2,
            z: 3,
        };
        let volume = ArrayD::from_shape_fn(shape.dims(), |idx| (10 * idx[3] + idx[2]) as u16);
        let pages = volume_pages(&volume);

        assert_eq!(pages.len(), 6);
        let firsts: Vec<u16> = pages.iter().map(|p| p[0]).collect();
        assert_eq!(firsts, vec![0, 1, 10, 11, 20, 21]);
    }

    #[test]
    fn test_imagej_description_counts_images() {
        let text = imagej_description(2, 1, 4);
        assert!(text.starts_with("ImageJ="));
        assert!(text.contains("images=8\n"));
        assert!(text.contains("frames=4\n"));
    }

    #[test]
    fn test_project_root_exists() {
        let root = find_project_root().expect("Failed to find project root");
        assert!(root.join("Cargo.toml").exists());
    }

    #[test]
    fn test_output_path() {
        let path = output_path("spots.csv");
        assert_eq!(path, get_output_dir().join("spots.csv"));
    }
}

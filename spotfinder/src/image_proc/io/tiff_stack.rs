//! Multi-page TIFF stacks with ImageJ hyperstack metadata.

use log::{debug, warn};
use ndarray::{ArrayD, IxDyn};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::tags::Tag;
use tiff::ColorType;

use super::{ImageData, ImageLoader};
use crate::error::InputError;
use crate::volume::{AxisKind, Volume};

/// Page organisation of a stack: ImageJ stores pages channel-fastest, then
/// slice, then frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HyperstackLayout {
    pub channels: usize,
    pub slices: usize,
    pub frames: usize,
}

impl HyperstackLayout {
    /// Every page is a Z slice of a single channel.
    pub fn z_stack(pages: usize) -> Self {
        Self {
            channels: 1,
            slices: pages,
            frames: 1,
        }
    }

    pub fn pages(&self) -> usize {
        self.channels * self.slices * self.frames
    }

    /// Parse the `channels=`, `slices=` and `frames=` entries of an ImageJ
    /// `ImageDescription`. Returns `None` for non-ImageJ descriptions.
    pub fn from_imagej_description(description: &str) -> Option<Self> {
        if !description.starts_with("ImageJ=") {
            return None;
        }

        let mut layout = Self {
            channels: 1,
            slices: 1,
            frames: 1,
        };
        for line in description.lines() {
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let Ok(value) = value.trim().parse::<usize>() else {
                continue;
            };
            match key.trim() {
                "channels" => layout.channels = value,
                "slices" => layout.slices = value,
                "frames" => layout.frames = value,
                _ => {}
            }
        }
        Some(layout)
    }

    /// Page number holding `(channel, slice, frame)`.
    fn page(&self, channel: usize, slice: usize, frame: usize) -> usize {
        channel + self.channels * (slice + self.slices * frame)
    }
}

/// Decoded pages, all of one sample type.
enum Planes {
    U8(Vec<Vec<u8>>),
    U16(Vec<Vec<u16>>),
    F32(Vec<Vec<f32>>),
}

impl Planes {
    fn len(&self) -> usize {
        match self {
            Planes::U8(p) => p.len(),
            Planes::U16(p) => p.len(),
            Planes::F32(p) => p.len(),
        }
    }
}

/// Loader for `.tif`/`.tiff` stacks.
#[derive(Debug, Default, Clone, Copy)]
pub struct TiffStackLoader;

impl ImageLoader for TiffStackLoader {
    fn load(&self, path: &Path) -> Result<ImageData, InputError> {
        let tiff_err = |source| InputError::Tiff {
            path: path.to_path_buf(),
            source,
        };
        let unsupported = |reason: String| InputError::Unsupported {
            path: path.to_path_buf(),
            reason,
        };

        let file = File::open(path).map_err(|source| InputError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut decoder = Decoder::new(BufReader::new(file)).map_err(tiff_err)?;

        let description = decoder.get_tag_ascii_string(Tag::ImageDescription).ok();
        let (width, height) = decoder.dimensions().map_err(tiff_err)?;
        let (width, height) = (width as usize, height as usize);

        let mut planes: Option<Planes> = None;
        loop {
            if decoder.dimensions().map_err(tiff_err)? != (width as u32, height as u32) {
                return Err(InputError::Shape {
                    path: path.to_path_buf(),
                    reason: "pages have different dimensions".to_string(),
                });
            }
            match decoder.colortype().map_err(tiff_err)? {
                ColorType::Gray(_) => {}
                other => return Err(unsupported(format!("color type {other:?}"))),
            }

            let page = decoder.read_image().map_err(tiff_err)?;
            planes = Some(match (planes, page) {
                (None, DecodingResult::U8(p)) => Planes::U8(vec![p]),
                (None, DecodingResult::U16(p)) => Planes::U16(vec![p]),
                (None, DecodingResult::F32(p)) => Planes::F32(vec![p]),
                (Some(Planes::U8(mut v)), DecodingResult::U8(p)) => {
                    v.push(p);
                    Planes::U8(v)
                }
                (Some(Planes::U16(mut v)), DecodingResult::U16(p)) => {
                    v.push(p);
                    Planes::U16(v)
                }
                (Some(Planes::F32(mut v)), DecodingResult::F32(p)) => {
                    v.push(p);
                    Planes::F32(v)
                }
                (None, _) => {
                    return Err(unsupported(
                        "only 8/16-bit unsigned and 32-bit float samples are supported"
                            .to_string(),
                    ))
                }
                (Some(_), _) => {
                    return Err(InputError::Shape {
                        path: path.to_path_buf(),
                        reason: "pages have different sample types".to_string(),
                    })
                }
            });

            if !decoder.more_images() {
                break;
            }
            decoder.next_image().map_err(tiff_err)?;
        }

        let planes = planes.ok_or_else(|| unsupported("no pages".to_string()))?;
        let pages = planes.len();

        let layout = match description
            .as_deref()
            .and_then(HyperstackLayout::from_imagej_description)
        {
            Some(layout) if layout.pages() == pages => layout,
            Some(layout) => {
                warn!(
                    "{}: ImageJ metadata describes {} pages but file has {}; treating as Z stack",
                    path.display(),
                    layout.pages(),
                    pages
                );
                HyperstackLayout::z_stack(pages)
            }
            None => HyperstackLayout::z_stack(pages),
        };
        debug!(
            "{}: {}x{} px, {} pages, {:?}",
            path.display(),
            width,
            height,
            pages,
            layout
        );

        Ok(match planes {
            Planes::U8(p) => ImageData::U8(assemble(&p, width, height, layout)),
            Planes::U16(p) => ImageData::U16(assemble(&p, width, height, layout)),
            Planes::F32(p) => ImageData::F32(assemble(&p, width, height, layout)),
        })
    }
}

/// Arrange row-major pages into an `[X, Y, Channel, (Z), (Time)]` volume.
fn assemble<T: Copy>(
    planes: &[Vec<T>],
    width: usize,
    height: usize,
    layout: HyperstackLayout,
) -> Volume<T> {
    let mut axes = vec![AxisKind::X, AxisKind::Y, AxisKind::Channel];
    let mut shape = vec![width, height, layout.channels];
    if layout.slices > 1 {
        axes.push(AxisKind::Z);
        shape.push(layout.slices);
    }
    if layout.frames > 1 {
        axes.push(AxisKind::Time);
        shape.push(layout.frames);
    }

    let z_axis = axes.iter().position(|&a| a == AxisKind::Z);
    let t_axis = axes.iter().position(|&a| a == AxisKind::Time);

    let data = ArrayD::from_shape_fn(IxDyn(&shape), |idx| {
        let slice = z_axis.map(|a| idx[a]).unwrap_or(0);
        let frame = t_axis.map(|a| idx[a]).unwrap_or(0);
        let page = layout.page(idx[2], slice, frame);
        planes[page][idx[1] * width + idx[0]]
    });

    Volume::from_parts(data, axes)
}

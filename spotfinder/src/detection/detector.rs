//! Spot detection: channel slice → float → DoG → local maxima.

use log::{debug, info, warn};
use num_traits::AsPrimitive;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::config::DetectionConfig;
use crate::error::SpotError;
use crate::image_proc::io::ImageData;
use crate::image_proc::{
    convert_to_f32, difference_of_gaussians, find_local_maxima, hyper_slice_view,
};
use crate::results::ResultsSink;
use crate::volume::{AxisKind, Volume};

/// One detected local maximum.
///
/// Coordinates are sample indices along the X, Y and Z axes of the image; an
/// axis the image does not have is reported as 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Spot {
    #[serde(rename = "Channel")]
    pub channel: usize,
    #[serde(rename = "X")]
    pub x: usize,
    #[serde(rename = "Y")]
    pub y: usize,
    #[serde(rename = "Z")]
    pub z: usize,
}

/// Finds bright, round features in single channels of an image volume.
///
/// The detector is stateless apart from its validated configuration, so one
/// instance can be shared across threads and reused for every channel.
#[derive(Debug, Clone)]
pub struct SpotDetector {
    config: DetectionConfig,
}

impl SpotDetector {
    /// Create a detector, validating the configuration once.
    pub fn new(config: DetectionConfig) -> Result<Self, SpotError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    /// Detect spots in one channel of `volume`.
    ///
    /// # Returns
    /// Spots in row-major scan order of the channel slice. An empty volume
    /// (any extent 0) yields an empty list.
    ///
    /// # Errors
    /// * `OutOfRange` naming `channel_axis` if the volume has no such axis
    /// * `OutOfRange` naming `channel` if `channel >= extent(channel_axis)`
    pub fn detect<T>(&self, volume: &Volume<T>, channel: usize) -> Result<Vec<Spot>, SpotError>
    where
        T: AsPrimitive<f32>,
    {
        let axis = self.config.channel_axis;
        let extent = volume
            .dimension(axis)
            .ok_or_else(|| SpotError::out_of_range("channel_axis", axis as i64, volume.ndim()))?;

        if volume.is_empty() {
            warn!(
                "Volume has an empty axis {:?}; no spots to detect",
                volume.shape()
            );
            return Ok(Vec::new());
        }
        if channel >= extent {
            return Err(SpotError::out_of_range("channel", channel as i64, extent));
        }

        let slice = hyper_slice_view(volume, axis, channel)?;
        debug!(
            "Channel {channel}: slice has {} dimensions {:?}",
            slice.ndim(),
            slice.shape()
        );

        let filtered = difference_of_gaussians(
            &convert_to_f32(&slice),
            self.config.sigma1,
            self.config.sigma2,
        )?;
        let maxima = find_local_maxima(&filtered.data().view(), self.config.threshold as f32);

        let x_axis = filtered.axis_index(AxisKind::X);
        let y_axis = filtered.axis_index(AxisKind::Y);
        let z_axis = filtered.axis_index(AxisKind::Z);
        let spots: Vec<Spot> = maxima
            .iter()
            .map(|index| Spot {
                channel,
                x: coordinate(index, x_axis),
                y: coordinate(index, y_axis),
                z: coordinate(index, z_axis),
            })
            .collect();

        info!("Channel {channel}: found {} spots", spots.len());
        Ok(spots)
    }

    /// Detect spots in each listed channel in turn, appending to `sink`.
    ///
    /// Stops at the first failing channel; spots of earlier channels stay in
    /// the sink. Returns the number of spots appended.
    pub fn detect_channels<T, S>(
        &self,
        volume: &Volume<T>,
        channels: &[usize],
        sink: &mut S,
    ) -> Result<usize, SpotError>
    where
        T: AsPrimitive<f32>,
        S: ResultsSink + ?Sized,
    {
        let mut appended = 0;
        for &channel in channels {
            for spot in self.detect(volume, channel)? {
                sink.append(spot);
                appended += 1;
            }
        }
        Ok(appended)
    }

    /// Like [`detect_channels`](Self::detect_channels), with channels processed
    /// on the rayon thread pool.
    ///
    /// Results are appended from the calling thread in channel-list order, so
    /// the sink needs no locking and the table matches a sequential run. If any
    /// channel fails, the first error in list order is returned and nothing is
    /// appended.
    pub fn detect_channels_parallel<T, S>(
        &self,
        volume: &Volume<T>,
        channels: &[usize],
        sink: &mut S,
    ) -> Result<usize, SpotError>
    where
        T: AsPrimitive<f32> + Sync,
        S: ResultsSink + ?Sized,
    {
        let per_channel: Vec<Result<Vec<Spot>, SpotError>> = channels
            .par_iter()
            .map(|&channel| self.detect(volume, channel))
            .collect();

        let per_channel = per_channel
            .into_iter()
            .collect::<Result<Vec<Vec<Spot>>, SpotError>>()?;

        let mut appended = 0;
        for spot in per_channel.into_iter().flatten() {
            sink.append(spot);
            appended += 1;
        }
        Ok(appended)
    }

    /// Run [`detect_channels`](Self::detect_channels) (or its parallel form) on
    /// a loaded image of any sample type.
    pub fn detect_image<S>(
        &self,
        image: &ImageData,
        channels: &[usize],
        parallel: bool,
        sink: &mut S,
    ) -> Result<usize, SpotError>
    where
        S: ResultsSink + ?Sized,
    {
        match (image, parallel) {
            (ImageData::U8(v), false) => self.detect_channels(v, channels, sink),
            (ImageData::U8(v), true) => self.detect_channels_parallel(v, channels, sink),
            (ImageData::U16(v), false) => self.detect_channels(v, channels, sink),
            (ImageData::U16(v), true) => self.detect_channels_parallel(v, channels, sink),
            (ImageData::F32(v), false) => self.detect_channels(v, channels, sink),
            (ImageData::F32(v), true) => self.detect_channels_parallel(v, channels, sink),
        }
    }
}

/// Position along `axis`, or 0 when the axis is absent.
fn coordinate(index: &[usize], axis: Option<usize>) -> usize {
    axis.map(|a| index[a]).unwrap_or(0)
}

/// One-shot spot detection with explicit parameters.
///
/// Equivalent to building a [`SpotDetector`] from these values and calling
/// [`SpotDetector::detect`].
pub fn detect_spots<T>(
    volume: &Volume<T>,
    channel_axis: usize,
    channel: usize,
    sigma1: f64,
    sigma2: f64,
    threshold: f64,
) -> Result<Vec<Spot>, SpotError>
where
    T: AsPrimitive<f32>,
{
    SpotDetector::new(DetectionConfig {
        channel_axis,
        sigma1,
        sigma2,
        threshold,
    })?
    .detect(volume, channel)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::ResultsTable;
    use ndarray::{ArrayD, IxDyn};

    /// [X:24, Y:24, Channel:2, Z:9] with one bright point per channel
    fn two_channel_volume() -> Volume<u16> {
        let mut data = ArrayD::<u16>::from_elem(IxDyn(&[24, 24, 2, 9]), 10);
        data[[8, 12, 0, 4]] = 5000;
        data[[15, 6, 1, 3]] = 5000;
        Volume::with_default_axes(data)
    }

    fn detector() -> SpotDetector {
        SpotDetector::new(DetectionConfig {
            threshold: 1.0,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_point_sources_found_per_channel() {
        let vol = two_channel_volume();
        let det = detector();

        assert_eq!(
            det.detect(&vol, 0).unwrap(),
            vec![Spot {
                channel: 0,
                x: 8,
                y: 12,
                z: 4
            }]
        );
        assert_eq!(
            det.detect(&vol, 1).unwrap(),
            vec![Spot {
                channel: 1,
                x: 15,
                y: 6,
                z: 3
            }]
        );
    }

    #[test]
    fn test_channel_and_axis_range() {
        let vol = two_channel_volume();
        assert!(matches!(
            detector().detect(&vol, 2),
            Err(SpotError::OutOfRange {
                name: "channel",
                value: 2,
                extent: 2
            })
        ));

        let bad_axis = SpotDetector::new(DetectionConfig {
            channel_axis: 4,
            ..Default::default()
        })
        .unwrap();
        assert!(matches!(
            bad_axis.detect(&vol, 0),
            Err(SpotError::OutOfRange {
                name: "channel_axis",
                ..
            })
        ));
    }

    #[test]
    fn test_empty_volume_returns_no_spots() {
        let vol = Volume::with_default_axes(ArrayD::<u16>::zeros(IxDyn(&[16, 0, 3, 4])));
        assert!(detector().detect(&vol, 0).unwrap().is_empty());
    }

    #[test]
    fn test_missing_z_reports_zero() {
        let mut data = ArrayD::<u8>::zeros(IxDyn(&[12, 12, 1]));
        data[[6, 5, 0]] = 255;
        let vol = Volume::with_default_axes(data);

        let spots = detector().detect(&vol, 0).unwrap();
        assert_eq!(
            spots,
            vec![Spot {
                channel: 0,
                x: 6,
                y: 5,
                z: 0
            }]
        );
    }

    #[test]
    fn test_detect_spots_validates_sigma() {
        let vol = two_channel_volume();
        assert!(matches!(
            detect_spots(&vol, 2, 0, 0.0, 1.5, 1.0),
            Err(SpotError::InvalidParameter { name: "sigma1", .. })
        ));
    }

    #[test]
    fn test_channels_append_in_order_and_parallel_matches() {
        let vol = two_channel_volume();
        let det = detector();

        let mut sequential = ResultsTable::new();
        assert_eq!(det.detect_channels(&vol, &[1, 0], &mut sequential).unwrap(), 2);
        assert_eq!(sequential.spots()[0].channel, 1);
        assert_eq!(sequential.spots()[1].channel, 0);

        let mut parallel = ResultsTable::new();
        det.detect_channels_parallel(&vol, &[1, 0], &mut parallel)
            .unwrap();
        assert_eq!(parallel, sequential);
    }

    #[test]
    fn test_failing_channel_stops_run() {
        let vol = two_channel_volume();
        let det = detector();

        let mut table = ResultsTable::new();
        assert!(det.detect_channels(&vol, &[0, 5, 1], &mut table).is_err());
        assert_eq!(table.len(), 1);

        let mut table = ResultsTable::new();
        assert!(det
            .detect_channels_parallel(&vol, &[0, 5, 1], &mut table)
            .is_err());
        assert!(table.is_empty());
    }
}

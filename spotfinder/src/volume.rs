//! N-dimensional image volumes with labelled axes.
//!
//! A [`Volume`] pairs an `ndarray::ArrayD` with one [`AxisKind`] per axis. The
//! array index order is the axis order: for images produced by the loaders,
//! axis 0 is X, axis 1 is Y and axis 2 is the channel axis, followed by Z and
//! (if present) Time. Volumes are immutable once built; detection only ever
//! borrows them.

use ndarray::{ArrayD, ArrayViewD, IxDyn};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::SpotError;

/// Physical meaning of one axis of a volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AxisKind {
    X,
    Y,
    Z,
    Channel,
    Time,
    Unknown,
}

impl AxisKind {
    /// True for axes that carry a spatial coordinate.
    pub fn is_spatial(&self) -> bool {
        matches!(self, AxisKind::X | AxisKind::Y | AxisKind::Z)
    }

    /// Axis labels assigned to an unlabelled array with `ndim` axes.
    ///
    /// Follows the loader convention `[X, Y, Channel, Z, Time]`; any further
    /// axes are `Unknown`.
    pub fn default_order(ndim: usize) -> Vec<AxisKind> {
        const ORDER: [AxisKind; 5] = [
            AxisKind::X,
            AxisKind::Y,
            AxisKind::Channel,
            AxisKind::Z,
            AxisKind::Time,
        ];
        (0..ndim)
            .map(|d| ORDER.get(d).copied().unwrap_or(AxisKind::Unknown))
            .collect()
    }
}

impl fmt::Display for AxisKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AxisKind::X => "X",
            AxisKind::Y => "Y",
            AxisKind::Z => "Z",
            AxisKind::Channel => "Channel",
            AxisKind::Time => "Time",
            AxisKind::Unknown => "Unknown",
        };
        write!(f, "{name}")
    }
}

/// Owned N-dimensional image with labelled axes.
#[derive(Debug, Clone, PartialEq)]
pub struct Volume<T> {
    data: ArrayD<T>,
    axes: Vec<AxisKind>,
}

impl<T> Volume<T> {
    /// Wrap an array, labelling each axis.
    ///
    /// Fails with `InvalidParameter` when the number of labels does not match
    /// the array's dimensionality.
    pub fn new(data: ArrayD<T>, axes: Vec<AxisKind>) -> Result<Self, SpotError> {
        if axes.len() != data.ndim() {
            return Err(SpotError::invalid(
                "axes",
                format!(
                    "{} axis labels given for a {}-dimensional array",
                    axes.len(),
                    data.ndim()
                ),
            ));
        }
        Ok(Self { data, axes })
    }

    /// Internal constructor for arrays derived from an already validated volume.
    pub(crate) fn from_parts(data: ArrayD<T>, axes: Vec<AxisKind>) -> Self {
        debug_assert_eq!(axes.len(), data.ndim());
        Self { data, axes }
    }

    /// Wrap an array using [`AxisKind::default_order`] for the labels.
    pub fn with_default_axes(data: ArrayD<T>) -> Self {
        let axes = AxisKind::default_order(data.ndim());
        Self { data, axes }
    }

    pub fn data(&self) -> &ArrayD<T> {
        &self.data
    }

    pub fn into_data(self) -> ArrayD<T> {
        self.data
    }

    pub fn axes(&self) -> &[AxisKind] {
        &self.axes
    }

    pub fn ndim(&self) -> usize {
        self.data.ndim()
    }

    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    /// Extent of axis `d`, or `None` if the axis does not exist.
    pub fn dimension(&self, d: usize) -> Option<usize> {
        self.data.shape().get(d).copied()
    }

    /// Index of the first axis labelled `kind`.
    pub fn axis_index(&self, kind: AxisKind) -> Option<usize> {
        self.axes.iter().position(|&a| a == kind)
    }

    /// True when any axis has zero extent.
    pub fn is_empty(&self) -> bool {
        self.data.shape().iter().any(|&n| n == 0)
    }

    /// Borrow the whole volume as a view.
    pub fn view(&self) -> VolumeView<'_, T> {
        VolumeView {
            data: self.data.view(),
            axes: self.axes.clone(),
        }
    }
}

/// Borrowed, possibly strided view of a volume.
///
/// Produced by [`crate::image_proc::hyper_slice_view`]; shares storage with the
/// source volume.
#[derive(Debug, Clone)]
pub struct VolumeView<'a, T> {
    pub(crate) data: ArrayViewD<'a, T>,
    pub(crate) axes: Vec<AxisKind>,
}

impl<'a, T> VolumeView<'a, T> {
    pub fn data(&self) -> &ArrayViewD<'a, T> {
        &self.data
    }

    pub fn axes(&self) -> &[AxisKind] {
        &self.axes
    }

    pub fn ndim(&self) -> usize {
        self.data.ndim()
    }

    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    pub fn axis_index(&self, kind: AxisKind) -> Option<usize> {
        self.axes.iter().position(|&a| a == kind)
    }

    pub fn is_empty(&self) -> bool {
        self.data.shape().iter().any(|&n| n == 0)
    }

    /// Value at a full index.
    pub fn get(&self, index: &[usize]) -> Option<&T> {
        self.data.get(IxDyn(index))
    }
}

impl<T: Clone> VolumeView<'_, T> {
    /// Copy the view into an owned volume.
    pub fn to_volume(&self) -> Volume<T> {
        Volume {
            data: self.data.to_owned(),
            axes: self.axes.clone(),
        }
    }
}

/// Human readable `[X:64, Y:64, Channel:3, Z:20]` description of a shape.
pub fn describe_axes(axes: &[AxisKind], shape: &[usize]) -> String {
    let parts: Vec<String> = axes
        .iter()
        .zip(shape)
        .map(|(axis, extent)| format!("{axis}:{extent}"))
        .collect();
    format!("[{}]", parts.join(", "))
}

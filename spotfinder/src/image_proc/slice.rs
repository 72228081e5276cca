//! Channel extraction and sample conversion.

use ndarray::Axis;
use num_traits::AsPrimitive;

use crate::error::SpotError;
use crate::volume::{Volume, VolumeView};

/// Fix `axis` to `index`, returning an (N-1)-dimensional view.
///
/// The view shares storage with `volume`; the fixed axis and its label are
/// removed.
///
/// # Errors
/// * `OutOfRange` naming `axis` if the volume has no such axis
/// * `OutOfRange` naming `index` if `index >= extent(axis)`
pub fn hyper_slice_view<T>(
    volume: &Volume<T>,
    axis: usize,
    index: usize,
) -> Result<VolumeView<'_, T>, SpotError> {
    let extent = volume
        .dimension(axis)
        .ok_or_else(|| SpotError::out_of_range("axis", axis as i64, volume.ndim()))?;
    if index >= extent {
        return Err(SpotError::out_of_range("index", index as i64, extent));
    }

    let mut axes = volume.axes().to_vec();
    axes.remove(axis);

    Ok(VolumeView {
        data: volume.data().index_axis(Axis(axis), index),
        axes,
    })
}

/// Convert every sample to `f32` into a newly allocated volume.
///
/// Filtering produces signed, fractional values, so integer inputs must be
/// widened before any arithmetic happens.
pub fn convert_to_f32<T>(view: &VolumeView<'_, T>) -> Volume<f32>
where
    T: AsPrimitive<f32>,
{
    Volume::from_parts(view.data().mapv(|v| v.as_()), view.axes().to_vec())
}

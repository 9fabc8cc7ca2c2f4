//! Per-window region statistics.
//!
//! Sums a value map over sliding windows, optionally against a mask, and
//! reports the value-to-mask ratio of every window that contains masked
//! pixels.

use ndarray::ArrayView2;
use serde::Serialize;

use crate::error::WindowError;

use super::iter::{masked_windows, windows, WindowDescriptor};

/// Statistics of one window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionStats {
    pub window: WindowDescriptor,

    /// Sum of values in the window
    pub value_sum: f64,

    /// Pixels in the window
    pub pixel_count: usize,

    /// Sum of mask values, when a mask was given
    pub mask_sum: Option<f64>,

    /// `value_sum / mask_sum * 100`, when a mask was given
    pub ratio_percent: Option<f64>,
}

/// Totals over a set of windows.
///
/// Overlapping windows count shared pixels once per window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionSummary {
    pub windows: usize,
    pub value_sum: f64,
    pub pixel_count: usize,
    pub mask_sum: Option<f64>,
    pub ratio_percent: Option<f64>,
}

/// Compute [`RegionStats`] for every window of `values`.
///
/// With a mask, windows whose mask sums to zero are skipped.
///
/// # Errors
///
/// Window grid errors, and [`WindowError::MaskShapeMismatch`] if the mask
/// shape differs from `values`.
pub fn region_statistics<'a, A, M>(
    values: ArrayView2<'a, A>,
    mask: Option<ArrayView2<'a, M>>,
    tile_size: usize,
    overlap: usize,
) -> Result<Vec<RegionStats>, WindowError>
where
    A: Copy + Into<f64>,
    M: Copy + Into<f64>,
{
    let Some(mask) = mask else {
        return Ok(windows(values, tile_size, overlap)?
            .map(|(window, view)| RegionStats {
                window,
                value_sum: sum(view),
                pixel_count: view.len(),
                mask_sum: None,
                ratio_percent: None,
            })
            .collect());
    };

    Ok(masked_windows(values, mask, tile_size, overlap)?
        .filter_map(|(window, view, mask)| {
            let mask_sum = sum(mask);
            if mask_sum == 0.0 {
                return None;
            }
            let value_sum = sum(view);
            Some(RegionStats {
                window,
                value_sum,
                pixel_count: view.len(),
                mask_sum: Some(mask_sum),
                ratio_percent: Some(value_sum / mask_sum * 100.0),
            })
        })
        .collect())
}

/// Aggregate per-window statistics.
pub fn summarize(stats: &[RegionStats]) -> RegionSummary {
    let value_sum: f64 = stats.iter().map(|s| s.value_sum).sum();
    let mask_sum = stats
        .iter()
        .map(|s| s.mask_sum)
        .sum::<Option<f64>>()
        .filter(|_| !stats.is_empty());

    RegionSummary {
        windows: stats.len(),
        value_sum,
        pixel_count: stats.iter().map(|s| s.pixel_count).sum(),
        mask_sum,
        ratio_percent: mask_sum
            .filter(|m| *m != 0.0)
            .map(|m| value_sum / m * 100.0),
    }
}

fn sum<T: Copy + Into<f64>>(view: ArrayView2<'_, T>) -> f64 {
    view.iter().map(|&v| v.into()).sum()
}

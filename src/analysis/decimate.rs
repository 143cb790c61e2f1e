//! Waveform decimation.
//!
//! Turns a raw time-domain buffer into at most `target` display points. The
//! output starts at the first local minimum of the buffer, so a periodic
//! signal lands on the same phase from one frame to the next.

/// Number of points a display `width_px` wide shows at `zoom`.
///
/// Floored and clamped to zero; non-finite products give zero.
pub fn target_length(width_px: f32, zoom: f32) -> usize {
    let points = (width_px * zoom).floor();
    if points.is_finite() && points > 0.0 {
        points as usize
    } else {
        0
    }
}

/// Index of the first sample that is no greater than both neighbours.
///
/// The end samples have only one neighbour and never qualify. Returns 0
/// when there is no interior minimum.
pub fn find_anchor(raw: &[f32]) -> usize {
    raw.windows(3)
        .position(|w| w[1] <= w[0] && w[1] <= w[2])
        .map(|i| i + 1)
        .unwrap_or(0)
}

/// Anchors `raw` at its first local minimum and keeps `target` samples from there.
///
/// Returns fewer than `target` samples when the anchored remainder is shorter.
pub fn decimate(raw: &[f32], target: usize) -> Vec<f32> {
    let anchor = find_anchor(raw);
    raw[anchor..].iter().copied().take(target).collect()
}

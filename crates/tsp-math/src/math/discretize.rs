//! Mapping continuous values onto equal-width buckets.
//!
//! Two rules are provided:
//!
//! - [`discretize`] is the lower-bound rule used when a fresh buffer is turned
//!   into a state: the bucket is the first one whose upper edge lies above the
//!   value.
//! - [`closest_discretize`] is the nearest-representative rule used when an
//!   existing transition table is remapped into a wider range. The
//!   representative of bucket `i` is `min + i * step`, the same value a state
//!   decodes back to, so re-encoding a decoded state never drifts downward.

/// Width of a single bucket when `[min, max]` is split into `states` buckets.
pub fn bucket_width(states: usize, min: f64, max: f64) -> f64 {
    if states == 0 {
        return 0.0;
    }
    (max - min) / states as f64
}

/// Decode a bucket index back to its representative value.
pub fn bucket_value(state: usize, states: usize, min: f64, max: f64) -> f64 {
    min + state as f64 * bucket_width(states, min, max)
}

/// Lower-bound discretization of `value` into `states` buckets over `[min, max]`.
///
/// Returns `None` when no bucket holds the value: below `min`, above `max`,
/// non-finite input, or a zero-width range other than the all-zero one.
/// `min == max == 0` (nothing seen yet) maps every value to bucket 0, and
/// `value == max` maps to the top bucket.
pub fn discretize(value: f64, states: usize, min: f64, max: f64) -> Option<usize> {
    if states == 0 || !value.is_finite() || !min.is_finite() || !max.is_finite() {
        return None;
    }
    if min == 0.0 && max == 0.0 {
        return Some(0);
    }
    if max <= min || value < min || value > max {
        return None;
    }

    let step = bucket_width(states, min, max);
    for state in 0..states {
        // multiply instead of accumulating so the edges do not drift
        let upper = min + (state + 1) as f64 * step;
        if value < upper {
            return Some(state);
        }
    }
    Some(states - 1)
}

/// Nearest-representative discretization used for rescaling.
///
/// Ties between two representatives resolve toward the higher bucket.
/// Values outside `[min, max]` have no bucket.
pub fn closest_discretize(value: f64, states: usize, min: f64, max: f64) -> Option<usize> {
    if states == 0 || !value.is_finite() || !min.is_finite() || !max.is_finite() {
        return None;
    }
    if min == 0.0 && max == 0.0 {
        return Some(0);
    }
    if max <= min || value < min || value > max {
        return None;
    }

    let step = bucket_width(states, min, max);
    let position = (value - min) / step;
    let nearest = (position + 0.5).floor();
    if nearest < 0.0 {
        return Some(0);
    }
    Some((nearest as usize).min(states - 1))
}
